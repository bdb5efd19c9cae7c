use url::Url;

/// Check if the argument is a valid username
pub fn username(raw: &str) -> bool {
    !raw.is_empty() && raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Check if the argument looks like an email address
pub fn email(raw: &str) -> bool {
    match raw.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.contains('@'),
        None => false,
    }
}

/// Check if the argument is a valid URL
pub fn url(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(url) => {
            let scheme = url.scheme();
            (scheme == "http" || scheme == "https") && url.has_authority()
        }
        Err(_) => false,
    }
}
