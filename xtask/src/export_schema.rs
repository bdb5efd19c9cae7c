use eyre::{eyre, WrapErr};
use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
};
use tracing::info;

pub fn run(args: Args) -> eyre::Result<()> {
    let sdl = graphql::sdl();

    let Some(path) = args.output else {
        io::stdout()
            .lock()
            .write_all(sdl.as_bytes())
            .wrap_err("failed to write schema to stdout")?;
        return Ok(());
    };

    if path.exists() && !args.force {
        return Err(eyre!(
            "{} already exists, use --force to overwrite",
            path.display()
        ));
    }

    fs::write(&path, &sdl).wrap_err("failed to write schema")?;
    info!(path = %path.display(), bytes = sdl.len(), "exported schema");

    Ok(())
}

#[derive(clap::Args, Debug)]
pub struct Args {
    /// Where to save the schema, printed to stdout when omitted
    output: Option<PathBuf>,
    /// Whether to overwrite the output file if it already exists
    #[arg(short, long, default_value_t)]
    force: bool,
}
