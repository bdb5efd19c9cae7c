use crate::Result;
use sqlx::{postgres::PgRow, FromRow, PgPool, Postgres, QueryBuilder};

/// Which way a listing is sorted
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "graphql", derive(async_graphql::Enum))]
pub enum SortDirection {
    /// Smallest first
    #[default]
    Asc,
    /// Largest first
    Desc,
}

impl SortDirection {
    fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Narrows down the rows of a listing
pub(crate) trait Filter {
    /// Append the `WHERE` clause, if any
    fn apply<'a>(&'a self, builder: &mut QueryBuilder<'a, Postgres>);
}

/// Add a case-insensitive substring match on `column`
pub(crate) fn contains<'a>(
    conditions: &mut sqlx::query_builder::Separated<'_, 'a, Postgres, &'static str>,
    column: &'static str,
    needle: &'a str,
) {
    conditions.push(format_args!("strpos(lower({column}), lower("));
    conditions.push_bind_unseparated(needle);
    conditions.push_unseparated(")) > 0");
}

/// Count the rows of `table` matching the filter
pub(crate) async fn count<F: Filter>(table: &'static str, filter: &F, db: &PgPool) -> Result<i64> {
    let mut builder = QueryBuilder::new(format!("SELECT count(*) FROM {table}"));
    filter.apply(&mut builder);

    let total = builder.build_query_scalar::<i64>().fetch_one(db).await?;
    Ok(total)
}

/// Fetch a slice of the rows of `table` matching the filter
///
/// Rows are sorted by `column`, ties are broken by ID so slices never overlap.
pub(crate) async fn page<T, F>(
    table: &'static str,
    filter: &F,
    column: &'static str,
    direction: SortDirection,
    offset: i64,
    limit: i64,
    db: &PgPool,
) -> Result<Vec<T>>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    F: Filter,
{
    let mut builder = QueryBuilder::new(format!("SELECT * FROM {table}"));
    filter.apply(&mut builder);

    let direction = direction.keyword();
    builder.push(format_args!(
        " ORDER BY {column} {direction} NULLS LAST, id {direction} LIMIT "
    ));
    builder.push_bind(limit);
    builder.push(" OFFSET ");
    builder.push_bind(offset);

    let rows = builder.build_query_as::<T>().fetch_all(db).await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::{contains, Filter, SortDirection};
    use sqlx::{Postgres, QueryBuilder};

    struct ByName(Option<String>);

    impl Filter for ByName {
        fn apply<'a>(&'a self, builder: &mut QueryBuilder<'a, Postgres>) {
            if let Some(name) = &self.0 {
                builder.push(" WHERE ");
                contains(&mut builder.separated(" AND "), "name", name);
            }
        }
    }

    #[test]
    fn filter_binds_the_needle() {
        let filter = ByName(Some(String::from("rust")));
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM tracks");
        filter.apply(&mut builder);

        assert_eq!(
            builder.sql(),
            "SELECT * FROM tracks WHERE strpos(lower(name), lower($1)) > 0"
        );
    }

    #[test]
    fn empty_filter_adds_nothing() {
        let filter = ByName(None);
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM tracks");
        filter.apply(&mut builder);

        assert_eq!(builder.sql(), "SELECT * FROM tracks");
    }

    #[test]
    fn ascending_by_default() {
        assert_eq!(SortDirection::default(), SortDirection::Asc);
        assert_eq!(SortDirection::Desc.keyword(), "DESC");
    }
}
