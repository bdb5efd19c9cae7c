use crate::{
    listing::{self, contains, Filter, SortDirection},
    Result,
};
#[cfg(feature = "graphql")]
use crate::{Loaders, Session};
#[cfg(feature = "graphql")]
use async_graphql::{Context, ResultExt};
use futures::TryStreamExt;
use sqlx::{query, query_as, FromRow, PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use tracing::instrument;

/// A room or stream that sessions are scheduled in
#[derive(Clone, Debug, Eq, FromRow, PartialEq)]
#[cfg_attr(feature = "graphql", derive(async_graphql::SimpleObject))]
#[cfg_attr(feature = "graphql", graphql(complex))]
pub struct Track {
    /// A unique ID
    pub id: i32,
    /// The name of the track
    pub name: String,
}

/// Conditions a listed track must meet
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "graphql", derive(async_graphql::InputObject))]
pub struct TrackFilter {
    /// Part of the track's name, ignoring case
    pub name_contains: Option<String>,
}

impl Filter for TrackFilter {
    fn apply<'a>(&'a self, builder: &mut QueryBuilder<'a, Postgres>) {
        if let Some(name) = &self.name_contains {
            builder.push(" WHERE ");
            contains(&mut builder.separated(" AND "), "name", name);
        }
    }
}

/// What to sort tracks by
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "graphql", derive(async_graphql::Enum))]
pub enum TrackOrderField {
    #[default]
    Id,
    Name,
}

/// How to sort listed tracks
#[derive(Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "graphql", derive(async_graphql::InputObject))]
pub struct TrackOrder {
    #[cfg_attr(feature = "graphql", graphql(default))]
    pub field: TrackOrderField,
    #[cfg_attr(feature = "graphql", graphql(default))]
    pub direction: SortDirection,
}

impl Track {
    /// Count the tracks matching the filter
    #[instrument(name = "Track::count", skip(db))]
    pub async fn count(filter: &TrackFilter, db: &PgPool) -> Result<i64> {
        listing::count("tracks", filter, db).await
    }

    /// Get a slice of the tracks matching the filter
    #[instrument(name = "Track::page", skip(db))]
    pub async fn page(
        filter: &TrackFilter,
        order: TrackOrder,
        offset: i64,
        limit: i64,
        db: &PgPool,
    ) -> Result<Vec<Track>> {
        let column = match order.field {
            TrackOrderField::Id => "id",
            TrackOrderField::Name => "name",
        };
        listing::page("tracks", filter, column, order.direction, offset, limit, db).await
    }

    /// Load all the tracks by their IDs, for use in loaders
    pub(crate) async fn load(ids: &[i32], db: &PgPool) -> Result<HashMap<i32, Track>> {
        let by_id = query_as::<_, Track>("SELECT * FROM tracks WHERE id = ANY($1)")
            .bind(ids)
            .fetch(db)
            .map_ok(|track| (track.id, track))
            .try_collect()
            .await?;
        Ok(by_id)
    }

    /// Get a track by it's name
    #[instrument(name = "Track::find_by_name", skip(db))]
    pub async fn find_by_name(name: &str, db: &PgPool) -> Result<Option<Track>> {
        let track = query_as::<_, Track>("SELECT * FROM tracks WHERE name = $1 ORDER BY id")
            .bind(name)
            .fetch_optional(db)
            .await?;

        Ok(track)
    }

    /// Create a new track
    #[instrument(name = "Track::create", skip(db))]
    pub async fn create(name: &str, db: &PgPool) -> Result<Track> {
        let track = query_as::<_, Track>("INSERT INTO tracks (name) VALUES ($1) RETURNING *")
            .bind(name)
            .fetch_one(db)
            .await?;

        Ok(track)
    }

    /// Change the name of the track
    #[instrument(name = "Track::rename", skip(self, db), fields(%self.id))]
    pub async fn rename(&mut self, name: String, db: &PgPool) -> Result<()> {
        query("UPDATE tracks SET name = $1 WHERE id = $2")
            .bind(&name)
            .bind(self.id)
            .execute(db)
            .await?;

        self.name = name;
        Ok(())
    }
}

#[cfg(feature = "graphql")]
#[async_graphql::ComplexObject]
impl Track {
    /// The sessions scheduled in the track
    #[instrument(name = "Track::sessions", skip_all, fields(%self.id))]
    async fn sessions(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<Session>> {
        let loaders = ctx.data::<Loaders>()?;
        let sessions = loaders.sessions_for_track.load(self.id).await.extend()?;

        Ok(sessions)
    }
}
