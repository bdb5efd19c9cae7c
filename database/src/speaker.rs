use crate::{
    listing::{self, contains, Filter, SortDirection},
    Result,
};
#[cfg(feature = "graphql")]
use crate::{Loaders, Session};
#[cfg(feature = "graphql")]
use async_graphql::{Context, ResultExt};
use futures::TryStreamExt;
use loader::group_by;
use sqlx::{query_as, FromRow, PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use tracing::instrument;

/// Someone presenting at the conference
#[derive(Clone, Debug, Eq, FromRow, PartialEq)]
#[cfg_attr(feature = "graphql", derive(async_graphql::SimpleObject))]
#[cfg_attr(feature = "graphql", graphql(complex))]
pub struct Speaker {
    /// A unique ID
    pub id: i32,
    /// The speaker's full name
    pub name: String,
    /// A short biography
    pub bio: Option<String>,
    /// URL for the speaker's website
    pub website: Option<String>,
}

/// Conditions a listed speaker must meet
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "graphql", derive(async_graphql::InputObject))]
pub struct SpeakerFilter {
    /// Part of the speaker's name, ignoring case
    pub name_contains: Option<String>,
}

impl Filter for SpeakerFilter {
    fn apply<'a>(&'a self, builder: &mut QueryBuilder<'a, Postgres>) {
        if let Some(name) = &self.name_contains {
            builder.push(" WHERE ");
            contains(&mut builder.separated(" AND "), "name", name);
        }
    }
}

/// What to sort speakers by
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "graphql", derive(async_graphql::Enum))]
pub enum SpeakerOrderField {
    #[default]
    Id,
    Name,
}

/// How to sort listed speakers
#[derive(Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "graphql", derive(async_graphql::InputObject))]
pub struct SpeakerOrder {
    #[cfg_attr(feature = "graphql", graphql(default))]
    pub field: SpeakerOrderField,
    #[cfg_attr(feature = "graphql", graphql(default))]
    pub direction: SortDirection,
}

/// A speaker tagged with one of the sessions they present
#[derive(FromRow)]
struct SessionSpeaker {
    session_id: i32,
    #[sqlx(flatten)]
    speaker: Speaker,
}

impl Speaker {
    /// Count the speakers matching the filter
    #[instrument(name = "Speaker::count", skip(db))]
    pub async fn count(filter: &SpeakerFilter, db: &PgPool) -> Result<i64> {
        listing::count("speakers", filter, db).await
    }

    /// Get a slice of the speakers matching the filter
    #[instrument(name = "Speaker::page", skip(db))]
    pub async fn page(
        filter: &SpeakerFilter,
        order: SpeakerOrder,
        offset: i64,
        limit: i64,
        db: &PgPool,
    ) -> Result<Vec<Speaker>> {
        let column = match order.field {
            SpeakerOrderField::Id => "id",
            SpeakerOrderField::Name => "name",
        };
        listing::page("speakers", filter, column, order.direction, offset, limit, db).await
    }

    /// Load all the speakers by their IDs, for use in loaders
    pub(crate) async fn load(ids: &[i32], db: &PgPool) -> Result<HashMap<i32, Speaker>> {
        let by_id = query_as::<_, Speaker>("SELECT * FROM speakers WHERE id = ANY($1)")
            .bind(ids)
            .fetch(db)
            .map_ok(|speaker| (speaker.id, speaker))
            .try_collect()
            .await?;
        Ok(by_id)
    }

    /// Load the speakers presenting each of the sessions, for use in loaders
    pub(crate) async fn load_for_sessions(
        session_ids: &[i32],
        db: &PgPool,
    ) -> Result<HashMap<i32, Vec<Speaker>>> {
        let rows = query_as::<_, SessionSpeaker>(
            r#"
            SELECT session_speakers.session_id, speakers.* FROM speakers
            INNER JOIN session_speakers ON speakers.id = session_speakers.speaker_id
            WHERE session_speakers.session_id = ANY($1)
            ORDER BY speakers.id
            "#,
        )
        .bind(session_ids)
        .fetch(db)
        .map_ok(|row| (row.session_id, row.speaker))
        .try_collect::<Vec<_>>()
        .await?;

        Ok(group_by(rows))
    }

    /// Create a new speaker
    #[instrument(name = "Speaker::create", skip(db))]
    pub async fn create(
        name: &str,
        bio: Option<&str>,
        website: Option<&str>,
        db: &PgPool,
    ) -> Result<Speaker> {
        let speaker = query_as::<_, Speaker>(
            "INSERT INTO speakers (name, bio, website) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(name)
        .bind(bio)
        .bind(website)
        .fetch_one(db)
        .await?;

        Ok(speaker)
    }

    /// Update the speaker's fields
    pub fn update(&mut self) -> SpeakerUpdater<'_> {
        SpeakerUpdater::new(self)
    }
}

#[cfg(feature = "graphql")]
#[async_graphql::ComplexObject]
impl Speaker {
    /// The sessions the speaker is presenting
    #[instrument(name = "Speaker::sessions", skip_all, fields(%self.id))]
    async fn sessions(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<Session>> {
        let loaders = ctx.data::<Loaders>()?;
        let sessions = loaders.sessions_for_speaker.load(self.id).await.extend()?;

        Ok(sessions)
    }
}

/// Handles updating individual fields of the speaker
pub struct SpeakerUpdater<'s> {
    speaker: &'s mut Speaker,
    name: Option<String>,
    bio: Option<Option<String>>,
    website: Option<Option<String>>,
}

impl<'s> SpeakerUpdater<'s> {
    fn new(speaker: &'s mut Speaker) -> SpeakerUpdater<'s> {
        Self {
            speaker,
            name: None,
            bio: None,
            website: None,
        }
    }

    /// Directly set the name
    pub fn override_name(mut self, name: Option<String>) -> SpeakerUpdater<'s> {
        self.name = name;
        self
    }

    /// Override the biography
    pub fn override_bio(mut self, bio: Option<Option<String>>) -> SpeakerUpdater<'s> {
        self.bio = bio;
        self
    }

    /// Override the website URL
    pub fn override_website(mut self, website: Option<Option<String>>) -> SpeakerUpdater<'s> {
        self.website = website;
        self
    }

    /// Whether any field would be changed
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.bio.is_none() && self.website.is_none()
    }

    /// Perform the update
    #[instrument(name = "Speaker::update", skip_all, fields(self.id = self.speaker.id))]
    pub async fn save(self, db: &PgPool) -> Result<()> {
        if self.is_empty() {
            // nothing was changed
            return Ok(());
        }

        let mut builder = QueryBuilder::new("UPDATE speakers SET ");
        let mut separated = builder.separated(", ");

        if let Some(name) = &self.name {
            separated.push("name = ");
            separated.push_bind_unseparated(name);
        }

        if let Some(bio) = &self.bio {
            separated.push("bio = ");
            separated.push_bind_unseparated(bio);
        }

        if let Some(website) = &self.website {
            separated.push("website = ");
            separated.push_bind_unseparated(website);
        }

        builder.push(" WHERE id = ");
        builder.push_bind(self.speaker.id);
        builder.build().execute(db).await?;

        if let Some(name) = self.name {
            self.speaker.name = name;
        }

        if let Some(bio) = self.bio {
            self.speaker.bio = bio;
        }

        if let Some(website) = self.website {
            self.speaker.website = website;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Speaker;

    fn speaker() -> Speaker {
        Speaker {
            id: 1,
            name: String::from("Ada Lovelace"),
            bio: None,
            website: None,
        }
    }

    #[test]
    fn untouched_updater_is_empty() {
        let mut speaker = speaker();
        assert!(speaker.update().is_empty());
        assert!(speaker
            .update()
            .override_name(None)
            .override_bio(None)
            .is_empty());
    }

    #[test]
    fn clearing_a_field_is_a_change() {
        let mut speaker = speaker();
        assert!(!speaker.update().override_website(Some(None)).is_empty());
    }
}
