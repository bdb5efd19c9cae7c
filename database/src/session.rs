use crate::{
    listing::{self, contains, Filter, SortDirection},
    Result,
};
#[cfg(feature = "graphql")]
use crate::{Attendee, Loaders, Speaker, Track};
#[cfg(feature = "graphql")]
use async_graphql::{Context, ResultExt};
use chrono::{DateTime, Duration, Utc};
use futures::TryStreamExt;
use loader::group_by;
use sqlx::{query, query_as, FromRow, PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use tracing::instrument;

/// A talk or workshop on the conference schedule
#[derive(Clone, Debug, Eq, FromRow, PartialEq)]
#[cfg_attr(feature = "graphql", derive(async_graphql::SimpleObject))]
#[cfg_attr(feature = "graphql", graphql(complex))]
pub struct Session {
    /// A unique ID
    pub id: i32,
    /// The title of the session
    pub title: String,
    /// A description of what the session covers
    #[sqlx(rename = "abstract")]
    #[cfg_attr(feature = "graphql", graphql(name = "abstract"))]
    pub summary: Option<String>,
    /// When the session begins
    pub start_time: Option<DateTime<Utc>>,
    /// When the session ends
    pub end_time: Option<DateTime<Utc>>,
    /// The track the session is scheduled in
    #[cfg_attr(feature = "graphql", graphql(skip))]
    pub track_id: Option<i32>,
}

/// Conditions a listed session must meet
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "graphql", derive(async_graphql::InputObject))]
pub struct SessionFilter {
    /// Part of the session's title, ignoring case
    pub title_contains: Option<String>,
    /// Only sessions scheduled in this track
    pub track_id: Option<i32>,
}

impl Filter for SessionFilter {
    fn apply<'a>(&'a self, builder: &mut QueryBuilder<'a, Postgres>) {
        if self.title_contains.is_none() && self.track_id.is_none() {
            return;
        }

        builder.push(" WHERE ");
        let mut conditions = builder.separated(" AND ");

        if let Some(title) = &self.title_contains {
            contains(&mut conditions, "title", title);
        }

        if let Some(track_id) = self.track_id {
            conditions.push("track_id = ");
            conditions.push_bind_unseparated(track_id);
        }
    }
}

/// What to sort sessions by
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "graphql", derive(async_graphql::Enum))]
pub enum SessionOrderField {
    #[default]
    Id,
    Title,
    StartTime,
}

/// How to sort listed sessions
#[derive(Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "graphql", derive(async_graphql::InputObject))]
pub struct SessionOrder {
    #[cfg_attr(feature = "graphql", graphql(default))]
    pub field: SessionOrderField,
    #[cfg_attr(feature = "graphql", graphql(default))]
    pub direction: SortDirection,
}

/// A session tagged with one of its speakers
#[derive(FromRow)]
struct SpeakerSession {
    speaker_id: i32,
    #[sqlx(flatten)]
    session: Session,
}

/// A session tagged with one of its attendees
#[derive(FromRow)]
struct AttendeeSession {
    attendee_id: i32,
    #[sqlx(flatten)]
    session: Session,
}

impl Session {
    /// Count the sessions matching the filter
    #[instrument(name = "Session::count", skip(db))]
    pub async fn count(filter: &SessionFilter, db: &PgPool) -> Result<i64> {
        listing::count("sessions", filter, db).await
    }

    /// Get a slice of the sessions matching the filter
    #[instrument(name = "Session::page", skip(db))]
    pub async fn page(
        filter: &SessionFilter,
        order: SessionOrder,
        offset: i64,
        limit: i64,
        db: &PgPool,
    ) -> Result<Vec<Session>> {
        let column = match order.field {
            SessionOrderField::Id => "id",
            SessionOrderField::Title => "title",
            SessionOrderField::StartTime => "start_time",
        };
        listing::page("sessions", filter, column, order.direction, offset, limit, db).await
    }

    /// Load all the sessions by their IDs, for use in loaders
    pub(crate) async fn load(ids: &[i32], db: &PgPool) -> Result<HashMap<i32, Session>> {
        let by_id = query_as::<_, Session>("SELECT * FROM sessions WHERE id = ANY($1)")
            .bind(ids)
            .fetch(db)
            .map_ok(|session| (session.id, session))
            .try_collect()
            .await?;
        Ok(by_id)
    }

    /// Load the sessions presented by each of the speakers, for use in loaders
    pub(crate) async fn load_for_speakers(
        speaker_ids: &[i32],
        db: &PgPool,
    ) -> Result<HashMap<i32, Vec<Session>>> {
        let rows = query_as::<_, SpeakerSession>(
            r#"
            SELECT session_speakers.speaker_id, sessions.* FROM sessions
            INNER JOIN session_speakers ON sessions.id = session_speakers.session_id
            WHERE session_speakers.speaker_id = ANY($1)
            ORDER BY sessions.id
            "#,
        )
        .bind(speaker_ids)
        .fetch(db)
        .map_ok(|row| (row.speaker_id, row.session))
        .try_collect::<Vec<_>>()
        .await?;

        Ok(group_by(rows))
    }

    /// Load the sessions each of the attendees checked in to, for use in loaders
    pub(crate) async fn load_for_attendees(
        attendee_ids: &[i32],
        db: &PgPool,
    ) -> Result<HashMap<i32, Vec<Session>>> {
        let rows = query_as::<_, AttendeeSession>(
            r#"
            SELECT session_attendees.attendee_id, sessions.* FROM sessions
            INNER JOIN session_attendees ON sessions.id = session_attendees.session_id
            WHERE session_attendees.attendee_id = ANY($1)
            ORDER BY sessions.id
            "#,
        )
        .bind(attendee_ids)
        .fetch(db)
        .map_ok(|row| (row.attendee_id, row.session))
        .try_collect::<Vec<_>>()
        .await?;

        Ok(group_by(rows))
    }

    /// Load the sessions scheduled in each of the tracks, for use in loaders
    pub(crate) async fn load_for_tracks(
        track_ids: &[i32],
        db: &PgPool,
    ) -> Result<HashMap<i32, Vec<Session>>> {
        let by_track = query_as::<_, Session>(
            "SELECT * FROM sessions WHERE track_id = ANY($1) ORDER BY start_time, id",
        )
        .bind(track_ids)
        .fetch(db)
        .try_fold(HashMap::new(), |mut map, session| async {
            if let Some(track_id) = session.track_id {
                let entry: &mut Vec<Session> = map.entry(track_id).or_default();
                entry.push(session);
            }
            Ok(map)
        })
        .await?;
        Ok(by_track)
    }

    /// Create a new session presented by the given speakers
    #[instrument(name = "Session::create", skip(db))]
    pub async fn create(
        title: &str,
        summary: Option<&str>,
        speaker_ids: &[i32],
        db: &PgPool,
    ) -> Result<Session> {
        let mut tx = db.begin().await?;

        let session = query_as::<_, Session>(
            "INSERT INTO sessions (title, abstract) VALUES ($1, $2) RETURNING *",
        )
        .bind(title)
        .bind(summary)
        .fetch_one(&mut *tx)
        .await?;

        query(
            r#"
            INSERT INTO session_speakers (session_id, speaker_id)
            SELECT $1, speaker_id FROM unnest($2::int[]) AS speaker_id
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(session.id)
        .bind(speaker_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(session)
    }

    /// How long the session runs for
    ///
    /// A session without an end time has no duration, one without a start time ends as soon as
    /// it starts.
    pub fn duration(&self) -> Duration {
        match self.end_time {
            Some(end) => end - self.start_time.unwrap_or(end),
            None => Duration::zero(),
        }
    }

    /// Update the session's fields
    pub fn update(&mut self) -> SessionUpdater<'_> {
        SessionUpdater::new(self)
    }
}

#[cfg(feature = "graphql")]
#[async_graphql::ComplexObject]
impl Session {
    /// How long the session runs for, in minutes
    #[graphql(name = "duration")]
    async fn duration_in_minutes(&self) -> i64 {
        self.duration().num_minutes()
    }

    /// The people presenting the session
    #[instrument(name = "Session::speakers", skip_all, fields(%self.id))]
    async fn speakers(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<Speaker>> {
        let loaders = ctx.data::<Loaders>()?;
        let speakers = loaders.speakers_for_session.load(self.id).await.extend()?;

        Ok(speakers)
    }

    /// The people who checked in to the session
    #[instrument(name = "Session::attendees", skip_all, fields(%self.id))]
    async fn attendees(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<Attendee>> {
        let loaders = ctx.data::<Loaders>()?;
        let attendees = loaders.attendees_for_session.load(self.id).await.extend()?;

        Ok(attendees)
    }

    /// The track the session is scheduled in
    #[instrument(name = "Session::track", skip_all, fields(%self.id))]
    async fn track(&self, ctx: &Context<'_>) -> async_graphql::Result<Option<Track>> {
        let Some(track_id) = self.track_id else {
            return Ok(None);
        };

        let loaders = ctx.data::<Loaders>()?;
        let track = loaders.track.load_optional(track_id).await.extend()?;

        Ok(track)
    }
}

/// Handles updating individual fields of the session
pub struct SessionUpdater<'s> {
    session: &'s mut Session,
    title: Option<String>,
    summary: Option<Option<String>>,
    track_id: Option<i32>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
}

impl<'s> SessionUpdater<'s> {
    fn new(session: &'s mut Session) -> SessionUpdater<'s> {
        Self {
            session,
            title: None,
            summary: None,
            track_id: None,
            start_time: None,
            end_time: None,
        }
    }

    /// Update the title
    pub fn title(mut self, title: String) -> SessionUpdater<'s> {
        self.title = Some(title);
        self
    }

    /// Override the abstract
    pub fn override_summary(mut self, summary: Option<Option<String>>) -> SessionUpdater<'s> {
        self.summary = summary;
        self
    }

    /// Place the session in a track at the given time
    pub fn schedule(
        mut self,
        track_id: i32,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> SessionUpdater<'s> {
        self.track_id = Some(track_id);
        self.start_time = Some(start_time);
        self.end_time = Some(end_time);
        self
    }

    /// Perform the update
    #[instrument(name = "Session::update", skip_all, fields(self.id = self.session.id))]
    pub async fn save(self, db: &PgPool) -> Result<()> {
        if self.title.is_none()
            && self.summary.is_none()
            && self.track_id.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
        {
            // nothing was changed
            return Ok(());
        }

        let mut builder = QueryBuilder::new("UPDATE sessions SET ");
        let mut separated = builder.separated(", ");

        if let Some(title) = &self.title {
            separated.push("title = ");
            separated.push_bind_unseparated(title);
        }

        if let Some(summary) = &self.summary {
            separated.push("abstract = ");
            separated.push_bind_unseparated(summary);
        }

        if let Some(track_id) = self.track_id {
            separated.push("track_id = ");
            separated.push_bind_unseparated(track_id);
        }

        if let Some(start_time) = self.start_time {
            separated.push("start_time = ");
            separated.push_bind_unseparated(start_time);
        }

        if let Some(end_time) = self.end_time {
            separated.push("end_time = ");
            separated.push_bind_unseparated(end_time);
        }

        builder.push(" WHERE id = ");
        builder.push_bind(self.session.id);
        builder.build().execute(db).await?;

        if let Some(title) = self.title {
            self.session.title = title;
        }

        if let Some(summary) = self.summary {
            self.session.summary = summary;
        }

        if let Some(track_id) = self.track_id {
            self.session.track_id = Some(track_id);
        }

        if let Some(start_time) = self.start_time {
            self.session.start_time = Some(start_time);
        }

        if let Some(end_time) = self.end_time {
            self.session.end_time = Some(end_time);
        }

        Ok(())
    }
}
