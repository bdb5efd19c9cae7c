use crate::Result;
#[cfg(feature = "graphql")]
use crate::{Loaders, Session};
#[cfg(feature = "graphql")]
use async_graphql::{Context, ResultExt};
use futures::TryStreamExt;
use loader::group_by;
use sqlx::{query, query_as, FromRow, PgPool};
use std::collections::HashMap;
use tracing::instrument;

/// Someone attending the conference
#[derive(Clone, Debug, Eq, FromRow, PartialEq)]
#[cfg_attr(feature = "graphql", derive(async_graphql::SimpleObject))]
#[cfg_attr(feature = "graphql", graphql(complex))]
pub struct Attendee {
    /// A unique ID
    pub id: i32,
    /// The attendee's given name
    pub first_name: String,
    /// The attendee's family name
    pub last_name: String,
    /// A unique handle for the attendee
    pub username: String,
    /// Where to contact the attendee
    pub email_address: Option<String>,
}

/// An attendee tagged with one of the sessions they checked in to
#[derive(FromRow)]
struct SessionAttendee {
    session_id: i32,
    #[sqlx(flatten)]
    attendee: Attendee,
}

impl Attendee {
    /// Get all the attendees
    #[instrument(name = "Attendee::all", skip_all)]
    pub async fn all(db: &PgPool) -> Result<Vec<Attendee>> {
        let attendees = query_as::<_, Attendee>("SELECT * FROM attendees ORDER BY username")
            .fetch_all(db)
            .await?;

        Ok(attendees)
    }

    /// Load all the attendees by their IDs, for use in loaders
    pub(crate) async fn load(ids: &[i32], db: &PgPool) -> Result<HashMap<i32, Attendee>> {
        let by_id = query_as::<_, Attendee>("SELECT * FROM attendees WHERE id = ANY($1)")
            .bind(ids)
            .fetch(db)
            .map_ok(|attendee| (attendee.id, attendee))
            .try_collect()
            .await?;
        Ok(by_id)
    }

    /// Load the attendees checked in to each of the sessions, for use in loaders
    pub(crate) async fn load_for_sessions(
        session_ids: &[i32],
        db: &PgPool,
    ) -> Result<HashMap<i32, Vec<Attendee>>> {
        let rows = query_as::<_, SessionAttendee>(
            r#"
            SELECT session_attendees.session_id, attendees.* FROM attendees
            INNER JOIN session_attendees ON attendees.id = session_attendees.attendee_id
            WHERE session_attendees.session_id = ANY($1)
            ORDER BY attendees.username
            "#,
        )
        .bind(session_ids)
        .fetch(db)
        .map_ok(|row| (row.session_id, row.attendee))
        .try_collect::<Vec<_>>()
        .await?;

        Ok(group_by(rows))
    }

    /// Check if a username is already taken
    #[instrument(name = "Attendee::username_taken", skip(db))]
    pub async fn username_taken(username: &str, db: &PgPool) -> Result<bool> {
        let (taken,) = query_as::<_, (bool,)>(
            "SELECT exists(SELECT 1 FROM attendees WHERE username = $1)",
        )
        .bind(username)
        .fetch_one(db)
        .await?;

        Ok(taken)
    }

    /// Register a new attendee
    #[instrument(name = "Attendee::create", skip(db))]
    pub async fn create(
        first_name: &str,
        last_name: &str,
        username: &str,
        email_address: Option<&str>,
        db: &PgPool,
    ) -> Result<Attendee> {
        let attendee = query_as::<_, Attendee>(
            r#"
            INSERT INTO attendees (first_name, last_name, username, email_address)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(first_name)
        .bind(last_name)
        .bind(username)
        .bind(email_address)
        .fetch_one(db)
        .await?;

        Ok(attendee)
    }

    /// Record the attendee as present at a session
    ///
    /// Checking in to the same session twice is a no-op.
    #[instrument(name = "Attendee::check_in", skip(self, db), fields(%self.id))]
    pub async fn check_in(&self, session_id: i32, db: &PgPool) -> Result<()> {
        query(
            r#"
            INSERT INTO session_attendees (session_id, attendee_id) VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(session_id)
        .bind(self.id)
        .execute(db)
        .await?;

        Ok(())
    }
}

#[cfg(feature = "graphql")]
#[async_graphql::ComplexObject]
impl Attendee {
    /// The sessions the attendee checked in to
    #[instrument(name = "Attendee::sessions", skip_all, fields(%self.id))]
    async fn sessions(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<Session>> {
        let loaders = ctx.data::<Loaders>()?;
        let sessions = loaders.sessions_for_attendee.load(self.id).await.extend()?;

        Ok(sessions)
    }
}
