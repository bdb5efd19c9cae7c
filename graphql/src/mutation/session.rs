use super::{results, UserError};
use crate::events::{Event, Events};
use async_graphql::{Context, InputObject, MaybeUndefined, Object, Result, ResultExt};
use chrono::{DateTime, Utc};
use database::{Loaders, PgPool, Session};
use tracing::instrument;

results! {
    AddSessionResult {
        /// The added session
        session: Session,
    }
    ScheduleSessionResult {
        /// The scheduled session
        session: Session,
    }
    RenameSessionResult {
        /// The session
        session: Session,
    }
}

#[derive(Default)]
pub(crate) struct SessionMutation;

#[Object]
impl SessionMutation {
    /// Propose a new session presented by existing speakers
    #[instrument(name = "Mutation::add_session", skip(self, ctx))]
    async fn add_session(
        &self,
        ctx: &Context<'_>,
        input: AddSessionInput,
    ) -> Result<AddSessionResult> {
        let mut user_errors = Vec::new();

        if input.title.is_empty() {
            user_errors.push(UserError::new(&["title"], "cannot be empty"));
        }

        if input.speaker_ids.is_empty() {
            user_errors.push(UserError::new(
                &["speaker_ids"],
                "at least one speaker is required",
            ));
        }

        if !user_errors.is_empty() {
            return Ok(user_errors.into());
        }

        let loaders = ctx.data::<Loaders>()?;
        let speakers = loaders
            .speaker
            .load_many(input.speaker_ids.iter().copied())
            .await
            .extend()?;

        let missing = input
            .speaker_ids
            .iter()
            .zip(&speakers)
            .filter(|(_, speaker)| speaker.is_none())
            .map(|(id, _)| UserError::new(&["speaker_ids"], format!("speaker {id} does not exist")))
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Ok(missing.into());
        }

        let db = ctx.data::<PgPool>()?;
        let session = Session::create(
            &input.title,
            input.summary.as_deref(),
            &input.speaker_ids,
            db,
        )
        .await?;

        loaders.session.prime(session.id, session.clone());
        loaders
            .speakers_for_session
            .prime(session.id, speakers.into_iter().flatten().collect());
        for speaker_id in &input.speaker_ids {
            loaders.sessions_for_speaker.clear(speaker_id);
        }

        Ok(session.into())
    }

    /// Place a session in a track at a given time
    #[instrument(name = "Mutation::schedule_session", skip(self, ctx))]
    async fn schedule_session(
        &self,
        ctx: &Context<'_>,
        input: ScheduleSessionInput,
    ) -> Result<ScheduleSessionResult> {
        if input.end_time < input.start_time {
            return Ok(UserError::new(&["end_time"], "must not be before the start time").into());
        }

        let loaders = ctx.data::<Loaders>()?;
        let (session, track) = futures::join!(
            loaders.session.load_optional(input.session_id),
            loaders.track.load_optional(input.track_id),
        );

        let mut user_errors = Vec::new();
        let session = session.extend()?;
        if session.is_none() {
            user_errors.push(UserError::new(&["session_id"], "session does not exist"));
        }
        if track.extend()?.is_none() {
            user_errors.push(UserError::new(&["track_id"], "track does not exist"));
        }

        let Some(mut session) = session.filter(|_| user_errors.is_empty()) else {
            return Ok(user_errors.into());
        };

        let db = ctx.data::<PgPool>()?;
        session
            .update()
            .schedule(input.track_id, input.start_time, input.end_time)
            .save(db)
            .await?;
        loaders.session_changed(&session);

        let events = ctx.data::<Events>()?;
        events.publish(Event::SessionScheduled {
            session_id: session.id,
        });

        Ok(session.into())
    }

    /// Change the title or abstract of a session
    #[instrument(name = "Mutation::rename_session", skip(self, ctx))]
    async fn rename_session(
        &self,
        ctx: &Context<'_>,
        input: RenameSessionInput,
    ) -> Result<RenameSessionResult> {
        if input.title.is_empty() {
            return Ok(UserError::new(&["title"], "cannot be empty").into());
        }

        let loaders = ctx.data::<Loaders>()?;
        let Some(mut session) = loaders.session.load_optional(input.id).await.extend()? else {
            return Ok(UserError::new(&["id"], "session does not exist").into());
        };

        let db = ctx.data::<PgPool>()?;
        session
            .update()
            .title(input.title)
            .override_summary(input.summary.into())
            .save(db)
            .await?;
        loaders.session_changed(&session);

        Ok(session.into())
    }
}

/// Input fields for adding a session
#[derive(Debug, InputObject)]
struct AddSessionInput {
    /// The title of the session
    title: String,
    /// A description of what the session covers
    #[graphql(name = "abstract")]
    summary: Option<String>,
    /// The people presenting the session
    speaker_ids: Vec<i32>,
}

/// Input fields for scheduling a session
#[derive(Debug, InputObject)]
struct ScheduleSessionInput {
    /// The session to schedule
    session_id: i32,
    /// The track to schedule it in
    track_id: i32,
    /// When the session begins
    start_time: DateTime<Utc>,
    /// When the session ends
    end_time: DateTime<Utc>,
}

/// Input fields for renaming a session
#[derive(Debug, InputObject)]
struct RenameSessionInput {
    /// The ID of the session to rename
    id: i32,
    /// The new title
    title: String,
    /// A new description of what the session covers
    #[graphql(name = "abstract")]
    summary: MaybeUndefined<String>,
}
