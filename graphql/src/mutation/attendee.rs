use super::{results, validators, UserError};
use crate::events::{Event, Events};
use async_graphql::{Context, InputObject, Object, Result, ResultExt};
use database::{Attendee, Loaders, PgPool};
use tracing::instrument;

results! {
    RegisterAttendeeResult {
        /// The registered attendee
        attendee: Attendee,
    }
    CheckInAttendeeResult {
        /// The attendee who checked in
        attendee: Attendee,
    }
}

#[derive(Default)]
pub(crate) struct AttendeeMutation;

#[Object]
impl AttendeeMutation {
    /// Register someone to attend the conference
    #[instrument(name = "Mutation::register_attendee", skip(self, ctx))]
    async fn register_attendee(
        &self,
        ctx: &Context<'_>,
        input: RegisterAttendeeInput,
    ) -> Result<RegisterAttendeeResult> {
        let mut user_errors = Vec::new();

        if input.first_name.is_empty() {
            user_errors.push(UserError::new(&["first_name"], "cannot be empty"));
        }

        if input.last_name.is_empty() {
            user_errors.push(UserError::new(&["last_name"], "cannot be empty"));
        }

        if !validators::username(&input.username) {
            user_errors.push(UserError::new(
                &["username"],
                "must only contain letters, numbers, dashes and underscores",
            ));
        }

        if let Some(email_address) = &input.email_address {
            if !validators::email(email_address) {
                user_errors.push(UserError::new(&["email_address"], "must be an email address"));
            }
        }

        if !user_errors.is_empty() {
            return Ok(user_errors.into());
        }

        let db = ctx.data::<PgPool>()?;
        if Attendee::username_taken(&input.username, db).await? {
            return Ok(UserError::new(&["username"], "already in use").into());
        }

        let attendee = Attendee::create(
            &input.first_name,
            &input.last_name,
            &input.username,
            input.email_address.as_deref(),
            db,
        )
        .await?;

        let loaders = ctx.data::<Loaders>()?;
        loaders.attendee.prime(attendee.id, attendee.clone());

        Ok(attendee.into())
    }

    /// Record an attendee as present at a session
    #[instrument(name = "Mutation::check_in_attendee", skip(self, ctx))]
    async fn check_in_attendee(
        &self,
        ctx: &Context<'_>,
        input: CheckInAttendeeInput,
    ) -> Result<CheckInAttendeeResult> {
        let loaders = ctx.data::<Loaders>()?;
        let (attendee, session) = futures::join!(
            loaders.attendee.load_optional(input.attendee_id),
            loaders.session.load_optional(input.session_id),
        );

        let Some(attendee) = attendee.extend()? else {
            return Ok(UserError::new(&["attendee_id"], "attendee does not exist").into());
        };
        if session.extend()?.is_none() {
            return Ok(UserError::new(&["session_id"], "session does not exist").into());
        }

        let db = ctx.data::<PgPool>()?;
        attendee.check_in(input.session_id, db).await?;
        loaders.attendee_checked_in(attendee.id, input.session_id);

        let events = ctx.data::<Events>()?;
        events.publish(Event::AttendeeCheckedIn {
            attendee_id: attendee.id,
            session_id: input.session_id,
        });

        Ok(attendee.into())
    }
}

/// Input fields for registering an attendee
#[derive(Debug, InputObject)]
struct RegisterAttendeeInput {
    /// The attendee's given name
    first_name: String,
    /// The attendee's family name
    last_name: String,
    /// A unique handle for the attendee
    username: String,
    /// Where to contact the attendee
    email_address: Option<String>,
}

/// Input fields for checking in to a session
#[derive(Debug, InputObject)]
struct CheckInAttendeeInput {
    /// The session being attended
    session_id: i32,
    /// The attendee checking in
    attendee_id: i32,
}
