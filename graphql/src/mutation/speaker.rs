use super::{results, validators, UserError};
use async_graphql::{Context, InputObject, MaybeUndefined, Object, Result, ResultExt};
use database::{Loaders, PgPool, Speaker};
use tracing::instrument;

results! {
    AddSpeakerResult {
        /// The added speaker
        speaker: Speaker,
    }
    ModifySpeakerResult {
        /// The speaker
        speaker: Speaker,
    }
}

#[derive(Default)]
pub(crate) struct SpeakerMutation;

#[Object]
impl SpeakerMutation {
    /// Add a new speaker
    #[instrument(name = "Mutation::add_speaker", skip(self, ctx))]
    async fn add_speaker(
        &self,
        ctx: &Context<'_>,
        input: AddSpeakerInput,
    ) -> Result<AddSpeakerResult> {
        let mut user_errors = Vec::new();

        if input.name.is_empty() {
            user_errors.push(UserError::new(&["name"], "cannot be empty"));
        }

        if let Some(website) = &input.website {
            if !validators::url(website) {
                user_errors.push(UserError::new(&["website"], "must be a URL"));
            }
        }

        if !user_errors.is_empty() {
            return Ok(user_errors.into());
        }

        let db = ctx.data::<PgPool>()?;
        let speaker = Speaker::create(
            &input.name,
            input.bio.as_deref(),
            input.website.as_deref(),
            db,
        )
        .await?;

        let loaders = ctx.data::<Loaders>()?;
        loaders.speaker.prime(speaker.id, speaker.clone());

        Ok(speaker.into())
    }

    /// Update the details of a speaker
    #[instrument(name = "Mutation::modify_speaker", skip(self, ctx))]
    async fn modify_speaker(
        &self,
        ctx: &Context<'_>,
        input: ModifySpeakerInput,
    ) -> Result<ModifySpeakerResult> {
        let mut user_errors = Vec::new();

        if let Some(name) = &input.name {
            if name.is_empty() {
                user_errors.push(UserError::new(&["name"], "cannot be empty"));
            }
        }

        if let MaybeUndefined::Value(website) = &input.website {
            if !validators::url(website) {
                user_errors.push(UserError::new(&["website"], "must be a URL"));
            }
        }

        if !user_errors.is_empty() {
            return Ok(user_errors.into());
        }

        let loaders = ctx.data::<Loaders>()?;
        let Some(mut speaker) = loaders.speaker.load_optional(input.id).await.extend()? else {
            return Ok(UserError::new(&["id"], "speaker does not exist").into());
        };

        let db = ctx.data::<PgPool>()?;
        speaker
            .update()
            .override_name(input.name)
            .override_bio(input.bio.into())
            .override_website(input.website.into())
            .save(db)
            .await?;
        loaders.speaker_changed(&speaker);

        Ok(speaker.into())
    }
}

/// Input fields for adding a speaker
#[derive(Debug, InputObject)]
struct AddSpeakerInput {
    /// The speaker's full name
    name: String,
    /// A short biography
    bio: Option<String>,
    /// URL for the speaker's website
    website: Option<String>,
}

/// Input fields for updating a speaker
#[derive(Debug, InputObject)]
struct ModifySpeakerInput {
    /// The ID of the speaker to update
    id: i32,
    /// The speaker's full name
    name: Option<String>,
    /// A short biography
    bio: MaybeUndefined<String>,
    /// URL for the speaker's website
    website: MaybeUndefined<String>,
}
