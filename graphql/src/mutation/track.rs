use super::{results, UserError};
use async_graphql::{Context, InputObject, Object, Result, ResultExt};
use database::{Loaders, PgPool, Track};
use tracing::instrument;

results! {
    AddTrackResult {
        /// The added track
        track: Track,
    }
    RenameTrackResult {
        /// The track
        track: Track,
    }
}

#[derive(Default)]
pub(crate) struct TrackMutation;

#[Object]
impl TrackMutation {
    /// Add a new track to schedule sessions in
    #[instrument(name = "Mutation::add_track", skip(self, ctx))]
    async fn add_track(&self, ctx: &Context<'_>, input: AddTrackInput) -> Result<AddTrackResult> {
        if input.name.is_empty() {
            return Ok(UserError::new(&["name"], "cannot be empty").into());
        }

        let db = ctx.data::<PgPool>()?;
        let track = Track::create(&input.name, db).await?;

        let loaders = ctx.data::<Loaders>()?;
        loaders.track.prime(track.id, track.clone());

        Ok(track.into())
    }

    /// Change the name of a track
    #[instrument(name = "Mutation::rename_track", skip(self, ctx))]
    async fn rename_track(
        &self,
        ctx: &Context<'_>,
        input: RenameTrackInput,
    ) -> Result<RenameTrackResult> {
        if input.name.is_empty() {
            return Ok(UserError::new(&["name"], "cannot be empty").into());
        }

        let loaders = ctx.data::<Loaders>()?;
        let Some(mut track) = loaders.track.load_optional(input.id).await.extend()? else {
            return Ok(UserError::new(&["id"], "track does not exist").into());
        };

        let db = ctx.data::<PgPool>()?;
        track.rename(input.name, db).await?;
        loaders.track_changed(&track);

        Ok(track.into())
    }
}

/// Input fields for adding a track
#[derive(Debug, InputObject)]
struct AddTrackInput {
    /// The name of the track
    name: String,
}

/// Input fields for renaming a track
#[derive(Debug, InputObject)]
struct RenameTrackInput {
    /// The ID of the track to rename
    id: i32,
    /// The new name
    name: String,
}
