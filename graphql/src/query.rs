use crate::paging::Window;
use async_graphql::{
    connection::{self, Connection},
    Context, Object, Result, ResultExt,
};
use database::{
    Attendee, Loaders, PgPool, Session, SessionFilter, SessionOrder, Speaker, SpeakerFilter,
    SpeakerOrder, Track, TrackFilter, TrackOrder,
};
use tracing::instrument;

pub struct Query;

#[Object]
impl Query {
    /// Page through the speakers
    #[instrument(name = "Query::speakers", skip(self, ctx))]
    #[allow(clippy::too_many_arguments)]
    async fn speakers(
        &self,
        ctx: &Context<'_>,
        after: Option<String>,
        before: Option<String>,
        first: Option<i32>,
        last: Option<i32>,
        #[graphql(name = "where", default)] filter: SpeakerFilter,
        #[graphql(default)] order: SpeakerOrder,
    ) -> Result<Connection<usize, Speaker>> {
        let db = ctx.data::<PgPool>()?;
        let loaders = ctx.data::<Loaders>()?;

        connection::query(
            after,
            before,
            first,
            last,
            |after: Option<usize>, before, first, last| async move {
                let total = Speaker::count(&filter, db).await?;
                let window = Window::new(total as usize, after, before, first, last);

                let speakers =
                    Speaker::page(&filter, order, window.offset as i64, window.limit as i64, db)
                        .await?;
                for speaker in &speakers {
                    loaders.speaker.prime(speaker.id, speaker.clone());
                }

                Ok::<_, async_graphql::Error>(window.connection(speakers))
            },
        )
        .await
    }

    /// Get a speaker by their ID
    #[instrument(name = "Query::speaker", skip(self, ctx))]
    async fn speaker(&self, ctx: &Context<'_>, id: i32) -> Result<Option<Speaker>> {
        let loaders = ctx.data::<Loaders>()?;
        let speaker = loaders.speaker.load_optional(id).await.extend()?;

        Ok(speaker)
    }

    /// Get many speakers by their IDs, in the order requested
    #[instrument(name = "Query::speakers_by_id", skip(self, ctx))]
    async fn speakers_by_id(&self, ctx: &Context<'_>, ids: Vec<i32>) -> Result<Vec<Option<Speaker>>> {
        let loaders = ctx.data::<Loaders>()?;
        let speakers = loaders.speaker.load_many(ids).await.extend()?;

        Ok(speakers)
    }

    /// Page through the sessions
    #[instrument(name = "Query::sessions", skip(self, ctx))]
    #[allow(clippy::too_many_arguments)]
    async fn sessions(
        &self,
        ctx: &Context<'_>,
        after: Option<String>,
        before: Option<String>,
        first: Option<i32>,
        last: Option<i32>,
        #[graphql(name = "where", default)] filter: SessionFilter,
        #[graphql(default)] order: SessionOrder,
    ) -> Result<Connection<usize, Session>> {
        let db = ctx.data::<PgPool>()?;
        let loaders = ctx.data::<Loaders>()?;

        connection::query(
            after,
            before,
            first,
            last,
            |after: Option<usize>, before, first, last| async move {
                let total = Session::count(&filter, db).await?;
                let window = Window::new(total as usize, after, before, first, last);

                let sessions =
                    Session::page(&filter, order, window.offset as i64, window.limit as i64, db)
                        .await?;
                for session in &sessions {
                    loaders.session.prime(session.id, session.clone());
                }

                Ok::<_, async_graphql::Error>(window.connection(sessions))
            },
        )
        .await
    }

    /// Get a session by it's ID
    #[instrument(name = "Query::session", skip(self, ctx))]
    async fn session(&self, ctx: &Context<'_>, id: i32) -> Result<Option<Session>> {
        let loaders = ctx.data::<Loaders>()?;
        let session = loaders.session.load_optional(id).await.extend()?;

        Ok(session)
    }

    /// Get many sessions by their IDs, in the order requested
    #[instrument(name = "Query::sessions_by_id", skip(self, ctx))]
    async fn sessions_by_id(&self, ctx: &Context<'_>, ids: Vec<i32>) -> Result<Vec<Option<Session>>> {
        let loaders = ctx.data::<Loaders>()?;
        let sessions = loaders.session.load_many(ids).await.extend()?;

        Ok(sessions)
    }

    /// Page through the tracks
    #[instrument(name = "Query::tracks", skip(self, ctx))]
    #[allow(clippy::too_many_arguments)]
    async fn tracks(
        &self,
        ctx: &Context<'_>,
        after: Option<String>,
        before: Option<String>,
        first: Option<i32>,
        last: Option<i32>,
        #[graphql(name = "where", default)] filter: TrackFilter,
        #[graphql(default)] order: TrackOrder,
    ) -> Result<Connection<usize, Track>> {
        let db = ctx.data::<PgPool>()?;
        let loaders = ctx.data::<Loaders>()?;

        connection::query(
            after,
            before,
            first,
            last,
            |after: Option<usize>, before, first, last| async move {
                let total = Track::count(&filter, db).await?;
                let window = Window::new(total as usize, after, before, first, last);

                let tracks =
                    Track::page(&filter, order, window.offset as i64, window.limit as i64, db)
                        .await?;
                for track in &tracks {
                    loaders.track.prime(track.id, track.clone());
                }

                Ok::<_, async_graphql::Error>(window.connection(tracks))
            },
        )
        .await
    }

    /// Get a track by it's ID
    #[instrument(name = "Query::track", skip(self, ctx))]
    async fn track(&self, ctx: &Context<'_>, id: i32) -> Result<Option<Track>> {
        let loaders = ctx.data::<Loaders>()?;
        let track = loaders.track.load_optional(id).await.extend()?;

        Ok(track)
    }

    /// Get a track by it's name
    #[instrument(name = "Query::track_by_name", skip(self, ctx))]
    async fn track_by_name(&self, ctx: &Context<'_>, name: String) -> Result<Option<Track>> {
        let db = ctx.data::<PgPool>()?;
        let track = Track::find_by_name(&name, db).await?;

        if let Some(track) = &track {
            let loaders = ctx.data::<Loaders>()?;
            loaders.track.prime(track.id, track.clone());
        }

        Ok(track)
    }

    /// Get all the attendees
    #[instrument(name = "Query::attendees", skip_all)]
    async fn attendees(&self, ctx: &Context<'_>) -> Result<Vec<Attendee>> {
        let db = ctx.data::<PgPool>()?;
        let attendees = Attendee::all(db).await?;

        Ok(attendees)
    }

    /// Get an attendee by their ID
    #[instrument(name = "Query::attendee", skip(self, ctx))]
    async fn attendee(&self, ctx: &Context<'_>, id: i32) -> Result<Option<Attendee>> {
        let loaders = ctx.data::<Loaders>()?;
        let attendee = loaders.attendee.load_optional(id).await.extend()?;

        Ok(attendee)
    }

    /// Get many attendees by their IDs, in the order requested
    #[instrument(name = "Query::attendees_by_id", skip(self, ctx))]
    async fn attendees_by_id(
        &self,
        ctx: &Context<'_>,
        ids: Vec<i32>,
    ) -> Result<Vec<Option<Attendee>>> {
        let loaders = ctx.data::<Loaders>()?;
        let attendees = loaders.attendee.load_many(ids).await.extend()?;

        Ok(attendees)
    }
}
