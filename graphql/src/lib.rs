use async_graphql::{
    extensions::{Analyzer, Tracing},
    Schema as BaseSchema, SchemaBuilder,
};
use database::PgPool;

mod events;
mod mutation;
mod paging;
mod query;
mod subscription;

pub use events::{Event, Events};
use mutation::Mutation;
use query::Query;
use subscription::Subscription;

/// The graphql schema for the service
pub type Schema = BaseSchema<Query, Mutation, Subscription>;

/// Create a schema builder with the necessary extensions
fn builder() -> SchemaBuilder<Query, Mutation, Subscription> {
    Schema::build(Query, Mutation::default(), Subscription)
        .extension(Tracing)
        .extension(Analyzer)
}

/// Build the schema with the necessary extensions
///
/// The request-scoped [`database::Loaders`] are not part of the schema, they must be attached to
/// every request, or every subscription connection, before it is executed.
pub fn schema(db: PgPool) -> Schema {
    builder().data(db).data(Events::default()).finish()
}

/// Export the GraphQL schema
pub fn sdl() -> String {
    builder().finish().sdl()
}

#[cfg(test)]
mod tests {
    use super::sdl;

    #[test]
    fn sdl_exposes_entities_and_relations() {
        let sdl = sdl();

        for ty in ["type Speaker", "type Session", "type Track", "type Attendee"] {
            assert!(sdl.contains(ty), "missing {ty}");
        }
        assert!(sdl.contains("abstract: String"));
        assert!(sdl.contains("speakers: [Speaker!]!"));
        assert!(sdl.contains("speakersById"));
        assert!(sdl.contains("checkInAttendee"));
    }

    #[test]
    fn sdl_exposes_paging_and_subscriptions() {
        let sdl = sdl();

        for ty in ["type SpeakerConnection", "type SessionConnection", "type TrackConnection"] {
            assert!(sdl.contains(ty), "missing {ty}");
        }
        assert!(sdl.contains("input SessionFilter"));
        assert!(sdl.contains("enum SortDirection"));
        assert!(sdl.contains("type Subscription"));
        assert!(sdl.contains("onSessionScheduled: Session!"));
        assert!(sdl.contains("onAttendeeCheckedIn(sessionId: Int!): SessionAttendeeCheckIn!"));
    }
}
