use crate::events::{Event, Events};
use async_graphql::{ComplexObject, Context, Result, ResultExt, SimpleObject, Subscription};
use database::{Attendee, Loaders, Session};
use futures::{future, Stream, StreamExt};

pub struct Subscription;

#[Subscription]
impl Subscription {
    /// Sessions as they are placed in a track
    async fn on_session_scheduled(
        &self,
        ctx: &Context<'_>,
    ) -> Result<impl Stream<Item = Result<Session>>> {
        let loaders = ctx.data::<Loaders>()?.clone();
        let events = ctx.data::<Events>()?.subscribe();

        Ok(events.filter_map(move |event| {
            let loaders = loaders.clone();
            async move {
                let Event::SessionScheduled { session_id } = event else {
                    return None;
                };

                // each event sees the schedule as it is now
                loaders.clear();
                Some(loaders.session.load(session_id).await.extend())
            }
        }))
    }

    /// Attendees as they check in to a session
    async fn on_attendee_checked_in(
        &self,
        ctx: &Context<'_>,
        session_id: i32,
    ) -> Result<impl Stream<Item = SessionAttendeeCheckIn>> {
        let loaders = ctx.data::<Loaders>()?.clone();
        let events = ctx.data::<Events>()?.subscribe();

        Ok(events.filter_map(move |event| {
            let check_in = match event {
                Event::AttendeeCheckedIn {
                    attendee_id,
                    session_id: checked_in_to,
                } if checked_in_to == session_id => {
                    loaders.clear();
                    Some(SessionAttendeeCheckIn {
                        attendee_id,
                        session_id,
                    })
                }
                _ => None,
            };
            future::ready(check_in)
        }))
    }
}

/// An attendee checking in to a session
#[derive(Debug, SimpleObject)]
#[graphql(complex)]
pub struct SessionAttendeeCheckIn {
    /// The attendee who checked in
    attendee_id: i32,
    /// The session they checked in to
    session_id: i32,
}

#[ComplexObject]
impl SessionAttendeeCheckIn {
    /// How many attendees have checked in to the session so far
    async fn check_in_count(&self, ctx: &Context<'_>) -> Result<usize> {
        let loaders = ctx.data::<Loaders>()?;
        let attendees = loaders.attendees_for_session.load(self.session_id).await.extend()?;

        Ok(attendees.len())
    }

    /// The attendee who checked in
    async fn attendee(&self, ctx: &Context<'_>) -> Result<Attendee> {
        let loaders = ctx.data::<Loaders>()?;
        let attendee = loaders.attendee.load(self.attendee_id).await.extend()?;

        Ok(attendee)
    }

    /// The session they checked in to
    async fn session(&self, ctx: &Context<'_>) -> Result<Session> {
        let loaders = ctx.data::<Loaders>()?;
        let session = loaders.session.load(self.session_id).await.extend()?;

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use crate::events::{Event, Events};
    use async_graphql::{value, Request};
    use database::{Loaders, PgPool};
    use futures::StreamExt;
    use loader::Options;
    use std::time::Duration;

    #[tokio::test]
    async fn check_ins_are_filtered_by_session() {
        let events = Events::default();
        let schema = crate::builder().data(events.clone()).finish();

        let db = PgPool::connect_lazy("postgres://localhost/conference").unwrap();
        let request = Request::new(
            "subscription { onAttendeeCheckedIn(sessionId: 2) { attendeeId sessionId } }",
        )
        .data(Loaders::new(&db, Options::default()));

        let mut stream = Box::pin(schema.execute_stream(request));
        let publisher = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            events.publish(Event::AttendeeCheckedIn {
                attendee_id: 3,
                session_id: 1,
            });
            events.publish(Event::SessionScheduled { session_id: 2 });
            events.publish(Event::AttendeeCheckedIn {
                attendee_id: 4,
                session_id: 2,
            });
        };

        let (response, ()) = tokio::join!(stream.next(), publisher);
        let response = response.unwrap();
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        assert_eq!(
            response.data,
            value!({ "onAttendeeCheckedIn": { "attendeeId": 4, "sessionId": 2 } })
        );
    }

    #[tokio::test]
    async fn subscriptions_require_loaders() {
        let schema = crate::builder().data(Events::default()).finish();

        let query = "subscription { onSessionScheduled { id } }";
        let mut stream = Box::pin(schema.execute_stream(query));
        let response = stream.next().await.unwrap();

        assert_eq!(response.errors.len(), 1);
    }
}
