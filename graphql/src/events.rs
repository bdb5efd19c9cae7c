use futures::{stream, Stream};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

/// How many events a slow subscriber may fall behind before it starts missing some
const CAPACITY: usize = 64;

/// Something that happened to the conference schedule
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Event {
    /// A session was placed in a track
    SessionScheduled { session_id: i32 },
    /// An attendee checked in to a session
    AttendeeCheckedIn { attendee_id: i32, session_id: i32 },
}

/// Fans events out from mutations to every open subscription
#[derive(Clone)]
pub struct Events(broadcast::Sender<Event>);

impl Default for Events {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(CAPACITY);
        Self(sender)
    }
}

impl Events {
    /// Notify every subscriber of an event
    pub fn publish(&self, event: Event) {
        match self.0.send(event) {
            Ok(subscribers) => debug!(?event, subscribers, "published event"),
            Err(_) => debug!(?event, "no subscribers for event"),
        }
    }

    /// Receive every event published from now on
    pub fn subscribe(&self) -> impl Stream<Item = Event> {
        stream::unfold(self.0.subscribe(), |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => return Some((event, receiver)),
                    Err(RecvError::Lagged(skipped)) => warn!(skipped, "subscriber fell behind"),
                    Err(RecvError::Closed) => return None,
                }
            }
        })
    }
}
