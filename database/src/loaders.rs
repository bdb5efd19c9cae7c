use crate::{Attendee, PgPool, Session, Speaker, Track};
use async_trait::async_trait;
use loader::{prime_into, Fetch, GroupedLoader, Loader, Options, PrimeInto};
use std::collections::HashMap;

macro_rules! declare_loader {
    ($name:ident < $impl_name:ident > for $model:ty => $key:ident ( $key_type:ty )) => {
        declare_loader!(@fetch $impl_name for $model => $key($key_type) using load providing $model);

        #[doc = concat!("Batch and cache [`", stringify!($model), "`] lookups by ", stringify!($key))]
        pub type $name = Loader<$key_type, $impl_name>;

        impl $impl_name {
            #[doc = concat!("Create a new loader for [`", stringify!($model), "`]s")]
            #[inline(always)]
            fn new(db: &PgPool, options: Options) -> $name {
                Loader::with_options($impl_name(db.clone()), tokio::task::spawn, options)
            }
        }
    };
    ($name:ident < $impl_name:ident > for $model:ty => $key:ident ( $key_type:ty ) grouped using $method:ident priming $target:ident) => {
        declare_loader!(@fetch $impl_name for $model => $key($key_type) using $method providing Vec<$model>);

        #[doc = concat!("Batch and cache [`", stringify!($model), "`]s grouped by ", stringify!($key))]
        pub type $name = GroupedLoader<$key_type, PrimeInto<$impl_name, i32, $target>>;

        impl $impl_name {
            #[doc = concat!("Create a new loader for [`", stringify!($model), "`]s by ", stringify!($key), ", caching each one by ID in `by_id`")]
            #[inline(always)]
            fn new(db: &PgPool, options: Options, by_id: Loader<i32, $target>) -> $name {
                let fetch = prime_into($impl_name(db.clone()), by_id, |child: &$model| child.id);
                GroupedLoader::with_options(fetch, tokio::task::spawn, options)
            }
        }
    };
    (@fetch $impl_name:ident for $model:ty => $key:ident ( $key_type:ty ) using $method:ident providing $result:ty) => {
        #[doc = concat!("The batch fetch for [`", stringify!($model), "`]s")]
        pub struct $impl_name(PgPool);

        #[async_trait]
        impl Fetch<$key_type> for $impl_name {
            type Value = $result;
            type Error = $crate::Error;

            async fn fetch(
                &self,
                keys: &[$key_type],
            ) -> Result<HashMap<$key_type, Self::Value>, Self::Error> {
                <$model>::$method(keys, &self.0).await
            }
        }
    };
}

declare_loader!(AttendeeLoader<AttendeeLoaderImpl> for Attendee => id(i32));
declare_loader!(AttendeesForSessionLoader<AttendeesForSessionLoaderImpl> for Attendee => session_id(i32) grouped using load_for_sessions priming AttendeeLoaderImpl);
declare_loader!(SessionLoader<SessionLoaderImpl> for Session => id(i32));
declare_loader!(SessionsForAttendeeLoader<SessionsForAttendeeLoaderImpl> for Session => attendee_id(i32) grouped using load_for_attendees priming SessionLoaderImpl);
declare_loader!(SessionsForSpeakerLoader<SessionsForSpeakerLoaderImpl> for Session => speaker_id(i32) grouped using load_for_speakers priming SessionLoaderImpl);
declare_loader!(SessionsForTrackLoader<SessionsForTrackLoaderImpl> for Session => track_id(i32) grouped using load_for_tracks priming SessionLoaderImpl);
declare_loader!(SpeakerLoader<SpeakerLoaderImpl> for Speaker => id(i32));
declare_loader!(SpeakersForSessionLoader<SpeakersForSessionLoaderImpl> for Speaker => session_id(i32) grouped using load_for_sessions priming SpeakerLoaderImpl);
declare_loader!(TrackLoader<TrackLoaderImpl> for Track => id(i32));

/// Every loader, scoped to a single request
///
/// A new set must be created for each request so cached entities never leak between requests.
#[derive(Clone)]
pub struct Loaders {
    pub attendee: AttendeeLoader,
    pub attendees_for_session: AttendeesForSessionLoader,
    pub session: SessionLoader,
    pub sessions_for_attendee: SessionsForAttendeeLoader,
    pub sessions_for_speaker: SessionsForSpeakerLoader,
    pub sessions_for_track: SessionsForTrackLoader,
    pub speaker: SpeakerLoader,
    pub speakers_for_session: SpeakersForSessionLoader,
    pub track: TrackLoader,
}

impl Loaders {
    /// Create a fresh set of loaders
    ///
    /// Entities found through a relation are also cached in the loader that looks them up by ID.
    pub fn new(db: &PgPool, options: Options) -> Self {
        let attendee = AttendeeLoaderImpl::new(db, options);
        let session = SessionLoaderImpl::new(db, options);
        let speaker = SpeakerLoaderImpl::new(db, options);

        Self {
            attendees_for_session: AttendeesForSessionLoaderImpl::new(db, options, attendee.clone()),
            sessions_for_attendee: SessionsForAttendeeLoaderImpl::new(db, options, session.clone()),
            sessions_for_speaker: SessionsForSpeakerLoaderImpl::new(db, options, session.clone()),
            sessions_for_track: SessionsForTrackLoaderImpl::new(db, options, session.clone()),
            speakers_for_session: SpeakersForSessionLoaderImpl::new(db, options, speaker.clone()),
            track: TrackLoaderImpl::new(db, options),
            attendee,
            session,
            speaker,
        }
    }

    /// Cache a speaker that was just written
    pub fn speaker_changed(&self, speaker: &Speaker) {
        self.speaker.replace(speaker.id, speaker.clone());
        self.speakers_for_session.clear_all();
    }

    /// Cache a session that was just written
    ///
    /// Every cached list of sessions may hold the old version, so they are all dropped.
    pub fn session_changed(&self, session: &Session) {
        self.session.replace(session.id, session.clone());
        self.sessions_for_attendee.clear_all();
        self.sessions_for_speaker.clear_all();
        self.sessions_for_track.clear_all();
    }

    /// Cache a track that was just written
    pub fn track_changed(&self, track: &Track) {
        self.track.replace(track.id, track.clone());
    }

    /// Drop the cached relations changed by an attendee checking in to a session
    pub fn attendee_checked_in(&self, attendee_id: i32, session_id: i32) {
        self.sessions_for_attendee.clear(&attendee_id);
        self.attendees_for_session.clear(&session_id);
    }

    /// Forget every cached entity and relation
    ///
    /// Used by long-lived scopes, like a subscription, before resolving each new event.
    pub fn clear(&self) {
        self.attendee.clear_all();
        self.attendees_for_session.clear_all();
        self.session.clear_all();
        self.sessions_for_attendee.clear_all();
        self.sessions_for_speaker.clear_all();
        self.sessions_for_track.clear_all();
        self.speaker.clear_all();
        self.speakers_for_session.clear_all();
        self.track.clear_all();
    }

    /// Drop every batch that has not been dispatched yet
    ///
    /// The loaders reject any further loads.
    pub fn cancel(&self) {
        self.attendee.cancel();
        self.attendees_for_session.cancel();
        self.session.cancel();
        self.sessions_for_attendee.cancel();
        self.sessions_for_speaker.cancel();
        self.sessions_for_track.cancel();
        self.speaker.cancel();
        self.speakers_for_session.cancel();
        self.track.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::Loaders;
    use crate::{PgPool, Session, Speaker, Track};
    use loader::Options;

    fn loaders() -> Loaders {
        let db = PgPool::connect_lazy("postgres://localhost/conference").unwrap();
        Loaders::new(&db, Options::default())
    }

    fn session(title: &str) -> Session {
        Session {
            id: 1,
            title: String::from(title),
            summary: None,
            start_time: None,
            end_time: None,
            track_id: Some(3),
        }
    }

    #[tokio::test]
    async fn changed_session_replaces_cached_copy() {
        let loaders = loaders();
        assert!(loaders.session.prime(1, session("Before")));
        assert!(loaders.sessions_for_track.prime(3, vec![session("Before")]));
        assert!(loaders.sessions_for_speaker.prime(5, vec![session("Before")]));

        loaders.session_changed(&session("After"));

        assert_eq!(loaders.session.load(1).await.unwrap().title, "After");
        assert!(loaders.sessions_for_track.prime(3, vec![session("After")]));
        assert!(loaders.sessions_for_speaker.prime(5, vec![session("After")]));
    }

    #[tokio::test]
    async fn changed_speaker_replaces_cached_copy() {
        let loaders = loaders();
        let mut speaker = Speaker {
            id: 2,
            name: String::from("Ada"),
            bio: None,
            website: None,
        };
        assert!(loaders.speaker.prime(2, speaker.clone()));
        assert!(loaders.speakers_for_session.prime(1, vec![speaker.clone()]));

        speaker.name = String::from("Ada Lovelace");
        loaders.speaker_changed(&speaker);

        assert_eq!(loaders.speaker.load(2).await.unwrap().name, "Ada Lovelace");
        assert!(loaders.speakers_for_session.prime(1, vec![speaker]));
    }

    #[tokio::test]
    async fn renamed_track_replaces_cached_copy() {
        let loaders = loaders();
        let mut track = Track {
            id: 3,
            name: String::from("Main"),
        };
        assert!(loaders.track.prime(3, track.clone()));

        track.name = String::from("Main stage");
        loaders.track_changed(&track);

        assert_eq!(loaders.track.load(3).await.unwrap().name, "Main stage");
    }

    #[tokio::test]
    async fn check_in_drops_both_sides_of_the_relation() {
        let loaders = loaders();
        assert!(loaders.sessions_for_attendee.prime(4, Vec::new()));
        assert!(loaders.attendees_for_session.prime(1, Vec::new()));
        assert!(loaders.attendees_for_session.prime(2, Vec::new()));

        loaders.attendee_checked_in(4, 1);

        assert!(loaders.sessions_for_attendee.prime(4, Vec::new()));
        assert!(loaders.attendees_for_session.prime(1, Vec::new()));
        assert!(!loaders.attendees_for_session.prime(2, Vec::new()));
    }

    #[tokio::test]
    async fn clear_forgets_everything() {
        let loaders = loaders();
        assert!(loaders.session.prime(1, session("Cached")));
        assert!(loaders.sessions_for_track.prime(3, Vec::new()));

        loaders.clear();

        assert!(loaders.session.prime(1, session("Cached")));
        assert!(loaders.sessions_for_track.prime(3, Vec::new()));
    }
}
