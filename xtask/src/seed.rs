use chrono::{Duration, TimeZone, Utc};
use database::{Attendee, Session, Speaker, Track};
use eyre::{eyre, WrapErr};
use tracing::info;

/// (name, bio, website)
const SPEAKERS: &[(&str, &str, &str)] = &[
    (
        "Grace Hopper",
        "Compiler pioneer and rear admiral",
        "https://example.com/grace",
    ),
    (
        "Alan Kay",
        "Coined object-oriented programming",
        "https://example.com/alan",
    ),
    (
        "Barbara Liskov",
        "Data abstraction and distributed systems",
        "https://example.com/barbara",
    ),
];

/// (title, abstract, indexes into SPEAKERS)
const SESSIONS: &[(&str, &str, &[usize])] = &[
    (
        "Batching without tears",
        "Avoiding N+1 queries with per-request loaders",
        &[0],
    ),
    ("Messages all the way down", "Objects, revisited", &[1, 2]),
    ("Substitution in practice", "Behavioural subtyping today", &[2]),
];

/// (first name, last name, username, email)
const ATTENDEES: &[(&str, &str, &str, &str)] = &[
    ("Ferris", "Crab", "ferris", "ferris@example.com"),
    ("Corro", "Unsafe", "corro", "corro@example.com"),
];

pub async fn run(args: Args) -> eyre::Result<()> {
    let db = database::connect(&args.database_url).await?;

    let mut speakers = Vec::with_capacity(SPEAKERS.len());
    for (name, bio, website) in SPEAKERS {
        let speaker = Speaker::create(name, Some(*bio), Some(*website), &db)
            .await
            .wrap_err("failed to create speaker")?;
        speakers.push(speaker.id);
    }

    let main_stage = Track::create("Main stage", &db)
        .await
        .wrap_err("failed to create track")?;
    Track::create("Workshops", &db)
        .await
        .wrap_err("failed to create track")?;

    let day_start = Utc
        .with_ymd_and_hms(2024, 6, 3, 9, 0, 0)
        .single()
        .ok_or_else(|| eyre!("invalid conference start"))?;

    let mut sessions = Vec::with_capacity(SESSIONS.len());
    for (slot, (title, summary, presenters)) in SESSIONS.iter().enumerate() {
        let speaker_ids = presenters.iter().map(|&i| speakers[i]).collect::<Vec<_>>();
        let mut session = Session::create(title, Some(*summary), &speaker_ids, &db)
            .await
            .wrap_err("failed to create session")?;

        let start = day_start + Duration::hours(slot as i64);
        session
            .update()
            .schedule(main_stage.id, start, start + Duration::minutes(45))
            .save(&db)
            .await
            .wrap_err("failed to schedule session")?;
        sessions.push(session.id);
    }

    for (first_name, last_name, username, email) in ATTENDEES {
        let attendee = Attendee::create(first_name, last_name, username, Some(*email), &db)
            .await
            .wrap_err("failed to register attendee")?;

        for session_id in &sessions {
            attendee.check_in(*session_id, &db).await?;
        }
    }

    info!(
        speakers = speakers.len(),
        sessions = sessions.len(),
        attendees = ATTENDEES.len(),
        "seeded sample conference"
    );

    Ok(())
}

#[derive(clap::Args, Debug)]
pub struct Args {
    /// The database to fill
    #[arg(short, long, env = "DATABASE_URL")]
    database_url: String,
}
