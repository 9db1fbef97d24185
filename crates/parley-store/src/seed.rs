//! Demo dataset loaded at startup. All state is process-lifetime; restarting
//! the server resets everything to this seed.

use chrono::{Duration, Utc};

use parley_types::models::{Message, User};

pub struct Seed {
    pub users: Vec<User>,
    pub channels: Vec<SeedChannel>,
    /// First id handed out for newly posted messages. Must be above every
    /// seeded message id so issuance stays strictly increasing.
    pub next_message_id: u64,
}

pub struct SeedChannel {
    pub id: String,
    pub title: String,
    pub members: Vec<String>,
    pub messages: Vec<Message>,
}

fn user(id: &str, name: &str) -> User {
    User {
        id: id.into(),
        name: name.into(),
    }
}

/// The demo dataset. Seeded message dates are staggered a few minutes into
/// the past so freshly posted messages always sort newest.
pub fn demo() -> Seed {
    let now = Utc::now();
    let mut id = 9000u64;
    let mut minutes_ago = 120i64;

    let mut message = |channel_id: &str, author_id: &str, text: &str| {
        let m = Message {
            id: format!("m{}", id),
            channel_id: channel_id.into(),
            author_id: author_id.into(),
            date: now - Duration::minutes(minutes_ago),
            text: text.into(),
        };
        id += 1;
        minutes_ago -= 7;
        m
    };

    let channels = vec![
        SeedChannel {
            id: "c1".into(),
            title: "general".into(),
            members: vec!["u1".into(), "u2".into(), "u3".into(), "u6".into()],
            messages: vec![
                message("c1", "u1", "Welcome to general, say hi!"),
                message("c1", "u2", "hi everyone"),
                message("c1", "u3", "Anyone up for lunch later?"),
                message("c1", "u6", "lunch sounds good"),
            ],
        },
        SeedChannel {
            id: "c2".into(),
            title: "random".into(),
            members: vec!["u2".into(), "u4".into(), "u6".into()],
            messages: vec![
                message("c2", "u4", "found a great coffee place downtown"),
                message("c2", "u2", "share the address?"),
            ],
        },
        SeedChannel {
            id: "c3".into(),
            title: "engineering".into(),
            members: vec!["u1".into(), "u5".into(), "u6".into()],
            messages: vec![
                message("c3", "u5", "deploy went out without a hitch"),
                message("c3", "u1", "nice work"),
                message("c3", "u6", "reviewing the pagination change now"),
            ],
        },
        SeedChannel {
            id: "c4".into(),
            title: "announcements".into(),
            members: vec!["u1".into()],
            messages: vec![],
        },
    ];

    Seed {
        users: vec![
            user("u1", "Ada Lovelace"),
            user("u2", "Grace Hopper"),
            user("u3", "Alan Turing"),
            user("u4", "Edsger Dijkstra"),
            user("u5", "Barbara Liskov"),
            user("u6", "Donald Knuth"),
        ],
        channels,
        next_message_id: 10000,
    }
}
