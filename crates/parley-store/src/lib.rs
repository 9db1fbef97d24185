pub mod seed;

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use parley_types::models::{Message, User};

pub use seed::{Seed, SeedChannel};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user {0} not found")]
    UserNotFound(String),
    #[error("channel {0} not found")]
    ChannelNotFound(String),
}

struct ChannelState {
    title: String,
    /// Ordered member list, fixed after seeding.
    members: Vec<String>,
    /// Append-only; messages are never edited, deleted or reordered.
    messages: Mutex<Vec<Message>>,
}

/// The authoritative in-memory chat state: users, channels and each channel's
/// append-only message sequence.
///
/// Topology (users, channels, membership) is fixed once the store is built
/// from its seed, so only the per-channel message vectors need locking —
/// one `Mutex` per channel keeps appends to different channels independent.
pub struct MessageStore {
    users: Vec<User>,
    users_by_id: HashMap<String, usize>,
    channels: HashMap<String, ChannelState>,
    /// Channel ids in seed order, for stable listing.
    channel_order: Vec<String>,
    next_message_id: AtomicU64,
}

impl MessageStore {
    pub fn from_seed(seed: Seed) -> Self {
        let users_by_id = seed
            .users
            .iter()
            .enumerate()
            .map(|(ix, u)| (u.id.clone(), ix))
            .collect();

        let mut channels = HashMap::new();
        let mut channel_order = Vec::new();
        for ch in seed.channels {
            channel_order.push(ch.id.clone());
            channels.insert(
                ch.id,
                ChannelState {
                    title: ch.title,
                    members: ch.members,
                    messages: Mutex::new(ch.messages),
                },
            );
        }

        info!(
            "Message store seeded: {} users, {} channels",
            seed.users.len(),
            channel_order.len()
        );

        Self {
            users: seed.users,
            users_by_id,
            channels,
            channel_order,
            next_message_id: AtomicU64::new(seed.next_message_id),
        }
    }

    // -- Messages --

    /// Create a message with a fresh id and the current timestamp and append
    /// it to the channel's sequence. Validation only — notifying subscribers
    /// is the caller's job.
    pub fn append(
        &self,
        channel_id: &str,
        author_id: &str,
        text: &str,
    ) -> Result<Message, StoreError> {
        if !self.users_by_id.contains_key(author_id) {
            return Err(StoreError::UserNotFound(author_id.to_string()));
        }
        let channel = self
            .channels
            .get(channel_id)
            .ok_or_else(|| StoreError::ChannelNotFound(channel_id.to_string()))?;

        let message = Message {
            id: format!("m{}", self.next_message_id.fetch_add(1, Ordering::SeqCst)),
            channel_id: channel_id.to_string(),
            author_id: author_id.to_string(),
            date: Utc::now(),
            text: text.to_string(),
        };

        channel
            .messages
            .lock()
            .expect("channel lock poisoned")
            .push(message.clone());

        Ok(message)
    }

    /// Snapshot of a channel's messages in append order.
    pub fn messages_of(&self, channel_id: &str) -> Result<Vec<Message>, StoreError> {
        let channel = self
            .channels
            .get(channel_id)
            .ok_or_else(|| StoreError::ChannelNotFound(channel_id.to_string()))?;
        Ok(channel
            .messages
            .lock()
            .expect("channel lock poisoned")
            .clone())
    }

    /// The newest message in the channel, `None` if nothing was posted yet.
    pub fn latest_message(&self, channel_id: &str) -> Result<Option<Message>, StoreError> {
        let channel = self
            .channels
            .get(channel_id)
            .ok_or_else(|| StoreError::ChannelNotFound(channel_id.to_string()))?;
        Ok(channel
            .messages
            .lock()
            .expect("channel lock poisoned")
            .last()
            .cloned())
    }

    // -- Channels --

    pub fn members_of(&self, channel_id: &str) -> Result<&[String], StoreError> {
        self.channels
            .get(channel_id)
            .map(|c| c.members.as_slice())
            .ok_or_else(|| StoreError::ChannelNotFound(channel_id.to_string()))
    }

    pub fn channel_title(&self, channel_id: &str) -> Option<&str> {
        self.channels.get(channel_id).map(|c| c.title.as_str())
    }

    pub fn has_channel(&self, channel_id: &str) -> bool {
        self.channels.contains_key(channel_id)
    }

    /// All channel ids in seed order.
    pub fn channel_ids(&self) -> &[String] {
        &self.channel_order
    }

    /// Channel ids (seed order) whose member list contains `user_id`.
    pub fn channels_of_member(&self, user_id: &str) -> Vec<String> {
        self.channel_order
            .iter()
            .filter(|id| {
                self.channels
                    .get(*id)
                    .is_some_and(|c| c.members.iter().any(|m| m == user_id))
            })
            .cloned()
            .collect()
    }

    // -- Users --

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn user(&self, user_id: &str) -> Option<&User> {
        self.users_by_id.get(user_id).map(|&ix| &self.users[ix])
    }
}
