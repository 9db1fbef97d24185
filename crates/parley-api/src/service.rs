use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::info;

use parley_gateway::Broadcaster;
use parley_store::{MessageStore, StoreError};
use parley_types::api::{ChannelResponse, SearchConnection};
use parley_types::models::{Message, User};

use crate::search::SearchIndex;

pub type AppState = Arc<ChatService>;

/// Orchestrates mutations and reads against the store and the broadcaster.
///
/// This is the only component that mutates a channel's message sequence:
/// `post_message` validates, appends, then publishes, in that order. The two
/// steps are serialized per channel so every subscriber sees a channel's
/// messages in append order.
pub struct ChatService {
    store: Arc<MessageStore>,
    broadcaster: Broadcaster,
    search: SearchIndex,
    post_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ChatService {
    pub fn new(store: Arc<MessageStore>, broadcaster: Broadcaster) -> Self {
        Self {
            search: SearchIndex::new(store.clone()),
            store,
            broadcaster,
            post_locks: Mutex::new(HashMap::new()),
        }
    }

    fn post_lock(&self, channel_id: &str) -> Arc<Mutex<()>> {
        self.post_locks
            .lock()
            .expect("post lock registry poisoned")
            .entry(channel_id.to_string())
            .or_default()
            .clone()
    }

    // -- Mutation --

    /// Post a message: validate author and channel, append, publish.
    ///
    /// `NotFound` means nothing was applied — no append, no publish. The
    /// critical section covers append and publish together; both are cheap
    /// and non-blocking (`publish` only ever `try_send`s).
    pub fn post_message(
        &self,
        channel_id: &str,
        author_id: &str,
        text: &str,
    ) -> Result<Message, StoreError> {
        let lock = self.post_lock(channel_id);
        let _guard = lock.lock().expect("post lock poisoned");

        let message = self.store.append(channel_id, author_id, text)?;
        self.broadcaster.publish(&message);

        info!(
            "message {} posted to channel {} by {}",
            message.id, channel_id, author_id
        );
        Ok(message)
    }

    // -- Queries --

    pub fn search(
        &self,
        requester_id: Option<&str>,
        query: &str,
        first: i64,
        after: Option<&str>,
    ) -> SearchConnection {
        self.search.search(requester_id, query, first, after)
    }

    /// All channels, or only those containing `member_id` if given.
    pub fn channels(&self, member_id: Option<&str>) -> Vec<ChannelResponse> {
        let ids = match member_id {
            Some(member_id) => self.store.channels_of_member(member_id),
            None => self.store.channel_ids().to_vec(),
        };
        ids.iter()
            .filter_map(|id| self.channel(id).ok())
            .collect()
    }

    pub fn channel(&self, channel_id: &str) -> Result<ChannelResponse, StoreError> {
        let title = self
            .store
            .channel_title(channel_id)
            .ok_or_else(|| StoreError::ChannelNotFound(channel_id.to_string()))?;
        let members = self
            .store
            .members_of(channel_id)?
            .iter()
            .filter_map(|id| self.store.user(id).cloned())
            .collect();

        Ok(ChannelResponse {
            id: channel_id.to_string(),
            title: title.to_string(),
            members,
            latest_message: self.store.latest_message(channel_id)?,
        })
    }

    pub fn messages(&self, channel_id: &str) -> Result<Vec<Message>, StoreError> {
        self.store.messages_of(channel_id)
    }

    pub fn users(&self) -> Vec<User> {
        self.store.users().to_vec()
    }

    pub fn user(&self, user_id: &str) -> Result<User, StoreError> {
        self.store
            .user(user_id)
            .cloned()
            .ok_or_else(|| StoreError::UserNotFound(user_id.to_string()))
    }
}
