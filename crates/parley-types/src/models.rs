use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    /// The readable name
    pub name: String,
}

/// A chat message. Immutable once created; the message id doubles as the
/// pagination cursor for search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    pub author_id: String,
    pub date: DateTime<Utc>,
    pub text: String,
}
