use serde::{Deserialize, Serialize};

use crate::models::{Message, User};

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostMessageRequest {
    pub author_id: String,
    pub text: String,
}

// -- Channels --

#[derive(Debug, Serialize)]
pub struct ChannelResponse {
    pub id: String,
    /// Human-readable title of this channel
    pub title: String,
    pub members: Vec<User>,
    /// The newest message posted to this channel, if any
    pub latest_message: Option<Message>,
}

// -- Search --

/// One item of a search result page. The cursor is the message id and can be
/// passed back as `after` to resume immediately past this item.
#[derive(Debug, Clone, Serialize)]
pub struct SearchEdge {
    pub cursor: String,
    pub node: Message,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchConnection {
    pub edges: Vec<SearchEdge>,
    pub page_info: PageInfo,
}

impl SearchConnection {
    /// The result for a query that matched nothing, including the
    /// unknown-cursor case: no edges, no pages in either direction.
    pub fn empty() -> Self {
        Self {
            edges: Vec::new(),
            page_info: PageInfo {
                has_next_page: false,
                has_previous_page: false,
            },
        }
    }
}
