use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use serde::Deserialize;

use parley_store::MessageStore;
use parley_types::api::{PageInfo, SearchConnection, SearchEdge};
use parley_types::models::Message;

use crate::service::AppState;

/// Keyword search over the channels the requester is a member of, with
/// cursor-based pagination that stays stable while new messages arrive.
///
/// Stateless: every call works on a fresh snapshot of the candidate
/// channels' sequences, copied briefly under their per-channel locks.
pub struct SearchIndex {
    store: Arc<MessageStore>,
}

impl SearchIndex {
    pub fn new(store: Arc<MessageStore>) -> Self {
        Self { store }
    }

    /// Find messages containing `query` as a case-sensitive substring.
    ///
    /// Results are ordered newest first (ties broken by id, descending, so
    /// same-timestamp posts page deterministically) and resume immediately
    /// after the message named by `after`. An `after` id that is not in the
    /// result set yields the empty page rather than an error, as does a
    /// missing requester or one with no channel memberships. `first <= 0`
    /// yields no edges but is likewise not an error.
    pub fn search(
        &self,
        requester_id: Option<&str>,
        query: &str,
        first: i64,
        after: Option<&str>,
    ) -> SearchConnection {
        let Some(requester_id) = requester_id else {
            return SearchConnection::empty();
        };
        // An absent cursor and an empty one both mean "first page".
        let after = after.filter(|c| !c.is_empty());

        let mut candidates: Vec<Message> = Vec::new();
        for channel_id in self.store.channels_of_member(requester_id) {
            if let Ok(messages) = self.store.messages_of(&channel_id) {
                candidates.extend(messages.into_iter().filter(|m| m.text.contains(query)));
            }
        }

        candidates.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));

        let first_ix = match after {
            None => 0,
            Some(cursor) => match candidates.iter().position(|m| m.id == cursor) {
                Some(ix) => ix + 1,
                // Unknown cursor degrades to an empty page.
                None => return SearchConnection::empty(),
            },
        };

        let total = candidates.len() as i64;
        let edges: Vec<SearchEdge> = candidates
            .into_iter()
            .skip(first_ix)
            .take(first.max(0) as usize)
            .map(|m| SearchEdge {
                cursor: m.id.clone(),
                node: m,
            })
            .collect();

        SearchConnection {
            edges,
            page_info: PageInfo {
                has_previous_page: first_ix > 0,
                has_next_page: (first_ix as i64) + first < total,
            },
        }
    }
}

// -- HTTP handler --

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default = "default_first")]
    pub first: i64,
    pub after: Option<String>,
}

fn default_first() -> i64 {
    10
}

/// `GET /search/messages?q=&first=&after=` — the requester identity is the
/// opaque `x-user-id` header; without it, nothing is searched.
pub async fn search_messages(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
    headers: HeaderMap,
) -> Json<SearchConnection> {
    let requester_id = headers.get("x-user-id").and_then(|v| v.to_str().ok());
    Json(state.search(requester_id, &query.q, query.first, query.after.as_deref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use parley_store::{Seed, SeedChannel};
    use parley_types::models::User;

    fn store_with(channels: Vec<SeedChannel>) -> Arc<MessageStore> {
        Arc::new(MessageStore::from_seed(Seed {
            users: vec![
                User {
                    id: "u1".into(),
                    name: "Ada".into(),
                },
                User {
                    id: "u2".into(),
                    name: "Grace".into(),
                },
            ],
            channels,
            next_message_id: 10000,
        }))
    }

    fn empty_channel(id: &str, members: &[&str]) -> SeedChannel {
        SeedChannel {
            id: id.into(),
            title: id.into(),
            members: members.iter().map(|m| m.to_string()).collect(),
            messages: vec![],
        }
    }

    #[test]
    fn test_two_message_pagination_scenario() {
        // channel "general" has members {u1,u2}; u1 posts "hello" then
        // "hello world"; paging through with first=1 visits them newest
        // first with no overlap.
        let store = store_with(vec![empty_channel("c1", &["u1", "u2"])]);
        store.append("c1", "u1", "hello").unwrap();
        let second = store.append("c1", "u1", "hello world").unwrap();

        let index = SearchIndex::new(store);

        let page = index.search(Some("u1"), "hello", 1, None);
        assert_eq!(page.edges.len(), 1);
        assert_eq!(page.edges[0].node.text, "hello world");
        assert_eq!(page.edges[0].cursor, second.id);
        assert!(page.page_info.has_next_page);
        assert!(!page.page_info.has_previous_page);

        let next = index.search(Some("u1"), "hello", 1, Some(&page.edges[0].cursor));
        assert_eq!(next.edges.len(), 1);
        assert_eq!(next.edges[0].node.text, "hello");
        assert!(!next.page_info.has_next_page);
        assert!(next.page_info.has_previous_page);
    }

    #[test]
    fn test_empty_cursor_starts_at_first_page() {
        let store = store_with(vec![empty_channel("c1", &["u1"])]);
        store.append("c1", "u1", "hello").unwrap();

        // `GET /search/messages?after=` reaches the index as `Some("")`;
        // that is a first-page request, not an unknown cursor.
        let index = SearchIndex::new(store);
        let page = index.search(Some("u1"), "hello", 10, Some(""));
        assert_eq!(page.edges.len(), 1);
        assert_eq!(page.edges[0].node.text, "hello");
        assert!(!page.page_info.has_previous_page);
        assert!(!page.page_info.has_next_page);
    }

    #[test]
    fn test_unknown_cursor_yields_empty_page() {
        let store = store_with(vec![empty_channel("c1", &["u1"])]);
        store.append("c1", "u1", "hello").unwrap();

        let index = SearchIndex::new(store);
        let page = index.search(Some("u1"), "hello", 10, Some("nonexistent-id"));
        assert!(page.edges.is_empty());
        assert!(!page.page_info.has_next_page);
        assert!(!page.page_info.has_previous_page);
    }

    #[test]
    fn test_exact_page_size_has_no_next_page() {
        let store = store_with(vec![empty_channel("c1", &["u1"])]);
        for i in 0..10 {
            store.append("c1", "u1", &format!("match {}", i)).unwrap();
        }

        let index = SearchIndex::new(store);
        let page = index.search(Some("u1"), "match", 10, None);
        assert_eq!(page.edges.len(), 10);
        assert!(!page.page_info.has_next_page);
    }

    #[test]
    fn test_only_member_channels_are_searched() {
        let store = store_with(vec![
            empty_channel("c1", &["u1"]),
            empty_channel("c2", &["u2"]),
        ]);
        store.append("c1", "u1", "visible needle").unwrap();
        store.append("c2", "u2", "hidden needle").unwrap();

        let index = SearchIndex::new(store);
        let page = index.search(Some("u1"), "needle", 10, None);
        assert_eq!(page.edges.len(), 1);
        assert_eq!(page.edges[0].node.text, "visible needle");
    }

    #[test]
    fn test_search_is_case_sensitive() {
        let store = store_with(vec![empty_channel("c1", &["u1"])]);
        store.append("c1", "u1", "Hello there").unwrap();

        let index = SearchIndex::new(store);
        assert!(index.search(Some("u1"), "hello", 10, None).edges.is_empty());
        assert_eq!(index.search(Some("u1"), "Hello", 10, None).edges.len(), 1);
    }

    #[test]
    fn test_missing_requester_searches_nothing() {
        let store = store_with(vec![empty_channel("c1", &["u1"])]);
        store.append("c1", "u1", "hello").unwrap();

        let index = SearchIndex::new(store);
        let page = index.search(None, "hello", 10, None);
        assert!(page.edges.is_empty());
        assert!(!page.page_info.has_next_page);

        // Unknown requesters have no memberships and also see nothing.
        assert!(index.search(Some("u999"), "hello", 10, None).edges.is_empty());
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let store = store_with(vec![empty_channel("c1", &["u1"])]);
        store.append("c1", "u1", "alpha").unwrap();
        store.append("c1", "u1", "beta").unwrap();

        let index = SearchIndex::new(store);
        assert_eq!(index.search(Some("u1"), "", 10, None).edges.len(), 2);
    }

    #[test]
    fn test_nonpositive_first_yields_no_edges_but_reports_next_page() {
        let store = store_with(vec![empty_channel("c1", &["u1"])]);
        store.append("c1", "u1", "hello").unwrap();

        let index = SearchIndex::new(store);
        let page = index.search(Some("u1"), "hello", 0, None);
        assert!(page.edges.is_empty());
        assert!(page.page_info.has_next_page);
        assert!(!page.page_info.has_previous_page);
    }

    #[test]
    fn test_same_timestamp_posts_order_by_id_descending() {
        let date = chrono::Utc::now();
        let message = |id: &str, text: &str| Message {
            id: id.into(),
            channel_id: "c1".into(),
            author_id: "u1".into(),
            date,
            text: text.into(),
        };
        let store = store_with(vec![SeedChannel {
            id: "c1".into(),
            title: "c1".into(),
            members: vec!["u1".into()],
            messages: vec![message("m9000", "older id"), message("m9001", "newer id")],
        }]);

        let index = SearchIndex::new(store);
        let page = index.search(Some("u1"), "id", 10, None);
        let ids: Vec<&str> = page.edges.iter().map(|e| e.cursor.as_str()).collect();
        assert_eq!(ids, vec!["m9001", "m9000"]);
    }
}
