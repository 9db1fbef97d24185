pub mod channels;
pub mod error;
pub mod messages;
pub mod search;
pub mod service;
pub mod users;

pub use error::ApiError;
pub use search::SearchIndex;
pub use service::{AppState, ChatService};
