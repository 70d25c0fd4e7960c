use serde::{Deserialize, Serialize};

/// Listing shown in article lists and cached locally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub article_id: u64,
    /// Cover image URL, when the seller uploaded one.
    pub article_image: Option<String>,
    pub article_title: String,
    /// Display-ready price text.
    pub article_price: String,
    pub book_status: String,
    pub selling_location: String,
    pub chat_count: u32,
    pub favorite_count: u32,
    /// Server-formatted relative age ("3 minutes ago").
    pub before_time: String,
}

/// A favorite entry wrapping the favorited article.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub favorite_id: u64,
    pub article: Article,
}

/// Payload for adding a favorite.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AddFavorite {
    pub article_id: u64,
}

/// One chat message in a room history page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub sender_id: u64,
    pub sender_identity: String,
    pub content: String,
    pub created_date: String,
}

/// Chat room summary for the room list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoom {
    pub room_id: u64,
    pub article_id: u64,
    pub article_title: String,
    pub opponent_identity: String,
    pub last_content: Option<String>,
}

/// Transient cross-screen notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationEvent {
    pub title: String,
    pub message: String,
}

impl NotificationEvent {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}
