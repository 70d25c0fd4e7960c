//! Remote marketplace API capability and the repositories built on it.
//!
//! The HTTP transport itself is supplied by the host through [`MarketplaceApi`];
//! everything here maps its raw responses into typed results and page sequences.

use std::future::Future;

use client_core::{AddFavorite, Article, ChatMessage, ChatRoom, Favorite, TransportResponse};
use serde::{Deserialize, Serialize};

mod fake;
mod repository;
mod sources;

pub use fake::InMemoryMarketplaceApi;
pub use repository::{ArticleRepository, ChatRepository};
pub use sources::{ArticlePageSource, ChatPageSource};

/// Remote endpoints consumed by the client.
///
/// Every call resolves to a raw [`TransportResponse`]; connectivity failures are
/// reported as a response without status.
pub trait MarketplaceApi: Send + Sync + 'static {
    /// `GET /articles?search=&page=&size=`
    fn fetch_articles(
        &self,
        query: Option<&str>,
        page: u32,
        size: u32,
    ) -> impl Future<Output = TransportResponse> + Send;

    fn fetch_favorites(&self) -> impl Future<Output = TransportResponse> + Send;

    fn fetch_my_articles(&self) -> impl Future<Output = TransportResponse> + Send;

    fn add_favorite(&self, payload: &AddFavorite)
    -> impl Future<Output = TransportResponse> + Send;

    fn remove_favorite(&self, favorite_id: u64) -> impl Future<Output = TransportResponse> + Send;

    /// `GET /chat/rooms/{room_id}/messages?offset=&limit=`
    fn fetch_messages(
        &self,
        room_id: u64,
        offset: u32,
        limit: u32,
    ) -> impl Future<Output = TransportResponse> + Send;

    fn fetch_chat_rooms(&self) -> impl Future<Output = TransportResponse> + Send;
}

/// Article as returned on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArticleDto {
    pub article_id: u64,
    pub article_image: Option<String>,
    pub article_title: String,
    pub article_price: String,
    pub book_status: String,
    pub selling_location: String,
    pub chat_count: u32,
    pub favorite_count: u32,
    pub before_time: String,
}

impl From<ArticleDto> for Article {
    fn from(dto: ArticleDto) -> Self {
        Self {
            article_id: dto.article_id,
            article_image: dto.article_image,
            article_title: dto.article_title,
            article_price: dto.article_price,
            book_status: dto.book_status,
            selling_location: dto.selling_location,
            chat_count: dto.chat_count,
            favorite_count: dto.favorite_count,
            before_time: dto.before_time,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteDto {
    pub favorite_id: u64,
    pub articles_response: ArticleDto,
}

impl From<FavoriteDto> for Favorite {
    fn from(dto: FavoriteDto) -> Self {
        Self {
            favorite_id: dto.favorite_id,
            article: dto.articles_response.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageDto {
    pub sender_id: u64,
    pub sender_identity: String,
    pub content: String,
    pub created_date: String,
}

impl From<ChatMessageDto> for ChatMessage {
    fn from(dto: ChatMessageDto) -> Self {
        Self {
            sender_id: dto.sender_id,
            sender_identity: dto.sender_identity,
            content: dto.content,
            created_date: dto.created_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoomDto {
    pub room_id: u64,
    pub article_id: u64,
    pub article_title: String,
    pub opponent_identity: String,
    pub last_content: Option<String>,
}

impl From<ChatRoomDto> for ChatRoom {
    fn from(dto: ChatRoomDto) -> Self {
        Self {
            room_id: dto.room_id,
            article_id: dto.article_id,
            article_title: dto.article_title,
            opponent_identity: dto.opponent_identity,
            last_content: dto.last_content,
        }
    }
}

pub(crate) fn into_domain<D, T: From<D>>(dtos: Vec<D>) -> Vec<T> {
    dtos.into_iter().map(T::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_wire_article_fields() {
        let raw = r#"{
            "articleId": 3,
            "articleImage": null,
            "articleTitle": "Rust in Action",
            "articlePrice": "15,000",
            "bookStatus": "MIDDLE",
            "sellingLocation": "BUSAN",
            "chatCount": 2,
            "favoriteCount": 5,
            "beforeTime": "2 days ago"
        }"#;
        let dto: ArticleDto = serde_json::from_str(raw).expect("article should decode");
        let article = Article::from(dto);

        assert_eq!(article.article_id, 3);
        assert_eq!(article.article_title, "Rust in Action");
        assert_eq!(article.selling_location, "BUSAN");
        assert_eq!(article.favorite_count, 5);
    }

    #[test]
    fn favorite_unwraps_nested_article() {
        let raw = r#"{
            "favoriteId": 9,
            "articlesResponse": {
                "articleId": 4,
                "articleImage": "https://img.example.org/4.png",
                "articleTitle": "SICP",
                "articlePrice": "20,000",
                "bookStatus": "BEST",
                "sellingLocation": "SEOUL",
                "chatCount": 0,
                "favoriteCount": 1,
                "beforeTime": "now"
            }
        }"#;
        let favorite = Favorite::from(
            serde_json::from_str::<FavoriteDto>(raw).expect("favorite should decode"),
        );
        assert_eq!(favorite.favorite_id, 9);
        assert_eq!(favorite.article.article_id, 4);
        assert_eq!(
            favorite.article.article_image.as_deref(),
            Some("https://img.example.org/4.png")
        );
    }
}
