use std::sync::Arc;

use client_core::{Article, ChatMessage, Cursor, NetworkResult, Page, PageSource, normalize};
use tracing::trace;

use crate::{ArticleDto, ChatMessageDto, MarketplaceApi, into_domain};

/// Article search results paged by item offset.
///
/// The cursor is an item offset; the API is addressed by page index, so the
/// cursor is converted with `cursor / page_size`.
#[derive(Debug)]
pub struct ArticlePageSource<A> {
    api: Arc<A>,
    query: Option<String>,
    page_size: u32,
}

impl<A> ArticlePageSource<A> {
    pub fn new(api: Arc<A>, query: Option<String>, page_size: u32) -> Self {
        Self {
            api,
            query: query.filter(|q| !q.trim().is_empty()),
            page_size: page_size.max(1),
        }
    }
}

impl<A: MarketplaceApi> PageSource for ArticlePageSource<A> {
    type Item = Article;

    async fn fetch(&self, cursor: Cursor) -> NetworkResult<Page<Article>> {
        let page = cursor / self.page_size;
        trace!(cursor, page, query = ?self.query, "fetching article page");
        let response = self
            .api
            .fetch_articles(self.query.as_deref(), page, self.page_size)
            .await;
        normalize(response, into_domain::<ArticleDto, Article>)
            .map(|items| Page::at(cursor, self.page_size, items))
    }
}

/// Chat history of one room, paged by message offset.
#[derive(Debug)]
pub struct ChatPageSource<A> {
    api: Arc<A>,
    room_id: u64,
    page_size: u32,
}

impl<A> ChatPageSource<A> {
    pub fn new(api: Arc<A>, room_id: u64, page_size: u32) -> Self {
        Self {
            api,
            room_id,
            page_size: page_size.max(1),
        }
    }
}

impl<A: MarketplaceApi> PageSource for ChatPageSource<A> {
    type Item = ChatMessage;

    async fn fetch(&self, cursor: Cursor) -> NetworkResult<Page<ChatMessage>> {
        trace!(room_id = self.room_id, cursor, "fetching chat page");
        let response = self
            .api
            .fetch_messages(self.room_id, cursor, self.page_size)
            .await;
        normalize(response, into_domain::<ChatMessageDto, ChatMessage>)
            .map(|items| Page::at(cursor, self.page_size, items))
    }
}
