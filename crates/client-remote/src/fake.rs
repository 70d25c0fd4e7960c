use std::{
    collections::{HashMap, VecDeque},
    sync::{Mutex, MutexGuard, PoisonError},
};

use client_core::{AddFavorite, TransportResponse};
use serde::Serialize;
use serde_json::json;

use crate::{ArticleDto, ChatMessageDto, ChatRoomDto, FavoriteDto, MarketplaceApi};

/// In-process stand-in for the marketplace server.
///
/// Serves JSON bodies shaped like the real API, supports one-shot failure
/// injection, and counts requests.
#[derive(Debug, Default)]
pub struct InMemoryMarketplaceApi {
    state: Mutex<FakeState>,
}

#[derive(Debug, Default)]
struct FakeState {
    articles: Vec<ArticleDto>,
    my_article_ids: Vec<u64>,
    favorites: Vec<FavoriteDto>,
    next_favorite_id: u64,
    rooms: Vec<ChatRoomDto>,
    messages: HashMap<u64, Vec<ChatMessageDto>>,
    queued_failures: VecDeque<TransportResponse>,
    requests: usize,
}

impl InMemoryMarketplaceApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_articles(self, articles: Vec<ArticleDto>) -> Self {
        self.lock().articles = articles;
        self
    }

    /// Mark articles as authored by the signed-in user.
    pub fn with_my_articles(self, article_ids: Vec<u64>) -> Self {
        self.lock().my_article_ids = article_ids;
        self
    }

    pub fn with_room(self, room: ChatRoomDto, messages: Vec<ChatMessageDto>) -> Self {
        {
            let mut state = self.lock();
            state.messages.insert(room.room_id, messages);
            state.rooms.push(room);
        }
        self
    }

    /// Answer the next request with `response` instead of real data.
    pub fn fail_next(&self, response: TransportResponse) {
        self.lock().queued_failures.push_back(response);
    }

    pub fn request_count(&self) -> usize {
        self.lock().requests
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count the request and pop an injected failure, if any.
    fn begin(&self) -> (MutexGuard<'_, FakeState>, Option<TransportResponse>) {
        let mut state = self.lock();
        state.requests += 1;
        let failure = state.queued_failures.pop_front();
        (state, failure)
    }
}

fn json_ok<T: Serialize>(body: &T) -> TransportResponse {
    match serde_json::to_string(body) {
        Ok(encoded) => TransportResponse::ok(encoded),
        Err(_) => TransportResponse::with_status(500, None),
    }
}

fn json_error(status: u16, code: &str) -> TransportResponse {
    TransportResponse::with_status(status, Some(json!({ "code": code }).to_string()))
}

fn window<T: Clone>(items: &[T], offset: usize, limit: usize) -> Vec<T> {
    items.iter().skip(offset).take(limit).cloned().collect()
}

impl MarketplaceApi for InMemoryMarketplaceApi {
    async fn fetch_articles(&self, query: Option<&str>, page: u32, size: u32) -> TransportResponse {
        let (state, failure) = self.begin();
        if let Some(failure) = failure {
            return failure;
        }

        let needle = query.map(str::to_lowercase).filter(|q| !q.trim().is_empty());
        let matching: Vec<ArticleDto> = state
            .articles
            .iter()
            .filter(|article| {
                needle
                    .as_deref()
                    .is_none_or(|needle| article.article_title.to_lowercase().contains(needle))
            })
            .cloned()
            .collect();
        let offset = (page as usize).saturating_mul(size as usize);
        json_ok(&window(&matching, offset, size as usize))
    }

    async fn fetch_favorites(&self) -> TransportResponse {
        let (state, failure) = self.begin();
        if let Some(failure) = failure {
            return failure;
        }
        json_ok(&state.favorites)
    }

    async fn fetch_my_articles(&self) -> TransportResponse {
        let (state, failure) = self.begin();
        if let Some(failure) = failure {
            return failure;
        }
        let mine: Vec<&ArticleDto> = state
            .articles
            .iter()
            .filter(|article| state.my_article_ids.contains(&article.article_id))
            .collect();
        json_ok(&mine)
    }

    async fn add_favorite(&self, payload: &AddFavorite) -> TransportResponse {
        let (mut state, failure) = self.begin();
        if let Some(failure) = failure {
            return failure;
        }

        if state
            .favorites
            .iter()
            .any(|favorite| favorite.articles_response.article_id == payload.article_id)
        {
            return json_error(409, "ALREADY_EXISTS");
        }
        let Some(article) = state
            .articles
            .iter_mut()
            .find(|article| article.article_id == payload.article_id)
        else {
            return json_error(404, "NOT_FOUND");
        };
        article.favorite_count += 1;
        let article = article.clone();

        state.next_favorite_id += 1;
        let favorite_id = state.next_favorite_id;
        state.favorites.push(FavoriteDto {
            favorite_id,
            articles_response: article,
        });
        TransportResponse::with_status(201, None)
    }

    async fn remove_favorite(&self, favorite_id: u64) -> TransportResponse {
        let (mut state, failure) = self.begin();
        if let Some(failure) = failure {
            return failure;
        }

        let Some(idx) = state
            .favorites
            .iter()
            .position(|favorite| favorite.favorite_id == favorite_id)
        else {
            return json_error(404, "NOT_FOUND");
        };
        let removed = state.favorites.remove(idx);
        if let Some(article) = state
            .articles
            .iter_mut()
            .find(|article| article.article_id == removed.articles_response.article_id)
        {
            article.favorite_count = article.favorite_count.saturating_sub(1);
        }
        TransportResponse::with_status(204, None)
    }

    async fn fetch_messages(&self, room_id: u64, offset: u32, limit: u32) -> TransportResponse {
        let (state, failure) = self.begin();
        if let Some(failure) = failure {
            return failure;
        }

        match state.messages.get(&room_id) {
            Some(messages) => json_ok(&window(messages, offset as usize, limit as usize)),
            None => json_error(404, "NOT_FOUND"),
        }
    }

    async fn fetch_chat_rooms(&self) -> TransportResponse {
        let (state, failure) = self.begin();
        if let Some(failure) = failure {
            return failure;
        }
        json_ok(&state.rooms)
    }
}
