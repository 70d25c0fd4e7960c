use std::sync::Arc;

use client_core::{
    AddFavorite, Article, ChatRoom, ErrorCode, Favorite, NetworkResult, PaginationCursorEngine,
    PagingConfig, normalize, normalize_ack,
    paging::{DEFAULT_PAGE_SIZE, bounded_page_size},
};
use client_platform::{ArticleCache, CacheError};
use tracing::{debug, error, warn};

use crate::{
    ArticleDto, ArticlePageSource, ChatPageSource, ChatRoomDto, FavoriteDto, MarketplaceApi,
    into_domain,
};

/// Article listing, favorites and the local offline cache.
#[derive(Debug)]
pub struct ArticleRepository<A, C> {
    api: Arc<A>,
    cache: Arc<C>,
    page_size: u32,
}

impl<A, C> Clone for ArticleRepository<A, C> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            cache: Arc::clone(&self.cache),
            page_size: self.page_size,
        }
    }
}

impl<A, C> ArticleRepository<A, C>
where
    A: MarketplaceApi,
    C: ArticleCache + 'static,
{
    pub fn new(api: Arc<A>, cache: Arc<C>) -> Self {
        Self {
            api,
            cache,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = bounded_page_size(page_size);
        self
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// First page of the unfiltered article listing.
    pub async fn get_all_articles(&self) -> NetworkResult<Vec<Article>> {
        let response = self.api.fetch_articles(None, 0, self.page_size).await;
        normalize(response, into_domain::<ArticleDto, Article>)
    }

    /// Fresh engine over the article listing, optionally filtered by `query`.
    pub fn article_pages(
        &self,
        query: Option<String>,
    ) -> PaginationCursorEngine<ArticlePageSource<A>> {
        let source = ArticlePageSource::new(Arc::clone(&self.api), query, self.page_size);
        PaginationCursorEngine::new(source, PagingConfig::new(self.page_size))
    }

    pub async fn get_favorite_articles(&self) -> NetworkResult<Vec<Favorite>> {
        let response = self.api.fetch_favorites().await;
        normalize(response, into_domain::<FavoriteDto, Favorite>)
    }

    pub async fn add_favorite_article(&self, article_id: u64) -> NetworkResult<bool> {
        let response = self.api.add_favorite(&AddFavorite { article_id }).await;
        let result = normalize_ack(response);
        if let Some(code) = result.code() {
            debug!(article_id, %code, "add favorite rejected");
        }
        result
    }

    pub async fn delete_favorite_article(&self, favorite_id: u64) -> NetworkResult<bool> {
        let response = self.api.remove_favorite(favorite_id).await;
        let result = normalize_ack(response);
        if let Some(code) = result.code() {
            debug!(favorite_id, %code, "delete favorite rejected");
        }
        result
    }

    /// Articles listed by the signed-in user.
    pub async fn get_my_articles(&self) -> NetworkResult<Vec<Article>> {
        let response = self.api.fetch_my_articles().await;
        normalize(response, into_domain::<ArticleDto, Article>)
    }

    pub async fn get_local_articles(&self) -> NetworkResult<Vec<Article>> {
        self.with_cache("read", |cache| cache.read_articles()).await
    }

    pub async fn insert_local_articles(&self, articles: Vec<Article>) -> NetworkResult<bool> {
        self.with_cache("write", move |cache| {
            cache.write_articles(&articles).map(|()| true)
        })
        .await
    }

    /// Run a cache operation on the blocking pool and fold failures into
    /// [`ErrorCode::Unknown`].
    async fn with_cache<T, F>(&self, op: &'static str, f: F) -> NetworkResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&C) -> Result<T, CacheError> + Send + 'static,
    {
        let cache = Arc::clone(&self.cache);
        match tokio::task::spawn_blocking(move || f(&cache)).await {
            Ok(Ok(value)) => NetworkResult::Success(value),
            Ok(Err(err)) => {
                warn!(op, error = %err, "local article cache failed");
                NetworkResult::Error(ErrorCode::Unknown)
            }
            Err(err) => {
                error!(op, error = %err, "local article cache task failed");
                NetworkResult::Error(ErrorCode::Unknown)
            }
        }
    }
}

/// Chat rooms and per-room message history.
#[derive(Debug)]
pub struct ChatRepository<A> {
    api: Arc<A>,
    page_size: u32,
}

impl<A> Clone for ChatRepository<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            page_size: self.page_size,
        }
    }
}

impl<A: MarketplaceApi> ChatRepository<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = bounded_page_size(page_size);
        self
    }

    pub async fn get_chat_rooms(&self) -> NetworkResult<Vec<ChatRoom>> {
        let response = self.api.fetch_chat_rooms().await;
        normalize(response, into_domain::<ChatRoomDto, ChatRoom>)
    }

    pub fn message_pages(&self, room_id: u64) -> PaginationCursorEngine<ChatPageSource<A>> {
        let source = ChatPageSource::new(Arc::clone(&self.api), room_id, self.page_size);
        PaginationCursorEngine::new(source, PagingConfig::new(self.page_size))
    }
}

#[cfg(test)]
mod tests {
    use client_core::{LoadResult, TransportResponse};
    use client_platform::InMemoryArticleCache;

    use super::*;
    use crate::InMemoryMarketplaceApi;
    use crate::fake::tests::{article_dto, message_dto};

    fn seeded_api(count: u64) -> Arc<InMemoryMarketplaceApi> {
        let articles = (1..=count)
            .map(|id| article_dto(id, &format!("Book {id}")))
            .collect();
        Arc::new(InMemoryMarketplaceApi::new().with_articles(articles))
    }

    fn repository(
        api: Arc<InMemoryMarketplaceApi>,
    ) -> ArticleRepository<InMemoryMarketplaceApi, InMemoryArticleCache> {
        ArticleRepository::new(api, Arc::new(InMemoryArticleCache::default()))
    }

    fn unwrap_page<T: std::fmt::Debug>(result: LoadResult<T>) -> client_core::Page<T> {
        match result {
            LoadResult::Page(page) => page,
            other => panic!("expected a page, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn maps_every_listed_article() {
        let repo = repository(seeded_api(3));

        let articles = repo.get_all_articles().await.ok().expect("listing succeeds");
        let ids: Vec<u64> = articles.iter().map(|a| a.article_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(articles[1].article_title, "Book 2");
    }

    #[tokio::test]
    async fn server_error_code_is_surfaced() {
        let api = seeded_api(1);
        api.fail_next(TransportResponse::with_status(
            401,
            Some(r#"{"code":"AUTH_EXPIRED"}"#.to_owned()),
        ));
        let repo = repository(Arc::clone(&api));

        let result = repo.get_all_articles().await;
        assert_eq!(result.code(), Some(&ErrorCode::AuthExpired));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn local_cache_round_trip() {
        let repo = repository(seeded_api(2));
        let listed = repo.get_all_articles().await.ok().expect("listing succeeds");

        assert_eq!(
            repo.insert_local_articles(listed.clone()).await,
            NetworkResult::Success(true)
        );
        assert_eq!(repo.get_local_articles().await, NetworkResult::Success(listed));
    }

    #[tokio::test]
    async fn duplicate_favorite_reports_already_exists() {
        let repo = repository(seeded_api(2));

        assert_eq!(repo.add_favorite_article(2).await, NetworkResult::Success(true));
        let again = repo.add_favorite_article(2).await;
        assert_eq!(again.code(), Some(&ErrorCode::AlreadyExists));

        let favorites = repo
            .get_favorite_articles()
            .await
            .ok()
            .expect("favorites load");
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].article.article_id, 2);
        assert_eq!(favorites[0].article.favorite_count, 1);

        assert_eq!(
            repo.delete_favorite_article(favorites[0].favorite_id).await,
            NetworkResult::Success(true)
        );
        let missing = repo.delete_favorite_article(favorites[0].favorite_id).await;
        assert_eq!(missing.code(), Some(&ErrorCode::NotFound));
    }

    #[tokio::test]
    async fn my_articles_only_lists_own() {
        let api = Arc::new(
            InMemoryMarketplaceApi::new()
                .with_articles(vec![article_dto(1, "a"), article_dto(2, "b")])
                .with_my_articles(vec![2]),
        );
        let repo = repository(api);

        let mine = repo.get_my_articles().await.ok().expect("my articles load");
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].article_id, 2);
    }

    #[tokio::test]
    async fn article_pages_stop_after_empty_page() {
        let api = seeded_api(4);
        let repo = repository(Arc::clone(&api)).with_page_size(2);
        let mut pages = repo.article_pages(None);

        let first = unwrap_page(pages.load_next().await);
        assert_eq!(first.prev_cursor, None);
        assert_eq!(first.next_cursor, Some(2));
        let second = unwrap_page(pages.load_next().await);
        assert_eq!(second.prev_cursor, Some(0));
        let last = unwrap_page(pages.load_next().await);
        assert!(last.items.is_empty());
        assert!(last.is_terminal());

        assert_eq!(pages.load_next().await, LoadResult::Exhausted);
        assert_eq!(api.request_count(), 3);
        assert_eq!(pages.loaded_item_count(), 4);
    }

    #[tokio::test]
    async fn search_pages_filter_by_title() {
        let api = Arc::new(InMemoryMarketplaceApi::new().with_articles(vec![
            article_dto(1, "Rust Book"),
            article_dto(2, "Go Book"),
        ]));
        let repo = repository(api);
        let mut pages = repo.article_pages(Some("rust".to_owned()));

        let page = unwrap_page(pages.load_next().await);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].article_title, "Rust Book");
    }

    #[tokio::test]
    async fn chat_refresh_reloads_the_anchored_message() {
        let room = ChatRoomDto {
            room_id: 3,
            article_id: 1,
            article_title: "Rust Book".to_owned(),
            opponent_identity: "buyer".to_owned(),
            last_content: None,
        };
        let api = Arc::new(
            InMemoryMarketplaceApi::new().with_room(room, (0..14).map(message_dto).collect()),
        );
        let chats = ChatRepository::new(Arc::clone(&api));
        let mut pages = chats.message_pages(3);
        unwrap_page(pages.load_next().await);

        assert_eq!(pages.invalidate(Some(4)), Some(9));

        let mut contents = Vec::new();
        while let LoadResult::Page(page) = pages.load_next().await {
            contents.extend(page.items.into_iter().map(|message| message.content));
        }
        assert_eq!(contents.first().map(String::as_str), Some("message 0"));
        assert!(contents.iter().any(|content| content == "message 4"));
        assert_eq!(contents.len(), 14);
    }

    #[tokio::test]
    async fn chat_pages_retry_the_failed_cursor() {
        let room = ChatRoomDto {
            room_id: 7,
            article_id: 1,
            article_title: "Rust Book".to_owned(),
            opponent_identity: "seller".to_owned(),
            last_content: None,
        };
        let api = Arc::new(
            InMemoryMarketplaceApi::new().with_room(room, (0..3).map(message_dto).collect()),
        );
        let chats = ChatRepository::new(Arc::clone(&api)).with_page_size(2);

        let rooms = chats.get_chat_rooms().await.ok().expect("rooms load");
        assert_eq!(rooms[0].room_id, 7);

        let mut pages = chats.message_pages(7);
        unwrap_page(pages.load_next().await);

        api.fail_next(TransportResponse::unreachable());
        assert_eq!(pages.load_next().await, LoadResult::Error(ErrorCode::Unknown));
        assert_eq!(pages.pending_cursor(), Some(2));

        let retried = unwrap_page(pages.load_next().await);
        assert_eq!(retried.items.len(), 1);
        assert_eq!(retried.items[0].content, "message 2");
    }
}
