mod config;
mod logging;

use std::{process, sync::Arc, time::Duration};

use client_core::{
    ExitConfirmationTimer, ExitDecision, Lifecycle, LoadResult, NetworkResult,
    NotificationChannel, NotificationEvent, NotificationPresenter, RenderError, TransportResponse,
    lifecycle_channel, normalize_ack,
};
use client_platform::JsonFileArticleCache;
use client_remote::{
    ArticleDto, ArticleRepository, ChatMessageDto, ChatRepository, ChatRoomDto,
    InMemoryMarketplaceApi,
};
use tracing::{error, info, warn};

use crate::config::ClientConfig;

const DEMO_ROOM_ID: u64 = 1;

/// Presenter that renders notifications as log lines.
struct LogPresenter;

impl NotificationPresenter for LogPresenter {
    fn show(&self, event: &NotificationEvent) -> Result<(), RenderError> {
        info!(title = %event.title, message = %event.message, "notification shown");
        Ok(())
    }

    fn hide(&self) -> Result<(), RenderError> {
        info!("notification hidden");
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    logging::init();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "invalid configuration");
            process::exit(2);
        }
    };
    info!(?config, "starting marketplace client smoke run");

    let api = Arc::new(seeded_api());
    let cache = Arc::new(JsonFileArticleCache::new(&config.cache_path));
    let articles = ArticleRepository::new(Arc::clone(&api), cache)
        .with_page_size(config.paging.page_size);
    let chats = ChatRepository::new(Arc::clone(&api)).with_page_size(config.paging.page_size);

    browse_articles(&articles, config.search_query.clone()).await;
    toggle_favorite(&articles).await;
    read_chat(&chats).await;
    show_result_normalization();
    deliver_notifications(&config).await;
    confirm_exit(&config).await;

    info!(requests = api.request_count(), "smoke run complete");
}

fn seeded_api() -> InMemoryMarketplaceApi {
    let titles = [
        "Rust in Action",
        "The Rust Programming Language",
        "Programming Rust",
        "Zero To Production",
        "Designing Data-Intensive Applications",
        "Operating Systems: Three Easy Pieces",
        "Crafting Interpreters",
        "Rust for Rustaceans",
        "Database Internals",
        "Computer Networking",
        "Hands-on Rust",
        "Rust Atomics and Locks",
    ];
    let articles = titles
        .iter()
        .zip(1u64..)
        .map(|(title, id)| ArticleDto {
            article_id: id,
            article_image: None,
            article_title: (*title).to_owned(),
            article_price: format!("{},000", 8 + id),
            book_status: if id % 3 == 0 { "MIDDLE" } else { "BEST" }.to_owned(),
            selling_location: "SEOUL".to_owned(),
            chat_count: (id % 4) as u32,
            favorite_count: 0,
            before_time: format!("{id} hours ago"),
        })
        .collect();

    let room = ChatRoomDto {
        room_id: DEMO_ROOM_ID,
        article_id: 3,
        article_title: "Programming Rust".to_owned(),
        opponent_identity: "SELLER".to_owned(),
        last_content: Some("see you at the station".to_owned()),
    };
    let messages = (0..14u64)
        .map(|idx| ChatMessageDto {
            sender_id: idx % 2,
            sender_identity: if idx % 2 == 0 { "BUYER" } else { "SELLER" }.to_owned(),
            content: format!("message #{idx}"),
            created_date: format!("2024-03-01T10:{idx:02}:00"),
        })
        .collect();

    InMemoryMarketplaceApi::new()
        .with_articles(articles)
        .with_my_articles(vec![2, 5])
        .with_room(room, messages)
}

async fn browse_articles(
    repo: &ArticleRepository<InMemoryMarketplaceApi, JsonFileArticleCache>,
    query: Option<String>,
) {
    let mut pages = repo.article_pages(query);
    let mut fetched = Vec::new();
    loop {
        match pages.load_next().await {
            LoadResult::Page(page) => {
                info!(
                    items = page.items.len(),
                    prev = ?page.prev_cursor,
                    next = ?page.next_cursor,
                    "article page"
                );
                fetched.extend(page.items);
            }
            LoadResult::Exhausted => break,
            LoadResult::Error(code) => {
                warn!(%code, "article paging stopped");
                break;
            }
        }
    }
    info!(
        total = fetched.len(),
        refresh_key = ?pages.refresh_key(Some(fetched.len().saturating_sub(1))),
        "article listing loaded"
    );

    match repo.insert_local_articles(fetched).await {
        NetworkResult::Success(_) => {}
        NetworkResult::Error(code) => warn!(%code, "failed caching articles"),
    }
    if let NetworkResult::Success(local) = repo.get_local_articles().await {
        info!(cached = local.len(), "local article cache");
    }
    if let NetworkResult::Success(mine) = repo.get_my_articles().await {
        info!(count = mine.len(), "my articles");
    }
}

async fn toggle_favorite(repo: &ArticleRepository<InMemoryMarketplaceApi, JsonFileArticleCache>) {
    let added = repo.add_favorite_article(1).await;
    let repeated = repo.add_favorite_article(1).await;
    info!(?added, ?repeated, "favorite toggled twice");

    let NetworkResult::Success(favorites) = repo.get_favorite_articles().await else {
        return;
    };
    for favorite in favorites {
        let removed = repo.delete_favorite_article(favorite.favorite_id).await;
        info!(favorite_id = favorite.favorite_id, ?removed, "favorite removed");
    }
}

async fn read_chat(repo: &ChatRepository<InMemoryMarketplaceApi>) {
    if let NetworkResult::Success(rooms) = repo.get_chat_rooms().await {
        info!(rooms = rooms.len(), "chat rooms");
    }

    let mut pages = repo.message_pages(DEMO_ROOM_ID);
    while let LoadResult::Page(page) = pages.load_next().await {
        info!(
            room_id = DEMO_ROOM_ID,
            messages = page.items.len(),
            "chat page"
        );
    }
    info!(loaded = pages.loaded_item_count(), "chat history loaded");
}

fn show_result_normalization() {
    let samples = [
        TransportResponse::with_status(401, Some(r#"{"code":"AUTH_EXPIRED"}"#.to_owned())),
        TransportResponse::with_status(500, Some("<html>oops</html>".to_owned())),
        TransportResponse::unreachable(),
    ];
    for sample in samples {
        let status = sample.status;
        info!(?status, result = ?normalize_ack(sample), "normalized failure");
    }
}

async fn deliver_notifications(config: &ClientConfig) {
    let channel = NotificationChannel::new(config.channel);
    let (lifecycle, signal) = lifecycle_channel(Lifecycle::Background);
    let consumer = channel.attach_consumer(signal, LogPresenter);

    let events = [
        NotificationEvent::new("New chat", "A buyer sent you a message"),
        NotificationEvent::new("Price drop", "Rust in Action is now 9,000"),
        NotificationEvent::new("Favorite", "Someone liked your article"),
    ];
    let count = events.len() as u32;
    for event in events {
        if let Err(err) = channel.publish(event) {
            warn!(error = %err, "failed publishing notification");
        }
    }
    info!(pending = channel.pending(), "notifications queued while backgrounded");

    lifecycle.foreground();
    let timing = config.channel.timing;
    tokio::time::sleep((timing.display + timing.gap) * count + Duration::from_millis(100)).await;
    lifecycle.background();

    info!(
        pending = channel.pending(),
        state = ?consumer.state(),
        "notification drain finished"
    );
    channel.close();
    consumer.stop().await;
}

async fn confirm_exit(config: &ClientConfig) {
    let mut timer = ExitConfirmationTimer::new(config.exit);
    let first = timer.on_action();
    let second = timer.on_action();
    info!(?first, ?second, "back pressed twice inside the debounce interval");

    tokio::time::sleep(config.exit.debounce + Duration::from_millis(10)).await;
    if timer.on_action() == ExitDecision::Confirm {
        info!("exit confirmed");
    }
}
