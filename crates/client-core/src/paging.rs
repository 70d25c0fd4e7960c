use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::error::{ErrorCode, NetworkResult};

/// Opaque position in a remote paginated collection.
pub type Cursor = u32;

/// Default number of items requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 10;
/// Hard cap on the number of items requested per page.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Clamp a requested page size against the safety cap.
///
/// The result is always in `1..=MAX_PAGE_SIZE`.
pub fn bounded_page_size(requested: u32) -> u32 {
    requested.clamp(1, MAX_PAGE_SIZE)
}

/// Cursor contract shared by a page source and its engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagingConfig {
    /// Cursor used for the first fetch and after a keyless refresh.
    pub initial_cursor: Cursor,
    /// Items per page; also the cursor step.
    pub page_size: u32,
}

impl PagingConfig {
    /// Start at cursor 0 with a clamped page size.
    pub fn new(page_size: u32) -> Self {
        Self {
            initial_cursor: 0,
            page_size: bounded_page_size(page_size),
        }
    }

    /// Start from `initial_cursor` instead of 0.
    pub fn with_initial_cursor(mut self, initial_cursor: Cursor) -> Self {
        self.initial_cursor = initial_cursor;
        self
    }
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

/// One fetched batch of items plus its neighbouring cursors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub prev_cursor: Option<Cursor>,
    /// `None` marks the terminal page.
    pub next_cursor: Option<Cursor>,
}

impl<T> Page<T> {
    /// Build a page; an empty page never carries a forward cursor.
    pub fn new(items: Vec<T>, prev_cursor: Option<Cursor>, next_cursor: Option<Cursor>) -> Self {
        let next_cursor = if items.is_empty() { None } else { next_cursor };
        Self {
            items,
            prev_cursor,
            next_cursor,
        }
    }

    /// Page fetched at `cursor` from a collection stepped by `step`.
    pub fn at(cursor: Cursor, step: u32, items: Vec<T>) -> Self {
        let prev_cursor = (cursor > 0).then(|| cursor.saturating_sub(step));
        Self::new(items, prev_cursor, cursor.checked_add(step))
    }

    /// Whether no further page follows this one.
    pub fn is_terminal(&self) -> bool {
        self.next_cursor.is_none()
    }
}

/// Capability that fetches one page at a cursor.
///
/// Fetches must be idempotent: the engine re-issues the same cursor after a
/// failure.
pub trait PageSource: Send + Sync {
    type Item: Send;

    fn fetch(&self, cursor: Cursor) -> impl Future<Output = NetworkResult<Page<Self::Item>>> + Send;
}

/// Outcome of [`PaginationCursorEngine::load_next`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadResult<T> {
    /// A page was fetched.
    Page(Page<T>),
    /// Forward pagination already ended; nothing was fetched.
    Exhausted,
    /// The fetch failed; cursor state is unchanged.
    Error(ErrorCode),
}

/// Cursor metadata retained for each page delivered since the last restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBounds {
    pub cursor: Cursor,
    pub prev_cursor: Option<Cursor>,
    pub next_cursor: Option<Cursor>,
    pub item_count: usize,
}

/// Forward cursor engine over a [`PageSource`].
///
/// One engine serves one screen; it is driven sequentially through `&mut self`.
#[derive(Debug)]
pub struct PaginationCursorEngine<S> {
    source: S,
    config: PagingConfig,
    pending: Option<Cursor>,
    pages: Vec<PageBounds>,
}

impl<S: PageSource> PaginationCursorEngine<S> {
    /// Engine that fetches its first page at `config.initial_cursor`.
    pub fn new(source: S, config: PagingConfig) -> Self {
        Self {
            source,
            pending: Some(config.initial_cursor),
            config,
            pages: Vec::new(),
        }
    }

    /// Cursor contract the engine was built with.
    pub fn config(&self) -> PagingConfig {
        self.config
    }

    /// Underlying page source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Cursor the next `load_next` call will fetch, if any.
    pub fn pending_cursor(&self) -> Option<Cursor> {
        self.pending
    }

    /// Whether forward pagination has ended.
    pub fn is_exhausted(&self) -> bool {
        self.pending.is_none()
    }

    /// Pages delivered since the last restart, in load order.
    pub fn loaded_pages(&self) -> &[PageBounds] {
        &self.pages
    }

    /// Total items across [`Self::loaded_pages`].
    pub fn loaded_item_count(&self) -> usize {
        self.pages.iter().map(|page| page.item_count).sum()
    }

    /// Fetch the page at the pending cursor and advance past it.
    pub async fn load_next(&mut self) -> LoadResult<S::Item> {
        let Some(cursor) = self.pending else {
            trace!("pagination exhausted; not fetching");
            return LoadResult::Exhausted;
        };

        match self.source.fetch(cursor).await {
            NetworkResult::Success(page) => LoadResult::Page(self.accept(cursor, page)),
            NetworkResult::Error(code) => {
                warn!(cursor, code = %code, "page fetch failed");
                LoadResult::Error(code)
            }
        }
    }

    /// Resumption cursor for a list anchored at item `anchor_position`.
    ///
    /// Prefers `prev_cursor + 1` of the page containing the anchor, then
    /// `next_cursor - 1`. `None` restarts from the initial cursor.
    pub fn refresh_key(&self, anchor_position: Option<usize>) -> Option<Cursor> {
        let page = self.closest_page_to(anchor_position?)?;
        page.prev_cursor
            .map(|prev| prev.saturating_add(1))
            .or_else(|| page.next_cursor.and_then(|next| next.checked_sub(1)))
    }

    /// Drop delivered pages and resume from the refresh key for `anchor_position`.
    ///
    /// The refresh key is rounded down to the start of its page, so the page
    /// holding the key is reloaded in full. Returns the unrounded refresh key.
    pub fn invalidate(&mut self, anchor_position: Option<usize>) -> Option<Cursor> {
        let key = self.refresh_key(anchor_position);
        let resume_at = key.map_or(self.config.initial_cursor, |key| self.page_start(key));
        debug!(?anchor_position, resume_at, "invalidating pagination");
        self.pages.clear();
        self.pending = Some(resume_at);
        key
    }

    /// Restart from the initial cursor.
    pub fn reset(&mut self) {
        self.pages.clear();
        self.pending = Some(self.config.initial_cursor);
    }

    fn accept(&mut self, cursor: Cursor, mut page: Page<S::Item>) -> Page<S::Item> {
        if page.items.is_empty() {
            page.next_cursor = None;
        }
        if let Some(next) = page.next_cursor
            && next <= cursor
        {
            warn!(cursor, next, "page source returned a non-advancing cursor; ending pagination");
            page.next_cursor = None;
        }

        debug!(
            cursor,
            items = page.items.len(),
            next = ?page.next_cursor,
            "loaded page"
        );

        self.pages.push(PageBounds {
            cursor,
            prev_cursor: page.prev_cursor,
            next_cursor: page.next_cursor,
            item_count: page.items.len(),
        });
        self.pending = page.next_cursor;
        page
    }

    /// Start of the page containing `cursor` on the grid anchored at the initial cursor.
    fn page_start(&self, cursor: Cursor) -> Cursor {
        let initial = self.config.initial_cursor;
        if cursor <= initial {
            return initial;
        }
        cursor - (cursor - initial) % self.config.page_size
    }

    fn closest_page_to(&self, anchor_position: usize) -> Option<&PageBounds> {
        let mut start = 0;
        for page in &self.pages {
            let end = start + page.item_count;
            if anchor_position < end {
                return Some(page);
            }
            start = end;
        }
        self.pages.last()
    }
}
