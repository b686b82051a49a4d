//! Pagination over one category at a time.
//!
//! The controller presents the selected category as a single growing list
//! backed by cached pages. It stores only page numbers, never pages, so a
//! page evicted from the cache is loaded again the next time the list is
//! read instead of silently vanishing.
//!
//! Every selection starts a new session with a fresh epoch. A load that
//! completes after its session was replaced is discarded; its page may
//! still land in the cache, keyed by its own category, where it is harmless.
//!
//! Load-more requests are serialized: while one is in flight further calls
//! are no-ops, so pages are always applied in page order.

mod types;

pub use types::{ItemsView, PageLayout, SessionSnapshot, SessionState};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, info};

use crate::cache::ShardCache;
use crate::loader::{LoadHandle, LoadedPage, ShardError, ShardLoader};
use crate::metrics::STALE_RESULTS_DISCARDED;

/// Errors from pagination operations.
#[derive(Debug, Error)]
pub enum PaginationError {
    /// `load_more` was called before any category was selected.
    #[error("No category selected")]
    NoActiveCategory,

    /// The result belonged to a session that has since been replaced.
    #[error("Session for category {category} was superseded")]
    Superseded { category: String },

    #[error(transparent)]
    Shard(#[from] ShardError),
}

#[derive(Debug)]
struct Session {
    epoch: u64,
    layout: Option<PageLayout>,
    pages_loaded: u32,
    state: SessionState,
    prefetch: Option<LoadHandle>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            epoch: 0,
            layout: None,
            pages_loaded: 0,
            state: SessionState::Idle,
            prefetch: None,
        }
    }
}

/// Drives page loading for the selected category.
#[derive(Debug)]
pub struct PaginationController {
    cache: Arc<ShardCache>,
    loader: ShardLoader,
    session: Mutex<Session>,
}

impl PaginationController {
    pub fn new(cache: Arc<ShardCache>, loader: ShardLoader) -> Self {
        Self {
            cache,
            loader,
            session: Mutex::new(Session::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn discard(&self, category: &str) -> PaginationError {
        STALE_RESULTS_DISCARDED.inc();
        debug!(category = %category, "Discarding result of superseded session");
        PaginationError::Superseded {
            category: category.to_string(),
        }
    }

    fn error_state(page: u32, error: &ShardError) -> SessionState {
        SessionState::Error {
            page,
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }

    /// Start a new session on `layout.category_id` and load its first page.
    ///
    /// The layout comes from the index. If another category is selected
    /// before this load completes, this call returns
    /// [`PaginationError::Superseded`] and leaves the new session untouched.
    pub async fn select_category(&self, layout: PageLayout) -> Result<ItemsView, PaginationError> {
        let key = layout.key(1);
        let page_count = layout.page_count;
        let epoch = {
            let mut session = self.lock();
            if let Some(stale) = session.prefetch.take() {
                stale.abort();
            }
            session.epoch += 1;
            session.layout = Some(layout);
            session.pages_loaded = 0;
            session.state = SessionState::Loading { page: 1 };
            session.epoch
        };
        info!(category = %key.category_id, pages = page_count, "Selected category");

        let result = self.cache.get_or_load(&self.loader, &key, page_count).await;

        let mut session = self.lock();
        if session.epoch != epoch {
            drop(session);
            return Err(self.discard(&key.category_id));
        }
        match result {
            Ok(page) => {
                session.pages_loaded = 1;
                session.state = if page_count <= 1 {
                    SessionState::Exhausted
                } else {
                    SessionState::Ready
                };
                Ok(ItemsView::new(vec![page]))
            }
            Err(e) => {
                session.state = Self::error_state(1, &e);
                Err(e.into())
            }
        }
    }

    /// Load the next page of the active category and return the grown list.
    ///
    /// A no-op returning the current list when the category is exhausted
    /// or a load is already in flight. After a failure the loaded pages
    /// stay visible and calling again retries the failed page.
    pub async fn load_more(&self) -> Result<ItemsView, PaginationError> {
        let plan = {
            let mut session = self.lock();
            let layout = session
                .layout
                .clone()
                .ok_or(PaginationError::NoActiveCategory)?;

            if session.state.is_loading() || session.state == SessionState::Exhausted {
                None
            } else {
                let next = session.pages_loaded + 1;
                if next > layout.page_count {
                    session.state = SessionState::Exhausted;
                    None
                } else {
                    session.state = if next == 1 {
                        SessionState::Loading { page: 1 }
                    } else {
                        SessionState::LoadingMore { page: next }
                    };
                    let key = layout.key(next);
                    let adopted = match session.prefetch.take() {
                        Some(handle) if handle.key() == &key => Some(handle),
                        Some(handle) => {
                            handle.abort();
                            None
                        }
                        None => None,
                    };
                    Some((session.epoch, next, key, layout.page_count, adopted))
                }
            }
        };

        let Some((epoch, next, key, page_count, adopted)) = plan else {
            return self.current_items().await;
        };

        let result = match adopted {
            Some(handle) => self.adopt(handle, page_count).await,
            None => {
                self.cache
                    .get_or_load(&self.loader, &key, page_count)
                    .await
            }
        };

        {
            let mut guard = self.lock();
            if guard.epoch != epoch {
                drop(guard);
                return Err(self.discard(&key.category_id));
            }
            let session = &mut *guard;
            let Some(layout) = session.layout.as_mut() else {
                return Err(PaginationError::NoActiveCategory);
            };
            match result {
                Ok(_) => {
                    session.pages_loaded = next;
                    session.state = if next >= layout.page_count {
                        SessionState::Exhausted
                    } else {
                        SessionState::Ready
                    };
                }
                // Series pages ran out early; the movies page moves up behind them.
                Err(ShardError::NotFound { .. })
                    if layout.movies_page.is_some() && !key.is_movies() =>
                {
                    info!(shard = %key, movies_page = next, "Series pages end early, movies follow");
                    layout.movies_page = Some(next);
                    layout.page_count = next;
                    session.state = SessionState::Ready;
                }
                Err(ShardError::NotFound { .. }) => {
                    info!(shard = %key, "No further pages, category exhausted");
                    layout.page_count = session.pages_loaded.max(1);
                    let last = layout.page_count;
                    layout.movies_page = layout.movies_page.filter(|p| *p <= last);
                    session.state = SessionState::Exhausted;
                }
                Err(e) => {
                    session.state = Self::error_state(next, &e);
                    return Err(e.into());
                }
            }
        }

        self.current_items().await
    }

    /// Finish a prefetch started earlier and cache its page.
    async fn adopt(
        &self,
        handle: LoadHandle,
        page_count: u32,
    ) -> Result<Arc<LoadedPage>, ShardError> {
        let key = handle.key().clone();
        match handle.join().await {
            Ok(page) => {
                let page = Arc::new(page);
                self.cache.put(key, Arc::clone(&page));
                Ok(page)
            }
            // The prefetch task died; load directly instead.
            Err(ShardError::Worker { .. }) => {
                self.cache
                    .get_or_load(&self.loader, &key, page_count)
                    .await
            }
            Err(e) => Err(e),
        }
    }

    /// Items of every page loaded so far, in page order.
    ///
    /// Rebuilt from the cache on each call; evicted pages are reloaded.
    pub async fn current_items(&self) -> Result<ItemsView, PaginationError> {
        let (epoch, layout, pages_loaded) = {
            let session = self.lock();
            match &session.layout {
                None => return Ok(ItemsView::empty()),
                Some(layout) => (session.epoch, layout.clone(), session.pages_loaded),
            }
        };

        let mut pages = Vec::with_capacity(pages_loaded as usize);
        for page in 1..=pages_loaded {
            let key = layout.key(page);
            pages.push(
                self.cache
                    .get_or_load(&self.loader, &key, layout.page_count)
                    .await?,
            );
        }

        if self.lock().epoch != epoch {
            return Err(self.discard(&layout.category_id));
        }
        Ok(ItemsView::new(pages))
    }

    /// Start loading the next page in the background.
    ///
    /// Only the cache sees the result, once `load_more` picks it up.
    /// Returns whether a prefetch is in flight after the call.
    pub fn prefetch_next(&self) -> bool {
        let mut session = self.lock();
        let Some(layout) = session.layout.clone() else {
            return false;
        };
        if session.state != SessionState::Ready {
            return false;
        }

        let next = session.pages_loaded + 1;
        if next > layout.page_count {
            return false;
        }
        let key = layout.key(next);
        if session
            .prefetch
            .as_ref()
            .is_some_and(|handle| handle.key() == &key)
        {
            return true;
        }
        if self.cache.contains(&key) {
            return false;
        }

        if let Some(stale) = session.prefetch.take() {
            stale.abort();
        }
        debug!(shard = %key, "Prefetching next page");
        session.prefetch = Some(self.loader.spawn(key, layout.page_count));
        true
    }

    /// Snapshot of the active session.
    pub fn snapshot(&self) -> SessionSnapshot {
        let session = self.lock();
        SessionSnapshot {
            category: session.layout.as_ref().map(|l| l.category_id.clone()),
            state: session.state.clone(),
            pages_loaded: session.pages_loaded,
            total_pages: session.layout.as_ref().map_or(0, |l| l.page_count),
        }
    }
}
