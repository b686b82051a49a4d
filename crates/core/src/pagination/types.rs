//! Types for pagination sessions.

use serde::Serialize;
use std::sync::Arc;

use crate::index::CatalogIndexEntry;
use crate::loader::{CatalogItem, LoadedPage, ShardKey};

/// How a category's pages map onto shards.
///
/// Pages are numbered from 1. Every page is a `_pN` shard except the
/// movies page, which comes from the category's separate movies shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageLayout {
    pub category_id: String,
    /// At least 1.
    pub page_count: u32,
    pub movies_page: Option<u32>,
}

impl PageLayout {
    /// A category made only of `_pN` shards.
    pub fn paged(category_id: impl Into<String>, page_count: u32) -> Self {
        Self {
            category_id: category_id.into(),
            page_count: page_count.max(1),
            movies_page: None,
        }
    }

    /// Serve `page` from the movies shard.
    pub fn with_movies_page(mut self, page: u32) -> Self {
        self.movies_page = Some(page);
        self.page_count = self.page_count.max(page);
        self
    }

    /// The shard holding `page`.
    pub fn key(&self, page: u32) -> ShardKey {
        if self.movies_page == Some(page) {
            ShardKey::movies(self.category_id.as_str())
        } else {
            ShardKey::new(self.category_id.as_str(), page)
        }
    }
}

impl From<&CatalogIndexEntry> for PageLayout {
    fn from(entry: &CatalogIndexEntry) -> Self {
        Self {
            category_id: entry.category_id.clone(),
            page_count: entry.page_count.max(1),
            movies_page: entry.movies_page,
        }
    }
}

/// Where the active category session stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// No category selected.
    Idle,
    /// First page in flight.
    Loading { page: u32 },
    /// Some pages loaded, more available.
    Ready,
    /// Next page in flight; loaded pages stay visible.
    LoadingMore { page: u32 },
    /// Every page loaded.
    Exhausted,
    /// The last load failed; loaded pages stay visible and the load can be retried.
    Error {
        page: u32,
        kind: String,
        message: String,
    },
}

impl SessionState {
    /// Whether a load is in flight.
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. } | Self::LoadingMore { .. })
    }
}

/// Point-in-time view of the pagination session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub category: Option<String>,
    pub state: SessionState,
    /// Pages 1..=pages_loaded have been loaded in this session.
    pub pages_loaded: u32,
    pub total_pages: u32,
}

/// Ordered items of the active category, backed by shared pages.
///
/// Page k's items always precede page k+1's. The view keeps its pages alive
/// for as long as it is held, so callers should not keep it around longer
/// than they display it.
#[derive(Debug, Clone, Default)]
pub struct ItemsView {
    pages: Vec<Arc<LoadedPage>>,
}

impl ItemsView {
    pub fn new(pages: Vec<Arc<LoadedPage>>) -> Self {
        Self { pages }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Total items across all pages.
    pub fn len(&self) -> usize {
        self.pages.iter().map(|p| p.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(|p| p.items.is_empty())
    }

    /// Number of pages in the view.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[Arc<LoadedPage>] {
        &self.pages
    }

    /// Items in order.
    pub fn iter(&self) -> impl Iterator<Item = &CatalogItem> {
        self.pages.iter().flat_map(|p| p.items.iter())
    }

    /// Item at a flat position.
    pub fn get(&self, mut index: usize) -> Option<&CatalogItem> {
        for page in &self.pages {
            if index < page.items.len() {
                return page.items.get(index);
            }
            index -= page.items.len();
        }
        None
    }

    /// Copy the items out.
    pub fn to_vec(&self) -> Vec<CatalogItem> {
        self.iter().cloned().collect()
    }
}
