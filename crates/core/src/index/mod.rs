//! Always-resident catalog index.
//!
//! The index is a small artifact summarising every category, so the
//! category list can be shown without touching item data. It is loaded
//! once and never mutated afterwards.

mod types;

pub use types::{CatalogIndexEntry, IndexError};

use chrono::{DateTime, NaiveDateTime};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::source::{ShardSource, SourceError};
use types::IndexFile;

/// In-memory summary of every category.
#[derive(Debug, Clone)]
pub struct CatalogIndex {
    version: u32,
    generated_at: Option<NaiveDateTime>,
    total_movies: u64,
    total_series: u64,
    total_adult: u64,
    max_items_per_page: Option<u32>,
    /// Producer order.
    entries: Vec<CatalogIndexEntry>,
    positions: HashMap<String, usize>,
}

impl CatalogIndex {
    /// Read and decode the index through `source`.
    pub async fn load(source: &dyn ShardSource) -> Result<Self, IndexError> {
        let bytes = source.read_index().await.map_err(|e| match e {
            SourceError::NotFound(path) => IndexError::Missing(path),
            // An index that exists but cannot be read is as good as absent.
            SourceError::Io { path, message } => {
                IndexError::Missing(format!("{}: {}", path, message))
            }
        })?;

        let index = Self::from_slice(&bytes)?;
        info!(
            source = source.name(),
            categories = index.len(),
            version = index.version,
            "Loaded catalog index"
        );
        Ok(index)
    }

    /// Decode an index artifact.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, IndexError> {
        let file: IndexFile =
            serde_json::from_slice(bytes).map_err(|e| IndexError::Corrupt(e.to_string()))?;

        let mut entries = Vec::with_capacity(file.categories.len());
        let mut positions = HashMap::with_capacity(file.categories.len());
        for category in file.categories {
            if category.id.trim().is_empty() {
                return Err(IndexError::Corrupt("category with empty id".to_string()));
            }
            let entry = CatalogIndexEntry::from(category);
            if positions
                .insert(entry.category_id.clone(), entries.len())
                .is_some()
            {
                return Err(IndexError::Corrupt(format!(
                    "duplicate category id: {}",
                    entry.category_id
                )));
            }
            entries.push(entry);
        }

        let generated_at = file.generated_at.as_deref().and_then(|raw| {
            let parsed = parse_timestamp(raw);
            if parsed.is_none() {
                warn!(generated_at = raw, "Unparseable index timestamp");
            }
            parsed
        });

        Ok(Self {
            version: file.version,
            generated_at,
            total_movies: file.total_movies,
            total_series: file.total_series,
            total_adult: file.total_adult,
            max_items_per_page: file.max_items_per_page,
            entries,
            positions,
        })
    }

    /// Categories for display, largest first.
    ///
    /// Adult categories are left out unless `include_adult`. Ties are broken
    /// by category id so the order is deterministic.
    pub fn list_categories(&self, include_adult: bool) -> Vec<&CatalogIndexEntry> {
        let mut list: Vec<&CatalogIndexEntry> = self
            .entries
            .iter()
            .filter(|e| include_adult || !e.is_adult)
            .collect();
        list.sort_by(|a, b| {
            b.total_count
                .cmp(&a.total_count)
                .then_with(|| a.category_id.cmp(&b.category_id))
        });
        list
    }

    pub fn get(&self, category_id: &str) -> Option<&CatalogIndexEntry> {
        self.positions.get(category_id).map(|&i| &self.entries[i])
    }

    /// Entries in the order the producer wrote them.
    pub fn iter(&self) -> impl Iterator<Item = &CatalogIndexEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn generated_at(&self) -> Option<NaiveDateTime> {
        self.generated_at
    }

    pub fn total_movies(&self) -> u64 {
        self.total_movies
    }

    pub fn total_series(&self) -> u64 {
        self.total_series
    }

    pub fn total_adult(&self) -> u64 {
        self.total_adult
    }

    pub fn max_items_per_page(&self) -> Option<u32> {
        self.max_items_per_page
    }
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.naive_utc())
        .ok()
        .or_else(|| raw.parse::<NaiveDateTime>().ok())
}
