//! Pure shard decoding.
//!
//! Three document shapes are accepted:
//! - wrapped pages: `{category, page?, totalPages?, movies: [..], series: [..]}`
//! - adult shards: `{category, items: [..]}`
//! - legacy shards: a bare array of items, written before pagination existed
//!
//! Wrapped pages yield movies first, then series, each in file order.

use chrono::Utc;
use serde::Deserialize;

use super::error::ShardError;
use super::types::{CatalogItem, LoadedPage, ShardKey};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WrappedShard {
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    total_pages: Option<u32>,
    #[serde(default)]
    movies: Option<Vec<CatalogItem>>,
    #[serde(default)]
    series: Option<Vec<CatalogItem>>,
    #[serde(default)]
    items: Option<Vec<CatalogItem>>,
}

/// A decoded shard before it is stamped as a [`LoadedPage`].
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedShard {
    /// Category name written in the shard, if any.
    pub category: Option<String>,
    /// Page number written in the shard, if any.
    pub page: Option<u32>,
    /// Total pages written in the shard, if any.
    pub total_pages: Option<u32>,
    pub items: Vec<CatalogItem>,
    /// Whether the shard used the bare-array legacy shape.
    pub legacy: bool,
}

impl DecodedShard {
    /// Stamp the shard as a loaded page.
    ///
    /// `page_count_hint` is used when the shard does not state its page count.
    pub fn into_page(self, key: ShardKey, page_count_hint: u32) -> LoadedPage {
        let total_pages = if key.is_adult() {
            1
        } else {
            self.total_pages
                .filter(|n| *n > 0)
                .unwrap_or(page_count_hint)
                .max(1)
        };
        LoadedPage {
            key,
            items: self.items,
            total_pages,
            loaded_at: Utc::now(),
        }
    }
}

/// Decode shard bytes. Same bytes always give the same result.
pub fn decode_shard(key: &ShardKey, bytes: &[u8]) -> Result<DecodedShard, ShardError> {
    let decode_err = |message: String| ShardError::Decode {
        key: key.clone(),
        message,
    };

    match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'[') => {
            let items: Vec<CatalogItem> =
                serde_json::from_slice(bytes).map_err(|e| decode_err(e.to_string()))?;
            Ok(DecodedShard {
                category: None,
                page: None,
                total_pages: Some(1),
                items,
                legacy: true,
            })
        }
        Some(b'{') => {
            let shard: WrappedShard =
                serde_json::from_slice(bytes).map_err(|e| decode_err(e.to_string()))?;
            if shard.movies.is_none() && shard.series.is_none() && shard.items.is_none() {
                return Err(decode_err(
                    "shard object has no movies, series or items".to_string(),
                ));
            }

            let mut items = shard.movies.unwrap_or_default();
            items.extend(shard.series.unwrap_or_default());
            items.extend(shard.items.unwrap_or_default());

            Ok(DecodedShard {
                category: shard.category,
                page: shard.page,
                total_pages: shard.total_pages,
                items,
                legacy: false,
            })
        }
        Some(_) => Err(decode_err(
            "expected a JSON object or array".to_string(),
        )),
        None => Err(decode_err("empty shard".to_string())),
    }
}
