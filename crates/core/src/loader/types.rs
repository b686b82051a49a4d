//! Types produced by the shard loader.

use chrono::{DateTime, Utc};
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Page number reserved for a category's adult shard.
///
/// Adult items live in a separate file outside the page sequence, so they
/// get a key of their own that pagination never produces.
pub const ADULT_PAGE: u32 = u32::MAX;

/// Page number reserved for a category's separate movies shard.
///
/// Large categories keep their movies in one file beside the series pages.
/// Pagination reaches it through [`PageLayout`](crate::pagination::PageLayout).
pub const MOVIES_PAGE: u32 = u32::MAX - 1;

/// Identifies one loadable unit of catalog data. This is the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShardKey {
    /// Category slug, as listed in the index.
    pub category_id: String,
    /// Page number, starting at 1.
    pub page: u32,
}

impl ShardKey {
    /// Create a key for the given category page.
    pub fn new(category_id: impl Into<String>, page: u32) -> Self {
        debug_assert!(page >= 1, "page numbers start at 1");
        Self {
            category_id: category_id.into(),
            page,
        }
    }

    /// Key for the first page of a category.
    pub fn first(category_id: impl Into<String>) -> Self {
        Self::new(category_id, 1)
    }

    /// Key for the adult shard of a category.
    pub fn adult(category_id: impl Into<String>) -> Self {
        Self::new(category_id, ADULT_PAGE)
    }

    /// Key for the separate movies shard of a category.
    pub fn movies(category_id: impl Into<String>) -> Self {
        Self::new(category_id, MOVIES_PAGE)
    }

    /// Whether this key addresses an adult shard rather than a page.
    pub fn is_adult(&self) -> bool {
        self.page == ADULT_PAGE
    }

    pub fn is_movies(&self) -> bool {
        self.page == MOVIES_PAGE
    }
}

impl fmt::Display for ShardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_adult() {
            write!(f, "{}#adult", self.category_id)
        } else if self.is_movies() {
            write!(f, "{}#movies", self.category_id)
        } else {
            write!(f, "{}#p{}", self.category_id, self.page)
        }
    }
}

/// One decoded shard, owned by the cache once inserted.
#[derive(Debug, Clone)]
pub struct LoadedPage {
    pub key: ShardKey,
    /// Items in shard order.
    pub items: Vec<CatalogItem>,
    /// Number of pages the category spans.
    pub total_pages: u32,
    pub loaded_at: DateTime<Utc>,
}

impl LoadedPage {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// `loaded_at` is bookkeeping; two loads of the same bytes are the same page.
impl PartialEq for LoadedPage {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.total_pages == other.total_pages && self.items == other.items
    }
}

/// Kind of catalog entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Movie,
    Series,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Movie => "movie",
            ContentType::Series => "series",
        }
    }
}

impl std::str::FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "movie" | "movies" => Ok(ContentType::Movie),
            "series" => Ok(ContentType::Series),
            other => Err(format!("unknown content type: {}", other)),
        }
    }
}

/// A playable catalog entry. Immutable once decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    /// Opaque stream locator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient_content_type")]
    pub content_type: ContentType,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_adult: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    /// Display category the producer assigned (may differ from the slug).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Show name, for items that are single episodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_name: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_u32"
    )]
    pub season: Option<u32>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_u32"
    )]
    pub episode: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb: Option<TmdbMetadata>,
    /// Episodes keyed by season number (JSON object keys are strings).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episodes: Option<BTreeMap<String, Vec<Episode>>>,
}

impl CatalogItem {
    /// Genres from enriched metadata, empty when not enriched.
    pub fn genres(&self) -> &[String] {
        self.tmdb.as_ref().map(|t| t.genres.as_slice()).unwrap_or(&[])
    }

    /// Rating from enriched metadata.
    pub fn rating(&self) -> Option<f32> {
        self.tmdb.as_ref().and_then(|t| t.rating)
    }

    /// Seasons in numeric order; keys that are not numbers sort last.
    pub fn seasons(&self) -> Vec<(u32, &[Episode])> {
        let mut seasons: Vec<(u32, &[Episode])> = self
            .episodes
            .iter()
            .flatten()
            .map(|(k, v)| (k.trim().parse().unwrap_or(u32::MAX), v.as_slice()))
            .collect();
        seasons.sort_by_key(|(n, _)| *n);
        seasons
    }

    /// Total episodes across all seasons.
    pub fn episode_count(&self) -> usize {
        self.episodes
            .iter()
            .flatten()
            .map(|(_, eps)| eps.len())
            .sum()
    }
}

/// Enriched metadata attached by the producer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TmdbMetadata {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub id: Option<u64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default, alias = "posterPath")]
    pub poster: Option<String>,
    #[serde(default, alias = "backdropPath")]
    pub backdrop: Option<String>,
    #[serde(default, alias = "voteAverage", deserialize_with = "lenient_f32")]
    pub rating: Option<f32>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub year: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub certification: Option<String>,
    #[serde(default, deserialize_with = "named_list")]
    pub genres: Vec<String>,
    #[serde(default, deserialize_with = "cast_list")]
    pub cast: Vec<CastMember>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastMember {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character: Option<String>,
}

/// One episode of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, alias = "title")]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub season: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub episode: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

// ============================================================================
// Lenient field decoding
// ============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Num(serde_json::Number),
    Bool(bool),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Str(s) => s,
            Scalar::Num(n) => n.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Str(s) => s.trim().parse().ok(),
            Scalar::Num(n) => n.as_f64(),
            Scalar::Bool(_) => None,
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Scalar::deserialize(deserializer)?.into_string())
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(Scalar::into_string))
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.and_then(|s| s.as_f64()))
}

fn lenient_f32<'de, D>(deserializer: D) -> Result<Option<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_f64(deserializer)?.map(|v| v as f32))
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_f64(deserializer)?
        .filter(|v| *v >= 0.0 && *v <= u32::MAX as f64)
        .map(|v| v as u32))
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_f64(deserializer)?
        .filter(|v| *v >= 0.0)
        .map(|v| v as u64))
}

fn lenient_content_type<'de, D>(deserializer: D) -> Result<ContentType, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .and_then(|s| s.parse().ok())
        .unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Named {
    Plain(String),
    Object { name: String },
}

fn named_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Named>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|n| match n {
            Named::Plain(s) => s,
            Named::Object { name } => name,
        })
        .collect())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCast {
    Plain(String),
    Object {
        name: String,
        #[serde(default)]
        character: Option<String>,
    },
}

fn cast_list<'de, D>(deserializer: D) -> Result<Vec<CastMember>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<RawCast>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|c| match c {
            RawCast::Plain(name) => CastMember {
                name,
                character: None,
            },
            RawCast::Object { name, character } => CastMember { name, character },
        })
        .collect())
}
