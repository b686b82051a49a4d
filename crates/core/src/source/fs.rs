//! Filesystem-backed shard source.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{ShardSource, SourceError};
use crate::config::CatalogSourceConfig;
use crate::loader::ShardKey;

/// Reads the index and shards from a directory laid out by the producer:
///
/// - `<root>/index.json`
/// - `<root>/<id>.json` for single-page categories
/// - `<root>/<id>_p<N>.json` for paginated categories
/// - `<root>/<id>_movies.json` for the movies of a paginated category
/// - `<root>/<id>_adult.json` for adult items
#[derive(Debug, Clone)]
pub struct FsShardSource {
    root: PathBuf,
    index_file: String,
}

impl FsShardSource {
    /// Create a source rooted at `root` with the default index file name.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            index_file: CatalogSourceConfig::default().index_file,
        }
    }

    /// Create a source from configuration.
    pub fn from_config(config: &CatalogSourceConfig) -> Self {
        Self {
            root: config.root.clone(),
            index_file: config.index_file.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Candidate paths for a shard, in lookup order.
    pub fn shard_paths(&self, key: &ShardKey) -> Vec<PathBuf> {
        let id = &key.category_id;
        if key.is_adult() {
            return vec![self.root.join(format!("{}_adult.json", id))];
        }
        if key.is_movies() {
            return vec![self.root.join(format!("{}_movies.json", id))];
        }
        let paged = self.root.join(format!("{}_p{}.json", id, key.page));
        if key.page == 1 {
            vec![paged, self.root.join(format!("{}.json", id))]
        } else {
            vec![paged]
        }
    }

    async fn read(path: &Path) -> Result<Vec<u8>, SourceError> {
        tokio::fs::read(path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => SourceError::NotFound(path.display().to_string()),
            _ => SourceError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            },
        })
    }
}

/// Category ids come from the index; refuse anything that could leave the root.
fn is_safe_id(id: &str) -> bool {
    !id.is_empty()
        && !id.contains(['/', '\\'])
        && id != "."
        && id != ".."
        && !id.contains("..")
}

#[async_trait]
impl ShardSource for FsShardSource {
    fn name(&self) -> &str {
        "filesystem"
    }

    async fn read_index(&self) -> Result<Vec<u8>, SourceError> {
        Self::read(&self.root.join(&self.index_file)).await
    }

    async fn read_shard(&self, key: &ShardKey) -> Result<Vec<u8>, SourceError> {
        if !is_safe_id(&key.category_id) {
            return Err(SourceError::NotFound(key.to_string()));
        }

        let mut last_missing = None;
        for path in self.shard_paths(key) {
            match Self::read(&path).await {
                Ok(bytes) => {
                    debug!(path = %path.display(), bytes = bytes.len(), "Read shard file");
                    return Ok(bytes);
                }
                Err(SourceError::NotFound(p)) => last_missing = Some(p),
                Err(e) => return Err(e),
            }
        }
        Err(SourceError::NotFound(
            last_missing.unwrap_or_else(|| key.to_string()),
        ))
    }
}
