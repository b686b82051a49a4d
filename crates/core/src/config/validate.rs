use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Cache bound is at least one shard
/// - Page size and search result cap are non-zero
/// - Index file name is set
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.cache.max_cached_shards == 0 {
        return Err(ConfigError::ValidationError(
            "cache.max_cached_shards cannot be 0".to_string(),
        ));
    }

    if config.loader.page_size == 0 {
        return Err(ConfigError::ValidationError(
            "loader.page_size cannot be 0".to_string(),
        ));
    }

    if config.search.max_results == 0 {
        return Err(ConfigError::ValidationError(
            "search.max_results cannot be 0".to_string(),
        ));
    }

    if config.catalog.index_file.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "catalog.index_file cannot be empty".to_string(),
        ));
    }

    Ok(())
}
