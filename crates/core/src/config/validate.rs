use super::{types::Config, ConfigError};

/// Largest chapter page the remote feed endpoint accepts.
const MAX_CHILD_PAGE_SIZE: u32 = 500;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Remote and index base URLs are set
/// - Page sizes, chunk size and governor threshold are non-zero
/// - Child page size does not exceed the remote maximum
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.source.base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "source.base_url cannot be empty".to_string(),
        ));
    }

    if config.index.base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "index.base_url cannot be empty".to_string(),
        ));
    }

    if config.source.catalog_page_size == 0 {
        return Err(ConfigError::ValidationError(
            "source.catalog_page_size cannot be 0".to_string(),
        ));
    }

    if config.source.child_page_size == 0 || config.source.child_page_size > MAX_CHILD_PAGE_SIZE {
        return Err(ConfigError::ValidationError(format!(
            "source.child_page_size must be between 1 and {}",
            MAX_CHILD_PAGE_SIZE
        )));
    }

    if config.fanout.chunk_size == 0 {
        return Err(ConfigError::ValidationError(
            "fanout.chunk_size cannot be 0".to_string(),
        ));
    }

    if config.governor.threshold == 0 {
        return Err(ConfigError::ValidationError(
            "governor.threshold cannot be 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = Config::default();
        config.server.port = 0;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_zero_chunk_size_fails() {
        let mut config = Config::default();
        config.fanout.chunk_size = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("fanout.chunk_size"));
    }

    #[test]
    fn test_validate_child_page_size_bounds() {
        let mut config = Config::default();
        config.source.child_page_size = 501;
        assert!(validate_config(&config).is_err());

        config.source.child_page_size = 500;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_empty_index_url_fails() {
        let mut config = Config::default();
        config.index.base_url = "  ".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("index.base_url"));
    }

    #[test]
    fn test_validate_zero_threshold_fails() {
        let mut config = Config::default();
        config.governor.threshold = 0;
        assert!(validate_config(&config).is_err());
    }
}
