//! Configuration validation.

use super::error::{ConfigError, ConfigResult};
use super::schema::{HeraldConfig, LogOutput};

/// Checks a loaded configuration for values the runtime cannot use.
pub fn validate_config(config: &HeraldConfig) -> ConfigResult<()> {
    if config.dispatch.defer_queue_capacity == 0 {
        return Err(ConfigError::validation(
            "dispatch.defer_queue_capacity must be greater than zero",
        ));
    }

    if config.logging.output == LogOutput::File && config.logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.file_path is required when logging.output is \"file\"",
        ));
    }

    if let Some(module) = config.logging.filters.keys().find(|m| m.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "logging.filters contains an empty module name: {module:?}"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogLevel;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&HeraldConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_queue_capacity_rejected() {
        let mut config = HeraldConfig::default();
        config.dispatch.defer_queue_capacity = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("defer_queue_capacity"));
    }

    #[test]
    fn test_file_output_requires_path() {
        let mut config = HeraldConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());

        config.logging.file_path = Some("herald.log".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_filter_module_rejected() {
        let mut config = HeraldConfig::default();
        config.logging.filters.insert(" ".to_string(), LogLevel::Debug);
        assert!(validate_config(&config).is_err());
    }
}
