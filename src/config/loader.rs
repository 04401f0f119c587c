//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::routing::resolver::API_URL_ENV;

/// Environment variable overriding `listener.bind_address`.
pub const BIND_ADDRESS_ENV: &str = "PROXY_BIND_ADDRESS";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a configuration from TOML text without validating it.
pub fn parse_config(content: &str) -> Result<ProxyConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Apply environment overrides. Empty values are treated as unset.
pub fn apply_env_overrides<F>(config: &mut ProxyConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

    if let Some(origin) = non_empty(API_URL_ENV) {
        tracing::debug!(origin = %origin, "API origin taken from {}", API_URL_ENV);
        config.api.origin = Some(origin);
    }
    if let Some(bind) = non_empty(BIND_ADDRESS_ENV) {
        config.listener.bind_address = bind;
    }
}

/// Load configuration from an optional TOML file plus the given environment,
/// then validate it.
pub fn load_config_with_env<F>(path: Option<&Path>, lookup: F) -> Result<ProxyConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => parse_config(&fs::read_to_string(path)?)?,
        None => ProxyConfig::default(),
    };

    apply_env_overrides(&mut config, lookup);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load and validate configuration using the process environment.
pub fn load_config(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_no_file_no_env_uses_defaults() {
        let config = load_config_with_env(None, env(&[])).unwrap();
        assert_eq!(config, ProxyConfig::default());
        assert_eq!(config.api.origin, None);
    }

    #[test]
    fn test_env_override_applied() {
        let config = load_config_with_env(
            None,
            env(&[
                ("NEXT_PUBLIC_API_URL", "https://api.example.com"),
                ("PROXY_BIND_ADDRESS", "127.0.0.1:9000"),
            ]),
        )
        .unwrap();
        assert_eq!(config.api.origin.as_deref(), Some("https://api.example.com"));
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
    }

    #[test]
    fn test_empty_env_is_unset() {
        let mut config = parse_config("[api]\norigin = \"http://file-origin:8000\"\n").unwrap();
        apply_env_overrides(&mut config, env(&[("NEXT_PUBLIC_API_URL", "")]));
        assert_eq!(config.api.origin.as_deref(), Some("http://file-origin:8000"));
    }

    #[test]
    fn test_parse_full_file() {
        let config = parse_config(
            r#"
            [listener]
            bind_address = "127.0.0.1:8088"

            [api]
            source = "/backend/:path*"

            [[rewrites]]
            name = "assets"
            source = "/static/:file+"
            destination = "https://cdn.example.com/assets/:file+"

            [timeouts]
            request_secs = 10
            upstream_secs = 8

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:8088");
        assert_eq!(config.api.source, "/backend/:path*");
        assert_eq!(config.rewrites.len(), 1);
        assert_eq!(config.rewrites[0].name, "assets");
        assert_eq!(config.timeouts.request_secs, 10);
        assert_eq!(config.timeouts.upstream_secs, 8);
        assert_eq!(config.timeouts.connect_secs, 5);
        assert_eq!(config.observability.log_format, "json");
    }

    #[test]
    fn test_invalid_env_origin_rejected() {
        let err = load_config_with_env(None, env(&[("NEXT_PUBLIC_API_URL", "localhost:3000")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
    }

    #[test]
    fn test_parse_error() {
        let err = parse_config("[listener\nbind_address = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config_with_env(Some(Path::new("/nonexistent/proxy.toml")), env(&[]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
