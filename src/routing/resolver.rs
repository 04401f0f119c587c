//! Resolution of the API rewrite rule.
//!
//! The API rule forwards `/api/:path*` to `<origin>/:path*`, where the origin
//! is taken from `NEXT_PUBLIC_API_URL` when set and non-empty, and from
//! [`DEFAULT_API_ORIGIN`] otherwise. Resolution is a pure function of the
//! override value and runs once at startup.

use crate::routing::rule::{RewriteRule, RuleError};

/// Environment variable holding the API origin override.
pub const API_URL_ENV: &str = "NEXT_PUBLIC_API_URL";

/// Origin used when no override is configured.
pub const DEFAULT_API_ORIGIN: &str = "http://localhost:3000";

/// Source pattern of the API rule.
pub const API_SOURCE: &str = "/api/:path*";

/// Name of the API rule in logs and metrics.
pub const API_RULE_NAME: &str = "api";

/// Pick the origin: the override verbatim when non-empty, else the default.
pub fn resolve_origin(override_value: Option<&str>) -> &str {
    match override_value {
        Some(origin) if !origin.is_empty() => origin,
        _ => DEFAULT_API_ORIGIN,
    }
}

/// Build the API rewrite rule for the given override.
pub fn api_rewrite(override_value: Option<&str>) -> Result<RewriteRule, RuleError> {
    api_rewrite_with_source(API_SOURCE, override_value)
}

/// Build the API rewrite rule with a custom source pattern.
///
/// The destination path template mirrors every placeholder of `source`, so a
/// source of `/backend/:version/:rest*` forwards to `<origin>/:version/:rest*`.
pub fn api_rewrite_with_source(
    source: &str,
    override_value: Option<&str>,
) -> Result<RewriteRule, RuleError> {
    let origin = resolve_origin(override_value).trim_end_matches('/');
    let destination = format!("{}{}", origin, placeholder_template(source));
    RewriteRule::new(API_RULE_NAME, source, &destination)
}

/// Build the API rewrite rule from the process environment.
pub fn api_rewrite_from_env() -> Result<RewriteRule, RuleError> {
    let value = std::env::var(API_URL_ENV).ok();
    api_rewrite(value.as_deref())
}

/// `/api/:path*` → `/:path*`; `/v/:a/x/:b` → `/:a/:b`.
fn placeholder_template(source: &str) -> String {
    let placeholders: Vec<&str> = source
        .split('/')
        .filter(|segment| segment.starts_with(':'))
        .collect();
    format!("/{}", placeholders.join("/"))
}
