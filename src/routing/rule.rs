//! Rewrite rules: a source pattern and a destination template.

use axum::http::Uri;
use thiserror::Error;
use url::{Position, Url};

use crate::config::RewriteConfig;
use crate::routing::pattern::{PathPattern, PatternError};

/// Errors produced while compiling a rewrite rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("invalid {side} pattern: {error}")]
    Pattern {
        side: &'static str,
        #[source]
        error: PatternError,
    },

    #[error("destination {destination:?} has an invalid origin: {reason}")]
    InvalidOrigin { destination: String, reason: String },

    #[error("destination {0:?} must not carry a query string or fragment")]
    DestinationQuery(String),

    #[error(
        "destination {destination:?} must reuse the placeholders of {source_pattern:?} \
         exactly once and in order (expected {expected:?}, found {found:?})"
    )]
    PlaceholderMismatch {
        source_pattern: String,
        destination: String,
        expected: Vec<String>,
        found: Vec<String>,
    },
}

/// Where a matching request is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Scheme and authority, without a trailing slash.
    origin: String,
    path: PathPattern,
}

impl Destination {
    /// Parse `<origin><path template>`, e.g. `https://host/base/:path*`.
    pub fn parse(raw: &str) -> Result<Self, RuleError> {
        let invalid = |reason: &str| RuleError::InvalidOrigin {
            destination: raw.to_string(),
            reason: reason.to_string(),
        };

        let authority_start = raw
            .find("://")
            .map(|i| i + 3)
            .ok_or_else(|| invalid("not an absolute URL"))?;
        let (origin, template) = match raw[authority_start..].find('/') {
            Some(i) => raw.split_at(authority_start + i),
            None => (raw, "/"),
        };

        if origin.contains(['?', '#']) || template.contains(['?', '#']) {
            return Err(RuleError::DestinationQuery(raw.to_string()));
        }

        let url = Url::parse(origin).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(invalid("missing host"));
        }

        let path: PathPattern = template.parse().map_err(|error| RuleError::Pattern {
            side: "destination",
            error,
        })?;
        let origin = url[..Position::AfterPort].to_string();

        // Every rewrite must produce a parseable URI, so the template itself
        // may only contain characters valid in a request path.
        let sample = path
            .render(&path.sample_captures())
            .map_err(|e| invalid(&e.to_string()))?;
        format!("{origin}{sample}")
            .parse::<Uri>()
            .map_err(|e| invalid(&format!("path template is not a valid URI path: {e}")))?;

        Ok(Self { origin, path })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn path(&self) -> &PathPattern {
        &self.path
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.origin, self.path)
    }
}

/// A compiled rewrite rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteRule {
    name: String,
    source: PathPattern,
    destination: Destination,
}

impl RewriteRule {
    /// Compile a rule, enforcing that the destination reuses every source
    /// placeholder exactly once, in order.
    pub fn new(
        name: impl Into<String>,
        source: &str,
        destination: &str,
    ) -> Result<Self, RuleError> {
        let source_pattern: PathPattern = source.parse().map_err(|error| RuleError::Pattern {
            side: "source",
            error,
        })?;
        let destination = Destination::parse(destination)?;

        let expected: Vec<String> = source_pattern
            .placeholders()
            .map(|(n, _)| n.to_string())
            .collect();
        let found: Vec<String> = destination
            .path()
            .placeholders()
            .map(|(n, _)| n.to_string())
            .collect();

        if expected != found {
            return Err(RuleError::PlaceholderMismatch {
                source_pattern: source.to_string(),
                destination: destination.to_string(),
                expected,
                found,
            });
        }

        Ok(Self {
            name: name.into(),
            source: source_pattern,
            destination,
        })
    }

    pub fn from_config(config: &RewriteConfig) -> Result<Self, RuleError> {
        Self::new(&config.name, &config.source, &config.destination)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &PathPattern {
        &self.source
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Rewrite an inbound URI. Returns `None` when the path does not match.
    ///
    /// The query string is appended verbatim.
    pub fn rewrite(&self, uri: &Uri) -> Option<Uri> {
        let captures = self.source.match_path(uri.path())?;
        // Placeholder sets are checked at construction, so rendering cannot miss.
        let path = self.destination.path.render(&captures).ok()?;

        let target = match uri.query() {
            Some(query) => format!("{}{}?{}", self.destination.origin, path, query),
            None => format!("{}{}", self.destination.origin, path),
        };

        match target.parse() {
            Ok(uri) => Some(uri),
            Err(e) => {
                tracing::warn!(rule = %self.name, target = %target, error = %e, "Rewritten URI is invalid");
                None
            }
        }
    }

    /// Declarative form, as it would appear in a config file.
    pub fn to_config(&self) -> RewriteConfig {
        RewriteConfig {
            name: self.name.clone(),
            source: self.source.to_string(),
            destination: self.destination.to_string(),
        }
    }
}
