//! Rewrite table lookup.
//!
//! # Responsibilities
//! - Store compiled rewrite rules in declaration order
//! - Look up the first rule matching a request URI
//! - Return the rewritten target or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan over rules; first match wins
//! - Explicit `None` rather than a silent default

use axum::http::Uri;

use crate::config::ProxyConfig;
use crate::routing::resolver::api_rewrite_with_source;
use crate::routing::rule::{RewriteRule, RuleError};

/// Outcome of a successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite<'a> {
    pub rule: &'a RewriteRule,
    pub target: Uri,
}

/// Ordered set of compiled rewrite rules.
#[derive(Debug, Clone, Default)]
pub struct RewriteTable {
    rules: Vec<RewriteRule>,
}

impl RewriteTable {
    pub fn new(rules: Vec<RewriteRule>) -> Self {
        Self { rules }
    }

    /// Compile the API rule followed by any extra rules from the config.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, RuleError> {
        let mut rules = Vec::with_capacity(config.rewrites.len() + 1);
        rules.push(api_rewrite_with_source(
            &config.api.source,
            config.api.origin.as_deref(),
        )?);
        for rewrite in &config.rewrites {
            rules.push(RewriteRule::from_config(rewrite)?);
        }
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[RewriteRule] {
        &self.rules
    }

    /// Find the first rule matching `uri` and rewrite it.
    pub fn resolve(&self, uri: &Uri) -> Option<Rewrite<'_>> {
        self.rules.iter().find_map(|rule| {
            rule.rewrite(uri).map(|target| Rewrite { rule, target })
        })
    }
}
