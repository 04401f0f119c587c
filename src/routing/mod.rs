//! Rewrite routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, query)
//!     → router.rs (rewrite table lookup)
//!     → rule.rs (match source pattern, render destination)
//!     → pattern.rs (segment matching and capture substitution)
//!     → Return: rewritten target URI or no-match
//!
//! Table Compilation (at startup):
//!     NEXT_PUBLIC_API_URL / config
//!     → resolver.rs (API rule)
//!     → extra RewriteConfig[] in declaration order
//!     → Freeze as immutable RewriteTable
//! ```
//!
//! # Design Decisions
//! - Rules compiled at startup, immutable at runtime
//! - No regex in hot path (segment matching only)
//! - Deterministic: same input always matches same rule
//! - First match wins

pub mod pattern;
pub mod resolver;
pub mod router;
pub mod rule;

pub use pattern::{PathPattern, PatternError};
pub use resolver::{api_rewrite, api_rewrite_from_env, resolve_origin, API_URL_ENV, DEFAULT_API_ORIGIN};
pub use router::{Rewrite, RewriteTable};
pub use rule::{Destination, RewriteRule, RuleError};
