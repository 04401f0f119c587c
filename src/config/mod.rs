//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (NEXT_PUBLIC_API_URL / PROXY_BIND_ADDRESS overrides)
//!     → validation.rs (semantic checks, compile rules once)
//!     → ProxyConfig (validated, immutable)
//!     → RewriteTable built once, shared via Arc
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup and never reloaded
//! - All fields have defaults to allow running without a file
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::ApiConfig;
pub use schema::ListenerConfig;
pub use schema::ObservabilityConfig;
pub use schema::ProxyConfig;
pub use schema::RewriteConfig;
pub use schema::TimeoutConfig;
pub use validation::ValidationError;
