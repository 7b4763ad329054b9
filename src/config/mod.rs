//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → DaemonConfig (validated, immutable)
//!
//! positional argument
//!     → plugin::setup (namespace or directory)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; prefix lists are the only live data
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{AdminConfig, DaemonConfig, ObservabilityConfig, SourceConfig};
