//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ControlPlaneConfig (validated, immutable)
//!     → RpaasConfig shared via Arc with the manager
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → API server builds a fresh manager and swaps it in atomically
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::ControlPlaneConfig;
pub use schema::FlavorConfig;
pub use schema::ListenerConfig;
pub use schema::ObservabilityConfig;
pub use schema::PurgeConfig;
pub use schema::RetryConfig;
pub use schema::RpaasConfig;
pub use schema::StoreConfig;
