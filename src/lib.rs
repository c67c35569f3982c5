//! Control plane for managed reverse-proxy instances.
//!
//! An instance is one declarative document holding configuration blocks,
//! location rules, a certificate bundle index and an extra-file index. The
//! [`Manager`] validates and merges every change into that document through
//! an [`ObjectStore`](store::ObjectStore), reports replica state and fans
//! cache purges out to ready replicas. [`ApiServer`] exposes it over HTTP.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod manager;
pub mod model;
pub mod nginx;
pub mod observability;
pub mod resilience;
pub mod store;

pub use config::ControlPlaneConfig;
pub use http::ApiServer;
pub use lifecycle::Shutdown;
pub use manager::{Manager, ManagerError, ManagerResult};
