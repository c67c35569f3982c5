//! Talking to the proxy replicas themselves.
//!
//! # Data Flow
//! ```text
//! purge coordinator
//!     → dyn CachePurger (one call per ready replica)
//!     → HttpPurger: GET http://<replica>:<port>/purge[/<proto>]<path>
//!       once per Accept-Encoding variant
//! ```
//!
//! # Design Decisions
//! - A 404 from the purge endpoint means "nothing cached", not a failure
//! - Each replica call has its own deadline

pub mod purge;

pub use purge::{CachePurger, HttpPurger, PurgeError};
