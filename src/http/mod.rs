//! HTTP API subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, span, request metrics)
//!     → handlers.rs (decode body, call the current Manager)
//!     → error.rs (ManagerError → status + {"error": msg})
//!     → Send to client
//! ```
//!
//! # Design Decisions
//! - JSON bodies everywhere; malformed bodies use the same error envelope
//! - Handlers load the manager once per request, so a reload never splits
//!   one operation across two configurations

pub mod error;
pub mod handlers;
pub mod request;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use request::{MakeRequestUuidV4, X_REQUEST_ID};
pub use server::ApiServer;
