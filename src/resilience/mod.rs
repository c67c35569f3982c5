//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Store or purge call:
//!     → timeouts.rs (every remote call has a deadline)
//!     → On write conflict: retries.rs (re-run read/merge/write)
//!     → backoff.rs (exponential delay with jitter between attempts)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Only optimistic-concurrency conflicts are retried; domain errors never are
//! - Jittered backoff keeps racing writers from colliding again

pub mod backoff;
pub mod retries;
pub mod timeouts;
