//! Client for the rpaas control plane API.

pub mod client;
pub mod types;

pub use client::{ClientError, RpaasClient};
pub use types::*;
