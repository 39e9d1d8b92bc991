//! # Object Grabber Library
//!
//! Goal types, configuration and the sequencing core used by the object
//! grabber action client. The transport to the manipulation service is kept
//! behind [`client::GoalTransport`] so the core runs the same against Zenoh
//! or an in-memory script.

pub mod client;
pub mod error;
pub mod types;
pub mod utils;

// Re-export everything for convenience
pub use client::*;
pub use error::*;
pub use types::*;
pub use utils::*;
