//! Application Services
//!
//! Orchestration services for complex operations.

mod attendance;
mod event_bus;
mod gallery;
mod liveness_smoothing;
mod recognizer;
mod tracker;

pub use attendance::*;
pub use event_bus::*;
pub use gallery::*;
pub use liveness_smoothing::*;
pub use recognizer::*;
pub use tracker::*;
