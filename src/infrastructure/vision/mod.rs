//! Vision Infrastructure
//!
//! Concrete implementations of the perception ports (C1-C4).

mod aligner;
mod detector;
mod embedder_model;
mod liveness_model;

pub use aligner::*;
pub use detector::*;
pub use embedder_model::*;
pub use liveness_model::*;
