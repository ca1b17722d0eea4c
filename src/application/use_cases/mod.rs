//! Use Cases
//!
//! Application-specific business rules and orchestration.

pub mod manage_gallery;
pub mod manage_groups;
pub mod manage_members;
pub mod pipeline_orchestrator;
pub mod query_attendance;

pub use manage_gallery::*;
pub use manage_groups::*;
pub use manage_members::*;
pub use pipeline_orchestrator::*;
pub use query_attendance::*;
