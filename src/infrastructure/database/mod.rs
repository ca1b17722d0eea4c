//! Database Module
//!
//! PostgreSQL connection and repository implementations.

mod connection;
mod models;
mod repositories;

pub use connection::*;
pub use repositories::*;
