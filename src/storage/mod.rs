//! Storage layer for scout-sync.
//!
//! This module provides SQLite-based persistence for:
//! - The offline entry queue
//! - The persisted sync configuration

mod database;
mod migrations;

pub use database::Database;
pub use migrations::CURRENT_VERSION;
