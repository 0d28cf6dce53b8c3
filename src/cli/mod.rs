//! Command-line interface for scout-sync.

pub mod args;
pub mod commands;
