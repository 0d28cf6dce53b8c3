//! Feature implementations for scout-sync.
//!
//! - Offline mutation queue and sync engine

pub mod sync;
