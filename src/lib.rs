//! scout-sync - offline-first scouting queue and sync engine
//!
//! Scouting records captured on venue tablets are written to a durable local
//! queue first and delivered to the scouting REST API whenever connectivity
//! allows. See [`features::sync`] for the engine.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod features;
pub mod output;
pub mod remote;
pub mod scouting;
pub mod storage;

pub use cli::args::{Cli, Commands, OutputFormat};
pub use error::ScoutError;
pub use features::sync::ScoutSync;
