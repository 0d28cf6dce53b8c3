//! Scouting records produced by the pit and match forms.
//!
//! These are the payloads carried by queued entries. The statistics layer
//! consumes them only after they have been synchronized.

pub mod types;

pub use types::*;
