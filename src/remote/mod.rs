//! Remote submission client for the scouting API.
//!
//! The client performs exactly one network call per invocation and never
//! retries; retry policy belongs to the sync orchestrator.

pub mod client;
pub mod http;

pub use client::{submit, RemoteClient, RemoteError, RemoteId};
#[cfg(test)]
pub use client::MockRemoteClient;
pub use http::{HttpClientConfig, HttpRemoteClient};
