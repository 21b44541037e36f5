//! REST API client module for the recipe backend.
//!
//! This module provides the `ApiClient` for fetching recipe feeds and
//! details and for pushing/pulling pantry snapshots, plus the error
//! taxonomy shared by everything that talks to the network.
//!
//! Authentication uses an optional JWT bearer token; unauthenticated
//! clients can still read public recipe data.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
