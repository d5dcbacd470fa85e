//! # API Token Provider
//!
//! Acquires a bearer JWT from the backend's `/api/authenticate` endpoint,
//! keeps it in a single-slot cache and refreshes it before it expires.
//!
//! Modules:
//! - `config` — environment resolution, credentials and the optional settings file
//! - `cache` — the single-slot token cache
//! - `sources` — the authentication call and the caching `TokenProvider`
//! - `parser` — reading the `exp` claim out of a JWT
//! - `client` — backend calls that carry the token and retry once on 401

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod helpers;
pub mod observability;
pub mod parser;
pub mod resilience;
pub mod server;
pub mod sources;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::client::authorized::AuthorizedClient;
pub use crate::error::TokenError;
pub use crate::sources::provider::{TokenProvider, TokenProviderBuilder};
