//! Sources module
//!
//! The authentication call and the provider that caches its result.
pub mod authenticate;
pub mod provider;
