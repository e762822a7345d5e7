//! # bazaar_core
//!
//! Domain logic for the Bazaar marketplace: identities and sessions, the
//! product catalog, and their PostgreSQL storage.

pub mod auth;
pub mod catalog;
pub mod db;
pub mod dto;
pub mod migrate;
pub mod models;
pub mod store;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
