//! # Organizit Shared Library
//!
//! Domain types and business logic used by the Organizit API server.
//!
//! ## Module Organization
//!
//! - `models`: Users, tasks and pending upgrades with their SQL queries
//! - `plan_gate`: Free/pro task limits
//! - `store`: Persistence trait with PostgreSQL and in-memory backends
//! - `payments`: Payment processor client and the upgrade flow
//! - `auth`: JWT validation and request auth context
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod db;
pub mod models;
pub mod payments;
pub mod plan_gate;
pub mod store;

/// Current version of the Organizit shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
