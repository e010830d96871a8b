//! # TaskAfy Shared Library
//!
//! Types, persistence, and business rules shared by the TaskAfy API server
//! and the recurring-task worker.
//!
//! ## Module Organization
//!
//! - `auth`: password hashing, JWT issuance, bearer middleware, access checks
//! - `db`: connection pool and migrations
//! - `models`: database rows and their queries
//! - `geo`: Haversine distance and arrival estimates
//! - `pricing`: booking cost and cancellation penalties
//! - `badges`: tasker badge eligibility
//! - `recurrence`: next-occurrence computation for recurring bookings
//! - `paydunya`: payment gateway trait and the Paydunya HTTP client
//! - `redis`: Redis client and the token-bucket rate limiter

pub mod auth;
pub mod badges;
pub mod db;
pub mod geo;
pub mod models;
pub mod paydunya;
pub mod pricing;
pub mod recurrence;
pub mod redis;

/// Current version of the TaskAfy shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
