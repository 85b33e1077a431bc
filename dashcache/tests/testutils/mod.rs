//! Test utilities for DashCache integration tests
//!
//! DashboardFixture wires an in-memory dataset store to a CacheManager using
//! a small dashboard configuration, so tests can mutate datasets and observe
//! cache decisions through the public API only.

#![allow(dead_code)]

pub mod test_fixture;
