// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Functional tests for the admission webhook router.
//!
//! Reviews are posted to the same router the server binds, built from the
//! same routing table, WITHOUT TLS or a live cluster.
//!
//! ```bash
//! # Run all functional tests
//! cargo test --test functional
//!
//! # Run specific test
//! cargo test --test functional test_placement_type_change_denied
//! ```

#[path = "../common/mod.rs"]
mod common;

mod admission_tests;
mod harness;

pub use harness::*;
