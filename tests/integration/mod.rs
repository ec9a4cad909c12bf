//! Integration test suite for plugdeps
//!
//! End-to-end tests that run the `plugdeps` binary against a temporary
//! Claude configuration directory built with
//! [`ClaudeHomeFixture`](plugdeps_cli::test_utils::ClaudeHomeFixture).
//! Remote catalogs are always disabled so no test touches the network.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **check**: Report shape, exit codes and scope flags of `check`
//! - **steps**: Rendering steps from a report on stdin or in a file
//! - **scan**: Raw reference scanning of plugin directories

mod common;

mod check;
mod scan;
mod steps;
