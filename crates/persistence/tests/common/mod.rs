//! Test infrastructure for the persistence layer.
//!
//! Provides an in-memory [`MockConnection`] and library fixtures shared by
//! the integration tests.

#![allow(dead_code)]

pub mod fixtures;
pub mod mock;

pub use fixtures::*;
pub use mock::*;
