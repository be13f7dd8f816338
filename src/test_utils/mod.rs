//! Test doubles and fixtures.
//!
//! `memory` is always compiled so the manager can be exercised without a server; the
//! embedded PostgreSQL fixtures need the `test-utils` feature.

#[cfg(feature = "test-utils")]
use std::sync::LazyLock;
#[cfg(feature = "test-utils")]
use tokio::runtime::Runtime;

/// Runtime the embedded server is set up and stopped on; sessions bring their own.
#[cfg(feature = "test-utils")]
pub(crate) static SHARED_RUNTIME: LazyLock<Runtime> =
    LazyLock::new(|| Runtime::new().expect("Failed to create tokio runtime for test utilities"));

pub mod memory;

#[cfg(feature = "test-utils")]
pub mod postgres;

pub use memory::{MemorySession, MemorySessionFactory};
#[cfg(feature = "test-utils")]
pub use postgres::*;
