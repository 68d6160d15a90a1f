//! Common test utilities for conduit-auth-core integration tests

pub mod fixtures;

#[allow(unused_imports)]
pub use fixtures::{seeded_store, FailingUserStore, TEST_SECRET};
