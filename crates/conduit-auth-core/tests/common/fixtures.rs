//! Shared fixtures: seeded stores and a store that always fails

#![allow(dead_code)]

use async_trait::async_trait;
use conduit_auth_core::{MemoryUserStore, StoreError, StoreResult, UserStore};
use conduit_types::{Identity, UserId};

pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";

/// Store holding alice (1) and bob (2)
pub fn seeded_store() -> MemoryUserStore {
    MemoryUserStore::with_users([
        Identity::new(1, "alice").with_field("is_active", true),
        Identity::new(2, "bob"),
    ])
}

/// Store whose every lookup errors
#[derive(Debug, Default)]
pub struct FailingUserStore;

#[async_trait]
impl UserStore for FailingUserStore {
    async fn first_user(&self) -> StoreResult<Option<Identity>> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn find_by_id(&self, _: UserId) -> StoreResult<Option<Identity>> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}
