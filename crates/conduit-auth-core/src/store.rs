//! User store seam
//!
//! The auth layer only needs two lookups from whatever owns user records.

use async_trait::async_trait;
use conduit_types::{Identity, UserId};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// User store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backing store could not answer
    #[error("user store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Lookup capability the access guard consumes
#[async_trait]
pub trait UserStore: Send + Sync {
    /// The sole (or first) user, used by platform mode
    async fn first_user(&self) -> StoreResult<Option<Identity>>;

    /// Find a user by ID
    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<Identity>>;
}

#[async_trait]
impl<T: UserStore + ?Sized> UserStore for Arc<T> {
    async fn first_user(&self) -> StoreResult<Option<Identity>> {
        (**self).first_user().await
    }

    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<Identity>> {
        (**self).find_by_id(id).await
    }
}

/// In-memory user store ordered by ID.
///
/// "First user" is the one with the lowest ID.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<BTreeMap<UserId, Identity>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `users`
    pub fn with_users(users: impl IntoIterator<Item = Identity>) -> Self {
        Self {
            users: RwLock::new(users.into_iter().map(|u| (u.id, u)).collect()),
        }
    }

    /// Insert or replace a user
    pub async fn insert(&self, identity: Identity) {
        self.users.write().await.insert(identity.id, identity);
    }

    /// Remove a user, returning it if present
    pub async fn remove(&self, id: UserId) -> Option<Identity> {
        self.users.write().await.remove(&id)
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn first_user(&self) -> StoreResult<Option<Identity>> {
        Ok(self.users.read().await.values().next().cloned())
    }

    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<Identity>> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_user_is_lowest_id() {
        let store = MemoryUserStore::with_users([
            Identity::new(5, "eve"),
            Identity::new(2, "bob"),
            Identity::new(9, "ivan"),
        ]);

        let first = store.first_user().await.unwrap().unwrap();
        assert_eq!(first.username, "bob");
    }

    #[tokio::test]
    async fn test_empty_store() {
        let store = MemoryUserStore::new();
        assert!(store.is_empty().await);
        assert!(store.first_user().await.unwrap().is_none());
        assert!(store.find_by_id(UserId(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_and_remove() {
        let store = MemoryUserStore::new();
        store.insert(Identity::new(1, "alice")).await;
        assert_eq!(store.len().await, 1);
        assert!(store.find_by_id(UserId(1)).await.unwrap().is_some());

        let removed = store.remove(UserId(1)).await;
        assert_eq!(removed.map(|u| u.username), Some("alice".to_string()));
        assert!(store.find_by_id(UserId(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_arc_store_delegates() {
        let store: Arc<dyn UserStore> =
            Arc::new(MemoryUserStore::with_users([Identity::new(3, "carol")]));
        let found = store.find_by_id(UserId(3)).await.unwrap();
        assert_eq!(found.unwrap().username, "carol");
    }
}
