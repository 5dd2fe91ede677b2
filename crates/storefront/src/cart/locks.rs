//! Per-product-name serialization.
//!
//! Two adds of the same product must not both read the same "existing line"
//! snapshot. Holding the name's lock across read, remote call and local apply
//! makes same-name mutations strictly sequential while different names still
//! run concurrently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use mauve_core::ProductName;

#[derive(Debug, Default)]
pub(crate) struct NameLocks {
    locks: Mutex<HashMap<ProductName, Arc<AsyncMutex<()>>>>,
}

impl NameLocks {
    /// Wait for exclusive use of `name`.
    pub(crate) async fn lock(&self, name: &ProductName) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Entries only the map references are idle.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(name.clone()).or_default())
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_same_name_is_exclusive() {
        let locks = NameLocks::default();
        let name = ProductName::parse("Gel").unwrap();

        let guard = locks.lock(&name).await;
        let second = tokio::time::timeout(Duration::from_millis(20), locks.lock(&name)).await;
        assert!(second.is_err());

        drop(guard);
        let third = tokio::time::timeout(Duration::from_millis(20), locks.lock(&name)).await;
        assert!(third.is_ok());
    }

    #[tokio::test]
    async fn test_different_names_do_not_block() {
        let locks = NameLocks::default();
        let _a = locks.lock(&ProductName::parse("A").unwrap()).await;
        let b = tokio::time::timeout(
            Duration::from_millis(20),
            locks.lock(&ProductName::parse("B").unwrap()),
        )
        .await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_idle_entries_are_pruned() {
        let locks = NameLocks::default();
        for name in ["A", "B", "C"] {
            drop(locks.lock(&ProductName::parse(name).unwrap()).await);
        }
        // The last lock call pruned the earlier idle entries before inserting.
        assert_eq!(locks.len(), 1);
    }
}
