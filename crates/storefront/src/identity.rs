//! Anonymous per-device cart identity.
//!
//! Shopping needs no login. Each device gets a random [`CartId`] the first time
//! the cart is touched, stored under [`CART_ID_KEY`] in local storage. The id
//! survives restarts and is only lost when that storage is cleared; nothing in
//! this crate ever regenerates a valid stored id.
//!
//! Ids are UUID v4 drawn from the operating system's CSPRNG (122 random bits),
//! so two devices colliding is not a practical concern.

use tracing::{info, warn};

use mauve_core::CartId;

use crate::storage::{LocalStorage, StorageError};

/// Local storage key holding the cart id.
pub const CART_ID_KEY: &str = "cart_id";

/// The device's anonymous cart identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionIdentity {
    cart_id: CartId,
    created: bool,
}

impl SessionIdentity {
    /// Read the stored cart id, creating and persisting one if absent.
    ///
    /// A stored value that is not a UUID is treated as absent and replaced.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if storage cannot be read, or if a fresh id cannot
    /// be persisted (an id that would not survive a reload is never handed out).
    pub fn load_or_create(storage: &dyn LocalStorage) -> Result<Self, StorageError> {
        if let Some(stored) = storage.get(CART_ID_KEY)? {
            match CartId::parse(&stored) {
                Ok(cart_id) => {
                    return Ok(Self {
                        cart_id,
                        created: false,
                    });
                }
                Err(e) => warn!(error = %e, "stored cart id is not a UUID, replacing it"),
            }
        }

        let cart_id = CartId::generate();
        storage.set(CART_ID_KEY, &cart_id.to_string())?;
        info!(%cart_id, "created new anonymous cart id");

        Ok(Self {
            cart_id,
            created: true,
        })
    }

    /// Identity for a known id, bypassing storage.
    #[must_use]
    pub const fn from_cart_id(cart_id: CartId) -> Self {
        Self {
            cart_id,
            created: false,
        }
    }

    /// The cart's partition key.
    #[must_use]
    pub const fn cart_id(&self) -> CartId {
        self.cart_id
    }

    /// Whether this call created the id (first visit on this device).
    #[must_use]
    pub const fn is_new(&self) -> bool {
        self.created
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_creates_once_then_reuses() {
        let storage = MemoryStorage::new();

        let first = SessionIdentity::load_or_create(&storage).unwrap();
        let second = SessionIdentity::load_or_create(&storage).unwrap();

        assert!(first.is_new());
        assert!(!second.is_new());
        assert_eq!(first.cart_id(), second.cart_id());
    }

    #[test]
    fn test_persists_under_fixed_key() {
        let storage = MemoryStorage::new();
        let identity = SessionIdentity::load_or_create(&storage).unwrap();

        assert_eq!(
            storage.get(CART_ID_KEY).unwrap(),
            Some(identity.cart_id().to_string())
        );
    }

    #[test]
    fn test_replaces_invalid_stored_value() {
        let storage = MemoryStorage::new();
        storage.set(CART_ID_KEY, "definitely-not-a-uuid").unwrap();

        let identity = SessionIdentity::load_or_create(&storage).unwrap();

        assert!(identity.is_new());
        assert_eq!(
            storage.get(CART_ID_KEY).unwrap(),
            Some(identity.cart_id().to_string())
        );
    }

    #[test]
    fn test_separate_devices_get_separate_ids() {
        let a = SessionIdentity::load_or_create(&MemoryStorage::new()).unwrap();
        let b = SessionIdentity::load_or_create(&MemoryStorage::new()).unwrap();
        assert_ne!(a.cart_id(), b.cart_id());
    }
}
