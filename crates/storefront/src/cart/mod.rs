//! Cart session state machine.
//!
//! A [`CartStore`] owns the device's cart: it loads the remote rows once,
//! applies add/remove/clear against the remote table first and locally second,
//! derives totals on read, and emits a [`CartEvent`] for each success.
//!
//! ```rust,ignore
//! let identity = SessionIdentity::load_or_create(&storage)?;
//! let (cart, loaded) = CartStore::open(identity, table).await;
//! if let Err(e) = loaded {
//!     tracing::warn!(error = %e, "showing an unknown cart as empty");
//! }
//! cart.add_item(ProductInput::new("Lip Gloss", "12,500")).await?;
//! ```

mod error;
mod event;
mod item;
mod locks;
mod store;

pub use error::{CartError, CartOperation};
pub use event::{CartEvent, CartEventKind};
pub use item::{CartItem, ProductInput, total_of};
pub use store::{CartPhase, CartSnapshot, CartStore};
