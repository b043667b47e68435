//! Persistence for the Souk checkout core.
//!
//! The [`Store`] trait is the storage port the services program against.
//! Its contract is intentionally narrow:
//!
//! - Carts are written with compare-and-set on a revision.
//! - Stock and discount usage only change inside [`Store::commit_checkout`],
//!   which checks every condition and applies every effect as one unit.
//!
//! [`MemoryStore`] is the in-process engine used by tests and the CLI.
//!
//! # Example
//!
//! ```rust,ignore
//! use souk_store::{MemoryStore, Store};
//!
//! let store = MemoryStore::new();
//! store.upsert_product(product).await?;
//! let cart = store.cart(&owner).await?;
//! ```

mod error;
mod memory;
mod snapshot;
mod store;

pub use error::{CommitRejection, StoreError, StoreResult};
pub use memory::MemoryStore;
pub use snapshot::StoreSnapshot;
pub use store::{CartMerge, CheckoutCommit, CommitLine, CommitOutcome, DiscountClaim, Store};
