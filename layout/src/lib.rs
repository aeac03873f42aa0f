//! Column layout persistence for customizable table views.
//!
//! The [`LayoutEngine`] owns the ordered, partially-visible, partially-frozen
//! set of column descriptors for one table identity, merges each freshly
//! supplied schema against previously persisted user customization, and
//! writes every change through to a durable [`LayoutStore`].
//!
//! Layout customization is a convenience, not a correctness requirement:
//! storage failures degrade to an in-memory-only session and are never
//! surfaced to the caller.

mod engine;
mod store;

pub use engine::LayoutEngine;
pub use store::{DirStore, LayoutStore, MemoryStore, StoreError};
