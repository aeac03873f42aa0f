//! Session-scoped runtime support services.
//!
//! Two independent leaf services used across every page of the back-office:
//!
//! - [`TaskRegistry`] tracks the lifecycle of long-running asynchronous
//!   operations (file uploads) with cooperative cancellation and timed
//!   cleanup of finished entries.
//! - [`TtlCache`] memoizes expensive remote lookups under a deterministic
//!   key for a fixed validity window.
//!
//! Neither service performs IO of its own: remote submission and abort are
//! the caller's job, the registry and cache only keep the books.

mod cache;
mod registry;

pub use cache::{CacheStats, TtlCache, cache_key};
pub use registry::{SubmitSignal, TaskRegistry};
