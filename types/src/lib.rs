//! Core domain types for the Despacho back-office runtime.
//!
//! This crate contains pure domain types with no IO, no async, and minimal
//! dependencies. Everything here can be used from any layer of the
//! application.

mod column;
mod ids;
mod settings;
mod task;

pub use column::{ACTION_COLUMN_ORDER, ColumnDescriptor, ColumnStyles, column_slug};
pub use ids::TaskId;
pub use settings::RuntimeSettings;
pub use task::{Task, TaskOutcome, TaskState};
