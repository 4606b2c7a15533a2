//! `reclink-core` — Shared types for the record linkage engine.
//!
//! Field values are tagged variants (already standardized by an external
//! loader), records are immutable field maps, and datasets hold records in
//! a positional arena so downstream stages can work with compact integer
//! indices instead of string ids.

pub mod error;
pub mod record;
pub mod value;

pub use error::LinkError;
pub use record::{Dataset, Record, RecordIdx};
pub use value::{DateParts, Value};
