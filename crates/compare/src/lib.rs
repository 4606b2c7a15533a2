//! `reclink-compare` — Field similarity primitives.
//!
//! Pure functions scoring two already-standardized values into [0, 1]
//! (1.0 = identical, 0.0 = total disagreement). Missing-value handling,
//! comparator registries and weighting live in the engine crate; nothing
//! here knows about records or configuration.
//!
//! All functions are deterministic. Symmetric unless the doc comment says
//! otherwise (the asymmetric day-window comparison is the one exception).

pub mod date;
pub mod encode;
pub mod numeric;
pub mod string;

pub use encode::PhoneticCode;
