//! Probabilistic record linkage engine.
//!
//! Receives pre-standardized datasets and a TOML configuration, and runs
//! the full pipeline: blocking indexes narrow the pair space, field
//! comparators score each candidate pair into a comparison vector, a
//! classifier turns vectors into weighted match decisions, and an
//! optional assignment stage resolves them into an optimal one-to-one
//! matching. Loading, standardization and reporting live outside this
//! crate.

pub mod assign;
pub mod candidates;
pub mod classify;
pub mod compare;
pub mod config;
pub mod index;
pub mod model;
pub mod parallel;
pub mod pipeline;

pub use config::{LinkConfig, Mode};
pub use model::{
    Assignment, CandidatePair, ClassifiedPair, ComparisonVector, Decision, Diagnostic, LinkOutput,
    LinkSummary,
};
pub use parallel::CancelToken;
pub use pipeline::{run, run_with_cancel};
