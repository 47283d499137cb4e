//! LM-driven specialty profile generator.
//!
//! Turns a specialty description into a canonical business-intelligence
//! profile through one of two strategies: a three-stage multipass pipeline
//! with per-stage validation and retries, or a single hybrid gap-fill call
//! when deterministic facts are already available.

pub mod completion;
pub mod error;
pub mod extract;
pub mod hybrid;
pub mod merge;
pub mod multipass;
pub mod orchestrator;
pub mod schema;
pub mod score;
pub mod state;
pub mod store;
pub mod validators;
