//! Data storage and aggregation module.
//!
//! Holds the day record type, the chronological history of archived days
//! and the merge/summary helpers that operate on them.

pub mod aggregator;
pub mod history;
pub mod types;

pub use aggregator::*;
pub use history::*;
pub use types::*;
