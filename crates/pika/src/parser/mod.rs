//! # Parser Module
//!
//! The bottom-up fixpoint driver and batch-parsing support.
//!
//! [`ParseDriver`] owns the seed/propagate loop described in the crate docs;
//! [`parallel`] adds whole-batch parsing across inputs, parallel when the
//! `parallel` feature is enabled.

pub mod driver;
pub mod parallel;

pub use driver::{
    DriverConfig, NullEventHandler, ParseDriver, ParseEvent, ParseEventHandler, ParseMetrics,
    ParseResult,
};
pub use parallel::{BatchItemResult, BatchSummary, ParseBatch, summarize};
