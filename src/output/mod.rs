//! Output module for run reports
//!
//! This module handles:
//! - Counters produced by sync and stale reprocessing runs
//! - Completion ratios
//! - Console summaries printed at the end of each run

pub mod stats;

pub use stats::{
    format_ratio, print_reprocess_report, print_sync_report, ratio, BatchReport, ReprocessReport,
    SyncReport,
};
