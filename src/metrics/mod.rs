//=====================================================
// File: metrics/mod.rs
//=====================================================
// Author: SolvraOS Contributors
// License: Duality Public License (DPL v1.0)
// Goal: Per-method counters and the reports built from them
// Objective: Expose the slot-indexed store and the ranking report
//=====================================================

pub mod report;
pub mod store;

pub use report::{Ranking, Report, ReportEntry, ReportOptions, ReportSection, build_report};
pub use store::{Counter, MetricsRecord, MetricsSnapshot, MetricsStore, RecordRef};

//=====================================================
// End of file
//=====================================================
