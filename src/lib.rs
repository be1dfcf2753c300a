//=====================================================
// File: lib.rs
//=====================================================
// Author: SolvraOS Contributors
// License: Duality Public License (DPL v1.0)
// Goal: Runtime method-instrumentation profiler
// Objective: Select eligible methods, rewrite their bodies to record
//            timing and memory deltas, and rank the results
//=====================================================

//! SolvraProfiler instruments methods of a running program without source
//! annotations.
//!
//! The pipeline is: enumerate candidates from a [`reflect::Domain`], keep
//! those the [`eligibility::EligibilityFilter`] allows, register each in the
//! [`registry::InstrumentationRegistry`], hand the host's patcher a body
//! produced by [`rewriter::rewrite`], and later read the
//! [`metrics::MetricsStore`] through [`metrics::build_report`]. The
//! [`profiler::Profiler`] context drives all of it.
//!
//! [`vm::Runtime`] is a reference host that executes method bodies and
//! implements every host trait in [`host`].

use thiserror::Error;

pub mod body;
pub mod collections;
pub mod config;
pub mod demo;
pub mod eligibility;
pub mod host;
pub mod logging;
pub mod metrics;
pub mod profiler;
pub mod reflect;
pub mod registry;
pub mod rewriter;
pub mod vm;

pub use config::ProfilerConfig;
pub use eligibility::EligibilityFilter;
pub use metrics::{Report, ReportOptions};
pub use profiler::{EnableSummary, Profiler};
pub use registry::{InstrumentationRegistry, Slot};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProfilerError {
    #[error("method {0} has no executable body")]
    MissingBody(String),
    #[error("declaring type of {0} is an open generic")]
    OpenGenericType(String),
    #[error("{method} inherits from open generic {ancestor}")]
    OpenGenericAncestor { method: String, ancestor: String },
    #[error("method {0} was already registered or the registry is full")]
    RegistrationRejected(String),
    #[error("unknown method {0}")]
    UnknownMethod(String),
    #[error("unknown field {0}")]
    UnknownField(String),
    #[error("field {field} has unsupported container type {type_name}")]
    UnsupportedShape { field: String, type_name: String },
    #[error("stack underflow in {0}")]
    StackUnderflow(String),
    #[error("jump to undefined label {label} in {method}")]
    UnknownLabel { method: String, label: u32 },
    #[error("{0}")]
    Vm(String),
    #[error("{0}")]
    Config(String),
}

pub type ProfilerResult<T> = Result<T, ProfilerError>;

//=====================================================
// End of file
//=====================================================
