//! Report aggregation and threshold-triggered moderation for Bulwark.
//!
//! - [`ReportAggregator`] - bounded per-message reporter sets with
//!   fire-once threshold crossing
//! - [`ActionDispatcher`] - performs alert / redact / ban through the
//!   moderation API and posts the audit notice
//! - [`TrustedReporters`] - report protection counting trusted reporters
//! - [`BasicFlooding`] - event protection against message floods

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod action;
mod aggregator;
mod dispatcher;
mod flooding;
mod trusted_reporters;

pub use action::{ACTION_CHOICES, ActionKind};
pub use aggregator::{
    DEFAULT_REPORT_CAPACITY, ReportAggregator, ReportRecord, ThresholdCrossing, ThresholdPlan,
};
pub use dispatcher::{ActionDispatcher, ActionOutcome, ActionRequest, DispatchReport};
pub use flooding::BasicFlooding;
pub use trusted_reporters::TrustedReporters;
