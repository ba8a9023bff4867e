//! Batch detection of Umbraco CMS installations.
//!
//! The pipeline: [`extract`] pulls domains out of a CSV, [`probe`] fetches
//! each domain's `/umbraco/` path over HTTPS then HTTP, [`detect`] scores the
//! response against a weighted evidence rule set, and [`job`] drives the whole
//! list sequentially with progress tracking and cooperative cancellation.

pub mod cli;
pub mod company;
pub mod config;
pub mod detect;
pub mod export;
pub mod extract;
pub mod job;
pub mod probe;

pub use config::AppConfig;
pub use detect::{classify, Checker, Confidence, Detection, Verdict};
pub use extract::{extract_domains, DomainList};
pub use job::{run_job, JobStatus, JobStore};
pub use probe::{ProbeResult, Prober};
