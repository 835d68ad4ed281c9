//! History statistics: file churn, temporal coupling, branch tips, and contributors.
//!
//! Consumes the [`Commit`](churnscope_core::Commit) records produced by
//! `churnscope-ingest` and derives per-file and per-folder churn, files that
//! change together inside the same time window, the evolving set of branch
//! tips, and who contributed how much over which period.

pub mod branch_tips;
pub mod churn;
pub mod contributors;
pub mod coupling;
