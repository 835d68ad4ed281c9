//! History export ingestion: size reports, commit segmentation, and record building.
//!
//! Turns the line stream of a delimited `git log --numstat` export into
//! [`Commit`](churnscope_core::Commit) records, optionally enriched with
//! per-file code sizes from a `cloc --by-file --csv` report.

pub mod reader;
pub mod record;
pub mod segmenter;
pub mod size_report;
