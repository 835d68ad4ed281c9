//! Core types, configuration, and error handling for churnscope.
//!
//! This crate provides the shared foundation used by the other churnscope crates:
//! - [`ChurnError`]: unified error type using `thiserror`
//! - [`ChurnscopeConfig`]: configuration loaded from `.churnscope.toml`
//! - Shared records: [`Commit`], [`FileChange`], [`SizeReportEntry`], [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{
    ChurnConfig, ChurnscopeConfig, ContributorsConfig, CouplingConfig, LogConfig, Period,
};
pub use error::ChurnError;
pub use types::{parse_date, Commit, FileChange, OutputFormat, SizeReportEntry};

/// A convenience `Result` type for churnscope operations.
pub type Result<T> = std::result::Result<T, ChurnError>;
