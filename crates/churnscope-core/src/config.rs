use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::ChurnError;
use crate::types::parse_date;

/// Top-level configuration loaded from `.churnscope.toml`.
///
/// Supports layered resolution: CLI flags > local config > defaults.
///
/// # Examples
///
/// ```
/// use churnscope_core::ChurnscopeConfig;
///
/// let config = ChurnscopeConfig::default();
/// assert_eq!(config.log.sentinel, "§§§");
/// assert_eq!(config.coupling.window_days, 1);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChurnscopeConfig {
    /// History log format.
    #[serde(default)]
    pub log: LogConfig,
    /// File churn settings.
    #[serde(default)]
    pub churn: ChurnConfig,
    /// Coupling window settings.
    #[serde(default)]
    pub coupling: CouplingConfig,
    /// Contributor ranking settings.
    #[serde(default)]
    pub contributors: ContributorsConfig,
}

impl ChurnscopeConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::Io`] if the file cannot be read,
    /// [`ChurnError::Toml`] if the content is not valid TOML, or
    /// [`ChurnError::Config`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ChurnError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::Toml`] if parsing fails, or
    /// [`ChurnError::Config`] if validation fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use churnscope_core::ChurnscopeConfig;
    ///
    /// let toml = r#"
    /// [coupling]
    /// window_days = 7
    /// "#;
    /// let config = ChurnscopeConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.coupling.window_days, 7);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, ChurnError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that the type system cannot.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::Config`] naming the first invalid value.
    pub fn validate(&self) -> Result<(), ChurnError> {
        if self.log.sentinel.is_empty() {
            return Err(ChurnError::Config("log.sentinel must not be empty".into()));
        }
        if self.log.separator.is_empty() {
            return Err(ChurnError::Config("log.separator must not be empty".into()));
        }
        if self.coupling.window_days == 0 {
            return Err(ChurnError::Config(
                "coupling.window_days must be at least 1".into(),
            ));
        }
        self.churn.cutoff_date()?;
        Ok(())
    }
}

/// Delimiters of the exported history log.
///
/// # Examples
///
/// ```
/// use churnscope_core::LogConfig;
///
/// let log = LogConfig::default();
/// assert_eq!(log.separator, log.sentinel);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Prefix that marks a commit header line.
    #[serde(default = "default_sentinel")]
    pub sentinel: String,
    /// Field separator inside a header line.
    #[serde(default = "default_sentinel")]
    pub separator: String,
}

fn default_sentinel() -> String {
    "§§§".into()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            sentinel: default_sentinel(),
            separator: default_sentinel(),
        }
    }
}

/// File churn configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChurnConfig {
    /// Only count churn from commits strictly after this date.
    pub cutoff: Option<String>,
    /// Path segments kept when rolling files up into folders (default: 1).
    #[serde(default = "default_folder_depth")]
    pub folder_depth: usize,
}

fn default_folder_depth() -> usize {
    1
}

impl Default for ChurnConfig {
    fn default() -> Self {
        Self {
            cutoff: None,
            folder_depth: default_folder_depth(),
        }
    }
}

impl ChurnConfig {
    /// The parsed cutoff, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::Config`] if `cutoff` is not a recognised date.
    ///
    /// # Examples
    ///
    /// ```
    /// use churnscope_core::ChurnConfig;
    ///
    /// let churn = ChurnConfig { cutoff: Some("2021-01-01".into()), folder_depth: 1 };
    /// assert!(churn.cutoff_date().unwrap().is_some());
    /// ```
    pub fn cutoff_date(&self) -> Result<Option<DateTime<FixedOffset>>, ChurnError> {
        match self.cutoff.as_deref() {
            None => Ok(None),
            Some(raw) => parse_date(raw)
                .map(Some)
                .ok_or_else(|| ChurnError::Config(format!("invalid churn.cutoff date: {raw}"))),
        }
    }
}

/// Coupling window configuration.
///
/// # Examples
///
/// ```
/// use churnscope_core::CouplingConfig;
///
/// let config = CouplingConfig::default();
/// assert_eq!(config.tuple_warning_threshold, 1_000_000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouplingConfig {
    /// Length of each non-overlapping window in days (default: 1).
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    /// Generated tuple count after which a warning is logged.
    #[serde(default = "default_tuple_warning_threshold")]
    pub tuple_warning_threshold: usize,
}

fn default_window_days() -> u32 {
    1
}

fn default_tuple_warning_threshold() -> usize {
    1_000_000
}

impl Default for CouplingConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            tuple_warning_threshold: default_tuple_warning_threshold(),
        }
    }
}

/// Contributor ranking configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributorsConfig {
    /// How many authors are named before the rest fold into "others".
    #[serde(default = "default_top")]
    pub top: usize,
    /// Bucket size for period summaries.
    #[serde(default)]
    pub period: Period,
}

fn default_top() -> usize {
    10
}

impl Default for ContributorsConfig {
    fn default() -> Self {
        Self {
            top: default_top(),
            period: Period::default(),
        }
    }
}

/// Calendar bucket used by period summaries.
///
/// # Examples
///
/// ```
/// use churnscope_core::Period;
///
/// assert_eq!("week".parse::<Period>().unwrap(), Period::Week);
/// assert_eq!(Period::Day.to_string(), "day");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    /// One calendar day.
    Day,
    /// An ISO week starting on Monday.
    #[default]
    Week,
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Day => write!(f, "day"),
            Period::Week => write!(f, "week"),
        }
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "day" => Ok(Period::Day),
            "week" => Ok(Period::Week),
            other => Err(format!("unknown period: {other}")),
        }
    }
}
