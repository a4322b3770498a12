//! Dataset version numbering and lifecycle state

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a dataset version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VersionState {
    Draft,
    Released,
    Archived,
    Deaccessioned,
}

impl VersionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionState::Draft => "DRAFT",
            VersionState::Released => "RELEASED",
            VersionState::Archived => "ARCHIVED",
            VersionState::Deaccessioned => "DEACCESSIONED",
        }
    }

    /// Exact, upper-case names only
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "DRAFT" => Some(VersionState::Draft),
            "RELEASED" => Some(VersionState::Released),
            "ARCHIVED" => Some(VersionState::Archived),
            "DEACCESSIONED" => Some(VersionState::Deaccessioned),
            _ => None,
        }
    }
}

impl fmt::Display for VersionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `major.minor` number of a released dataset version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionNumber {
    pub major: i64,
    pub minor: i64,
}

impl VersionNumber {
    pub fn new(major: i64, minor: i64) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
