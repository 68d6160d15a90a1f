//! Operating mode

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the process authenticates callers. Fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingMode {
    /// Single implicit user; credentials are never inspected.
    Platform,
    /// Every caller must present a verifiable credential.
    #[default]
    Standalone,
}

impl OperatingMode {
    /// Map the `IS_PLATFORM`-style boolean flag onto a mode.
    ///
    /// Only the exact string `"true"` selects platform mode.
    pub fn from_flag(flag: Option<&str>) -> Self {
        match flag {
            Some("true") => Self::Platform,
            _ => Self::Standalone,
        }
    }

    pub fn is_platform(&self) -> bool {
        matches!(self, Self::Platform)
    }
}

impl std::fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Platform => write!(f, "platform"),
            Self::Standalone => write!(f, "standalone"),
        }
    }
}

impl std::str::FromStr for OperatingMode {
    type Err = InvalidMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "platform" => Ok(Self::Platform),
            "standalone" => Ok(Self::Standalone),
            _ => Err(InvalidMode(s.to_string())),
        }
    }
}

/// Unrecognised operating mode name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid operating mode: {0}")]
pub struct InvalidMode(pub String);
