//! Run modes.

use serde::{Deserialize, Serialize};

/// How a graph is traversed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Invoke every rule
    #[default]
    Normal,
    /// Dry run: never invoke rule logic, record a transcript instead
    Test,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Test => write!(f, "test"),
        }
    }
}

impl std::str::FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "test" | "dry-run" => Ok(Self::Test),
            other => Err(format!("unknown run mode: {other}")),
        }
    }
}
