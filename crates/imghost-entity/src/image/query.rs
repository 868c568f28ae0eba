//! Image listing filters.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use imghost_core::types::PageRequest;

/// Filters for listing images. Unset fields do not restrict the result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageQuery {
    #[serde(default)]
    pub page: PageRequest,
    pub storage_engine_id: Option<i64>,
    /// Exact MIME type match.
    pub file_type: Option<String>,
    /// Defaults to live images only.
    pub is_deleted: Option<bool>,
    /// Only images uploaded on or after this day (UTC).
    pub start_date: Option<NaiveDate>,
    /// Only images uploaded on or before this day (UTC).
    pub end_date: Option<NaiveDate>,
}

/// How an incoming upload is matched against stored images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupPolicy {
    /// Either the MD5 or the SHA-256 matches.
    #[default]
    Any,
    /// Both digests match.
    Both,
}

impl DedupPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Both => "both",
        }
    }
}

impl std::str::FromStr for DedupPolicy {
    type Err = imghost_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "any" | "or" => Ok(Self::Any),
            "both" | "and" => Ok(Self::Both),
            _ => Err(imghost_core::AppError::validation(format!(
                "Invalid dedup policy: '{s}'. Expected 'any' or 'both'"
            ))),
        }
    }
}
