//! Destination plans.

use super::MediaType;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where a source file should be linked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationPlan {
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
    pub canonical_name: String,
    pub media_type: MediaType,
}

impl DestinationPlan {
    /// Whether the plan routes the file to the unmatched area.
    pub fn is_unmatched(&self) -> bool {
        self.media_type == MediaType::Unmatched
    }
}
