//! Validated metadata records as stored in the cache.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// An image attached to a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Image {
    pub url: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
}

impl Image {
    /// Pixel area, with unknown dimensions counted as zero.
    pub fn area(&self) -> i64 {
        self.width.unwrap_or(0).saturating_mul(self.height.unwrap_or(0))
    }
}

/// Sanitized metadata for one URL.
///
/// Holds at most one image: the largest surviving one after blocked-domain
/// filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidatedRecord {
    pub description: Option<String>,
    pub favicon_url: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
    pub original_url: Option<String>,
    pub provider_display: Option<String>,
    pub provider_name: Option<String>,
    pub provider_url: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub url: Option<String>,
}
