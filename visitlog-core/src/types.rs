//! Core domain types for visitlog
//!
//! | Term | Definition |
//! |------|------------|
//! | **Visit** | One page load, captured once as a [`PageVisitRecord`] |
//! | **Session** | The lifetime of one browsing tab; all its visits share a session id |
//! | **Origin** | Scheme + host + port; the buffer is shared by every page of an origin |
//! | **Buffer** | The capped list of visits kept in origin storage when delivery is off or failed |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// Page Visit
// ============================================

/// Width and height in CSS pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Snapshot of one page visit.
///
/// Built once by [`crate::context::capture_context`] and never mutated
/// afterwards; every delivery path serializes the same value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageVisitRecord {
    /// Capture time
    #[serde(with = "iso8601")]
    pub timestamp: DateTime<Utc>,
    /// Full location href
    pub url: String,
    /// Path component of `url`
    pub path: String,
    pub title: String,
    /// Referring page, or `"direct"`
    pub referrer: String,
    pub user_agent: String,
    pub language: String,
    pub screen: Dimensions,
    pub viewport: Dimensions,
    pub session_id: String,
}

/// Referrer recorded when the page was opened directly
pub const DIRECT_REFERRER: &str = "direct";

/// Formats a timestamp the way browsers render `Date#toISOString`
/// (`2024-05-01T12:00:00.000Z`).
pub fn to_iso8601(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Serde adapter pinning timestamps to millisecond ISO-8601 with a `Z` suffix.
pub(crate) mod iso8601 {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::to_iso8601(ts))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
