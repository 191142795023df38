//! Body format for the remote log endpoint
//!
//! ```json
//! {"dt": "...", "level": "info", "message": "Page visit", "timestamp": "...", "url": "...", ...}
//! ```
//!
//! `dt` repeats the capture time; the record's own fields follow flattened.

use serde::Serialize;

use crate::types::PageVisitRecord;

/// Severity attached to every remote visit
pub const REMOTE_LEVEL: &str = "info";

/// Message attached to every remote visit
pub const REMOTE_MESSAGE: &str = "Page visit";

/// Remote body: fixed envelope merged with the record
#[derive(Debug, Serialize)]
pub struct RemoteEnvelope<'a> {
    pub dt: String,
    pub level: &'static str,
    pub message: &'static str,
    #[serde(flatten)]
    pub record: &'a PageVisitRecord,
}

impl<'a> RemoteEnvelope<'a> {
    pub fn new(record: &'a PageVisitRecord) -> Self {
        Self {
            dt: crate::types::to_iso8601(&record.timestamp),
            level: REMOTE_LEVEL,
            message: REMOTE_MESSAGE,
            record,
        }
    }
}
