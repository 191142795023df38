//! Batch upload of buffered visits
//!
//! The reporter asks for a batch upload once the buffer holds
//! [`crate::buffer::BATCH_UPLOAD_THRESHOLD`] visits and a network strategy is
//! configured. No uploader exists yet: the default one reports
//! [`Error::NotImplemented`] and leaves the buffer alone.
//!
//! A real uploader must send and then truncate the uploaded prefix as one
//! step; otherwise a crash in between either re-sends or loses visits.

use crate::error::{Error, Result};
use crate::types::PageVisitRecord;

/// Uploads a batch of buffered visits
pub trait BatchUploader: Send + Sync {
    fn upload_batch(&self, records: &[PageVisitRecord]) -> Result<()>;
}

/// Placeholder uploader; never uploads, never clears.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnimplementedBatchUpload;

impl BatchUploader for UnimplementedBatchUpload {
    fn upload_batch(&self, _records: &[PageVisitRecord]) -> Result<()> {
        Err(Error::NotImplemented("batch upload"))
    }
}
