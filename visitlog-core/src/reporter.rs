//! The visit reporter: capture, pick a strategy, send once, fall back.
//!
//! ```text
//! capture_context → DeliveryStrategy::select ─┬─ Remote ─────────┐
//!                                             ├─ CustomEndpoint ─┤ on failure
//!                                             └─ LocalBuffer ◄───┘
//! ```
//!
//! Send operations return their error; [`VisitReporter::report`] is the only
//! place that decides to log it and buffer instead.

use std::sync::Arc;

use serde::Serialize;

use crate::buffer::{VisitBuffer, BATCH_UPLOAD_THRESHOLD};
use crate::config::ReporterConfig;
use crate::context::{capture_context, PageEnvironment};
use crate::delivery::{
    BatchUploader, DeliveryStrategy, DeliveryTarget, HttpTransport, PostRequest, RemoteEnvelope,
    Transport, UnimplementedBatchUpload,
};
use crate::error::{Error, Result};
use crate::session::get_or_create_session_id;
use crate::storage::KeyValueStore;
use crate::types::PageVisitRecord;

/// How one report ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReportOutcome {
    /// The endpoint received the request (whatever status it answered)
    Delivered { target: DeliveryTarget, status: u16 },
    /// The visit is in the local buffer
    Buffered {
        /// Set when a network strategy failed first
        fallback_from: Option<DeliveryTarget>,
        len: usize,
        batch_upload_requested: bool,
    },
    /// Buffering failed (e.g. quota exceeded); the visit is lost
    Dropped {
        fallback_from: Option<DeliveryTarget>,
        reason: String,
    },
}

/// Result of writing to the local buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferOutcome {
    Stored {
        len: usize,
        batch_upload_requested: bool,
    },
    Dropped {
        reason: String,
    },
}

impl BufferOutcome {
    fn into_report(self, fallback_from: Option<DeliveryTarget>) -> ReportOutcome {
        match self {
            BufferOutcome::Stored {
                len,
                batch_upload_requested,
            } => ReportOutcome::Buffered {
                fallback_from,
                len,
                batch_upload_requested,
            },
            BufferOutcome::Dropped { reason } => ReportOutcome::Dropped {
                fallback_from,
                reason,
            },
        }
    }
}

/// Reports page visits for one tab of one origin
#[derive(Clone)]
pub struct VisitReporter {
    config: ReporterConfig,
    environment: Arc<dyn PageEnvironment>,
    tab_store: Arc<dyn KeyValueStore>,
    buffer: VisitBuffer,
    transport: Arc<dyn Transport>,
    batch_uploader: Arc<dyn BatchUploader>,
}

impl VisitReporter {
    /// Create a reporter with the HTTP transport and the placeholder batch uploader
    pub fn new(
        config: ReporterConfig,
        environment: Arc<dyn PageEnvironment>,
        tab_store: Arc<dyn KeyValueStore>,
        origin_store: Arc<dyn KeyValueStore>,
    ) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        if config.use_github_gist {
            tracing::warn!("use_github_gist has no strategy behind it; ignoring");
        }

        Ok(Self {
            config,
            environment,
            tab_store,
            buffer: VisitBuffer::new(origin_store),
            transport: Arc::new(transport),
            batch_uploader: Arc::new(UnimplementedBatchUpload),
        })
    }

    /// Replace the transport (tests, custom HTTP stacks)
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_batch_uploader(mut self, uploader: Arc<dyn BatchUploader>) -> Self {
        self.batch_uploader = uploader;
        self
    }

    pub fn config(&self) -> &ReporterConfig {
        &self.config
    }

    /// The origin's visit buffer
    pub fn buffer(&self) -> &VisitBuffer {
        &self.buffer
    }

    /// Strategy the next report will use
    pub fn strategy(&self) -> DeliveryStrategy {
        DeliveryStrategy::select(&self.config)
    }

    /// Snapshot the current page into a record
    pub fn capture_context(&self) -> PageVisitRecord {
        capture_context(self.environment.as_ref(), self.tab_store.as_ref())
    }

    pub fn session_id(&self) -> String {
        get_or_create_session_id(self.tab_store.as_ref())
    }

    /// Capture the current page and report it
    pub async fn report_current_page(&self) -> Result<ReportOutcome> {
        let record = self.capture_context();
        self.report(record).await
    }

    /// Deliver one record with exactly one strategy.
    ///
    /// Network failures fall back to the buffer. Only a corrupt buffer is
    /// returned as an error.
    pub async fn report(&self, record: PageVisitRecord) -> Result<ReportOutcome> {
        let (target, sent) = match self.strategy() {
            DeliveryStrategy::Remote { token } => (
                DeliveryTarget::Remote,
                self.send_to_remote(&record, &token).await,
            ),
            DeliveryStrategy::CustomEndpoint { url } => (
                DeliveryTarget::CustomEndpoint,
                self.send_to_custom_endpoint(&record, &url).await,
            ),
            DeliveryStrategy::LocalBuffer => {
                let outcome = self.buffer_locally(record)?.into_report(None);
                tracing::info!(?outcome, "Visit buffered locally");
                return Ok(outcome);
            }
        };

        match sent {
            Ok(status) => {
                tracing::info!(%target, status, path = %record.path, "Visit delivered");
                Ok(ReportOutcome::Delivered { target, status })
            }
            Err(e) => {
                tracing::debug!(%target, error = %e, "Delivery failed; buffering visit locally");
                let outcome = self.buffer_locally(record)?.into_report(Some(target));
                tracing::info!(?outcome, "Visit buffered after failed delivery");
                Ok(outcome)
            }
        }
    }

    /// POST the envelope-wrapped record to the remote endpoint with a bearer token
    pub async fn send_to_remote(&self, record: &PageVisitRecord, token: &str) -> Result<u16> {
        let body = serde_json::to_value(RemoteEnvelope::new(record))?;
        self.transport
            .post_json(PostRequest {
                url: &self.config.logtail_endpoint,
                bearer_token: Some(token),
                body,
            })
            .await
    }

    /// POST the bare record to the custom endpoint, unauthenticated
    pub async fn send_to_custom_endpoint(
        &self,
        record: &PageVisitRecord,
        url: &str,
    ) -> Result<u16> {
        let body = serde_json::to_value(record)?;
        self.transport
            .post_json(PostRequest {
                url,
                bearer_token: None,
                body,
            })
            .await
    }

    /// Append to the origin buffer, then request a batch upload when due.
    ///
    /// Storage failures drop the record (logged); a corrupt buffer is an error.
    pub fn buffer_locally(&self, record: PageVisitRecord) -> Result<BufferOutcome> {
        let records = match self.buffer.append(record) {
            Ok(records) => records,
            Err(Error::CorruptBuffer(e)) => return Err(Error::CorruptBuffer(e)),
            Err(e) => {
                tracing::debug!(error = %e, "Failed to buffer visit; dropping it");
                return Ok(BufferOutcome::Dropped {
                    reason: e.to_string(),
                });
            }
        };

        let len = records.len();
        let batch_upload_requested = len >= BATCH_UPLOAD_THRESHOLD && self.config.has_remote();
        if batch_upload_requested {
            if let Err(e) = self.batch_uploader.upload_batch(&records) {
                tracing::debug!(buffered = len, error = %e, "Batch upload skipped");
            }
        }

        Ok(BufferOutcome::Stored {
            len,
            batch_upload_requested,
        })
    }
}
