//! Capped append-only log of visits kept in origin storage
//!
//! The whole buffer lives under one key as a JSON array, oldest first, with
//! the time of the last write under a companion key. Every append rewrites
//! both. Concurrent writers (two tabs) are not coordinated: last write wins.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::storage::{KeyValueStore, BUFFER_KEY, BUFFER_UPDATED_KEY};
use crate::types::{to_iso8601, PageVisitRecord};

/// Most visits the buffer holds; older ones are evicted first
pub const MAX_BUFFERED_VISITS: usize = 1000;

/// Buffer length at which a batch upload is requested
pub const BATCH_UPLOAD_THRESHOLD: usize = 100;

/// Visit buffer for one origin
#[derive(Clone)]
pub struct VisitBuffer {
    store: Arc<dyn KeyValueStore>,
    capacity: usize,
}

impl VisitBuffer {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_capacity(store, MAX_BUFFERED_VISITS)
    }

    /// Buffer with a non-default cap (at least 1)
    pub fn with_capacity(store: Arc<dyn KeyValueStore>, capacity: usize) -> Self {
        Self {
            store,
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// All buffered visits, oldest first.
    ///
    /// A missing key is an empty buffer; unparsable content is
    /// [`Error::CorruptBuffer`].
    pub fn records(&self) -> Result<Vec<PageVisitRecord>> {
        match self.store.get(BUFFER_KEY)? {
            Some(raw) => serde_json::from_str(&raw).map_err(Error::CorruptBuffer),
            None => Ok(Vec::new()),
        }
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.records()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Append one visit, evict down to capacity, persist.
    ///
    /// Returns the buffer contents as written.
    pub fn append(&self, record: PageVisitRecord) -> Result<Vec<PageVisitRecord>> {
        let mut records = self.records()?;
        records.push(record);

        if records.len() > self.capacity {
            let excess = records.len() - self.capacity;
            records.drain(..excess);
            tracing::debug!(evicted = excess, "Evicted oldest buffered visits");
        }

        let raw = serde_json::to_string(&records)?;
        self.store.set(BUFFER_KEY, &raw)?;
        // The visits are stored; a missing marker only affects `last_updated`
        if let Err(e) = self.store.set(BUFFER_UPDATED_KEY, &to_iso8601(&Utc::now())) {
            tracing::debug!(error = %e, "Failed to stamp visit buffer");
        }

        Ok(records)
    }

    /// Time of the last successful append, if any
    pub fn last_updated(&self) -> Result<Option<DateTime<Utc>>> {
        let Some(raw) = self.store.get(BUFFER_UPDATED_KEY)? else {
            return Ok(None);
        };
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| {
                Error::Storage(format!(
                    "invalid {} value {:?}: {}",
                    BUFFER_UPDATED_KEY, raw, e
                ))
            })
    }

    /// Drop every buffered visit and the last-updated marker
    pub fn clear(&self) -> Result<()> {
        self.store.remove(BUFFER_KEY)?;
        self.store.remove(BUFFER_UPDATED_KEY)
    }
}
