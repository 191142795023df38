//! Page-load trigger
//!
//! A page reports exactly once, when its ready state reaches
//! [`ReadyState::Complete`]. [`report_on_load`] spawns a detached task for
//! that; the caller may drop the handle, or await it to see the outcome.

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::reporter::{ReportOutcome, VisitReporter};

/// Document loading phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

/// Owner side of a page's ready state
#[derive(Debug)]
pub struct PageLifecycle {
    state: watch::Sender<ReadyState>,
}

impl PageLifecycle {
    pub fn new(initial: ReadyState) -> Self {
        let (state, _) = watch::channel(initial);
        Self { state }
    }

    /// A page that has already finished loading
    pub fn loaded() -> Self {
        Self::new(ReadyState::Complete)
    }

    pub fn ready_state(&self) -> ReadyState {
        *self.state.borrow()
    }

    pub fn set_ready_state(&self, next: ReadyState) {
        self.state.send_replace(next);
    }

    /// The load event
    pub fn mark_complete(&self) {
        self.set_ready_state(ReadyState::Complete);
    }

    pub fn subscribe(&self) -> LoadSignal {
        LoadSignal {
            state: self.state.subscribe(),
        }
    }
}

/// Waiter side of a page's ready state
#[derive(Debug, Clone)]
pub struct LoadSignal {
    state: watch::Receiver<ReadyState>,
}

impl LoadSignal {
    /// Resolve once the page is loaded; immediately if it already is.
    ///
    /// Fails with [`Error::PageClosed`] if the lifecycle is dropped first.
    pub async fn loaded(mut self) -> Result<()> {
        self.state
            .wait_for(|s| *s == ReadyState::Complete)
            .await
            .map(|_| ())
            .map_err(|_| Error::PageClosed)
    }
}

/// Report the current page once it has loaded, on a detached task.
///
/// Must be called within a Tokio runtime.
pub fn report_on_load(
    reporter: VisitReporter,
    signal: LoadSignal,
) -> JoinHandle<Result<ReportOutcome>> {
    tokio::spawn(async move {
        signal.loaded().await?;
        let result = reporter.report_current_page().await;
        if let Err(e) = &result {
            tracing::debug!(error = %e, "Visit report failed");
        }
        result
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReporterConfig;
    use crate::context::PageSnapshot;
    use crate::storage::MemoryStore;
    use std::sync::Arc;
    use std::time::Duration;

    fn buffering_reporter() -> VisitReporter {
        VisitReporter::new(
            ReporterConfig::default(),
            Arc::new(PageSnapshot::new("https://blog.example.org/about")),
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_already_loaded_reports_immediately() {
        let reporter = buffering_reporter();
        let lifecycle = PageLifecycle::loaded();

        let outcome = report_on_load(reporter.clone(), lifecycle.subscribe())
            .await
            .unwrap()
            .unwrap();

        assert!(matches!(outcome, ReportOutcome::Buffered { len: 1, .. }));
        assert_eq!(reporter.buffer().len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_waits_for_load_event() {
        let reporter = buffering_reporter();
        let lifecycle = PageLifecycle::new(ReadyState::Loading);

        let handle = report_on_load(reporter.clone(), lifecycle.subscribe());

        lifecycle.set_ready_state(ReadyState::Interactive);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());
        assert_eq!(reporter.buffer().len().unwrap(), 0);

        lifecycle.mark_complete();
        handle.await.unwrap().unwrap();
        assert_eq!(reporter.buffer().len().unwrap(), 1);

        // Further state changes do not report again
        lifecycle.mark_complete();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(reporter.buffer().len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_page_closed_before_load_reports_nothing() {
        let reporter = buffering_reporter();
        let lifecycle = PageLifecycle::new(ReadyState::Loading);

        let handle = report_on_load(reporter.clone(), lifecycle.subscribe());
        drop(lifecycle);

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::PageClosed));
        assert!(reporter.buffer().is_empty().unwrap());
    }
}
