//! # visitlog-core
//!
//! Core library for visitlog - lightweight page-visit reporting for static sites.
//!
//! This library provides:
//! - The page visit record and its capture from the host environment
//! - Tab-scoped session ids
//! - A capped, origin-scoped visit buffer over pluggable key-value storage
//! - Delivery to a token-authenticated log endpoint or a custom endpoint
//! - A page-load trigger that reports exactly once per load
//! - Configuration and logging infrastructure
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use visitlog_core::context::PageSnapshot;
//! use visitlog_core::lifecycle::{report_on_load, PageLifecycle};
//! use visitlog_core::storage::MemoryStore;
//! use visitlog_core::{Config, VisitReporter};
//!
//! # async fn run() -> visitlog_core::Result<()> {
//! let config = Config::load()?;
//! let page = PageSnapshot::new("https://blog.example.org/about").referrer("https://example.com");
//! let reporter = VisitReporter::new(
//!     config.reporter,
//!     Arc::new(page),
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(MemoryStore::new()),
//! )?;
//!
//! let lifecycle = PageLifecycle::loaded();
//! let outcome = report_on_load(reporter, lifecycle.subscribe()).await.expect("task panicked")?;
//! println!("{:?}", outcome);
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use error::{Error, Result};
pub use reporter::{ReportOutcome, VisitReporter};
pub use types::*;

// Public modules
pub mod buffer;
pub mod config;
pub mod context;
pub mod delivery;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod reporter;
pub mod session;
pub mod storage;
pub mod types;
