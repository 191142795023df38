//! Key-value storage for session ids and buffered visits
//!
//! Two scopes exist, mirroring what a page sees in a browser:
//! - **tab**: lives as long as one tab; holds the session id
//! - **origin**: shared by every page of an origin; holds the visit buffer
//!
//! Both are [`KeyValueStore`]s so the reporter never depends on a concrete
//! backend. [`MemoryStore`] is the in-process store; [`ScopedStore`] is a
//! view onto the SQLite [`Database`] for one scope.

mod memory;
pub mod schema;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::{Database, ScopedStore};

use crate::error::{Error, Result};

/// Tab-scoped key holding the session id
pub const SESSION_ID_KEY: &str = "visit_session_id";

/// Origin-scoped key holding the JSON array of buffered visits
pub const BUFFER_KEY: &str = "visit_logs";

/// Origin-scoped key holding the ISO timestamp of the last buffer write
pub const BUFFER_UPDATED_KEY: &str = "visit_logs_updated";

/// Synchronous string key-value store.
///
/// Reads and writes may fail (quota, I/O); callers decide whether a failure
/// is fatal.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Scope name for an origin's shared storage
///
/// Accepts any URL of the origin; only scheme, host and port are kept.
pub fn origin_scope(url: &reqwest::Url) -> String {
    format!("origin:{}", url.origin().ascii_serialization())
}

/// Scope name for the origin of a page URL given as text
///
/// URLs with an opaque origin (`file:`, `data:`) are rejected; they would all
/// share one `origin:null` buffer.
pub fn origin_scope_for(url: &str) -> Result<String> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| Error::Config(format!("invalid page URL {:?}: {}", url, e)))?;
    if !parsed.origin().is_tuple() {
        return Err(Error::Config(format!(
            "invalid page URL {:?}: opaque origin",
            url
        )));
    }
    Ok(origin_scope(&parsed))
}

/// Scope name for a named tab's storage
pub fn tab_scope(name: &str) -> String {
    format!("tab:{}", name)
}
