//! Tab-scoped session identifiers
//!
//! Format: `sess_<unix millis>_<9 base-36 chars>`. Ids are only meant to be
//! practically unique.

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::storage::{KeyValueStore, SESSION_ID_KEY};

const SESSION_PREFIX: &str = "sess_";
const SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Read the tab's session id, creating and storing one on first use.
///
/// Storage failures never leave a visit without an id: a fresh id is returned
/// (and a failed write means the next call creates another).
pub fn get_or_create_session_id(tab_store: &dyn KeyValueStore) -> String {
    match tab_store.get(SESSION_ID_KEY) {
        Ok(Some(existing)) if !existing.is_empty() => return existing,
        Ok(_) => {}
        Err(e) => tracing::debug!(error = %e, "Failed to read session id"),
    }

    let session_id = generate_session_id(Utc::now());
    if let Err(e) = tab_store.set(SESSION_ID_KEY, &session_id) {
        tracing::debug!(error = %e, "Failed to store session id");
    } else {
        tracing::debug!(session_id = %session_id, "Created session id");
    }
    session_id
}

/// Build a new session id for the given creation time
pub fn generate_session_id(created_at: DateTime<Utc>) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    format!(
        "{}{}_{}",
        SESSION_PREFIX,
        created_at.timestamp_millis(),
        suffix
    )
}
