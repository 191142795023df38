//! Capturing the ambient page state into a [`PageVisitRecord`]

use chrono::{SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::session::get_or_create_session_id;
use crate::storage::KeyValueStore;
use crate::types::{Dimensions, PageVisitRecord, DIRECT_REFERRER};

/// What the host environment knows about the current page.
///
/// Every field is optional; missing values become empty strings or zero
/// when a record is captured.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: Option<String>,
    pub title: Option<String>,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub language: Option<String>,
    pub screen: Option<Dimensions>,
    pub viewport: Option<Dimensions>,
}

impl PageSnapshot {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn screen(mut self, width: u32, height: u32) -> Self {
        self.screen = Some(Dimensions::new(width, height));
        self
    }

    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = Some(Dimensions::new(width, height));
        self
    }
}

/// Source of the current page state
pub trait PageEnvironment: Send + Sync {
    fn snapshot(&self) -> PageSnapshot;
}

impl PageEnvironment for PageSnapshot {
    fn snapshot(&self) -> PageSnapshot {
        self.clone()
    }
}

/// Build the record for this page load.
///
/// Only side effect: the session id may be created in `tab_store`.
pub fn capture_context(
    environment: &dyn PageEnvironment,
    tab_store: &dyn KeyValueStore,
) -> PageVisitRecord {
    let page = environment.snapshot();
    let url = page.url.unwrap_or_default();
    let path = path_of(&url);

    PageVisitRecord {
        // Stored and sent at millisecond precision
        timestamp: Utc::now().trunc_subsecs(3),
        path,
        url,
        title: page.title.unwrap_or_default(),
        referrer: page
            .referrer
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DIRECT_REFERRER.to_string()),
        user_agent: page.user_agent.unwrap_or_default(),
        language: page.language.unwrap_or_default(),
        screen: page.screen.unwrap_or_default(),
        viewport: page.viewport.unwrap_or_default(),
        session_id: get_or_create_session_id(tab_store),
    }
}

/// Path component of a location href; empty when it cannot be parsed
fn path_of(url: &str) -> String {
    reqwest::Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_capture_full_snapshot() {
        let page = PageSnapshot::new("https://blog.example.org/about?ref=nav#team")
            .title("About")
            .referrer("https://example.com")
            .user_agent("Mozilla/5.0")
            .language("en-US")
            .screen(1920, 1080)
            .viewport(1280, 720);
        let tab = MemoryStore::new();

        let record = capture_context(&page, &tab);

        assert_eq!(record.path, "/about");
        assert_eq!(record.url, "https://blog.example.org/about?ref=nav#team");
        assert_eq!(record.title, "About");
        assert_eq!(record.referrer, "https://example.com");
        assert_eq!(record.screen, Dimensions::new(1920, 1080));
        assert_eq!(record.viewport, Dimensions::new(1280, 720));
        assert!(record.session_id.starts_with("sess_"));
    }

    #[test]
    fn test_capture_defaults_when_unavailable() {
        let record = capture_context(&PageSnapshot::default(), &MemoryStore::new());

        assert_eq!(record.url, "");
        assert_eq!(record.path, "");
        assert_eq!(record.title, "");
        assert_eq!(record.referrer, "direct");
        assert_eq!(record.user_agent, "");
        assert_eq!(record.language, "");
        assert_eq!(record.screen, Dimensions::default());
        assert_eq!(record.viewport, Dimensions::default());
        assert!(!record.session_id.is_empty());
    }

    #[test]
    fn test_empty_referrer_is_direct() {
        let page = PageSnapshot::new("https://blog.example.org/").referrer("");
        let record = capture_context(&page, &MemoryStore::new());
        assert_eq!(record.referrer, "direct");
        assert_eq!(record.path, "/");
    }

    #[test]
    fn test_records_in_one_tab_share_session() {
        let tab = MemoryStore::new();
        let a = capture_context(&PageSnapshot::new("https://blog.example.org/a"), &tab);
        let b = capture_context(&PageSnapshot::new("https://blog.example.org/b"), &tab);
        assert_eq!(a.session_id, b.session_id);
    }

    #[test]
    fn test_capture_survives_json_unchanged() {
        let page = PageSnapshot::new("https://blog.example.org/");
        let record = capture_context(&page, &MemoryStore::new());
        assert_eq!(record.timestamp.timestamp_subsec_nanos() % 1_000_000, 0);

        let json = serde_json::to_string(&record).unwrap();
        let back: PageVisitRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
