//! Delivery strategies for page visits
//!
//! ## Strategy selection
//!
//! Evaluated fresh for every report, in fixed priority order:
//! 1. **Remote**: a Logtail source token is configured; POST an envelope with
//!    a bearer token
//! 2. **Custom endpoint**: a custom URL is configured; POST the bare record
//! 3. **Local buffer**: nothing is configured
//!
//! Both network strategies fall back to the local buffer when the request
//! fails. There are no retries.
//!
//! ```toml
//! [reporter]
//! logtail_source_token = "xxxxxxxxxxxxxxxx"
//! # or
//! custom_api_url = "https://your-api.example.com/api/log"
//! ```

mod batch;
mod client;
mod envelope;

pub use batch::{BatchUploader, UnimplementedBatchUpload};
pub use client::{HttpTransport, PostRequest, Transport};
pub use envelope::{RemoteEnvelope, REMOTE_LEVEL, REMOTE_MESSAGE};

use serde::Serialize;

use crate::config::ReporterConfig;

/// The network destination a visit was sent to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryTarget {
    Remote,
    CustomEndpoint,
}

impl std::fmt::Display for DeliveryTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryTarget::Remote => write!(f, "remote"),
            DeliveryTarget::CustomEndpoint => write!(f, "custom endpoint"),
        }
    }
}

/// Which path one report takes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStrategy {
    Remote { token: String },
    CustomEndpoint { url: String },
    LocalBuffer,
}

impl DeliveryStrategy {
    /// Pick the strategy for the current configuration
    pub fn select(config: &ReporterConfig) -> Self {
        if let Some(token) = config.token() {
            DeliveryStrategy::Remote {
                token: token.to_string(),
            }
        } else if let Some(url) = config.custom_url() {
            DeliveryStrategy::CustomEndpoint {
                url: url.to_string(),
            }
        } else {
            DeliveryStrategy::LocalBuffer
        }
    }

    /// Network target, if this strategy sends anything
    pub fn target(&self) -> Option<DeliveryTarget> {
        match self {
            DeliveryStrategy::Remote { .. } => Some(DeliveryTarget::Remote),
            DeliveryStrategy::CustomEndpoint { .. } => Some(DeliveryTarget::CustomEndpoint),
            DeliveryStrategy::LocalBuffer => None,
        }
    }
}

impl std::fmt::Display for DeliveryStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryStrategy::Remote { .. } => write!(f, "remote (token)"),
            DeliveryStrategy::CustomEndpoint { url } => write!(f, "custom endpoint ({})", url),
            DeliveryStrategy::LocalBuffer => write!(f, "local buffer"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_wins_over_url() {
        let config = ReporterConfig {
            logtail_source_token: Some("abc".to_string()),
            custom_api_url: Some("https://your-api.example.com/api/log".to_string()),
            ..Default::default()
        };
        assert_eq!(
            DeliveryStrategy::select(&config),
            DeliveryStrategy::Remote {
                token: "abc".to_string()
            }
        );
    }

    #[test]
    fn test_url_without_token() {
        let config = ReporterConfig {
            logtail_source_token: Some(String::new()),
            custom_api_url: Some("https://your-api.example.com/api/log".to_string()),
            ..Default::default()
        };
        let strategy = DeliveryStrategy::select(&config);
        assert_eq!(strategy.target(), Some(DeliveryTarget::CustomEndpoint));
    }

    #[test]
    fn test_nothing_configured_buffers() {
        let config = ReporterConfig {
            use_github_gist: true,
            ..Default::default()
        };
        let strategy = DeliveryStrategy::select(&config);
        assert_eq!(strategy, DeliveryStrategy::LocalBuffer);
        assert!(strategy.target().is_none());
    }

    #[test]
    fn test_display_hides_token() {
        let strategy = DeliveryStrategy::Remote {
            token: "secret".to_string(),
        };
        assert!(!strategy.to_string().contains("secret"));
    }
}
