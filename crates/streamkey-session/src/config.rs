//! Session client configuration.

use std::time::Duration;

use crate::{DEFAULT_TIMEOUT_SECS, FALLBACK_STUDIO_VERSION, SENTINEL_HOST};

/// Domain lookup endpoint.
pub const DEFAULT_DOMAINS_URL: &str = "https://tnc16-platform-useast1a.tiktokv.com/get_domains/v4/?aid=8311&ttwebview_version=1130022001&device_platform=win";

/// Studio update manifest endpoint.
pub const DEFAULT_VERSION_CHECK_URL: &str = "https://tron-sg.bytelemon.com/api/sdk/check_update";

/// Game tag list endpoint.
pub const DEFAULT_GAME_TAGS_URL: &str =
    "https://webcast16-normal-c-useast2a.tiktokv.com/webcast/room/hashtag/list/";

/// Fixed query parameters of the update manifest request.
const VERSION_CHECK_QUERY: &[(&str, &str)] = &[
    ("pid", "7393277106664249610"),
    ("uid", "7464643088460875280"),
    ("branch", "studio/release/stable"),
    ("buildId", "0"),
];

/// Configuration for the room client.
///
/// Every endpoint is configurable so the client can be pointed at a
/// local server.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Domain lookup URL.
    pub domains_url: String,

    /// Studio update manifest URL.
    pub version_check_url: String,

    /// Query parameters for the update manifest request.
    pub version_check_query: Vec<(String, String)>,

    /// Game tag list URL.
    pub game_tags_url: String,

    /// Host key whose mapping starts endpoint resolution.
    pub sentinel_host: String,

    /// Scheme of the resolved API base URL.
    pub api_scheme: String,

    /// Per-request timeout.
    pub timeout: Duration,

    /// Studio version used when the update manifest cannot be read.
    pub fallback_studio_version: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            domains_url: DEFAULT_DOMAINS_URL.to_string(),
            version_check_url: DEFAULT_VERSION_CHECK_URL.to_string(),
            version_check_query: VERSION_CHECK_QUERY
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            game_tags_url: DEFAULT_GAME_TAGS_URL.to_string(),
            sentinel_host: SENTINEL_HOST.to_string(),
            api_scheme: "https".to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            fallback_studio_version: FALLBACK_STUDIO_VERSION.to_string(),
        }
    }
}

impl SessionConfig {
    /// Point every endpoint at one local server. Used by tests and dry runs.
    pub fn local(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            domains_url: format!("{base}/get_domains/v4/"),
            version_check_url: format!("{base}/api/sdk/check_update"),
            game_tags_url: format!("{base}/webcast/room/hashtag/list/"),
            api_scheme: "http".to_string(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
