//! Authenticated room client for a live-streaming platform.
//!
//! This crate holds a cookie-authenticated session, resolves the platform's
//! API host, builds one of three client profiles and creates or finishes a
//! broadcast room. The resulting ingest URL is handed to an external
//! encoder.

mod client;
mod config;
pub mod credentials;
mod endpoint;
mod error;
mod profile;
mod response;
mod signer;

pub use client::RoomClient;
pub use config::{SessionConfig, DEFAULT_DOMAINS_URL, DEFAULT_GAME_TAGS_URL, DEFAULT_VERSION_CHECK_URL};
pub use credentials::{CookieFileStatus, CookieFileSummary, CookieJar};
pub use endpoint::EndpointMap;
pub use error::{CredentialError, SessionError};
pub use profile::{finish_query, sdk_version, studio_user_agent, Params, Profile, MOBILE_USER_AGENT};
pub use response::{
    game_tag_id_by_name, parse_create_response, parse_finish_response, FinishOutcome, GameTag,
    IngestUrl, LiveRoom, Rejection, RoomOutcome,
};
pub use signer::{NoopSigner, Signer, SigningContext, SIGNING_EPOCH};

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Application id of the desktop studio.
pub const STUDIO_APP_ID: u32 = 8311;

/// Application id of the mobile app.
pub const MOBILE_APP_ID: u32 = 1233;

/// Host key that starts endpoint resolution.
pub const SENTINEL_HOST: &str = "webcast-normal.tiktokv.com";

/// Studio version used when the update manifest is unavailable.
pub const FALLBACK_STUDIO_VERSION: &str = "0.99.0";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Room create path, relative to the API base URL.
pub const ROOM_CREATE_PATH: &str = "webcast/room/create/";

/// Room finish path, relative to the API base URL.
pub const ROOM_FINISH_PATH: &str = "webcast/room/finish_abnormal/";

/// Cover upload path, relative to the API base URL.
pub const UPLOAD_IMAGE_PATH: &str = "webcast/room/upload/image/";
