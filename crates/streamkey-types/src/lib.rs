//! Shared types for streamkey.
//!
//! This crate defines the request, state and record types passed between
//! the session client, the encoder launcher and the command-line harness.

mod record;
mod request;
mod state;
mod topics;

pub use record::StreamRecord;
pub use request::{DeviceIdentity, InvalidPlatform, Platform, RequestError, RoomRequest};
pub use state::{EncoderState, StopReason};
pub use topics::{topic_id_by_name, topic_name, Topic, GAMING_TOPIC_ID, TOPICS};

/// Game tag sent when the caller does not pick one.
pub const DEFAULT_GAME_TAG_ID: &str = "0";
