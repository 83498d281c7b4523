//! Room creation request types.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::topics::GAMING_TOPIC_ID;
use crate::DEFAULT_GAME_TAG_ID;

/// The client application a room request pretends to come from.
///
/// Serialized as its integer discriminant so persisted configs stay
/// compatible with the `--platform 0|1|2` flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Platform {
    /// Desktop live studio app.
    #[default]
    Studio,

    /// Mobile app, camera broadcast.
    MobileCamera,

    /// Mobile app, screen-share broadcast.
    MobileScreenshare,
}

impl Platform {
    /// All platforms in discriminant order.
    pub const ALL: [Platform; 3] = [Self::Studio, Self::MobileCamera, Self::MobileScreenshare];

    /// Returns true for the two mobile profiles.
    pub fn is_mobile(self) -> bool {
        matches!(self, Self::MobileCamera | Self::MobileScreenshare)
    }

    /// Returns the display name for this platform.
    pub fn name(self) -> &'static str {
        match self {
            Self::Studio => "Live Studio",
            Self::MobileCamera => "Mobile Camera",
            Self::MobileScreenshare => "Mobile Screenshare",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unknown platform discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Unknown platform discriminant {0} (expected 0, 1 or 2)")]
pub struct InvalidPlatform(pub u8);

impl TryFrom<u8> for Platform {
    type Error = InvalidPlatform;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Studio),
            1 => Ok(Self::MobileCamera),
            2 => Ok(Self::MobileScreenshare),
            other => Err(InvalidPlatform(other)),
        }
    }
}

impl From<Platform> for u8 {
    fn from(platform: Platform) -> Self {
        match platform {
            Platform::Studio => 0,
            Platform::MobileCamera => 1,
            Platform::MobileScreenshare => 2,
        }
    }
}

/// Device identity used by the mobile profiles.
///
/// Generating one is out of scope; callers supply the three ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// OpenUDID of the device.
    pub openudid: String,

    /// Registered device id.
    pub device_id: String,

    /// Install id.
    pub iid: String,
}

impl DeviceIdentity {
    /// Returns true when every id is present.
    pub fn is_complete(&self) -> bool {
        !self.openudid.is_empty() && !self.device_id.is_empty() && !self.iid.is_empty()
    }
}

/// Caller overrides merged into a profile when creating a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomRequest {
    /// Room title.
    pub title: String,

    /// Topic (hashtag) id.
    pub topic_id: String,

    /// Game tag id, `"0"` for none.
    pub game_tag_id: String,

    /// Generate a replay after the room ends.
    pub gen_replay: bool,

    /// Close the room when the ingest stream closes (studio only).
    pub close_room_when_close_stream: bool,

    /// Mark the room as age restricted.
    pub age_restricted: bool,

    /// Priority region, e.g. `"US"` (studio only).
    pub priority_region: String,

    /// Client profile to present.
    pub platform: Platform,

    /// Device identity for the mobile profiles.
    pub device: Option<DeviceIdentity>,

    /// Optional cover image uploaded before the room is created.
    pub cover_path: Option<PathBuf>,
}

impl Default for RoomRequest {
    fn default() -> Self {
        Self {
            title: String::new(),
            topic_id: String::new(),
            game_tag_id: DEFAULT_GAME_TAG_ID.to_string(),
            gen_replay: false,
            close_room_when_close_stream: true,
            age_restricted: false,
            priority_region: String::new(),
            platform: Platform::Studio,
            device: None,
            cover_path: None,
        }
    }
}

impl RoomRequest {
    /// Create a request with a title and topic, everything else default.
    pub fn new(title: impl Into<String>, topic_id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            topic_id: topic_id.into(),
            ..Default::default()
        }
    }

    /// Check the request before anything is sent.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.title.trim().is_empty() {
            return Err(RequestError::MissingTitle);
        }
        if self.topic_id.trim().is_empty() {
            return Err(RequestError::MissingTopic);
        }
        if self.topic_id == GAMING_TOPIC_ID
            && (self.game_tag_id.is_empty() || self.game_tag_id == DEFAULT_GAME_TAG_ID)
        {
            return Err(RequestError::MissingGameTag);
        }
        if self.platform.is_mobile() && !self.device.as_ref().is_some_and(DeviceIdentity::is_complete)
        {
            return Err(RequestError::MissingDevice(self.platform));
        }
        Ok(())
    }

    /// The device identity, or an empty one for the studio profile.
    pub fn device_or_default(&self) -> DeviceIdentity {
        self.device.clone().unwrap_or_default()
    }
}

/// Reasons a room request is refused before it is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// Title is empty.
    #[error("Stream title is required")]
    MissingTitle,

    /// Topic is empty.
    #[error("Stream topic is required")]
    MissingTopic,

    /// The gaming topic needs a game tag.
    #[error("Game tag is required for the Gaming topic")]
    MissingGameTag,

    /// A mobile profile needs openudid, device id and iid.
    #[error("OpenUDID, device id and iid are required for the {0} profile")]
    MissingDevice(Platform),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_discriminants() {
        for (i, platform) in Platform::ALL.iter().enumerate() {
            assert_eq!(Platform::try_from(i as u8).unwrap(), *platform);
            assert_eq!(u8::from(*platform), i as u8);
        }
        assert_eq!(Platform::try_from(3), Err(InvalidPlatform(3)));
    }

    #[test]
    fn test_platform_serializes_as_integer() {
        let json = serde_json::to_string(&Platform::MobileScreenshare).unwrap();
        assert_eq!(json, "2");
        assert!(serde_json::from_str::<Platform>("7").is_err());
    }

    #[test]
    fn test_validate_requires_title_and_topic() {
        assert_eq!(
            RoomRequest::new("", "6").validate(),
            Err(RequestError::MissingTitle)
        );
        assert_eq!(
            RoomRequest::new("hello", "").validate(),
            Err(RequestError::MissingTopic)
        );
        assert!(RoomRequest::new("hello", "6").validate().is_ok());
    }

    #[test]
    fn test_validate_gaming_needs_game_tag() {
        let mut request = RoomRequest::new("speedrun", GAMING_TOPIC_ID);
        assert_eq!(request.validate(), Err(RequestError::MissingGameTag));

        request.game_tag_id = "1234".into();
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_validate_mobile_needs_device() {
        let mut request = RoomRequest::new("hello", "6");
        request.platform = Platform::MobileCamera;
        assert_eq!(
            request.validate(),
            Err(RequestError::MissingDevice(Platform::MobileCamera))
        );

        request.device = Some(DeviceIdentity {
            openudid: "abc".into(),
            device_id: "123".into(),
            iid: String::new(),
        });
        assert!(request.validate().is_err());

        request.device.as_mut().unwrap().iid = "456".into();
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_request_defaults_from_partial_json() {
        let request: RoomRequest = serde_json::from_str(r#"{"title":"t","platform":1}"#).unwrap();
        assert_eq!(request.platform, Platform::MobileCamera);
        assert_eq!(request.game_tag_id, "0");
        assert!(request.close_room_when_close_stream);
    }
}
