//! Persisted room settings (`config.json`).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use streamkey_types::{DeviceIdentity, Platform, RoomRequest, DEFAULT_GAME_TAG_ID};
use tracing::{info, warn};

/// Room settings saved between runs. Unset fields fall back to the
/// request defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Room title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Topic (hashtag) id.
    #[serde(rename = "hashtag_id", skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_tag_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_region: Option<String>,

    /// Generate a replay after the room ends.
    #[serde(rename = "generate_replay", skip_serializing_if = "Option::is_none")]
    pub gen_replay: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_room_when_close_stream: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_restricted: Option<bool>,

    /// Client profile discriminant.
    #[serde(rename = "spoof_plat", skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,

    /// Cover image.
    #[serde(rename = "thumbnail_path", skip_serializing_if = "Option::is_none")]
    pub cover_path: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub openudid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub iid: Option<String>,
}

impl AppConfig {
    /// Load the config file. A missing file gives the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", path.display()));
            }
        };

        serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    /// Write the config file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Device identity, if any part of it is set.
    pub fn device(&self) -> Option<DeviceIdentity> {
        if self.openudid.is_none() && self.device_id.is_none() && self.iid.is_none() {
            return None;
        }
        Some(DeviceIdentity {
            openudid: self.openudid.clone().unwrap_or_default(),
            device_id: self.device_id.clone().unwrap_or_default(),
            iid: self.iid.clone().unwrap_or_default(),
        })
    }

    /// Build the room request these settings describe.
    pub fn to_request(&self) -> RoomRequest {
        let defaults = RoomRequest::default();
        RoomRequest {
            title: self.title.clone().unwrap_or_default(),
            topic_id: self.topic_id.clone().unwrap_or_default(),
            game_tag_id: self
                .game_tag_id
                .clone()
                .unwrap_or_else(|| DEFAULT_GAME_TAG_ID.to_string()),
            gen_replay: self.gen_replay.unwrap_or(defaults.gen_replay),
            close_room_when_close_stream: self
                .close_room_when_close_stream
                .unwrap_or(defaults.close_room_when_close_stream),
            age_restricted: self.age_restricted.unwrap_or(defaults.age_restricted),
            priority_region: self.priority_region.clone().unwrap_or_default(),
            platform: self.platform.unwrap_or(defaults.platform),
            device: self.device(),
            cover_path: self.cover_path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_reads_existing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"title":"Hi","hashtag_id":"5","game_tag_id":"1001","generate_replay":true,
                "spoof_plat":1,"openudid":"u","device_id":"d","iid":"i"}"#,
        )
        .unwrap();

        let request = AppConfig::load(&path).unwrap().to_request();
        assert_eq!(request.title, "Hi");
        assert_eq!(request.topic_id, "5");
        assert_eq!(request.game_tag_id, "1001");
        assert!(request.gen_replay);
        assert!(request.close_room_when_close_stream);
        assert_eq!(request.platform, Platform::MobileCamera);
        assert!(request.device.unwrap().is_complete());
    }

    #[test]
    fn test_bad_platform_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"spoof_plat":7}"#).unwrap();
        assert!(AppConfig::load(&path).is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = AppConfig {
            title: Some("Evening".into()),
            topic_id: Some("42".into()),
            close_room_when_close_stream: Some(false),
            ..Default::default()
        };

        config.save(&path).unwrap();
        let saved = fs::read_to_string(&path).unwrap();
        assert!(saved.contains("\"hashtag_id\""));
        assert!(!saved.contains("spoof_plat"));
        assert_eq!(AppConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_defaults_match_request_defaults() {
        let request = AppConfig::default().to_request();
        assert_eq!(request.game_tag_id, DEFAULT_GAME_TAG_ID);
        assert_eq!(request.platform, Platform::Studio);
        assert!(request.device.is_none());
    }
}
