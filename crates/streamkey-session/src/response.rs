//! Room response parsing.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SessionError;
use crate::SessionResult;

/// An ingest URL split into server and stream key.
///
/// The split is at the last `/`; the key is never empty and never contains
/// the scheme separator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestUrl {
    /// Everything before the last `/`.
    pub base_url: String,

    /// Everything after the last `/`.
    pub stream_key: String,
}

impl IngestUrl {
    /// Split a full ingest URL.
    pub fn parse(url: &str) -> SessionResult<Self> {
        let authority_start = url.find("://").map(|i| i + 3).ok_or_else(|| {
            SessionError::Parse(format!("ingest URL has no scheme: {url}"))
        })?;

        let split = url
            .rfind('/')
            .filter(|&i| i >= authority_start)
            .ok_or_else(|| SessionError::Parse(format!("ingest URL has no path: {url}")))?;

        let (base_url, stream_key) = (&url[..split], &url[split + 1..]);
        if stream_key.is_empty() {
            return Err(SessionError::Parse(format!(
                "ingest URL has an empty stream key: {url}"
            )));
        }

        Ok(Self {
            base_url: base_url.to_string(),
            stream_key: stream_key.to_string(),
        })
    }

    /// Rejoin base and key.
    pub fn full_url(&self) -> String {
        format!("{}/{}", self.base_url, self.stream_key)
    }
}

/// A room the platform accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveRoom {
    /// Ingest URL split into server and key.
    pub ingest: IngestUrl,

    /// Public share URL.
    pub share_url: String,
}

impl LiveRoom {
    /// Ingest server, without the key.
    pub fn base_stream_url(&self) -> &str {
        &self.ingest.base_url
    }

    /// Stream key.
    pub fn stream_key(&self) -> &str {
        &self.ingest.stream_key
    }
}

/// A structured refusal from the platform (`data.prompts`).
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    /// The `prompts` value, untouched.
    pub prompts: Value,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prompts {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{other}"),
        }
    }
}

/// Result of a room create call.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomOutcome {
    /// Room created.
    Created(LiveRoom),

    /// Platform refused the request.
    Rejected(Rejection),
}

impl RoomOutcome {
    /// Returns true if the room was created.
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    /// The created room, if any.
    pub fn room(&self) -> Option<&LiveRoom> {
        match self {
            Self::Created(room) => Some(room),
            Self::Rejected(_) => None,
        }
    }
}

/// Result of a room finish call.
#[derive(Debug, Clone, PartialEq)]
pub enum FinishOutcome {
    /// Room finished.
    Finished,

    /// Platform refused the request.
    Rejected(Rejection),
}

impl FinishOutcome {
    /// Returns true if the room was finished.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

fn prompts(body: &Value) -> Option<&Value> {
    body.get("data").and_then(|data| data.get("prompts"))
}

/// Interpret a room create response body.
///
/// Success needs both `data.stream_url.rtmp_push_url` and `data.share_url`.
/// Otherwise `data.prompts` is reported as a rejection; a body with neither
/// shape is a parse error.
pub fn parse_create_response(body: &Value) -> SessionResult<RoomOutcome> {
    let push_url = body
        .pointer("/data/stream_url/rtmp_push_url")
        .and_then(Value::as_str);
    let share_url = body.pointer("/data/share_url").and_then(Value::as_str);

    if let (Some(push_url), Some(share_url)) = (push_url, share_url) {
        return Ok(RoomOutcome::Created(LiveRoom {
            ingest: IngestUrl::parse(push_url)?,
            share_url: share_url.to_string(),
        }));
    }

    match prompts(body) {
        Some(prompts) => Ok(RoomOutcome::Rejected(Rejection {
            prompts: prompts.clone(),
        })),
        None => Err(SessionError::Parse(
            "create response has neither data.stream_url nor data.prompts".to_string(),
        )),
    }
}

/// Interpret a room finish response body. Only `data.prompts` means failure.
pub fn parse_finish_response(body: &Value) -> FinishOutcome {
    match prompts(body) {
        Some(prompts) => FinishOutcome::Rejected(Rejection {
            prompts: prompts.clone(),
        }),
        None => FinishOutcome::Finished,
    }
}

/// Read the uploaded image uri, or an empty string.
pub fn parse_upload_response(body: &Value) -> String {
    body.pointer("/data/uri")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Read the studio version from an update manifest.
pub fn parse_studio_version(body: &Value) -> Option<String> {
    body.pointer("/data/manifest/win32/version")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// A game tag the platform offers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameTag {
    /// Tag id, sent as `game_tag_id`.
    pub id: String,

    /// Display name.
    pub show_name: String,
}

/// Read `data.game_tag_list`. Ids may be numbers or strings.
pub fn parse_game_tags(body: &Value) -> Vec<GameTag> {
    let Some(list) = body.pointer("/data/game_tag_list").and_then(Value::as_array) else {
        return Vec::new();
    };

    list.iter()
        .filter_map(|tag| {
            let id = match tag.get("id")? {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            let show_name = tag.get("show_name")?.as_str()?.to_string();
            Some(GameTag { id, show_name })
        })
        .collect()
}

/// Find a game tag id by display name, ignoring case.
pub fn game_tag_id_by_name<'a>(tags: &'a [GameTag], name: &str) -> Option<&'a str> {
    tags.iter()
        .find(|t| t.show_name.to_lowercase() == name.trim().to_lowercase())
        .map(|t| t.id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ingest_split_at_last_separator() {
        let ingest = IngestUrl::parse("rtmp://host/app/KEY123").unwrap();
        assert_eq!(ingest.base_url, "rtmp://host/app");
        assert_eq!(ingest.stream_key, "KEY123");
        assert_eq!(ingest.full_url(), "rtmp://host/app/KEY123");
    }

    #[test]
    fn test_ingest_key_keeps_query() {
        let ingest = IngestUrl::parse("rtmp://push.example.com:1935/live/stream-1?expire=1&sign=ab").unwrap();
        assert_eq!(ingest.base_url, "rtmp://push.example.com:1935/live");
        assert_eq!(ingest.stream_key, "stream-1?expire=1&sign=ab");
    }

    #[test]
    fn test_ingest_rejects_urls_without_key() {
        assert!(IngestUrl::parse("rtmp://host").is_err());
        assert!(IngestUrl::parse("rtmp://host/app/").is_err());
        assert!(IngestUrl::parse("no-scheme/key").is_err());
    }

    #[test]
    fn test_create_success() {
        let body = json!({
            "data": {
                "stream_url": { "rtmp_push_url": "rtmp://host/app/KEY123" },
                "share_url": "https://share/1"
            }
        });

        let outcome = parse_create_response(&body).unwrap();
        let room = outcome.room().unwrap();
        assert_eq!(room.base_stream_url(), "rtmp://host/app");
        assert_eq!(room.stream_key(), "KEY123");
        assert_eq!(room.share_url, "https://share/1");
    }

    #[test]
    fn test_create_rejection_keeps_prompts_verbatim() {
        let body = json!({ "data": { "prompts": "You are not eligible to go LIVE" } });

        match parse_create_response(&body).unwrap() {
            RoomOutcome::Rejected(rejection) => {
                assert_eq!(rejection.to_string(), "You are not eligible to go LIVE");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_create_rejection_with_structured_prompts() {
        let body = json!({ "data": { "prompts": { "code": 4003, "msg": "banned" } } });

        let outcome = parse_create_response(&body).unwrap();
        assert!(!outcome.is_created());
        if let RoomOutcome::Rejected(rejection) = outcome {
            assert_eq!(rejection.prompts["code"], 4003);
        }
    }

    #[test]
    fn test_create_partial_success_is_rejection() {
        let body = json!({
            "data": {
                "stream_url": { "rtmp_push_url": "rtmp://host/app/KEY" },
                "prompts": "missing share url"
            }
        });
        assert!(!parse_create_response(&body).unwrap().is_created());
    }

    #[test]
    fn test_create_unknown_shape_is_error() {
        let body = json!({ "status_code": 0 });
        assert!(matches!(
            parse_create_response(&body),
            Err(SessionError::Parse(_))
        ));
    }

    #[test]
    fn test_finish_response() {
        assert!(parse_finish_response(&json!({ "data": {} })).is_finished());
        assert!(parse_finish_response(&json!({ "status_code": 0, "extra": [1, 2] })).is_finished());
        assert!(!parse_finish_response(&json!({ "data": { "prompts": "no room" } })).is_finished());
    }

    #[test]
    fn test_upload_response() {
        assert_eq!(
            parse_upload_response(&json!({ "data": { "uri": "tos/cover/1" } })),
            "tos/cover/1"
        );
        assert_eq!(parse_upload_response(&json!({ "data": { "uri": 5 } })), "");
        assert_eq!(parse_upload_response(&json!([])), "");
    }

    #[test]
    fn test_game_tags() {
        let body = json!({
            "data": {
                "game_tag_list": [
                    { "id": 1001, "show_name": "Minecraft" },
                    { "id": "1002", "show_name": "Chess" },
                    { "show_name": "No id" }
                ]
            }
        });

        let tags = parse_game_tags(&body);
        assert_eq!(tags.len(), 2);
        assert_eq!(game_tag_id_by_name(&tags, "minecraft"), Some("1001"));
        assert_eq!(game_tag_id_by_name(&tags, "CHESS"), Some("1002"));
        assert_eq!(game_tag_id_by_name(&tags, "Go"), None);
    }
}
