//! Persisted record of a created room.

use serde::{Deserialize, Serialize};

/// One record per created room, kept so a later run can show or end it.
///
/// The URL and title keys are camelCase, the rest snake_case, matching the
/// `stream_<ts>.json` files already on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamRecord {
    /// Room title.
    pub title: String,

    /// Ingest URL without the key.
    #[serde(rename = "baseStreamUrl")]
    pub base_stream_url: String,

    /// Stream key.
    #[serde(rename = "streamKey")]
    pub stream_key: String,

    /// Public share URL of the room.
    #[serde(rename = "streamShareUrl")]
    pub stream_share_url: String,

    /// Topic (hashtag) id.
    #[serde(rename = "hashtag_id")]
    pub topic_id: String,

    /// Game tag id.
    #[serde(default)]
    pub game_tag_id: String,

    /// Priority region.
    #[serde(default)]
    pub priority_region: String,

    /// Creation time, seconds since the Unix epoch.
    pub created_at: f64,
}

impl StreamRecord {
    /// Full ingest URL (base and key joined).
    pub fn ingest_url(&self) -> String {
        format!("{}/{}", self.base_stream_url.trim_end_matches('/'), self.stream_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_url_joins_base_and_key() {
        let record = StreamRecord {
            base_stream_url: "rtmp://host/app".into(),
            stream_key: "KEY".into(),
            ..Default::default()
        };
        assert_eq!(record.ingest_url(), "rtmp://host/app/KEY");
    }

    #[test]
    fn test_record_key_names() {
        let record = StreamRecord {
            title: "t".into(),
            base_stream_url: "rtmp://h/a".into(),
            stream_key: "k".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&record).unwrap();
        let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            [
                "baseStreamUrl",
                "created_at",
                "game_tag_id",
                "hashtag_id",
                "priority_region",
                "streamKey",
                "streamShareUrl",
                "title",
            ]
        );
    }

    #[test]
    fn test_reads_existing_record_file() {
        let json = r#"{"title":"t","baseStreamUrl":"rtmp://h/a","streamKey":"k",
            "streamShareUrl":"s","hashtag_id":"5","game_tag_id":"1001",
            "priority_region":"US","created_at":1730000000.5}"#;

        let record: StreamRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.title, "t");
        assert_eq!(record.ingest_url(), "rtmp://h/a/k");
        assert_eq!(record.stream_share_url, "s");
        assert_eq!(record.topic_id, "5");
        assert_eq!(record.game_tag_id, "1001");
        assert_eq!(record.priority_region, "US");
        assert_eq!(record.created_at, 1_730_000_000.5);
    }
}
