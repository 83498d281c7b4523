//! Room topic table.

/// A room topic (hashtag) with its platform id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topic {
    /// Platform id, sent as `hashtag_id`.
    pub id: &'static str,

    /// Display name.
    pub name: &'static str,
}

/// Topic id of the Gaming topic, which requires a game tag.
pub const GAMING_TOPIC_ID: &str = "5";

/// Known room topics.
pub const TOPICS: &[Topic] = &[
    Topic { id: "5", name: "Gaming" },
    Topic { id: "6", name: "Music" },
    Topic { id: "42", name: "Chat & Interview" },
    Topic { id: "9", name: "Beauty & Fashion" },
    Topic { id: "3", name: "Dance" },
    Topic { id: "13", name: "Fitness & Sports" },
    Topic { id: "4", name: "Food" },
    Topic { id: "43", name: "News & Event" },
    Topic { id: "45", name: "Education" },
];

/// Look up a topic id by display name, ignoring case.
pub fn topic_id_by_name(topics: &[Topic], name: &str) -> Option<&'static str> {
    topics
        .iter()
        .find(|t| t.name.eq_ignore_ascii_case(name.trim()))
        .map(|t| t.id)
}

/// Look up a topic's display name by id.
pub fn topic_name(topics: &[Topic], id: &str) -> Option<&'static str> {
    topics.iter().find(|t| t.id == id).map(|t| t.name)
}
