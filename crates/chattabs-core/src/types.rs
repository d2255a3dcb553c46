//! Core domain type definitions

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::filter::FilterNode;

/// Minimum tab name length, in characters
pub const TAB_NAME_MIN_LEN: usize = 3;

/// Maximum tab name length, in characters
pub const TAB_NAME_MAX_LEN: usize = 20;

// ─────────────────────────────────────────────────────────────────────────────
// TabId
// ─────────────────────────────────────────────────────────────────────────────

/// Opaque, backend-assigned tab identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(String);

impl TabId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TabId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TabId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tab configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Per-tab behavior switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabOptions {
    /// Raise a notification for each routed message
    pub notify: bool,
    /// Persist routed messages to the tab's history file
    pub keep_history: bool,
}

/// A named, ordered chat tab definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabConfig {
    pub name: String,
    pub options: TabOptions,
    /// Routing filter; `None` is the same as an empty `and` (match everything)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<FilterNode>,
    /// Tab bar position
    pub order: i64,
}

impl TabConfig {
    pub fn new(name: impl Into<String>, options: TabOptions, order: i64) -> Self {
        Self {
            name: name.into(),
            options,
            filters: None,
            order,
        }
    }

    pub fn with_filters(mut self, filters: FilterNode) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Whether this tab seeds its session from persisted history
    pub fn keeps_history(&self) -> bool {
        self.options.keep_history
    }

    /// Validate the name length and the canonical filter shape
    pub fn validate(&self) -> Result<()> {
        validate_tab_name(&self.name)?;
        if let Some(filters) = &self.filters {
            filters.validate_canonical()?;
        }
        Ok(())
    }
}

/// Check that a tab name is between 3 and 20 characters long
pub fn validate_tab_name(name: &str) -> Result<()> {
    let len = name.chars().count();
    if len < TAB_NAME_MIN_LEN {
        return Err(Error::invalid_tab(format!(
            "name must be at least {} characters",
            TAB_NAME_MIN_LEN
        )));
    }
    if len > TAB_NAME_MAX_LEN {
        return Err(Error::invalid_tab(format!(
            "name must be at most {} characters",
            TAB_NAME_MAX_LEN
        )));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Chat events
// ─────────────────────────────────────────────────────────────────────────────

/// An item linked inside a chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatObject {
    #[serde(rename = "objectGID")]
    pub object_gid: String,
    /// Remaining backend fields, kept verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A single chat message delivered by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEvent {
    pub timestamp: i64,
    pub sender_name: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<ChatObject>>,
}

/// Identity used when de-duplicating live events
pub type ChatEventKey = (i64, String, String);

impl ChatEvent {
    pub fn new(timestamp: i64, sender_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            timestamp,
            sender_name: sender_name.into(),
            content: content.into(),
            objects: None,
        }
    }

    /// De-duplication key: timestamp, sender and content
    pub fn dedupe_key(&self) -> ChatEventKey {
        (
            self.timestamp,
            self.sender_name.clone(),
            self.content.clone(),
        )
    }

    /// Format for single-line display
    pub fn display_line(&self) -> String {
        format!("{}: {}", self.sender_name, self.content)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Global backend configuration
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameVersion {
    pub version: String,
    #[serde(default)]
    pub check_for_updates: bool,
}

/// Subset of the backend's global configuration the client reads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfig {
    pub game_version: GameVersion,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_config_wire_format() {
        let config = TabConfig::new(
            "Alliance",
            TabOptions {
                notify: true,
                keep_history: false,
            },
            2,
        );
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(
            json,
            r#"{"name":"Alliance","options":{"notify":true,"keepHistory":false},"order":2}"#
        );
    }

    #[test]
    fn test_tab_config_missing_filters_is_none() {
        let json = r#"{"name":"Trade","options":{"notify":false,"keepHistory":true},"order":0}"#;
        let config: TabConfig = serde_json::from_str(json).unwrap();
        assert!(config.filters.is_none());
        assert!(config.keeps_history());
    }

    #[test]
    fn test_validate_tab_name_bounds() {
        assert!(validate_tab_name("ab").is_err());
        assert!(validate_tab_name("abc").is_ok());
        assert!(validate_tab_name(&"x".repeat(20)).is_ok());
        assert!(validate_tab_name(&"x".repeat(21)).is_err());
    }

    #[test]
    fn test_validate_tab_name_counts_chars_not_bytes() {
        // 3 characters, 6 bytes
        assert!(validate_tab_name("éèà").is_ok());
    }

    #[test]
    fn test_tab_config_validate_rejects_non_canonical_filters() {
        let config = TabConfig::new("Guild", TabOptions::default(), 0)
            .with_filters(FilterNode::Or(vec![]));
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidFilter { .. })
        ));
    }

    #[test]
    fn test_tab_config_validate_rejects_too_many_groups() {
        let groups = vec![FilterNode::Or(vec![]); crate::filter::GROUP_CAPACITY + 1];
        let config =
            TabConfig::new("Guild", TabOptions::default(), 0).with_filters(FilterNode::And(groups));
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidFilter { .. })
        ));
    }

    #[test]
    fn test_chat_event_wire_format() {
        let json = r#"{"timestamp":1700000000000,"sender_name":"Kiwi","content":"wts [0]","objects":[{"objectGID":"2469","quantity":1}]}"#;
        let event: ChatEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.sender_name, "Kiwi");
        let objects = event.objects.as_ref().unwrap();
        assert_eq!(objects[0].object_gid, "2469");
        assert_eq!(objects[0].extra["quantity"], 1);

        let back = serde_json::to_string(&event).unwrap();
        assert_eq!(back, json);
    }

    #[test]
    fn test_chat_event_without_objects() {
        let event: ChatEvent =
            serde_json::from_str(r#"{"timestamp":1,"sender_name":"a","content":"b"}"#).unwrap();
        assert!(event.objects.is_none());
        assert_eq!(event.display_line(), "a: b");
    }

    #[test]
    fn test_dedupe_key() {
        let a = ChatEvent::new(5, "Kiwi", "hello");
        let b = ChatEvent::new(5, "Kiwi", "hello");
        let c = ChatEvent::new(6, "Kiwi", "hello");
        assert_eq!(a.dedupe_key(), b.dedupe_key());
        assert_ne!(a.dedupe_key(), c.dedupe_key());
    }

    #[test]
    fn test_global_config_wire_format() {
        let json = r#"{"gameVersion":{"version":"2.71.5","checkForUpdates":true},"network":{}}"#;
        let config: GlobalConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.game_version.version, "2.71.5");
    }
}
