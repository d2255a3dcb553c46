//! Configuration types for chat-tabs
//!
//! Defines `Settings` (`<data_dir>/config.toml`) and its sections.

use serde::{Deserialize, Serialize};

/// Application settings (`config.toml`)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub view: ViewSettings,

    #[serde(default)]
    pub history: HistorySettings,

    #[serde(default)]
    pub status: StatusSettings,
}

/// Message list rendering settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ViewSettings {
    /// Estimated height of one message row
    #[serde(default = "default_item_estimate")]
    pub item_estimate: u32,

    /// Use measured row heights once rows are rendered
    #[serde(default)]
    pub measure_items: bool,

    /// Rows materialized beyond each edge of the viewport
    #[serde(default = "default_overscan")]
    pub overscan: usize,

    /// Space kept below the last row when scrolled to the end
    #[serde(default = "default_scroll_padding_end")]
    pub scroll_padding_end: u32,

    /// Initial viewport height, until the frontend reports one
    #[serde(default = "default_viewport")]
    pub viewport: u32,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            item_estimate: default_item_estimate(),
            measure_items: false,
            overscan: default_overscan(),
            scroll_padding_end: default_scroll_padding_end(),
            viewport: default_viewport(),
        }
    }
}

fn default_item_estimate() -> u32 {
    80
}

fn default_overscan() -> usize {
    5
}

fn default_scroll_padding_end() -> u32 {
    80
}

fn default_viewport() -> u32 {
    600
}

/// Session history settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct HistorySettings {
    /// Drop live events equal (timestamp, sender, content) to one already shown
    #[serde(default)]
    pub dedupe_live_events: bool,
}

/// Connection status polling
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StatusSettings {
    /// How often to ask the backend for the last packet timestamp
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// The game counts as disconnected once the last packet is this old
    #[serde(default = "default_stale_after_ms")]
    pub stale_after_ms: i64,
}

impl Default for StatusSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            stale_after_ms: default_stale_after_ms(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

fn default_stale_after_ms() -> i64 {
    10_000
}
