//! Domain events emitted by the Engine for frontends
//!
//! Events are broadcast after each processed message via
//! `Engine::subscribe()`. The headless runner prints them as NDJSON.

use serde::Serialize;

use chattabs_core::{ChatEvent, TabConfig, TabId};

use crate::controller::{HistoryOutcome, SessionToken};

/// One row of the tab bar
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TabSummary {
    pub id: TabId,
    pub name: String,
    pub order: i64,
    pub notify: bool,
    pub keep_history: bool,
}

impl TabSummary {
    pub fn new(id: &TabId, config: &TabConfig) -> Self {
        Self {
            id: id.clone(),
            name: config.name.clone(),
            order: config.order,
            notify: config.options.notify,
            keep_history: config.options.keep_history,
        }
    }
}

/// State changes observable by a frontend
#[derive(Debug, Clone)]
pub enum EngineEvent {
    // ─────────────────────────────────────────────────────────
    // Startup
    // ─────────────────────────────────────────────────────────
    /// Backend handshake done and tabs loaded
    Ready {
        tab_count: usize,
        game_version: Option<String>,
    },

    // ─────────────────────────────────────────────────────────
    // Tabs
    // ─────────────────────────────────────────────────────────
    /// Tab list, in display order
    TabsListed { tabs: Vec<TabSummary> },

    /// No tab exists yet; the frontend should show the "new tab" form
    CreateTabPrompted,

    TabActivated {
        tab_id: TabId,
        session: SessionToken,
        keep_history: bool,
    },

    /// The active tab was left without entering another
    TabClosed { tab_id: Option<TabId> },

    /// A tab was created or its config replaced
    TabSaved { tab: TabSummary, created: bool },

    // ─────────────────────────────────────────────────────────
    // Messages
    // ─────────────────────────────────────────────────────────
    /// The session's history was seeded
    HistoryApplied {
        tab_id: TabId,
        session: SessionToken,
        outcome: HistoryOutcome,
        message_count: usize,
    },

    /// A history load finished after its session ended
    HistoryDiscarded { tab_id: TabId, session: SessionToken },

    /// A live event was appended to the active session
    MessageAppended {
        tab_id: TabId,
        index: usize,
        event: ChatEvent,
    },

    /// A message the user asked to be alerted about, in any tab
    Notification {
        tab_id: TabId,
        title: String,
        event: ChatEvent,
    },

    /// The message list's rendered slice moved
    WindowChanged {
        count: usize,
        offset: u64,
        range: Option<(usize, usize)>,
        total_size: u64,
    },

    // ─────────────────────────────────────────────────────────
    // Status
    // ─────────────────────────────────────────────────────────
    StatusChanged {
        live: bool,
        last_packet_timestamp: Option<i64>,
        game_version: Option<String>,
    },

    Error { message: String, fatal: bool },

    // ─────────────────────────────────────────────────────────
    // Engine Lifecycle
    // ─────────────────────────────────────────────────────────
    Shutdown,
}

impl EngineEvent {
    /// Short snake_case label for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Ready { .. } => "ready",
            Self::TabsListed { .. } => "tabs_listed",
            Self::CreateTabPrompted => "create_tab_prompted",
            Self::TabActivated { .. } => "tab_activated",
            Self::TabClosed { .. } => "tab_closed",
            Self::TabSaved { .. } => "tab_saved",
            Self::HistoryApplied { .. } => "history_applied",
            Self::HistoryDiscarded { .. } => "history_discarded",
            Self::MessageAppended { .. } => "message_appended",
            Self::Notification { .. } => "notification",
            Self::WindowChanged { .. } => "window_changed",
            Self::StatusChanged { .. } => "status_changed",
            Self::Error { .. } => "error",
            Self::Shutdown => "shutdown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chattabs_core::TabOptions;

    #[test]
    fn test_event_type_labels_are_snake_case() {
        let events = vec![
            EngineEvent::Ready {
                tab_count: 0,
                game_version: None,
            },
            EngineEvent::CreateTabPrompted,
            EngineEvent::TabClosed { tab_id: None },
            EngineEvent::WindowChanged {
                count: 0,
                offset: 0,
                range: None,
                total_size: 0,
            },
            EngineEvent::Error {
                message: "boom".into(),
                fatal: false,
            },
            EngineEvent::Shutdown,
        ];

        for event in events {
            let label = event.event_type();
            assert_eq!(label, label.to_lowercase());
            assert!(!label.contains(' '));
        }
    }

    #[test]
    fn test_tab_summary_from_config() {
        let config = TabConfig::new(
            "Guild",
            TabOptions {
                notify: true,
                keep_history: false,
            },
            3,
        );
        let summary = TabSummary::new(&TabId::from("g"), &config);
        assert_eq!(summary.name, "Guild");
        assert_eq!(summary.order, 3);
        assert!(summary.notify);
        assert!(!summary.keep_history);
    }
}
