//! Headless mode - NDJSON event output driven by stdin commands
//!
//! Runs the engine against the local file-backed backend without any UI.
//! Commands are read line by line from stdin and every engine event is
//! written to stdout as one JSON object per line.
//!
//! # Example Output
//!
//! ```json
//! {"event":"ready","tab_count":2,"game_version":null,"timestamp":1704700001000}
//! {"event":"tab_activated","tab_id":"4f0c...","session":1,"keep_history":true,"timestamp":1704700001002}
//! {"event":"message","tab_id":"4f0c...","index":0,"message":{"timestamp":1704700000000,"sender_name":"Bob","content":"hi"},"timestamp":1704700001010}
//! ```

pub mod runner;

use chrono::Utc;
use serde::Serialize;
use std::io::{self, Write};
use tracing::error;

use chattabs_app::{EngineEvent, HistoryOutcome, SessionToken, TabSummary};
use chattabs_core::{ChatEvent, TabId};

/// Events emitted in headless mode
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HeadlessEvent {
    /// Startup handshake finished
    Ready {
        tab_count: usize,
        game_version: Option<String>,
        timestamp: i64,
    },

    /// Tab list in display order
    Tabs {
        tabs: Vec<TabSummary>,
        timestamp: i64,
    },

    /// No tabs exist yet
    CreateTabPrompted { timestamp: i64 },

    TabActivated {
        tab_id: TabId,
        session: SessionToken,
        keep_history: bool,
        timestamp: i64,
    },

    TabClosed {
        tab_id: Option<TabId>,
        timestamp: i64,
    },

    TabSaved {
        tab: TabSummary,
        created: bool,
        timestamp: i64,
    },

    /// History seeded for the active session
    History {
        tab_id: TabId,
        session: SessionToken,
        outcome: HistoryOutcome,
        message_count: usize,
        timestamp: i64,
    },

    /// History arrived for a session that already ended
    HistoryDiscarded {
        tab_id: TabId,
        session: SessionToken,
        timestamp: i64,
    },

    /// Live message appended to the active tab
    Message {
        tab_id: TabId,
        index: usize,
        message: ChatEvent,
        timestamp: i64,
    },

    /// Message notification, e.g. for an inactive tab
    Notification {
        tab_id: TabId,
        title: String,
        message: ChatEvent,
        timestamp: i64,
    },

    /// Rendered slice of the message list
    Window {
        count: usize,
        offset: u64,
        range: Option<(usize, usize)>,
        total_size: u64,
        timestamp: i64,
    },

    Status {
        live: bool,
        last_packet_timestamp: Option<i64>,
        game_version: Option<String>,
        timestamp: i64,
    },

    Error {
        message: String,
        fatal: bool,
        timestamp: i64,
    },

    Shutdown { timestamp: i64 },
}

impl HeadlessEvent {
    /// Emit this event to stdout as JSON
    pub fn emit(&self) {
        let json = match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize headless event: {}", e);
                return;
            }
        };

        let mut stdout = io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", json) {
            error!("Failed to write headless event to stdout: {}", e);
            return;
        }

        if let Err(e) = stdout.flush() {
            error!("Failed to flush headless stdout: {}", e);
        }
    }

    /// Current timestamp in milliseconds
    fn now() -> i64 {
        Utc::now().timestamp_millis()
    }

    pub fn error(message: impl Into<String>, fatal: bool) -> Self {
        Self::Error {
            message: message.into(),
            fatal,
            timestamp: Self::now(),
        }
    }
}

impl From<EngineEvent> for HeadlessEvent {
    fn from(event: EngineEvent) -> Self {
        let timestamp = Self::now();
        match event {
            EngineEvent::Ready {
                tab_count,
                game_version,
            } => Self::Ready {
                tab_count,
                game_version,
                timestamp,
            },
            EngineEvent::TabsListed { tabs } => Self::Tabs { tabs, timestamp },
            EngineEvent::CreateTabPrompted => Self::CreateTabPrompted { timestamp },
            EngineEvent::TabActivated {
                tab_id,
                session,
                keep_history,
            } => Self::TabActivated {
                tab_id,
                session,
                keep_history,
                timestamp,
            },
            EngineEvent::TabClosed { tab_id } => Self::TabClosed { tab_id, timestamp },
            EngineEvent::TabSaved { tab, created } => Self::TabSaved {
                tab,
                created,
                timestamp,
            },
            EngineEvent::HistoryApplied {
                tab_id,
                session,
                outcome,
                message_count,
            } => Self::History {
                tab_id,
                session,
                outcome,
                message_count,
                timestamp,
            },
            EngineEvent::HistoryDiscarded { tab_id, session } => Self::HistoryDiscarded {
                tab_id,
                session,
                timestamp,
            },
            EngineEvent::MessageAppended {
                tab_id,
                index,
                event,
            } => Self::Message {
                tab_id,
                index,
                message: event,
                timestamp,
            },
            EngineEvent::Notification {
                tab_id,
                title,
                event,
            } => Self::Notification {
                tab_id,
                title,
                message: event,
                timestamp,
            },
            EngineEvent::WindowChanged {
                count,
                offset,
                range,
                total_size,
            } => Self::Window {
                count,
                offset,
                range,
                total_size,
                timestamp,
            },
            EngineEvent::StatusChanged {
                live,
                last_packet_timestamp,
                game_version,
            } => Self::Status {
                live,
                last_packet_timestamp,
                game_version,
                timestamp,
            },
            EngineEvent::Error { message, fatal } => Self::Error {
                message,
                fatal,
                timestamp,
            },
            EngineEvent::Shutdown => Self::Shutdown { timestamp },
        }
    }
}
