//! Messages processed by the engine loop

use chattabs_core::{ChatEvent, Result, TabId};

use crate::controller::SessionToken;
use crate::tab_form::TabFormValues;

/// All inputs to the engine, from the frontend and from background tasks
#[derive(Debug)]
pub enum Message {
    // ─────────────────────────────────────────────────────────
    // Tab Navigation
    // ─────────────────────────────────────────────────────────
    /// Open the last open tab, falling back to the first tab
    OpenInitialTab,

    /// Enter a tab, leaving the current one
    SwitchTab(TabId),

    /// Leave the active tab without entering another
    CloseTab,

    /// Report the tab list
    ListTabs,

    // ─────────────────────────────────────────────────────────
    // Tab Editing
    // ─────────────────────────────────────────────────────────
    /// Submit the "new tab" form
    CreateTab(TabFormValues),

    /// Submit the "edit tab" form
    UpdateTab { tab_id: TabId, form: TabFormValues },

    // ─────────────────────────────────────────────────────────
    // Message List
    // ─────────────────────────────────────────────────────────
    ScrollTo(u64),

    ScrollToIndex(usize),

    ResizeViewport(u32),

    /// A rendered row reported its real size
    MeasureItem { index: usize, size: u32 },

    // ─────────────────────────────────────────────────────────
    // Background Results
    // ─────────────────────────────────────────────────────────
    /// A history load finished
    HistoryLoaded {
        session: SessionToken,
        tab_id: TabId,
        result: Result<Option<Vec<ChatEvent>>>,
    },

    /// Status poll result
    LastPacketTimestamp(i64),

    /// Status poll failed
    StatusPollFailed(String),

    /// Report the current connection status
    RequestStatus,

    /// Stop the engine
    Quit,
}
