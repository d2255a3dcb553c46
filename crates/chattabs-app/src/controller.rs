//! Active tab lifecycle
//!
//! Exactly one tab is active at a time. Entering a tab tells the backend
//! where to route live events, optionally requests the tab's persisted
//! history, and opens a live subscription scoped to the new session. Leaving
//! a tab always releases the subscription before anything else happens.
//!
//! Every activation gets a fresh [`SessionToken`]. History loads and live
//! events carry the token they were issued under, and anything arriving for
//! a session that is no longer current is dropped.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use chattabs_core::prelude::*;
use chattabs_core::{ChatEvent, TabConfig, TabId};

use crate::backend::{ChatBackend, ChatEventStream, Pushed};
use crate::reconciler::MessageReconciler;

/// Identifies one activation of one tab
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SessionToken(u64);

impl SessionToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Controller state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabState {
    /// No tab active, no subscription held
    Idle,
    /// Tab entered, persisted history still loading
    Switching { tab_id: TabId, session: SessionToken },
    /// Tab entered and its sequence seeded
    Active { tab_id: TabId, session: SessionToken },
}

impl TabState {
    pub fn tab_id(&self) -> Option<&TabId> {
        match self {
            TabState::Idle => None,
            TabState::Switching { tab_id, .. } | TabState::Active { tab_id, .. } => Some(tab_id),
        }
    }

    pub fn session(&self) -> Option<SessionToken> {
        match self {
            TabState::Idle => None,
            TabState::Switching { session, .. } | TabState::Active { session, .. } => {
                Some(*session)
            }
        }
    }
}

/// History load the caller must perform and report back through
/// [`ActiveTabController::complete_history`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub session: SessionToken,
    pub tab_id: TabId,
}

/// What happened to the active session's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum HistoryOutcome {
    /// Tab does not keep history
    NotRequested,
    Pending,
    /// Seeded with this many events
    Loaded(usize),
    /// History file exists but holds no events
    Empty,
    /// No history file for this tab yet
    Missing,
    /// Load failed; the session started empty
    Failed(String),
}

/// Live event listener owned by one session.
///
/// Dropping it unregisters from the backend's push stream.
#[derive(Debug)]
pub struct LiveSubscription {
    session: SessionToken,
    tab_id: TabId,
    stream: ChatEventStream,
}

impl LiveSubscription {
    pub fn session(&self) -> SessionToken {
        self.session
    }

    pub fn tab_id(&self) -> &TabId {
        &self.tab_id
    }
}

impl Drop for LiveSubscription {
    fn drop(&mut self) {
        debug!(
            "Released live subscription for tab {} (session {})",
            self.tab_id, self.session
        );
    }
}

/// Owns the active tab, its live subscription and its message sequence
pub struct ActiveTabController<B> {
    backend: Arc<B>,
    state: TabState,
    next_session: u64,
    subscription: Option<LiveSubscription>,
    reconciler: MessageReconciler,
    history: HistoryOutcome,
    dedupe: bool,
}

impl<B: ChatBackend> ActiveTabController<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            state: TabState::Idle,
            next_session: 0,
            subscription: None,
            reconciler: MessageReconciler::default(),
            history: HistoryOutcome::NotRequested,
            dedupe: false,
        }
    }

    /// Drop live events already present in the sequence
    pub fn with_dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }

    /// Leave the current tab (if any) and enter `tab_id`.
    ///
    /// Returns the history load to run when the tab keeps history. If the
    /// backend rejects the activation or the subscription fails, the
    /// controller ends up [`TabState::Idle`] and the backend is told no tab
    /// is active.
    pub async fn switch_to(
        &mut self,
        tab_id: TabId,
        config: &TabConfig,
    ) -> Result<Option<HistoryRequest>> {
        self.leave();

        if let Err(e) = self.backend.set_active_chat_tab(Some(&tab_id)).await {
            error!("Activating tab {} failed: {}", tab_id, e);
            self.clear_backend_active().await;
            return Err(e);
        }

        self.next_session += 1;
        let session = SessionToken(self.next_session);

        let stream = match self.backend.subscribe_chat_events() {
            Ok(stream) => stream,
            Err(e) => {
                error!("Subscribing to chat events for tab {} failed: {}", tab_id, e);
                self.clear_backend_active().await;
                return Err(e);
            }
        };
        self.subscription = Some(LiveSubscription {
            session,
            tab_id: tab_id.clone(),
            stream,
        });

        info!("Entered tab {} (session {})", tab_id, session);

        if config.keeps_history() {
            self.reconciler = MessageReconciler::awaiting_history(self.dedupe);
            self.history = HistoryOutcome::Pending;
            self.state = TabState::Switching {
                tab_id: tab_id.clone(),
                session,
            };
            Ok(Some(HistoryRequest { session, tab_id }))
        } else {
            self.reconciler = MessageReconciler::live(self.dedupe);
            self.history = HistoryOutcome::NotRequested;
            self.state = TabState::Active { tab_id, session };
            Ok(None)
        }
    }

    /// Leave the current tab and tell the backend no tab is active
    pub async fn deactivate(&mut self) -> Result<()> {
        let was = self.state.tab_id().cloned();
        self.leave();
        self.backend.set_active_chat_tab(None).await?;
        if let Some(tab_id) = was {
            info!("Closed tab {}", tab_id);
        }
        Ok(())
    }

    /// Best-effort `setActiveChatTab(null)` after a failed switch
    async fn clear_backend_active(&self) {
        if let Err(e) = self.backend.set_active_chat_tab(None).await {
            warn!("Failed to clear active tab after switch error: {}", e);
        }
    }

    /// Release the subscription and discard the session sequence
    fn leave(&mut self) {
        self.subscription = None;
        self.state = TabState::Idle;
        self.reconciler = MessageReconciler::default();
        self.history = HistoryOutcome::NotRequested;
    }

    /// Apply a finished history load.
    ///
    /// Ignored unless `session` is the session still waiting for history.
    /// A failed load seeds an empty history. Returns `true` if applied.
    pub fn complete_history(
        &mut self,
        session: SessionToken,
        result: Result<Option<Vec<ChatEvent>>>,
    ) -> bool {
        let tab_id = match &self.state {
            TabState::Switching {
                tab_id,
                session: current,
            } if *current == session => tab_id.clone(),
            _ => {
                debug!("Discarding history for stale session {}", session);
                return false;
            }
        };

        let (events, outcome) = match result {
            Ok(Some(events)) if events.is_empty() => (events, HistoryOutcome::Empty),
            Ok(Some(events)) => {
                let count = events.len();
                (events, HistoryOutcome::Loaded(count))
            }
            Ok(None) => (Vec::new(), HistoryOutcome::Missing),
            Err(e) => {
                warn!("History for tab {} unavailable: {}", tab_id, e);
                (Vec::new(), HistoryOutcome::Failed(e.to_string()))
            }
        };

        self.reconciler.seed_history(events);
        self.history = outcome;
        self.state = TabState::Active { tab_id, session };
        true
    }

    /// Wait for the next live event on the current subscription.
    ///
    /// Never resolves while no subscription is held. A [`Pushed::Lagged`]
    /// item means events were lost before reaching this session. Returns
    /// `None` (and drops the subscription) if the backend closes the stream.
    /// Cancel safe.
    pub async fn next_live_event(&mut self) -> Option<(SessionToken, Pushed<ChatEvent>)> {
        let Some(subscription) = self.subscription.as_mut() else {
            return std::future::pending().await;
        };
        match subscription.stream.recv().await {
            Some(item) => Some((subscription.session, item)),
            None => {
                warn!("Backend closed the chat event stream");
                self.subscription = None;
                None
            }
        }
    }

    /// Add a live event to the current session.
    ///
    /// Returns `true` if the visible sequence grew.
    pub fn apply_live_event(&mut self, session: SessionToken, event: ChatEvent) -> bool {
        if self.state.session() != Some(session) {
            trace!("Dropping live event for stale session {}", session);
            return false;
        }
        self.reconciler.push_live(event)
    }

    pub fn state(&self) -> &TabState {
        &self.state
    }

    pub fn active_tab(&self) -> Option<&TabId> {
        self.state.tab_id()
    }

    pub fn current_session(&self) -> Option<SessionToken> {
        self.state.session()
    }

    pub fn has_subscription(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn subscription(&self) -> Option<&LiveSubscription> {
        self.subscription.as_ref()
    }

    pub fn messages(&self) -> &[ChatEvent] {
        self.reconciler.messages()
    }

    pub fn history_outcome(&self) -> &HistoryOutcome {
        &self.history
    }
}
