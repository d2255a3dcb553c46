//! Merges a tab's persisted history with its live event stream
//!
//! The session sequence is append-only. History, when requested, always
//! comes first: live events that arrive while the history load is in flight
//! are held back and appended after it.

use std::collections::HashSet;

use chattabs_core::prelude::*;
use chattabs_core::{ChatEvent, ChatEventKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// History load in flight; live events are buffered
    AwaitingHistory,
    /// Live events go straight to the sequence
    Live,
}

/// Ordered message sequence for the active session
#[derive(Debug)]
pub struct MessageReconciler {
    messages: Vec<ChatEvent>,
    pending_live: Vec<ChatEvent>,
    phase: Phase,
    /// Keys already shown, when de-duplication is on
    seen: Option<HashSet<ChatEventKey>>,
}

impl Default for MessageReconciler {
    fn default() -> Self {
        Self::live(false)
    }
}

impl MessageReconciler {
    /// Session without history: starts empty and accepts live events directly
    pub fn live(dedupe: bool) -> Self {
        Self::with_phase(Phase::Live, dedupe)
    }

    /// Session waiting for its history to be seeded
    pub fn awaiting_history(dedupe: bool) -> Self {
        Self::with_phase(Phase::AwaitingHistory, dedupe)
    }

    fn with_phase(phase: Phase, dedupe: bool) -> Self {
        Self {
            messages: Vec::new(),
            pending_live: Vec::new(),
            phase,
            seen: dedupe.then(HashSet::new),
        }
    }

    pub fn is_awaiting_history(&self) -> bool {
        self.phase == Phase::AwaitingHistory
    }

    /// Seed the sequence with history, then replay buffered live events.
    ///
    /// Ignored (returns `false`) unless the session is awaiting history.
    /// History is kept as delivered, including repeats; only the live events
    /// after it are subject to de-duplication.
    pub fn seed_history(&mut self, history: Vec<ChatEvent>) -> bool {
        if self.phase != Phase::AwaitingHistory {
            debug!("Ignoring history for a session that is already live");
            return false;
        }

        if let Some(seen) = self.seen.as_mut() {
            seen.extend(history.iter().map(ChatEvent::dedupe_key));
        }
        self.messages.extend(history);
        self.phase = Phase::Live;

        let pending = std::mem::take(&mut self.pending_live);
        if !pending.is_empty() {
            trace!("Replaying {} live events buffered during history load", pending.len());
        }
        for event in pending {
            self.append_live(event);
        }
        true
    }

    /// Accept one live event.
    ///
    /// Returns `true` if the visible sequence grew. Buffered or dropped
    /// duplicates return `false`.
    pub fn push_live(&mut self, event: ChatEvent) -> bool {
        match self.phase {
            Phase::AwaitingHistory => {
                self.pending_live.push(event);
                false
            }
            Phase::Live => self.append_live(event),
        }
    }

    fn append_live(&mut self, event: ChatEvent) -> bool {
        if let Some(seen) = self.seen.as_mut() {
            if !seen.insert(event.dedupe_key()) {
                trace!("Dropping duplicate live event from {}", event.sender_name);
                return false;
            }
        }
        self.messages.push(event);
        true
    }

    pub fn messages(&self) -> &[ChatEvent] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Live events held back until history arrives
    pub fn pending_len(&self) -> usize {
        self.pending_live.len()
    }
}
