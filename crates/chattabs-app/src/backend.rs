//! Backend command and event interface
//!
//! The backend owns tab persistence, packet capture and routing. The client
//! talks to it through request/response commands plus two push streams: the
//! [`ChatEvent`]s routed to whichever tab the backend considers active, and
//! the [`TabNotification`]s raised for messages the user asked to be told
//! about.

use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

use chattabs_core::prelude::*;
use chattabs_core::{ChatEvent, GlobalConfig, TabConfig, TabId};

/// One item taken from a push stream
#[derive(Debug, Clone, PartialEq)]
pub enum Pushed<T> {
    Event(T),
    /// The listener fell behind and this many events were overwritten
    Lagged(u64),
}

/// Receiving end of one of the backend's push streams.
///
/// Dropping the stream unregisters the listener.
#[derive(Debug)]
pub struct PushStream<T> {
    rx: broadcast::Receiver<T>,
}

/// The `chatEvent` stream: messages routed to the active tab
pub type ChatEventStream = PushStream<ChatEvent>;

/// The notification stream: messages the user should be alerted about
pub type NotificationStream = PushStream<TabNotification>;

impl<T: Clone> PushStream<T> {
    pub fn new(rx: broadcast::Receiver<T>) -> Self {
        Self { rx }
    }

    /// Wait for the next item. Returns `None` once the backend closes the stream.
    ///
    /// Cancel safe.
    pub async fn recv(&mut self) -> Option<Pushed<T>> {
        match self.rx.recv().await {
            Ok(event) => Some(Pushed::Event(event)),
            Err(RecvError::Lagged(skipped)) => {
                warn!("Push stream lagged, {} events dropped", skipped);
                Some(Pushed::Lagged(skipped))
            }
            Err(RecvError::Closed) => None,
        }
    }

    /// Take an already delivered item without waiting
    pub fn try_recv(&mut self) -> Option<Pushed<T>> {
        match self.rx.try_recv() {
            Ok(event) => Some(Pushed::Event(event)),
            Err(TryRecvError::Lagged(skipped)) => Some(Pushed::Lagged(skipped)),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => None,
        }
    }
}

/// A message the backend flagged for a user notification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TabNotification {
    pub tab_id: TabId,
    pub tab_name: String,
    pub event: ChatEvent,
}

impl TabNotification {
    /// Notification title, e.g. `New chat message in Guild`
    pub fn title(&self) -> String {
        format!("New chat message in {}", self.tab_name)
    }
}

/// Commands and the push stream consumed from the backend
#[trait_variant::make(ChatBackend: Send)]
pub trait LocalChatBackend {
    /// Full tab list, in the backend's stored order
    async fn list_chat_tabs(&self) -> Result<Vec<(TabId, TabConfig)>>;

    /// Persist a new tab and return its assigned id
    async fn create_chat_tab(&self, config: TabConfig) -> Result<TabId>;

    /// Replace a tab's configuration
    async fn update_chat_tab_config(&self, tab_id: &TabId, config: TabConfig) -> Result<()>;

    /// Tell the backend which tab (if any) receives live events
    async fn set_active_chat_tab(&self, tab_id: Option<&TabId>) -> Result<()>;

    /// The tab that was open when the client last ran
    async fn get_last_open_chat_tab(&self) -> Result<Option<TabId>>;

    /// Unix milliseconds of the last captured game packet
    async fn get_last_packet_timestamp(&self) -> Result<i64>;

    async fn get_global_config(&self) -> Result<GlobalConfig>;

    /// Signal that the client finished starting up
    async fn app_ready(&self) -> Result<()>;

    /// Register a listener on the `chatEvent` push stream
    fn subscribe_chat_events(&self) -> Result<ChatEventStream>;

    /// Register a listener for message notifications
    fn subscribe_notifications(&self) -> Result<NotificationStream>;
}
