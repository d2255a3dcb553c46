//! File-backed chat backend
//!
//! Stores tab configs in `<data_dir>/tabs.json` and per-tab history under
//! `<data_dir>/history/`. Captured chat events are injected with
//! [`LocalBackend::deliver`] and pushed to listeners when they belong to the
//! active tab. Messages for the active tab, or for a tab with both
//! `notify` and `keepHistory` set, also raise a [`TabNotification`].

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use chattabs_core::prelude::*;
use chattabs_core::{ChatEvent, GlobalConfig, TabConfig, TabId};

use crate::backend::{ChatBackend, ChatEventStream, NotificationStream, TabNotification};
use crate::config::history_dir;
use crate::history::HistoryStore;

const TABS_FILENAME: &str = "tabs.json";

/// Capacity of the live event bus
const EVENT_BUS_CAPACITY: usize = 1024;

/// Capacity of the notification bus
const NOTIFICATION_BUS_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredTab {
    id: TabId,
    #[serde(flatten)]
    config: TabConfig,
}

/// On-disk shape of `tabs.json`
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TabStore {
    #[serde(default)]
    tabs: Vec<StoredTab>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_tab_id: Option<TabId>,
}

pub struct LocalBackend {
    tabs_path: PathBuf,
    store: RwLock<TabStore>,
    active: RwLock<Option<TabId>>,
    events: broadcast::Sender<ChatEvent>,
    notifications: broadcast::Sender<TabNotification>,
    last_packet: AtomicI64,
    ready: AtomicBool,
    global: GlobalConfig,
    history: HistoryStore,
}

impl LocalBackend {
    /// Open (or start) the store under `data_dir`
    pub async fn open(data_dir: &Path) -> Result<Self> {
        let tabs_path = data_dir.join(TABS_FILENAME);
        let store = match tokio::fs::read_to_string(&tabs_path).await {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No {} yet at {:?}", TABS_FILENAME, tabs_path);
                TabStore::default()
            }
            Err(e) => return Err(e.into()),
        };

        let (events, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        let (notifications, _) = broadcast::channel(NOTIFICATION_BUS_CAPACITY);
        info!(
            "Opened local backend at {:?} ({} tabs)",
            data_dir,
            store.tabs.len()
        );

        Ok(Self {
            tabs_path,
            store: RwLock::new(store),
            active: RwLock::new(None),
            events,
            notifications,
            last_packet: AtomicI64::new(0),
            ready: AtomicBool::new(false),
            global: GlobalConfig::default(),
            history: HistoryStore::new(history_dir(data_dir)),
        })
    }

    pub fn with_global_config(mut self, global: GlobalConfig) -> Self {
        self.global = global;
        self
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Route a captured event.
    ///
    /// `tab_id` defaults to the active tab. The event is appended to the
    /// tab's history when it keeps history, raises a notification when the
    /// tab is active or has both `notify` and `keepHistory`, and is pushed to
    /// listeners when the tab is active. Returns `true` if it was pushed.
    pub async fn deliver(&self, tab_id: Option<&TabId>, event: ChatEvent) -> Result<bool> {
        self.record_packet(chrono::Utc::now().timestamp_millis());

        let active = self.active.read().await.clone();
        let Some(target) = tab_id.cloned().or_else(|| active.clone()) else {
            trace!("No tab to route \"{}\" to", event.display_line());
            return Ok(false);
        };

        let config = {
            let store = self.store.read().await;
            store
                .tabs
                .iter()
                .find(|tab| tab.id == target)
                .map(|tab| tab.config.clone())
                .ok_or_else(|| Error::tab_not_found(target.as_str()))?
        };
        let is_active = active.as_ref() == Some(&target);
        trace!("Routing \"{}\" to tab {}", event.display_line(), target);

        if config.keeps_history() {
            self.history.append(&target, &event).await?;
        }

        if (config.keeps_history() && config.options.notify) || is_active {
            // No receivers is fine: nobody is listening yet
            let _ = self.notifications.send(TabNotification {
                tab_id: target.clone(),
                tab_name: config.name.clone(),
                event: event.clone(),
            });
        }

        if is_active {
            let _ = self.events.send(event);
        }
        Ok(is_active)
    }

    /// Record the arrival time (Unix ms) of a game packet
    pub fn record_packet(&self, timestamp_ms: i64) {
        self.last_packet.store(timestamp_ms, Ordering::SeqCst);
    }

    /// Number of live event listeners currently registered
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    pub async fn active_tab(&self) -> Option<TabId> {
        self.active.read().await.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Write `tabs.json` atomically
    async fn save(&self, store: &TabStore) -> Result<()> {
        if let Some(parent) = self.tabs_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(store)?;
        let temp_path = self.tabs_path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, content).await?;
        tokio::fs::rename(&temp_path, &self.tabs_path).await?;
        Ok(())
    }
}

impl ChatBackend for LocalBackend {
    async fn list_chat_tabs(&self) -> Result<Vec<(TabId, TabConfig)>> {
        let store = self.store.read().await;
        Ok(store
            .tabs
            .iter()
            .map(|tab| (tab.id.clone(), tab.config.clone()))
            .collect())
    }

    async fn create_chat_tab(&self, config: TabConfig) -> Result<TabId> {
        config.validate()?;
        let id = TabId::new(Uuid::new_v4().to_string());

        let mut store = self.store.write().await;
        store.tabs.push(StoredTab {
            id: id.clone(),
            config,
        });
        self.save(&store).await?;

        info!("Created tab {}", id);
        Ok(id)
    }

    async fn update_chat_tab_config(&self, tab_id: &TabId, config: TabConfig) -> Result<()> {
        config.validate()?;

        let mut store = self.store.write().await;
        let tab = store
            .tabs
            .iter_mut()
            .find(|tab| &tab.id == tab_id)
            .ok_or_else(|| Error::tab_not_found(tab_id.as_str()))?;
        tab.config = config;
        self.save(&store).await?;

        debug!("Updated tab {}", tab_id);
        Ok(())
    }

    async fn set_active_chat_tab(&self, tab_id: Option<&TabId>) -> Result<()> {
        *self.active.write().await = tab_id.cloned();

        if let Some(id) = tab_id {
            let mut store = self.store.write().await;
            if store.last_tab_id.as_ref() != Some(id) {
                store.last_tab_id = Some(id.clone());
                self.save(&store).await?;
            }
        }
        debug!("Active tab: {:?}", tab_id);
        Ok(())
    }

    async fn get_last_open_chat_tab(&self) -> Result<Option<TabId>> {
        Ok(self.store.read().await.last_tab_id.clone())
    }

    async fn get_last_packet_timestamp(&self) -> Result<i64> {
        Ok(self.last_packet.load(Ordering::SeqCst))
    }

    async fn get_global_config(&self) -> Result<GlobalConfig> {
        Ok(self.global.clone())
    }

    async fn app_ready(&self) -> Result<()> {
        self.ready.store(true, Ordering::SeqCst);
        info!("Client ready");
        Ok(())
    }

    fn subscribe_chat_events(&self) -> Result<ChatEventStream> {
        Ok(ChatEventStream::new(self.events.subscribe()))
    }

    fn subscribe_notifications(&self) -> Result<NotificationStream> {
        Ok(NotificationStream::new(self.notifications.subscribe()))
    }
}
