//! Engine - orchestration loop shared by every frontend
//!
//! The Engine owns the tab registry, the active tab controller and the
//! message list window. All state changes happen on one loop that processes
//! one [`Message`] at a time and interleaves live events from the active
//! subscription and the backend's notification stream. Backend calls are
//! awaited inline; history loads and status polling run as background tasks
//! that report back through the message channel.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use chattabs_core::prelude::*;
use chattabs_core::{ChatEvent, TabId};

use crate::backend::{ChatBackend, NotificationStream, Pushed, TabNotification};
use crate::config::{history_dir, Settings};
use crate::controller::{ActiveTabController, HistoryRequest, SessionToken};
use crate::engine_event::{EngineEvent, TabSummary};
use crate::history::HistoryStore;
use crate::message::Message;
use crate::navigation::{resolve_initial_tab, InitialTab};
use crate::registry::TabRegistry;
use crate::status::{spawn_status_poller, ConnectionStatus};
use crate::tab_form::TabFormValues;
use crate::virtual_window::VirtualWindow;

/// What woke the loop up
enum Wake {
    Message(Option<Message>),
    Live(Option<(SessionToken, Pushed<ChatEvent>)>),
    Notification(Option<Pushed<TabNotification>>),
}

/// Next item on the notification stream; never resolves without one
async fn next_notification(
    stream: &mut Option<NotificationStream>,
) -> Option<Pushed<TabNotification>> {
    match stream.as_mut() {
        Some(stream) => stream.recv().await,
        None => std::future::pending().await,
    }
}

/// Orchestration engine for chat-tabs
pub struct Engine<B> {
    backend: Arc<B>,

    /// All configured tabs
    pub registry: TabRegistry,

    /// Active tab, its subscription and message sequence
    pub controller: ActiveTabController<B>,

    /// Rendered slice of the active tab's messages
    pub window: VirtualWindow,

    /// Latest connection status
    pub status: ConnectionStatus,

    /// Loaded settings
    pub settings: Settings,

    history: HistoryStore,

    /// Backend notifications, once `start` has subscribed
    notifications: Option<NotificationStream>,

    /// Sender half of the message channel. Clone for input sources.
    msg_tx: mpsc::Sender<Message>,

    msg_rx: mpsc::Receiver<Message>,

    /// Send `true` to stop background tasks
    shutdown_tx: watch::Sender<bool>,

    shutdown_rx: watch::Receiver<bool>,

    status_task: Option<JoinHandle<()>>,

    /// Most recently spawned history load
    history_task: Option<JoinHandle<()>>,

    /// Last liveness reported to subscribers
    last_live: Option<bool>,

    event_tx: broadcast::Sender<EngineEvent>,

    should_quit: bool,
}

impl<B> Engine<B>
where
    B: ChatBackend + Sync + 'static,
{
    /// Create an engine over `backend`, reading history from `data_dir`
    pub fn new(backend: Arc<B>, data_dir: &Path, settings: Settings) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel::<Message>(256);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (event_tx, _) = broadcast::channel(256);

        let controller = ActiveTabController::new(backend.clone())
            .with_dedupe(settings.history.dedupe_live_events);
        let window = VirtualWindow::from_settings(&settings.view);

        Self {
            backend,
            registry: TabRegistry::new(),
            controller,
            window,
            status: ConnectionStatus::default(),
            settings,
            history: HistoryStore::new(history_dir(data_dir)),
            notifications: None,
            msg_tx,
            msg_rx,
            shutdown_tx,
            shutdown_rx,
            status_task: None,
            history_task: None,
            last_live: None,
            event_tx,
            should_quit: false,
        }
    }

    /// Subscribe to engine events.
    ///
    /// Slow subscribers lose the oldest events.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    pub fn msg_sender(&self) -> mpsc::Sender<Message> {
        self.msg_tx.clone()
    }

    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Messages of the active session, in display order
    pub fn messages(&self) -> &[ChatEvent] {
        self.controller.messages()
    }

    /// Startup handshake: signal readiness, load tabs and game version, start
    /// status polling.
    ///
    /// Stored tabs that fail validation (e.g. a non-canonical filter) are
    /// left out of the registry and each reported as an error event.
    pub async fn start(&mut self) -> Result<()> {
        self.backend.app_ready().await?;

        let mut tabs = Vec::new();
        for (tab_id, config) in self.backend.list_chat_tabs().await? {
            match config.validate() {
                Ok(()) => tabs.push((tab_id, config)),
                Err(e) => {
                    warn!("Skipping stored tab {}: {}", tab_id, e);
                    self.emit(EngineEvent::Error {
                        message: format!("tab {}: {}", tab_id, e),
                        fatal: false,
                    });
                }
            }
        }
        self.registry.replace_all(tabs);
        info!(
            "Loaded {} tabs: {}",
            self.registry.len(),
            self.registry.tab_titles().join(", ")
        );

        match self.backend.subscribe_notifications() {
            Ok(stream) => self.notifications = Some(stream),
            Err(e) => warn!("Message notifications unavailable: {}", e),
        }

        match self.backend.get_global_config().await {
            Ok(global) => self.status.game_version = Some(global.game_version.version),
            Err(e) => warn!("Failed to read global config: {}", e),
        }

        let interval = self.settings.status.poll_interval_ms;
        if interval > 0 {
            self.status_task = Some(spawn_status_poller(
                self.backend.clone(),
                Duration::from_millis(interval),
                self.msg_tx.clone(),
                self.shutdown_rx.clone(),
            ));
        }

        self.emit(EngineEvent::Ready {
            tab_count: self.registry.len(),
            game_version: self.status.game_version.clone(),
        });
        Ok(())
    }

    /// Process messages and live events until quit
    pub async fn run(&mut self) {
        while self.step().await {}
        self.shutdown().await;
    }

    /// Wait for one message, live event or notification and process it.
    ///
    /// Returns `false` once the engine should stop.
    pub async fn step(&mut self) -> bool {
        if self.should_quit {
            return false;
        }

        let wake = tokio::select! {
            msg = self.msg_rx.recv() => Wake::Message(msg),
            live = self.controller.next_live_event() => Wake::Live(live),
            note = next_notification(&mut self.notifications) => Wake::Notification(note),
        };

        match wake {
            Wake::Message(Some(msg)) => self.process_message(msg).await,
            Wake::Message(None) => self.should_quit = true,
            Wake::Live(Some((session, Pushed::Event(event)))) => {
                self.handle_live_event(session, event);
            }
            Wake::Live(Some((session, Pushed::Lagged(skipped)))) => {
                self.handle_live_lag(session, skipped);
            }
            Wake::Live(None) => self.emit(EngineEvent::Error {
                message: "chat event stream closed".to_string(),
                fatal: false,
            }),
            Wake::Notification(Some(Pushed::Event(note))) => {
                self.emit(EngineEvent::Notification {
                    title: note.title(),
                    tab_id: note.tab_id,
                    event: note.event,
                });
            }
            Wake::Notification(Some(Pushed::Lagged(skipped))) => {
                debug!("{} notifications dropped", skipped);
            }
            Wake::Notification(None) => {
                warn!("Backend closed the notification stream");
                self.notifications = None;
            }
        }

        !self.should_quit
    }

    /// Process every message already queued, without waiting
    pub async fn drain_pending_messages(&mut self) -> usize {
        let mut count = 0;
        while let Ok(msg) = self.msg_rx.try_recv() {
            self.process_message(msg).await;
            count += 1;
        }
        count
    }

    /// Process a single message, reporting failures as [`EngineEvent::Error`]
    pub async fn process_message(&mut self, msg: Message) {
        trace!("Processing {:?}", msg);
        if let Err(e) = self.handle_message(msg).await {
            if e.is_recoverable() {
                warn!("{}", e);
            } else {
                error!("{}", e);
            }
            self.emit(EngineEvent::Error {
                message: e.to_string(),
                fatal: e.is_fatal(),
            });
        }
    }

    async fn handle_message(&mut self, msg: Message) -> Result<()> {
        match msg {
            Message::OpenInitialTab => self.open_initial_tab().await?,
            Message::SwitchTab(tab_id) => self.switch_tab(tab_id).await?,
            Message::CloseTab => self.close_tab().await?,
            Message::ListTabs => self.emit_tabs(),
            Message::CreateTab(form) => self.create_tab(form).await?,
            Message::UpdateTab { tab_id, form } => self.update_tab(tab_id, form).await?,
            Message::ScrollTo(offset) => {
                self.window.scroll_to(offset);
                self.emit_window();
            }
            Message::ScrollToIndex(index) => {
                self.window.scroll_to_index(index);
                self.emit_window();
            }
            Message::ResizeViewport(viewport) => {
                self.window.set_viewport(viewport);
                self.emit_window();
            }
            Message::MeasureItem { index, size } => {
                if self.window.measure_item(index, size) {
                    self.emit_window();
                }
            }
            Message::HistoryLoaded {
                session,
                tab_id,
                result,
            } => self.apply_history(session, tab_id, result),
            Message::LastPacketTimestamp(ts) => {
                self.status.last_packet_timestamp = Some(ts);
                let live = self.is_live();
                if self.last_live != Some(live) {
                    self.emit_status();
                }
            }
            Message::StatusPollFailed(reason) => {
                warn!("Status poll failed: {}", reason);
            }
            Message::RequestStatus => self.emit_status(),
            Message::Quit => {
                info!("Quit requested");
                self.should_quit = true;
            }
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────
    // Tab Navigation
    // ─────────────────────────────────────────────────────────

    async fn open_initial_tab(&mut self) -> Result<()> {
        let last_open = match self.backend.get_last_open_chat_tab().await {
            Ok(last_open) => last_open,
            Err(e) => {
                warn!("Failed to read last open tab: {}", e);
                None
            }
        };

        match resolve_initial_tab(&self.registry, last_open) {
            InitialTab::Open(tab_id) => self.switch_tab(tab_id).await,
            InitialTab::CreateNew => {
                info!("No tabs configured");
                self.emit(EngineEvent::CreateTabPrompted);
                Ok(())
            }
        }
    }

    async fn switch_tab(&mut self, tab_id: TabId) -> Result<()> {
        let config = self.registry.require(&tab_id)?.clone();

        self.window.reset();
        let result = self.controller.switch_to(tab_id.clone(), &config).await;
        self.emit_window();
        let request = result?;

        if let Some(session) = self.controller.current_session() {
            self.emit(EngineEvent::TabActivated {
                tab_id,
                session,
                keep_history: config.keeps_history(),
            });
        }

        if let Some(request) = request {
            self.spawn_history_load(request);
        }
        Ok(())
    }

    async fn close_tab(&mut self) -> Result<()> {
        let tab_id = self.controller.active_tab().cloned();
        self.window.reset();
        self.controller.deactivate().await?;
        self.emit(EngineEvent::TabClosed { tab_id });
        self.emit_window();
        Ok(())
    }

    // ─────────────────────────────────────────────────────────
    // Tab Editing
    // ─────────────────────────────────────────────────────────

    async fn create_tab(&mut self, form: TabFormValues) -> Result<()> {
        let config = form.to_config(self.registry.next_order())?;
        let tab_id = self.backend.create_chat_tab(config.clone()).await?;

        let tab = TabSummary::new(&tab_id, &config);
        self.registry.upsert(tab_id.clone(), config);
        self.emit(EngineEvent::TabSaved { tab, created: true });

        self.switch_tab(tab_id).await
    }

    async fn update_tab(&mut self, tab_id: TabId, form: TabFormValues) -> Result<()> {
        let order = self.registry.require(&tab_id)?.order;
        let config = form.to_config(order)?;
        self.backend
            .update_chat_tab_config(&tab_id, config.clone())
            .await?;

        let tab = TabSummary::new(&tab_id, &config);
        self.registry.upsert(tab_id.clone(), config);
        self.emit(EngineEvent::TabSaved {
            tab,
            created: false,
        });

        // Re-enter so option changes (e.g. keep_history) take effect
        if self.controller.active_tab() == Some(&tab_id) {
            self.switch_tab(tab_id).await?;
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────
    // Session Messages
    // ─────────────────────────────────────────────────────────

    fn spawn_history_load(&mut self, request: HistoryRequest) {
        let store = self.history.clone();
        let msg_tx = self.msg_tx.clone();

        self.history_task = Some(tokio::spawn(async move {
            let HistoryRequest { session, tab_id } = request;
            let result = store.load(&tab_id).await;
            if msg_tx
                .send(Message::HistoryLoaded {
                    session,
                    tab_id,
                    result,
                })
                .await
                .is_err()
            {
                debug!("History load finished after engine shutdown");
            }
        }));
    }

    fn apply_history(
        &mut self,
        session: SessionToken,
        tab_id: TabId,
        result: Result<Option<Vec<ChatEvent>>>,
    ) {
        if !self.controller.complete_history(session, result) {
            self.emit(EngineEvent::HistoryDiscarded { tab_id, session });
            return;
        }

        self.emit(EngineEvent::HistoryApplied {
            tab_id,
            session,
            outcome: self.controller.history_outcome().clone(),
            message_count: self.controller.messages().len(),
        });
        self.sync_window();
    }

    fn handle_live_event(&mut self, session: SessionToken, event: ChatEvent) {
        if !self.controller.apply_live_event(session, event) {
            return;
        }

        let messages = self.controller.messages();
        if let (Some(tab_id), Some(event)) = (self.controller.active_tab(), messages.last()) {
            self.emit(EngineEvent::MessageAppended {
                tab_id: tab_id.clone(),
                index: messages.len() - 1,
                event: event.clone(),
            });
        }
        self.sync_window();
    }

    /// Events were lost between the backend and the active session
    fn handle_live_lag(&mut self, session: SessionToken, skipped: u64) {
        if self.controller.current_session() != Some(session) {
            return;
        }
        if let Some(tab_id) = self.controller.active_tab() {
            self.emit(EngineEvent::Error {
                message: format!("{} live messages for tab {} were dropped", skipped, tab_id),
                fatal: false,
            });
        }
    }

    fn sync_window(&mut self) {
        if self.window.set_count(self.controller.messages().len()) {
            self.emit_window();
        }
    }

    // ─────────────────────────────────────────────────────────
    // Status
    // ─────────────────────────────────────────────────────────

    fn is_live(&self) -> bool {
        self.status.is_live(
            chrono::Utc::now().timestamp_millis(),
            self.settings.status.stale_after_ms,
        )
    }

    fn emit_status(&mut self) {
        let live = self.is_live();
        self.last_live = Some(live);
        self.emit(EngineEvent::StatusChanged {
            live,
            last_packet_timestamp: self.status.last_packet_timestamp,
            game_version: self.status.game_version.clone(),
        });
    }

    // ─────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────

    /// Leave the active tab and stop background tasks
    pub async fn shutdown(&mut self) {
        if self.controller.active_tab().is_some() {
            if let Err(e) = self.controller.deactivate().await {
                warn!("Failed to clear active tab on shutdown: {}", e);
            }
        }

        self.emit(EngineEvent::Shutdown);
        let _ = self.shutdown_tx.send(true);

        if let Some(handle) = self.history_task.take() {
            handle.abort();
        }
        if let Some(handle) = self.status_task.take() {
            match tokio::time::timeout(Duration::from_secs(2), handle).await {
                Ok(Ok(())) => debug!("Status poller stopped"),
                Ok(Err(e)) => warn!("Status poller panicked: {}", e),
                Err(_) => warn!("Status poller shutdown timed out"),
            }
        }
    }

    fn emit_tabs(&self) {
        let tabs = self
            .registry
            .list()
            .into_iter()
            .map(|(id, config)| TabSummary::new(id, config))
            .collect();
        self.emit(EngineEvent::TabsListed { tabs });
    }

    fn emit_window(&self) {
        self.emit(EngineEvent::WindowChanged {
            count: self.window.count(),
            offset: self.window.offset(),
            range: self.window.visible_range(),
            total_size: self.window.total_size(),
        });
    }

    /// Send an event to all subscribers; having none is fine
    fn emit(&self, event: EngineEvent) {
        trace!("Engine event: {}", event.event_type());
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_backend::LocalBackend;
    use tempfile::tempdir;

    fn test_settings() -> Settings {
        let mut settings = Settings::default();
        settings.status.poll_interval_ms = 0;
        settings
    }

    #[tokio::test]
    async fn test_start_emits_ready() {
        let temp = tempdir().unwrap();
        let backend = Arc::new(LocalBackend::open(temp.path()).await.unwrap());
        let mut engine = Engine::new(backend.clone(), temp.path(), test_settings());
        let mut events = engine.subscribe();

        engine.start().await.unwrap();

        assert!(backend.is_ready());
        assert!(matches!(
            events.recv().await.unwrap(),
            EngineEvent::Ready { tab_count: 0, .. }
        ));
    }

    #[tokio::test]
    async fn test_open_initial_tab_without_tabs_prompts_create() {
        let temp = tempdir().unwrap();
        let backend = Arc::new(LocalBackend::open(temp.path()).await.unwrap());
        let mut engine = Engine::new(backend, temp.path(), test_settings());
        engine.start().await.unwrap();
        let mut events = engine.subscribe();

        engine.process_message(Message::OpenInitialTab).await;
        assert!(matches!(events.recv().await.unwrap(), EngineEvent::CreateTabPrompted));
    }

    #[tokio::test]
    async fn test_switch_to_unknown_tab_reports_not_found() {
        let temp = tempdir().unwrap();
        let backend = Arc::new(LocalBackend::open(temp.path()).await.unwrap());
        let mut engine = Engine::new(backend, temp.path(), test_settings());
        engine.start().await.unwrap();
        let mut events = engine.subscribe();

        engine.process_message(Message::SwitchTab(TabId::from("ghost"))).await;

        match events.recv().await.unwrap() {
            EngineEvent::Error { message, fatal } => {
                assert!(message.contains("ghost"));
                assert!(!fatal);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(engine.controller.active_tab().is_none());
    }

    #[tokio::test]
    async fn test_start_skips_stored_tabs_with_bad_filters() {
        let temp = tempdir().unwrap();
        std::fs::write(
            temp.path().join("tabs.json"),
            r#"{"tabs":[
                {"id":"t1","name":"Broken","options":{"notify":false,"keepHistory":false},
                 "filters":{"or":[{"leaf":{"type":"channel","value":1}}]},"order":0},
                {"id":"t2","name":"Guild","options":{"notify":false,"keepHistory":false},
                 "filters":{"and":[{"or":[{"leaf":{"type":"channel","value":1}}]}]},"order":1}
            ]}"#,
        )
        .unwrap();

        let backend = Arc::new(LocalBackend::open(temp.path()).await.unwrap());
        let mut engine = Engine::new(backend, temp.path(), test_settings());
        let mut events = engine.subscribe();
        engine.start().await.unwrap();

        match events.recv().await.unwrap() {
            EngineEvent::Error { message, fatal } => {
                assert!(message.contains("t1"));
                assert!(message.contains("Invalid filter"));
                assert!(!fatal);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(matches!(
            events.recv().await.unwrap(),
            EngineEvent::Ready { tab_count: 1, .. }
        ));
        assert!(!engine.registry.contains(&TabId::from("t1")));

        engine.process_message(Message::SwitchTab(TabId::from("t1"))).await;
        assert!(engine.controller.active_tab().is_none());

        engine.process_message(Message::OpenInitialTab).await;
        assert_eq!(engine.controller.active_tab(), Some(&TabId::from("t2")));
    }

    #[tokio::test]
    async fn test_notification_forwarded_for_inactive_history_tab() {
        let temp = tempdir().unwrap();
        let backend = Arc::new(LocalBackend::open(temp.path()).await.unwrap());
        let mut engine = Engine::new(backend.clone(), temp.path(), test_settings());
        engine.start().await.unwrap();

        let mut form = TabFormValues::new("Guild");
        form.notification = true;
        form.keep_history = true;
        engine.process_message(Message::CreateTab(form)).await;
        let guild = engine.controller.active_tab().cloned().unwrap();
        engine
            .process_message(Message::CreateTab(TabFormValues::new("Trade")))
            .await;
        assert_ne!(engine.controller.active_tab(), Some(&guild));

        let mut events = engine.subscribe();
        backend
            .deliver(Some(&guild), ChatEvent::new(1, "Bob", "raid at 9"))
            .await
            .unwrap();
        // Guild's history load may still be queued ahead of the notification
        let notification = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                engine.step().await;
                while let Ok(event) = events.try_recv() {
                    if matches!(event, EngineEvent::Notification { .. }) {
                        return event;
                    }
                }
            }
        })
        .await
        .unwrap();

        match notification {
            EngineEvent::Notification {
                tab_id,
                title,
                event,
            } => {
                assert_eq!(tab_id, guild);
                assert_eq!(title, "New chat message in Guild");
                assert_eq!(event.content, "raid at 9");
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(engine.messages().is_empty());
    }

    #[tokio::test]
    async fn test_overflowed_live_stream_reports_dropped_messages() {
        let temp = tempdir().unwrap();
        let backend = Arc::new(LocalBackend::open(temp.path()).await.unwrap());
        let mut engine = Engine::new(backend.clone(), temp.path(), test_settings());
        engine.start().await.unwrap();
        engine
            .process_message(Message::CreateTab(TabFormValues::new("Trade")))
            .await;
        let mut events = engine.subscribe();

        for i in 0..1100 {
            backend
                .deliver(None, ChatEvent::new(i, "Bob", format!("m{i}")))
                .await
                .unwrap();
        }

        let message = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                engine.step().await;
                while let Ok(event) = events.try_recv() {
                    if let EngineEvent::Error { message, fatal } = event {
                        assert!(!fatal);
                        return message;
                    }
                }
            }
        })
        .await
        .unwrap();

        assert!(message.contains("76 live messages"));
    }

    #[tokio::test]
    async fn test_quit_stops_step() {
        let temp = tempdir().unwrap();
        let backend = Arc::new(LocalBackend::open(temp.path()).await.unwrap());
        let mut engine = Engine::new(backend, temp.path(), test_settings());
        engine.msg_sender().send(Message::Quit).await.unwrap();

        assert!(!engine.step().await);
        assert!(engine.should_quit());
    }
}
