//! Headless command scripts driven through the engine
//!
//! Feeds parsed stdin commands to an engine over a temporary data directory
//! and checks the NDJSON events a headless run would print.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::broadcast;

use chat_tabs::headless::runner::{parse_command, Command};
use chat_tabs::headless::HeadlessEvent;
use chattabs_app::config::{init_data_dir, load_settings};
use chattabs_app::{Engine, EngineEvent, LocalBackend};

struct Session {
    _temp: TempDir,
    backend: Arc<LocalBackend>,
    engine: Engine<LocalBackend>,
    events: broadcast::Receiver<EngineEvent>,
}

impl Session {
    async fn start() -> Self {
        let temp = tempfile::tempdir().unwrap();
        init_data_dir(temp.path()).unwrap();
        let mut settings = load_settings(temp.path());
        settings.status.poll_interval_ms = 0;

        let backend = Arc::new(LocalBackend::open(temp.path()).await.unwrap());
        let mut engine = Engine::new(backend.clone(), temp.path(), settings);
        let events = engine.subscribe();
        engine.start().await.unwrap();

        Self {
            _temp: temp,
            backend,
            engine,
            events,
        }
    }

    /// Run one stdin line to completion and return the printed events
    async fn send(&mut self, line: &str) -> Vec<Value> {
        match parse_command(line).expect("not blank").expect("valid command") {
            Command::Engine(msg) => self.engine.process_message(msg).await,
            Command::Deliver(event) => {
                self.backend.deliver(None, event).await.unwrap();
                // The active tab gets the live event and a notification
                for _ in 0..2 {
                    tokio::time::timeout(Duration::from_secs(5), self.engine.step())
                        .await
                        .expect("live event not processed");
                }
            }
        }
        self.output()
    }

    /// Process one background result (e.g. a history load)
    async fn settle(&mut self) -> Vec<Value> {
        tokio::time::timeout(Duration::from_secs(5), self.engine.step())
            .await
            .expect("nothing to process");
        self.output()
    }

    fn output(&mut self) -> Vec<Value> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(serde_json::to_value(HeadlessEvent::from(event)).unwrap());
        }
        out
    }
}

fn names(events: &[Value]) -> Vec<&str> {
    events
        .iter()
        .map(|e| e["event"].as_str().unwrap_or_default())
        .collect()
}

#[tokio::test]
async fn test_first_run_prompts_for_a_tab() {
    let mut session = Session::start().await;
    let ready = session.output();
    assert_eq!(names(&ready), vec!["ready"]);
    assert_eq!(ready[0]["tab_count"], 0);

    let out = session.send("open").await;
    assert_eq!(names(&out), vec!["create_tab_prompted"]);
}

#[tokio::test]
async fn test_create_tab_then_receive_messages() {
    let mut session = Session::start().await;
    session.output();

    let out = session
        .send(r#"new {"name":"Alliance","filters":{"and":[{"or":[{"leaf":{"type":"channel","value":3}}]}]}}"#)
        .await;
    let saved = out.iter().find(|e| e["event"] == "tab_saved").unwrap();
    assert_eq!(saved["created"], true);
    assert_eq!(saved["tab"]["order"], 0);
    assert!(names(&out).contains(&"tab_activated"));

    let out = session
        .send(r#"event {"timestamp":1,"sender_name":"Bob","content":"hello"}"#)
        .await;
    let message = out.iter().find(|e| e["event"] == "message").unwrap();
    assert_eq!(message["index"], 0);
    assert_eq!(message["message"]["content"], "hello");

    let note = out.iter().find(|e| e["event"] == "notification").unwrap();
    assert_eq!(note["title"], "New chat message in Alliance");

    let window = out.iter().find(|e| e["event"] == "window").unwrap();
    assert_eq!(window["count"], 1);
    assert_eq!(window["range"], serde_json::json!([0, 0]));
}

#[tokio::test]
async fn test_history_tab_reports_outcome() {
    let mut session = Session::start().await;
    session
        .send(r#"new {"name":"Guild","keepHistory":true}"#)
        .await;

    let out = session.settle().await;
    let history = out.iter().find(|e| e["event"] == "history").unwrap();
    assert_eq!(history["outcome"]["kind"], "missing");
    assert_eq!(history["message_count"], 0);
}

#[tokio::test]
async fn test_switch_to_unknown_tab_is_an_error() {
    let mut session = Session::start().await;
    session.output();

    let out = session.send("switch nope").await;
    assert_eq!(names(&out), vec!["error"]);
    assert_eq!(out[0]["fatal"], false);
}

#[tokio::test]
async fn test_tabs_listed_in_order() {
    let mut session = Session::start().await;
    session.send(r#"new {"name":"Guild"}"#).await;
    session.send(r#"new {"name":"Trade"}"#).await;

    let out = session.send("tabs").await;
    let tabs = out[0]["tabs"].as_array().unwrap();
    let listed: Vec<_> = tabs.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(listed, vec!["Guild", "Trade"]);
}
