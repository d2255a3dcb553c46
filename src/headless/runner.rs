//! Headless mode runner - engine loop driven by stdin commands
//!
//! Commands, one per line:
//!
//! ```text
//! tabs                    list tabs
//! open [id]               open the initial tab, or a specific one
//! switch <id>             enter a tab
//! close                   leave the active tab
//! new <json>              create a tab from form values
//! edit <id> <json>        replace a tab's config from form values
//! event <json>            inject a captured chat event for the active tab
//! scroll <offset>         scroll the message list
//! viewport <size>         resize the message list viewport
//! status                  report connection status
//! quit                    stop
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc};

use chattabs_app::config::{init_data_dir, load_settings};
use chattabs_app::{Engine, EngineEvent, LocalBackend, Message, TabFormValues};
use chattabs_core::prelude::*;
use chattabs_core::{ChatEvent, FilterNode, FilterTree, TabId};

use super::HeadlessEvent;

/// A parsed stdin command
#[derive(Debug)]
pub enum Command {
    /// Forward to the engine
    Engine(Message),
    /// Route a captured chat event through the backend
    Deliver(ChatEvent),
}

/// Form values as accepted on stdin
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FormInput {
    name: String,
    #[serde(default)]
    notification: bool,
    #[serde(default)]
    keep_history: bool,
    #[serde(default)]
    filters: Option<FilterNode>,
}

impl FormInput {
    fn into_form(self) -> Result<TabFormValues> {
        Ok(TabFormValues {
            name: self.name,
            notification: self.notification,
            keep_history: self.keep_history,
            filters: FilterTree::from_optional(self.filters.as_ref())?,
        })
    }
}

fn parse_form(json: &str) -> Result<TabFormValues> {
    serde_json::from_str::<FormInput>(json)?.into_form()
}

/// Parse one stdin line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Option<std::result::Result<Command, String>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match (verb, rest) {
        ("tabs", "") => Ok(Command::Engine(Message::ListTabs)),
        ("open", "") => Ok(Command::Engine(Message::OpenInitialTab)),
        ("open" | "switch", id) if !id.is_empty() => {
            Ok(Command::Engine(Message::SwitchTab(TabId::from(id))))
        }
        ("close", "") => Ok(Command::Engine(Message::CloseTab)),
        ("new", json) => parse_form(json)
            .map(|form| Command::Engine(Message::CreateTab(form)))
            .map_err(|e| format!("invalid tab form: {e}")),
        ("edit", args) => match args.split_once(char::is_whitespace) {
            Some((id, json)) => parse_form(json.trim())
                .map(|form| {
                    Command::Engine(Message::UpdateTab {
                        tab_id: TabId::from(id),
                        form,
                    })
                })
                .map_err(|e| format!("invalid tab form: {e}")),
            None => Err("usage: edit <id> <json>".to_string()),
        },
        ("event", json) => serde_json::from_str::<ChatEvent>(json)
            .map(Command::Deliver)
            .map_err(|e| format!("invalid chat event: {e}")),
        ("scroll", offset) => offset
            .parse()
            .map(|offset| Command::Engine(Message::ScrollTo(offset)))
            .map_err(|_| format!("invalid scroll offset: {offset}")),
        ("viewport", size) => size
            .parse()
            .map(|size| Command::Engine(Message::ResizeViewport(size)))
            .map_err(|_| format!("invalid viewport size: {size}")),
        ("status", "") => Ok(Command::Engine(Message::RequestStatus)),
        ("q" | "quit", "") => Ok(Command::Engine(Message::Quit)),
        _ => Err(format!("unknown command: {line}")),
    };
    Some(command)
}

/// Run in headless mode against the local backend in `data_dir`
pub async fn run_headless(data_dir: &Path) -> Result<()> {
    info!("═══════════════════════════════════════════════════════");
    info!("chat-tabs starting in HEADLESS mode");
    info!("Data directory: {}", data_dir.display());
    info!("═══════════════════════════════════════════════════════");

    if let Err(e) = init_data_dir(data_dir) {
        warn!("Failed to initialize data directory: {}", e);
    }
    let settings = load_settings(data_dir);

    let backend = Arc::new(
        LocalBackend::open(data_dir)
            .await
            .context("Failed to open local backend")?,
    );
    let mut engine = Engine::new(backend.clone(), data_dir, settings);

    let printer = tokio::spawn(print_events(engine.subscribe()));

    if let Err(e) = engine.start().await {
        error!("Startup failed: {}", e);
        HeadlessEvent::error(format!("Startup failed: {}", e), true).emit();
        engine.shutdown().await;
        let _ = printer.await;
        return Err(e);
    }

    let msg_tx = engine.msg_sender();
    tokio::spawn(read_commands(msg_tx.clone(), backend));
    msg_tx
        .send(Message::OpenInitialTab)
        .await
        .map_err(|_| Error::ChannelClosed)?;

    engine.run().await;
    let _ = printer.await;

    info!("chat-tabs headless mode exiting");
    Ok(())
}

/// Print engine events as NDJSON until the engine shuts down
async fn print_events(mut events: broadcast::Receiver<EngineEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                let done = matches!(event, EngineEvent::Shutdown);
                HeadlessEvent::from(event).emit();
                if done {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Headless output lagged, {} events dropped", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Read stdin commands until EOF or `quit`
async fn read_commands(msg_tx: mpsc::Sender<Message>, backend: Arc<LocalBackend>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("Stdin closed");
                let _ = msg_tx.send(Message::Quit).await;
                break;
            }
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                let _ = msg_tx.send(Message::Quit).await;
                break;
            }
        };

        match parse_command(&line) {
            None => {}
            Some(Ok(Command::Deliver(event))) => {
                if let Err(e) = backend.deliver(None, event).await {
                    HeadlessEvent::error(e.to_string(), false).emit();
                }
            }
            Some(Ok(Command::Engine(msg))) => {
                let quit = matches!(msg, Message::Quit);
                if msg_tx.send(msg).await.is_err() || quit {
                    break;
                }
            }
            Some(Err(reason)) => {
                warn!("Stdin: {}", reason);
                HeadlessEvent::error(reason, false).emit();
            }
        }
    }

    info!("Stdin reader exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chattabs_core::FilterLeaf;

    fn parse(line: &str) -> Command {
        parse_command(line).unwrap().unwrap()
    }

    #[test]
    fn test_blank_line_is_ignored() {
        assert!(parse_command("   ").is_none());
    }

    #[test]
    fn test_navigation_commands() {
        assert!(matches!(parse("tabs"), Command::Engine(Message::ListTabs)));
        assert!(matches!(parse("open"), Command::Engine(Message::OpenInitialTab)));
        assert!(matches!(
            parse("open abc"),
            Command::Engine(Message::SwitchTab(id)) if id.as_str() == "abc"
        ));
        assert!(matches!(
            parse("switch  t2 "),
            Command::Engine(Message::SwitchTab(id)) if id.as_str() == "t2"
        ));
        assert!(matches!(parse("close"), Command::Engine(Message::CloseTab)));
        assert!(matches!(parse("quit"), Command::Engine(Message::Quit)));
    }

    #[test]
    fn test_new_tab_form() {
        let cmd = parse(
            r#"new {"name":"Alliance","keepHistory":true,"filters":{"and":[{"or":[{"leaf":{"type":"channel","value":3}}]}]}}"#,
        );
        match cmd {
            Command::Engine(Message::CreateTab(form)) => {
                assert_eq!(form.name, "Alliance");
                assert!(form.keep_history);
                assert!(!form.notification);
                assert_eq!(form.filters.groups()[0].leaves(), &[FilterLeaf::Channel(3)]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_new_tab_rejects_non_canonical_filter() {
        let result =
            parse_command(r#"new {"name":"Broken","filters":{"or":[]}}"#).unwrap();
        assert!(result.unwrap_err().contains("invalid tab form"));
    }

    #[test]
    fn test_edit_command() {
        match parse(r#"edit t1 {"name":"Guild"}"#) {
            Command::Engine(Message::UpdateTab { tab_id, form }) => {
                assert_eq!(tab_id.as_str(), "t1");
                assert_eq!(form.name, "Guild");
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(parse_command("edit t1").unwrap().is_err());
    }

    #[test]
    fn test_event_command() {
        match parse(r#"event {"timestamp":5,"sender_name":"Bob","content":"hi"}"#) {
            Command::Deliver(event) => {
                assert_eq!(event.timestamp, 5);
                assert_eq!(event.sender_name, "Bob");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_scroll_and_viewport() {
        assert!(matches!(parse("scroll 120"), Command::Engine(Message::ScrollTo(120))));
        assert!(matches!(
            parse("viewport 300"),
            Command::Engine(Message::ResizeViewport(300))
        ));
        assert!(parse_command("scroll up").unwrap().is_err());
    }

    #[test]
    fn test_unknown_command() {
        assert!(parse_command("reload").unwrap().is_err());
        assert!(parse_command("tabs extra").unwrap().is_err());
    }
}
