//! Persisted tab history
//!
//! One newline-delimited JSON file per tab: `<history_dir>/<tab_id>.jsonl`,
//! one [`ChatEvent`] per line, oldest first.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use chattabs_core::prelude::*;
use chattabs_core::{ChatEvent, TabId};

/// Reads and appends tab history files
#[derive(Debug, Clone)]
pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, tab_id: &TabId) -> PathBuf {
        self.dir.join(format!("{}.jsonl", tab_id))
    }

    /// Load a tab's history in file order.
    ///
    /// Returns `Ok(None)` when the tab has no history file yet. A line that is
    /// not a valid event fails the whole load.
    pub async fn load(&self, tab_id: &TabId) -> Result<Option<Vec<ChatEvent>>> {
        let path = self.path_for(tab_id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No history file for tab {} at {:?}", tab_id, path);
                return Ok(None);
            }
            Err(e) => return Err(Error::history_load(tab_id.as_str(), e.to_string())),
        };

        let events = parse_history(&content)
            .map_err(|(line, e)| Error::history_load(tab_id.as_str(), format!("line {line}: {e}")))?;
        debug!("Loaded {} history events for tab {}", events.len(), tab_id);
        Ok(Some(events))
    }

    /// Append one event to a tab's history, creating the file if needed
    pub async fn append(&self, tab_id: &TabId, event: &ChatEvent) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(tab_id))
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Parse NDJSON history, skipping blank lines.
///
/// On failure returns the 1-based line number with the parse error.
pub fn parse_history(
    content: &str,
) -> std::result::Result<Vec<ChatEvent>, (usize, serde_json::Error)> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| serde_json::from_str(line).map_err(|e| (i + 1, e)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_history_keeps_file_order() {
        let content = concat!(
            r#"{"timestamp":30,"sender_name":"a","content":"first"}"#,
            "\n",
            r#"{"timestamp":10,"sender_name":"b","content":"second"}"#,
            "\n\n",
        );
        let events = parse_history(content).unwrap();
        assert_eq!(events.len(), 2);
        // File order, not timestamp order
        assert_eq!(events[0].content, "first");
        assert_eq!(events[1].content, "second");
    }

    #[test]
    fn test_parse_history_reports_line() {
        let content = concat!(
            r#"{"timestamp":1,"sender_name":"a","content":"ok"}"#,
            "\n",
            "not json\n",
        );
        let (line, _) = parse_history(content).unwrap_err();
        assert_eq!(line, 2);
    }

    #[tokio::test]
    async fn test_load_missing_file_is_none() {
        let temp = tempdir().unwrap();
        let store = HistoryStore::new(temp.path());
        assert!(store.load(&TabId::from("t1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_empty_file_is_some_empty() {
        let temp = tempdir().unwrap();
        let store = HistoryStore::new(temp.path());
        std::fs::write(store.path_for(&TabId::from("t1")), "").unwrap();
        assert_eq!(store.load(&TabId::from("t1")).await.unwrap(), Some(vec![]));
    }

    #[tokio::test]
    async fn test_load_malformed_file_fails() {
        let temp = tempdir().unwrap();
        let store = HistoryStore::new(temp.path());
        std::fs::write(store.path_for(&TabId::from("t1")), "{oops\n").unwrap();
        let err = store.load(&TabId::from("t1")).await.unwrap_err();
        assert!(matches!(err, Error::HistoryLoad { .. }));
        assert!(err.to_string().contains("line 1"));
    }

    #[tokio::test]
    async fn test_append_then_load() {
        let temp = tempdir().unwrap();
        let store = HistoryStore::new(temp.path().join("history"));
        let tab = TabId::from("t1");

        store.append(&tab, &ChatEvent::new(1, "a", "one")).await.unwrap();
        store.append(&tab, &ChatEvent::new(2, "b", "two")).await.unwrap();

        let events = store.load(&tab).await.unwrap().unwrap();
        assert_eq!(
            events,
            vec![ChatEvent::new(1, "a", "one"), ChatEvent::new(2, "b", "two")]
        );
    }
}
