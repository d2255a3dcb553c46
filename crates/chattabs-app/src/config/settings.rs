//! Settings parser for `<data_dir>/config.toml`

use std::path::{Path, PathBuf};

use chattabs_core::prelude::*;

use super::types::Settings;

const CONFIG_FILENAME: &str = "config.toml";
const HISTORY_DIR: &str = "history";
const APP_DIR: &str = "chat-tabs";

/// Default data directory (`~/.local/share/chat-tabs` on Linux)
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Directory holding one `<tab_id>.jsonl` file per persistent tab
pub fn history_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(HISTORY_DIR)
}

/// Load settings from `config.toml`, falling back to defaults
pub fn load_settings(data_dir: &Path) -> Settings {
    let config_path = data_dir.join(CONFIG_FILENAME);

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

/// Save settings to `config.toml`
pub fn save_settings(data_dir: &Path, settings: &Settings) -> Result<()> {
    if !data_dir.exists() {
        std::fs::create_dir_all(data_dir)
            .map_err(|e| Error::config(format!("Failed to create data dir: {}", e)))?;
    }

    let config_path = data_dir.join(CONFIG_FILENAME);
    let temp_path = data_dir.join(".config.toml.tmp");

    let content = toml::to_string_pretty(settings)
        .map_err(|e| Error::config(format!("Failed to serialize settings: {}", e)))?;
    let full_content = format!("{}{}", generate_config_header(), content);

    // Atomic write: write to temp, then rename
    std::fs::write(&temp_path, &full_content)
        .map_err(|e| Error::config(format!("Failed to write temp file: {}", e)))?;
    std::fs::rename(&temp_path, &config_path)
        .map_err(|e| Error::config(format!("Failed to rename temp file: {}", e)))?;

    info!("Saved settings to {:?}", config_path);
    Ok(())
}

/// Create the data directory layout and a default `config.toml`
pub fn init_data_dir(data_dir: &Path) -> Result<()> {
    let history = history_dir(data_dir);
    if !history.exists() {
        std::fs::create_dir_all(&history)
            .map_err(|e| Error::config(format!("Failed to create history dir: {}", e)))?;
        info!("Created data directory at {:?}", data_dir);
    }

    let config_path = data_dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        std::fs::write(&config_path, generate_default_config())
            .map_err(|e| Error::config(format!("Failed to write config.toml: {}", e)))?;
        info!("Created default config.toml");
    }

    Ok(())
}

fn generate_config_header() -> String {
    r#"# chat-tabs configuration
# Generated by chat-tabs

"#
    .to_string()
}

fn generate_default_config() -> String {
    r#"# chat-tabs configuration

[view]
item_estimate = 80        # Estimated row height before measurement
measure_items = false     # Cache real row heights once rendered
overscan = 5              # Rows rendered beyond each viewport edge
scroll_padding_end = 80
viewport = 600

[history]
dedupe_live_events = false  # Drop repeated (timestamp, sender, content) events

[status]
poll_interval_ms = 2000
stale_after_ms = 10000
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_settings_missing_file_uses_defaults() {
        let temp = tempdir().unwrap();
        assert_eq!(load_settings(temp.path()), Settings::default());
    }

    #[test]
    fn test_load_settings_invalid_toml_uses_defaults() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join(CONFIG_FILENAME), "[view\nbroken").unwrap();
        assert_eq!(load_settings(temp.path()), Settings::default());
    }

    #[test]
    fn test_init_data_dir_creates_layout() {
        let temp = tempdir().unwrap();
        let data_dir = temp.path().join("chat");
        init_data_dir(&data_dir).unwrap();

        assert!(history_dir(&data_dir).is_dir());
        assert!(data_dir.join(CONFIG_FILENAME).is_file());
        assert_eq!(load_settings(&data_dir), Settings::default());
    }

    #[test]
    fn test_save_and_load_settings() {
        let temp = tempdir().unwrap();
        let mut settings = Settings::default();
        settings.view.measure_items = true;
        settings.history.dedupe_live_events = true;

        save_settings(temp.path(), &settings).unwrap();
        assert_eq!(load_settings(temp.path()), settings);
        assert!(!temp.path().join(".config.toml.tmp").exists());
    }
}
