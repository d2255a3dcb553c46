//! Configuration file parsing for chat-tabs
//!
//! Supports:
//! - `<data_dir>/config.toml` - Global settings

pub mod settings;
pub mod types;

pub use settings::{default_data_dir, history_dir, init_data_dir, load_settings, save_settings};
pub use types::*;
