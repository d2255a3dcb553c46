//! chattabs-app - Tab state and orchestration for chat-tabs
//!
//! This crate holds the tab registry, the active tab lifecycle, history and
//! live message reconciliation, the virtualized message window, the backend
//! interface with a file-backed implementation, configuration loading, and
//! the Engine loop that ties them together.

pub mod backend;
pub mod config;
pub mod controller;
pub mod engine;
pub mod engine_event;
pub mod history;
pub mod local_backend;
pub mod message;
pub mod navigation;
pub mod reconciler;
pub mod registry;
pub mod status;
pub mod tab_form;
pub mod virtual_window;

// Re-export primary types
pub use backend::{
    ChatBackend, ChatEventStream, LocalChatBackend, NotificationStream, PushStream, Pushed,
    TabNotification,
};
pub use controller::{ActiveTabController, HistoryOutcome, SessionToken, TabState};
pub use engine::Engine;
pub use engine_event::{EngineEvent, TabSummary};
pub use local_backend::LocalBackend;
pub use message::Message;
pub use reconciler::MessageReconciler;
pub use registry::TabRegistry;
pub use tab_form::TabFormValues;
pub use virtual_window::{SizeEstimate, VirtualItem, VirtualWindow};
