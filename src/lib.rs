//! chat-tabs Library
//!
//! Frontend runners for the chat-tabs engine.

pub mod headless;

// Re-export main entry points
pub use headless::runner::run_headless;
