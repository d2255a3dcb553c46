//! # chattabs-core - Core Domain Types
//!
//! Foundation crate for chat-tabs. Provides domain types, the tab filter
//! model, error handling and logging setup.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, thiserror, tracing).
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`TabId`] - Opaque backend-assigned tab identifier
//! - [`TabConfig`], [`TabOptions`] - A named, ordered tab and its switches
//! - [`ChatEvent`], [`ChatObject`] - A chat message and its linked items
//! - [`GlobalConfig`] - Backend configuration read by the client
//!
//! ### Filters (`filter`)
//! - [`FilterNode`] - Recursive wire form of a tab filter
//! - [`FilterLeaf`] - Channel, player, word or item predicate
//! - [`FilterTree`] - Canonical AND-of-ORs editor model
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use chattabs_core::prelude::*;
//! ```

pub mod error;
pub mod filter;
pub mod logging;
pub mod prelude;
pub mod types;

// Re-export commonly used types at crate root for convenience
pub use error::{Error, Result, ResultExt};
pub use filter::{
    FilterGroup, FilterKind, FilterLeaf, FilterNode, FilterTree, GroupStyle, GROUP_CAPACITY,
    GROUP_PALETTE,
};
pub use types::{
    validate_tab_name, ChatEvent, ChatEventKey, ChatObject, GameVersion, GlobalConfig, TabConfig,
    TabId, TabOptions, TAB_NAME_MAX_LEN, TAB_NAME_MIN_LEN,
};
