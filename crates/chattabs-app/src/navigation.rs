//! Which tab to open when the client starts

use chattabs_core::TabId;

use crate::registry::TabRegistry;

/// Where the client lands on startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitialTab {
    Open(TabId),
    /// No tabs yet: go straight to the "new tab" form
    CreateNew,
}

/// Prefer the last open tab if it still exists, else the first listed tab
pub fn resolve_initial_tab(registry: &TabRegistry, last_open: Option<TabId>) -> InitialTab {
    if let Some(id) = last_open.filter(|id| registry.contains(id)) {
        return InitialTab::Open(id);
    }
    match registry.first() {
        Some(id) => InitialTab::Open(id.clone()),
        None => InitialTab::CreateNew,
    }
}
