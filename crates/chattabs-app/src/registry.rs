//! Registry of configured chat tabs

use std::collections::HashMap;

use chattabs_core::prelude::*;
use chattabs_core::{TabConfig, TabId};

/// All known tabs, keyed by backend-assigned id
#[derive(Debug, Default)]
pub struct TabRegistry {
    /// Tab configs indexed by id
    tabs: HashMap<TabId, TabConfig>,

    /// Ids in first-insertion order (tie-breaker for equal `order`)
    insertion: Vec<TabId>,
}

impl TabRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole registry with the backend's tab list
    pub fn replace_all(&mut self, entries: Vec<(TabId, TabConfig)>) {
        self.tabs.clear();
        self.insertion.clear();
        for (id, config) in entries {
            self.upsert(id, config);
        }
    }

    /// Insert or wholly replace the config for `id`.
    ///
    /// A replaced tab keeps its original insertion position. Returns the
    /// previous config, if any.
    pub fn upsert(&mut self, id: TabId, config: TabConfig) -> Option<TabConfig> {
        let previous = self.tabs.insert(id.clone(), config);
        if previous.is_none() {
            self.insertion.push(id);
        }
        previous
    }

    pub fn get(&self, id: &TabId) -> Option<&TabConfig> {
        self.tabs.get(id)
    }

    /// Like [`TabRegistry::get`], but an unknown id is a not-found error
    pub fn require(&self, id: &TabId) -> Result<&TabConfig> {
        self.tabs
            .get(id)
            .ok_or_else(|| Error::tab_not_found(id.as_str()))
    }

    pub fn contains(&self, id: &TabId) -> bool {
        self.tabs.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Tabs sorted by `order`, ties broken by insertion order
    pub fn list(&self) -> Vec<(&TabId, &TabConfig)> {
        let mut entries: Vec<(&TabId, &TabConfig)> = self
            .insertion
            .iter()
            .filter_map(|id| self.tabs.get(id).map(|config| (id, config)))
            .collect();
        // Stable sort keeps insertion order among equal `order`s
        entries.sort_by_key(|(_, config)| config.order);
        entries
    }

    /// First tab in display order
    pub fn first(&self) -> Option<&TabId> {
        self.list().first().map(|(id, _)| *id)
    }

    /// `order` assigned to a newly created tab (the current tab count)
    pub fn next_order(&self) -> i64 {
        self.tabs.len() as i64
    }

    /// Tab names in display order
    pub fn tab_titles(&self) -> Vec<String> {
        self.list()
            .into_iter()
            .map(|(_, config)| config.name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chattabs_core::TabOptions;

    fn tab(name: &str, order: i64) -> TabConfig {
        TabConfig::new(name, TabOptions::default(), order)
    }

    #[test]
    fn test_list_sorted_by_order() {
        let mut registry = TabRegistry::new();
        registry.upsert(TabId::from("c"), tab("Trade", 2));
        registry.upsert(TabId::from("a"), tab("Guild", 0));
        registry.upsert(TabId::from("b"), tab("Alliance", 1));

        assert_eq!(registry.tab_titles(), vec!["Guild", "Alliance", "Trade"]);
        assert_eq!(registry.first(), Some(&TabId::from("a")));
    }

    #[test]
    fn test_ties_broken_by_insertion_order() {
        let mut registry = TabRegistry::new();
        registry.upsert(TabId::from("z"), tab("First", 1));
        registry.upsert(TabId::from("a"), tab("Second", 1));
        registry.upsert(TabId::from("m"), tab("Zero", 0));

        assert_eq!(registry.tab_titles(), vec!["Zero", "First", "Second"]);
    }

    #[test]
    fn test_upsert_replaces_whole_config_in_place() {
        let mut registry = TabRegistry::new();
        registry.upsert(TabId::from("a"), tab("Guild", 0));
        registry.upsert(TabId::from("b"), tab("Trade", 0));

        let previous = registry.upsert(TabId::from("a"), tab("Guild 2", 0));
        assert_eq!(previous.unwrap().name, "Guild");
        assert_eq!(registry.len(), 2);
        // Still ahead of "b" on the tie
        assert_eq!(registry.tab_titles(), vec!["Guild 2", "Trade"]);
    }

    #[test]
    fn test_require_unknown_is_not_found() {
        let registry = TabRegistry::new();
        let err = registry.require(&TabId::from("ghost")).unwrap_err();
        assert!(matches!(err, Error::TabNotFound { ref tab_id } if tab_id == "ghost"));
    }

    #[test]
    fn test_replace_all_resets() {
        let mut registry = TabRegistry::new();
        registry.upsert(TabId::from("old"), tab("Old", 0));
        registry.replace_all(vec![
            (TabId::from("a"), tab("Guild", 0)),
            (TabId::from("b"), tab("Trade", 1)),
        ]);

        assert!(!registry.contains(&TabId::from("old")));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.next_order(), 2);
    }

    #[test]
    fn test_empty_registry() {
        let registry = TabRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.first().is_none());
        assert_eq!(registry.next_order(), 0);
    }
}
