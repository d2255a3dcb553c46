//! Create/edit tab form values

use chattabs_core::prelude::*;
use chattabs_core::{validate_tab_name, FilterTree, TabConfig, TabOptions};

/// Editable state behind the "new tab" and "edit tab" forms
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabFormValues {
    pub name: String,
    pub notification: bool,
    pub keep_history: bool,
    pub filters: FilterTree,
}

impl TabFormValues {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Pre-fill the form from an existing tab.
    ///
    /// Fails if the stored filter is not in canonical AND-of-ORs form.
    pub fn from_config(config: &TabConfig) -> Result<Self> {
        Ok(Self {
            name: config.name.clone(),
            notification: config.options.notify,
            keep_history: config.options.keep_history,
            filters: FilterTree::from_optional(config.filters.as_ref())?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        validate_tab_name(&self.name)
    }

    /// Validate and convert to a config at tab bar position `order`
    pub fn to_config(&self, order: i64) -> Result<TabConfig> {
        self.validate()?;
        let options = TabOptions {
            notify: self.notification,
            keep_history: self.keep_history,
        };
        Ok(TabConfig::new(self.name.clone(), options, order).with_filters(self.filters.to_wire()))
    }
}
