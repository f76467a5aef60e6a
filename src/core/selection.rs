//! Per-session task selection.
//!
//! Item flags are the only stored state. Category and group "all selected"
//! flags are derived from them on every read, so they cannot drift.

use crate::domain::model::{Catalog, Group, ServiceItem, TaskKey, Toggle};
use crate::utils::error::{QuoteError, Result};
use serde::Serialize;
use std::collections::HashMap;

/// Display state of one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CategoryStatus {
    All,
    Partial { selected: usize, total: usize },
    None,
}

#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    flags: HashMap<TaskKey, bool>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a flag for every catalog item seen for the first time, using its
    /// required flag. Existing flags are kept. Returns how many were added.
    pub fn sync(&mut self, catalog: &Catalog) -> usize {
        let mut added = 0;
        for item in catalog.items() {
            self.flags.entry(item.key()).or_insert_with(|| {
                added += 1;
                item.required
            });
        }
        added
    }

    pub fn is_selected(&self, item: &ServiceItem) -> bool {
        self.flags.get(&item.key()).copied().unwrap_or(item.required)
    }

    pub fn selected_items<'a>(
        &'a self,
        catalog: &'a Catalog,
    ) -> impl Iterator<Item = &'a ServiceItem> + 'a {
        catalog.items().iter().filter(move |item| self.is_selected(item))
    }

    pub fn set_task(&mut self, catalog: &Catalog, key: &TaskKey, selected: bool) -> Result<()> {
        if catalog.find(key).is_none() {
            return Err(QuoteError::InvalidSelectionKey {
                key: key.to_string(),
            });
        }
        self.flags.insert(key.clone(), selected);
        Ok(())
    }

    /// Sets every task of the category. Sibling categories and the group are untouched.
    pub fn set_category(&mut self, catalog: &Catalog, category: &str, selected: bool) -> Result<usize> {
        let keys: Vec<TaskKey> = catalog.items_in_category(category).map(|item| item.key()).collect();
        if keys.is_empty() {
            return Err(QuoteError::InvalidSelectionKey {
                key: category.to_string(),
            });
        }

        let changed = keys.len();
        for key in keys {
            self.flags.insert(key, selected);
        }
        Ok(changed)
    }

    /// Sets every task of the group, which also fixes every category flag under it.
    pub fn set_group(&mut self, catalog: &Catalog, group: Group, selected: bool) -> usize {
        let mut changed = 0;
        for item in catalog.items_in_group(group) {
            self.flags.insert(item.key(), selected);
            changed += 1;
        }
        changed
    }

    pub fn apply(&mut self, catalog: &Catalog, toggle: &Toggle) -> Result<()> {
        match toggle {
            Toggle::Group { group, selected } => {
                let changed = self.set_group(catalog, *group, *selected);
                tracing::debug!("Group {} set to {} ({} tasks)", group, selected, changed);
            }
            Toggle::Category { category, selected } => {
                let changed = self.set_category(catalog, category, *selected)?;
                tracing::debug!("Category {} set to {} ({} tasks)", category, selected, changed);
            }
            Toggle::Task {
                category,
                task,
                selected,
            } => {
                let key = catalog
                    .find_task(category, task)
                    .map(|item| item.key())
                    .ok_or_else(|| QuoteError::InvalidSelectionKey {
                        key: format!("{}/{}", category, task),
                    })?;
                self.set_task(catalog, &key, *selected)?;
            }
        }
        Ok(())
    }

    pub fn category_status(&self, catalog: &Catalog, category: &str) -> CategoryStatus {
        let mut total = 0;
        let mut selected = 0;
        for item in catalog.items_in_category(category) {
            total += 1;
            if self.is_selected(item) {
                selected += 1;
            }
        }

        match selected {
            0 => CategoryStatus::None,
            n if n == total => CategoryStatus::All,
            n => CategoryStatus::Partial { selected: n, total },
        }
    }

    pub fn category_all_selected(&self, catalog: &Catalog, category: &str) -> bool {
        self.category_status(catalog, category) == CategoryStatus::All
    }

    /// True iff the group has categories and each of them is fully selected.
    pub fn group_all_selected(&self, catalog: &Catalog, group: Group) -> bool {
        let categories = catalog.categories_in_group(group);
        !categories.is_empty()
            && categories
                .iter()
                .all(|category| self.category_all_selected(catalog, category))
    }
}
