//! Read-only catalog snapshot with secondary indices.
//!
//! Rankers work against a `Catalog` built once per request from the item
//! store, so they stay pure functions over in-memory data:
//! - primary index: items by id
//! - secondary indices: item ids by category and by tag

use rayon::prelude::*;
use std::collections::HashMap;

use crate::types::{Category, Item, ItemId};

/// Main structure holding a catalog view for ranking.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub(crate) items: HashMap<ItemId, Item>,

    /// Items grouped by category
    pub(crate) category_index: HashMap<Category, Vec<ItemId>>,
    /// Items grouped by tag (one item can appear in several tag lists)
    pub(crate) tag_index: HashMap<String, Vec<ItemId>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from a list of items, indices included.
    pub fn from_items(items: Vec<Item>) -> Self {
        let mut catalog = Catalog::new();
        for item in items {
            catalog.insert_item(item);
        }
        catalog.build_secondary_indices();
        catalog
    }

    pub fn get_item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    /// All items as a parallel iterator, for full-catalog scans.
    pub fn par_items(&self) -> impl ParallelIterator<Item = &Item> {
        self.items.par_iter().map(|(_, item)| item)
    }

    /// All item ids, ascending
    pub fn all_item_ids(&self) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = self.items.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn items_in_category(&self, category: Category) -> &[ItemId] {
        self.category_index
            .get(&category)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn items_with_tag(&self, tag: &str) -> &[ItemId] {
        self.tag_index
            .get(tag)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Insert an item. Call [`Catalog::build_secondary_indices`] afterwards.
    pub fn insert_item(&mut self, item: Item) {
        self.items.insert(item.id, item);
    }

    /// Rebuild the category and tag indices from the primary index
    pub fn build_secondary_indices(&mut self) {
        self.category_index.clear();
        self.tag_index.clear();

        for (item_id, item) in &self.items {
            self.category_index
                .entry(item.category)
                .or_default()
                .push(*item_id);

            for tag in &item.tags {
                self.tag_index.entry(tag.clone()).or_default().push(*item_id);
            }
        }

        // keep index order independent of hash order
        for ids in self.category_index.values_mut() {
            ids.sort_unstable();
        }
        for ids in self.tag_index.values_mut() {
            ids.sort_unstable();
        }
    }
}
