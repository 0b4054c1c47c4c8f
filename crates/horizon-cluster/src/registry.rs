//! The clusterable item set.
//!
//! Hosts translate their declarative child list into [`ItemRegistry::upsert`]
//! and [`ItemRegistry::remove`] calls keyed by a caller-assigned stable id.
//! Snapshots keep the relative order of ids that did not change, which lets
//! downstream marker reconciliation reuse visual instances.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::geo::LatLng;

/// A clusterable point with caller-owned payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item<D> {
    pub id: String,
    pub position: LatLng,
    pub data: D,
}

impl<D> Item<D> {
    pub fn new(id: impl Into<String>, position: LatLng, data: D) -> Self {
        Self {
            id: id.into(),
            position,
            data,
        }
    }
}

/// Insertion-ordered item storage with last-write-wins upserts.
#[derive(Debug)]
pub struct ItemRegistry<D> {
    items: Vec<Item<D>>,
    index: HashMap<String, usize>,
    snapshot: Option<Arc<[Item<D>]>>,
    revision: u64,
}

impl<D: Clone> ItemRegistry<D> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
            snapshot: None,
            revision: 0,
        }
    }

    /// Insert an item or overwrite the one with the same id.
    ///
    /// An overwritten item keeps its slot. Returns `true` if the id was new.
    pub fn upsert(&mut self, id: impl Into<String>, position: LatLng, data: D) -> bool {
        let id = id.into();
        self.touch();
        match self.index.get(&id) {
            Some(&slot) => {
                let item = &mut self.items[slot];
                item.position = position;
                item.data = data;
                false
            }
            None => {
                self.index.insert(id.clone(), self.items.len());
                self.items.push(Item { id, position, data });
                true
            }
        }
    }

    /// Remove an item immediately, returning it if it was present.
    pub fn remove(&mut self, id: &str) -> Option<Item<D>> {
        let slot = self.index.remove(id)?;
        self.touch();
        let item = self.items.remove(slot);
        for later in &self.items[slot..] {
            if let Some(entry) = self.index.get_mut(&later.id) {
                *entry -= 1;
            }
        }
        Some(item)
    }

    /// Remove every item.
    pub fn clear(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.touch();
        self.items.clear();
        self.index.clear();
    }

    pub fn get(&self, id: &str) -> Option<&Item<D>> {
        self.index.get(id).map(|&slot| &self.items[slot])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Monotonic counter bumped by every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// An immutable view of the current items.
    ///
    /// The view is cached until the next mutation, so repeated calls between
    /// mutations return the same allocation.
    pub fn snapshot(&mut self) -> Arc<[Item<D>]> {
        if let Some(snapshot) = &self.snapshot {
            return snapshot.clone();
        }
        let snapshot: Arc<[Item<D>]> = self.items.iter().cloned().collect();
        self.snapshot = Some(snapshot.clone());
        snapshot
    }

    fn touch(&mut self) {
        self.revision += 1;
        self.snapshot = None;
    }
}

impl<D: Clone> Default for ItemRegistry<D> {
    fn default() -> Self {
        Self::new()
    }
}
