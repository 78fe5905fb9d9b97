//! Incremental synchronization of collection children.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::trace;

use super::AdapterNode;
use crate::host::{identity, ExposedType, HostRef};
use crate::visibility::Visibility;

pub const ITEM_NAME_PREFIX: &str = "Item";

/// Published name of the collection child with identity `id`.
pub fn item_name(id: u64) -> String {
    format!("{ITEM_NAME_PREFIX}{id}")
}

/// Inverse of [`item_name`].
pub fn item_id_from_name(name: &str) -> Option<u64> {
    let digits = name.strip_prefix(ITEM_NAME_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Tracked children of a collection node, keyed by element identity.
pub(crate) struct CollectionSync {
    tracked: HashMap<usize, Arc<AdapterNode>>,
    /// The collection reports changes, so unchanged refreshes skip the diff.
    pub notifies: bool,
    element_type: Option<ExposedType>,
}

impl CollectionSync {
    pub fn new(element_type: Option<ExposedType>) -> Self {
        Self {
            tracked: HashMap::new(),
            notifies: false,
            element_type,
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<AdapterNode>> {
        let id = item_id_from_name(name)?;
        self.tracked
            .values()
            .find(|child| child.collection_id() == Some(id))
            .cloned()
    }

    /// Children in enumeration order.
    pub fn ordered(&self) -> Vec<Arc<AdapterNode>> {
        let mut children: Vec<_> = self.tracked.values().cloned().collect();
        children.sort_by_key(|child| child.position());
        children
    }

    pub fn into_children(self) -> Vec<Arc<AdapterNode>> {
        self.tracked.into_values().collect()
    }

    /// Brings the tracked children in line with `elements` and returns the
    /// children whose element disappeared.
    pub fn diff(
        &mut self,
        owner: &AdapterNode,
        elements: &[Option<HostRef>],
        next_id: &mut u64,
        visibility: Visibility,
    ) -> Vec<Arc<AdapterNode>> {
        let mut present = HashSet::new();
        let mut created = 0usize;
        for element in elements.iter().flatten() {
            let key = identity(element);
            present.insert(key);
            if !self.tracked.contains_key(&key) {
                let id = *next_id;
                *next_id += 1;
                let child =
                    owner.element_child(Arc::clone(element), id, self.element_type, visibility);
                self.tracked.insert(key, child);
                created += 1;
            }
        }

        let vanished: Vec<usize> = self
            .tracked
            .keys()
            .filter(|key| !present.contains(*key))
            .copied()
            .collect();
        let removed: Vec<_> = vanished
            .iter()
            .filter_map(|key| self.tracked.remove(key))
            .collect();

        for (position, element) in elements.iter().flatten().enumerate() {
            if let Some(child) = self.tracked.get(&identity(element)) {
                child.position.store(position, Ordering::Relaxed);
            }
        }

        trace!(
            node = owner.name(),
            created,
            removed = removed.len(),
            tracked = self.tracked.len(),
            "collection synchronized"
        );
        removed
    }
}
