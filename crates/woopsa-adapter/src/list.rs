//! HostList — a ready-made host collection of exposable objects.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock, Weak};

use crate::builder::TypeBuilder;
use crate::description::DeclaringType;
use crate::error::AdapterError;
use crate::host::{ChangeListener, Exposable, ExposedType, HostCollection, HostRef, Subscription};

#[derive(Default)]
struct Listeners {
    next_id: u64,
    map: BTreeMap<u64, ChangeListener>,
}

/// An ordered list of shared host objects.
///
/// An observable list fires its change listeners after every mutation, so
/// adapter nodes only re-scan it when it actually changed. A plain list is
/// re-scanned on every refresh.
pub struct HostList<T> {
    items: RwLock<Vec<Option<Arc<T>>>>,
    listeners: Option<Arc<Mutex<Listeners>>>,
}

impl<T: Exposable> Default for HostList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Exposable> HostList<T> {
    /// A list that does not report changes.
    pub fn new() -> Self {
        Self {
            items: RwLock::new(Vec::new()),
            listeners: None,
        }
    }

    pub fn observable() -> Self {
        Self {
            items: RwLock::new(Vec::new()),
            listeners: Some(Arc::new(Mutex::new(Listeners::default()))),
        }
    }

    pub fn with_items<I>(self, items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Arc<T>>,
    {
        self.write()
            .extend(items.into_iter().map(|item| Some(item.into())));
        self
    }

    pub fn is_observable(&self) -> bool {
        self.listeners.is_some()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Option<Arc<T>>>> {
        self.items.read().expect("host list lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Option<Arc<T>>>> {
        self.items.write().expect("host list lock poisoned")
    }

    fn notify(&self) {
        let Some(listeners) = &self.listeners else {
            return;
        };
        let snapshot: Vec<ChangeListener> = listeners
            .lock()
            .expect("host list listeners poisoned")
            .map
            .values()
            .cloned()
            .collect();
        for listener in snapshot {
            listener();
        }
    }

    pub fn push(&self, item: impl Into<Arc<T>>) -> Arc<T> {
        let item = item.into();
        self.write().push(Some(Arc::clone(&item)));
        self.notify();
        item
    }

    /// Appends a null element. Null elements are never published.
    pub fn push_null(&self) {
        self.write().push(None);
        self.notify();
    }

    pub fn insert(&self, index: usize, item: impl Into<Arc<T>>) -> Arc<T> {
        let item = item.into();
        {
            let mut items = self.write();
            let index = index.min(items.len());
            items.insert(index, Some(Arc::clone(&item)));
        }
        self.notify();
        item
    }

    /// Removes the first occurrence of `item`, compared by identity.
    pub fn remove(&self, item: &Arc<T>) -> bool {
        let removed = {
            let mut items = self.write();
            match items
                .iter()
                .position(|i| i.as_ref().is_some_and(|i| Arc::ptr_eq(i, item)))
            {
                Some(index) => {
                    items.remove(index);
                    true
                }
                None => false,
            }
        };
        if removed {
            self.notify();
        }
        removed
    }

    pub fn remove_at(&self, index: usize) -> Option<Arc<T>> {
        let removed = {
            let mut items = self.write();
            if index >= items.len() {
                return None;
            }
            items.remove(index)
        };
        self.notify();
        removed
    }

    pub fn swap(&self, a: usize, b: usize) {
        {
            let mut items = self.write();
            if a >= items.len() || b >= items.len() {
                return;
            }
            items.swap(a, b);
        }
        self.notify();
    }

    /// Moves the element at `from` to position `to`.
    pub fn move_item(&self, from: usize, to: usize) {
        {
            let mut items = self.write();
            if from >= items.len() || to >= items.len() {
                return;
            }
            let item = items.remove(from);
            items.insert(to, item);
        }
        self.notify();
    }

    pub fn clear(&self) {
        self.write().clear();
        self.notify();
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Arc<T>> {
        self.read().get(index).cloned().flatten()
    }

    pub fn snapshot(&self) -> Vec<Option<Arc<T>>> {
        self.read().clone()
    }
}

impl<T: Exposable> HostCollection for HostList<T> {
    fn elements(&self) -> Vec<Option<HostRef>> {
        self.read()
            .iter()
            .map(|item| item.as_ref().map(|item| Arc::clone(item) as HostRef))
            .collect()
    }

    fn element_type(&self) -> Option<ExposedType> {
        Some(ExposedType::of::<T>())
    }

    fn subscribe(&self, listener: ChangeListener) -> Option<Subscription> {
        let listeners = self.listeners.as_ref()?;
        let id = {
            let mut guard = listeners.lock().expect("host list listeners poisoned");
            let id = guard.next_id;
            guard.next_id += 1;
            guard.map.insert(id, listener);
            id
        };
        let weak: Weak<Mutex<Listeners>> = Arc::downgrade(listeners);
        Some(Subscription::new(move || {
            if let Some(listeners) = weak.upgrade() {
                if let Ok(mut guard) = listeners.lock() {
                    guard.map.remove(&id);
                }
            }
        }))
    }
}

impl<T: Exposable> Exposable for HostList<T> {
    const OBJECT_COLLECTION: bool = true;

    fn describe(t: &mut TypeBuilder<Self>) {
        t.try_property("Count", |list| {
            i64::try_from(list.len()).map_err(|err| AdapterError::host(err.to_string()))
        })
        .declared_on(DeclaringType::ListClass);
    }

    fn as_collection(&self) -> Option<&dyn HostCollection> {
        Some(self)
    }
}
