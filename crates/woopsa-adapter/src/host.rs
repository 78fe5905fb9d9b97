//! Host object registration.
//!
//! Host types opt in by implementing [`Exposable`], which lists their
//! published members on a [`TypeBuilder`]. The adapter only sees the
//! object-safe [`HostObject`] view, shared as a [`HostRef`].

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::builder::{collect_members, TypeBuilder, TypeMembers};
use crate::native::short_type_name;
use crate::visibility::Visibility;

pub trait Exposable: Any + Send + Sync + Sized {
    /// Set when the type is an iterable collection of objects.
    const OBJECT_COLLECTION: bool = false;

    fn describe(t: &mut TypeBuilder<Self>);

    /// Type-level visibility, replacing the adapter default for instances
    /// of this type.
    fn visibility() -> Option<Visibility> {
        None
    }

    fn as_collection(&self) -> Option<&dyn HostCollection> {
        None
    }
}

/// Object-safe view of an [`Exposable`].
pub trait HostObject: Any + Send + Sync {
    fn exposed_type(&self) -> ExposedType;
    fn as_any(&self) -> &dyn Any;
    fn host_collection(&self) -> Option<&dyn HostCollection>;
}

impl<T: Exposable> HostObject for T {
    fn exposed_type(&self) -> ExposedType {
        ExposedType::of::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn host_collection(&self) -> Option<&dyn HostCollection> {
        <T as Exposable>::as_collection(self)
    }
}

pub type HostRef = Arc<dyn HostObject>;

pub fn host<T: Exposable>(value: T) -> HostRef {
    Arc::new(value)
}

/// Identity of a host object: the address of its allocation.
pub(crate) fn identity(target: &HostRef) -> usize {
    Arc::as_ptr(target) as *const () as usize
}

pub(crate) fn same_target(a: &Option<HostRef>, b: &Option<HostRef>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => identity(a) == identity(b),
        _ => false,
    }
}

/// Runtime handle on an [`Exposable`] type.
#[derive(Clone, Copy)]
pub struct ExposedType {
    id: TypeId,
    name: &'static str,
    object_collection: bool,
    members: fn() -> TypeMembers,
    visibility: fn() -> Option<Visibility>,
}

impl ExposedType {
    pub fn of<T: Exposable>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: short_type_name(std::any::type_name::<T>()),
            object_collection: T::OBJECT_COLLECTION,
            members: collect_members::<T>,
            visibility: T::visibility,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_object_collection(&self) -> bool {
        self.object_collection
    }

    pub fn visibility(&self) -> Option<Visibility> {
        (self.visibility)()
    }

    pub(crate) fn members(&self) -> TypeMembers {
        (self.members)()
    }
}

impl PartialEq for ExposedType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ExposedType {}

impl Hash for ExposedType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ExposedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExposedType({})", self.name)
    }
}

pub type ChangeListener = Arc<dyn Fn() + Send + Sync>;

/// An iterable collection of host objects.
pub trait HostCollection: Send + Sync {
    /// Current elements in enumeration order; `None` is a null element.
    fn elements(&self) -> Vec<Option<HostRef>>;

    /// Declared type of the elements, if known.
    fn element_type(&self) -> Option<ExposedType> {
        None
    }

    /// Registers a change listener. Returns `None` when the collection
    /// cannot report changes.
    fn subscribe(&self, _listener: ChangeListener) -> Option<Subscription> {
        None
    }
}

/// Cancellation handle for a change listener; dropping it unsubscribes.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Probe;

    impl Exposable for Probe {
        fn describe(t: &mut TypeBuilder<Self>) {
            t.property("Answer", |_| 42i32);
        }
    }

    #[test]
    fn test_exposed_type_identity() {
        let a = host(Probe);
        assert_eq!(a.exposed_type(), ExposedType::of::<Probe>());
        assert_eq!(a.exposed_type().name(), "Probe");
        assert!(!a.exposed_type().is_object_collection());
        assert!(a.host_collection().is_none());
        assert!(a.as_any().downcast_ref::<Probe>().is_some());
    }

    #[test]
    fn test_target_identity_is_by_allocation() {
        let a = host(Probe);
        let b = host(Probe);
        assert!(same_target(&Some(a.clone()), &Some(a.clone())));
        assert!(!same_target(&Some(a.clone()), &Some(b)));
        assert!(!same_target(&Some(a), &None));
        assert!(same_target(&None, &None));
    }

    #[test]
    fn test_subscription_cancels_once() {
        let cancelled = Arc::new(AtomicUsize::new(0));
        let c = cancelled.clone();
        let sub = Subscription::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        sub.cancel();
        assert_eq!(cancelled.load(Ordering::SeqCst), 1);

        let c = cancelled.clone();
        drop(Subscription::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(cancelled.load(Ordering::SeqCst), 2);
    }
}
