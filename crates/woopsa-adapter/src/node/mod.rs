//! Adapter tree nodes: the live binding between host objects and the
//! published protocol tree.
//!
//! A node resolves its target through a getter, describes the target's
//! exposed type once, and publishes the members that pass the visibility
//! policy as [`PropertyNode`]s, [`MethodNode`]s and child nodes. Children are
//! built lazily on first access and rebuilt when the target's exposed type
//! changes.
//!
//! Locking: a node holds its own state lock while calling its getter, and an
//! item getter reads the parent's current target. Locks are therefore only
//! ever taken child before parent, and discarded children are disposed after
//! the owner's lock is released.

mod collection;
mod method;
mod property;

pub use collection::{item_id_from_name, item_name, ITEM_NAME_PREFIX};
pub use method::{ArgumentInfo, MethodNode};
pub use property::{PropertyNode, ORDERED_ITEM_IDS};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::{json, Value};
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};
use tracing::{debug, trace};

use crate::builder::{AncestorView, Upcast};
use crate::config::{AdapterConfig, AdapterOptions};
use crate::convert::ConverterRegistry;
use crate::description::{ItemDescription, MemberInfo, TypeDescriptions};
use crate::error::AdapterError;
use crate::host::{same_target, ChangeListener, Exposable, ExposedType, HostRef, Subscription};
use crate::visibility::{structural_visibility, Visibility, VisibilityCheck, VisibilityHook};
use collection::CollectionSync;

type TargetGetter = Arc<dyn Fn() -> Result<Option<HostRef>, AdapterError> + Send + Sync>;

/// One named element of a node.
#[derive(Debug, Clone)]
pub enum Element {
    Property(Arc<PropertyNode>),
    Method(Arc<MethodNode>),
    Item(Arc<AdapterNode>),
}

/// A resolved target and how its accessors reach the exposed type.
struct Binding {
    target: HostRef,
    exposed: ExposedType,
    upcast: Option<Upcast>,
}

/// Target handed to member accessors.
#[derive(Clone)]
pub(crate) struct BoundTarget {
    target: HostRef,
    upcast: Option<Upcast>,
}

impl BoundTarget {
    /// The target as its exposed type; an ancestor view when the node
    /// publishes a declared base type.
    pub(crate) fn view(&self) -> Result<&dyn Any, AdapterError> {
        match &self.upcast {
            Some(upcast) => upcast.view(self.target.as_any()),
            None => Ok(self.target.as_any()),
        }
    }
}

#[derive(Default)]
struct NodeState {
    populated: bool,
    target: Option<HostRef>,
    upcast: Option<Upcast>,
    exposed: Option<ExposedType>,
    visibility: Visibility,
    properties: IndexMap<String, Arc<PropertyNode>>,
    methods: IndexMap<String, Arc<MethodNode>>,
    items: IndexMap<String, Arc<AdapterNode>>,
    collection: Option<CollectionSync>,
    /// Identity counter for collection children; survives re-population.
    next_item_id: u64,
}

impl NodeState {
    /// Drops every published member and returns the child nodes to dispose.
    fn reset(&mut self) -> Vec<Arc<AdapterNode>> {
        self.populated = false;
        self.properties.clear();
        self.methods.clear();
        let mut discarded: Vec<_> = self.items.drain(..).map(|(_, node)| node).collect();
        if let Some(sync) = self.collection.take() {
            discarded.extend(sync.into_children());
        }
        discarded
    }

    fn bound(&self) -> Option<BoundTarget> {
        self.target.as_ref().map(|target| BoundTarget {
            target: Arc::clone(target),
            upcast: self.upcast.clone(),
        })
    }

    fn children(&self) -> Vec<Arc<AdapterNode>> {
        let mut children: Vec<_> = self.items.values().cloned().collect();
        if let Some(sync) = &self.collection {
            children.extend(sync.ordered());
        }
        children
    }

    fn child(&self, name: &str) -> Option<Arc<AdapterNode>> {
        self.items
            .get(name)
            .cloned()
            .or_else(|| self.collection.as_ref().and_then(|sync| sync.get(name)))
    }
}

pub struct AdapterNode {
    name: String,
    parent: Weak<AdapterNode>,
    me: Weak<AdapterNode>,
    getter: TargetGetter,
    declared_type: Option<ExposedType>,
    default_visibility: Visibility,
    options: AdapterOptions,
    descriptions: Arc<TypeDescriptions>,
    hook: RwLock<Option<VisibilityHook>>,
    collection_id: Option<u64>,
    position: AtomicUsize,
    disposed: AtomicBool,
    collection_changed: Arc<AtomicBool>,
    subscription: Mutex<Option<Subscription>>,
    state: Mutex<NodeState>,
}

impl fmt::Debug for AdapterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterNode")
            .field("name", &self.name)
            .field("declared_type", &self.declared_type)
            .field("collection_id", &self.collection_id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Builds a root [`AdapterNode`].
///
/// ```
/// use std::sync::Arc;
/// use woopsa_adapter::{AdapterNode, Exposable, TypeBuilder};
/// use woopsa_value::ValueKind;
///
/// struct Sensor;
///
/// impl Exposable for Sensor {
///     fn describe(t: &mut TypeBuilder<Self>) {
///         t.property("Temperature", |_| 21.5f64);
///     }
/// }
///
/// let root = AdapterNode::builder("Sensor").target(Arc::new(Sensor)).build();
/// let temperature = root.property("Temperature").unwrap();
/// assert_eq!(temperature.kind(), ValueKind::Real);
/// assert_eq!(temperature.read().unwrap().to_f64().unwrap(), 21.5);
/// ```
pub struct AdapterNodeBuilder {
    name: String,
    getter: Option<TargetGetter>,
    declared_type: Option<ExposedType>,
    config: AdapterConfig,
    converters: Option<Arc<ConverterRegistry>>,
    descriptions: Option<Arc<TypeDescriptions>>,
    hook: Option<VisibilityHook>,
}

impl AdapterNodeBuilder {
    /// A fixed target.
    pub fn target(mut self, target: HostRef) -> Self {
        let getter: TargetGetter = Arc::new(move || Ok(Some(Arc::clone(&target))));
        self.getter = Some(getter);
        self
    }

    /// A target re-resolved on every access.
    pub fn getter(
        mut self,
        getter: impl Fn() -> Result<Option<HostRef>, AdapterError> + Send + Sync + 'static,
    ) -> Self {
        let getter: TargetGetter = Arc::new(getter);
        self.getter = Some(getter);
        self
    }

    /// Publishes the members of `T` instead of those of the target's runtime
    /// type. The runtime type must be `T` or extend it; any other target is
    /// treated as absent.
    pub fn declared_type<T: Exposable>(mut self) -> Self {
        self.declared_type = Some(ExposedType::of::<T>());
        self
    }

    pub fn config(mut self, config: AdapterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.config.default_visibility = visibility;
        self
    }

    pub fn include_inherited(mut self, include: bool) -> Self {
        self.config.include_inherited = include;
        self
    }

    pub fn send_timestamps(mut self, send: bool) -> Self {
        self.config.send_timestamps = send;
        self
    }

    pub fn converters(mut self, converters: impl Into<Arc<ConverterRegistry>>) -> Self {
        self.converters = Some(converters.into());
        self
    }

    /// Shares a description cache between trees. Takes precedence over
    /// `converters` and `include_inherited`.
    pub fn descriptions(mut self, descriptions: Arc<TypeDescriptions>) -> Self {
        self.descriptions = Some(descriptions);
        self
    }

    pub fn on_visibility_check(
        mut self,
        hook: impl Fn(&mut VisibilityCheck<'_>) + Send + Sync + 'static,
    ) -> Self {
        self.hook = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> Arc<AdapterNode> {
        let descriptions = self.descriptions.unwrap_or_else(|| {
            Arc::new(TypeDescriptions::new(
                self.converters.unwrap_or_default(),
                self.config.include_inherited,
            ))
        });
        let getter = self.getter.unwrap_or_else(|| Arc::new(no_target));
        AdapterNode::create(NodeParams {
            name: self.name,
            parent: Weak::new(),
            getter,
            declared_type: self.declared_type,
            default_visibility: self.config.default_visibility,
            options: self.config.options(),
            descriptions,
            hook: self.hook,
            collection_id: None,
        })
    }
}

struct NodeParams {
    name: String,
    parent: Weak<AdapterNode>,
    getter: TargetGetter,
    declared_type: Option<ExposedType>,
    default_visibility: Visibility,
    options: AdapterOptions,
    descriptions: Arc<TypeDescriptions>,
    hook: Option<VisibilityHook>,
    collection_id: Option<u64>,
}

fn no_target() -> Result<Option<HostRef>, AdapterError> {
    Ok(None)
}

fn dispose_all(nodes: Vec<Arc<AdapterNode>>) {
    for node in nodes {
        node.dispose();
    }
}

impl AdapterNode {
    pub fn builder(name: impl Into<String>) -> AdapterNodeBuilder {
        AdapterNodeBuilder {
            name: name.into(),
            getter: None,
            declared_type: None,
            config: AdapterConfig::default(),
            converters: None,
            descriptions: None,
            hook: None,
        }
    }

    fn create(params: NodeParams) -> Arc<Self> {
        Arc::new_cyclic(|me| AdapterNode {
            name: params.name,
            parent: params.parent,
            me: me.clone(),
            getter: params.getter,
            declared_type: params.declared_type,
            default_visibility: params.default_visibility,
            options: params.options,
            descriptions: params.descriptions,
            hook: RwLock::new(params.hook),
            collection_id: params.collection_id,
            position: AtomicUsize::new(0),
            disposed: AtomicBool::new(false),
            collection_changed: Arc::new(AtomicBool::new(false)),
            subscription: Mutex::new(None),
            state: Mutex::new(NodeState::default()),
        })
    }

    fn child(
        &self,
        name: String,
        getter: TargetGetter,
        declared_type: Option<ExposedType>,
        visibility: Visibility,
        collection_id: Option<u64>,
    ) -> Arc<AdapterNode> {
        AdapterNode::create(NodeParams {
            name,
            parent: self.me.clone(),
            getter,
            declared_type,
            default_visibility: visibility,
            options: self.options,
            descriptions: Arc::clone(&self.descriptions),
            hook: None,
            collection_id,
        })
    }

    pub(crate) fn element_child(
        &self,
        element: HostRef,
        id: u64,
        declared_type: Option<ExposedType>,
        visibility: Visibility,
    ) -> Arc<AdapterNode> {
        let getter: TargetGetter = Arc::new(move || Ok(Some(Arc::clone(&element))));
        self.child(item_name(id), getter, declared_type, visibility, Some(id))
    }

    fn item_getter(&self, item: Arc<ItemDescription>) -> TargetGetter {
        let owner = self.me.clone();
        Arc::new(move || -> Result<Option<HostRef>, AdapterError> {
            let owner = owner.upgrade().ok_or(AdapterError::Disposed)?;
            match owner.current_bound() {
                Some(target) => (item.getter)(target.view()?),
                None => Ok(None),
            }
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<Arc<AdapterNode>> {
        self.parent.upgrade()
    }

    pub fn descriptions(&self) -> &Arc<TypeDescriptions> {
        &self.descriptions
    }

    /// Identity of a collection child; `None` for every other node.
    pub fn collection_id(&self) -> Option<u64> {
        self.collection_id
    }

    /// Position of a collection child in its collection's enumeration order.
    pub fn position(&self) -> usize {
        self.position.load(Ordering::Relaxed)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    pub(crate) fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.options.send_timestamps.then(Utc::now)
    }

    fn lock_state(&self) -> MutexGuard<'_, NodeState> {
        self.state.lock().expect("adapter node state poisoned")
    }

    fn current_bound(&self) -> Option<BoundTarget> {
        self.lock_state().bound()
    }

    fn fetch_target(&self) -> Option<HostRef> {
        if self.is_disposed() {
            return None;
        }
        match (self.getter)() {
            Ok(target) => target,
            Err(err) => {
                debug!(node = %self.name, error = %err, "target getter failed, publishing no members");
                None
            }
        }
    }

    /// Matches the target against the declared type. A target whose runtime
    /// type neither is nor extends it binds to nothing.
    fn bind(&self, target: HostRef) -> Option<Binding> {
        let runtime = target.exposed_type();
        let Some(declared) = self.declared_type.filter(|d| *d != runtime) else {
            return Some(Binding {
                target,
                exposed: runtime,
                upcast: None,
            });
        };
        match self.descriptions.get(runtime).upcast_to(declared) {
            Some(upcast) => Some(Binding {
                target,
                exposed: declared,
                upcast: Some(upcast),
            }),
            None => {
                debug!(
                    node = %self.name,
                    declared = declared.name(),
                    runtime = runtime.name(),
                    "target does not extend the declared type, publishing no members"
                );
                None
            }
        }
    }

    /// Re-resolves the target and keeps the published members in line with
    /// it; optionally re-diffs the collection children.
    fn with_update<R>(&self, sync: bool, f: impl FnOnce(&NodeState) -> R) -> R {
        let (result, discarded) = {
            let mut guard = self.lock_state();
            let state = &mut *guard;
            let mut discarded = self.resolve(state);
            if sync {
                discarded.extend(self.sync_collection(state, false));
            }
            (f(state), discarded)
        };
        dispose_all(discarded);
        result
    }

    fn resolve(&self, state: &mut NodeState) -> Vec<Arc<AdapterNode>> {
        let fetched = self.fetch_target();
        if state.populated && same_target(&fetched, &state.target) {
            return Vec::new();
        }
        let current = fetched.and_then(|target| self.bind(target));
        if !state.populated {
            return self.populate(state, current);
        }
        if current.as_ref().map(|b| b.exposed) != state.exposed {
            trace!(node = %self.name, "exposed type changed, repopulating");
            return self.populate(state, current);
        }
        state.target = current.as_ref().map(|b| Arc::clone(&b.target));
        state.upcast = current.and_then(|b| b.upcast);
        if state.collection.is_some() {
            self.subscribe_collection(state);
        }
        Vec::new()
    }

    fn populate(&self, state: &mut NodeState, current: Option<Binding>) -> Vec<Arc<AdapterNode>> {
        let mut discarded = state.reset();
        self.subscription
            .lock()
            .expect("adapter node subscription poisoned")
            .take();
        state.populated = true;
        state.visibility = current
            .as_ref()
            .and_then(|b| b.target.exposed_type().visibility())
            .unwrap_or(self.default_visibility);
        state.exposed = current.as_ref().map(|b| b.exposed);
        state.target = current.as_ref().map(|b| Arc::clone(&b.target));
        state.upcast = current.as_ref().and_then(|b| b.upcast.clone());
        let Some(Binding { target, exposed, .. }) = current else {
            return discarded;
        };

        let description = self.descriptions.get(exposed);
        let runtime = target.exposed_type();
        let flags = state.visibility;
        let hook = self.effective_hook();
        let visible = |info: &MemberInfo| {
            let mut check = VisibilityCheck {
                member: info,
                node: &self.name,
                visible: structural_visibility(flags, info, runtime),
            };
            if let Some(hook) = &hook {
                hook(&mut check);
            }
            check.visible
        };
        let is_collection = exposed.is_object_collection()
            && flags.contains(Visibility::OBJECT_COLLECTION)
            && target.host_collection().is_some();

        for property in description.properties() {
            if state.properties.contains_key(property.name()) || !visible(property.info()) {
                continue;
            }
            let node = PropertyNode::member(self.me.clone(), Arc::clone(property));
            state
                .properties
                .insert(property.name().to_string(), Arc::new(node));
        }
        if is_collection {
            let node = PropertyNode::ordered_item_ids(self.me.clone());
            state
                .properties
                .insert(ORDERED_ITEM_IDS.to_string(), Arc::new(node));
        }

        for method in description.methods() {
            if state.methods.contains_key(method.name()) || !visible(method.info()) {
                continue;
            }
            match MethodNode::bind(self.me.clone(), Arc::clone(method)) {
                Ok(node) => {
                    state.methods.insert(method.name().to_string(), Arc::new(node));
                }
                Err(err) => {
                    debug!(node = %self.name, method = method.name(), error = %err, "method omitted");
                }
            }
        }

        for item in description.items() {
            if state.items.contains_key(item.name()) || !visible(item.info()) {
                continue;
            }
            let declared = self.declared_type.and(item.declared_type());
            let child = self.child(
                item.name().to_string(),
                self.item_getter(Arc::clone(item)),
                declared,
                flags,
                None,
            );
            state.items.insert(item.name().to_string(), child);
        }

        if is_collection {
            let element_type = self
                .declared_type
                .and_then(|_| target.host_collection().and_then(|c| c.element_type()));
            state.collection = Some(CollectionSync::new(element_type));
            self.subscribe_collection(state);
            discarded.extend(self.sync_collection(state, true));
        }
        discarded
    }

    fn subscribe_collection(&self, state: &mut NodeState) {
        let mut subscription = self
            .subscription
            .lock()
            .expect("adapter node subscription poisoned");
        subscription.take();
        let Some(sync) = state.collection.as_mut() else {
            return;
        };
        let changed = Arc::clone(&self.collection_changed);
        let listener: ChangeListener = Arc::new(move || changed.store(true, Ordering::Release));
        *subscription = state
            .target
            .as_ref()
            .and_then(|t| t.host_collection())
            .and_then(|c| c.subscribe(listener));
        sync.notifies = subscription.is_some();
        self.collection_changed.store(true, Ordering::Release);
    }

    fn sync_collection(&self, state: &mut NodeState, force: bool) -> Vec<Arc<AdapterNode>> {
        let Some(target) = state.target.clone() else {
            return Vec::new();
        };
        let Some(collection) = target.host_collection() else {
            return Vec::new();
        };
        let Some(sync) = state.collection.as_mut() else {
            return Vec::new();
        };
        let changed = self.collection_changed.swap(false, Ordering::AcqRel);
        if !force && sync.notifies && !changed {
            return Vec::new();
        }
        let elements = collection.elements();
        sync.diff(self, &elements, &mut state.next_item_id, state.visibility)
    }

    fn effective_hook(&self) -> Option<VisibilityHook> {
        if let Some(hook) = self.local_hook() {
            return Some(hook);
        }
        let mut ancestor = self.parent.upgrade();
        while let Some(node) = ancestor {
            if let Some(hook) = node.local_hook() {
                return Some(hook);
            }
            ancestor = node.parent.upgrade();
        }
        None
    }

    fn local_hook(&self) -> Option<VisibilityHook> {
        self.hook.read().expect("visibility hook lock poisoned").clone()
    }

    /// Installs or removes this node's visibility hook. Nodes without a hook
    /// defer to their closest ancestor's. The members are re-evaluated on
    /// next access.
    pub fn set_visibility_hook(&self, hook: Option<VisibilityHook>) {
        *self.hook.write().expect("visibility hook lock poisoned") = hook;
        let discarded = self.lock_state().reset();
        dispose_all(discarded);
    }

    /// Current target, re-resolved through the getter. A failing getter
    /// yields `None`.
    pub fn target(&self) -> Option<HostRef> {
        self.with_update(false, |state| state.target.clone())
    }

    pub(crate) fn bound_target(&self) -> Option<BoundTarget> {
        self.with_update(false, NodeState::bound)
    }

    pub fn exposed_type(&self) -> Option<ExposedType> {
        self.with_update(false, |state| state.exposed)
    }

    /// Visibility in effect for this node's target.
    pub fn visibility(&self) -> Visibility {
        self.with_update(false, |state| state.visibility)
    }

    /// Re-resolves targets and re-synchronizes collections over the whole
    /// subtree.
    pub fn refresh(&self) {
        let children = self.with_update(true, NodeState::children);
        for child in children {
            child.refresh();
        }
    }

    pub fn properties(&self) -> Vec<Arc<PropertyNode>> {
        self.with_update(false, |state| state.properties.values().cloned().collect())
    }

    pub fn methods(&self) -> Vec<Arc<MethodNode>> {
        self.with_update(false, |state| state.methods.values().cloned().collect())
    }

    /// Nested items followed by collection children in enumeration order.
    pub fn items(&self) -> Vec<Arc<AdapterNode>> {
        self.with_update(true, NodeState::children)
    }

    pub fn property(&self, name: &str) -> Option<Arc<PropertyNode>> {
        self.with_update(false, |state| state.properties.get(name).cloned())
    }

    pub fn method(&self, name: &str) -> Option<Arc<MethodNode>> {
        self.with_update(false, |state| state.methods.get(name).cloned())
    }

    pub fn item(&self, name: &str) -> Option<Arc<AdapterNode>> {
        self.with_update(true, |state| state.child(name))
    }

    pub fn element(&self, name: &str) -> Option<Element> {
        self.with_update(true, |state| {
            if let Some(property) = state.properties.get(name) {
                return Some(Element::Property(Arc::clone(property)));
            }
            if let Some(method) = state.methods.get(name) {
                return Some(Element::Method(Arc::clone(method)));
            }
            state.child(name).map(Element::Item)
        })
    }

    /// Resolves a `/`-separated path relative to this node. The empty path
    /// is the node itself.
    pub fn find(&self, path: &str) -> Option<Element> {
        let mut segments = path.split('/').filter(|s| !s.is_empty()).peekable();
        let mut node = self.me.upgrade()?;
        while let Some(segment) = segments.next() {
            let element = node.element(segment)?;
            if segments.peek().is_none() {
                return Some(element);
            }
            match element {
                Element::Item(child) => node = child,
                _ => return None,
            }
        }
        Some(Element::Item(node))
    }

    /// Identities of the collection children, ordered by position, as a
    /// JSON array.
    pub fn ordered_item_ids(&self) -> String {
        let ids: Vec<String> = self.with_update(true, |state| {
            state
                .collection
                .as_ref()
                .map(|sync| {
                    sync.ordered()
                        .iter()
                        .filter_map(|child| child.collection_id())
                        .map(|id| id.to_string())
                        .collect()
                })
                .unwrap_or_default()
        });
        format!("[{}]", ids.join(","))
    }

    /// Protocol metadata of this node.
    pub fn meta(&self) -> Value {
        let (properties, methods, items) = self.with_update(true, |state| {
            (
                state.properties.values().cloned().collect::<Vec<_>>(),
                state.methods.values().cloned().collect::<Vec<_>>(),
                state.children(),
            )
        });
        json!({
            "Name": self.name,
            "Items": items.iter().map(|item| item.name()).collect::<Vec<_>>(),
            "Properties": properties
                .iter()
                .map(|p| json!({
                    "Name": p.name(),
                    "Type": p.kind().as_str(),
                    "ReadOnly": p.is_read_only(),
                }))
                .collect::<Vec<_>>(),
            "Methods": methods
                .iter()
                .map(|m| json!({
                    "Name": m.name(),
                    "ReturnType": m.return_kind().as_str(),
                    "ArgumentInfos": m
                        .arguments()
                        .iter()
                        .map(|a| json!({"Name": a.name, "Type": a.kind.as_str()}))
                        .collect::<Vec<_>>(),
                }))
                .collect::<Vec<_>>(),
        })
    }

    /// Releases the collection subscription and disposes the subtree. A
    /// disposed node publishes nothing.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.subscription
            .lock()
            .expect("adapter node subscription poisoned")
            .take();
        let children = {
            let mut state = self.lock_state();
            let children = state.reset();
            state.target = None;
            state.upcast = None;
            children
        };
        dispose_all(children);
    }
}
