//! Type descriptions: the resolved, cached member lists of exposed types.

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::debug;
use woopsa_value::ValueKind;

use crate::builder::{Getter, Invoker, ItemGetter, MemberMeta, Setter, Upcast};
use crate::convert::{ConverterRegistry, ValueConverter};
use crate::host::ExposedType;
use crate::native::{Args, NativeType, NativeValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Property,
    Method,
    Item,
}

/// Where a member is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclaringType {
    Type(ExposedType),
    /// The universal base object (`ToString`).
    ObjectClass,
    /// A standard list base type (`Count`).
    ListClass,
}

/// Metadata the visibility policy decides on.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberInfo {
    pub name: String,
    pub kind: MemberKind,
    pub declaring: DeclaringType,
    /// Explicit per-member override.
    pub visible: Option<bool>,
    pub special_name: bool,
    /// The member's value is itself a collection of objects.
    pub object_collection: bool,
}

impl MemberInfo {
    fn from_meta(meta: MemberMeta, kind: MemberKind, owner: ExposedType) -> Self {
        Self {
            name: meta.name,
            kind,
            declaring: meta.declaring.unwrap_or(DeclaringType::Type(owner)),
            visible: meta.visible,
            special_name: meta.special_name,
            object_collection: meta.object_collection,
        }
    }
}

pub struct PropertyDescription {
    pub(crate) info: MemberInfo,
    pub(crate) native: NativeType,
    pub(crate) kind: ValueKind,
    pub(crate) converter: Arc<dyn ValueConverter>,
    pub(crate) getter: Getter,
    pub(crate) setter: Option<Setter>,
}

impl PropertyDescription {
    pub fn info(&self) -> &MemberInfo {
        &self.info
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn native(&self) -> NativeType {
        self.native
    }

    pub fn is_read_only(&self) -> bool {
        self.setter.is_none()
    }
}

impl fmt::Debug for PropertyDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescription")
            .field("name", &self.info.name)
            .field("kind", &self.kind)
            .field("read_only", &self.is_read_only())
            .finish()
    }
}

pub struct ArgumentDescription {
    pub(crate) name: String,
    pub(crate) native: NativeType,
    pub(crate) kind: Option<ValueKind>,
    pub(crate) converter: Option<Arc<dyn ValueConverter>>,
}

impl ArgumentDescription {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `None` when no converter publishes the argument's native type.
    pub fn kind(&self) -> Option<ValueKind> {
        self.kind
    }
}

pub struct MethodDescription {
    pub(crate) info: MemberInfo,
    pub(crate) return_native: NativeType,
    pub(crate) return_kind: Option<ValueKind>,
    pub(crate) return_converter: Option<Arc<dyn ValueConverter>>,
    pub(crate) arguments: Vec<ArgumentDescription>,
    pub(crate) invoker: Invoker,
}

impl MethodDescription {
    pub fn info(&self) -> &MemberInfo {
        &self.info
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn return_kind(&self) -> Option<ValueKind> {
        self.return_kind
    }

    pub fn arguments(&self) -> &[ArgumentDescription] {
        &self.arguments
    }
}

impl fmt::Debug for MethodDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescription")
            .field("name", &self.info.name)
            .field("return_kind", &self.return_kind)
            .field(
                "arguments",
                &self.arguments.iter().map(|a| &a.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

pub struct ItemDescription {
    pub(crate) info: MemberInfo,
    pub(crate) declared: Option<ExposedType>,
    pub(crate) getter: ItemGetter,
}

impl ItemDescription {
    pub fn info(&self) -> &MemberInfo {
        &self.info
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn declared_type(&self) -> Option<ExposedType> {
        self.declared
    }
}

impl fmt::Debug for ItemDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemDescription")
            .field("name", &self.info.name)
            .field("declared", &self.declared)
            .finish()
    }
}

pub struct TypeDescription {
    exposed: ExposedType,
    pub(crate) properties: Vec<Arc<PropertyDescription>>,
    pub(crate) methods: Vec<Arc<MethodDescription>>,
    pub(crate) items: Vec<Arc<ItemDescription>>,
    ancestors: Vec<(ExposedType, Upcast)>,
}

impl fmt::Debug for TypeDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescription")
            .field("exposed", &self.exposed)
            .field("properties", &self.properties)
            .field("methods", &self.methods)
            .field("items", &self.items)
            .field("ancestors", &self.ancestors().collect::<Vec<_>>())
            .finish()
    }
}

impl TypeDescription {
    pub fn exposed_type(&self) -> ExposedType {
        self.exposed
    }

    pub fn properties(&self) -> &[Arc<PropertyDescription>] {
        &self.properties
    }

    pub fn methods(&self) -> &[Arc<MethodDescription>] {
        &self.methods
    }

    pub fn items(&self) -> &[Arc<ItemDescription>] {
        &self.items
    }

    /// Every type registered through `extends`, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = ExposedType> + '_ {
        self.ancestors.iter().map(|(ancestor, _)| *ancestor)
    }

    pub fn extends(&self, ancestor: ExposedType) -> bool {
        self.ancestors().any(|a| a == ancestor)
    }

    pub(crate) fn upcast_to(&self, ancestor: ExposedType) -> Option<Upcast> {
        self.ancestors
            .iter()
            .find(|(a, _)| *a == ancestor)
            .map(|(_, upcast)| Arc::clone(upcast))
    }
}

/// Shared cache of type descriptions, keyed by type identity.
///
/// Lookup and build happen under one lock, so a type is described at most
/// once even when several nodes ask for it concurrently.
pub struct TypeDescriptions {
    converters: Arc<ConverterRegistry>,
    include_inherited: bool,
    cache: Mutex<HashMap<TypeId, Arc<TypeDescription>>>,
}

impl fmt::Debug for TypeDescriptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptions")
            .field("include_inherited", &self.include_inherited)
            .field("cached", &self.len())
            .finish()
    }
}

impl Default for TypeDescriptions {
    fn default() -> Self {
        Self::new(Arc::new(ConverterRegistry::new()), true)
    }
}

impl TypeDescriptions {
    pub fn new(converters: Arc<ConverterRegistry>, include_inherited: bool) -> Self {
        Self {
            converters,
            include_inherited,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn converters(&self) -> &Arc<ConverterRegistry> {
        &self.converters
    }

    pub fn include_inherited(&self) -> bool {
        self.include_inherited
    }

    pub fn get(&self, exposed: ExposedType) -> Arc<TypeDescription> {
        let mut cache = self.cache.lock().expect("type description cache poisoned");
        Arc::clone(
            cache
                .entry(exposed.id())
                .or_insert_with(|| Arc::new(self.build(exposed))),
        )
    }

    pub fn len(&self) -> usize {
        self.cache.lock().expect("type description cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_own(&self, info: &MemberInfo, exposed: ExposedType) -> bool {
        info.declaring == DeclaringType::Type(exposed)
    }

    fn build(&self, exposed: ExposedType) -> TypeDescription {
        let members = exposed.members();
        let registry = &self.converters;

        let mut properties = Vec::new();
        for raw in members.properties {
            let kind_override = raw.meta.kind;
            let info = MemberInfo::from_meta(raw.meta, MemberKind::Property, exposed);
            if !self.include_inherited && !self.is_own(&info, exposed) {
                continue;
            }
            let Some(kind) = kind_override.or_else(|| registry.default_kind(raw.native)) else {
                debug!(
                    type_name = exposed.name(),
                    property = %info.name,
                    native = raw.native.name(),
                    "property dropped: no value kind for native type"
                );
                continue;
            };
            let Some(converter) = registry.resolve(raw.native, kind) else {
                debug!(
                    type_name = exposed.name(),
                    property = %info.name,
                    "property dropped: no converter"
                );
                continue;
            };
            properties.push(Arc::new(PropertyDescription {
                info,
                native: raw.native,
                kind,
                converter,
                getter: raw.getter,
                setter: raw.setter,
            }));
        }

        let mut methods = Vec::new();
        let mut method_names = HashSet::new();
        for raw in members.methods {
            let kind_override = raw.meta.kind;
            let info = MemberInfo::from_meta(raw.meta, MemberKind::Method, exposed);
            if !self.include_inherited && !self.is_own(&info, exposed) {
                continue;
            }
            if !method_names.insert(info.name.clone()) {
                debug!(
                    type_name = exposed.name(),
                    method = %info.name,
                    "method dropped: name already published"
                );
                continue;
            }
            let return_kind = kind_override.or_else(|| registry.default_kind(raw.returns));
            let return_converter = return_kind.and_then(|k| registry.resolve(raw.returns, k));
            let arguments = raw
                .args
                .into_iter()
                .map(|arg| {
                    let kind = arg.kind.or_else(|| registry.default_kind(arg.native));
                    ArgumentDescription {
                        converter: kind.and_then(|k| registry.resolve(arg.native, k)),
                        name: arg.name,
                        native: arg.native,
                        kind,
                    }
                })
                .collect();
            methods.push(Arc::new(MethodDescription {
                info,
                return_native: raw.returns,
                return_kind,
                return_converter,
                arguments,
                invoker: raw.invoker,
            }));
        }
        if self.include_inherited && method_names.insert("ToString".to_string()) {
            if let Some(to_string) = self.to_string_method(exposed) {
                methods.push(Arc::new(to_string));
            }
        }

        let items = members
            .items
            .into_iter()
            .map(|raw| ItemDescription {
                info: MemberInfo::from_meta(raw.meta, MemberKind::Item, exposed),
                declared: raw.declared,
                getter: raw.getter,
            })
            .filter(|item| self.include_inherited || self.is_own(&item.info, exposed))
            .map(Arc::new)
            .collect();

        TypeDescription {
            exposed,
            properties,
            methods,
            items,
            ancestors: members.ancestors,
        }
    }

    fn to_string_method(&self, exposed: ExposedType) -> Option<MethodDescription> {
        let name = exposed.name();
        let invoker: Invoker =
            Arc::new(move |_: &dyn Any, _: &Args| Ok(NativeValue::String(name.to_string())));
        Some(MethodDescription {
            info: MemberInfo {
                name: "ToString".to_string(),
                kind: MemberKind::Method,
                declaring: DeclaringType::ObjectClass,
                visible: None,
                special_name: false,
                object_collection: false,
            },
            return_native: NativeType::String,
            return_kind: Some(ValueKind::Text),
            return_converter: Some(self.converters.resolve(NativeType::String, ValueKind::Text)?),
            arguments: Vec::new(),
            invoker,
        })
    }
}
