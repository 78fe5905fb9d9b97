//! Member registration for [`Exposable`] types.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;
use woopsa_value::ValueKind;

use crate::description::DeclaringType;
use crate::error::AdapterError;
use crate::host::{Exposable, ExposedType, HostRef};
use crate::native::{short_type_name, Arg, Args, Native, NativeType, NativeValue};

pub(crate) type Getter = Arc<dyn Fn(&dyn Any) -> Result<NativeValue, AdapterError> + Send + Sync>;
pub(crate) type Setter = Arc<dyn Fn(&dyn Any, NativeValue) -> Result<(), AdapterError> + Send + Sync>;
pub(crate) type Invoker = Arc<dyn Fn(&dyn Any, &Args) -> Result<NativeValue, AdapterError> + Send + Sync>;
pub(crate) type ItemGetter =
    Arc<dyn Fn(&dyn Any) -> Result<Option<HostRef>, AdapterError> + Send + Sync>;

fn downcast<T: Any>(target: &dyn Any) -> Result<&T, AdapterError> {
    target.downcast_ref::<T>().ok_or(AdapterError::TypeMismatch {
        expected: short_type_name(std::any::type_name::<T>()),
    })
}

/// Views a target of one type as one of its registered ancestors.
pub(crate) trait AncestorView: Send + Sync {
    fn view<'a>(&self, target: &'a dyn Any) -> Result<&'a dyn Any, AdapterError>;
}

pub(crate) type Upcast = Arc<dyn AncestorView>;

struct Projection<T, B> {
    project: fn(&T) -> &B,
}

impl<T: Any, B: Any> AncestorView for Projection<T, B> {
    fn view<'a>(&self, target: &'a dyn Any) -> Result<&'a dyn Any, AdapterError> {
        Ok((self.project)(downcast::<T>(target)?))
    }
}

/// `first`, then `then`: reaches an ancestor of an ancestor.
struct Chained {
    first: Upcast,
    then: Upcast,
}

impl AncestorView for Chained {
    fn view<'a>(&self, target: &'a dyn Any) -> Result<&'a dyn Any, AdapterError> {
        self.then.view(self.first.view(target)?)
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MemberMeta {
    pub name: String,
    pub kind: Option<ValueKind>,
    pub special_name: bool,
    pub declaring: Option<DeclaringType>,
    pub visible: Option<bool>,
    pub object_collection: bool,
}

impl MemberMeta {
    fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

pub(crate) struct RawProperty {
    pub meta: MemberMeta,
    pub native: NativeType,
    pub getter: Getter,
    pub setter: Option<Setter>,
}

pub(crate) struct RawMethod {
    pub meta: MemberMeta,
    pub args: Vec<Arg>,
    pub returns: NativeType,
    pub invoker: Invoker,
}

pub(crate) struct RawItem {
    pub meta: MemberMeta,
    pub declared: Option<ExposedType>,
    pub getter: ItemGetter,
}

/// Members of one type, own members first, and the views onto every
/// registered ancestor.
#[derive(Default)]
pub(crate) struct TypeMembers {
    pub properties: Vec<RawProperty>,
    pub methods: Vec<RawMethod>,
    pub items: Vec<RawItem>,
    pub ancestors: Vec<(ExposedType, Upcast)>,
}

impl TypeMembers {
    fn append(&mut self, mut other: TypeMembers) {
        self.properties.append(&mut other.properties);
        self.methods.append(&mut other.methods);
        self.items.append(&mut other.items);
        self.ancestors.append(&mut other.ancestors);
    }

    fn metas_mut(&mut self) -> impl Iterator<Item = &mut MemberMeta> {
        self.properties
            .iter_mut()
            .map(|p| &mut p.meta)
            .chain(self.methods.iter_mut().map(|m| &mut m.meta))
            .chain(self.items.iter_mut().map(|i| &mut i.meta))
    }
}

pub(crate) fn collect_members<T: Exposable>() -> TypeMembers {
    let mut builder = TypeBuilder::<T>::new();
    T::describe(&mut builder);
    builder.finish()
}

/// Options on a just-registered member.
pub struct MemberHandle<'a> {
    meta: &'a mut MemberMeta,
}

impl MemberHandle<'_> {
    /// Publishes the member under `kind` instead of the registry default.
    pub fn kind(self, kind: ValueKind) -> Self {
        self.meta.kind = Some(kind);
        self
    }

    /// Marks a compiler-generated style name (accessors, operators).
    pub fn special_name(self) -> Self {
        self.meta.special_name = true;
        self
    }

    pub fn declared_on(self, declaring: DeclaringType) -> Self {
        self.meta.declaring = Some(declaring);
        self
    }

    pub fn visible(self, visible: bool) -> Self {
        self.meta.visible = Some(visible);
        self
    }
}

/// Collects the published members of `T`.
///
/// ```
/// use std::sync::Mutex;
/// use woopsa_adapter::{arg, Exposable, TypeBuilder};
///
/// struct Valve {
///     open: Mutex<bool>,
/// }
///
/// impl Exposable for Valve {
///     fn describe(t: &mut TypeBuilder<Self>) {
///         t.property_rw(
///             "IsOpen",
///             |v| *v.open.lock().unwrap(),
///             |v, open| {
///                 *v.open.lock().unwrap() = open;
///                 Ok(())
///             },
///         );
///         t.method("Toggle", [], |v, _| {
///             let mut open = v.open.lock().unwrap();
///             *open = !*open;
///             Ok(*open)
///         });
///         t.method("Set", [arg::<bool>("open")], |v, args| {
///             *v.open.lock().unwrap() = args.get(0)?;
///             Ok(())
///         });
///     }
/// }
/// ```
pub struct TypeBuilder<T> {
    own: TypeMembers,
    inherited: TypeMembers,
    overrides: Vec<(String, bool)>,
    _marker: PhantomData<fn(&T)>,
}

impl<T: Exposable> TypeBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            own: TypeMembers::default(),
            inherited: TypeMembers::default(),
            overrides: Vec::new(),
            _marker: PhantomData,
        }
    }

    fn push_property(&mut self, property: RawProperty) -> MemberHandle<'_> {
        self.own.properties.push(property);
        let last = self.own.properties.len() - 1;
        MemberHandle {
            meta: &mut self.own.properties[last].meta,
        }
    }

    pub fn property<V: Native>(
        &mut self,
        name: impl Into<String>,
        get: impl Fn(&T) -> V + Send + Sync + 'static,
    ) -> MemberHandle<'_> {
        self.try_property(name, move |t| Ok(get(t)))
    }

    /// A read-only property whose getter can fail.
    pub fn try_property<V: Native>(
        &mut self,
        name: impl Into<String>,
        get: impl Fn(&T) -> Result<V, AdapterError> + Send + Sync + 'static,
    ) -> MemberHandle<'_> {
        let getter: Getter = Arc::new(move |target: &dyn Any| -> Result<NativeValue, AdapterError> {
            Ok(get(downcast::<T>(target)?)?.into_native())
        });
        self.push_property(RawProperty {
            meta: MemberMeta::named(name),
            native: V::native_type(),
            getter,
            setter: None,
        })
    }

    pub fn property_rw<V: Native>(
        &mut self,
        name: impl Into<String>,
        get: impl Fn(&T) -> V + Send + Sync + 'static,
        set: impl Fn(&T, V) -> Result<(), AdapterError> + Send + Sync + 'static,
    ) -> MemberHandle<'_> {
        let getter: Getter = Arc::new(move |target: &dyn Any| -> Result<NativeValue, AdapterError> {
            Ok(get(downcast::<T>(target)?).into_native())
        });
        let setter: Setter =
            Arc::new(move |target: &dyn Any, value: NativeValue| -> Result<(), AdapterError> {
                set(downcast::<T>(target)?, V::from_native(value)?)
            });
        self.push_property(RawProperty {
            meta: MemberMeta::named(name),
            native: V::native_type(),
            getter,
            setter: Some(setter),
        })
    }

    pub fn method<R: Native>(
        &mut self,
        name: impl Into<String>,
        args: impl IntoIterator<Item = Arg>,
        invoke: impl Fn(&T, &Args) -> Result<R, AdapterError> + Send + Sync + 'static,
    ) -> MemberHandle<'_> {
        let invoker: Invoker =
            Arc::new(move |target: &dyn Any, args: &Args| -> Result<NativeValue, AdapterError> {
                Ok(invoke(downcast::<T>(target)?, args)?.into_native())
            });
        self.own.methods.push(RawMethod {
            meta: MemberMeta::named(name),
            args: args.into_iter().collect(),
            returns: R::native_type(),
            invoker,
        });
        let last = self.own.methods.len() - 1;
        MemberHandle {
            meta: &mut self.own.methods[last].meta,
        }
    }

    /// A nested object of a known type.
    pub fn item<C: Exposable>(
        &mut self,
        name: impl Into<String>,
        get: impl Fn(&T) -> Option<Arc<C>> + Send + Sync + 'static,
    ) -> MemberHandle<'_> {
        let getter: ItemGetter = Arc::new(move |target: &dyn Any| -> Result<Option<HostRef>, AdapterError> {
            Ok(get(downcast::<T>(target)?).map(|child| child as HostRef))
        });
        let mut meta = MemberMeta::named(name);
        meta.object_collection = C::OBJECT_COLLECTION;
        self.push_item(RawItem {
            meta,
            declared: Some(ExposedType::of::<C>()),
            getter,
        })
    }

    /// A nested object whose type is only known from the instance.
    pub fn dynamic_item(
        &mut self,
        name: impl Into<String>,
        get: impl Fn(&T) -> Option<HostRef> + Send + Sync + 'static,
    ) -> MemberHandle<'_> {
        let getter: ItemGetter = Arc::new(move |target: &dyn Any| -> Result<Option<HostRef>, AdapterError> {
            Ok(get(downcast::<T>(target)?))
        });
        self.push_item(RawItem {
            meta: MemberMeta::named(name),
            declared: None,
            getter,
        })
    }

    fn push_item(&mut self, item: RawItem) -> MemberHandle<'_> {
        self.own.items.push(item);
        let last = self.own.items.len() - 1;
        MemberHandle {
            meta: &mut self.own.items[last].meta,
        }
    }

    /// Inherits the members of `B`, reached through `project`. They are
    /// declared on `B` and follow the own members of `T`. `B` and its own
    /// ancestors are recorded, so a node can publish `T` as any of them.
    pub fn extends<B: Exposable>(&mut self, project: fn(&T) -> &B) -> &mut Self {
        let to_base: Upcast = Arc::new(Projection { project });
        let mut base = collect_members::<B>();
        for property in &mut base.properties {
            let inner = Arc::clone(&property.getter);
            let upcast = Arc::clone(&to_base);
            property.getter = Arc::new(move |target: &dyn Any| -> Result<NativeValue, AdapterError> {
                inner(upcast.view(target)?)
            });
            if let Some(inner) = property.setter.take() {
                let upcast = Arc::clone(&to_base);
                property.setter = Some(Arc::new(move |target: &dyn Any, value: NativeValue| -> Result<(), AdapterError> {
                    inner(upcast.view(target)?, value)
                }));
            }
        }
        for method in &mut base.methods {
            let inner = Arc::clone(&method.invoker);
            let upcast = Arc::clone(&to_base);
            method.invoker = Arc::new(move |target: &dyn Any, args: &Args| -> Result<NativeValue, AdapterError> {
                inner(upcast.view(target)?, args)
            });
        }
        for item in &mut base.items {
            let inner = Arc::clone(&item.getter);
            let upcast = Arc::clone(&to_base);
            item.getter = Arc::new(move |target: &dyn Any| -> Result<Option<HostRef>, AdapterError> {
                inner(upcast.view(target)?)
            });
        }
        let mut ancestors = vec![(ExposedType::of::<B>(), Arc::clone(&to_base))];
        for (ancestor, upcast) in base.ancestors.drain(..) {
            let chained: Upcast = Arc::new(Chained {
                first: Arc::clone(&to_base),
                then: upcast,
            });
            ancestors.push((ancestor, chained));
        }
        base.ancestors = ancestors;
        self.inherited.append(base);
        self
    }

    /// Per-member visibility override, by member name.
    pub fn member_visibility(&mut self, name: impl Into<String>, visible: bool) -> &mut Self {
        self.overrides.push((name.into(), visible));
        self
    }

    pub(crate) fn finish(mut self) -> TypeMembers {
        let own_type = DeclaringType::Type(ExposedType::of::<T>());
        for meta in self.own.metas_mut() {
            meta.declaring.get_or_insert(own_type);
        }
        let mut members = self.own;
        members.append(self.inherited);
        for (name, visible) in &self.overrides {
            for meta in members.metas_mut().filter(|m| &m.name == name) {
                meta.visible = Some(*visible);
            }
        }
        members
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Base {
        serial: String,
    }

    impl Exposable for Base {
        fn describe(t: &mut TypeBuilder<Self>) {
            t.property("Serial", |b| b.serial.clone());
            t.property("Shadowed", |_| 1i32);
        }
    }

    struct Pump {
        base: Base,
        speed: Mutex<f64>,
    }

    impl Exposable for Pump {
        fn describe(t: &mut TypeBuilder<Self>) {
            t.property("Shadowed", |_| 2i32);
            t.property_rw(
                "Speed",
                |p| *p.speed.lock().unwrap(),
                |p, v| {
                    *p.speed.lock().unwrap() = v;
                    Ok(())
                },
            )
            .kind(ValueKind::Real);
            t.method("Stop", [], |p, _| {
                *p.speed.lock().unwrap() = 0.0;
                Ok(())
            })
            .special_name();
            t.extends::<Base>(|p| &p.base)
                .member_visibility("Serial", false);
        }
    }

    fn pump() -> Pump {
        Pump {
            base: Base {
                serial: "P-1".into(),
            },
            speed: Mutex::new(3.0),
        }
    }

    #[test]
    fn test_own_members_precede_inherited() {
        let members = collect_members::<Pump>();
        let names: Vec<_> = members.properties.iter().map(|p| p.meta.name.as_str()).collect();
        assert_eq!(names, vec!["Shadowed", "Speed", "Serial", "Shadowed"]);
        assert_eq!(
            members.properties[0].meta.declaring,
            Some(DeclaringType::Type(ExposedType::of::<Pump>()))
        );
        assert_eq!(
            members.properties[2].meta.declaring,
            Some(DeclaringType::Type(ExposedType::of::<Base>()))
        );
    }

    #[test]
    fn test_inherited_accessors_go_through_projection() {
        let members = collect_members::<Pump>();
        let target = pump();
        let serial = (members.properties[2].getter)(&target).unwrap();
        assert_eq!(serial, NativeValue::String("P-1".into()));
    }

    #[test]
    fn test_overrides_and_handles() {
        let members = collect_members::<Pump>();
        assert_eq!(members.properties[2].meta.visible, Some(false));
        assert_eq!(members.properties[1].meta.kind, Some(ValueKind::Real));
        assert!(members.methods[0].meta.special_name);
        assert_eq!(members.methods[0].returns, NativeType::Void);
    }

    #[test]
    fn test_setter_and_invoker() {
        let members = collect_members::<Pump>();
        let target = pump();
        let setter = members.properties[1].setter.as_ref().unwrap();
        setter(&target, NativeValue::F64(7.5)).unwrap();
        assert_eq!(*target.speed.lock().unwrap(), 7.5);
        (members.methods[0].invoker)(&target, &Args::default()).unwrap();
        assert_eq!(*target.speed.lock().unwrap(), 0.0);
    }

    #[test]
    fn test_wrong_target_type_is_a_mismatch() {
        let members = collect_members::<Pump>();
        let wrong = Base {
            serial: String::new(),
        };
        assert_eq!(
            (members.properties[0].getter)(&wrong),
            Err(AdapterError::TypeMismatch { expected: "Pump" })
        );
    }

    struct Station {
        pump: Pump,
    }

    impl Exposable for Station {
        fn describe(t: &mut TypeBuilder<Self>) {
            t.extends::<Pump>(|s| &s.pump);
        }
    }

    #[test]
    fn test_ancestor_views_chain_through_extends() {
        let members = collect_members::<Station>();
        let names: Vec<_> = members.ancestors.iter().map(|(a, _)| a.name()).collect();
        assert_eq!(names, vec!["Pump", "Base"]);

        let station = Station { pump: pump() };
        let base = members.ancestors[1].1.view(&station).unwrap();
        assert_eq!(base.downcast_ref::<Base>().unwrap().serial, "P-1");
        assert!(members.ancestors[0].1.view(&pump()).is_err());
    }
}
