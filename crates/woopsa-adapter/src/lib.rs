//! `woopsa-adapter` — publishes a graph of host objects as a live Woopsa
//! protocol tree.
//!
//! Host types register their members on a [`TypeBuilder`] by implementing
//! [`Exposable`]. An [`AdapterNode`] binds a target object to the tree: it
//! describes the target's type once (through a shared [`TypeDescriptions`]
//! cache), filters the members with the [`Visibility`] policy and an optional
//! [`VisibilityHook`], and publishes them as properties, methods and child
//! nodes. Object collections publish one child per element, named after a
//! stable identity that survives reordering and is never reused.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use woopsa_adapter::{arg, AdapterNode, Exposable, HostList, TypeBuilder, Visibility};
//! use woopsa_value::WireValue;
//!
//! struct Lamp {
//!     name: &'static str,
//! }
//!
//! impl Exposable for Lamp {
//!     fn describe(t: &mut TypeBuilder<Self>) {
//!         t.property("Name", |lamp| lamp.name.to_string());
//!     }
//! }
//!
//! struct House {
//!     lamps: Arc<HostList<Lamp>>,
//! }
//!
//! impl Exposable for House {
//!     fn describe(t: &mut TypeBuilder<Self>) {
//!         t.item("Lamps", |house| Some(Arc::clone(&house.lamps)));
//!         t.method("Greet", [arg::<String>("who")], |_, args| {
//!             Ok(format!("hello {}", args.get::<String>(0)?))
//!         });
//!     }
//! }
//!
//! let lamps = Arc::new(HostList::observable());
//! lamps.push(Lamp { name: "kitchen" });
//! let root = AdapterNode::builder("House")
//!     .target(Arc::new(House { lamps }))
//!     .visibility(Visibility::default() | Visibility::OBJECT_COLLECTION)
//!     .build();
//!
//! let greet = root.method("Greet").unwrap();
//! let reply = greet.invoke(&[WireValue::text("you")]).unwrap().unwrap();
//! assert_eq!(reply.as_text(), "hello you");
//! assert!(root.find("Lamps/Item0/Name").is_some());
//! ```

mod builder;
pub mod config;
pub mod convert;
pub mod description;
pub mod error;
pub mod host;
pub mod list;
pub mod native;
pub mod node;
pub mod visibility;

pub use builder::{MemberHandle, TypeBuilder};
pub use config::{AdapterConfig, AdapterOptions};
pub use convert::{BuiltinConverter, ConverterRegistry, ValueConverter};
pub use description::{
    DeclaringType, MemberInfo, MemberKind, TypeDescription, TypeDescriptions,
};
pub use error::AdapterError;
pub use host::{
    host, ChangeListener, Exposable, ExposedType, HostCollection, HostObject, HostRef,
    Subscription,
};
pub use list::HostList;
pub use native::{arg, Arg, Args, Native, NativeType, NativeValue};
pub use node::{
    item_id_from_name, item_name, AdapterNode, AdapterNodeBuilder, ArgumentInfo, Element,
    MethodNode, PropertyNode, ITEM_NAME_PREFIX, ORDERED_ITEM_IDS,
};
pub use visibility::{structural_visibility, Visibility, VisibilityCheck, VisibilityHook};
