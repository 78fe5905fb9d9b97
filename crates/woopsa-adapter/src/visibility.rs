//! Visibility policy: which members of a host object are published.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::description::{DeclaringType, MemberInfo, MemberKind};
use crate::host::ExposedType;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Visibility: u32 {
        /// Members without an explicit override are published.
        const DEFAULT_IS_VISIBLE = 1;
        /// Methods with special names are published.
        const METHOD_SPECIAL_NAME = 1 << 1;
        /// Members declared on an ancestor type are published.
        const INHERITED = 1 << 2;
        /// Object collections are published as collections of items.
        const OBJECT_COLLECTION = 1 << 3;
        /// Members of the universal base object are published.
        const OBJECT_CLASS_MEMBERS = 1 << 4;
        /// Members of the standard list types are published.
        const LIST_CLASS_MEMBERS = 1 << 5;

        const ALL = Self::DEFAULT_IS_VISIBLE.bits()
            | Self::METHOD_SPECIAL_NAME.bits()
            | Self::INHERITED.bits()
            | Self::OBJECT_COLLECTION.bits()
            | Self::OBJECT_CLASS_MEMBERS.bits()
            | Self::LIST_CLASS_MEMBERS.bits();
    }
}

impl Default for Visibility {
    fn default() -> Self {
        Visibility::DEFAULT_IS_VISIBLE | Visibility::INHERITED
    }
}

/// Input and output of a [`VisibilityHook`].
#[derive(Debug)]
pub struct VisibilityCheck<'a> {
    pub member: &'a MemberInfo,
    /// Name of the node whose member is being checked.
    pub node: &'a str,
    /// Tentative decision of the structural rules; the hook may overwrite it.
    pub visible: bool,
}

pub type VisibilityHook = Arc<dyn Fn(&mut VisibilityCheck<'_>) + Send + Sync>;

/// Structural rules, before any hook runs. `runtime` is the type of the
/// target instance, not a declared type the node publishes: members of a
/// declared base type count as inherited when the instance is a subtype.
pub fn structural_visibility(flags: Visibility, member: &MemberInfo, runtime: ExposedType) -> bool {
    if let Some(visible) = member.visible {
        return visible;
    }
    if !flags.contains(Visibility::DEFAULT_IS_VISIBLE) {
        return false;
    }
    if member.declaring != DeclaringType::Type(runtime) && !flags.contains(Visibility::INHERITED) {
        return false;
    }
    match member.declaring {
        DeclaringType::ObjectClass if !flags.contains(Visibility::OBJECT_CLASS_MEMBERS) => {
            return false
        }
        DeclaringType::ListClass if !flags.contains(Visibility::LIST_CLASS_MEMBERS) => {
            return false
        }
        _ => {}
    }
    if member.kind == MemberKind::Method
        && member.special_name
        && !flags.contains(Visibility::METHOD_SPECIAL_NAME)
    {
        return false;
    }
    !(member.object_collection && !flags.contains(Visibility::OBJECT_COLLECTION))
}
