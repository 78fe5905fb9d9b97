use std::fmt;
use std::sync::{Arc, Weak};
use tracing::trace;
use woopsa_value::{JsonVariant, ValueKind, WireValue};

use super::AdapterNode;
use crate::description::PropertyDescription;
use crate::error::AdapterError;

/// Name of the synthetic property listing a collection's child identities.
pub const ORDERED_ITEM_IDS: &str = "OrderedItemIds";

enum PropertySource {
    Member(Arc<PropertyDescription>),
    OrderedItemIds,
}

/// A published property of an [`AdapterNode`].
///
/// Reads and writes go through the owner's current target at call time.
pub struct PropertyNode {
    owner: Weak<AdapterNode>,
    source: PropertySource,
}

impl PropertyNode {
    pub(crate) fn member(owner: Weak<AdapterNode>, description: Arc<PropertyDescription>) -> Self {
        Self {
            owner,
            source: PropertySource::Member(description),
        }
    }

    pub(crate) fn ordered_item_ids(owner: Weak<AdapterNode>) -> Self {
        Self {
            owner,
            source: PropertySource::OrderedItemIds,
        }
    }

    pub fn name(&self) -> &str {
        match &self.source {
            PropertySource::Member(description) => description.name(),
            PropertySource::OrderedItemIds => ORDERED_ITEM_IDS,
        }
    }

    pub fn kind(&self) -> ValueKind {
        match &self.source {
            PropertySource::Member(description) => description.kind(),
            PropertySource::OrderedItemIds => ValueKind::JsonData,
        }
    }

    pub fn is_read_only(&self) -> bool {
        match &self.source {
            PropertySource::Member(description) => description.is_read_only(),
            PropertySource::OrderedItemIds => true,
        }
    }

    fn owner(&self) -> Result<Arc<AdapterNode>, AdapterError> {
        self.owner.upgrade().ok_or(AdapterError::Disposed)
    }

    pub fn read(&self) -> Result<WireValue, AdapterError> {
        let owner = self.owner()?;
        match &self.source {
            PropertySource::OrderedItemIds => {
                let ids = JsonVariant::from_text(&owner.ordered_item_ids())?;
                Ok(WireValue::json(ids).with_timestamp(owner.timestamp()))
            }
            PropertySource::Member(description) => {
                let target = owner
                    .bound_target()
                    .ok_or_else(|| AdapterError::NoTarget(owner.name().to_string()))?;
                let value = (description.getter)(target.view()?)?;
                description
                    .converter
                    .to_wire(value, description.kind, owner.timestamp())
            }
        }
    }

    /// Converts `value` to the host type and assigns it. A read-only
    /// property fails before anything is converted.
    pub fn write(&self, value: &WireValue) -> Result<(), AdapterError> {
        let description = match &self.source {
            PropertySource::Member(description) => description,
            PropertySource::OrderedItemIds => {
                return Err(AdapterError::ReadOnly(ORDERED_ITEM_IDS.to_string()))
            }
        };
        let Some(setter) = &description.setter else {
            return Err(AdapterError::ReadOnly(description.name().to_string()));
        };
        let owner = self.owner()?;
        let native = description
            .converter
            .from_wire(value, description.native)?;
        let target = owner
            .bound_target()
            .ok_or_else(|| AdapterError::NoTarget(owner.name().to_string()))?;
        setter(target.view()?, native)?;
        trace!(node = owner.name(), property = description.name(), "property written");
        Ok(())
    }
}

impl fmt::Debug for PropertyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyNode")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .field("read_only", &self.is_read_only())
            .finish()
    }
}
