use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::trace;
use woopsa_value::{ValueKind, WireValue};

use super::AdapterNode;
use crate::convert::ValueConverter;
use crate::description::MethodDescription;
use crate::error::AdapterError;
use crate::native::{Args, NativeType};

/// A published method argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentInfo {
    pub name: String,
    pub kind: ValueKind,
}

/// A published method of an [`AdapterNode`], bound to converters for its
/// return value and every argument.
pub struct MethodNode {
    owner: Weak<AdapterNode>,
    description: Arc<MethodDescription>,
    return_kind: ValueKind,
    return_converter: Arc<dyn ValueConverter>,
    arguments: Vec<ArgumentInfo>,
    converters: Vec<(NativeType, Arc<dyn ValueConverter>)>,
}

impl MethodNode {
    pub(crate) fn bind(
        owner: Weak<AdapterNode>,
        description: Arc<MethodDescription>,
    ) -> Result<Self, AdapterError> {
        let unsupported = |reason: String| AdapterError::Unsupported {
            method: description.name().to_string(),
            reason,
        };
        let (Some(return_kind), Some(return_converter)) = (
            description.return_kind,
            description.return_converter.clone(),
        ) else {
            return Err(unsupported(format!(
                "no converter for return type {}",
                description.return_native.name()
            )));
        };

        let mut names = HashSet::new();
        let mut arguments = Vec::with_capacity(description.arguments.len());
        let mut converters = Vec::with_capacity(description.arguments.len());
        for argument in &description.arguments {
            if !names.insert(argument.name.as_str()) {
                return Err(unsupported(format!("duplicate argument {}", argument.name)));
            }
            let (Some(kind), Some(converter)) = (argument.kind, argument.converter.clone()) else {
                return Err(unsupported(format!(
                    "no converter for argument {} of type {}",
                    argument.name,
                    argument.native.name()
                )));
            };
            arguments.push(ArgumentInfo {
                name: argument.name.clone(),
                kind,
            });
            converters.push((argument.native, converter));
        }

        Ok(Self {
            owner,
            description: Arc::clone(&description),
            return_kind,
            return_converter,
            arguments,
            converters,
        })
    }

    pub fn name(&self) -> &str {
        self.description.name()
    }

    /// `Null` for methods without a result.
    pub fn return_kind(&self) -> ValueKind {
        self.return_kind
    }

    pub fn arguments(&self) -> &[ArgumentInfo] {
        &self.arguments
    }

    /// Converts `arguments`, calls the host method on the owner's current
    /// target and converts the result. Methods without a result return
    /// `None`.
    pub fn invoke(&self, arguments: &[WireValue]) -> Result<Option<WireValue>, AdapterError> {
        if arguments.len() != self.arguments.len() {
            return Err(AdapterError::ArgumentCount {
                method: self.name().to_string(),
                expected: self.arguments.len(),
                actual: arguments.len(),
            });
        }
        let owner = self.owner.upgrade().ok_or(AdapterError::Disposed)?;
        let values = arguments
            .iter()
            .zip(&self.converters)
            .map(|(value, (native, converter))| converter.from_wire(value, *native))
            .collect::<Result<Vec<_>, _>>()?;
        let target = owner
            .bound_target()
            .ok_or_else(|| AdapterError::NoTarget(owner.name().to_string()))?;

        let result = (self.description.invoker)(target.view()?, &Args::new(values))?;
        trace!(node = owner.name(), method = self.name(), "method invoked");
        if self.description.return_native == NativeType::Void {
            return Ok(None);
        }
        self.return_converter
            .to_wire(result, self.return_kind, owner.timestamp())
            .map(Some)
    }
}

impl fmt::Debug for MethodNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodNode")
            .field("name", &self.name())
            .field("return_kind", &self.return_kind)
            .field("arguments", &self.arguments)
            .finish()
    }
}
