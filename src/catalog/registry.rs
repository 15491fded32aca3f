//! Operation catalog: the immutable registry of tool operations.
//!
//! The catalog is assembled once at startup and never mutated afterwards, so it can
//! be shared behind an `Arc` by any number of concurrent invocations.

use super::builtin;
use super::types::{ArgumentLocation, OperationDescriptor};
use crate::error::{AdapterError, AdapterResult, BuildError, BuildResult};
use std::collections::HashMap;

/// Registry of operation descriptors keyed by unique name.
#[derive(Debug, Clone)]
pub struct OperationCatalog {
    operations: Vec<OperationDescriptor>,
    index: HashMap<String, usize>,
}

impl OperationCatalog {
    /// Build a catalog from descriptors, preserving their order.
    ///
    /// Fails on duplicate names, path placeholders without a matching path argument
    /// (and the reverse), and fan-outs that reference unknown operations or
    /// arguments.
    pub fn new(operations: Vec<OperationDescriptor>) -> BuildResult<Self> {
        let mut index = HashMap::with_capacity(operations.len());
        for (position, descriptor) in operations.iter().enumerate() {
            if index.insert(descriptor.name.clone(), position).is_some() {
                return Err(BuildError::DuplicateOperation {
                    name: descriptor.name.clone(),
                });
            }
            Self::check_descriptor(descriptor)?;
        }

        let catalog = Self { operations, index };
        catalog.check_fan_outs()?;
        Ok(catalog)
    }

    /// The Freshservice catalog shipped with the adapter.
    pub fn freshservice() -> BuildResult<Self> {
        Self::new(builtin::operations())
    }

    /// Resolve an operation by name.
    pub fn lookup(&self, name: &str) -> AdapterResult<&OperationDescriptor> {
        self.get(name)
            .ok_or_else(|| AdapterError::unknown_operation(name))
    }

    pub fn get(&self, name: &str) -> Option<&OperationDescriptor> {
        self.index.get(name).map(|&position| &self.operations[position])
    }

    /// All operations, in registration order.
    pub fn list(&self) -> &[OperationDescriptor] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    fn check_descriptor(descriptor: &OperationDescriptor) -> BuildResult<()> {
        let invalid = |message: String| BuildError::InvalidDescriptor {
            name: descriptor.name.clone(),
            message,
        };

        let placeholders = descriptor.endpoint.placeholders();
        for placeholder in &placeholders {
            match descriptor.argument(placeholder) {
                Some(arg) if arg.location == ArgumentLocation::Path && arg.required => {}
                _ => {
                    return Err(invalid(format!(
                        "path placeholder '{{{placeholder}}}' needs a required path argument"
                    )));
                }
            }
        }

        for (position, arg) in descriptor.arguments.iter().enumerate() {
            if descriptor.arguments[..position]
                .iter()
                .any(|earlier| earlier.name == arg.name)
            {
                return Err(invalid(format!("argument '{}' declared twice", arg.name)));
            }
            if arg.location == ArgumentLocation::Path && !placeholders.contains(&arg.name.as_str()) {
                return Err(invalid(format!(
                    "path argument '{}' has no placeholder",
                    arg.name
                )));
            }
        }
        Ok(())
    }

    fn check_fan_outs(&self) -> BuildResult<()> {
        for descriptor in &self.operations {
            let Some(fan_out) = &descriptor.fan_out else {
                continue;
            };
            let target = self.get(&fan_out.operation).ok_or_else(|| {
                BuildError::InvalidDescriptor {
                    name: descriptor.name.clone(),
                    message: format!("fan-out targets unknown operation '{}'", fan_out.operation),
                }
            })?;
            if target.argument(&fan_out.argument).is_none() || target.pagination.is_paginated() {
                return Err(BuildError::InvalidDescriptor {
                    name: descriptor.name.clone(),
                    message: format!(
                        "fan-out target '{}' must be a single-entity operation taking '{}'",
                        fan_out.operation, fan_out.argument
                    ),
                });
            }
        }
        Ok(())
    }
}
