//! Recovery policies for vocabulary failures in compound fields

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::RemapSection;
use crate::error::{AggregatedVocabularyFailure, ParseError, Result};
use crate::model::{CompoundValue, Field, FieldValue, PrimitiveValue};
use crate::registry::FieldTypeRegistry;
use crate::schema::{FieldTypeDescriptor, TypeClass};

/// Turns an aggregated vocabulary failure into a valid field
pub trait RemapPolicy: Send + Sync + fmt::Debug {
    fn remap(
        &self,
        registry: &dyn FieldTypeRegistry,
        field_type: &Arc<FieldTypeDescriptor>,
        failure: AggregatedVocabularyFailure,
    ) -> Result<Field>;
}

/// Keeps the valid compound values and appends one value per rejected raw
/// string, holding it in a free-text child
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverflowChildRemap {
    overflow_child: String,
}

impl OverflowChildRemap {
    pub fn new(overflow_child: impl Into<String>) -> Self {
        Self {
            overflow_child: overflow_child.into(),
        }
    }

    pub fn overflow_child(&self) -> &str {
        &self.overflow_child
    }
}

impl RemapPolicy for OverflowChildRemap {
    fn remap(
        &self,
        registry: &dyn FieldTypeRegistry,
        field_type: &Arc<FieldTypeDescriptor>,
        failure: AggregatedVocabularyFailure,
    ) -> Result<Field> {
        if !field_type.allows_multiple {
            return Err(ParseError::structural(format!(
                "cannot remap into {}: single-valued compound {} has no room for extra values",
                self.overflow_child, field_type.name
            )));
        }
        if !field_type.has_child(&self.overflow_child) {
            return Err(ParseError::structural(format!(
                "{} is not a child type of {}",
                self.overflow_child, field_type.name
            )));
        }
        let overflow_type = registry
            .lookup(&self.overflow_child)
            .ok_or_else(|| ParseError::UnknownFieldType(self.overflow_child.clone()))?;
        if overflow_type.type_class() != TypeClass::Primitive {
            return Err(ParseError::TypeMismatch {
                field: overflow_type.name.clone(),
                expected: TypeClass::Primitive,
                found: overflow_type.type_class().to_string(),
            });
        }

        let mut values = failure.valid_values;
        let mut next_order = values.iter().map(|v| v.display_order + 1).max().unwrap_or(0);

        for violation in failure.violations {
            let child = Field::new(
                overflow_type.clone(),
                FieldValue::Primitive(vec![PrimitiveValue::new(&violation.value, 0)]),
            )?;
            let mut synthetic = CompoundValue::new(next_order);
            synthetic.push_child(child)?;
            values.push(synthetic);
            next_order += 1;
        }

        Field::new(field_type.clone(), FieldValue::Compound(values))
    }
}

/// Remap policies keyed by compound field type name
#[derive(Debug, Clone, Default)]
pub struct RemapRegistry {
    policies: HashMap<String, Arc<dyn RemapPolicy>>,
}

impl RemapRegistry {
    /// No policies: every aggregated failure is fatal
    pub fn new() -> Self {
        Self::default()
    }

    /// Geographic coverage overflows into `otherGeographicCoverage`
    pub fn with_defaults() -> Self {
        Self::from_config(&RemapSection::default())
    }

    pub fn from_config(section: &RemapSection) -> Self {
        let mut registry = Self::new();
        if section.enabled {
            for policy in &section.policies {
                registry.register(&policy.field, OverflowChildRemap::new(&policy.overflow_child));
            }
        }
        registry
    }

    /// Register a policy, replacing any previous one for the type
    pub fn register(&mut self, type_name: impl Into<String>, policy: impl RemapPolicy + 'static) {
        self.policies.insert(type_name.into(), Arc::new(policy));
    }

    pub fn get(&self, type_name: &str) -> Option<&dyn RemapPolicy> {
        self.policies.get(type_name).map(|p| p.as_ref())
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}
