//! Parsed metadata fields

use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::error::{ParseError, Result};
use crate::schema::{FieldTypeDescriptor, TypeClass, VocabularyTerm};

/// A parsed metadata field instance
///
/// The populated [`FieldValue`] variant always matches the kind of the
/// field's type; the constructors enforce it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    #[serde(rename = "typeName", serialize_with = "serialize_type_name")]
    field_type: Arc<FieldTypeDescriptor>,
    multiple: bool,
    #[serde(flatten)]
    value: FieldValue,
}

/// Values of a field, one variant per structural kind
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "typeClass", content = "value", rename_all = "camelCase")]
pub enum FieldValue {
    Primitive(Vec<PrimitiveValue>),
    ControlledVocabulary(Vec<ControlledVocabularyEntry>),
    Compound(Vec<CompoundValue>),
}

impl FieldValue {
    pub fn type_class(&self) -> TypeClass {
        match self {
            FieldValue::Primitive(_) => TypeClass::Primitive,
            FieldValue::ControlledVocabulary(_) => TypeClass::ControlledVocabulary,
            FieldValue::Compound(_) => TypeClass::Compound,
        }
    }

    fn len(&self) -> usize {
        match self {
            FieldValue::Primitive(values) => values.len(),
            FieldValue::ControlledVocabulary(entries) => entries.len(),
            FieldValue::Compound(values) => values.len(),
        }
    }
}

impl Field {
    /// Build a field, checking the value kind and multiplicity against the type
    pub fn new(field_type: Arc<FieldTypeDescriptor>, value: FieldValue) -> Result<Self> {
        if field_type.type_class() != value.type_class() {
            return Err(ParseError::TypeMismatch {
                field: field_type.name.clone(),
                expected: field_type.type_class(),
                found: value.type_class().to_string(),
            });
        }
        if !field_type.allows_multiple && value.len() > 1 {
            return Err(ParseError::Multiplicity {
                field: field_type.name.clone(),
                message: format!("{} values for a single-valued field", value.len()),
            });
        }
        Ok(Self {
            multiple: field_type.allows_multiple,
            field_type,
            value,
        })
    }

    pub fn field_type(&self) -> &Arc<FieldTypeDescriptor> {
        &self.field_type
    }

    pub fn type_name(&self) -> &str {
        &self.field_type.name
    }

    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    pub fn into_value(self) -> FieldValue {
        self.value
    }

    pub fn primitive_values(&self) -> &[PrimitiveValue] {
        match &self.value {
            FieldValue::Primitive(values) => values,
            _ => &[],
        }
    }

    pub fn vocabulary_entries(&self) -> &[ControlledVocabularyEntry] {
        match &self.value {
            FieldValue::ControlledVocabulary(entries) => entries,
            _ => &[],
        }
    }

    pub fn compound_values(&self) -> &[CompoundValue] {
        match &self.value {
            FieldValue::Compound(values) => values,
            _ => &[],
        }
    }

    /// String form of every value, in display order
    ///
    /// Compound fields have no direct string values.
    pub fn display_values(&self) -> Vec<&str> {
        match &self.value {
            FieldValue::Primitive(values) => values.iter().map(|v| v.value.as_str()).collect(),
            FieldValue::ControlledVocabulary(entries) => {
                entries.iter().map(|e| e.term.value.as_str()).collect()
            }
            FieldValue::Compound(_) => Vec::new(),
        }
    }
}

fn serialize_type_name<S: Serializer>(
    field_type: &Arc<FieldTypeDescriptor>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&field_type.name)
}

/// Marker left on a primitive value accepted through an external vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalRegistration {
    /// Name of the external vocabulary binding
    pub binding: String,
    /// False when the store rejected the registration
    pub registered: bool,
}

/// One scalar field value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimitiveValue {
    pub value: String,
    pub display_order: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external: Option<ExternalRegistration>,
}

impl PrimitiveValue {
    /// Value is trimmed on construction
    pub fn new(value: &str, display_order: usize) -> Self {
        Self {
            value: value.trim().to_string(),
            display_order,
            external: None,
        }
    }
}

/// A resolved controlled vocabulary match
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlledVocabularyEntry {
    pub type_name: String,
    pub term: VocabularyTerm,
}

impl ControlledVocabularyEntry {
    /// Identity used to suppress duplicates within one field
    pub fn same_term(&self, other: &Self) -> bool {
        self.type_name == other.type_name && self.term.value == other.term.value
    }
}

/// One instance of a compound field: a group of child fields with distinct types
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompoundValue {
    pub display_order: usize,
    children: Vec<Field>,
}

impl CompoundValue {
    pub fn new(display_order: usize) -> Self {
        Self {
            display_order,
            children: Vec::new(),
        }
    }

    /// Add a child, rejecting a second child of the same type
    pub fn push_child(&mut self, child: Field) -> Result<()> {
        if self.child(child.type_name()).is_some() {
            return Err(ParseError::structural(format!(
                "duplicate child field {} in one compound value",
                child.type_name()
            )));
        }
        self.children.push(child);
        Ok(())
    }

    pub fn children(&self) -> &[Field] {
        &self.children
    }

    pub fn child(&self, type_name: &str) -> Option<&Field> {
        self.children.iter().find(|c| c.type_name() == type_name)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}
