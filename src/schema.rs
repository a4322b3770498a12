//! Field type descriptors and metadata block definitions

use std::fmt;

use serde::{Deserialize, Serialize};

/// Structural kind a document declares for a field node (`typeClass`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeClass {
    Primitive,
    Compound,
    ControlledVocabulary,
}

impl TypeClass {
    /// The spelling used in documents
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeClass::Primitive => "primitive",
            TypeClass::Compound => "compound",
            TypeClass::ControlledVocabulary => "controlledVocabulary",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "primitive" => Some(TypeClass::Primitive),
            "compound" => Some(TypeClass::Compound),
            "controlledVocabulary" => Some(TypeClass::ControlledVocabulary),
            _ => None,
        }
    }
}

impl fmt::Display for TypeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry-declared kind of a field type
///
/// Child types only exist on the compound variant, so a primitive type with
/// children cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "typeClass", rename_all = "camelCase")]
pub enum FieldKind {
    Primitive,
    ControlledVocabulary,
    Compound {
        #[serde(rename = "childTypes")]
        child_types: Vec<String>,
    },
}

impl FieldKind {
    pub fn type_class(&self) -> TypeClass {
        match self {
            FieldKind::Primitive => TypeClass::Primitive,
            FieldKind::ControlledVocabulary => TypeClass::ControlledVocabulary,
            FieldKind::Compound { .. } => TypeClass::Compound,
        }
    }

    /// Declared child type names; empty for non-compound kinds
    pub fn child_types(&self) -> &[String] {
        match self {
            FieldKind::Compound { child_types } => child_types,
            _ => &[],
        }
    }

    pub fn is_compound(&self) -> bool {
        matches!(self, FieldKind::Compound { .. })
    }
}

/// Binding of a primitive field type to a vocabulary maintained outside the
/// registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalVocabularyBinding {
    /// Identifier of the external vocabulary service
    pub name: String,
    /// Accepted term URI prefixes
    #[serde(default)]
    pub vocabulary_uris: Vec<String>,
    /// Accept any value, still registering it with the store
    #[serde(default)]
    pub allow_free_text: bool,
}

impl ExternalVocabularyBinding {
    /// Whether `value` is acceptable under this binding
    pub fn accepts(&self, value: &str) -> bool {
        self.allow_free_text || self.vocabulary_uris.iter().any(|uri| value.starts_with(uri.as_str()))
    }
}

/// Schema for one named field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldTypeDescriptor {
    pub name: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    pub allows_multiple: bool,
    /// Metadata block the type was defined in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_vocabulary: Option<ExternalVocabularyBinding>,
}

impl FieldTypeDescriptor {
    pub fn primitive(name: impl Into<String>, allows_multiple: bool) -> Self {
        Self::with_kind(name, FieldKind::Primitive, allows_multiple)
    }

    pub fn controlled_vocabulary(name: impl Into<String>, allows_multiple: bool) -> Self {
        Self::with_kind(name, FieldKind::ControlledVocabulary, allows_multiple)
    }

    pub fn compound<I, S>(name: impl Into<String>, allows_multiple: bool, child_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let child_types = child_types.into_iter().map(Into::into).collect();
        Self::with_kind(name, FieldKind::Compound { child_types }, allows_multiple)
    }

    fn with_kind(name: impl Into<String>, kind: FieldKind, allows_multiple: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            allows_multiple,
            block: None,
            external_vocabulary: None,
        }
    }

    pub fn type_class(&self) -> TypeClass {
        self.kind.type_class()
    }

    /// Whether `child` is a declared child type of this (compound) type
    pub fn has_child(&self, child: &str) -> bool {
        self.kind.child_types().iter().any(|c| c == child)
    }
}

/// A term of a controlled vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyTerm {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// Alternate spellings accepted in lenient mode
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternates: Vec<String>,
    #[serde(default)]
    pub display_order: usize,
}

impl VocabularyTerm {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            identifier: None,
            alternates: Vec::new(),
            display_order: 0,
        }
    }
}

/// On-disk form of a metadata block: a named group of field type definitions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataBlockDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub field_types: Vec<FieldTypeDefinition>,
}

/// On-disk form of a field type; checked and converted by the registry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldTypeDefinition {
    pub name: String,
    pub type_class: TypeClass,
    #[serde(default)]
    pub allows_multiple: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vocabulary: Vec<TermDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_vocabulary: Option<ExternalVocabularyBinding>,
}

/// A vocabulary term given either as a bare string or in full
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TermDefinition {
    Plain(String),
    Detailed(VocabularyTerm),
}

impl TermDefinition {
    pub fn into_term(self, display_order: usize) -> VocabularyTerm {
        match self {
            TermDefinition::Plain(value) => VocabularyTerm {
                display_order,
                ..VocabularyTerm::new(value)
            },
            TermDefinition::Detailed(term) => VocabularyTerm { display_order, ..term },
        }
    }
}
