//! Schema-driven metadata parser
//!
//! [`MetadataParser`] walks an untyped JSON document and resolves every field
//! node against a [`FieldTypeRegistry`]. Vocabulary failures inside compound
//! fields are collected rather than raised, so a registered [`RemapPolicy`]
//! can turn them into a corrected field.
//!
//! The parser holds no per-document state; each call builds its own parse
//! context and returns the non-fatal events it collected as
//! [`ParseWarning`]s next to the result.

mod compound;
mod document;
mod node;
mod remap;
pub mod tabular;
mod vocabulary;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ParserConfig;
use crate::error::{AggregatedVocabularyFailure, FieldError, ParseError, Result, VocabularyViolation};
use crate::license::LicenseCatalog;
use crate::model::{ExternalRegistration, Field, FieldValue, PrimitiveValue};
use crate::registry::FieldTypeRegistry;
use crate::schema::{FieldKind, FieldTypeDescriptor, TypeClass};

pub use document::DocumentStage;
pub use remap::{OverflowChildRemap, RemapPolicy, RemapRegistry};

use node::Object;

/// How much of a field node's declared shape is checked against the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    /// `multiple` and `typeClass` must be present and agree with the registry
    Full,
    /// Declared `multiple` and `typeClass` are ignored
    Partial,
}

/// Runtime switches for one parser
#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub lenient: bool,
    pub max_depth: usize,
    pub default_authority: Option<String>,
    pub default_protocol: Option<String>,
    pub allowed_metadata_languages: Vec<String>,
    pub allow_custom_terms: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::from(&ParserConfig::default())
    }
}

impl From<&ParserConfig> for ParseOptions {
    fn from(config: &ParserConfig) -> Self {
        Self {
            lenient: config.parser.lenient,
            max_depth: config.parser.max_depth,
            default_authority: config.dataset.default_authority.clone(),
            default_protocol: config.dataset.default_protocol.clone(),
            allowed_metadata_languages: config.dataset.allowed_metadata_languages.clone(),
            allow_custom_terms: config.dataset.allow_custom_terms,
        }
    }
}

/// A non-fatal event observed during a parse
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ParseWarning {
    /// The external vocabulary store refused a value that passed validation
    ExternalRegistrationFailed {
        field: String,
        value: String,
        reason: String,
    },
    /// A field node named a type the registry does not know
    IgnoredUnknownField { type_name: String },
    /// Invalid vocabulary values were moved by a remap policy
    RemappedVocabulary { field: String, values: Vec<String> },
    /// A file checksum declared an unsupported algorithm
    InvalidChecksumType { file: String, checksum_type: String },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExternalRegistrationFailed { field, value, reason } => {
                write!(f, "could not register '{}' for {}: {}", value, field, reason)
            }
            Self::IgnoredUnknownField { type_name } => write!(f, "ignored unknown field type '{}'", type_name),
            Self::RemappedVocabulary { field, values } => {
                write!(f, "remapped invalid values of {}: {}", field, values.join(", "))
            }
            Self::InvalidChecksumType { file, checksum_type } => {
                write!(f, "ignored checksum of {} with unsupported type '{}'", file, checksum_type)
            }
        }
    }
}

/// A parse result together with the warnings it produced
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    pub value: T,
    pub warnings: Vec<ParseWarning>,
}

impl<T> Parsed<T> {
    pub fn into_value(self) -> T {
        self.value
    }
}

/// Mutable state of one parse call
#[derive(Debug, Default)]
pub(crate) struct ParseContext {
    depth: usize,
    warnings: Vec<ParseWarning>,
}

impl ParseContext {
    pub(crate) fn warn(&mut self, warning: ParseWarning) {
        self.warnings.push(warning);
    }

    fn finish<T>(self, value: T) -> Parsed<T> {
        Parsed {
            value,
            warnings: self.warnings,
        }
    }
}

/// Parses metadata documents against a field type registry
pub struct MetadataParser<'a> {
    registry: &'a dyn FieldTypeRegistry,
    licenses: Option<&'a dyn LicenseCatalog>,
    remaps: RemapRegistry,
    options: ParseOptions,
}

impl<'a> MetadataParser<'a> {
    /// Parser with default options and the default remap policies
    pub fn new(registry: &'a dyn FieldTypeRegistry) -> Self {
        Self {
            registry,
            licenses: None,
            remaps: RemapRegistry::with_defaults(),
            options: ParseOptions::default(),
        }
    }

    pub fn from_config(registry: &'a dyn FieldTypeRegistry, config: &ParserConfig) -> Self {
        Self {
            registry,
            licenses: None,
            remaps: RemapRegistry::from_config(&config.remap),
            options: ParseOptions::from(config),
        }
    }

    pub fn with_licenses(mut self, licenses: &'a dyn LicenseCatalog) -> Self {
        self.licenses = Some(licenses);
        self
    }

    pub fn with_remaps(mut self, remaps: RemapRegistry) -> Self {
        self.remaps = remaps;
        self
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn lenient(mut self, lenient: bool) -> Self {
        self.options.lenient = lenient;
        self
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn registry(&self) -> &'a dyn FieldTypeRegistry {
        self.registry
    }

    /// Resolve one field node with full validation
    ///
    /// Returns `Ok(None)` for field types the registry does not know.
    pub fn parse_field(&self, node: &Value) -> Result<Option<Field>> {
        self.resolve_field(node, Validation::Full).map(Parsed::into_value)
    }

    /// Resolve one field node, keeping the warnings it produced
    pub fn resolve_field(&self, node: &Value, validation: Validation) -> Result<Parsed<Option<Field>>> {
        let mut cx = ParseContext::default();
        let field = self.resolve(node, validation, &mut cx).map_err(|e| self.into_parse_error(e))?;
        Ok(cx.finish(field))
    }

    pub(crate) fn resolve(&self, node: &Value, validation: Validation, cx: &mut ParseContext) -> std::result::Result<Option<Field>, FieldError> {
        let obj = node::as_object(node, "field")?;
        let type_name = match obj.get("typeName").and_then(Value::as_str) {
            Some(name) => name,
            None if validation == Validation::Full => {
                return Err(ParseError::structural("field has no typeName").into());
            }
            None => "",
        };

        let Some(field_type) = self.registry.lookup(type_name) else {
            warn!(type_name, "ignoring field of unknown type");
            cx.warn(ParseWarning::IgnoredUnknownField {
                type_name: type_name.to_string(),
            });
            return Ok(None);
        };

        if validation == Validation::Full {
            check_declared_shape(&field_type, obj)?;
        }

        if cx.depth >= self.options.max_depth {
            return Err(ParseError::structural(format!(
                "field {} is nested deeper than {} levels",
                field_type.name, self.options.max_depth
            ))
            .into());
        }

        debug!(field = %field_type.name, class = %field_type.type_class(), depth = cx.depth, "resolving field");
        cx.depth += 1;
        let result = self.dispatch(&field_type, obj, validation, cx);
        cx.depth -= 1;
        result.map(Some)
    }

    fn dispatch(
        &self,
        field_type: &Arc<FieldTypeDescriptor>,
        obj: &Object,
        validation: Validation,
        cx: &mut ParseContext,
    ) -> std::result::Result<Field, FieldError> {
        let value = match &field_type.kind {
            FieldKind::Primitive => FieldValue::Primitive(self.parse_primitive(field_type, obj, cx)?),
            FieldKind::ControlledVocabulary => {
                FieldValue::ControlledVocabulary(self.parse_vocabulary_values(field_type, obj)?)
            }
            FieldKind::Compound { .. } => match self.parse_compound(field_type, obj, validation, cx) {
                Ok(values) => FieldValue::Compound(values),
                Err(FieldError::Aggregated(failure)) => return self.remap(field_type, failure, cx),
                Err(err) => return Err(err),
            },
        };
        Ok(Field::new(field_type.clone(), value)?)
    }

    fn remap(
        &self,
        field_type: &Arc<FieldTypeDescriptor>,
        failure: AggregatedVocabularyFailure,
        cx: &mut ParseContext,
    ) -> std::result::Result<Field, FieldError> {
        let Some(policy) = self.remaps.get(&field_type.name) else {
            return Err(FieldError::Aggregated(failure));
        };

        let values: Vec<String> = failure.violations.iter().map(|v| v.value.clone()).collect();
        let field = policy.remap(self.registry, field_type, failure)?;
        warn!(field = %field_type.name, values = ?values, "remapped invalid vocabulary values");
        cx.warn(ParseWarning::RemappedVocabulary {
            field: field_type.name.clone(),
            values,
        });
        Ok(field)
    }

    fn parse_primitive(
        &self,
        field_type: &FieldTypeDescriptor,
        obj: &Object,
        cx: &mut ParseContext,
    ) -> Result<Vec<PrimitiveValue>> {
        let mut values: Vec<PrimitiveValue> = raw_values(field_type, obj)?
            .into_iter()
            .enumerate()
            .map(|(order, raw)| PrimitiveValue::new(raw, order))
            .collect();

        let Some(binding) = self.registry.external_vocabulary_binding(field_type) else {
            return Ok(values);
        };

        if let Some(rejected) = values.iter().find(|v| !self.registry.validate_external(binding, &v.value)) {
            return Err(ParseError::ExternalVocabulary {
                field: field_type.name.clone(),
                value: rejected.value.clone(),
            });
        }

        for value in &mut values {
            let registered = match self.registry.register_external(binding, &value.value) {
                Ok(()) => true,
                Err(err) => {
                    warn!(field = %field_type.name, value = %value.value, error = %err, "external vocabulary registration failed");
                    cx.warn(ParseWarning::ExternalRegistrationFailed {
                        field: field_type.name.clone(),
                        value: value.value.clone(),
                        reason: err.to_string(),
                    });
                    false
                }
            };
            value.external = Some(ExternalRegistration {
                binding: binding.name.clone(),
                registered,
            });
        }
        Ok(values)
    }

    /// Convert a recursion outcome into the public error
    pub(crate) fn into_parse_error(&self, err: FieldError) -> ParseError {
        match err {
            FieldError::Fatal(err) => err,
            FieldError::Vocabulary(mut violations) if violations.len() == 1 => {
                self.unknown_value(violations.remove(0))
            }
            FieldError::Vocabulary(violations) => {
                ParseError::AggregatedVocabularyFailure(AggregatedVocabularyFailure {
                    type_name: violations
                        .first()
                        .map(|v| v.type_name.clone())
                        .unwrap_or_default(),
                    violations,
                    valid_values: Vec::new(),
                })
            }
            FieldError::Aggregated(failure) => ParseError::AggregatedVocabularyFailure(failure),
        }
    }

    pub(crate) fn unknown_value(&self, violation: VocabularyViolation) -> ParseError {
        let suggestions = self
            .registry
            .lookup(&violation.type_name)
            .map(|ft| self.registry.suggest_vocabulary(&ft, &violation.value, 3))
            .unwrap_or_default();
        ParseError::UnknownVocabularyValue {
            field: violation.type_name,
            value: violation.value,
            suggestions,
        }
    }
}

/// Compare the document's `multiple` and `typeClass` against the registry
fn check_declared_shape(field_type: &FieldTypeDescriptor, obj: &Object) -> Result<()> {
    let multiple = obj
        .get("multiple")
        .and_then(Value::as_bool)
        .ok_or_else(|| ParseError::structural(format!("field {} does not declare multiple", field_type.name)))?;
    if multiple != field_type.allows_multiple {
        return Err(ParseError::Multiplicity {
            field: field_type.name.clone(),
            message: format!(
                "document declares multiple={}, schema allows multiple={}",
                multiple, field_type.allows_multiple
            ),
        });
    }

    let declared = obj
        .get("typeClass")
        .and_then(Value::as_str)
        .ok_or_else(|| ParseError::structural(format!("field {} does not declare typeClass", field_type.name)))?;
    if TypeClass::parse(declared) != Some(field_type.type_class()) {
        return Err(ParseError::TypeMismatch {
            field: field_type.name.clone(),
            expected: field_type.type_class(),
            found: declared.to_string(),
        });
    }
    Ok(())
}

/// Raw strings of a primitive or vocabulary field, one per value
fn raw_values<'v>(field_type: &FieldTypeDescriptor, obj: &'v Object) -> Result<Vec<&'v str>> {
    let value = node::present(obj, "value")
        .ok_or_else(|| ParseError::structural(format!("field {} has no value", field_type.name)))?;

    let not_a_string = || ParseError::structural(format!("values of {} should be strings", field_type.name));

    if field_type.allows_multiple {
        let items = value.as_array().ok_or_else(|| ParseError::Multiplicity {
            field: field_type.name.clone(),
            message: "expected an array of values".to_string(),
        })?;
        items.iter().map(|v| v.as_str().ok_or_else(not_a_string)).collect()
    } else {
        match value {
            Value::String(s) => Ok(vec![s.as_str()]),
            Value::Array(_) => Err(ParseError::Multiplicity {
                field: field_type.name.clone(),
                message: "expected a single value".to_string(),
            }),
            _ => Err(not_a_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_registry;
    use serde_json::json;

    #[test]
    fn test_single_primitive_is_trimmed() {
        let registry = sample_registry();
        let parser = MetadataParser::new(&registry);
        let node = json!({"typeName": "title", "multiple": false, "typeClass": "primitive", "value": "  Dark matter  "});

        let field = parser.parse_field(&node).unwrap().unwrap();
        assert_eq!(field.display_values(), vec!["Dark matter"]);
        assert_eq!(field.primitive_values()[0].display_order, 0);
    }

    #[test]
    fn test_multi_primitive_keeps_order() {
        let registry = sample_registry();
        let parser = MetadataParser::new(&registry);
        let node = json!({"typeName": "kindOfData", "multiple": true, "typeClass": "primitive", "value": ["survey", "interview"]});

        let field = parser.parse_field(&node).unwrap().unwrap();
        let orders: Vec<usize> = field.primitive_values().iter().map(|v| v.display_order).collect();
        assert_eq!(field.display_values(), vec!["survey", "interview"]);
        assert_eq!(orders, vec![0, 1]);
    }

    #[test]
    fn test_unknown_type_is_ignored_with_warning() {
        let registry = sample_registry();
        let parser = MetadataParser::new(&registry);
        let node = json!({"typeName": "mystery", "multiple": false, "typeClass": "primitive", "value": "x"});

        let parsed = parser.resolve_field(&node, Validation::Full).unwrap();
        assert!(parsed.value.is_none());
        assert_eq!(
            parsed.warnings,
            vec![ParseWarning::IgnoredUnknownField { type_name: "mystery".to_string() }]
        );
    }

    #[test]
    fn test_missing_type_name() {
        let registry = sample_registry();
        let parser = MetadataParser::new(&registry);
        let node = json!({"multiple": false, "typeClass": "primitive", "value": "x"});

        match parser.parse_field(&node) {
            Err(ParseError::Structural(message)) => assert!(message.contains("typeName")),
            other => panic!("Expected Structural, got {:?}", other),
        }
        let parsed = parser.resolve_field(&node, Validation::Partial).unwrap();
        assert!(parsed.value.is_none());
    }

    #[test]
    fn test_declared_multiple_disagreeing_with_schema() {
        let registry = sample_registry();
        let parser = MetadataParser::new(&registry);
        let node = json!({"typeName": "title", "multiple": true, "typeClass": "primitive", "value": ["a"]});

        assert!(matches!(parser.parse_field(&node), Err(ParseError::Multiplicity { .. })));
    }

    #[test]
    fn test_array_for_single_field_fails_before_vocabulary() {
        let registry = sample_registry();
        let parser = MetadataParser::new(&registry);
        let node = json!({"typeName": "language", "multiple": false, "typeClass": "controlledVocabulary", "value": ["Klingon", "Elvish"]});

        assert!(matches!(parser.parse_field(&node), Err(ParseError::Multiplicity { .. })));
    }

    #[test]
    fn test_declared_type_class_mismatch() {
        let registry = sample_registry();
        let parser = MetadataParser::new(&registry);
        let node = json!({"typeName": "author", "multiple": true, "typeClass": "primitive", "value": ["Smith"]});

        match parser.parse_field(&node) {
            Err(ParseError::TypeMismatch { field, expected, found }) => {
                assert_eq!(field, "author");
                assert_eq!(expected, TypeClass::Compound);
                assert_eq!(found, "primitive");
            }
            other => panic!("Expected TypeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_partial_validation_skips_declared_shape() {
        let registry = sample_registry();
        let parser = MetadataParser::new(&registry);
        let node = json!({"typeName": "title", "value": "Untitled"});

        assert!(matches!(parser.parse_field(&node), Err(ParseError::Structural(_))));
        let parsed = parser.resolve_field(&node, Validation::Partial).unwrap();
        assert_eq!(parsed.value.unwrap().display_values(), vec!["Untitled"]);
    }

    #[test]
    fn test_external_vocabulary_registers_values() {
        let registry = sample_registry();
        let parser = MetadataParser::new(&registry);
        let uri = "http://id.loc.gov/authorities/subjects/sh2008000545";
        let node = json!({"typeName": "keywordTermURI", "multiple": false, "typeClass": "primitive", "value": uri});

        let field = parser.parse_field(&node).unwrap().unwrap();
        let external = field.primitive_values()[0].external.as_ref().unwrap();
        assert!(external.registered);
        assert_eq!(registry.external_terms(&external.binding), vec![uri.to_string()]);
    }

    #[test]
    fn test_external_vocabulary_rejection_is_fatal_even_when_lenient() {
        let registry = sample_registry();
        let parser = MetadataParser::new(&registry).lenient(true);
        let node = json!({"typeName": "keywordTermURI", "multiple": false, "typeClass": "primitive", "value": "https://example.org/term"});

        match parser.parse_field(&node) {
            Err(ParseError::ExternalVocabulary { field, value }) => {
                assert_eq!(field, "keywordTermURI");
                assert_eq!(value, "https://example.org/term");
            }
            other => panic!("Expected ExternalVocabulary, got {:?}", other),
        }
    }

    #[test]
    fn test_depth_limit() {
        let registry = sample_registry();
        let options = ParseOptions {
            max_depth: 2,
            ..ParseOptions::default()
        };
        let parser = MetadataParser::new(&registry).with_options(options);
        let node = json!({
            "typeName": "project", "multiple": false, "typeClass": "compound",
            "value": {
                "grant": {
                    "typeName": "grant", "multiple": true, "typeClass": "compound",
                    "value": [{
                        "grantAgency": {"typeName": "grantAgency", "multiple": false, "typeClass": "primitive", "value": "NSF"}
                    }]
                }
            }
        });

        assert!(matches!(parser.parse_field(&node), Err(ParseError::Structural(_))));
        let parser = MetadataParser::new(&registry);
        assert!(parser.parse_field(&node).unwrap().is_some());
    }
}
