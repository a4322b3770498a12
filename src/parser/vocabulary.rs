//! Controlled vocabulary resolution

use tracing::debug;

use super::node::Object;
use super::{raw_values, MetadataParser};
use crate::error::{FieldError, ParseError, Result, VocabularyViolation};
use crate::model::ControlledVocabularyEntry;
use crate::schema::{FieldTypeDescriptor, TypeClass};

impl<'a> MetadataParser<'a> {
    /// Resolve a single raw value against the vocabulary of `type_name`
    ///
    /// Outside a compound context a miss is fatal.
    pub fn resolve_vocabulary(&self, type_name: &str, raw: &str) -> Result<ControlledVocabularyEntry> {
        let field_type = self
            .registry
            .lookup(type_name)
            .ok_or_else(|| ParseError::UnknownFieldType(type_name.to_string()))?;
        if field_type.type_class() != TypeClass::ControlledVocabulary {
            return Err(ParseError::TypeMismatch {
                field: field_type.name.clone(),
                expected: TypeClass::ControlledVocabulary,
                found: field_type.type_class().to_string(),
            });
        }

        self.match_term(&field_type, raw)
            .ok_or_else(|| self.unknown_value(VocabularyViolation::new(type_name, raw)))
    }

    /// Resolve every raw value of a vocabulary field
    ///
    /// Misses are returned together as [`FieldError::Vocabulary`] so an
    /// enclosing compound can collect them.
    pub(crate) fn parse_vocabulary_values(
        &self,
        field_type: &FieldTypeDescriptor,
        obj: &Object,
    ) -> std::result::Result<Vec<ControlledVocabularyEntry>, FieldError> {
        let mut entries: Vec<ControlledVocabularyEntry> = Vec::new();
        let mut violations = Vec::new();

        for raw in raw_values(field_type, obj)? {
            match self.match_term(field_type, raw) {
                Some(entry) if entries.iter().any(|e| e.same_term(&entry)) => {
                    debug!(field = %field_type.name, value = raw, "dropping duplicate vocabulary value");
                }
                Some(entry) => entries.push(entry),
                None => violations.push(VocabularyViolation::new(&field_type.name, raw)),
            }
        }

        if violations.is_empty() {
            Ok(entries)
        } else {
            Err(FieldError::Vocabulary(violations))
        }
    }

    fn match_term(&self, field_type: &FieldTypeDescriptor, raw: &str) -> Option<ControlledVocabularyEntry> {
        self.registry
            .resolve_vocabulary(field_type, raw, self.options.lenient)
            .map(|term| ControlledVocabularyEntry {
                type_name: field_type.name.clone(),
                term,
            })
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ParseError;
    use crate::parser::MetadataParser;
    use crate::testing::sample_registry;
    use serde_json::json;

    #[test]
    fn test_direct_miss_is_fatal() {
        let registry = sample_registry();
        let parser = MetadataParser::new(&registry);

        match parser.resolve_vocabulary("subject", "Chemestry") {
            Err(ParseError::UnknownVocabularyValue { field, value, suggestions }) => {
                assert_eq!(field, "subject");
                assert_eq!(value, "Chemestry");
                assert!(suggestions.contains(&"Chemistry".to_string()));
            }
            other => panic!("Expected UnknownVocabularyValue, got {:?}", other),
        }
    }

    #[test]
    fn test_lenient_alias() {
        let registry = sample_registry();
        let strict = MetadataParser::new(&registry);
        assert!(strict.resolve_vocabulary("language", "en").is_err());

        let lenient = MetadataParser::new(&registry).lenient(true);
        let entry = lenient.resolve_vocabulary("language", "EN").unwrap();
        assert_eq!(entry.term.value, "English");
        assert_eq!(entry.term.identifier.as_deref(), Some("eng"));
    }

    #[test]
    fn test_non_vocabulary_type() {
        let registry = sample_registry();
        let parser = MetadataParser::new(&registry);
        assert!(matches!(
            parser.resolve_vocabulary("title", "x"),
            Err(ParseError::TypeMismatch { .. })
        ));
        assert!(matches!(
            parser.resolve_vocabulary("nothing", "x"),
            Err(ParseError::UnknownFieldType(_))
        ));
    }

    #[test]
    fn test_duplicates_coalesce_in_first_seen_order() {
        let registry = sample_registry();
        let parser = MetadataParser::new(&registry).lenient(true);
        let node = json!({
            "typeName": "subject", "multiple": true, "typeClass": "controlledVocabulary",
            "value": ["Physics", "Medicine", "physics", "CS", "Computer and Information Science"]
        });

        let field = parser.parse_field(&node).unwrap().unwrap();
        assert_eq!(
            field.display_values(),
            vec!["Physics", "Medicine", "Computer and Information Science"]
        );
    }

    #[test]
    fn test_only_the_unknown_value_is_reported() {
        let registry = sample_registry();
        let parser = MetadataParser::new(&registry);
        let node = json!({
            "typeName": "subject", "multiple": true, "typeClass": "controlledVocabulary",
            "value": ["Medicine", "Zzzz"]
        });

        match parser.parse_field(&node) {
            Err(ParseError::UnknownVocabularyValue { value, .. }) => assert_eq!(value, "Zzzz"),
            other => panic!("Expected UnknownVocabularyValue, got {:?}", other),
        }
    }

    #[test]
    fn test_several_unknown_values_aggregate() {
        let registry = sample_registry();
        let parser = MetadataParser::new(&registry);
        let node = json!({
            "typeName": "subject", "multiple": true, "typeClass": "controlledVocabulary",
            "value": ["Alchemy", "Medicine", "Astrology"]
        });

        match parser.parse_field(&node) {
            Err(ParseError::AggregatedVocabularyFailure(failure)) => {
                let values: Vec<&str> = failure.violations.iter().map(|v| v.value.as_str()).collect();
                assert_eq!(values, vec!["Alchemy", "Astrology"]);
                assert_eq!(failure.type_name, "subject");
            }
            other => panic!("Expected AggregatedVocabularyFailure, got {:?}", other),
        }
    }
}
