//! Compound field assembly
//!
//! Each child group of a compound node becomes one [`CompoundValue`]. Child
//! vocabulary misses are collected per node instead of aborting, so valid
//! siblings survive and a remap policy can see both halves.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::node::{self, Object};
use super::{MetadataParser, ParseContext, Validation};
use crate::error::{AggregatedVocabularyFailure, FieldError, ParseError};
use crate::model::{CompoundValue, Field, FieldValue};
use crate::schema::FieldTypeDescriptor;

impl<'a> MetadataParser<'a> {
    pub(crate) fn parse_compound(
        &self,
        field_type: &Arc<FieldTypeDescriptor>,
        obj: &Object,
        validation: Validation,
        cx: &mut ParseContext,
    ) -> Result<Vec<CompoundValue>, FieldError> {
        let mut values = Vec::new();
        let mut violations = Vec::new();

        for (display_order, group) in child_groups(field_type, obj)?.into_iter().enumerate() {
            let mut compound = CompoundValue::new(display_order);

            for child_node in group.values() {
                self.check_child_type(field_type, child_node)?;
                match self.resolve(child_node, validation, cx) {
                    Ok(Some(child)) => compound.push_child(child)?,
                    Ok(None) => {}
                    Err(FieldError::Vocabulary(found)) => violations.extend(found),
                    Err(FieldError::Aggregated(mut nested)) => {
                        let valid_values = std::mem::take(&mut nested.valid_values);
                        if let Some(partial) = self.surviving_values(&nested.type_name, valid_values)? {
                            compound.push_child(partial)?;
                        }
                        violations.extend(nested.violations);
                    }
                    Err(fatal) => return Err(fatal),
                }
            }

            if compound.is_empty() {
                debug!(field = %field_type.name, display_order, "dropping compound value with no valid children");
            } else {
                values.push(compound);
            }
        }

        if violations.is_empty() {
            Ok(values)
        } else {
            Err(FieldError::Aggregated(AggregatedVocabularyFailure {
                type_name: field_type.name.clone(),
                violations,
                valid_values: values,
            }))
        }
    }

    /// Reject a known field type that the compound does not declare as a child
    ///
    /// Runs before the child is resolved, so a child that would fail on its
    /// vocabulary is rejected the same way as one that parses.
    fn check_child_type(&self, field_type: &FieldTypeDescriptor, child_node: &Value) -> Result<(), ParseError> {
        let Some(name) = child_node.get("typeName").and_then(Value::as_str) else {
            return Ok(());
        };
        if self.registry.lookup(name).is_some() && !field_type.has_child(name) {
            return Err(ParseError::structural(format!(
                "field {} is not a child type of {}",
                name, field_type.name
            )));
        }
        Ok(())
    }

    /// The valid part of a nested compound that failed without a remap policy
    fn surviving_values(&self, type_name: &str, valid_values: Vec<CompoundValue>) -> Result<Option<Field>, ParseError> {
        if valid_values.is_empty() {
            return Ok(None);
        }
        let nested_type = self
            .registry
            .lookup(type_name)
            .ok_or_else(|| ParseError::UnknownFieldType(type_name.to_string()))?;
        Field::new(nested_type, FieldValue::Compound(valid_values)).map(Some)
    }
}

/// Child-group objects of a compound node, one per compound value
fn child_groups<'v>(field_type: &FieldTypeDescriptor, obj: &'v Object) -> Result<Vec<&'v Object>, ParseError> {
    let value = node::present(obj, "value")
        .ok_or_else(|| ParseError::structural(format!("field {} has no value", field_type.name)))?;

    let group = |v: &'v Value| {
        v.as_object().ok_or_else(|| {
            ParseError::structural(format!("values of compound field {} should be objects", field_type.name))
        })
    };

    if field_type.allows_multiple {
        let items = value.as_array().ok_or_else(|| ParseError::Multiplicity {
            field: field_type.name.clone(),
            message: "expected an array of child groups".to_string(),
        })?;
        items.iter().map(group).collect()
    } else {
        match value {
            Value::Array(_) => Err(ParseError::Multiplicity {
                field: field_type.name.clone(),
                message: "expected a single child group".to_string(),
            }),
            other => Ok(vec![group(other)?]),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ParseError;
    use crate::parser::{MetadataParser, OverflowChildRemap, ParseWarning, RemapRegistry, Validation};
    use crate::testing::sample_registry;
    use serde_json::{json, Value};

    fn author(name: &str, scheme: Option<&str>) -> Value {
        let mut group = json!({
            "authorName": {"typeName": "authorName", "multiple": false, "typeClass": "primitive", "value": name}
        });
        if let Some(scheme) = scheme {
            group["authorIdentifierScheme"] = json!({
                "typeName": "authorIdentifierScheme", "multiple": false,
                "typeClass": "controlledVocabulary", "value": scheme
            });
        }
        group
    }

    fn authors(groups: Vec<Value>) -> Value {
        json!({"typeName": "author", "multiple": true, "typeClass": "compound", "value": groups})
    }

    #[test]
    fn test_groups_keep_document_order() {
        let registry = sample_registry();
        let parser = MetadataParser::new(&registry);
        let node = authors(vec![author("Curie, Marie", Some("ORCID")), author("Bohr, Niels", None)]);

        let field = parser.parse_field(&node).unwrap().unwrap();
        let values = field.compound_values();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].display_order, 0);
        assert_eq!(values[0].len(), 2);
        assert_eq!(values[1].child("authorName").unwrap().display_values(), vec!["Bohr, Niels"]);
        assert_eq!(values[1].display_order, 1);
    }

    #[test]
    fn test_empty_group_is_dropped_without_renumbering() {
        let registry = sample_registry();
        let parser = MetadataParser::new(&registry);
        let node = authors(vec![
            json!({"mystery": {"typeName": "mystery", "multiple": false, "typeClass": "primitive", "value": "?"}}),
            author("Bohr, Niels", None),
        ]);

        let parsed = parser.resolve_field(&node, Validation::Full).unwrap();
        let field = parsed.value.unwrap();
        assert_eq!(field.compound_values().len(), 1);
        assert_eq!(field.compound_values()[0].display_order, 1);
        assert_eq!(parsed.warnings.len(), 1);
    }

    #[test]
    fn test_child_outside_declared_children() {
        let registry = sample_registry();
        let parser = MetadataParser::new(&registry);
        let mut group = author("Curie, Marie", None);
        group["title"] = json!({"typeName": "title", "multiple": false, "typeClass": "primitive", "value": "Dr"});

        assert!(matches!(
            parser.parse_field(&authors(vec![group])),
            Err(ParseError::Structural(_))
        ));
    }

    #[test]
    fn test_duplicate_child_type_in_one_group() {
        let registry = sample_registry();
        let parser = MetadataParser::new(&registry);
        let group = json!({
            "first": {"typeName": "authorName", "multiple": false, "typeClass": "primitive", "value": "A"},
            "second": {"typeName": "authorName", "multiple": false, "typeClass": "primitive", "value": "B"}
        });

        assert!(matches!(
            parser.parse_field(&authors(vec![group])),
            Err(ParseError::Structural(_))
        ));
    }

    #[test]
    fn test_single_compound_rejects_array() {
        let registry = sample_registry();
        let parser = MetadataParser::new(&registry);
        let node = json!({
            "typeName": "series", "multiple": false, "typeClass": "compound",
            "value": [{"seriesName": {"typeName": "seriesName", "multiple": false, "typeClass": "primitive", "value": "S"}}]
        });

        assert!(matches!(parser.parse_field(&node), Err(ParseError::Multiplicity { .. })));
    }

    #[test]
    fn test_violations_without_policy_surface_with_valid_siblings() {
        let registry = sample_registry();
        let parser = MetadataParser::new(&registry);
        let node = authors(vec![author("Curie, Marie", Some("Scopus")), author("Bohr, Niels", Some("ORCID"))]);

        match parser.parse_field(&node) {
            Err(ParseError::AggregatedVocabularyFailure(failure)) => {
                assert_eq!(failure.type_name, "author");
                assert_eq!(failure.violations.len(), 1);
                assert_eq!(failure.violations[0].value, "Scopus");
                assert_eq!(failure.valid_values.len(), 2);
                assert_eq!(failure.valid_values[0].len(), 1);
            }
            other => panic!("Expected AggregatedVocabularyFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_violation_bubbles_to_outer_compound() {
        let registry = sample_registry();
        let parser = MetadataParser::new(&registry).with_remaps(RemapRegistry::new());
        let node = json!({
            "typeName": "project", "multiple": false, "typeClass": "compound",
            "value": {
                "projectName": {"typeName": "projectName", "multiple": false, "typeClass": "primitive", "value": "Apollo"},
                "grant": {
                    "typeName": "grant", "multiple": true, "typeClass": "compound",
                    "value": [{
                        "grantAgency": {"typeName": "grantAgency", "multiple": false, "typeClass": "primitive", "value": "NASA"},
                        "grantCountry": {"typeName": "grantCountry", "multiple": false, "typeClass": "controlledVocabulary", "value": "Narnia"}
                    }]
                }
            }
        });

        match parser.parse_field(&node) {
            Err(ParseError::AggregatedVocabularyFailure(failure)) => {
                assert_eq!(failure.type_name, "project");
                assert_eq!(failure.violations[0].type_name, "grantCountry");
                assert_eq!(failure.violations[0].value, "Narnia");
                assert_eq!(failure.valid_values.len(), 1);
                assert!(failure.valid_values[0].child("projectName").is_some());
                let grant = failure.valid_values[0].child("grant").unwrap();
                assert_eq!(
                    grant.compound_values()[0].child("grantAgency").unwrap().display_values(),
                    vec!["NASA"]
                );
                assert!(grant.compound_values()[0].child("grantCountry").is_none());
            }
            other => panic!("Expected AggregatedVocabularyFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_remap_keeps_valid_part_of_nested_compound() {
        let registry = sample_registry();
        let mut remaps = RemapRegistry::new();
        remaps.register("study", OverflowChildRemap::new("studyNote"));
        let parser = MetadataParser::new(&registry).with_remaps(remaps);
        let node = json!({
            "typeName": "study", "multiple": true, "typeClass": "compound",
            "value": [{
                "studyNote": {"typeName": "studyNote", "multiple": false, "typeClass": "primitive", "value": "keep"},
                "grant": {
                    "typeName": "grant", "multiple": true, "typeClass": "compound",
                    "value": [{
                        "grantAgency": {"typeName": "grantAgency", "multiple": false, "typeClass": "primitive", "value": "NASA"},
                        "grantCountry": {"typeName": "grantCountry", "multiple": false, "typeClass": "controlledVocabulary", "value": "Narnia"}
                    }]
                }
            }]
        });

        let field = parser.parse_field(&node).unwrap().unwrap();
        let values = field.compound_values();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].child("studyNote").unwrap().display_values(), vec!["keep"]);
        let grant = values[0].child("grant").unwrap();
        assert_eq!(
            grant.compound_values()[0].child("grantAgency").unwrap().display_values(),
            vec!["NASA"]
        );
        assert_eq!(values[1].child("studyNote").unwrap().display_values(), vec!["Narnia"]);
    }

    #[test]
    fn test_undeclared_child_with_bad_vocabulary_is_not_remapped() {
        let registry = sample_registry();
        let parser = MetadataParser::new(&registry);
        let node = |subject: &str| {
            json!({
                "typeName": "geographicCoverage", "multiple": true, "typeClass": "compound",
                "value": [{
                    "city": {"typeName": "city", "multiple": false, "typeClass": "primitive", "value": "Espoo"},
                    "subject": {"typeName": "subject", "multiple": true, "typeClass": "controlledVocabulary", "value": [subject]}
                }]
            })
        };

        for subject in ["Zzzz", "Physics"] {
            match parser.parse_field(&node(subject)) {
                Err(ParseError::Structural(message)) => assert!(message.contains("subject")),
                other => panic!("Expected Structural, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_fatal_child_error_is_not_collected() {
        let registry = sample_registry();
        let parser = MetadataParser::new(&registry);
        let node = json!({
            "typeName": "keyword", "multiple": true, "typeClass": "compound",
            "value": [{
                "keywordValue": {"typeName": "keywordValue", "multiple": false, "typeClass": "primitive", "value": "stars"},
                "keywordTermURI": {"typeName": "keywordTermURI", "multiple": false, "typeClass": "primitive", "value": "ftp://elsewhere"}
            }]
        });

        assert!(matches!(parser.parse_field(&node), Err(ParseError::ExternalVocabulary { .. })));
    }

    #[test]
    fn test_reflattened_children_match_groups() {
        let registry = sample_registry();
        let parser = MetadataParser::new(&registry);
        let node = json!({
            "typeName": "geographicCoverage", "multiple": true, "typeClass": "compound",
            "value": [
                {
                    "country": {"typeName": "country", "multiple": false, "typeClass": "controlledVocabulary", "value": "Finland"},
                    "city": {"typeName": "city", "multiple": false, "typeClass": "primitive", "value": "Espoo"},
                    "state": {"typeName": "state", "multiple": false, "typeClass": "primitive", "value": "Uusimaa"}
                },
                {
                    "unknownA": {"typeName": "unknownA", "multiple": false, "typeClass": "primitive", "value": "a"}
                }
            ]
        });

        let parsed = parser.resolve_field(&node, Validation::Full).unwrap();
        let field = parsed.value.unwrap();
        assert_eq!(field.compound_values().len(), 1);
        assert_eq!(field.compound_values()[0].children().len(), 3);
        assert!(parsed
            .warnings
            .iter()
            .all(|w| matches!(w, ParseWarning::IgnoredUnknownField { .. })));
    }
}
