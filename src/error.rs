//! Error types for metadata parsing

use std::fmt;

use thiserror::Error;

use crate::model::CompoundValue;
use crate::schema::TypeClass;

/// Result type for parse operations
pub type Result<T> = std::result::Result<T, ParseError>;

/// Metadata parse errors
///
/// Every variant except [`ParseError::AggregatedVocabularyFailure`] is fatal
/// for the subtree it was raised in. The aggregated variant only reaches the
/// caller once no remap policy was able to recover it.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("structural error: {0}")]
    Structural(String),

    #[error("incorrect typeClass for field {field}: should be {expected}, document declares {found}")]
    TypeMismatch {
        field: String,
        expected: TypeClass,
        found: String,
    },

    #[error("incorrect multiplicity for field {field}: {message}")]
    Multiplicity { field: String, message: String },

    #[error("invalid value '{value}' submitted for {field}, which is limited to specific vocabularies")]
    ExternalVocabulary { field: String, value: String },

    #[error("value '{value}' does not exist in type '{field}'{}", format_suggestions(.suggestions))]
    UnknownVocabularyValue {
        field: String,
        value: String,
        suggestions: Vec<String>,
    },

    #[error(transparent)]
    AggregatedVocabularyFailure(AggregatedVocabularyFailure),

    #[error("error parsing {field}: {message}")]
    Format { field: String, message: String },

    #[error("can't find type '{0}'")]
    UnknownFieldType(String),

    #[error("invalid license: {0}")]
    InvalidLicense(String),

    #[error("specified metadata language not allowed: {0}")]
    MetadataLanguageNotAllowed(String),
}

impl ParseError {
    pub(crate) fn structural(message: impl Into<String>) -> Self {
        Self::Structural(message.into())
    }

    pub(crate) fn format(field: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Format {
            field: field.into(),
            message: message.to_string(),
        }
    }
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean: {})", suggestions.join(", "))
    }
}

/// Errors raised while loading or querying a field type registry
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("duplicate field type definition: {0}")]
    DuplicateType(String),

    #[error("compound type {parent} references undefined child type {child}")]
    UnknownChildType { parent: String, child: String },

    #[error("field type {0} must declare child types if and only if it is compound")]
    ChildTypeMismatch(String),

    #[error("compound field types form a cycle through {0}")]
    CyclicCompound(String),

    #[error("external vocabulary store unavailable: {0}")]
    ExternalStore(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// A raw string that did not resolve against a controlled vocabulary inside a
/// compound context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabularyViolation {
    /// Name of the controlled vocabulary field type that rejected the value
    pub type_name: String,
    /// The offending raw value, as submitted
    pub value: String,
}

impl VocabularyViolation {
    pub fn new(type_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for VocabularyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' ({})", self.value, self.type_name)
    }
}

/// Violations collected from one compound assembler pass, together with the
/// compound values that did parse
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedVocabularyFailure {
    /// The compound field type the violations were collected under
    pub type_name: String,
    /// Never empty
    pub violations: Vec<VocabularyViolation>,
    /// Compound values built from the groups that had at least one valid child
    pub valid_values: Vec<CompoundValue>,
}

impl fmt::Display for AggregatedVocabularyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<String> = self.violations.iter().map(|v| v.to_string()).collect();
        write!(
            f,
            "invalid controlled vocabulary in compound field {}: {}",
            self.type_name,
            values.join(", ")
        )
    }
}

impl std::error::Error for AggregatedVocabularyFailure {}

/// Outcome of resolving one field inside the recursion
///
/// Vocabulary problems travel as values so the compound assembler can merge
/// them with sibling successes. Only [`FieldError::Fatal`] is final.
#[derive(Debug)]
pub(crate) enum FieldError {
    Fatal(ParseError),
    Vocabulary(Vec<VocabularyViolation>),
    Aggregated(AggregatedVocabularyFailure),
}

impl From<ParseError> for FieldError {
    fn from(err: ParseError) -> Self {
        FieldError::Fatal(err)
    }
}
