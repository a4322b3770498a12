//! Dataset Metadata Parser
//!
//! A schema-driven parser that turns semi-structured dataset metadata
//! documents into a validated, strongly-typed domain graph.
//!
//! ## Features
//!
//! - **Registry-Driven**: Every field node is resolved against a field type registry
//! - **Controlled Vocabularies**: Exact or lenient matching, with suggestions on a miss
//! - **Error Recovery**: Invalid vocabulary values in compound fields can be remapped
//! - **Data Dictionaries**: Tabular variables, summary statistics, and categories
//! - **Fingerprints**: SHA256 over the parsed graph for comparing parses
//!
//! ## Architecture
//!
//! ```text
//! datasetVersion
//! ├── scalars, terms of use
//! ├── metadataBlocks
//! │   └── <block>.fields[]  ──> Field
//! │       ├── primitive            PrimitiveValue[]
//! │       ├── controlledVocabulary ControlledVocabularyEntry[]
//! │       └── compound             CompoundValue[] ──> Field (recursive)
//! └── files[]
//!     └── dataFile.dataTables[] ──> DataTable ──> DataVariable
//! ```

pub mod checksum;
pub mod config;
pub mod error;
pub mod license;
pub mod model;
pub mod parser;
pub mod registry;
pub mod schema;
pub mod version;

#[cfg(test)]
mod testing;

pub use checksum::{ChecksumType, FileChecksum, Fingerprint};
pub use config::ParserConfig;
pub use error::{AggregatedVocabularyFailure, ParseError, RegistryError, Result, VocabularyViolation};
pub use license::{InMemoryLicenseCatalog, LicenseCatalog};
pub use model::{CompoundValue, Dataset, DatasetVersionGraph, Field, FieldValue};
pub use parser::{MetadataParser, ParseOptions, ParseWarning, Parsed, Validation};
pub use registry::{FieldTypeRegistry, InMemoryRegistry};
pub use schema::{FieldKind, FieldTypeDescriptor, TypeClass};
pub use version::{VersionNumber, VersionState};
