//! Domain graph produced by a parse
//!
//! Every node is created fresh by one parse call and owned by its parent;
//! nothing here holds a reference back up the tree.

pub mod dataset;
pub mod field;
pub mod tabular;

pub use dataset::{DataFile, Dataset, DatasetVersionGraph, FileMetadata, License, TermsOfUse};
pub use field::{
    CompoundValue, ControlledVocabularyEntry, ExternalRegistration, Field, FieldValue, PrimitiveValue,
};
pub use tabular::{
    DataTable, DataVariable, SummaryStatistic, SummaryStatisticType, VariableCategory, VariableFormat,
    VariableInterval,
};
