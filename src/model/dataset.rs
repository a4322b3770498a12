//! Dataset version graph: the root of one parsed document

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::field::Field;
use super::tabular::DataTable;
use crate::checksum::{FileChecksum, Fingerprint};
use crate::version::{VersionNumber, VersionState};

/// One parsed dataset version
///
/// Only produced by a parse that completed every stage; fields are flattened
/// across metadata blocks in document order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetVersionGraph {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minor_version_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_state: Option<VersionState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deaccession_link: Option<String>,
    #[serde(rename = "UNF", skip_serializing_if = "Option::is_none")]
    pub unf: Option<String>,
    pub terms_of_use: TermsOfUse,
    pub fields: Vec<Field>,
    pub files: Vec<FileMetadata>,
}

impl DatasetVersionGraph {
    /// `major.minor`, when both numbers are known
    pub fn version(&self) -> Option<VersionNumber> {
        Some(VersionNumber::new(self.version_number?, self.minor_version_number?))
    }

    /// First top-level field of the given type
    pub fn field(&self, type_name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.type_name() == type_name)
    }

    /// SHA-256 over the serialized graph
    pub fn fingerprint(&self) -> Result<Fingerprint, serde_json::Error> {
        Fingerprint::of(self)
    }
}

/// A dataset envelope around one version
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_language: Option<String>,
    pub version: DatasetVersionGraph,
}

impl Dataset {
    /// `protocol:authority/identifier`, when all three parts are known
    pub fn global_id(&self) -> Option<String> {
        Some(format!(
            "{}:{}/{}",
            self.protocol.as_deref()?,
            self.authority.as_deref()?,
            self.identifier.as_deref()?
        ))
    }
}

/// A license as known to the license catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct License {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// Terms of use and access block
///
/// The custom-terms texts are only read when no license applies.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TermsOfUse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms_of_use: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidentiality_declaration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_permissions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restrictions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citation_requirements: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depositor_requirements: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disclaimer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms_of_access: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_access_place: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_archive: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_for_access: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_of_collection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub study_completion: Option<String>,
    pub file_access_request: bool,
}

/// Per-version metadata of one file in the manifest
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub label: String,
    pub restricted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub categories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_file: Option<DataFile>,
}

/// The stored file behind a manifest entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesize: Option<u64>,
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<FileChecksum>,
    pub data_tables: Vec<DataTable>,
}

impl DataFile {
    /// The primary table of a tabular file
    pub fn data_table(&self) -> Option<&DataTable> {
        self.data_tables.first()
    }

    pub fn is_tabular(&self) -> bool {
        !self.data_tables.is_empty()
    }
}
