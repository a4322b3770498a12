//! Whole-document assembly
//!
//! A dataset version is parsed in fixed stages: version scalars and terms,
//! metadata blocks, then the file manifest. The first fatal error at any
//! stage aborts the document and no graph is returned.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::node::{self, Object};
use super::{tabular, MetadataParser, ParseContext, ParseWarning, Parsed, Validation};
use crate::checksum::{ChecksumType, FileChecksum};
use crate::error::{ParseError, Result};
use crate::model::{DataFile, Dataset, DatasetVersionGraph, Field, FileMetadata, License, TermsOfUse};
use crate::schema::FieldTypeDescriptor;
use crate::version::VersionState;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
const UNKNOWN_CHECKSUM: &str = "unknown";

/// Progress of one dataset version parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DocumentStage {
    Start,
    ScalarsParsed,
    BlocksParsed,
    FilesParsed,
    Done,
}

impl DocumentStage {
    fn advance(&mut self, next: DocumentStage) {
        debug!(from = %self, to = %next, "document stage");
        *self = next;
    }
}

impl fmt::Display for DocumentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::ScalarsParsed => "scalars parsed",
            Self::BlocksParsed => "blocks parsed",
            Self::FilesParsed => "files parsed",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

impl<'a> MetadataParser<'a> {
    /// Parse a dataset envelope and its `datasetVersion`
    pub fn parse_dataset(&self, doc: &Value) -> Result<Parsed<Dataset>> {
        let mut cx = ParseContext::default();
        let dataset = self.dataset_in(doc, &mut cx)?;
        Ok(cx.finish(dataset))
    }

    /// Parse one dataset version document
    pub fn parse_dataset_version(&self, doc: &Value) -> Result<Parsed<DatasetVersionGraph>> {
        let mut cx = ParseContext::default();
        let graph = self.version_in(doc, &mut cx)?;
        Ok(cx.finish(graph))
    }

    /// Parse a `metadataBlocks` object into one flat field list
    pub fn parse_metadata_blocks(&self, blocks: &Value) -> Result<Parsed<Vec<Field>>> {
        let mut cx = ParseContext::default();
        let fields = self.blocks_in(blocks, &mut cx)?;
        Ok(cx.finish(fields))
    }

    /// Parse a partial `{ "fields": [...] }` submission
    ///
    /// Declared `multiple` and `typeClass` are not checked.
    pub fn parse_multiple_fields(&self, doc: &Value) -> Result<Parsed<Vec<Field>>> {
        self.parse_fields(doc, Validation::Partial)
    }

    /// Parse a `{ "fields": [...] }` submission
    pub fn parse_fields(&self, doc: &Value, validation: Validation) -> Result<Parsed<Vec<Field>>> {
        let mut cx = ParseContext::default();
        let fields = self.fields_in(field_nodes(doc)?, validation, &mut cx)?;
        Ok(cx.finish(fields))
    }

    /// Field types named by a `{ "fields": [...] }` deletion request
    pub fn parse_field_types_for_delete(&self, doc: &Value) -> Result<Vec<Arc<FieldTypeDescriptor>>> {
        field_nodes(doc)?
            .iter()
            .map(|value| {
                let obj = node::as_object(value, "field")?;
                let type_name = node::required_string(obj, "typeName", "field")?;
                self.registry
                    .lookup(&type_name)
                    .ok_or(ParseError::UnknownFieldType(type_name))
            })
            .collect()
    }

    /// Parse a `files` / `fileMetadatas` array
    pub fn parse_files(&self, files: &Value) -> Result<Parsed<Vec<FileMetadata>>> {
        let mut cx = ParseContext::default();
        let files = self.files_in(node::as_array(files, "files")?, &mut cx)?;
        Ok(cx.finish(files))
    }

    fn dataset_in(&self, doc: &Value, cx: &mut ParseContext) -> Result<Dataset> {
        let obj = node::as_object(doc, "dataset")?;

        let metadata_language = node::opt_string(obj, "metadataLanguage")?;
        if let Some(language) = &metadata_language {
            if !self.options.allowed_metadata_languages.contains(language) {
                return Err(ParseError::MetadataLanguageNotAllowed(language.clone()));
            }
        }

        let version = node::present(obj, "datasetVersion")
            .ok_or_else(|| ParseError::structural("dataset has no datasetVersion"))?;

        Ok(Dataset {
            authority: node::opt_string(obj, "authority")?.or_else(|| self.options.default_authority.clone()),
            protocol: node::opt_string(obj, "protocol")?.or_else(|| self.options.default_protocol.clone()),
            identifier: node::opt_string(obj, "identifier")?,
            metadata_language,
            version: self.version_in(version, cx)?,
        })
    }

    fn version_in(&self, doc: &Value, cx: &mut ParseContext) -> Result<DatasetVersionGraph> {
        let mut stage = DocumentStage::Start;
        let result = self.assemble_version(doc, &mut stage, cx);
        match &result {
            Ok(graph) => info!(fields = graph.fields.len(), files = graph.files.len(), "parsed dataset version"),
            Err(err) => warn!(stage = %stage, error = %err, "dataset version parse aborted"),
        }
        result
    }

    fn assemble_version(
        &self,
        doc: &Value,
        stage: &mut DocumentStage,
        cx: &mut ParseContext,
    ) -> Result<DatasetVersionGraph> {
        let obj = node::as_object(doc, "datasetVersion")?;

        let version_state = node::opt_string(obj, "versionState")?
            .map(|s| {
                VersionState::parse(&s)
                    .ok_or_else(|| ParseError::format("versionState", format!("unknown version state '{}'", s)))
            })
            .transpose()?;

        let mut graph = DatasetVersionGraph {
            id: node::opt_i64(obj, "id")?,
            version_number: node::opt_i64(obj, "versionNumber")?,
            minor_version_number: node::opt_i64(obj, "minorVersionNumber")?,
            version_state,
            release_date: node::opt_date(obj, "releaseDate")?,
            last_update_time: node::opt_time(obj, "lastUpdateTime")?,
            create_time: node::opt_time(obj, "createTime")?,
            archive_time: node::opt_time(obj, "archiveTime")?,
            archive_note: node::opt_string(obj, "archiveNote")?,
            deaccession_link: node::opt_string(obj, "deaccessionLink")?,
            unf: node::opt_string(obj, "UNF")?,
            terms_of_use: self.terms_of_use(obj)?,
            fields: Vec::new(),
            files: Vec::new(),
        };
        stage.advance(DocumentStage::ScalarsParsed);

        let blocks = node::present(obj, "metadataBlocks")
            .ok_or_else(|| ParseError::structural("dataset version has no metadataBlocks"))?;
        graph.fields = self.blocks_in(blocks, cx)?;
        stage.advance(DocumentStage::BlocksParsed);

        if let Some(files) = node::present(obj, "files").or_else(|| node::present(obj, "fileMetadatas")) {
            graph.files = self.files_in(node::as_array(files, "files")?, cx)?;
        }
        stage.advance(DocumentStage::FilesParsed);

        stage.advance(DocumentStage::Done);
        Ok(graph)
    }

    fn blocks_in(&self, blocks: &Value, cx: &mut ParseContext) -> Result<Vec<Field>> {
        let blocks = node::as_object(blocks, "metadataBlocks")?;
        let mut fields = Vec::new();

        for (name, block) in blocks {
            let block = node::as_object(block, name)?;
            let nodes = node::present(block, "fields")
                .ok_or_else(|| ParseError::structural(format!("metadata block {} has no fields", name)))?;
            debug!(block = %name, "parsing metadata block");
            fields.extend(self.fields_in(node::as_array(nodes, "fields")?, Validation::Full, cx)?);
        }
        Ok(fields)
    }

    fn fields_in(&self, nodes: &[Value], validation: Validation, cx: &mut ParseContext) -> Result<Vec<Field>> {
        let mut fields = Vec::with_capacity(nodes.len());
        for value in nodes {
            let field = self
                .resolve(value, validation, cx)
                .map_err(|e| self.into_parse_error(e))?;
            fields.extend(field);
        }
        Ok(fields)
    }

    fn terms_of_use(&self, obj: &Object) -> Result<TermsOfUse> {
        let license = self.license(obj)?;
        let custom = license.is_none();
        let custom_term = |key: &str| -> Result<Option<String>> {
            if custom {
                node::opt_string(obj, key)
            } else {
                Ok(None)
            }
        };

        Ok(TermsOfUse {
            terms_of_use: custom_term("termsOfUse")?,
            confidentiality_declaration: custom_term("confidentialityDeclaration")?,
            special_permissions: custom_term("specialPermissions")?,
            restrictions: custom_term("restrictions")?,
            citation_requirements: custom_term("citationRequirements")?,
            depositor_requirements: custom_term("depositorRequirements")?,
            conditions: custom_term("conditions")?,
            disclaimer: custom_term("disclaimer")?,
            terms_of_access: node::opt_string(obj, "termsOfAccess")?,
            data_access_place: node::opt_string(obj, "dataAccessPlace")?,
            original_archive: node::opt_string(obj, "originalArchive")?,
            availability_status: node::opt_string(obj, "availabilityStatus")?,
            contact_for_access: node::opt_string(obj, "contactForAccess")?,
            size_of_collection: node::opt_string(obj, "sizeOfCollection")?,
            study_completion: node::opt_string(obj, "studyCompletion")?,
            file_access_request: node::opt_bool(obj, "fileAccessRequest")?.unwrap_or(false),
            license,
        })
    }

    /// License named by the document, or the catalog default
    fn license(&self, obj: &Object) -> Result<Option<License>> {
        let named = match node::present(obj, "license") {
            None => None,
            Some(Value::String(name)) => Some(name.clone()),
            Some(Value::Object(license)) => match node::opt_string(license, "uri")? {
                Some(uri) => Some(uri),
                None => node::opt_string(license, "name")?,
            },
            Some(_) => return Err(ParseError::structural("license should be a name, a URI or an object")),
        };

        match named {
            Some(name) => match self.licenses.and_then(|catalog| catalog.by_name_or_uri(&name)) {
                Some(license) => Ok(Some(license)),
                None => Err(ParseError::InvalidLicense(name)),
            },
            None if self.options.allow_custom_terms => Ok(None),
            None => Ok(self.licenses.and_then(|catalog| catalog.default_license())),
        }
    }

    fn files_in(&self, nodes: &[Value], cx: &mut ParseContext) -> Result<Vec<FileMetadata>> {
        nodes.iter().map(|value| self.file_metadata(value, cx)).collect()
    }

    fn file_metadata(&self, value: &Value, cx: &mut ParseContext) -> Result<FileMetadata> {
        let obj = node::as_object(value, "file metadata")?;
        let label = node::required_string(obj, "label", "file metadata")?;

        let data_file = match node::present(obj, "dataFile") {
            Some(data_file) => Some(self.data_file(data_file, &label, cx)?),
            None => None,
        };

        Ok(FileMetadata {
            restricted: node::opt_bool(obj, "restricted")?.unwrap_or(false),
            directory_label: node::opt_string(obj, "directoryLabel")?,
            description: node::opt_string(obj, "description")?,
            categories: node::string_list(obj, "categories")?,
            label,
            data_file,
        })
    }

    fn data_file(&self, value: &Value, label: &str, cx: &mut ParseContext) -> Result<DataFile> {
        let obj = node::as_object(value, "dataFile")?;

        let checksum = match node::present(obj, "checksum") {
            Some(checksum) => {
                let checksum = node::as_object(checksum, "checksum")?;
                let declared = node::required_string(checksum, "type", "checksum")?;
                let value = node::required_string(checksum, "value", "checksum")?;
                match ChecksumType::parse(&declared) {
                    Some(kind) => Some(FileChecksum { kind, value }),
                    None => {
                        warn!(file = label, checksum_type = %declared, "ignoring checksum of unsupported type");
                        cx.warn(ParseWarning::InvalidChecksumType {
                            file: label.to_string(),
                            checksum_type: declared,
                        });
                        None
                    }
                }
            }
            None => Some(FileChecksum {
                kind: ChecksumType::Md5,
                value: node::opt_string(obj, "md5")?.unwrap_or_else(|| UNKNOWN_CHECKSUM.to_string()),
            }),
        };

        let data_tables = match node::present(obj, "dataTables") {
            Some(tables) => tabular::parse_data_tables(node::as_array(tables, "dataTables")?)?,
            None => Vec::new(),
        };

        Ok(DataFile {
            filesize: node::opt_u64(obj, "filesize")?,
            content_type: node::opt_string(obj, "contentType")?.unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            storage_identifier: node::opt_string(obj, "storageIdentifier")?,
            checksum,
            data_tables,
        })
    }
}

fn field_nodes(doc: &Value) -> Result<&[Value]> {
    let obj = node::as_object(doc, "field submission")?;
    let fields = node::present(obj, "fields")
        .ok_or_else(|| ParseError::structural("field submission has no fields"))?;
    node::as_array(fields, "fields")
}
