//! Field Type Registry
//!
//! The long-lived, read-only schema the parser resolves every field node
//! against. [`FieldTypeRegistry`] is the seam the parser depends on;
//! [`InMemoryRegistry`] is the implementation built from metadata block
//! definition files.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use include_dir::{include_dir, Dir};
use petgraph::algo::kosaraju_scc;
use petgraph::graphmap::DiGraphMap;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::RegistryError;
use crate::schema::{
    ExternalVocabularyBinding, FieldKind, FieldTypeDescriptor, MetadataBlockDefinition, TypeClass,
    VocabularyTerm,
};

static BUILTIN_BLOCKS: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/schemas");

/// Read access to field type schemas and their vocabularies
///
/// Implementations are shared across concurrent parses. External term
/// registration must be an idempotent upsert.
pub trait FieldTypeRegistry: Send + Sync {
    /// Type descriptor for a field name
    fn lookup(&self, name: &str) -> Option<Arc<FieldTypeDescriptor>>;

    /// Match a raw string against the controlled vocabulary of `field_type`
    fn resolve_vocabulary(
        &self,
        field_type: &FieldTypeDescriptor,
        raw: &str,
        lenient: bool,
    ) -> Option<VocabularyTerm>;

    fn external_vocabulary_binding<'a>(
        &self,
        field_type: &'a FieldTypeDescriptor,
    ) -> Option<&'a ExternalVocabularyBinding> {
        field_type.external_vocabulary.as_ref()
    }

    fn validate_external(&self, binding: &ExternalVocabularyBinding, value: &str) -> bool {
        binding.accepts(value)
    }

    /// Record an accepted value with the external vocabulary store
    fn register_external(&self, binding: &ExternalVocabularyBinding, value: &str) -> Result<(), RegistryError>;

    /// Closest vocabulary values to `raw`, best first
    fn suggest_vocabulary(&self, _field_type: &FieldTypeDescriptor, _raw: &str, _limit: usize) -> Vec<String> {
        Vec::new()
    }
}

/// Registry held entirely in memory
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    types: HashMap<String, Arc<FieldTypeDescriptor>>,
    vocabularies: HashMap<String, Vec<VocabularyTerm>>,
    blocks: Vec<String>,
    external_terms: RwLock<HashMap<String, BTreeSet<String>>>,
}

impl InMemoryRegistry {
    /// Build a registry from metadata block definitions, validating the schema
    pub fn from_blocks(blocks: Vec<MetadataBlockDefinition>) -> Result<Self, RegistryError> {
        let mut registry = Self::default();

        for block in blocks {
            for def in block.field_types {
                if registry.types.contains_key(&def.name) {
                    return Err(RegistryError::DuplicateType(def.name));
                }

                let is_compound = def.type_class == TypeClass::Compound;
                if is_compound == def.child_types.is_empty() {
                    return Err(RegistryError::ChildTypeMismatch(def.name));
                }

                let kind = match def.type_class {
                    TypeClass::Primitive => FieldKind::Primitive,
                    TypeClass::ControlledVocabulary => FieldKind::ControlledVocabulary,
                    TypeClass::Compound => FieldKind::Compound {
                        child_types: def.child_types,
                    },
                };

                if def.type_class == TypeClass::ControlledVocabulary {
                    let terms = def
                        .vocabulary
                        .into_iter()
                        .enumerate()
                        .map(|(i, t)| t.into_term(i))
                        .collect();
                    registry.vocabularies.insert(def.name.clone(), terms);
                } else if !def.vocabulary.is_empty() {
                    warn!(field = %def.name, "ignoring vocabulary on non-controlled field type");
                }

                let descriptor = FieldTypeDescriptor {
                    name: def.name.clone(),
                    kind,
                    allows_multiple: def.allows_multiple,
                    block: Some(block.name.clone()),
                    external_vocabulary: def.external_vocabulary,
                };
                registry.types.insert(def.name, Arc::new(descriptor));
            }
            registry.blocks.push(block.name);
        }

        registry.check_children()?;
        debug!(types = registry.types.len(), blocks = registry.blocks.len(), "registry loaded");
        Ok(registry)
    }

    /// Load from a single JSON file holding one block or an array of blocks
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_blocks(parse_blocks(&content)?)
    }

    /// Load every `*.json` block definition below a directory
    pub fn load_dir(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let mut files = Vec::new();
        for entry in WalkDir::new(path.as_ref()).sort_by_file_name() {
            let entry = entry?;
            let file = entry.path();
            if file.is_file() && file.extension().map(|e| e == "json").unwrap_or(false) {
                files.push(file.to_path_buf());
            }
        }

        let mut blocks = Vec::new();
        for file in files {
            let content = fs::read_to_string(&file)?;
            blocks.extend(parse_blocks(&content)?);
        }
        Self::from_blocks(blocks)
    }

    /// Load a file or a directory, whichever `path` is
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        if path.is_dir() {
            Self::load_dir(path)
        } else {
            Self::load_file(path)
        }
    }

    /// Registry with the embedded citation and geospatial blocks
    pub fn builtin() -> Result<Self, RegistryError> {
        let mut files: Vec<_> = BUILTIN_BLOCKS
            .files()
            .filter(|f| f.path().extension().map(|e| e == "json").unwrap_or(false))
            .collect();
        files.sort_by(|a, b| a.path().cmp(b.path()));

        let mut blocks = Vec::new();
        for file in files {
            let content = file.contents_utf8().unwrap_or_default();
            blocks.extend(parse_blocks(content)?);
        }
        Self::from_blocks(blocks)
    }

    /// Names of loaded metadata blocks, in load order
    pub fn blocks(&self) -> &[String] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Vocabulary terms of a controlled vocabulary type
    pub fn vocabulary(&self, type_name: &str) -> &[VocabularyTerm] {
        self.vocabularies.get(type_name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Values registered so far with an external vocabulary binding
    pub fn external_terms(&self, binding: &str) -> Vec<String> {
        self.external_terms
            .read()
            .map(|terms| terms.get(binding).map(|s| s.iter().cloned().collect()).unwrap_or_default())
            .unwrap_or_default()
    }

    /// Every child must be defined, and no compound may contain itself
    fn check_children(&self) -> Result<(), RegistryError> {
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for descriptor in self.types.values() {
            graph.add_node(descriptor.name.as_str());
            for child in descriptor.kind.child_types() {
                if !self.types.contains_key(child) {
                    return Err(RegistryError::UnknownChildType {
                        parent: descriptor.name.clone(),
                        child: child.clone(),
                    });
                }
                graph.add_edge(descriptor.name.as_str(), child.as_str(), ());
            }
        }

        for component in kosaraju_scc(&graph) {
            let node = component[0];
            if component.len() > 1 || graph.contains_edge(node, node) {
                return Err(RegistryError::CyclicCompound(node.to_string()));
            }
        }
        Ok(())
    }
}

impl FieldTypeRegistry for InMemoryRegistry {
    fn lookup(&self, name: &str) -> Option<Arc<FieldTypeDescriptor>> {
        self.types.get(name).cloned()
    }

    fn resolve_vocabulary(
        &self,
        field_type: &FieldTypeDescriptor,
        raw: &str,
        lenient: bool,
    ) -> Option<VocabularyTerm> {
        let terms = self.vocabularies.get(&field_type.name)?;
        if let Some(term) = terms.iter().find(|t| t.value == raw) {
            return Some(term.clone());
        }
        if !lenient {
            return None;
        }

        let wanted = normalize(raw);
        terms
            .iter()
            .find(|t| normalize(&t.value) == wanted || t.alternates.iter().any(|a| normalize(a) == wanted))
            .cloned()
    }

    fn register_external(&self, binding: &ExternalVocabularyBinding, value: &str) -> Result<(), RegistryError> {
        let mut terms = self
            .external_terms
            .write()
            .map_err(|e| RegistryError::ExternalStore(e.to_string()))?;
        terms.entry(binding.name.clone()).or_default().insert(value.to_string());
        Ok(())
    }

    fn suggest_vocabulary(&self, field_type: &FieldTypeDescriptor, raw: &str, limit: usize) -> Vec<String> {
        let matcher = SkimMatcherV2::default().ignore_case();
        let mut scored: Vec<(i64, &str)> = self
            .vocabulary(&field_type.name)
            .iter()
            .filter_map(|t| matcher.fuzzy_match(&t.value, raw).map(|score| (score, t.value.as_str())))
            .collect();

        // Sort by score descending
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().take(limit).map(|(_, v)| v.to_string()).collect()
    }
}

/// Case- and whitespace-insensitive form used by lenient matching
fn normalize(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

fn parse_blocks(content: &str) -> Result<Vec<MetadataBlockDefinition>, RegistryError> {
    let json: serde_json::Value = serde_json::from_str(content)?;
    if json.is_array() {
        Ok(serde_json::from_value(json)?)
    } else {
        Ok(vec![serde_json::from_value(json)?])
    }
}
