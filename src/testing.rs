//! Shared fixtures for unit tests

use crate::registry::InMemoryRegistry;
use crate::schema::MetadataBlockDefinition;

pub(crate) fn sample_registry() -> InMemoryRegistry {
    let blocks: Vec<MetadataBlockDefinition> =
        serde_json::from_str(include_str!("../tests/fixtures/registry.json")).unwrap();
    InMemoryRegistry::from_blocks(blocks).unwrap()
}
