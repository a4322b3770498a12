//! License catalog boundary

use crate::model::License;

/// Lookup into the installation's license table
pub trait LicenseCatalog: Send + Sync {
    /// Match by license name or by URI
    fn by_name_or_uri(&self, name_or_uri: &str) -> Option<License>;

    /// License applied when a document names none and custom terms are disallowed
    fn default_license(&self) -> Option<License>;
}

/// License table held in memory; the first entry is the default
#[derive(Debug, Clone, Default)]
pub struct InMemoryLicenseCatalog {
    licenses: Vec<License>,
}

impl InMemoryLicenseCatalog {
    pub fn new(licenses: Vec<License>) -> Self {
        Self { licenses }
    }

    /// CC0 and CC BY 4.0, with CC0 as the default
    pub fn standard() -> Self {
        Self::new(vec![
            License {
                name: "CC0 1.0".to_string(),
                uri: Some("http://creativecommons.org/publicdomain/zero/1.0".to_string()),
            },
            License {
                name: "CC BY 4.0".to_string(),
                uri: Some("http://creativecommons.org/licenses/by/4.0".to_string()),
            },
        ])
    }
}

impl LicenseCatalog for InMemoryLicenseCatalog {
    fn by_name_or_uri(&self, name_or_uri: &str) -> Option<License> {
        self.licenses
            .iter()
            .find(|l| l.name == name_or_uri || l.uri.as_deref() == Some(name_or_uri))
            .cloned()
    }

    fn default_license(&self) -> Option<License> {
        self.licenses.first().cloned()
    }
}
