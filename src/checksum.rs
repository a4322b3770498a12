//! File checksums and parsed-graph fingerprints

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Algorithm a data file checksum was computed with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChecksumType {
    #[serde(rename = "MD5")]
    Md5,
    #[serde(rename = "SHA-1")]
    Sha1,
    #[serde(rename = "SHA-256")]
    Sha256,
    #[serde(rename = "SHA-512")]
    Sha512,
}

impl ChecksumType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChecksumType::Md5 => "MD5",
            ChecksumType::Sha1 => "SHA-1",
            ChecksumType::Sha256 => "SHA-256",
            ChecksumType::Sha512 => "SHA-512",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "MD5" => Some(ChecksumType::Md5),
            "SHA-1" => Some(ChecksumType::Sha1),
            "SHA-256" => Some(ChecksumType::Sha256),
            "SHA-512" => Some(ChecksumType::Sha512),
            _ => None,
        }
    }
}

impl fmt::Display for ChecksumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checksum recorded for a data file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChecksum {
    #[serde(rename = "type")]
    pub kind: ChecksumType,
    pub value: String,
}

/// SHA256 digest of a serialized value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute fingerprint from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Compute fingerprint of any serializable value through its JSON form
    ///
    /// Map key order follows insertion order, so two values built in the same
    /// order fingerprint identically.
    pub fn of<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        let canonical = serde_json::to_vec(value)?;
        Ok(Self::from_bytes(&canonical))
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
