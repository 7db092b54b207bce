//! # Snapshot Format
//!
//! Binary serialization for a whole [`Workspace`].
//!
//! Format: Header (5 bytes) + postcard-serialized workspace.
//! - 4 bytes: Magic ("CMPT")
//! - 1 byte: Version
//!
//! Size and header are validated before the payload is decoded.
//! File I/O lives in the binary.

use crate::primitives::{FORMAT_VERSION, MAGIC_BYTES};
use crate::workspace::Workspace;
use crate::CompetencyError;

/// Maximum accepted snapshot size.
pub const MAX_SNAPSHOT_SIZE: usize = 64 * 1024 * 1024; // 64 MB

const HEADER_SIZE: usize = 5;

// =============================================================================
// HEADER
// =============================================================================

/// The header that precedes every snapshot payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl SnapshotHeader {
    /// Header for the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *MAGIC_BYTES,
            version: FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), CompetencyError> {
        if &self.magic != MAGIC_BYTES {
            return Err(CompetencyError::SerializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != FORMAT_VERSION {
            return Err(CompetencyError::SerializationError(format!(
                "Unsupported version: {} (expected {})",
                self.version, FORMAT_VERSION
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CompetencyError> {
        match bytes {
            [a, b, c, d, version, ..] => Ok(Self {
                magic: [*a, *b, *c, *d],
                version: *version,
            }),
            _ => Err(CompetencyError::SerializationError(
                "Header too short".to_string(),
            )),
        }
    }
}

impl Default for SnapshotHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ENCODE / DECODE
// =============================================================================

/// Encode a workspace (header + payload). No file I/O.
pub fn workspace_to_bytes(workspace: &Workspace) -> Result<Vec<u8>, CompetencyError> {
    let payload = postcard::to_stdvec(workspace)
        .map_err(|e| CompetencyError::SerializationError(e.to_string()))?;

    let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
    bytes.extend_from_slice(&SnapshotHeader::new().to_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Decode a workspace. No file I/O.
pub fn workspace_from_bytes(bytes: &[u8]) -> Result<Workspace, CompetencyError> {
    if bytes.len() > MAX_SNAPSHOT_SIZE {
        return Err(CompetencyError::SerializationError(format!(
            "Snapshot size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_SNAPSHOT_SIZE
        )));
    }

    let header = SnapshotHeader::from_bytes(bytes)?;
    header.validate()?;

    let payload = bytes.get(HEADER_SIZE..).unwrap_or_default();
    postcard::from_bytes(payload).map_err(|e| {
        CompetencyError::SerializationError(format!("Failed to decode snapshot: {}", e))
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CompetencyCategory, CompetencyDraft};
    use crate::ErrorKind;

    #[test]
    fn header_layout() {
        let bytes = SnapshotHeader::new().to_bytes();
        assert_eq!(&bytes[..4], b"CMPT");
        assert_eq!(bytes[4], FORMAT_VERSION);
        assert_eq!(
            SnapshotHeader::from_bytes(&bytes).expect("header"),
            SnapshotHeader::new()
        );
    }

    #[test]
    fn encode_is_stable() {
        let mut workspace = Workspace::new();
        workspace
            .catalog
            .create(CompetencyDraft {
                code: "SOFT-001".to_string(),
                name: "Communication".to_string(),
                description: String::new(),
                category: CompetencyCategory::Soft,
                parent: None,
                levels: None,
            })
            .expect("competency");

        let first = workspace_to_bytes(&workspace).expect("encode");
        let restored = workspace_from_bytes(&first).expect("decode");
        let second = workspace_to_bytes(&restored).expect("encode");
        assert_eq!(first, second);
        assert!(restored.catalog.by_code("soft-001").is_some());
    }

    #[test]
    fn bad_header_rejected() {
        let err = workspace_from_bytes(b"XXXX\x01rest").expect_err("magic");
        assert_eq!(err.kind(), ErrorKind::Serialization);

        assert!(workspace_from_bytes(b"CMP").is_err());
        assert!(workspace_from_bytes(b"CMPT\x09").is_err());
    }
}
