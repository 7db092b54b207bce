//! Serialization formats. Pure transformations; file I/O is in the binary.

pub mod snapshot;

pub use snapshot::{MAX_SNAPSHOT_SIZE, SnapshotHeader, workspace_from_bytes, workspace_to_bytes};
