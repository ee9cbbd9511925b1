//! Run metadata persisted next to training artifacts.

pub mod manifest;

pub use manifest::{RunManifest, MANIFEST_FILE};
