//! Extension descriptors as resolved by the catalog.

use crate::extension::manifest::ExtensionManifest;
use serde::Serialize;

/// Manifest slot of one configured extension.
///
/// The catalog never fails as a whole: a lookup failure for one id lands here
/// as `Failed` instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ManifestState {
    /// Registry has no manifest for the id.
    Missing,
    /// Lookup or parse failed; carries the underlying error message.
    Failed { message: String },
    Present { manifest: ExtensionManifest },
}

impl ManifestState {
    pub fn manifest(&self) -> Option<&ExtensionManifest> {
        match self {
            Self::Present { manifest } => Some(manifest),
            _ => None,
        }
    }
}

/// Configured extension with its catalog manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionDescriptor {
    pub id: String,
    pub manifest: ManifestState,
}

impl ExtensionDescriptor {
    pub fn new(id: impl Into<String>, manifest: ManifestState) -> Self {
        Self {
            id: id.into(),
            manifest,
        }
    }

    pub fn with_manifest(id: impl Into<String>, manifest: ExtensionManifest) -> Self {
        Self::new(id, ManifestState::Present { manifest })
    }

    pub fn missing(id: impl Into<String>) -> Self {
        Self::new(id, ManifestState::Missing)
    }

    pub fn failed(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            id,
            ManifestState::Failed {
                message: message.into(),
            },
        )
    }
}

/// Extension handed to the host for loading.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutableExtension {
    pub id: String,
    pub script_url: String,
}
