//! Configured extension catalog.
//!
//! Resolves the ids referenced in settings into descriptors through an
//! external lookup. One failing id never fails the catalog.

use crate::error::LookupError;
use crate::extension::manifest::ExtensionManifest;
use crate::model::descriptor::{ExtensionDescriptor, ManifestState};
use crate::settings::SettingsSnapshot;
use async_trait::async_trait;
use futures::future::join_all;
use log::warn;
use std::sync::Arc;

/// Remote catalog query for one extension id.
///
/// Returns the raw manifest JSON text, or `None` when the registry does not
/// know the id.
#[async_trait]
pub trait ExtensionLookup: Send + Sync {
    async fn fetch_manifest(&self, id: &str) -> Result<Option<String>, LookupError>;
}

/// Turns referenced settings ids into a complete descriptor list.
#[derive(Clone)]
pub struct ConfiguredExtensionCatalog {
    lookup: Arc<dyn ExtensionLookup>,
}

impl ConfiguredExtensionCatalog {
    pub fn new(lookup: Arc<dyn ExtensionLookup>) -> Self {
        Self { lookup }
    }

    /// Looks up every referenced id concurrently.
    ///
    /// Output order follows settings order and always has one descriptor per
    /// referenced id.
    pub async fn load(&self, settings: &SettingsSnapshot) -> Vec<ExtensionDescriptor> {
        self.load_ids(settings.referenced_ids()).await
    }

    pub async fn load_ids(&self, ids: Vec<String>) -> Vec<ExtensionDescriptor> {
        let lookups = ids.into_iter().map(|id| {
            let lookup = Arc::clone(&self.lookup);
            async move {
                let state = manifest_state(&id, lookup.fetch_manifest(&id).await);
                ExtensionDescriptor::new(id, state)
            }
        });
        join_all(lookups).await
    }
}

fn manifest_state(id: &str, fetched: Result<Option<String>, LookupError>) -> ManifestState {
    match fetched {
        Ok(None) => ManifestState::Missing,
        Ok(Some(raw)) => match ExtensionManifest::parse(&raw) {
            Ok(manifest) => ManifestState::Present { manifest },
            Err(err) => {
                warn!(
                    "event=manifest_parse module=catalog status=error id={} error={}",
                    id, err
                );
                ManifestState::Failed {
                    message: format!("invalid manifest: {err}"),
                }
            }
        },
        Err(err) => {
            warn!(
                "event=manifest_lookup module=catalog status=error id={} error={}",
                id, err
            );
            ManifestState::Failed {
                message: err.to_string(),
            }
        }
    }
}
