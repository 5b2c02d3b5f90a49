//! Scenario replay for the activation pipeline.
//!
//! A scenario is a JSON document with a static catalog, a static script table
//! and an ordered list of steps (settings or document changes). Steps are fed
//! to a live pipeline one at a time; emitted executable lists are returned in
//! order, tagged with the step that produced them.

use activation_core::{
    ActivationService, ExecutableExtension, ExtensionLookup, LookupError, ModelSnapshot,
    ScriptHost, ScriptHostError, SettingsSnapshot, SettingsSource,
};
use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Catalog entry: a manifest object, `null` for unknown ids, or
/// `{"error": "..."}` for a failing lookup.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CatalogEntry {
    Error { error: String },
    Manifest(serde_json::Value),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Step {
    Settings(SettingsSnapshot),
    Documents(ModelSnapshot),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub settings: SettingsSnapshot,
    #[serde(default)]
    pub catalog: HashMap<String, Option<CatalogEntry>>,
    #[serde(default)]
    pub scripts: HashMap<String, Option<String>>,
    pub steps: Vec<Step>,
}

/// One emitted list, tagged with the step that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Emission {
    pub step: usize,
    pub extensions: Vec<ExecutableExtension>,
}

struct ScenarioCatalog(HashMap<String, Option<CatalogEntry>>);

#[async_trait]
impl ExtensionLookup for ScenarioCatalog {
    async fn fetch_manifest(&self, id: &str) -> Result<Option<String>, LookupError> {
        match self.0.get(id) {
            None | Some(None) => Ok(None),
            Some(Some(CatalogEntry::Error { error })) => Err(LookupError(error.clone())),
            Some(Some(CatalogEntry::Manifest(manifest))) => Ok(Some(manifest.to_string())),
        }
    }
}

struct ScenarioScripts(HashMap<String, Option<String>>);

#[async_trait]
impl ScriptHost for ScenarioScripts {
    async fn resolve_url(&self, url: &str) -> Result<Option<String>, ScriptHostError> {
        Ok(self.0.get(url).cloned().flatten())
    }
}

impl Scenario {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Replays every step; steps whose active list did not change emit nothing.
    pub async fn replay(self) -> Vec<Emission> {
        let service = ActivationService::new(
            Arc::new(ScenarioCatalog(self.catalog)),
            Arc::new(ScenarioScripts(self.scripts)),
        );
        let settings = SettingsSource::new(self.settings);
        let mut handle = service.subscribe(&settings);
        let documents = handle.documents();
        let mut emissions = Vec::new();

        for (index, step) in self.steps.into_iter().enumerate() {
            match step {
                Step::Settings(next) => settings.update(next),
                Step::Documents(next) => {
                    if documents.send(next).is_err() {
                        break;
                    }
                }
            }
            if !handle.flush().await {
                break;
            }
            while let Some(extensions) = handle.try_next() {
                info!(
                    "event=scenario_step module=cli status=ok step={} executable={}",
                    index,
                    extensions.len()
                );
                emissions.push(Emission {
                    step: index,
                    extensions,
                });
            }
        }
        emissions
    }
}
