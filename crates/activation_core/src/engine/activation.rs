//! Sticky activation state machine.

use crate::error::ActivationError;
use crate::extension::activation_event::any_event_matches;
use crate::model::descriptor::{ExtensionDescriptor, ManifestState};
use crate::model::document::ModelSnapshot;
use indexmap::IndexSet;
use log::{debug, info, warn};
use std::collections::BTreeSet;

/// Result of feeding one `(model, enabled)` pair to the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationCycle {
    /// Active and enabled extensions; `None` when equal to the previous emission.
    pub output: Option<Vec<ExtensionDescriptor>>,
    /// Ids that matched for the first time in this cycle.
    pub newly_activated: Vec<String>,
    pub diagnostics: Vec<ActivationError>,
}

/// Matches activation events against visible documents.
///
/// Activation is sticky: once an id matched it stays activated for the life of
/// the engine, and leaves the output only while it is disabled.
#[derive(Debug, Default)]
pub struct ActivationEngine {
    activated: IndexSet<String>,
    last_output: Option<Vec<ExtensionDescriptor>>,
}

impl ActivationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activated ids in activation order.
    pub fn activated_ids(&self) -> Vec<String> {
        self.activated.iter().cloned().collect()
    }

    pub fn is_activated(&self, id: &str) -> bool {
        self.activated.contains(id)
    }

    /// Forgets the last emitted list so the next cycle always emits.
    ///
    /// The activated set is kept.
    pub fn reset_emissions(&mut self) {
        self.last_output = None;
    }

    /// Runs one activation cycle.
    pub fn observe(
        &mut self,
        model: &ModelSnapshot,
        enabled: &[ExtensionDescriptor],
    ) -> ActivationCycle {
        let languages = model.languages();
        let mut newly_activated = Vec::new();
        let mut diagnostics = Vec::new();

        for descriptor in enabled {
            match evaluate(descriptor, &languages) {
                Ok(true) => {
                    if self.activated.insert(descriptor.id.clone()) {
                        info!(
                            "event=extension_activated module=activation status=ok id={}",
                            descriptor.id
                        );
                        newly_activated.push(descriptor.id.clone());
                    }
                }
                Ok(false) => {}
                Err(diagnostic) => {
                    warn!(
                        "event=activation_skipped module=activation status=error code={} id={} error={}",
                        diagnostic.code(),
                        descriptor.id,
                        diagnostic
                    );
                    diagnostics.push(diagnostic);
                }
            }
        }

        let output: Vec<ExtensionDescriptor> = enabled
            .iter()
            .filter(|descriptor| {
                self.activated.contains(&descriptor.id)
                    && matches!(descriptor.manifest, ManifestState::Present { .. })
            })
            .cloned()
            .collect();

        let output = if self.last_output.as_ref() == Some(&output) {
            debug!(
                "event=activation_cycle module=activation status=skip active={}",
                output.len()
            );
            None
        } else {
            debug!(
                "event=activation_cycle module=activation status=ok active={} activated_total={}",
                output.len(),
                self.activated.len()
            );
            self.last_output = Some(output.clone());
            Some(output)
        };

        ActivationCycle {
            output,
            newly_activated,
            diagnostics,
        }
    }
}

fn evaluate(
    descriptor: &ExtensionDescriptor,
    languages: &BTreeSet<&str>,
) -> Result<bool, ActivationError> {
    let manifest = match &descriptor.manifest {
        ManifestState::Present { manifest } => manifest,
        ManifestState::Missing => {
            return Err(ActivationError::MissingManifest {
                id: descriptor.id.clone(),
            })
        }
        ManifestState::Failed { message } => {
            return Err(ActivationError::ManifestError {
                id: descriptor.id.clone(),
                message: message.clone(),
            })
        }
    };

    let events = manifest.activation_events();
    if events.is_empty() {
        return Err(ActivationError::NoActivationEvents {
            id: descriptor.id.clone(),
        });
    }

    any_event_matches(events, languages).map_err(|failure| ActivationError::PredicateFailed {
        id: descriptor.id.clone(),
        event: failure.event,
        source: failure.error,
    })
}
