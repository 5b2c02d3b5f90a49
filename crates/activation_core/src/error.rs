//! Error and diagnostic types for the activation pipeline.
//!
//! None of these are fatal to the output stream: activation and resolution
//! collect them as per-extension diagnostics and keep going.

use crate::extension::activation_event::ActivationEventError;
use thiserror::Error;

/// Per-extension diagnostic recorded during activation or script resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActivationError {
    /// Catalog has no manifest; excluded until the descriptor changes.
    #[error("extension `{id}` not found")]
    MissingManifest { id: String },

    /// Catalog lookup failed; excluded until the descriptor changes.
    #[error("extension `{id}` manifest unavailable: {message}")]
    ManifestError { id: String, message: String },

    /// Manifest declares no activation events.
    #[error("extension `{id}` has no activation events, so it will never activate")]
    NoActivationEvents { id: String },

    /// Predicate evaluation failed; excluded for this cycle only.
    #[error("extension `{id}` activation event `{event}` failed: {source}")]
    PredicateFailed {
        id: String,
        event: String,
        #[source]
        source: ActivationEventError,
    },

    /// Manifest names no script entry point; nothing to resolve.
    #[error("extension `{id}` manifest declares no script url")]
    MissingScriptUrl { id: String },

    /// Script URL could not be resolved; cached for the engine lifetime.
    #[error("extension `{id}` script url `{url}` did not resolve: {message}")]
    ScriptResolution {
        id: String,
        url: String,
        message: String,
    },
}

impl ActivationError {
    pub fn extension_id(&self) -> &str {
        match self {
            Self::MissingManifest { id }
            | Self::ManifestError { id, .. }
            | Self::NoActivationEvents { id }
            | Self::PredicateFailed { id, .. }
            | Self::MissingScriptUrl { id }
            | Self::ScriptResolution { id, .. } => id,
        }
    }

    /// Stable snake_case code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingManifest { .. } => "missing_manifest",
            Self::ManifestError { .. } => "manifest_error",
            Self::NoActivationEvents { .. } => "no_activation_events",
            Self::PredicateFailed { .. } => "predicate_failed",
            Self::MissingScriptUrl { .. } => "missing_script_url",
            Self::ScriptResolution { .. } => "script_resolution",
        }
    }
}

/// Failure reported by a catalog lookup implementation for one id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("extension lookup failed: {0}")]
pub struct LookupError(pub String);

/// Failure reported by the host while resolving a script url.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("script host failed: {0}")]
pub struct ScriptHostError(pub String);
