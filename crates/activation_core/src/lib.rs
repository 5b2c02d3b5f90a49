//! Extension activation engine.
//!
//! Decides, from a catalog of configured extensions, which ones are enabled
//! and should be running for the currently visible documents, and resolves
//! them to loadable scripts for the host.

pub mod catalog;
pub mod engine;
pub mod error;
pub mod extension;
pub mod filter;
pub mod logging;
pub mod model;
pub mod settings;

pub use catalog::{ConfiguredExtensionCatalog, ExtensionLookup};
pub use engine::activation::{ActivationCycle, ActivationEngine};
pub use engine::pipeline::{ActivationService, DocumentSender, PipelineHandle};
pub use engine::resolver::{ResolvedBatch, ScriptHost, ScriptResolver};
pub use error::{ActivationError, LookupError, ScriptHostError};
pub use extension::activation_event::{ActivationEvent, ActivationEventError};
pub use extension::manifest::ExtensionManifest;
pub use filter::enabled_extensions;
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use model::descriptor::{ExecutableExtension, ExtensionDescriptor, ManifestState};
pub use model::document::{DocumentDescriptor, ModelSnapshot};
pub use settings::{SettingsError, SettingsSnapshot, SettingsSource};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
