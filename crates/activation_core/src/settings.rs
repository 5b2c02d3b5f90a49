//! Extension enablement settings.
//!
//! # Responsibility
//! - Model the merged settings view the pipeline reads enablement flags from.
//! - Provide a live settings value with synchronous reads and ordered change
//!   notification.
//!
//! # Invariants
//! - Referenced ids keep first-appearance order across merges.
//! - Subscribers observe every update, in the order `update` was called.

use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::mpsc;

/// Settings parse errors.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid settings json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Merged view of extension enablement flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsSnapshot {
    #[serde(default)]
    pub extensions: IndexMap<String, bool>,
}

impl SettingsSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses one settings subject from JSON text.
    pub fn from_json(raw: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Builder-style flag assignment.
    pub fn with_extension(mut self, id: impl Into<String>, enabled: bool) -> Self {
        self.extensions.insert(id.into(), enabled);
        self
    }

    /// Merges a settings cascade; later layers override earlier flags.
    pub fn merged<'a, I>(layers: I) -> Self
    where
        I: IntoIterator<Item = &'a SettingsSnapshot>,
    {
        let mut merged = Self::default();
        for layer in layers {
            for (id, enabled) in &layer.extensions {
                merged.extensions.insert(id.clone(), *enabled);
            }
        }
        merged
    }

    /// Ids referenced by settings, enabled or not.
    pub fn referenced_ids(&self) -> Vec<String> {
        self.extensions.keys().cloned().collect()
    }

    pub fn is_enabled(&self, id: &str) -> bool {
        self.extensions.get(id).copied().unwrap_or(false)
    }
}

// Returns false once the receiving side is gone.
type Subscriber = Box<dyn Fn(SettingsSnapshot) -> bool + Send>;

struct SourceState {
    current: SettingsSnapshot,
    subscribers: Vec<Subscriber>,
}

/// Live settings value shared between the settings owner and the pipeline.
#[derive(Clone)]
pub struct SettingsSource {
    state: Arc<Mutex<SourceState>>,
}

impl SettingsSource {
    pub fn new(initial: SettingsSnapshot) -> Self {
        Self {
            state: Arc::new(Mutex::new(SourceState {
                current: initial,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Current merged snapshot.
    pub fn current(&self) -> SettingsSnapshot {
        self.lock().current.clone()
    }

    /// Replaces the snapshot and notifies live subscribers.
    pub fn update(&self, snapshot: SettingsSnapshot) {
        let mut state = self.lock();
        state.current = snapshot;
        let current = state.current.clone();
        state
            .subscribers
            .retain(|subscriber| subscriber(current.clone()));
        debug!(
            "event=settings_update module=settings status=ok referenced={} subscribers={}",
            current.extensions.len(),
            state.subscribers.len()
        );
    }

    /// Subscribes to future updates; the current value is not replayed.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<SettingsSnapshot> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribe_with(sender, |snapshot| snapshot);
        receiver
    }

    /// Forwards future updates into an existing channel, wrapped by `wrap`.
    ///
    /// Updates land in the channel synchronously inside `update`, so they keep
    /// their order relative to anything else sent on the same channel.
    pub fn subscribe_with<T, F>(&self, sender: mpsc::UnboundedSender<T>, wrap: F)
    where
        T: Send + 'static,
        F: Fn(SettingsSnapshot) -> T + Send + 'static,
    {
        self.lock()
            .subscribers
            .push(Box::new(move |snapshot| sender.send(wrap(snapshot)).is_ok()));
    }

    fn lock(&self) -> MutexGuard<'_, SourceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
