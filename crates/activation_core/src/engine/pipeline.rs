//! Live activation pipeline.
//!
//! One consumer loop per subscription combines the latest settings, catalog
//! and document snapshot, runs activation synchronously and resolves script
//! urls asynchronously with switch-to-latest semantics.
//!
//! Settings and document changes share one input channel, so the loop sees
//! them in the order they were sent. While a catalog fetch is outstanding no
//! further input is taken, which keeps activation a function of the input
//! sequence alone.

use crate::catalog::{ConfiguredExtensionCatalog, ExtensionLookup};
use crate::engine::activation::ActivationEngine;
use crate::engine::resolver::{ResolvedBatch, ScriptHost, ScriptResolver};
use crate::filter::enabled_extensions;
use crate::model::descriptor::{ExecutableExtension, ExtensionDescriptor};
use crate::model::document::ModelSnapshot;
use crate::settings::{SettingsSnapshot, SettingsSource};
use futures::future::{BoxFuture, FutureExt};
use log::{debug, info};
use std::future::pending;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::{AbortHandle, JoinHandle};

enum PipelineInput {
    Settings(SettingsSnapshot),
    Documents(ModelSnapshot),
    /// Answered once every earlier input is fully processed.
    Flush(oneshot::Sender<()>),
}

/// One activation engine instance.
///
/// Owns the activated set and the url cache. Both outlive individual
/// subscriptions and are only dropped with the service.
pub struct ActivationService {
    engine: Arc<Mutex<ActivationEngine>>,
    resolver: Arc<ScriptResolver>,
    catalog: ConfiguredExtensionCatalog,
    active_loop: Mutex<Option<AbortHandle>>,
}

impl ActivationService {
    pub fn new(lookup: Arc<dyn ExtensionLookup>, host: Arc<dyn ScriptHost>) -> Self {
        Self {
            engine: Arc::new(Mutex::new(ActivationEngine::new())),
            resolver: Arc::new(ScriptResolver::new(host)),
            catalog: ConfiguredExtensionCatalog::new(lookup),
            active_loop: Mutex::new(None),
        }
    }

    /// Ids activated so far, in activation order.
    pub fn activated_ids(&self) -> Vec<String> {
        lock(&self.engine).activated_ids()
    }

    pub fn resolver(&self) -> &ScriptResolver {
        &self.resolver
    }

    /// Starts the pipeline loop on `settings`.
    ///
    /// Document snapshots are fed through [`PipelineHandle::documents`]. A
    /// previous subscription of this service is stopped first. Must be called
    /// from within a tokio runtime.
    pub fn subscribe(&self, settings: &SettingsSource) -> PipelineHandle {
        if let Some(previous) = lock(&self.active_loop).take() {
            previous.abort();
            debug!("event=pipeline_replaced module=pipeline status=ok");
        }
        lock(&self.engine).reset_emissions();

        let (inputs, input_rx) = mpsc::unbounded_channel();
        settings.subscribe_with(inputs.clone(), PipelineInput::Settings);
        let (outputs, receiver) = mpsc::unbounded_channel();
        let state = PipelineState {
            engine: Arc::clone(&self.engine),
            resolver: Arc::clone(&self.resolver),
            catalog: self.catalog.clone(),
            settings: settings.current(),
            catalog_ids: None,
            descriptors: None,
            model: None,
        };

        let task = tokio::spawn(run(state, input_rx, outputs));
        *lock(&self.active_loop) = Some(task.abort_handle());
        info!("event=pipeline_start module=pipeline status=ok");

        PipelineHandle {
            inputs,
            outputs: receiver,
            task,
        }
    }
}

/// Feeds visible-document snapshots into a running pipeline.
#[derive(Clone)]
pub struct DocumentSender {
    inputs: mpsc::UnboundedSender<PipelineInput>,
}

impl DocumentSender {
    /// Queues a snapshot; hands it back when the pipeline has stopped.
    pub fn send(&self, model: ModelSnapshot) -> Result<(), ModelSnapshot> {
        self.inputs
            .send(PipelineInput::Documents(model))
            .map_err(|err| match err.0 {
                PipelineInput::Documents(model) => model,
                _ => ModelSnapshot::default(),
            })
    }
}

/// Subscription to executable extension lists.
///
/// Dropping the handle stops batch processing.
pub struct PipelineHandle {
    inputs: mpsc::UnboundedSender<PipelineInput>,
    outputs: mpsc::UnboundedReceiver<Vec<ExecutableExtension>>,
    task: JoinHandle<()>,
}

impl PipelineHandle {
    pub fn documents(&self) -> DocumentSender {
        DocumentSender {
            inputs: self.inputs.clone(),
        }
    }

    /// Waits until every input sent so far has been processed and its
    /// emission, if any, is queued. Returns `false` once the loop has stopped.
    pub async fn flush(&self) -> bool {
        let (ack, done) = oneshot::channel();
        if self.inputs.send(PipelineInput::Flush(ack)).is_err() {
            return false;
        }
        done.await.is_ok()
    }

    /// Next emitted list; `None` once the loop has stopped.
    pub async fn next(&mut self) -> Option<Vec<ExecutableExtension>> {
        self.outputs.recv().await
    }

    /// Emitted list if one is already queued.
    pub fn try_next(&mut self) -> Option<Vec<ExecutableExtension>> {
        self.outputs.try_recv().ok()
    }

    pub fn shutdown(self) {
        self.task.abort();
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct PipelineState {
    engine: Arc<Mutex<ActivationEngine>>,
    resolver: Arc<ScriptResolver>,
    catalog: ConfiguredExtensionCatalog,
    settings: SettingsSnapshot,
    catalog_ids: Option<Vec<String>>,
    descriptors: Option<Vec<ExtensionDescriptor>>,
    model: Option<ModelSnapshot>,
}

impl PipelineState {
    /// Catalog request when the referenced id list changed.
    fn catalog_request(&mut self) -> Option<BoxFuture<'static, Vec<ExtensionDescriptor>>> {
        let ids = self.settings.referenced_ids();
        if self.catalog_ids.as_ref() == Some(&ids) {
            return None;
        }
        self.catalog_ids = Some(ids.clone());
        debug!(
            "event=catalog_request module=pipeline status=ok referenced={}",
            ids.len()
        );
        let catalog = self.catalog.clone();
        Some(async move { catalog.load_ids(ids).await }.boxed())
    }

    /// Runs one activation cycle; returns a resolution batch when the active
    /// list changed.
    fn recompute(&mut self) -> Option<BoxFuture<'static, ResolvedBatch>> {
        let (Some(model), Some(descriptors)) = (&self.model, &self.descriptors) else {
            return None;
        };
        let enabled = enabled_extensions(descriptors, &self.settings);
        let active = lock(&self.engine).observe(model, &enabled).output?;

        let resolver = Arc::clone(&self.resolver);
        Some(async move { resolver.resolve_batch(&active).await }.boxed())
    }
}

async fn run(
    mut state: PipelineState,
    mut inputs: mpsc::UnboundedReceiver<PipelineInput>,
    outputs: mpsc::UnboundedSender<Vec<ExecutableExtension>>,
) {
    let mut pending_catalog = state.catalog_request();
    let mut pending_batch: Option<BoxFuture<'static, ResolvedBatch>> = None;
    let mut flushes: Vec<oneshot::Sender<()>> = Vec::new();
    let mut inputs_open = true;

    loop {
        if pending_catalog.is_none() && pending_batch.is_none() {
            for ack in flushes.drain(..) {
                let _ = ack.send(());
            }
            if !inputs_open {
                break;
            }
        }

        tokio::select! {
            biased;

            _ = outputs.closed() => break,

            input = inputs.recv(), if inputs_open && pending_catalog.is_none() => match input {
                Some(PipelineInput::Settings(settings)) => {
                    state.settings = settings;
                    pending_catalog = state.catalog_request();
                    replace_batch(&mut pending_batch, state.recompute());
                }
                Some(PipelineInput::Documents(model)) => {
                    state.model = Some(model);
                    replace_batch(&mut pending_batch, state.recompute());
                }
                Some(PipelineInput::Flush(ack)) => flushes.push(ack),
                None => inputs_open = false,
            },

            descriptors = settle(&mut pending_catalog), if pending_catalog.is_some() => {
                pending_catalog = None;
                state.descriptors = Some(descriptors);
                replace_batch(&mut pending_batch, state.recompute());
            }

            batch = settle(&mut pending_batch), if pending_batch.is_some() => {
                pending_batch = None;
                if outputs.send(batch.extensions).is_err() {
                    break;
                }
            }
        }
    }
    info!("event=pipeline_stop module=pipeline status=ok");
}

fn replace_batch(
    slot: &mut Option<BoxFuture<'static, ResolvedBatch>>,
    next: Option<BoxFuture<'static, ResolvedBatch>>,
) {
    if let Some(next) = next {
        if slot.replace(next).is_some() {
            debug!("event=batch_superseded module=pipeline status=skip");
        }
    }
}

async fn settle<T>(slot: &mut Option<BoxFuture<'static, T>>) -> T {
    match slot {
        Some(future) => future.await,
        None => pending().await,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
