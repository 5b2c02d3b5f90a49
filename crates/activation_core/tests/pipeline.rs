use activation_core::{
    ActivationService, ExecutableExtension, ExtensionLookup, LookupError, ModelSnapshot,
    ScriptHost, ScriptHostError, SettingsSnapshot, SettingsSource,
};
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

const WAIT: Duration = Duration::from_secs(2);
const QUIET: Duration = Duration::from_millis(50);

struct StaticRegistry {
    manifests: HashMap<String, String>,
    fetches: AtomicUsize,
}

impl StaticRegistry {
    fn new(entries: &[(&str, serde_json::Value)]) -> Arc<Self> {
        Arc::new(Self {
            manifests: entries
                .iter()
                .map(|(id, manifest)| (id.to_string(), manifest.to_string()))
                .collect(),
            fetches: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ExtensionLookup for StaticRegistry {
    async fn fetch_manifest(&self, id: &str) -> Result<Option<String>, LookupError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.manifests.get(id).cloned())
    }
}

#[derive(Default)]
struct CountingHost {
    calls: AtomicUsize,
}

#[async_trait]
impl ScriptHost for CountingHost {
    async fn resolve_url(&self, url: &str) -> Result<Option<String>, ScriptHostError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if url.contains("broken") {
            return Ok(None);
        }
        Ok(Some(format!("blob:{url}")))
    }
}

fn registry() -> Arc<StaticRegistry> {
    StaticRegistry::new(&[
        (
            "acme/go",
            json!({"url": "go.js", "activationEvents": ["onLanguage:go"]}),
        ),
        (
            "acme/python",
            json!({"url": "python.js", "activationEvents": ["onLanguage:python"]}),
        ),
        (
            "acme/broken",
            json!({"url": "broken.js", "activationEvents": ["*"]}),
        ),
    ])
}

fn all_enabled() -> SettingsSnapshot {
    SettingsSnapshot::new()
        .with_extension("acme/go", true)
        .with_extension("acme/python", true)
}

fn ids(output: &[ExecutableExtension]) -> Vec<&str> {
    output.iter().map(|executable| executable.id.as_str()).collect()
}

async fn next(handle: &mut activation_core::PipelineHandle) -> Vec<ExecutableExtension> {
    tokio::time::timeout(WAIT, handle.next())
        .await
        .expect("pipeline should emit in time")
        .expect("pipeline should still be running")
}

async fn assert_quiet(handle: &mut activation_core::PipelineHandle) {
    assert!(tokio::time::timeout(QUIET, handle.next()).await.is_err());
}

#[tokio::test]
async fn emits_sticky_activation_as_documents_change() {
    let service = ActivationService::new(registry(), Arc::new(CountingHost::default()));
    let settings = SettingsSource::new(all_enabled());
    let mut handle = service.subscribe(&settings);
    let models = handle.documents();

    models
        .send(ModelSnapshot::from_languages(["go"]))
        .expect("send model");
    let output = next(&mut handle).await;
    assert_eq!(ids(&output), vec!["acme/go"]);
    assert_eq!(output[0].script_url, "blob:go.js");

    models
        .send(ModelSnapshot::from_languages(["python"]))
        .expect("send model");
    assert_eq!(ids(&next(&mut handle).await), vec!["acme/go", "acme/python"]);

    models.send(ModelSnapshot::default()).expect("send model");
    assert_quiet(&mut handle).await;
    assert_eq!(service.activated_ids(), vec!["acme/go", "acme/python"]);
}

#[tokio::test]
async fn reenabling_resurfaces_without_refetching_catalog() {
    let registry = registry();
    let service = ActivationService::new(
        Arc::clone(&registry) as Arc<dyn ExtensionLookup>,
        Arc::new(CountingHost::default()),
    );
    let settings = SettingsSource::new(all_enabled());
    let mut handle = service.subscribe(&settings);
    let models = handle.documents();

    models
        .send(ModelSnapshot::from_languages(["go", "python"]))
        .expect("send model");
    assert_eq!(ids(&next(&mut handle).await), vec!["acme/go", "acme/python"]);
    models
        .send(ModelSnapshot::from_languages(["markdown"]))
        .expect("send model");

    settings.update(
        SettingsSnapshot::new()
            .with_extension("acme/go", false)
            .with_extension("acme/python", true),
    );
    assert_eq!(ids(&next(&mut handle).await), vec!["acme/python"]);

    settings.update(all_enabled());
    assert_eq!(ids(&next(&mut handle).await), vec!["acme/go", "acme/python"]);
    assert_eq!(registry.fetches.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn newly_referenced_extension_is_fetched_and_activated() {
    let registry = registry();
    let service = ActivationService::new(
        Arc::clone(&registry) as Arc<dyn ExtensionLookup>,
        Arc::new(CountingHost::default()),
    );
    let settings = SettingsSource::new(SettingsSnapshot::new().with_extension("acme/go", true));
    let mut handle = service.subscribe(&settings);
    let models = handle.documents();

    models
        .send(ModelSnapshot::from_languages(["python"]))
        .expect("send model");
    assert!(next(&mut handle).await.is_empty());

    settings.update(all_enabled());
    assert_eq!(ids(&next(&mut handle).await), vec!["acme/python"]);
    assert_eq!(registry.fetches.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn null_script_url_is_never_emitted_or_retried() {
    let host = Arc::new(CountingHost::default());
    let service = ActivationService::new(registry(), Arc::clone(&host) as Arc<dyn ScriptHost>);
    let settings = SettingsSource::new(
        SettingsSnapshot::new()
            .with_extension("acme/broken", true)
            .with_extension("acme/go", true),
    );
    let mut handle = service.subscribe(&settings);
    let models = handle.documents();

    models.send(ModelSnapshot::default()).expect("send model");
    assert!(next(&mut handle).await.is_empty());

    models
        .send(ModelSnapshot::from_languages(["go"]))
        .expect("send model");
    assert_eq!(ids(&next(&mut handle).await), vec!["acme/go"]);
    assert_eq!(host.calls.load(Ordering::SeqCst), 2);
    assert_eq!(service.resolver().cached("broken.js"), Some(None));
}

#[tokio::test]
async fn resubscribing_keeps_activated_set_and_url_cache() {
    let host = Arc::new(CountingHost::default());
    let service = ActivationService::new(registry(), Arc::clone(&host) as Arc<dyn ScriptHost>);
    let settings = SettingsSource::new(all_enabled());

    let mut handle = service.subscribe(&settings);
    let models = handle.documents();
    models
        .send(ModelSnapshot::from_languages(["go"]))
        .expect("send model");
    assert_eq!(ids(&next(&mut handle).await), vec!["acme/go"]);
    handle.shutdown();

    let mut handle = service.subscribe(&settings);
    let models = handle.documents();
    models.send(ModelSnapshot::default()).expect("send model");
    assert_eq!(ids(&next(&mut handle).await), vec!["acme/go"]);
    assert_eq!(host.calls.load(Ordering::SeqCst), 1);
}

struct SlowHost {
    gate: Notify,
    calls: AtomicUsize,
}

#[async_trait]
impl ScriptHost for SlowHost {
    async fn resolve_url(&self, url: &str) -> Result<Option<String>, ScriptHostError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if url == "go.js" {
            self.gate.notified().await;
        }
        Ok(Some(format!("blob:{url}")))
    }
}

#[tokio::test]
async fn newer_batch_supersedes_pending_resolution() {
    let host = Arc::new(SlowHost {
        gate: Notify::new(),
        calls: AtomicUsize::new(0),
    });
    let service = ActivationService::new(registry(), Arc::clone(&host) as Arc<dyn ScriptHost>);
    let settings = SettingsSource::new(all_enabled());
    let mut handle = service.subscribe(&settings);
    let models = handle.documents();

    models
        .send(ModelSnapshot::from_languages(["go"]))
        .expect("send model");
    assert_quiet(&mut handle).await;

    models
        .send(ModelSnapshot::from_languages(["python"]))
        .expect("send model");
    assert_quiet(&mut handle).await;

    host.gate.notify_one();
    assert_eq!(ids(&next(&mut handle).await), vec!["acme/go", "acme/python"]);
    assert_eq!(host.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn dropping_the_handle_stops_the_loop() {
    let service = ActivationService::new(registry(), Arc::new(CountingHost::default()));
    let settings = SettingsSource::new(all_enabled());
    let handle = service.subscribe(&settings);
    let models = handle.documents();
    drop(handle);

    tokio::time::sleep(QUIET).await;
    assert!(models.send(ModelSnapshot::default()).is_err());
}

#[tokio::test]
async fn document_then_settings_change_are_applied_in_send_order() {
    let service = ActivationService::new(registry(), Arc::new(CountingHost::default()));
    let settings = SettingsSource::new(all_enabled());
    let mut handle = service.subscribe(&settings);
    let models = handle.documents();

    models
        .send(ModelSnapshot::from_languages(["python"]))
        .expect("send model");
    assert_eq!(ids(&next(&mut handle).await), vec!["acme/python"]);

    // Both queued before the loop runs: the go document must be seen while
    // acme/go is still enabled.
    models
        .send(ModelSnapshot::from_languages(["go"]))
        .expect("send model");
    settings.update(
        SettingsSnapshot::new()
            .with_extension("acme/go", false)
            .with_extension("acme/python", true),
    );
    assert!(handle.flush().await);
    while handle.try_next().is_some() {}
    assert_eq!(service.activated_ids(), vec!["acme/python", "acme/go"]);

    models
        .send(ModelSnapshot::from_languages(["markdown"]))
        .expect("send model");
    settings.update(all_enabled());
    assert_eq!(ids(&next(&mut handle).await), vec!["acme/go", "acme/python"]);
}

#[tokio::test]
async fn flush_waits_for_pending_resolution() {
    let service = ActivationService::new(registry(), Arc::new(CountingHost::default()));
    let settings = SettingsSource::new(all_enabled());
    let mut handle = service.subscribe(&settings);

    handle
        .documents()
        .send(ModelSnapshot::from_languages(["go"]))
        .expect("send model");
    assert!(handle.flush().await);
    let output = handle.try_next().expect("emission queued before flush returns");
    assert_eq!(ids(&output), vec!["acme/go"]);
    assert!(handle.try_next().is_none());
}
