//! Memoized script url resolution.

use crate::error::{ActivationError, ScriptHostError};
use crate::model::descriptor::{ExecutableExtension, ExtensionDescriptor};
use async_trait::async_trait;
use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Host-provided resolution of a manifest script url to a loadable url.
///
/// `Ok(None)` means the host knows the url cannot be loaded.
#[async_trait]
pub trait ScriptHost: Send + Sync {
    async fn resolve_url(&self, url: &str) -> Result<Option<String>, ScriptHostError>;
}

type PendingUrl = Shared<BoxFuture<'static, Option<String>>>;

enum CacheEntry {
    Settled(Option<String>),
    InFlight(PendingUrl),
}

type UrlCache = Arc<Mutex<HashMap<String, CacheEntry>>>;

/// Outcome of resolving one batch of active extensions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedBatch {
    pub extensions: Vec<ExecutableExtension>,
    pub diagnostics: Vec<ActivationError>,
}

/// Resolves active extensions to executable ones through the host.
///
/// Every distinct url reaches the host at most once; successes and failures
/// both stay cached for the resolver's lifetime. Host calls run as spawned
/// tasks, so a caller that stops waiting does not cancel a lookup.
pub struct ScriptResolver {
    host: Arc<dyn ScriptHost>,
    cache: UrlCache,
    invocations: Arc<AtomicUsize>,
}

impl ScriptResolver {
    pub fn new(host: Arc<dyn ScriptHost>) -> Self {
        Self {
            host,
            cache: Arc::new(Mutex::new(HashMap::new())),
            invocations: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of host calls issued so far.
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    /// Settled cache value for `url`; `None` while unknown or in flight.
    pub fn cached(&self, url: &str) -> Option<Option<String>> {
        match lock_cache(&self.cache).get(url) {
            Some(CacheEntry::Settled(resolved)) => Some(resolved.clone()),
            _ => None,
        }
    }

    /// Resolves one url, joining an in-flight lookup when there is one.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn resolve_url(&self, url: &str) -> Option<String> {
        let pending = {
            let mut cache = lock_cache(&self.cache);
            match cache.get(url) {
                Some(CacheEntry::Settled(resolved)) => return resolved.clone(),
                Some(CacheEntry::InFlight(pending)) => pending.clone(),
                None => {
                    let pending = self.spawn_lookup(url.to_string());
                    cache.insert(url.to_string(), CacheEntry::InFlight(pending.clone()));
                    pending
                }
            }
        };
        pending.await
    }

    /// Resolves a batch concurrently and waits for every lookup to settle.
    ///
    /// Output keeps batch order and drops extensions without a resolved url.
    pub async fn resolve_batch(&self, active: &[ExtensionDescriptor]) -> ResolvedBatch {
        let outcomes = join_all(active.iter().map(|descriptor| self.resolve_one(descriptor))).await;

        let mut batch = ResolvedBatch::default();
        for outcome in outcomes {
            match outcome {
                Ok(executable) => batch.extensions.push(executable),
                Err(diagnostic) => {
                    warn!(
                        "event=script_dropped module=resolver status=error id={} error={}",
                        diagnostic.extension_id(),
                        diagnostic
                    );
                    batch.diagnostics.push(diagnostic);
                }
            }
        }
        debug!(
            "event=script_batch module=resolver status=ok requested={} executable={}",
            active.len(),
            batch.extensions.len()
        );
        batch
    }

    async fn resolve_one(
        &self,
        descriptor: &ExtensionDescriptor,
    ) -> Result<ExecutableExtension, ActivationError> {
        let Some(url) = descriptor
            .manifest
            .manifest()
            .and_then(|manifest| manifest.url.as_deref())
        else {
            return Err(ActivationError::MissingScriptUrl {
                id: descriptor.id.clone(),
            });
        };

        match self.resolve_url(url).await {
            Some(script_url) => Ok(ExecutableExtension {
                id: descriptor.id.clone(),
                script_url,
            }),
            None => Err(ActivationError::ScriptResolution {
                id: descriptor.id.clone(),
                url: url.to_string(),
                message: "host resolved no script url".to_string(),
            }),
        }
    }

    // Called with the cache lock held; the task only settles the entry after
    // the caller has inserted it.
    fn spawn_lookup(&self, url: String) -> PendingUrl {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        let host = Arc::clone(&self.host);
        let cache = Arc::clone(&self.cache);
        let task_url = url.clone();

        let task = tokio::spawn(async move {
            let resolved = match host.resolve_url(&task_url).await {
                Ok(Some(resolved)) => {
                    debug!(
                        "event=script_resolve module=resolver status=ok url={} resolved={}",
                        task_url, resolved
                    );
                    Some(resolved)
                }
                Ok(None) => {
                    warn!(
                        "event=script_resolve module=resolver status=error url={} error=null_url",
                        task_url
                    );
                    None
                }
                Err(err) => {
                    warn!(
                        "event=script_resolve module=resolver status=error url={} error={}",
                        task_url, err
                    );
                    None
                }
            };
            lock_cache(&cache).insert(task_url, CacheEntry::Settled(resolved.clone()));
            resolved
        });

        let failed_cache = Arc::clone(&self.cache);
        async move {
            match task.await {
                Ok(resolved) => resolved,
                Err(err) => {
                    warn!(
                        "event=script_resolve module=resolver status=error url={} error=task_failed detail={}",
                        url, err
                    );
                    lock_cache(&failed_cache).insert(url, CacheEntry::Settled(None));
                    None
                }
            }
        }
        .boxed()
        .shared()
    }
}

fn lock_cache(cache: &UrlCache) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}
