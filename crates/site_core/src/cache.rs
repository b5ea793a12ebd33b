use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

use chrono::{DateTime, Utc};
use futures::{
    future::{BoxFuture, Shared},
    FutureExt,
};
use serde_json::Value;
use shared::{
    domain::{ResourceKey, ResourceStatus},
    error::{FetchError, ReportedError},
};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    config::Settings,
    fetch::{HttpFetcher, ResourceFetcher},
};

const DEFAULT_EVENT_BUFFER: usize = 256;

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<Value>, FetchError>>>;

/// Snapshot of one remote collection and its fetch state.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub key: ResourceKey,
    pub status: ResourceStatus,
    pub payload: Option<Arc<Value>>,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub last_error: Option<FetchError>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheEvent {
    StatusChanged {
        resource: ResourceKey,
        status: ResourceStatus,
    },
    Failed {
        resource: ResourceKey,
        error: ReportedError,
    },
}

#[derive(Default)]
struct ResourceEntry {
    status: ResourceStatus,
    payload: Option<Arc<Value>>,
    last_fetched_at: Option<DateTime<Utc>>,
    last_error: Option<FetchError>,
    generation: u64,
    inflight: Option<SharedFetch>,
}

impl ResourceEntry {
    fn snapshot(&self, key: &ResourceKey) -> Resource {
        Resource {
            key: key.clone(),
            status: self.status,
            payload: self.payload.clone(),
            last_fetched_at: self.last_fetched_at,
            last_error: self.last_error.clone(),
        }
    }

    fn is_fresh(&self) -> bool {
        self.status == ResourceStatus::Ready
            && self.payload.as_deref().is_some_and(has_content)
    }
}

fn has_content(payload: &Value) -> bool {
    match payload {
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::String(text) => !text.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

enum Begin {
    Fresh,
    Wait { generation: u64, fetch: SharedFetch },
}

/// Session-scoped, single-flight cache of remote collections.
///
/// Each key is fetched at most once at a time; concurrent `load` calls for a
/// key share the same in-flight request. A resource that reached `ready`
/// with content is never fetched again unless it is invalidated.
pub struct ResourceCache {
    fetcher: Arc<dyn ResourceFetcher>,
    entries: Mutex<HashMap<ResourceKey, ResourceEntry>>,
    events: broadcast::Sender<CacheEvent>,
}

impl ResourceCache {
    pub fn new(fetcher: Arc<dyn ResourceFetcher>) -> Arc<Self> {
        Self::with_event_buffer(fetcher, DEFAULT_EVENT_BUFFER)
    }

    pub fn with_event_buffer(fetcher: Arc<dyn ResourceFetcher>, capacity: usize) -> Arc<Self> {
        let (events, _) = broadcast::channel(capacity.max(1));
        Arc::new(Self {
            fetcher,
            entries: Mutex::new(HashMap::new()),
            events,
        })
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Arc<Self>> {
        let fetcher = HttpFetcher::from_settings(settings)?;
        Ok(Self::with_event_buffer(
            Arc::new(fetcher),
            settings.event_buffer,
        ))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    /// Returns the resource for `resource`, creating an empty one on first use.
    pub async fn get(&self, resource: &ResourceKey) -> Resource {
        let mut entries = self.entries.lock().await;
        entries
            .entry(resource.clone())
            .or_default()
            .snapshot(resource)
    }

    pub async fn load(&self, resource: &ResourceKey) -> Result<(), FetchError> {
        let (generation, fetch) = match self.begin(resource).await {
            Begin::Fresh => return Ok(()),
            Begin::Wait { generation, fetch } => (generation, fetch),
        };
        let outcome = fetch.await;
        self.settle(resource, generation, &outcome).await;
        outcome.map(|_| ())
    }

    /// Starts a load in the background. The task holds only a weak reference
    /// while the fetch is pending, so a completion that arrives after the
    /// cache was dropped is discarded.
    pub fn spawn_load(self: &Arc<Self>, resource: ResourceKey) -> JoinHandle<()> {
        let cache = Arc::downgrade(self);
        tokio::spawn(async move {
            let Some(begin) = Self::begin_weak(&cache, &resource).await else {
                return;
            };
            let Begin::Wait { generation, fetch } = begin else {
                return;
            };
            let outcome = fetch.await;
            match cache.upgrade() {
                Some(cache) => cache.settle(&resource, generation, &outcome).await,
                None => debug!(
                    resource = %resource,
                    "cache: dropped before fetch completed; ignoring result"
                ),
            }
        })
    }

    async fn begin_weak(cache: &Weak<Self>, resource: &ResourceKey) -> Option<Begin> {
        let cache = cache.upgrade()?;
        Some(cache.begin(resource).await)
    }

    /// Marks a settled resource as empty so the next `load` fetches again.
    /// The previous payload stays visible until a new one arrives.
    pub async fn invalidate(&self, resource: &ResourceKey) {
        let mut entries = self.entries.lock().await;
        let entry = entries.entry(resource.clone()).or_default();
        if entry.inflight.is_some() {
            debug!(resource = %resource, "cache: invalidate ignored while loading");
            return;
        }
        if entry.status != ResourceStatus::Empty {
            entry.status = ResourceStatus::Empty;
            self.notify(CacheEvent::StatusChanged {
                resource: resource.clone(),
                status: ResourceStatus::Empty,
            });
        }
    }

    async fn begin(&self, resource: &ResourceKey) -> Begin {
        let mut entries = self.entries.lock().await;
        let entry = entries.entry(resource.clone()).or_default();

        if let Some(fetch) = entry.inflight.clone() {
            debug!(
                resource = %resource,
                "cache: fetch already in flight; joining"
            );
            return Begin::Wait {
                generation: entry.generation,
                fetch,
            };
        }
        if entry.is_fresh() {
            debug!(resource = %resource, "cache: resource ready; skipping fetch");
            return Begin::Fresh;
        }

        let fetcher = Arc::clone(&self.fetcher);
        let key = resource.clone();
        let fetch = async move { fetcher.fetch(&key).await.map(Arc::new) }
            .boxed()
            .shared();

        entry.generation += 1;
        entry.status = ResourceStatus::Loading;
        entry.inflight = Some(fetch.clone());
        info!(
            resource = %resource,
            generation = entry.generation,
            "cache: fetch started"
        );
        self.notify(CacheEvent::StatusChanged {
            resource: resource.clone(),
            status: ResourceStatus::Loading,
        });

        Begin::Wait {
            generation: entry.generation,
            fetch,
        }
    }

    async fn settle(
        &self,
        resource: &ResourceKey,
        generation: u64,
        outcome: &Result<Arc<Value>, FetchError>,
    ) {
        let mut entries = self.entries.lock().await;
        let Some(entry) = entries.get_mut(resource) else {
            return;
        };
        // Every waiter settles; only the first one for this generation applies.
        if entry.generation != generation || entry.inflight.is_none() {
            return;
        }
        entry.inflight = None;

        match outcome {
            Ok(payload) => {
                entry.status = ResourceStatus::Ready;
                entry.payload = Some(Arc::clone(payload));
                entry.last_fetched_at = Some(Utc::now());
                entry.last_error = None;
                info!(resource = %resource, "cache: fetch succeeded");
                self.notify(CacheEvent::StatusChanged {
                    resource: resource.clone(),
                    status: ResourceStatus::Ready,
                });
            }
            Err(err) => {
                entry.status = ResourceStatus::Failed;
                entry.last_error = Some(err.clone());
                warn!(resource = %resource, error = %err, "cache: fetch failed");
                self.notify(CacheEvent::StatusChanged {
                    resource: resource.clone(),
                    status: ResourceStatus::Failed,
                });
                self.notify(CacheEvent::Failed {
                    resource: resource.clone(),
                    error: ReportedError::from(err),
                });
            }
        }
    }

    fn notify(&self, event: CacheEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/cache_tests.rs"]
mod tests;
