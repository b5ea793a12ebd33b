use std::{
    collections::VecDeque,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use super::*;
use async_trait::async_trait;
use serde_json::json;
use shared::error::ErrorCode;
use tokio::sync::Semaphore;

struct ScriptedFetcher {
    calls: AtomicUsize,
    responses: std::sync::Mutex<VecDeque<Result<Value, FetchError>>>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedFetcher {
    fn new(responses: impl IntoIterator<Item = Result<Value, FetchError>>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            responses: std::sync::Mutex::new(responses.into_iter().collect()),
            gate: None,
        }
    }

    fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceFetcher for ScriptedFetcher {
    async fn fetch(&self, resource: &ResourceKey) -> Result<Value, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        self.responses
            .lock()
            .expect("responses")
            .pop_front()
            .unwrap_or_else(|| {
                Err(FetchError::Transport {
                    resource: resource.clone(),
                    message: "no scripted response".into(),
                })
            })
    }
}

fn news() -> ResourceKey {
    ResourceKey::from(ResourceKey::NEWS)
}

fn transport_error() -> FetchError {
    FetchError::Transport {
        resource: news(),
        message: "connection reset".into(),
    }
}

async fn wait_for_calls(fetcher: &ScriptedFetcher, expected: usize) {
    for _ in 0..200 {
        if fetcher.calls() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("fetcher never reached {expected} calls");
}

#[tokio::test]
async fn get_creates_empty_resource_once() {
    let cache = ResourceCache::new(Arc::new(ScriptedFetcher::new([])));

    let first = cache.get(&news()).await;
    let second = cache.get(&news()).await;

    assert_eq!(first, second);
    assert_eq!(first.status, ResourceStatus::Empty);
    assert!(first.payload.is_none());
    assert!(first.last_fetched_at.is_none());
}

#[tokio::test]
async fn concurrent_loads_share_one_request() {
    let gate = Arc::new(Semaphore::new(0));
    let fetcher = Arc::new(
        ScriptedFetcher::new([Ok(json!([{ "title": "a" }]))]).gated(Arc::clone(&gate)),
    );
    let cache = ResourceCache::new(fetcher.clone());
    let key = news();

    let (first, second, ()) = tokio::join!(cache.load(&key), cache.load(&key), async {
        tokio::task::yield_now().await;
        gate.add_permits(1);
    });

    assert_eq!(first, Ok(()));
    assert_eq!(second, Ok(()));
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(cache.get(&key).await.status, ResourceStatus::Ready);
}

#[tokio::test]
async fn concurrent_waiters_observe_the_same_failure() {
    let gate = Arc::new(Semaphore::new(0));
    let fetcher =
        Arc::new(ScriptedFetcher::new([Err(transport_error())]).gated(Arc::clone(&gate)));
    let cache = ResourceCache::new(fetcher.clone());
    let key = news();

    let (first, second, ()) = tokio::join!(cache.load(&key), cache.load(&key), async {
        tokio::task::yield_now().await;
        gate.add_permits(1);
    });

    assert_eq!(first, Err(transport_error()));
    assert_eq!(second, Err(transport_error()));
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn ready_resource_is_never_refetched() {
    let fetcher = Arc::new(ScriptedFetcher::new([
        Ok(json!([{ "title": "a" }])),
        Ok(json!([{ "title": "b" }])),
    ]));
    let cache = ResourceCache::new(fetcher.clone());

    cache.load(&news()).await.expect("first load");
    let fetched_at = cache.get(&news()).await.last_fetched_at;
    cache.load(&news()).await.expect("second load");

    let resource = cache.get(&news()).await;
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(resource.payload.as_deref(), Some(&json!([{ "title": "a" }])));
    assert_eq!(resource.last_fetched_at, fetched_at);
}

#[tokio::test]
async fn ready_but_empty_payload_is_fetched_again() {
    let fetcher = Arc::new(ScriptedFetcher::new([
        Ok(json!([])),
        Ok(json!([{ "title": "late" }])),
    ]));
    let cache = ResourceCache::new(fetcher.clone());

    cache.load(&news()).await.expect("first load");
    cache.load(&news()).await.expect("second load");

    assert_eq!(fetcher.calls(), 2);
    assert_eq!(
        cache.get(&news()).await.payload.as_deref(),
        Some(&json!([{ "title": "late" }]))
    );
}

#[tokio::test]
async fn failed_fetch_keeps_previous_payload() {
    let fetcher = Arc::new(ScriptedFetcher::new([
        Ok(json!([{ "title": "kept" }])),
        Err(transport_error()),
    ]));
    let cache = ResourceCache::new(fetcher.clone());

    cache.load(&news()).await.expect("first load");
    cache.invalidate(&news()).await;
    let err = cache.load(&news()).await.unwrap_err();

    let resource = cache.get(&news()).await;
    assert_eq!(err, transport_error());
    assert_eq!(resource.status, ResourceStatus::Failed);
    assert_eq!(resource.payload.as_deref(), Some(&json!([{ "title": "kept" }])));
    assert_eq!(resource.last_error, Some(transport_error()));
}

#[tokio::test]
async fn failure_is_not_retried_until_load_is_called_again() {
    let fetcher = Arc::new(ScriptedFetcher::new([
        Err(transport_error()),
        Ok(json!({ "PhD Scholar": [] })),
    ]));
    let cache = ResourceCache::new(fetcher.clone());

    assert!(cache.load(&news()).await.is_err());
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(cache.get(&news()).await.status, ResourceStatus::Failed);

    cache.load(&news()).await.expect("manual reload");
    let resource = cache.get(&news()).await;
    assert_eq!(fetcher.calls(), 2);
    assert_eq!(resource.status, ResourceStatus::Ready);
    assert!(resource.last_error.is_none());
}

#[tokio::test]
async fn subscribers_observe_transitions() {
    let fetcher = Arc::new(ScriptedFetcher::new([
        Ok(json!([1])),
        Err(FetchError::Status {
            resource: ResourceKey::from(ResourceKey::EVENTS),
            code: 500,
        }),
    ]));
    let cache = ResourceCache::new(fetcher);
    let mut events = cache.subscribe();

    cache.load(&news()).await.expect("load news");
    let _ = cache.load(&ResourceKey::from(ResourceKey::EVENTS)).await;

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }

    assert_eq!(seen.len(), 5);
    assert_eq!(
        seen[0],
        CacheEvent::StatusChanged {
            resource: news(),
            status: ResourceStatus::Loading,
        }
    );
    assert_eq!(
        seen[1],
        CacheEvent::StatusChanged {
            resource: news(),
            status: ResourceStatus::Ready,
        }
    );
    match &seen[4] {
        CacheEvent::Failed { resource, error } => {
            assert_eq!(resource.as_str(), ResourceKey::EVENTS);
            assert_eq!(error.code, ErrorCode::Fetch);
        }
        other => panic!("expected failure report, got {other:?}"),
    }
}

#[tokio::test]
async fn invalidate_while_loading_is_ignored() {
    let gate = Arc::new(Semaphore::new(0));
    let fetcher =
        Arc::new(ScriptedFetcher::new([Ok(json!([1]))]).gated(Arc::clone(&gate)));
    let cache = ResourceCache::new(fetcher.clone());

    let handle = cache.spawn_load(news());
    wait_for_calls(&fetcher, 1).await;
    cache.invalidate(&news()).await;
    assert_eq!(cache.get(&news()).await.status, ResourceStatus::Loading);

    gate.add_permits(1);
    handle.await.expect("join");
    assert_eq!(cache.get(&news()).await.status, ResourceStatus::Ready);
}

#[tokio::test]
async fn completion_after_cache_drop_is_ignored() {
    let gate = Arc::new(Semaphore::new(0));
    let fetcher =
        Arc::new(ScriptedFetcher::new([Ok(json!([1]))]).gated(Arc::clone(&gate)));
    let cache = ResourceCache::new(fetcher.clone());

    let handle = cache.spawn_load(news());
    wait_for_calls(&fetcher, 1).await;
    drop(cache);

    gate.add_permits(1);
    handle.await.expect("background load must not panic");
    assert_eq!(fetcher.calls(), 1);
}
