//! Page models. Each page mounts against the session cache, reshapes its
//! payloads only when the cached payload is replaced, and owns the selection
//! state of its tabs.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use shared::{
    domain::{ResourceKey, ResourceStatus},
    error::FetchError,
};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::debug;

use crate::cache::{CacheEvent, Resource, ResourceCache};

mod listing;
mod news;
mod people;
mod profile;
mod research;

pub use listing::{EventsPage, PublicationsPage, PUBLICATION_YEAR_AXIS};
pub use news::{NewsPage, NEWS_COLUMNS};
pub use people::{Course, PeoplePage, COURSE_AXIS, YEAR_AXIS};
pub use profile::{ProfileContent, ProfilePage, SECTION_AXIS};
pub use research::{ResearchPage, AREA_AXIS};

#[async_trait]
pub trait Page: Send + Sync {
    fn cache(&self) -> &Arc<ResourceCache>;

    fn resources(&self) -> Vec<ResourceKey>;

    /// Pulls the latest cached payloads and rebuilds derived data for any
    /// that changed.
    async fn refresh(&mut self);

    /// Loads every resource of the page, then refreshes. Returns the first
    /// fetch failure; the page still reflects whatever data is available.
    async fn load(&mut self) -> Result<(), FetchError> {
        let cache = Arc::clone(self.cache());
        let resources = self.resources();
        let outcomes = join_all(resources.iter().map(|resource| cache.load(resource))).await;
        self.refresh().await;
        outcomes.into_iter().collect()
    }

    /// Drains pending cache events and refreshes once if any of this page's
    /// resources became ready, e.g. after another page loaded it. Returns
    /// whether a refresh ran.
    async fn catch_up(&mut self, events: &mut broadcast::Receiver<CacheEvent>) -> bool {
        let resources = self.resources();
        let mut stale = false;
        loop {
            match events.try_recv() {
                Ok(CacheEvent::StatusChanged {
                    resource,
                    status: ResourceStatus::Ready,
                }) if resources.contains(&resource) => stale = true,
                Ok(_) => {}
                Err(TryRecvError::Lagged(missed)) => {
                    debug!(missed, "page: cache events lagged, refreshing");
                    stale = true;
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        if stale {
            self.refresh().await;
        }
        stale
    }

    async fn status(&self) -> ResourceStatus {
        let mut statuses = Vec::new();
        for resource in self.resources() {
            statuses.push(self.cache().get(&resource).await.status);
        }
        combined_status(&statuses)
    }
}

pub(crate) fn combined_status(statuses: &[ResourceStatus]) -> ResourceStatus {
    if statuses.contains(&ResourceStatus::Failed) {
        ResourceStatus::Failed
    } else if statuses.contains(&ResourceStatus::Loading) {
        ResourceStatus::Loading
    } else if !statuses.is_empty() && statuses.iter().all(|s| *s == ResourceStatus::Ready) {
        ResourceStatus::Ready
    } else {
        ResourceStatus::Empty
    }
}

/// Tracks the payload a page last derived from, by pointer identity.
#[derive(Debug, Default)]
pub(crate) struct PayloadWatch {
    seen: Option<Arc<Value>>,
    revision: u64,
}

impl PayloadWatch {
    pub(crate) fn changed(&mut self, resource: &Resource) -> Option<Arc<Value>> {
        let payload = resource.payload.as_ref()?;
        if self
            .seen
            .as_ref()
            .is_some_and(|seen| Arc::ptr_eq(seen, payload))
        {
            return None;
        }
        self.seen = Some(Arc::clone(payload));
        self.revision += 1;
        Some(Arc::clone(payload))
    }

    pub(crate) fn revision(&self) -> u64 {
        self.revision
    }
}
