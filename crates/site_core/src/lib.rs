//! Client-side data layer of the lab website: a session-scoped resource
//! cache, grouping of collection payloads, dependent tab selection state and
//! the projections the presentation layer renders.

use std::sync::Arc;

use shared::error::AxisConfigError;

pub mod cache;
pub mod config;
pub mod fetch;
pub mod grouping;
pub mod pages;
pub mod projection;
pub mod selection;

pub use cache::{CacheEvent, Resource, ResourceCache};
pub use config::Settings;
pub use fetch::{HttpFetcher, MissingFetcher, ResourceFetcher};
pub use grouping::{group, Details, Group, GroupedCollection};
pub use projection::{columns, project, ProfileView, ViewProjection};
pub use selection::{AxisSpec, ResetPolicy, SelectionMachine, SelectionSnapshot};

/// One browsing session. Pages created from the same session share its
/// cache, so a collection fetched for one page is reused by the next.
#[derive(Clone)]
pub struct SiteSession {
    cache: Arc<ResourceCache>,
}

impl SiteSession {
    pub fn new(cache: Arc<ResourceCache>) -> Self {
        Self { cache }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Ok(Self::new(ResourceCache::from_settings(settings)?))
    }

    pub fn cache(&self) -> &Arc<ResourceCache> {
        &self.cache
    }

    pub fn news(&self) -> pages::NewsPage {
        pages::NewsPage::new(Arc::clone(&self.cache))
    }

    pub fn events(&self) -> pages::EventsPage {
        pages::EventsPage::new(Arc::clone(&self.cache))
    }

    pub fn research(&self) -> Result<pages::ResearchPage, AxisConfigError> {
        pages::ResearchPage::new(Arc::clone(&self.cache))
    }

    pub fn publications(&self) -> Result<pages::PublicationsPage, AxisConfigError> {
        pages::PublicationsPage::new(Arc::clone(&self.cache))
    }

    pub fn people(&self) -> Result<pages::PeoplePage, AxisConfigError> {
        pages::PeoplePage::new(Arc::clone(&self.cache))
    }

    pub fn profile(&self) -> Result<pages::ProfilePage, AxisConfigError> {
        pages::ProfilePage::new(Arc::clone(&self.cache))
    }
}
