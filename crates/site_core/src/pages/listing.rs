use std::sync::Arc;

use async_trait::async_trait;
use shared::{
    domain::ResourceKey,
    error::{AxisConfigError, SelectionError},
    protocol::{decode_records, EventItem, Publication},
};
use tracing::warn;

use super::{Page, PayloadWatch};
use crate::{
    cache::ResourceCache,
    grouping::{group, Details, GroupedCollection},
    projection::{project, ViewProjection},
    selection::{AxisSpec, SelectionMachine, SelectionSnapshot},
};

pub const PUBLICATION_YEAR_AXIS: &str = "year";

/// Publications tabbed by year, in the order the payload lists them.
pub struct PublicationsPage {
    cache: Arc<ResourceCache>,
    watch: PayloadWatch,
    grouped: GroupedCollection<Publication>,
    selection: SelectionMachine,
}

impl PublicationsPage {
    pub fn new(cache: Arc<ResourceCache>) -> Result<Self, AxisConfigError> {
        let selection = SelectionMachine::builder()
            .axis(AxisSpec::new(PUBLICATION_YEAR_AXIS, Vec::<String>::new()))
            .build()?;
        Ok(Self {
            cache,
            watch: PayloadWatch::default(),
            grouped: GroupedCollection::default(),
            selection,
        })
    }

    pub fn years(&self) -> impl Iterator<Item = &str> {
        self.grouped.keys()
    }

    pub fn active_year(&self) -> Option<&str> {
        self.selection
            .current_value(PUBLICATION_YEAR_AXIS)
            .ok()
            .flatten()
    }

    pub fn select_year(&mut self, year: &str) -> Result<SelectionSnapshot, SelectionError> {
        self.selection.select(PUBLICATION_YEAR_AXIS, year)
    }

    pub fn view(&self) -> ViewProjection<'_, Publication> {
        project(&self.grouped, &self.selection, PUBLICATION_YEAR_AXIS)
    }
}

#[async_trait]
impl Page for PublicationsPage {
    fn cache(&self) -> &Arc<ResourceCache> {
        &self.cache
    }

    fn resources(&self) -> Vec<ResourceKey> {
        vec![ResourceKey::from(ResourceKey::PUBLICATIONS)]
    }

    async fn refresh(&mut self) {
        let resource = self
            .cache
            .get(&ResourceKey::from(ResourceKey::PUBLICATIONS))
            .await;
        let Some(payload) = self.watch.changed(&resource) else {
            return;
        };

        let decoded = decode_records::<Publication>(&payload);
        if decoded.skipped > 0 {
            warn!(skipped = decoded.skipped, "publications: skipped malformed entries");
        }
        self.grouped = group(
            decoded.records,
            |publication| Some(publication.year.clone()),
            Details::One,
        );

        let years: Vec<String> = self.grouped.keys().map(str::to_string).collect();
        let first = self.grouped.first_key().map(str::to_string);
        if let Err(err) = self
            .selection
            .replace_values(PUBLICATION_YEAR_AXIS, years, first.as_deref())
        {
            warn!(error = %err, "publications: failed to refresh year tabs");
        }
    }
}

pub struct EventsPage {
    cache: Arc<ResourceCache>,
    watch: PayloadWatch,
    events: Vec<EventItem>,
}

impl EventsPage {
    pub fn new(cache: Arc<ResourceCache>) -> Self {
        Self {
            cache,
            watch: PayloadWatch::default(),
            events: Vec::new(),
        }
    }

    pub fn view(&self) -> ViewProjection<'_, EventItem> {
        ViewProjection::of(&self.events)
    }
}

#[async_trait]
impl Page for EventsPage {
    fn cache(&self) -> &Arc<ResourceCache> {
        &self.cache
    }

    fn resources(&self) -> Vec<ResourceKey> {
        vec![ResourceKey::from(ResourceKey::EVENTS)]
    }

    async fn refresh(&mut self) {
        let resource = self.cache.get(&ResourceKey::from(ResourceKey::EVENTS)).await;
        let Some(payload) = self.watch.changed(&resource) else {
            return;
        };
        let decoded = decode_records::<EventItem>(&payload);
        if decoded.skipped > 0 {
            warn!(skipped = decoded.skipped, "events: skipped malformed entries");
        }
        self.events = decoded.records;
    }
}
