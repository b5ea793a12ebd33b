use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use shared::{
    domain::ResourceKey,
    error::{AxisConfigError, SelectionError},
    protocol::{decode_records, CategorySections, ResearchDetail, ResearchEntry},
};
use tracing::warn;

use super::{Page, PayloadWatch};
use crate::{
    cache::ResourceCache,
    grouping::{group, Details, GroupedCollection},
    projection::{project, ViewProjection},
    selection::{AxisSpec, SelectionMachine, SelectionSnapshot},
};

pub const AREA_AXIS: &str = "area";

/// Research areas as an accordion; the first area is open by default.
pub struct ResearchPage {
    cache: Arc<ResourceCache>,
    watch: PayloadWatch,
    grouped: GroupedCollection<ResearchDetail>,
    selection: SelectionMachine,
}

impl ResearchPage {
    pub fn new(cache: Arc<ResourceCache>) -> Result<Self, AxisConfigError> {
        let selection = SelectionMachine::builder()
            .axis(AxisSpec::new(AREA_AXIS, Vec::<String>::new()))
            .build()?;
        Ok(Self {
            cache,
            watch: PayloadWatch::default(),
            grouped: GroupedCollection::default(),
            selection,
        })
    }

    pub fn areas(&self) -> impl Iterator<Item = &str> {
        self.grouped.keys()
    }

    pub fn active_area(&self) -> Option<&str> {
        self.selection.current_value(AREA_AXIS).ok().flatten()
    }

    pub fn select_area(&mut self, area: &str) -> Result<SelectionSnapshot, SelectionError> {
        self.selection.select(AREA_AXIS, area)
    }

    pub fn grouped(&self) -> &GroupedCollection<ResearchDetail> {
        &self.grouped
    }

    pub fn view(&self) -> ViewProjection<'_, ResearchDetail> {
        project(&self.grouped, &self.selection, AREA_AXIS)
    }

    pub fn revision(&self) -> u64 {
        self.watch.revision()
    }
}

#[async_trait]
impl Page for ResearchPage {
    fn cache(&self) -> &Arc<ResourceCache> {
        &self.cache
    }

    fn resources(&self) -> Vec<ResourceKey> {
        vec![ResourceKey::from(ResourceKey::RESEARCH)]
    }

    async fn refresh(&mut self) {
        let resource = self
            .cache
            .get(&ResourceKey::from(ResourceKey::RESEARCH))
            .await;
        let Some(payload) = self.watch.changed(&resource) else {
            return;
        };

        self.grouped = match &*payload {
            Value::Object(_) => group_sections(&payload),
            _ => group_entries(&payload),
        };

        let areas: Vec<String> = self.grouped.keys().map(str::to_string).collect();
        let first = self.grouped.first_key().map(str::to_string);
        if let Err(err) = self
            .selection
            .replace_values(AREA_AXIS, areas, first.as_deref())
        {
            warn!(error = %err, "research: failed to refresh area tabs");
        }
    }
}

/// Array payloads carry one entry per record, tagged with its area.
fn group_entries(payload: &Value) -> GroupedCollection<ResearchDetail> {
    let decoded = decode_records::<ResearchEntry>(payload);
    let skipped_details: usize = decoded
        .records
        .iter()
        .filter_map(|entry| entry.details.as_ref())
        .map(|details| details.skipped)
        .sum();
    if decoded.skipped > 0 || skipped_details > 0 {
        warn!(
            skipped_entries = decoded.skipped,
            skipped_details, "research: skipped malformed records"
        );
    }
    group(
        decoded.records,
        |entry| entry.area.clone(),
        |entry| Details::from(entry.details),
    )
}

/// Object payloads are keyed by area name.
fn group_sections(payload: &Value) -> GroupedCollection<ResearchDetail> {
    let sections = CategorySections::<ResearchDetail>::from_value(payload);
    if sections.skipped > 0 {
        warn!(skipped = sections.skipped, "research: skipped malformed details");
    }
    group(
        sections
            .iter()
            .map(|(area, details)| (area.to_string(), details.to_vec()))
            .collect::<Vec<_>>(),
        |(area, _)| Some(area.clone()),
        |(_, details)| Details::Many(details),
    )
}
