use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use shared::{
    domain::ResourceKey,
    error::{AxisConfigError, SelectionError},
    protocol::{ProfileDocument, Publication, StudentRecord, TeachingItem},
};
use tracing::warn;

use super::{Page, PayloadWatch};
use crate::{
    cache::ResourceCache,
    projection::{ProfileView, ViewProjection},
    selection::{AxisSpec, SelectionMachine, SelectionSnapshot},
};

pub const SECTION_AXIS: &str = "section";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileContent<'a> {
    /// No profile document has been loaded (or it failed to decode).
    Unavailable,
    Profile {
        name: &'a str,
        designation: &'a str,
        announcements: ViewProjection<'a, String>,
    },
    Publications(ViewProjection<'a, Publication>),
    Teaching(ViewProjection<'a, TeachingItem>),
    Students(ViewProjection<'a, StudentRecord>),
}

/// Faculty profile with a sidebar switching between sections.
pub struct ProfilePage {
    cache: Arc<ResourceCache>,
    watch: PayloadWatch,
    document: Option<ProfileDocument>,
    selection: SelectionMachine,
}

impl ProfilePage {
    pub fn new(cache: Arc<ResourceCache>) -> Result<Self, AxisConfigError> {
        let selection = SelectionMachine::builder()
            .axis(AxisSpec::new(SECTION_AXIS, ProfileView::LABELS))
            .build()?;
        Ok(Self {
            cache,
            watch: PayloadWatch::default(),
            document: None,
            selection,
        })
    }

    pub fn select_section(&mut self, label: &str) -> Result<SelectionSnapshot, SelectionError> {
        self.selection.select(SECTION_AXIS, label)
    }

    pub fn active_view(&self) -> ProfileView {
        self.selection
            .current_value(SECTION_AXIS)
            .ok()
            .flatten()
            .map(ProfileView::from_label)
            .unwrap_or(ProfileView::Profile)
    }

    pub fn view(&self) -> ProfileContent<'_> {
        let Some(document) = &self.document else {
            return ProfileContent::Unavailable;
        };
        match self.active_view() {
            ProfileView::Profile => ProfileContent::Profile {
                name: &document.name,
                designation: &document.designation,
                announcements: ViewProjection::of(&document.announcements),
            },
            ProfileView::Publications => {
                ProfileContent::Publications(ViewProjection::of(&document.publications))
            }
            ProfileView::Teaching => {
                ProfileContent::Teaching(ViewProjection::of(&document.teaching))
            }
            ProfileView::Students => {
                ProfileContent::Students(ViewProjection::of(&document.students))
            }
        }
    }
}

#[async_trait]
impl Page for ProfilePage {
    fn cache(&self) -> &Arc<ResourceCache> {
        &self.cache
    }

    fn resources(&self) -> Vec<ResourceKey> {
        vec![ResourceKey::from(ResourceKey::PROFILE)]
    }

    async fn refresh(&mut self) {
        let resource = self.cache.get(&ResourceKey::from(ResourceKey::PROFILE)).await;
        let Some(payload) = self.watch.changed(&resource) else {
            return;
        };
        self.document = match ProfileDocument::deserialize(&*payload) {
            Ok(document) => Some(document),
            Err(err) => {
                warn!(error = %err, "profile: payload is not a profile document");
                None
            }
        };
    }
}
