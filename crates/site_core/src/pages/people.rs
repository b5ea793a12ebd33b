use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use shared::{
    domain::ResourceKey,
    error::{AxisConfigError, SelectionError},
    protocol::{CategorySections, StudentRecord},
};
use tracing::warn;

use super::{Page, PayloadWatch};
use crate::{
    cache::ResourceCache,
    grouping::{group, Details, GroupedCollection},
    projection::{project, ViewProjection},
    selection::{AxisSpec, SelectionMachine, SelectionSnapshot},
};

pub const YEAR_AXIS: &str = "year";
pub const COURSE_AXIS: &str = "course";

const CURRENT: &str = "current";
const GRADUATED: &str = "graduated";
const INTERNED: &str = "interned";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Course {
    Phd,
    Mtech,
    Btech,
    Intern,
}

impl Course {
    pub const ALL: [Course; 4] = [Course::Phd, Course::Mtech, Course::Btech, Course::Intern];

    pub fn as_str(self) -> &'static str {
        match self {
            Course::Phd => "phd",
            Course::Mtech => "mtech",
            Course::Btech => "btech",
            Course::Intern => "intern",
        }
    }

    /// Maps a server category label ("PhD Scholar", "M.Tech", "Interns", ...)
    /// to a course tab.
    pub fn from_category(label: &str) -> Option<Self> {
        let normalized: String = label
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "phd" | "phdscholar" | "phdscholars" => Some(Course::Phd),
            "mtech" | "mtechstudents" => Some(Course::Mtech),
            "btech" | "btechstudents" => Some(Course::Btech),
            "intern" | "interns" => Some(Course::Intern),
            _ => None,
        }
    }
}

/// Students by year tab and course tab. The "interned" year only offers the
/// intern course.
pub struct PeoplePage {
    cache: Arc<ResourceCache>,
    current_watch: PayloadWatch,
    graduated_watch: PayloadWatch,
    current: GroupedCollection<StudentRecord>,
    graduated: GroupedCollection<StudentRecord>,
    selection: SelectionMachine,
}

impl PeoplePage {
    pub fn new(cache: Arc<ResourceCache>) -> Result<Self, AxisConfigError> {
        let degree_courses = [Course::Phd, Course::Mtech, Course::Btech].map(Course::as_str);
        let selection = SelectionMachine::builder()
            .axis(AxisSpec::new(YEAR_AXIS, [CURRENT, GRADUATED, INTERNED]))
            .axis(
                AxisSpec::new(COURSE_AXIS, Course::ALL.map(Course::as_str))
                    .depends_on(YEAR_AXIS)
                    .rule(CURRENT, degree_courses, Course::Phd.as_str())
                    .rule(GRADUATED, degree_courses, Course::Phd.as_str())
                    .rule(INTERNED, [Course::Intern.as_str()], Course::Intern.as_str()),
            )
            .build()?;

        Ok(Self {
            cache,
            current_watch: PayloadWatch::default(),
            graduated_watch: PayloadWatch::default(),
            current: GroupedCollection::default(),
            graduated: GroupedCollection::default(),
            selection,
        })
    }

    pub fn selection(&self) -> SelectionSnapshot {
        self.selection.snapshot()
    }

    pub fn allowed_courses(&self) -> &[String] {
        self.selection.allowed_values(COURSE_AXIS).unwrap_or_default()
    }

    pub fn select_year(&mut self, year: &str) -> Result<SelectionSnapshot, SelectionError> {
        self.selection.select(YEAR_AXIS, year)
    }

    pub fn select_course(&mut self, course: &str) -> Result<SelectionSnapshot, SelectionError> {
        self.selection.select(COURSE_AXIS, course)
    }

    /// Interns are listed with current students when that payload has a
    /// non-empty intern section, otherwise with the graduated ones.
    pub fn view(&self) -> ViewProjection<'_, StudentRecord> {
        let source = match self.selection.current_value(YEAR_AXIS).ok().flatten() {
            Some(GRADUATED) => &self.graduated,
            Some(INTERNED)
                if self
                    .current
                    .get(Course::Intern.as_str())
                    .is_some_and(|interns| !interns.is_empty()) =>
            {
                &self.current
            }
            Some(INTERNED) => &self.graduated,
            _ => &self.current,
        };
        project(source, &self.selection, COURSE_AXIS)
    }
}

fn group_by_course(resource: &str, payload: &Value) -> GroupedCollection<StudentRecord> {
    let sections = CategorySections::<StudentRecord>::from_value(payload);
    if sections.skipped > 0 {
        warn!(resource, skipped = sections.skipped, "people: skipped malformed entries");
    }
    group(
        sections.iter(),
        |(category, _)| Course::from_category(category).map(|course| course.as_str().to_string()),
        |(_, records)| Details::Many(records.to_vec()),
    )
}

#[async_trait]
impl Page for PeoplePage {
    fn cache(&self) -> &Arc<ResourceCache> {
        &self.cache
    }

    fn resources(&self) -> Vec<ResourceKey> {
        vec![
            ResourceKey::from(ResourceKey::STUDENTS_CURRENT),
            ResourceKey::from(ResourceKey::STUDENTS_GRADUATED),
        ]
    }

    async fn refresh(&mut self) {
        let current = self
            .cache
            .get(&ResourceKey::from(ResourceKey::STUDENTS_CURRENT))
            .await;
        if let Some(payload) = self.current_watch.changed(&current) {
            self.current = group_by_course(ResourceKey::STUDENTS_CURRENT, &payload);
        }

        let graduated = self
            .cache
            .get(&ResourceKey::from(ResourceKey::STUDENTS_GRADUATED))
            .await;
        if let Some(payload) = self.graduated_watch.changed(&graduated) {
            self.graduated = group_by_course(ResourceKey::STUDENTS_GRADUATED, &payload);
        }
    }
}
