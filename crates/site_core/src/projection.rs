use crate::{grouping::GroupedCollection, selection::SelectionMachine};

/// The slice of a collection the presentation layer renders right now.
#[derive(Debug, PartialEq, Eq)]
pub struct ViewProjection<'a, D> {
    pub visible_items: &'a [D],
    pub is_empty: bool,
}

impl<D> Clone for ViewProjection<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D> Copy for ViewProjection<'_, D> {}

impl<'a, D> ViewProjection<'a, D> {
    pub fn empty() -> Self {
        Self {
            visible_items: &[],
            is_empty: true,
        }
    }

    pub fn of(items: &'a [D]) -> Self {
        Self {
            visible_items: items,
            is_empty: items.is_empty(),
        }
    }

    /// Alternating partition of the visible items, see [`columns`].
    pub fn columns(&self, count: usize) -> Vec<Vec<&'a D>> {
        columns(self.visible_items, count)
    }
}

/// Projects the group named by the current value of `axis`. Unknown axes,
/// unset values and keys missing from the collection all degrade to the
/// empty view.
pub fn project<'a, D>(
    grouped: &'a GroupedCollection<D>,
    selection: &SelectionMachine,
    axis: &str,
) -> ViewProjection<'a, D> {
    let key = selection.current_value(axis).ok().flatten();
    project_key(grouped, key)
}

pub fn project_key<'a, D>(
    grouped: &'a GroupedCollection<D>,
    key: Option<&str>,
) -> ViewProjection<'a, D> {
    key.and_then(|key| grouped.get(key))
        .map(ViewProjection::of)
        .unwrap_or_else(ViewProjection::empty)
}

/// Deals `items` round-robin into `count` columns; item `i` lands in column
/// `i % count`, keeping the original relative order inside each column.
pub fn columns<D>(items: &[D], count: usize) -> Vec<Vec<&D>> {
    let count = count.max(1);
    let mut out: Vec<Vec<&D>> = (0..count).map(|_| Vec::new()).collect();
    for (position, item) in items.iter().enumerate() {
        out[position % count].push(item);
    }
    out
}

/// Body shown for a faculty profile sidebar label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileView {
    Profile,
    Publications,
    Teaching,
    Students,
}

impl ProfileView {
    pub const LABELS: [&'static str; 5] = [
        "Profile",
        "Announcements",
        "Publications",
        "Teaching",
        "Students",
    ];

    /// "Announcements" has no dedicated body; like any unrecognised label it
    /// resolves to the profile view, which carries the announcement list.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Publications" => Self::Publications,
            "Teaching" => Self::Teaching,
            "Students" => Self::Students,
            _ => Self::Profile,
        }
    }
}
