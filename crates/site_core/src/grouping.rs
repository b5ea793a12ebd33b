use std::collections::HashMap;

use shared::protocol::Decoded;
use tracing::debug;

/// What a single record contributes to its group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Details<D> {
    Many(Vec<D>),
    One(D),
    Absent,
}

impl<D> From<Option<Decoded<D>>> for Details<D> {
    fn from(value: Option<Decoded<D>>) -> Self {
        match value {
            Some(decoded) => Self::Many(decoded.records),
            None => Self::Absent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group<D> {
    pub key: String,
    pub details: Vec<D>,
}

/// Order-preserving buckets of detail records keyed by group name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedCollection<D> {
    groups: Vec<Group<D>>,
    index: HashMap<String, usize>,
}

impl<D> Default for GroupedCollection<D> {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<D> GroupedCollection<D> {
    pub fn get(&self, key: &str) -> Option<&[D]> {
        self.index
            .get(key)
            .map(|&position| self.groups[position].details.as_slice())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|group| group.key.as_str())
    }

    pub fn first_key(&self) -> Option<&str> {
        self.groups.first().map(|group| group.key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Group<D>> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn group_mut(&mut self, key: String) -> &mut Group<D> {
        let position = match self.index.get(&key) {
            Some(&position) => position,
            None => {
                let position = self.groups.len();
                self.index.insert(key.clone(), position);
                self.groups.push(Group {
                    key,
                    details: Vec::new(),
                });
                position
            }
        };
        &mut self.groups[position]
    }
}

/// Buckets `records` by `key_of`, in first-seen group order.
///
/// Records whose key is missing or blank are dropped. A record whose details
/// are `Absent` still creates its group.
pub fn group<E, D>(
    records: impl IntoIterator<Item = E>,
    key_of: impl Fn(&E) -> Option<String>,
    details_of: impl Fn(E) -> Details<D>,
) -> GroupedCollection<D> {
    let mut grouped = GroupedCollection::default();
    let mut dropped = 0usize;

    for record in records {
        let Some(key) = key_of(&record).filter(|key| !key.trim().is_empty()) else {
            dropped += 1;
            continue;
        };
        let details = details_of(record);
        let group = grouped.group_mut(key);
        match details {
            Details::Many(items) => group.details.extend(items),
            Details::One(item) => group.details.push(item),
            Details::Absent => {}
        }
    }

    if dropped > 0 {
        debug!(dropped, groups = grouped.len(), "grouping: dropped records without a key");
    }
    grouped
}

#[cfg(test)]
#[path = "tests/grouping_tests.rs"]
mod tests;
