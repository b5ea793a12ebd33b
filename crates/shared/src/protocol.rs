use serde::{
    de::{self, DeserializeOwned},
    Deserialize, Deserializer, Serialize, Serializer,
};
use serde_json::Value;

/// A field that the server sends either as a list or as a bare item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(items) => items,
            Self::One(item) => vec![item],
        }
    }
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

/// Accepts strings and numbers alike; `2021` and `"2021"` both land as text.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => text,
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        _ => String::new(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchProject {
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResearchDetail {
    Summary(String),
    Project(ResearchProject),
}

/// Only a string or an object is a detail. Sequences are rejected so a stray
/// list is never read positionally into a project.
impl<'de> Deserialize<'de> for ResearchDetail {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(text) => Ok(Self::Summary(text)),
            project @ Value::Object(_) => ResearchProject::deserialize(project)
                .map(Self::Project)
                .map_err(de::Error::custom),
            other => Err(de::Error::custom(format!(
                "expected a summary string or a project object, got {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchEntry {
    #[serde(default, alias = "category", alias = "area_name")]
    pub area: Option<String>,
    #[serde(default)]
    pub details: Option<Decoded<ResearchDetail>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    pub title: String,
    #[serde(default)]
    pub authors: OneOrMany<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub venue: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub year: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventItem {
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub venue: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: String,
    #[serde(default, alias = "thesis", deserialize_with = "lenient_string")]
    pub topic: String,
    #[serde(default, alias = "year", deserialize_with = "lenient_string")]
    pub batch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeachingItem {
    #[serde(default, deserialize_with = "lenient_string")]
    pub code: String,
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub term: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDocument {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub designation: String,
    #[serde(default)]
    pub announcements: Vec<String>,
    #[serde(default)]
    pub publications: Vec<Publication>,
    #[serde(default)]
    pub teaching: Vec<TeachingItem>,
    #[serde(default)]
    pub students: Vec<StudentRecord>,
}

/// Records decoded from a collection, with the count of entries that did not
/// match the expected shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded<T> {
    pub records: Vec<T>,
    pub skipped: usize,
}

impl<T> Default for Decoded<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            skipped: 0,
        }
    }
}

/// As a field, a list decoded element by element; a bare item counts as a
/// one-element list.
impl<'de, T: DeserializeOwned> Deserialize<'de> for Decoded<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(decode_records(&Value::deserialize(deserializer)?))
    }
}

impl<T: Serialize> Serialize for Decoded<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.records.serialize(serializer)
    }
}

/// Decodes a collection record by record. An array yields one record per
/// element, `null` yields nothing, and any other value is tried as a single
/// record.
pub fn decode_records<T: DeserializeOwned>(value: &Value) -> Decoded<T> {
    let mut decoded = Decoded::default();
    let mut push = |item: &Value| match T::deserialize(item) {
        Ok(record) => decoded.records.push(record),
        Err(_) => decoded.skipped += 1,
    };
    match value {
        Value::Null => {}
        Value::Array(items) => items.iter().for_each(&mut push),
        other => push(other),
    }
    decoded
}

/// Category-keyed sections in first-seen order.
///
/// The server sends these either as an object keyed by category name or as an
/// array of single-key wrapper objects; both decode to the same structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySections<T> {
    sections: Vec<(String, Vec<T>)>,
    pub skipped: usize,
}

impl<T> Default for CategorySections<T> {
    fn default() -> Self {
        Self {
            sections: Vec::new(),
            skipped: 0,
        }
    }
}

impl<T: DeserializeOwned> CategorySections<T> {
    pub fn from_value(value: &Value) -> Self {
        let mut sections = Self::default();
        match value {
            Value::Object(map) => {
                for (category, body) in map {
                    sections.push(category, body);
                }
            }
            Value::Array(wrappers) => {
                for wrapper in wrappers {
                    match wrapper {
                        Value::Object(map) => {
                            for (category, body) in map {
                                sections.push(category, body);
                            }
                        }
                        _ => sections.skipped += 1,
                    }
                }
            }
            Value::Null => {}
            _ => sections.skipped += 1,
        }
        sections
    }

    fn push(&mut self, category: &str, body: &Value) {
        let Decoded { records, skipped } = decode_records::<T>(body);
        self.skipped += skipped;
        match self.sections.iter_mut().find(|(name, _)| name == category) {
            Some((_, existing)) => existing.extend(records),
            None => self.sections.push((category.to_string(), records)),
        }
    }
}

impl<T> CategorySections<T> {
    /// Records of one category, or `None` when the section is absent.
    pub fn section(&self, category: &str) -> Option<&[T]> {
        self.sections
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, records)| records.as_slice())
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[T])> {
        self.sections
            .iter()
            .map(|(name, records)| (name.as_str(), records.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
