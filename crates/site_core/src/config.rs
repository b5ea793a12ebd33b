use std::{collections::BTreeMap, time::Duration};

use anyhow::Context;
use serde::Deserialize;
use shared::domain::ResourceKey;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub content_base_url: String,
    pub request_timeout_secs: u64,
    pub event_buffer: usize,
    pub resource_paths: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        let resource_paths = [
            ResourceKey::NEWS,
            ResourceKey::RESEARCH,
            ResourceKey::PUBLICATIONS,
            ResourceKey::EVENTS,
            ResourceKey::STUDENTS_CURRENT,
            ResourceKey::STUDENTS_GRADUATED,
            ResourceKey::PROFILE,
        ]
        .into_iter()
        .map(|key| (key.to_string(), format!("{key}.json")))
        .collect();

        Self {
            content_base_url: "http://127.0.0.1:8080/data/".into(),
            request_timeout_secs: 10,
            event_buffer: 256,
            resource_paths,
        }
    }
}

impl Settings {
    /// Parses settings from TOML text. Resource paths missing from the text
    /// keep their default location.
    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        let mut settings: Settings = toml::from_str(raw).context("invalid site settings")?;
        for (key, path) in Settings::default().resource_paths {
            settings.resource_paths.entry(key).or_insert(path);
        }
        Ok(settings)
    }

    pub fn apply_env(self) -> Self {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    pub fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup("CONTENT_BASE_URL") {
            self.content_base_url = v;
        }
        if let Some(v) = lookup("APP__CONTENT_BASE_URL") {
            self.content_base_url = v;
        }

        if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
            if let Ok(parsed) = v.parse::<u64>() {
                self.request_timeout_secs = parsed;
            }
        }

        if let Some(v) = lookup("APP__EVENT_BUFFER") {
            if let Ok(parsed) = v.parse::<usize>() {
                self.event_buffer = parsed.max(1);
            }
        }

        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn resource_path(&self, resource: &ResourceKey) -> String {
        self.resource_paths
            .get(resource.as_str())
            .cloned()
            .unwrap_or_else(|| format!("{resource}.json"))
    }
}
