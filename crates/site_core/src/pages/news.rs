use std::sync::Arc;

use async_trait::async_trait;
use shared::{
    domain::ResourceKey,
    protocol::{decode_records, NewsItem},
};
use tracing::warn;

use super::{Page, PayloadWatch};
use crate::{
    cache::ResourceCache,
    projection::{columns, ViewProjection},
};

pub const NEWS_COLUMNS: usize = 2;

pub struct NewsPage {
    cache: Arc<ResourceCache>,
    watch: PayloadWatch,
    items: Vec<NewsItem>,
}

impl NewsPage {
    pub fn new(cache: Arc<ResourceCache>) -> Self {
        Self {
            cache,
            watch: PayloadWatch::default(),
            items: Vec::new(),
        }
    }

    pub fn view(&self) -> ViewProjection<'_, NewsItem> {
        ViewProjection::of(&self.items)
    }

    pub fn columns(&self) -> Vec<Vec<&NewsItem>> {
        columns(&self.items, NEWS_COLUMNS)
    }

    pub fn revision(&self) -> u64 {
        self.watch.revision()
    }
}

#[async_trait]
impl Page for NewsPage {
    fn cache(&self) -> &Arc<ResourceCache> {
        &self.cache
    }

    fn resources(&self) -> Vec<ResourceKey> {
        vec![ResourceKey::from(ResourceKey::NEWS)]
    }

    async fn refresh(&mut self) {
        let resource = self.cache.get(&ResourceKey::from(ResourceKey::NEWS)).await;
        let Some(payload) = self.watch.changed(&resource) else {
            return;
        };
        let decoded = decode_records::<NewsItem>(&payload);
        if decoded.skipped > 0 {
            warn!(skipped = decoded.skipped, "news: skipped malformed items");
        }
        self.items = decoded.records;
    }
}
