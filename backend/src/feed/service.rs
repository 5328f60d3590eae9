use rand::Rng;
use serde::Serialize;
use std::sync::Arc;

use super::filter::SearchFilters;
use super::query::{FeedMode, QueryBuilder};
use super::tiered::shuffle_within_tiers;
use super::ListingSource;
use crate::error::AppError;
use crate::models::Property;

#[derive(Debug, Clone, Serialize)]
pub struct FeedPage {
    pub items: Vec<Property>,
    pub offset: usize,
    pub has_more: bool,
}

/// One fetch path for every feed mode; the mode alone decides paging.
#[derive(Clone)]
pub struct FeedService {
    source: Arc<dyn ListingSource>,
    builder: QueryBuilder,
}

impl FeedService {
    pub fn new(source: Arc<dyn ListingSource>, page_size: usize) -> Self {
        FeedService {
            source,
            builder: QueryBuilder::new(page_size),
        }
    }

    pub fn builder(&self) -> QueryBuilder {
        self.builder
    }

    /// Raw window fetch, errors included. The pager needs to tell a failed
    /// fetch from an empty one.
    pub async fn fetch_window(
        &self,
        filters: &SearchFilters,
        mode: FeedMode,
        offset: usize,
    ) -> Result<Vec<Property>, AppError> {
        let query = self.builder.build(filters, mode, offset);
        log::debug!("Fetching listings {:?}", query);
        self.source.fetch_listings(&query).await
    }

    /// Store failures are logged and come back as an empty page.
    pub async fn page(&self, filters: &SearchFilters, mode: FeedMode, offset: usize) -> FeedPage {
        let items = match self.fetch_window(filters, mode, offset).await {
            Ok(items) => items,
            Err(e) => {
                log::error!("Error fetching properties: {}", e);
                Vec::new()
            }
        };
        let mut rng = rand::thread_rng();
        self.finish(items, mode, offset, &mut rng)
    }

    /// Applies the mode to a fetched window: shuffling and `has_more`.
    pub fn finish<R: Rng + ?Sized>(
        &self,
        items: Vec<Property>,
        mode: FeedMode,
        offset: usize,
        rng: &mut R,
    ) -> FeedPage {
        let window = self.builder.window(mode);
        let has_more = mode.is_paginated() && items.len() >= window;
        let items = if mode.is_randomized() {
            shuffle_within_tiers(items, rng)
        } else {
            items
        };
        FeedPage {
            items,
            offset: if mode.is_paginated() { offset } else { 0 },
            has_more,
        }
    }
}
