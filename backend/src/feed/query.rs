//! Translation of [`SearchFilters`] into a bounded, ordered listing fetch.
//!
//! A [`ListingQuery`] is a plain description of the fetch: a conjunction of
//! predicates, a fixed ordering and a contiguous row window. Stores execute
//! it (see `repository::postgres` and `repository::memory`); building one
//! never touches I/O, so equal inputs always give equal queries.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::filter::SearchFilters;
use crate::models::{ListingStatus, Property};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Predicate {
    Status(ListingStatus),
    /// Case-insensitive substring match on the location text.
    LocationContains(String),
    TypeEquals(String),
    MinPrice(i64),
    MaxPrice(i64),
    MinBedrooms(i16),
    MinBathrooms(i16),
    Agent(Uuid),
}

impl Predicate {
    /// In-process evaluation, mirrors what the SQL store does.
    pub fn matches(&self, property: &Property) -> bool {
        match self {
            Predicate::Status(status) => property.status == *status,
            Predicate::LocationContains(needle) => property
                .location
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            Predicate::TypeEquals(kind) => property.property_type == *kind,
            Predicate::MinPrice(min) => property.price >= *min,
            Predicate::MaxPrice(max) => property.price <= *max,
            Predicate::MinBedrooms(min) => property.features.bedrooms >= *min,
            Predicate::MinBathrooms(min) => property.features.bathrooms >= *min,
            Predicate::Agent(agent_id) => property.agent_id == *agent_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKey {
    PriorityTierDesc,
    CreatedAtDesc,
}

/// Listing order of every feed: higher tiers first, newest first within a tier.
pub const FEED_ORDER: [OrderKey; 2] = [OrderKey::PriorityTierDesc, OrderKey::CreatedAtDesc];

/// Inclusive row window `[start, end]`. The end saturates at `usize::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRange {
    pub start: usize,
    pub end: usize,
}

impl RowRange {
    pub fn new(start: usize, size: usize) -> Self {
        RowRange {
            start,
            end: start.saturating_add(size.max(1) - 1),
        }
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingQuery {
    pub predicates: Vec<Predicate>,
    pub order: [OrderKey; 2],
    pub range: RowRange,
}

impl ListingQuery {
    pub fn matches(&self, property: &Property) -> bool {
        self.predicates.iter().all(|p| p.matches(property))
    }

    /// Sorts `items` in feed order and keeps only the rows in the window.
    pub fn apply(&self, mut items: Vec<Property>) -> Vec<Property> {
        items.retain(|p| self.matches(p));
        items.sort_by(|a, b| {
            b.priority_tier
                .cmp(&a.priority_tier)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        items
            .into_iter()
            .skip(self.range.start)
            .take(self.range.len())
            .collect()
    }
}

/// How a feed is paged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedMode {
    /// Fixed-size pages, loaded one after the other.
    Paginated,
    /// A single window of `n` listings.
    Limited(usize),
    /// A single window of `n` listings, shuffled within each priority tier.
    Randomized(usize),
}

impl FeedMode {
    pub fn is_paginated(&self) -> bool {
        matches!(self, FeedMode::Paginated)
    }

    pub fn is_randomized(&self) -> bool {
        matches!(self, FeedMode::Randomized(_))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder {
    page_size: usize,
}

impl QueryBuilder {
    pub fn new(page_size: usize) -> Self {
        QueryBuilder {
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Rows requested per fetch in `mode`.
    pub fn window(&self, mode: FeedMode) -> usize {
        match mode {
            FeedMode::Paginated => self.page_size,
            FeedMode::Limited(n) | FeedMode::Randomized(n) => n.max(1),
        }
    }

    /// Public feed query: active listings narrowed by every non-empty filter.
    pub fn build(&self, filters: &SearchFilters, mode: FeedMode, offset: usize) -> ListingQuery {
        let mut predicates = vec![Predicate::Status(ListingStatus::Active)];
        predicates.extend(filter_predicates(filters));
        let start = if mode.is_paginated() { offset } else { 0 };
        ListingQuery {
            predicates,
            order: FEED_ORDER,
            range: RowRange::new(start, self.window(mode)),
        }
    }

    /// Every listing of one agent regardless of status, newest first within tier.
    pub fn agent_listings(&self, agent_id: Uuid, status: Option<ListingStatus>, limit: usize) -> ListingQuery {
        let mut predicates = vec![Predicate::Agent(agent_id)];
        if let Some(status) = status {
            predicates.push(Predicate::Status(status));
        }
        ListingQuery {
            predicates,
            order: FEED_ORDER,
            range: RowRange::new(0, limit),
        }
    }
}

fn filter_predicates(filters: &SearchFilters) -> Vec<Predicate> {
    let filters = filters.clone().normalized();
    let mut predicates = Vec::new();
    if let Some(location) = filters.location {
        predicates.push(Predicate::LocationContains(location));
    }
    if let Some(kind) = filters.property_type {
        predicates.push(Predicate::TypeEquals(kind));
    }
    if let Some(min) = filters.min_price {
        predicates.push(Predicate::MinPrice(min));
    }
    if let Some(max) = filters.max_price {
        predicates.push(Predicate::MaxPrice(max));
    }
    if let Some(beds) = filters.min_beds {
        predicates.push(Predicate::MinBedrooms(beds));
    }
    if let Some(baths) = filters.min_baths {
        predicates.push(Predicate::MinBathrooms(baths));
    }
    predicates
}

/// Escapes `%`, `_` and `\` so user text is matched literally by LIKE/ILIKE.
pub fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filters_only_constrain_status() {
        let query = QueryBuilder::new(6).build(&SearchFilters::default(), FeedMode::Paginated, 0);
        assert_eq!(query.predicates, vec![Predicate::Status(ListingStatus::Active)]);
        assert_eq!(query.order, FEED_ORDER);
        assert_eq!(query.range, RowRange { start: 0, end: 5 });
    }

    #[test]
    fn each_present_filter_adds_one_predicate() {
        let filters = SearchFilters {
            location: Some("San Pedro".into()),
            property_type: None,
            min_price: None,
            max_price: Some(5_000_000),
            min_beds: Some(3),
            min_baths: None,
        };
        let query = QueryBuilder::new(6).build(&filters, FeedMode::Paginated, 12);
        assert_eq!(
            query.predicates,
            vec![
                Predicate::Status(ListingStatus::Active),
                Predicate::LocationContains("San Pedro".into()),
                Predicate::MaxPrice(5_000_000),
                Predicate::MinBedrooms(3),
            ]
        );
        assert_eq!(query.range, RowRange { start: 12, end: 17 });
    }

    #[test]
    fn single_window_modes_ignore_offset() {
        let builder = QueryBuilder::new(6);
        let limited = builder.build(&SearchFilters::default(), FeedMode::Limited(3), 30);
        assert_eq!(limited.range, RowRange { start: 0, end: 2 });
        let randomized = builder.build(&SearchFilters::default(), FeedMode::Randomized(9), 30);
        assert_eq!(randomized.range.len(), 9);
    }

    #[test]
    fn identical_inputs_build_identical_queries() {
        let builder = QueryBuilder::new(6);
        let filters = SearchFilters::default().with_type("Casa");
        assert_eq!(
            builder.build(&filters, FeedMode::Paginated, 6),
            builder.build(&filters, FeedMode::Paginated, 6)
        );
    }

    #[test]
    fn row_range_saturates_at_the_top() {
        let range = RowRange::new(usize::MAX - 2, 6);
        assert_eq!(range.end, usize::MAX);
        assert_eq!(range.len(), 3);

        let query = QueryBuilder::new(6).build(&SearchFilters::default(), FeedMode::Paginated, usize::MAX);
        assert_eq!(query.range, RowRange { start: usize::MAX, end: usize::MAX });
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("Centro"), "%Centro%");
    }
}
