//! Infinite-scroll paging over a [`FeedService`].
//!
//! ```text
//! Idle -> Loading -> Ready <-> LoadingMore -> Ready ... -> Exhausted
//! ```
//!
//! Only one fetch may be in flight. `reset` bumps a generation counter and
//! any response that belongs to an older generation is dropped, so a slow
//! answer for stale filters can never land in the list of the new ones.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::filter::SearchFilters;
use super::query::FeedMode;
use super::service::FeedService;
use super::tiered::shuffle_within_tiers;
use crate::error::AppError;
use crate::models::Property;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerState {
    Idle,
    Loading,
    Ready,
    LoadingMore,
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The fetch completed and this many listings were added.
    Loaded(usize),
    /// Nothing was requested.
    Skipped,
    /// The response arrived after a reset and was discarded.
    Stale,
    /// The fetch failed; the list is unchanged.
    Failed,
}

struct PagerInner {
    state: PagerState,
    filters: SearchFilters,
    items: Vec<Property>,
    next_offset: usize,
    has_more: bool,
    in_flight: bool,
    generation: u64,
}

pub struct Pager {
    feed: FeedService,
    mode: FeedMode,
    inner: Mutex<PagerInner>,
    rng: Mutex<StdRng>,
}

impl Pager {
    pub fn new(feed: FeedService, mode: FeedMode) -> Self {
        Self::with_rng(feed, mode, StdRng::from_entropy())
    }

    /// Deterministic shuffling for randomized feeds.
    pub fn with_seed(feed: FeedService, mode: FeedMode, seed: u64) -> Self {
        Self::with_rng(feed, mode, StdRng::seed_from_u64(seed))
    }

    fn with_rng(feed: FeedService, mode: FeedMode, rng: StdRng) -> Self {
        Pager {
            feed,
            mode,
            inner: Mutex::new(PagerInner {
                state: PagerState::Idle,
                filters: SearchFilters::default(),
                items: Vec::new(),
                next_offset: 0,
                has_more: true,
                in_flight: false,
                generation: 0,
            }),
            rng: Mutex::new(rng),
        }
    }

    pub fn state(&self) -> PagerState {
        self.inner.lock().state
    }

    pub fn has_more(&self) -> bool {
        self.inner.lock().has_more
    }

    pub fn is_loading(&self) -> bool {
        self.inner.lock().in_flight
    }

    pub fn items(&self) -> Vec<Property> {
        self.inner.lock().items.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn filters(&self) -> SearchFilters {
        self.inner.lock().filters.clone()
    }

    /// Drops everything loaded so far and fetches the first window for `filters`.
    pub async fn reset(&self, filters: SearchFilters) -> LoadOutcome {
        let generation = {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            inner.filters = filters.clone();
            inner.items.clear();
            inner.next_offset = 0;
            inner.has_more = true;
            inner.in_flight = true;
            inner.state = PagerState::Loading;
            inner.generation
        };

        let result = self.feed.fetch_window(&filters, self.mode, 0).await;
        self.complete(generation, result, true)
    }

    /// Appends the next page. A no-op while a fetch is running, before the
    /// first load, or once the feed is exhausted.
    pub async fn load_more(&self) -> LoadOutcome {
        let (filters, offset, generation) = {
            let mut inner = self.inner.lock();
            if inner.in_flight || !inner.has_more || inner.state != PagerState::Ready {
                return LoadOutcome::Skipped;
            }
            inner.in_flight = true;
            inner.state = PagerState::LoadingMore;
            (inner.filters.clone(), inner.next_offset, inner.generation)
        };

        let result = self.feed.fetch_window(&filters, self.mode, offset).await;
        self.complete(generation, result, false)
    }

    /// The element after the last rendered listing scrolled into view.
    pub async fn on_sentinel_visible(&self) -> LoadOutcome {
        self.load_more().await
    }

    fn complete(
        &self,
        generation: u64,
        result: Result<Vec<Property>, AppError>,
        initial: bool,
    ) -> LoadOutcome {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            log::debug!("Dropping listings of superseded request {}", generation);
            return LoadOutcome::Stale;
        }
        inner.in_flight = false;

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                log::error!("Error fetching properties: {}", e);
                if initial && !self.mode.is_paginated() {
                    inner.has_more = false;
                    inner.state = PagerState::Exhausted;
                } else {
                    inner.state = PagerState::Ready;
                }
                return LoadOutcome::Failed;
            }
        };

        let fetched = page.len();
        let window = self.feed.builder().window(self.mode);
        let page = if self.mode.is_randomized() {
            shuffle_within_tiers(page, &mut *self.rng.lock())
        } else {
            page
        };
        inner.items.extend(page);

        if self.mode.is_paginated() {
            inner.next_offset = inner.next_offset.saturating_add(window);
            inner.has_more = fetched >= window;
        } else {
            inner.has_more = false;
        }
        inner.state = if inner.has_more {
            PagerState::Ready
        } else {
            PagerState::Exhausted
        };
        LoadOutcome::Loaded(fetched)
    }
}
