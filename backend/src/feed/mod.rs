//! Public listing feed: filters, query building, tiered shuffling and paging.

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::Property;

pub mod filter;
pub mod pager;
pub mod query;
pub mod service;
pub mod tiered;

pub use filter::{PriceBand, SearchFilters};
pub use pager::{LoadOutcome, Pager, PagerState};
pub use query::{FeedMode, ListingQuery, Predicate, QueryBuilder};
pub use service::{FeedPage, FeedService};
pub use tiered::shuffle_within_tiers;

/// Anything that can execute a [`ListingQuery`].
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch_listings(&self, query: &ListingQuery) -> Result<Vec<Property>, AppError>;
}
