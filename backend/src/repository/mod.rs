//! Storage seam for listings, profiles, plans and analytics rows.
//!
//! [`PgRepository`] talks to Postgres through diesel; [`MemoryRepository`]
//! keeps everything in process and backs the tests and database-less runs.
//! Both execute a [`ListingQuery`](crate::feed::ListingQuery) with the same
//! semantics through their [`ListingSource`] impl.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::AppError;
use crate::feed::ListingSource;
use crate::models::{
    AgentStats, AnalyticsScope, NewPropertyInteraction, NewPropertyView, Profile, Property,
    SubscriptionPlan,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

#[async_trait]
pub trait Repository: ListingSource {
    async fn find_property(&self, id: Uuid) -> Result<Option<Property>, AppError>;
    async fn insert_property(&self, property: Property) -> Result<Property, AppError>;
    /// Returns whether a row was removed.
    async fn delete_property(&self, id: Uuid) -> Result<bool, AppError>;
    async fn count_agent_properties(&self, agent_id: Uuid) -> Result<i64, AppError>;
    /// Rewrites the denormalised tier on every listing of `agent_id`.
    async fn set_agent_priority_tier(&self, agent_id: Uuid, tier: u8) -> Result<usize, AppError>;

    async fn find_profile(&self, id: Uuid) -> Result<Option<Profile>, AppError>;
    async fn list_agents(&self) -> Result<Vec<Profile>, AppError>;
    async fn set_profile_plan(&self, id: Uuid, plan: &str) -> Result<bool, AppError>;

    async fn find_plan(&self, name: &str) -> Result<Option<SubscriptionPlan>, AppError>;
    /// Plans in display order (`priority` ascending).
    async fn list_plans(&self) -> Result<Vec<SubscriptionPlan>, AppError>;

    async fn insert_view(&self, view: NewPropertyView) -> Result<(), AppError>;
    async fn insert_interaction(&self, interaction: NewPropertyInteraction) -> Result<(), AppError>;
    async fn count_views(&self, scope: AnalyticsScope) -> Result<i64, AppError>;
    async fn views_since(&self, property_id: Uuid, since: DateTime<Utc>) -> Result<Vec<DateTime<Utc>>, AppError>;
    /// Interaction totals keyed by interaction type.
    async fn interaction_counts(&self, scope: AnalyticsScope) -> Result<HashMap<String, i64>, AppError>;

    async fn agent_stats(&self, agent_id: Uuid) -> Result<Option<AgentStats>, AppError>;
    async fn upsert_agent_stats(&self, stats: AgentStats) -> Result<(), AppError>;

    async fn site_setting(&self, key: &str) -> Result<Option<serde_json::Value>, AppError>;
}
