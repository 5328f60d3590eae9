//! View and interaction tracking plus the per-agent rollups built from them.
//!
//! Tracking is fire-and-forget: a failed insert is logged and never reaches
//! the visitor. Reads degrade to `None` or empty results the same way.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppError;
use crate::feed::{ListingSource, QueryBuilder};
use crate::models::{
    AgentStats, AnalyticsScope, InteractionKind, ListingStatus, NewPropertyInteraction,
    NewPropertyView,
};
use crate::repository::Repository;

const RECENT_VIEWS_DAYS: i64 = 30;
pub const DEFAULT_TOP_PROPERTIES: usize = 5;
/// Upper bound of listings considered when ranking an agent's top properties.
const TOP_PROPERTIES_SCAN: usize = 1_000;

#[derive(Debug, Clone, Serialize)]
pub struct PropertyAnalytics {
    pub total_views: i64,
    pub interactions: HashMap<String, i64>,
    pub recent_views: Vec<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopProperty {
    pub id: Uuid,
    pub title: String,
    pub main_image_url: Option<String>,
    pub price: i64,
    pub location: String,
    pub views: i64,
    pub interactions: i64,
}

#[derive(Clone)]
pub struct Analytics {
    repo: Arc<dyn Repository>,
}

impl Analytics {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Analytics { repo }
    }

    pub async fn track_view(
        &self,
        property_id: Uuid,
        agent_id: Uuid,
        session_id: &str,
        user_agent: Option<String>,
        referrer: Option<String>,
    ) {
        let view = NewPropertyView {
            property_id,
            agent_id,
            session_id: session_id.to_string(),
            user_agent,
            referrer: referrer.filter(|r| !r.is_empty()),
            viewed_at: Utc::now(),
        };
        if let Err(e) = self.repo.insert_view(view).await {
            log::error!("Error tracking property view: {}", e);
        }
    }

    pub async fn track_interaction(
        &self,
        property_id: Uuid,
        agent_id: Uuid,
        kind: InteractionKind,
        session_id: &str,
        metadata: Option<serde_json::Value>,
    ) {
        let interaction = NewPropertyInteraction {
            property_id,
            agent_id,
            interaction_type: kind.as_str().to_string(),
            session_id: session_id.to_string(),
            metadata: metadata.unwrap_or_else(|| serde_json::json!({})),
            created_at: Utc::now(),
        };
        if let Err(e) = self.repo.insert_interaction(interaction).await {
            log::error!("Error tracking property interaction: {}", e);
        }
    }

    /// Cached rollup for `agent_id`, as last refreshed.
    pub async fn agent_stats(&self, agent_id: Uuid) -> Option<AgentStats> {
        match self.repo.agent_stats(agent_id).await {
            Ok(stats) => stats,
            Err(e) => {
                log::error!("Error fetching agent stats: {}", e);
                None
            }
        }
    }

    /// Recomputes the rollup from the event tables and stores it.
    pub async fn refresh_agent_stats(&self, agent_id: Uuid) -> Result<AgentStats, AppError> {
        let total_properties = self.repo.count_agent_properties(agent_id).await?;
        let total_views = self.repo.count_views(AnalyticsScope::Agent(agent_id)).await?;
        let interactions = self
            .repo
            .interaction_counts(AnalyticsScope::Agent(agent_id))
            .await?;
        let count = |kind: InteractionKind| interactions.get(kind.as_str()).copied().unwrap_or(0);

        let stats = AgentStats {
            agent_id,
            total_properties,
            total_views,
            total_whatsapp_clicks: count(InteractionKind::WhatsappClick),
            total_phone_clicks: count(InteractionKind::PhoneClick),
            total_favorites: count(InteractionKind::Favorite),
            last_updated: Utc::now(),
        };
        self.repo.upsert_agent_stats(stats.clone()).await?;
        log::info!("Refreshed stats for agent {}", agent_id);
        Ok(stats)
    }

    pub async fn property_analytics(&self, property_id: Uuid) -> Option<PropertyAnalytics> {
        match self.collect_property_analytics(property_id).await {
            Ok(analytics) => Some(analytics),
            Err(e) => {
                log::error!("Error fetching property analytics: {}", e);
                None
            }
        }
    }

    async fn collect_property_analytics(&self, property_id: Uuid) -> Result<PropertyAnalytics, AppError> {
        let scope = AnalyticsScope::Property(property_id);
        let since = Utc::now() - Duration::days(RECENT_VIEWS_DAYS);
        Ok(PropertyAnalytics {
            total_views: self.repo.count_views(scope).await?,
            interactions: self.repo.interaction_counts(scope).await?,
            recent_views: self.repo.views_since(property_id, since).await?,
        })
    }

    /// The agent's active listings ranked by views, at most `limit` of them.
    pub async fn top_properties(&self, agent_id: Uuid, limit: usize) -> Vec<TopProperty> {
        match self.rank_properties(agent_id, limit).await {
            Ok(top) => top,
            Err(e) => {
                log::error!("Error fetching top properties: {}", e);
                Vec::new()
            }
        }
    }

    async fn rank_properties(&self, agent_id: Uuid, limit: usize) -> Result<Vec<TopProperty>, AppError> {
        let query = QueryBuilder::new(TOP_PROPERTIES_SCAN).agent_listings(
            agent_id,
            Some(ListingStatus::Active),
            TOP_PROPERTIES_SCAN,
        );
        let listings = self.repo.fetch_listings(&query).await?;

        let mut ranked = Vec::with_capacity(listings.len());
        for property in listings {
            let scope = AnalyticsScope::Property(property.id);
            let views = self.repo.count_views(scope).await?;
            let interactions: i64 = self.repo.interaction_counts(scope).await?.values().sum();
            ranked.push(TopProperty {
                id: property.id,
                title: property.title,
                main_image_url: property.main_image_url,
                price: property.price,
                location: property.location,
                views,
                interactions,
            });
        }
        ranked.sort_by(|a, b| b.views.cmp(&a.views));
        ranked.truncate(limit);
        Ok(ranked)
    }
}
