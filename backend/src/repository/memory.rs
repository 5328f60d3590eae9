use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use uuid::Uuid;

use super::Repository;
use crate::error::AppError;
use crate::feed::{ListingQuery, ListingSource};
use crate::models::{
    AgentStats, AnalyticsScope, NewPropertyInteraction, NewPropertyView, PlanFeatures, Profile,
    Property, Role, SubscriptionPlan,
};

#[derive(Default)]
struct Tables {
    properties: Vec<Property>,
    profiles: HashMap<Uuid, Profile>,
    plans: Vec<SubscriptionPlan>,
    views: Vec<NewPropertyView>,
    interactions: Vec<NewPropertyInteraction>,
    stats: HashMap<Uuid, AgentStats>,
    settings: HashMap<String, serde_json::Value>,
}

/// In-process store. Listing queries go through [`ListingQuery::apply`].
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
    plans_unavailable: AtomicBool,
    listing_fetches: AtomicUsize,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with the three stock plans.
    pub fn with_default_plans() -> Self {
        let repo = Self::new();
        for plan in default_plans() {
            repo.add_plan(plan);
        }
        repo
    }

    pub fn add_plan(&self, plan: SubscriptionPlan) {
        let mut tables = self.tables.write();
        tables.plans.retain(|p| p.name != plan.name);
        tables.plans.push(plan);
    }

    pub fn add_profile(&self, profile: Profile) {
        self.tables.write().profiles.insert(profile.id, profile);
    }

    pub fn add_property(&self, property: Property) {
        self.tables.write().properties.push(property);
    }

    pub fn set_site_setting(&self, key: &str, value: serde_json::Value) {
        self.tables.write().settings.insert(key.to_string(), value);
    }

    /// Makes every call fail as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes only plan lookups fail; everything else keeps working.
    pub fn set_plans_unavailable(&self, unavailable: bool) {
        self.plans_unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of listing fetches served so far.
    pub fn listing_fetches(&self) -> usize {
        self.listing_fetches.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), AppError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Pool("store unavailable".into()));
        }
        Ok(())
    }
}

/// Gratis, Pro and Platino with their stock quotas.
pub fn default_plans() -> Vec<SubscriptionPlan> {
    let plan = |id: i32, name: &str, monthly: i64, limit: i64, images: i64, tier: u8| SubscriptionPlan {
        id,
        name: name.to_string(),
        price_monthly: monthly,
        price_yearly: monthly * 10,
        priority: id,
        features: PlanFeatures {
            properties_limit: limit,
            images_per_property: images,
            priority_tier: tier,
            has_ai_analysis: tier >= 2,
            has_advanced_stats: tier >= 3,
            has_priority_support: tier >= 3,
            has_featured_badge: tier >= 2,
        },
    };
    vec![
        plan(1, "Gratis", 0, 5, 3, 1),
        plan(2, "Pro", 499, 50, 15, 2),
        plan(3, "Platino", 999, 500, 30, 3),
    ]
}

fn in_scope(scope: AnalyticsScope, property_id: Uuid, agent_id: Uuid) -> bool {
    match scope {
        AnalyticsScope::Property(id) => property_id == id,
        AnalyticsScope::Agent(id) => agent_id == id,
    }
}

#[async_trait]
impl ListingSource for MemoryRepository {
    async fn fetch_listings(&self, query: &ListingQuery) -> Result<Vec<Property>, AppError> {
        self.check()?;
        self.listing_fetches.fetch_add(1, Ordering::SeqCst);
        let properties = self.tables.read().properties.clone();
        Ok(query.apply(properties))
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_property(&self, id: Uuid) -> Result<Option<Property>, AppError> {
        self.check()?;
        Ok(self.tables.read().properties.iter().find(|p| p.id == id).cloned())
    }

    async fn insert_property(&self, property: Property) -> Result<Property, AppError> {
        self.check()?;
        self.tables.write().properties.push(property.clone());
        Ok(property)
    }

    async fn delete_property(&self, id: Uuid) -> Result<bool, AppError> {
        self.check()?;
        let mut tables = self.tables.write();
        let before = tables.properties.len();
        tables.properties.retain(|p| p.id != id);
        Ok(tables.properties.len() != before)
    }

    async fn count_agent_properties(&self, agent_id: Uuid) -> Result<i64, AppError> {
        self.check()?;
        let tables = self.tables.read();
        Ok(tables.properties.iter().filter(|p| p.agent_id == agent_id).count() as i64)
    }

    async fn set_agent_priority_tier(&self, agent_id: Uuid, tier: u8) -> Result<usize, AppError> {
        self.check()?;
        let mut tables = self.tables.write();
        let now = Utc::now();
        let mut updated = 0;
        for property in tables.properties.iter_mut().filter(|p| p.agent_id == agent_id) {
            property.priority_tier = tier;
            property.updated_at = now;
            updated += 1;
        }
        Ok(updated)
    }

    async fn find_profile(&self, id: Uuid) -> Result<Option<Profile>, AppError> {
        self.check()?;
        Ok(self.tables.read().profiles.get(&id).cloned())
    }

    async fn list_agents(&self) -> Result<Vec<Profile>, AppError> {
        self.check()?;
        let mut agents: Vec<Profile> = self
            .tables
            .read()
            .profiles
            .values()
            .filter(|p| p.role == Role::Agent)
            .cloned()
            .collect();
        agents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(agents)
    }

    async fn set_profile_plan(&self, id: Uuid, plan: &str) -> Result<bool, AppError> {
        self.check()?;
        let mut tables = self.tables.write();
        match tables.profiles.get_mut(&id) {
            Some(profile) => {
                profile.subscription_plan = Some(plan.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_plan(&self, name: &str) -> Result<Option<SubscriptionPlan>, AppError> {
        self.check()?;
        if self.plans_unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Pool("plan lookup unavailable".into()));
        }
        Ok(self.tables.read().plans.iter().find(|p| p.name == name).cloned())
    }

    async fn list_plans(&self) -> Result<Vec<SubscriptionPlan>, AppError> {
        self.check()?;
        let mut plans = self.tables.read().plans.clone();
        plans.sort_by_key(|p| p.priority);
        Ok(plans)
    }

    async fn insert_view(&self, view: NewPropertyView) -> Result<(), AppError> {
        self.check()?;
        self.tables.write().views.push(view);
        Ok(())
    }

    async fn insert_interaction(&self, interaction: NewPropertyInteraction) -> Result<(), AppError> {
        self.check()?;
        self.tables.write().interactions.push(interaction);
        Ok(())
    }

    async fn count_views(&self, scope: AnalyticsScope) -> Result<i64, AppError> {
        self.check()?;
        let tables = self.tables.read();
        Ok(tables
            .views
            .iter()
            .filter(|v| in_scope(scope, v.property_id, v.agent_id))
            .count() as i64)
    }

    async fn views_since(&self, property_id: Uuid, since: DateTime<Utc>) -> Result<Vec<DateTime<Utc>>, AppError> {
        self.check()?;
        let tables = self.tables.read();
        let mut stamps: Vec<DateTime<Utc>> = tables
            .views
            .iter()
            .filter(|v| v.property_id == property_id && v.viewed_at >= since)
            .map(|v| v.viewed_at)
            .collect();
        stamps.sort();
        Ok(stamps)
    }

    async fn interaction_counts(&self, scope: AnalyticsScope) -> Result<HashMap<String, i64>, AppError> {
        self.check()?;
        let tables = self.tables.read();
        let mut counts = HashMap::new();
        for interaction in tables
            .interactions
            .iter()
            .filter(|i| in_scope(scope, i.property_id, i.agent_id))
        {
            *counts.entry(interaction.interaction_type.clone()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn agent_stats(&self, agent_id: Uuid) -> Result<Option<AgentStats>, AppError> {
        self.check()?;
        Ok(self.tables.read().stats.get(&agent_id).cloned())
    }

    async fn upsert_agent_stats(&self, stats: AgentStats) -> Result<(), AppError> {
        self.check()?;
        self.tables.write().stats.insert(stats.agent_id, stats);
        Ok(())
    }

    async fn site_setting(&self, key: &str) -> Result<Option<serde_json::Value>, AppError> {
        self.check()?;
        Ok(self.tables.read().settings.get(key).cloned())
    }
}
