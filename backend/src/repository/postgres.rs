use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::upsert::excluded;
use std::collections::HashMap;
use uuid::Uuid;

use super::Repository;
use crate::db::PgPool;
use crate::error::AppError;
use crate::feed::query::{like_pattern, ListingQuery, OrderKey, Predicate};
use crate::feed::ListingSource;
use crate::models::{
    AgentStats, AnalyticsScope, NewPropertyInteraction, NewPropertyView, PlanRow, Profile,
    ProfileRow, Property, PropertyRow, SubscriptionPlan,
};
use crate::schema::{
    agent_stats_cache, profiles, properties, property_interactions, property_views, site_settings,
    subscriptions_config,
};

/// Diesel-backed store. Queries run on the blocking pool.
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        PgRepository { pool }
    }

    async fn run<T, F>(&self, f: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> Result<T, AppError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut conn)
        })
        .await?
    }
}

fn load_listings(conn: &mut PgConnection, query: &ListingQuery) -> Result<Vec<Property>, AppError> {
    use properties::dsl as p;

    let mut sql = p::properties.select(PropertyRow::as_select()).into_boxed();
    for predicate in &query.predicates {
        sql = match predicate {
            Predicate::Status(status) => sql.filter(p::status.eq(status.as_str())),
            Predicate::LocationContains(needle) => sql.filter(p::location.ilike(like_pattern(needle))),
            Predicate::TypeEquals(kind) => sql.filter(p::property_type.eq(kind.clone())),
            Predicate::MinPrice(min) => sql.filter(p::price.ge(*min)),
            Predicate::MaxPrice(max) => sql.filter(p::price.le(*max)),
            Predicate::MinBedrooms(min) => sql.filter(p::bedrooms.ge(*min)),
            Predicate::MinBathrooms(min) => sql.filter(p::bathrooms.ge(*min)),
            Predicate::Agent(agent_id) => sql.filter(p::agent_id.eq(*agent_id)),
        };
    }
    for (i, key) in query.order.iter().enumerate() {
        sql = match (i, key) {
            (0, OrderKey::PriorityTierDesc) => sql.order_by(p::priority_tier.desc()),
            (0, OrderKey::CreatedAtDesc) => sql.order_by(p::created_at.desc()),
            (_, OrderKey::PriorityTierDesc) => sql.then_order_by(p::priority_tier.desc()),
            (_, OrderKey::CreatedAtDesc) => sql.then_order_by(p::created_at.desc()),
        };
    }

    let rows: Vec<PropertyRow> = sql
        .offset(sql_bound(query.range.start))
        .limit(sql_bound(query.range.len()))
        .load(conn)?;

    into_listings(rows)
}

fn sql_bound(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// A malformed row fails the whole window. Dropping it would return a short
/// page, which reads as the end of the feed.
fn into_listings(rows: Vec<PropertyRow>) -> Result<Vec<Property>, AppError> {
    rows.into_iter()
        .map(|row| {
            let id = row.id;
            Property::try_from(row).map_err(|e| {
                log::error!("Malformed property {}: {}", id, e);
                e
            })
        })
        .collect()
}

#[async_trait]
impl ListingSource for PgRepository {
    async fn fetch_listings(&self, query: &ListingQuery) -> Result<Vec<Property>, AppError> {
        let query = query.clone();
        self.run(move |conn| load_listings(conn, &query)).await
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn find_property(&self, id: Uuid) -> Result<Option<Property>, AppError> {
        self.run(move |conn| {
            let row: Option<PropertyRow> = properties::table
                .find(id)
                .select(PropertyRow::as_select())
                .first(conn)
                .optional()?;
            row.map(Property::try_from).transpose()
        })
        .await
    }

    async fn insert_property(&self, property: Property) -> Result<Property, AppError> {
        self.run(move |conn| {
            diesel::insert_into(properties::table)
                .values(PropertyRow::from(&property))
                .execute(conn)?;
            Ok(property)
        })
        .await
    }

    async fn delete_property(&self, id: Uuid) -> Result<bool, AppError> {
        self.run(move |conn| {
            let deleted = diesel::delete(properties::table.find(id)).execute(conn)?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn count_agent_properties(&self, agent_id: Uuid) -> Result<i64, AppError> {
        self.run(move |conn| {
            let count: i64 = properties::table
                .filter(properties::agent_id.eq(agent_id))
                .count()
                .get_result(conn)?;
            Ok(count)
        })
        .await
    }

    async fn set_agent_priority_tier(&self, agent_id: Uuid, tier: u8) -> Result<usize, AppError> {
        self.run(move |conn| {
            let updated: usize = diesel::update(properties::table.filter(properties::agent_id.eq(agent_id)))
                .set((
                    properties::priority_tier.eq(tier as i16),
                    properties::updated_at.eq(Utc::now()),
                ))
                .execute(conn)?;
            Ok(updated)
        })
        .await
    }

    async fn find_profile(&self, id: Uuid) -> Result<Option<Profile>, AppError> {
        self.run(move |conn| {
            let row: Option<ProfileRow> = profiles::table
                .find(id)
                .select(ProfileRow::as_select())
                .first(conn)
                .optional()?;
            Ok(row.map(Profile::from))
        })
        .await
    }

    async fn list_agents(&self) -> Result<Vec<Profile>, AppError> {
        self.run(|conn| {
            let rows: Vec<ProfileRow> = profiles::table
                .filter(profiles::role.eq("agent"))
                .order_by(profiles::created_at.desc())
                .select(ProfileRow::as_select())
                .load(conn)?;
            Ok(rows.into_iter().map(Profile::from).collect())
        })
        .await
    }

    async fn set_profile_plan(&self, id: Uuid, plan: &str) -> Result<bool, AppError> {
        let plan = plan.to_string();
        self.run(move |conn| {
            let updated = diesel::update(profiles::table.find(id))
                .set(profiles::subscription_plan.eq(Some(plan)))
                .execute(conn)?;
            Ok(updated > 0)
        })
        .await
    }

    async fn find_plan(&self, name: &str) -> Result<Option<SubscriptionPlan>, AppError> {
        let name = name.to_string();
        self.run(move |conn| {
            let row: Option<PlanRow> = subscriptions_config::table
                .filter(subscriptions_config::name.eq(name))
                .select(PlanRow::as_select())
                .first(conn)
                .optional()?;
            row.map(SubscriptionPlan::try_from).transpose()
        })
        .await
    }

    async fn list_plans(&self) -> Result<Vec<SubscriptionPlan>, AppError> {
        self.run(|conn| {
            let rows: Vec<PlanRow> = subscriptions_config::table
                .order_by(subscriptions_config::priority.asc())
                .select(PlanRow::as_select())
                .load(conn)?;
            rows.into_iter().map(SubscriptionPlan::try_from).collect()
        })
        .await
    }

    async fn insert_view(&self, view: NewPropertyView) -> Result<(), AppError> {
        self.run(move |conn| {
            diesel::insert_into(property_views::table)
                .values(&view)
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn insert_interaction(&self, interaction: NewPropertyInteraction) -> Result<(), AppError> {
        self.run(move |conn| {
            diesel::insert_into(property_interactions::table)
                .values(&interaction)
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn count_views(&self, scope: AnalyticsScope) -> Result<i64, AppError> {
        self.run(move |conn| {
            let count: i64 = match scope {
                AnalyticsScope::Property(id) => property_views::table
                    .filter(property_views::property_id.eq(id))
                    .count()
                    .get_result(conn)?,
                AnalyticsScope::Agent(id) => property_views::table
                    .filter(property_views::agent_id.eq(id))
                    .count()
                    .get_result(conn)?,
            };
            Ok(count)
        })
        .await
    }

    async fn views_since(&self, property_id: Uuid, since: DateTime<Utc>) -> Result<Vec<DateTime<Utc>>, AppError> {
        self.run(move |conn| {
            let stamps: Vec<DateTime<Utc>> = property_views::table
                .filter(property_views::property_id.eq(property_id))
                .filter(property_views::viewed_at.ge(since))
                .order_by(property_views::viewed_at.asc())
                .select(property_views::viewed_at)
                .load(conn)?;
            Ok(stamps)
        })
        .await
    }

    async fn interaction_counts(&self, scope: AnalyticsScope) -> Result<HashMap<String, i64>, AppError> {
        use property_interactions::dsl as pi;

        self.run(move |conn| {
            let rows: Vec<(String, i64)> = match scope {
                AnalyticsScope::Property(id) => pi::property_interactions
                    .filter(pi::property_id.eq(id))
                    .group_by(pi::interaction_type)
                    .select((pi::interaction_type, diesel::dsl::count_star()))
                    .load(conn)?,
                AnalyticsScope::Agent(id) => pi::property_interactions
                    .filter(pi::agent_id.eq(id))
                    .group_by(pi::interaction_type)
                    .select((pi::interaction_type, diesel::dsl::count_star()))
                    .load(conn)?,
            };
            Ok(rows.into_iter().collect())
        })
        .await
    }

    async fn agent_stats(&self, agent_id: Uuid) -> Result<Option<AgentStats>, AppError> {
        self.run(move |conn| {
            let stats: Option<AgentStats> = agent_stats_cache::table
                .find(agent_id)
                .select(AgentStats::as_select())
                .first(conn)
                .optional()?;
            Ok(stats)
        })
        .await
    }

    async fn upsert_agent_stats(&self, stats: AgentStats) -> Result<(), AppError> {
        use agent_stats_cache::dsl as asc;

        self.run(move |conn| {
            diesel::insert_into(asc::agent_stats_cache)
                .values(&stats)
                .on_conflict(asc::agent_id)
                .do_update()
                .set((
                    asc::total_properties.eq(excluded(asc::total_properties)),
                    asc::total_views.eq(excluded(asc::total_views)),
                    asc::total_whatsapp_clicks.eq(excluded(asc::total_whatsapp_clicks)),
                    asc::total_phone_clicks.eq(excluded(asc::total_phone_clicks)),
                    asc::total_favorites.eq(excluded(asc::total_favorites)),
                    asc::last_updated.eq(excluded(asc::last_updated)),
                ))
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn site_setting(&self, key: &str) -> Result<Option<serde_json::Value>, AppError> {
        let key = key.to_string();
        self.run(move |conn| {
            let value: Option<serde_json::Value> = site_settings::table
                .find(key)
                .select(site_settings::value)
                .first(conn)
                .optional()?;
            Ok(value)
        })
        .await
    }
}
