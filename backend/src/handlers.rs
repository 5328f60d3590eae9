use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;
use uuid::Uuid;

use crate::analytics::{PropertyAnalytics, TopProperty, DEFAULT_TOP_PROPERTIES};
use crate::app::AppState;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::feed::{FeedMode, FeedPage, ListingSource, PriceBand, SearchFilters};
use crate::limits::{Decision, PlanUsage};
use crate::models::{
    AgentStats, InteractionKind, ListingStatus, NewProperty, Profile, Property, SubscriptionPlan,
};
use crate::settings::{CONTACT_CONFIG, HERO_CONFIG};

/// Largest window served by `/properties/featured`.
pub const MAX_FEATURED_LIMIT: usize = 50;

/// Query string of the public feed. Values arrive as text so that empty
/// form fields mean "no filter" instead of a parse error.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FeedParams {
    pub location: Option<String>,
    #[serde(rename = "type")]
    pub property_type: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub price_range: Option<String>,
    pub beds: Option<String>,
    pub baths: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

fn parse_opt<T: FromStr>(name: &str, value: &Option<String>) -> Result<Option<T>, AppError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| AppError::Validation(format!("invalid value for {}: '{}'", name, raw))),
    }
}

impl FeedParams {
    pub fn filters(&self) -> Result<SearchFilters, AppError> {
        let mut filters = SearchFilters {
            location: self.location.clone(),
            property_type: self.property_type.clone(),
            min_price: parse_opt("min_price", &self.min_price)?,
            max_price: parse_opt("max_price", &self.max_price)?,
            min_beds: parse_opt("beds", &self.beds)?,
            min_baths: parse_opt("baths", &self.baths)?,
        }
        .normalized();

        if filters.min_price.is_none() && filters.max_price.is_none() {
            if let Some(raw) = self.price_range.as_deref().filter(|r| !r.trim().is_empty()) {
                let band = PriceBand::parse(raw)
                    .ok_or_else(|| AppError::Validation(format!("unknown price range '{}'", raw)))?;
                filters = filters.with_price_band(band);
            }
        }
        Ok(filters)
    }
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub page: usize,
    #[serde(flatten)]
    pub feed: FeedPage,
}

pub async fn list_properties(
    State(state): State<AppState>,
    Query(params): Query<FeedParams>,
) -> Result<Json<FeedResponse>, AppError> {
    let filters = params.filters()?;
    let page = parse_opt::<usize>("page", &params.page)?.unwrap_or(0);
    let offset = page
        .checked_mul(state.feed.builder().page_size())
        .ok_or_else(|| AppError::Validation(format!("page {} is out of range", page)))?;
    let feed = state.feed.page(&filters, FeedMode::Paginated, offset).await;
    log::info!("Fetched {} properties for page {}", feed.items.len(), page);
    Ok(Json(FeedResponse { page, feed }))
}

pub async fn featured_properties(
    State(state): State<AppState>,
    Query(params): Query<FeedParams>,
) -> Result<Json<FeedPage>, AppError> {
    let filters = params.filters()?;
    let limit = parse_opt::<usize>("limit", &params.limit)?.unwrap_or(state.config.page_size.min(MAX_FEATURED_LIMIT));
    if limit == 0 || limit > MAX_FEATURED_LIMIT {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {}",
            MAX_FEATURED_LIMIT
        )));
    }
    Ok(Json(state.feed.page(&filters, FeedMode::Randomized(limit), 0).await))
}

pub async fn get_property(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Property>, AppError> {
    match state.repo.find_property(id).await? {
        Some(property) if property.status == ListingStatus::Active => Ok(Json(property)),
        _ => Err(AppError::NotFound("Property not found".into())),
    }
}

pub async fn create_property(
    State(state): State<AppState>,
    Extension(AuthUser(agent_id)): Extension<AuthUser>,
    Json(new_property): Json<NewProperty>,
) -> Result<(StatusCode, Json<Property>), AppError> {
    new_property.validate()?;

    let usage = state.limiter.usage(agent_id).await?;
    usage.check_create_property().into_result()?;
    usage.check_image_count(new_property.image_urls.len()).into_result()?;

    let property = new_property.into_property(agent_id, usage.limits.priority_tier);
    let property = state.repo.insert_property(property).await?;
    log::info!("Agent {} listed property {}", agent_id, property.id);
    Ok((StatusCode::CREATED, Json(property)))
}

async fn load_owned_property(state: &AppState, user: Uuid, id: Uuid) -> Result<Property, AppError> {
    let property = state
        .repo
        .find_property(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Property not found".into()))?;
    if property.agent_id != user && !is_admin(state, user).await? {
        return Err(AppError::Forbidden(
            "You don't have permission to manage this property".into(),
        ));
    }
    Ok(property)
}

pub async fn delete_property(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    load_owned_property(&state, user, id).await?;
    if !state.repo.delete_property(id).await? {
        return Err(AppError::NotFound("Property not found".into()));
    }
    log::info!("User {} deleted property {}", user, id);
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ViewRequest {
    pub session_id: String,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub referrer: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InteractionRequest {
    pub session_id: String,
    pub interaction_type: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Owner of a listing for analytics rows. Lookup failures are logged and
/// swallowed; only a listing known to be missing is reported.
async fn listing_owner(state: &AppState, id: Uuid) -> Result<Option<Uuid>, AppError> {
    match state.repo.find_property(id).await {
        Ok(Some(property)) => Ok(Some(property.agent_id)),
        Ok(None) => Err(AppError::NotFound("Property not found".into())),
        Err(e) => {
            log::error!("Error resolving property {} for tracking: {}", id, e);
            Ok(None)
        }
    }
}

pub async fn track_view(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(view): Json<ViewRequest>,
) -> Result<StatusCode, AppError> {
    if view.session_id.trim().is_empty() {
        return Err(AppError::Validation("session_id must not be empty".into()));
    }
    if let Some(agent_id) = listing_owner(&state, id).await? {
        state
            .analytics
            .track_view(id, agent_id, &view.session_id, view.user_agent, view.referrer)
            .await;
    }
    Ok(StatusCode::ACCEPTED)
}

pub async fn track_interaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(interaction): Json<InteractionRequest>,
) -> Result<StatusCode, AppError> {
    if interaction.session_id.trim().is_empty() {
        return Err(AppError::Validation("session_id must not be empty".into()));
    }
    let kind: InteractionKind = interaction.interaction_type.parse()?;
    if let Some(agent_id) = listing_owner(&state, id).await? {
        state
            .analytics
            .track_interaction(id, agent_id, kind, &interaction.session_id, interaction.metadata)
            .await;
    }
    Ok(StatusCode::ACCEPTED)
}

pub async fn property_analytics(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<PropertyAnalytics>, AppError> {
    load_owned_property(&state, user, id).await?;
    state
        .analytics
        .property_analytics(id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::Task("analytics unavailable".into()))
}

pub async fn my_properties(
    State(state): State<AppState>,
    Extension(AuthUser(agent_id)): Extension<AuthUser>,
) -> Result<Json<Vec<Property>>, AppError> {
    let query = state
        .feed
        .builder()
        .agent_listings(agent_id, None, i32::MAX as usize);
    let listings = state.repo.fetch_listings(&query).await?;
    Ok(Json(listings))
}

#[derive(Debug, Serialize)]
pub struct LimitsResponse {
    #[serde(flatten)]
    pub usage: PlanUsage,
    pub remaining_properties: i64,
    pub can_create_property: bool,
    pub create_property: Decision,
}

pub async fn my_limits(
    State(state): State<AppState>,
    Extension(AuthUser(agent_id)): Extension<AuthUser>,
) -> Result<Json<LimitsResponse>, AppError> {
    let usage = state.limiter.usage(agent_id).await?;
    let decision = usage.check_create_property();
    Ok(Json(LimitsResponse {
        remaining_properties: usage.remaining_properties(),
        can_create_property: decision.is_allowed(),
        create_property: decision,
        usage,
    }))
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub stats: Option<AgentStats>,
    pub contact_rate: i64,
}

pub async fn my_stats(
    State(state): State<AppState>,
    Extension(AuthUser(agent_id)): Extension<AuthUser>,
) -> Json<StatsResponse> {
    let stats = state.analytics.agent_stats(agent_id).await;
    let contact_rate = stats.as_ref().map(AgentStats::contact_rate).unwrap_or(0);
    Json(StatsResponse { stats, contact_rate })
}

pub async fn refresh_my_stats(
    State(state): State<AppState>,
    Extension(AuthUser(agent_id)): Extension<AuthUser>,
) -> Result<Json<StatsResponse>, AppError> {
    let stats = state.analytics.refresh_agent_stats(agent_id).await?;
    let contact_rate = stats.contact_rate();
    Ok(Json(StatsResponse {
        stats: Some(stats),
        contact_rate,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct TopParams {
    pub limit: Option<usize>,
}

pub async fn my_top_properties(
    State(state): State<AppState>,
    Extension(AuthUser(agent_id)): Extension<AuthUser>,
    Query(params): Query<TopParams>,
) -> Json<Vec<TopProperty>> {
    let limit = params.limit.unwrap_or(DEFAULT_TOP_PROPERTIES);
    Json(state.analytics.top_properties(agent_id, limit).await)
}

pub async fn list_plans(State(state): State<AppState>) -> Result<Json<Vec<SubscriptionPlan>>, AppError> {
    Ok(Json(state.repo.list_plans().await?))
}

pub async fn site_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let value = match key.as_str() {
        HERO_CONFIG => serde_json::to_value(state.settings.hero().await)?,
        CONTACT_CONFIG => serde_json::to_value(state.settings.contact().await)?,
        _ => state
            .settings
            .get(&key)
            .await
            .ok_or_else(|| AppError::NotFound(format!("No setting named '{}'", key)))?,
    };
    Ok(Json(value))
}

async fn is_admin(state: &AppState, user: Uuid) -> Result<bool, AppError> {
    Ok(state
        .repo
        .find_profile(user)
        .await?
        .is_some_and(|p| p.is_admin()))
}

async fn require_admin(state: &AppState, user: Uuid) -> Result<(), AppError> {
    if is_admin(state, user).await? {
        Ok(())
    } else {
        Err(AppError::Forbidden("Admin role required".into()))
    }
}

pub async fn list_agents(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<Vec<Profile>>, AppError> {
    require_admin(&state, user).await?;
    Ok(Json(state.repo.list_agents().await?))
}

#[derive(Debug, Deserialize)]
pub struct PlanChange {
    pub plan: String,
}

/// Moves an agent to another plan and re-stamps their listings with its tier.
pub async fn change_agent_plan(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(agent_id): Path<Uuid>,
    Json(change): Json<PlanChange>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&state, user).await?;
    let plan = state
        .repo
        .find_plan(&change.plan)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Plan '{}' not found", change.plan)))?;
    if !state.repo.set_profile_plan(agent_id, &plan.name).await? {
        return Err(AppError::NotFound("Agent not found".into()));
    }
    let tier = plan.features.priority_tier;
    let updated = state.repo.set_agent_priority_tier(agent_id, tier).await?;
    log::info!(
        "Agent {} moved to plan {} (tier {}), {} listings re-synced",
        agent_id,
        plan.name,
        tier,
        updated
    );
    Ok(Json(json!({
        "agent_id": agent_id,
        "plan": plan.name,
        "priority_tier": tier,
        "updated_listings": updated,
    })))
}
