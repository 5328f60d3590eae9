use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AppError;

/// Highest tier a plan can grant; listings are clamped into `0..=MAX_PRIORITY_TIER`.
pub const MAX_PRIORITY_TIER: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    #[default]
    Active,
    Draft,
    Sold,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Active => "active",
            ListingStatus::Draft => "draft",
            ListingStatus::Sold => "sold",
        }
    }
}

impl FromStr for ListingStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ListingStatus::Active),
            "draft" => Ok(ListingStatus::Draft),
            "sold" => Ok(ListingStatus::Sold),
            other => Err(AppError::Validation(format!("unknown listing status '{}'", other))),
        }
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyFeatures {
    pub bedrooms: i16,
    pub bathrooms: i16,
    pub square_feet: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub price: i64,
    pub location: String,
    pub property_type: String,
    pub features: PropertyFeatures,
    pub main_image_url: Option<String>,
    pub image_urls: Vec<String>,
    pub status: ListingStatus,
    pub priority_tier: u8,
    pub agent_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::properties)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PropertyRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub price: i64,
    pub location: String,
    pub property_type: String,
    pub bedrooms: i16,
    pub bathrooms: i16,
    pub square_feet: i64,
    pub main_image_url: Option<String>,
    pub image_urls: Vec<String>,
    pub status: String,
    pub priority_tier: i16,
    pub agent_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PropertyRow> for Property {
    type Error = AppError;

    fn try_from(row: PropertyRow) -> Result<Self, Self::Error> {
        Ok(Property {
            id: row.id,
            title: row.title,
            description: row.description,
            price: row.price,
            location: row.location,
            property_type: row.property_type,
            features: PropertyFeatures {
                bedrooms: row.bedrooms.max(0),
                bathrooms: row.bathrooms.max(0),
                square_feet: row.square_feet.max(0),
            },
            main_image_url: row.main_image_url,
            image_urls: row.image_urls,
            status: row.status.parse()?,
            priority_tier: row.priority_tier.clamp(0, MAX_PRIORITY_TIER as i16) as u8,
            agent_id: row.agent_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl From<&Property> for PropertyRow {
    fn from(p: &Property) -> Self {
        PropertyRow {
            id: p.id,
            title: p.title.clone(),
            description: p.description.clone(),
            price: p.price,
            location: p.location.clone(),
            property_type: p.property_type.clone(),
            bedrooms: p.features.bedrooms,
            bathrooms: p.features.bathrooms,
            square_feet: p.features.square_feet,
            main_image_url: p.main_image_url.clone(),
            image_urls: p.image_urls.clone(),
            status: p.status.as_str().to_string(),
            priority_tier: p.priority_tier as i16,
            agent_id: p.agent_id,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// Payload of a listing creation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProperty {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: i64,
    pub location: String,
    pub property_type: String,
    #[serde(default)]
    pub features: PropertyFeatures,
    #[serde(default)]
    pub main_image_url: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub status: ListingStatus,
}

impl NewProperty {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("title must not be empty".into()));
        }
        if self.price < 0 {
            return Err(AppError::Validation("price must not be negative".into()));
        }
        if self.property_type.trim().is_empty() {
            return Err(AppError::Validation("property_type must not be empty".into()));
        }
        Ok(())
    }

    /// Materialises the listing for `agent_id`, stamping the plan tier.
    pub fn into_property(self, agent_id: Uuid, priority_tier: u8) -> Property {
        let now = Utc::now();
        Property {
            id: Uuid::new_v4(),
            title: self.title,
            description: self.description,
            price: self.price,
            location: self.location,
            property_type: self.property_type,
            features: self.features,
            main_image_url: self.main_image_url,
            image_urls: self.image_urls,
            status: self.status,
            priority_tier: priority_tier.min(MAX_PRIORITY_TIER),
            agent_id,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Agent,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Agent => "agent",
            Role::Admin => "admin",
        }
    }

    /// Anything that is not `admin` is treated as an agent.
    pub fn from_db(value: &str) -> Self {
        if value.eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::Agent
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub role: Role,
    pub subscription_plan: Option<String>,
    pub is_unlimited: bool,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    pub company_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::profiles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProfileRow {
    pub id: Uuid,
    pub role: String,
    pub subscription_plan: Option<String>,
    pub is_unlimited: bool,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    pub company_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Profile {
            id: row.id,
            role: Role::from_db(&row.role),
            subscription_plan: row.subscription_plan,
            is_unlimited: row.is_unlimited,
            full_name: row.full_name,
            email: row.email,
            phone: row.phone,
            whatsapp: row.whatsapp,
            company_name: row.company_name,
            avatar_url: row.avatar_url,
            created_at: row.created_at,
        }
    }
}

/// Quotas and flags of a subscription plan. Missing or zero quotas fall
/// back to the free tier values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanFeatures {
    pub properties_limit: i64,
    pub images_per_property: i64,
    pub priority_tier: u8,
    pub has_ai_analysis: bool,
    pub has_advanced_stats: bool,
    pub has_priority_support: bool,
    pub has_featured_badge: bool,
}

impl Default for PlanFeatures {
    fn default() -> Self {
        PlanFeatures {
            properties_limit: 5,
            images_per_property: 3,
            priority_tier: 1,
            has_ai_analysis: false,
            has_advanced_stats: false,
            has_priority_support: false,
            has_featured_badge: false,
        }
    }
}

impl PlanFeatures {
    pub fn unlimited() -> Self {
        PlanFeatures {
            properties_limit: i64::MAX,
            images_per_property: i64::MAX,
            priority_tier: MAX_PRIORITY_TIER,
            has_ai_analysis: true,
            has_advanced_stats: true,
            has_priority_support: true,
            has_featured_badge: true,
        }
    }

    /// Decodes the JSON blob stored with a plan.
    pub fn from_json(value: serde_json::Value) -> Result<Self, AppError> {
        let defaults = PlanFeatures::default();
        let mut features: PlanFeatures = serde_json::from_value(value)
            .map_err(|e| AppError::Validation(format!("invalid plan features: {}", e)))?;
        if features.properties_limit <= 0 {
            features.properties_limit = defaults.properties_limit;
        }
        if features.images_per_property <= 0 {
            features.images_per_property = defaults.images_per_property;
        }
        if features.priority_tier == 0 {
            features.priority_tier = defaults.priority_tier;
        }
        features.priority_tier = features.priority_tier.min(MAX_PRIORITY_TIER);
        Ok(features)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub id: i32,
    pub name: String,
    pub price_monthly: i64,
    pub price_yearly: i64,
    pub priority: i32,
    pub features: PlanFeatures,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::subscriptions_config)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PlanRow {
    pub id: i32,
    pub name: String,
    pub price_monthly: i64,
    pub price_yearly: i64,
    pub priority: i32,
    pub features: serde_json::Value,
}

impl TryFrom<PlanRow> for SubscriptionPlan {
    type Error = AppError;

    fn try_from(row: PlanRow) -> Result<Self, Self::Error> {
        Ok(SubscriptionPlan {
            id: row.id,
            name: row.name,
            price_monthly: row.price_monthly,
            price_yearly: row.price_yearly,
            priority: row.priority,
            features: PlanFeatures::from_json(row.features)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    WhatsappClick,
    PhoneClick,
    EmailClick,
    Share,
    Favorite,
    CompareAdd,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::WhatsappClick => "whatsapp_click",
            InteractionKind::PhoneClick => "phone_click",
            InteractionKind::EmailClick => "email_click",
            InteractionKind::Share => "share",
            InteractionKind::Favorite => "favorite",
            InteractionKind::CompareAdd => "compare_add",
        }
    }
}

impl FromStr for InteractionKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "whatsapp_click" => Ok(InteractionKind::WhatsappClick),
            "phone_click" => Ok(InteractionKind::PhoneClick),
            "email_click" => Ok(InteractionKind::EmailClick),
            "share" => Ok(InteractionKind::Share),
            "favorite" => Ok(InteractionKind::Favorite),
            "compare_add" => Ok(InteractionKind::CompareAdd),
            other => Err(AppError::Validation(format!("unknown interaction type '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::property_views)]
pub struct NewPropertyView {
    pub property_id: Uuid,
    pub agent_id: Uuid,
    pub session_id: String,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub viewed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::property_interactions)]
pub struct NewPropertyInteraction {
    pub property_id: Uuid,
    pub agent_id: Uuid,
    pub interaction_type: String,
    pub session_id: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Which rows an analytics count is taken over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsScope {
    Property(Uuid),
    Agent(Uuid),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::agent_stats_cache)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AgentStats {
    pub agent_id: Uuid,
    pub total_properties: i64,
    pub total_views: i64,
    pub total_whatsapp_clicks: i64,
    pub total_phone_clicks: i64,
    pub total_favorites: i64,
    pub last_updated: DateTime<Utc>,
}

impl AgentStats {
    /// Percentage of views that turned into a WhatsApp or phone contact.
    pub fn contact_rate(&self) -> i64 {
        if self.total_views <= 0 {
            return 0;
        }
        let contacts = (self.total_whatsapp_clicks + self.total_phone_clicks) as f64;
        (contacts / self.total_views as f64 * 100.0).round() as i64
    }
}
