//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use chrono::{Duration, TimeZone, Utc};
use uuid::Uuid;

use listing_feed::config::AppConfig;
use listing_feed::models::{ListingStatus, Profile, Property, PropertyFeatures, Role};

pub const JWT_SECRET: &str = "test-secret";

pub fn test_config(page_size: usize) -> AppConfig {
    AppConfig {
        database_url: None,
        port: 0,
        jwt_secret: JWT_SECRET.to_string(),
        page_size,
        default_plan: "Gratis".to_string(),
    }
}

/// Active listing created `age_minutes` before a fixed instant.
pub fn listing(title: &str, property_type: &str, price: i64, tier: u8, age_minutes: i64) -> Property {
    let base = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let created_at = base - Duration::minutes(age_minutes);
    Property {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: None,
        price,
        location: "Monterrey, NL".to_string(),
        property_type: property_type.to_string(),
        features: PropertyFeatures {
            bedrooms: 3,
            bathrooms: 2,
            square_feet: 1_500,
        },
        main_image_url: None,
        image_urls: Vec::new(),
        status: ListingStatus::Active,
        priority_tier: tier,
        agent_id: Uuid::new_v4(),
        created_at,
        updated_at: created_at,
    }
}

pub fn owned_by(mut property: Property, agent_id: Uuid) -> Property {
    property.agent_id = agent_id;
    property
}

pub fn profile(id: Uuid, role: Role, plan: Option<&str>) -> Profile {
    Profile {
        id,
        role,
        subscription_plan: plan.map(str::to_string),
        is_unlimited: false,
        full_name: Some("Test Agent".to_string()),
        email: None,
        phone: None,
        whatsapp: None,
        company_name: None,
        avatar_url: None,
        created_at: Utc::now(),
    }
}
