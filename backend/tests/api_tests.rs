//! HTTP surface tests, driven through the router with `oneshot`.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use common::{listing, owned_by, profile, test_config, JWT_SECRET};
use listing_feed::app::{router, AppState};
use listing_feed::auth::create_token;
use listing_feed::models::Role;
use listing_feed::repository::MemoryRepository;
use listing_feed::settings::HERO_CONFIG;

fn app(repo: Arc<MemoryRepository>) -> Router {
    router(AppState::new(test_config(3), repo))
}

fn bearer(user: Uuid) -> String {
    format!("Bearer {}", create_token(user, JWT_SECRET).unwrap())
}

async fn send(app: Router, method: Method, uri: &str, user: Option<Uuid>, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        request = request.header("Authorization", bearer(user));
    }
    let request = match body {
        Some(body) => request
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn new_listing(title: &str) -> Value {
    json!({
        "title": title,
        "price": 2_500_000,
        "location": "San Pedro",
        "property_type": "Casa",
        "features": {"bedrooms": 3, "bathrooms": 2, "square_feet": 1800},
        "image_urls": ["a.jpg", "b.jpg"]
    })
}

// =============================================================================
// Public feed
// =============================================================================

#[tokio::test]
async fn feed_pages_through_filters() {
    let repo = Arc::new(MemoryRepository::with_default_plans());
    for i in 0..5 {
        repo.add_property(listing(&format!("House {}", i), "Casa", 1_000_000 * (i + 1), 1, i));
    }
    repo.add_property(listing("Flat", "Departamento", 1_000_000, 3, 0));

    let (status, body) = send(app(repo.clone()), Method::GET, "/properties?type=Casa&location=", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 3);
    assert_eq!(body["has_more"], json!(true));

    let (_, body) = send(app(repo.clone()), Method::GET, "/properties?type=Casa&page=1", None, None).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["offset"], json!(3));
    assert_eq!(body["has_more"], json!(false));

    let (_, body) = send(app(repo), Method::GET, "/properties?max_price=2000000", None, None).await;
    let titles: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Flat", "House 0", "House 1"]);
}

#[tokio::test]
async fn bad_filter_values_are_rejected() {
    let repo = Arc::new(MemoryRepository::new());
    let (status, body) = send(app(repo.clone()), Method::GET, "/properties?beds=many", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("beds"));

    let (status, _) = send(app(repo), Method::GET, "/properties?price_range=cheap", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn out_of_range_paging_is_rejected() {
    let repo = Arc::new(MemoryRepository::new());
    repo.add_property(listing("House", "Casa", 1_000_000, 1, 0));

    let uri = format!("/properties?page={}", usize::MAX);
    let (status, body) = send(app(repo.clone()), Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("out of range"));

    let uri = format!("/properties?page={}", usize::MAX / 3 - 1);
    let (status, body) = send(app(repo.clone()), Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["items"].as_array().unwrap().is_empty());

    for limit in ["0", "51", "18446744073709551615"] {
        let uri = format!("/properties/featured?limit={}", limit);
        let (status, _) = send(app(repo.clone()), Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "limit={}", limit);
    }

    let (status, body) = send(app(repo), Method::GET, "/properties/featured?limit=50", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn featured_is_a_single_window() {
    let repo = Arc::new(MemoryRepository::new());
    for i in 0..6 {
        repo.add_property(listing(&format!("House {}", i), "Casa", 1_000_000, (i % 3) as u8 + 1, i));
    }
    let (status, body) = send(app(repo), Method::GET, "/properties/featured?limit=4", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let tiers: Vec<u64> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["priority_tier"].as_u64().unwrap())
        .collect();
    assert_eq!(tiers, vec![3, 3, 2, 2]);
    assert_eq!(body["has_more"], json!(false));
}

#[tokio::test]
async fn unknown_property_is_not_found() {
    let repo = Arc::new(MemoryRepository::new());
    let uri = format!("/properties/{}", Uuid::new_v4());
    let (status, _) = send(app(repo), Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Agent listings and limits
// =============================================================================

#[tokio::test]
async fn creating_requires_a_token() {
    let repo = Arc::new(MemoryRepository::with_default_plans());
    let (status, _) = send(app(repo), Method::POST, "/properties", None, Some(new_listing("House"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn free_agent_is_stopped_at_the_plan_limit() {
    let repo = Arc::new(MemoryRepository::with_default_plans());
    let agent = Uuid::new_v4();
    repo.add_profile(profile(agent, Role::Agent, Some("Gratis")));

    for i in 0..5 {
        let (status, body) = send(
            app(repo.clone()),
            Method::POST,
            "/properties",
            Some(agent),
            Some(new_listing(&format!("House {}", i))),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["priority_tier"], json!(1));
        assert_eq!(body["agent_id"], json!(agent));
    }

    let (status, body) = send(app(repo.clone()), Method::POST, "/properties", Some(agent), Some(new_listing("Sixth"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("Gratis"));

    let (_, limits) = send(app(repo), Method::GET, "/me/limits", Some(agent), None).await;
    assert_eq!(limits["properties_count"], json!(5));
    assert_eq!(limits["remaining_properties"], json!(0));
    assert_eq!(limits["can_create_property"], json!(false));
}

#[tokio::test]
async fn too_many_images_are_refused() {
    let repo = Arc::new(MemoryRepository::with_default_plans());
    let agent = Uuid::new_v4();
    repo.add_profile(profile(agent, Role::Agent, Some("Gratis")));

    let mut body = new_listing("Gallery");
    body["image_urls"] = json!(["1.jpg", "2.jpg", "3.jpg", "4.jpg"]);
    let (status, _) = send(app(repo), Method::POST, "/properties", Some(agent), Some(body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn only_owners_delete() {
    let repo = Arc::new(MemoryRepository::with_default_plans());
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let house = owned_by(listing("House", "Casa", 1_000_000, 1, 0), owner);
    repo.add_property(house.clone());
    let uri = format!("/properties/{}", house.id);

    let (status, _) = send(app(repo.clone()), Method::DELETE, &uri, Some(stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(app(repo.clone()), Method::DELETE, &uri, Some(owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(app(repo), Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Tracking and admin
// =============================================================================

#[tokio::test]
async fn views_and_interactions_feed_the_stats() {
    let repo = Arc::new(MemoryRepository::with_default_plans());
    let agent = Uuid::new_v4();
    let house = owned_by(listing("House", "Casa", 1_000_000, 1, 0), agent);
    repo.add_property(house.clone());

    let views = format!("/properties/{}/views", house.id);
    let interactions = format!("/properties/{}/interactions", house.id);
    let (status, _) = send(app(repo.clone()), Method::POST, &views, None, Some(json!({"session_id": "s1"}))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let (status, _) = send(
        app(repo.clone()),
        Method::POST,
        &interactions,
        None,
        Some(json!({"session_id": "s1", "interaction_type": "whatsapp_click"})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, _) = send(
        app(repo.clone()),
        Method::POST,
        &interactions,
        None,
        Some(json!({"session_id": "s1", "interaction_type": "carrier_pigeon"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(app(repo), Method::POST, "/me/stats/refresh", Some(agent), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["total_views"], json!(1));
    assert_eq!(body["stats"]["total_whatsapp_clicks"], json!(1));
    assert_eq!(body["contact_rate"], json!(100));
}

#[tokio::test]
async fn admin_plan_change_restamps_listings() {
    let repo = Arc::new(MemoryRepository::with_default_plans());
    let admin = Uuid::new_v4();
    let agent = Uuid::new_v4();
    repo.add_profile(profile(admin, Role::Admin, None));
    repo.add_profile(profile(agent, Role::Agent, Some("Gratis")));
    repo.add_property(owned_by(listing("House", "Casa", 1_000_000, 1, 0), agent));
    repo.add_property(owned_by(listing("Flat", "Departamento", 1_000_000, 1, 1), agent));

    let uri = format!("/admin/agents/{}/plan", agent);
    let (status, _) = send(app(repo.clone()), Method::PUT, &uri, Some(agent), Some(json!({"plan": "Platino"}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(app(repo.clone()), Method::PUT, &uri, Some(admin), Some(json!({"plan": "Platino"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["priority_tier"], json!(3));
    assert_eq!(body["updated_listings"], json!(2));

    let (_, feed) = send(app(repo.clone()), Method::GET, "/properties", None, None).await;
    assert!(feed["items"]
        .as_array()
        .unwrap()
        .iter()
        .all(|p| p["priority_tier"] == json!(3)));

    let (status, _) = send(app(repo), Method::PUT, &uri, Some(admin), Some(json!({"plan": "Diamante"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn settings_fall_back_to_defaults() {
    let repo = Arc::new(MemoryRepository::new());
    let (status, body) = send(app(repo.clone()), Method::GET, &format!("/settings/{}", HERO_CONFIG), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["title"].is_string());

    repo.set_site_setting(HERO_CONFIG, json!({"title": "Hola"}));
    let (_, body) = send(app(repo.clone()), Method::GET, &format!("/settings/{}", HERO_CONFIG), None, None).await;
    assert_eq!(body["title"], json!("Hola"));

    let (status, body) = send(app(repo.clone()), Method::GET, "/settings/contact_config", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], json!("contacto@garzacasas.com"));

    let (status, _) = send(app(repo), Method::GET, "/settings/unknown", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn plans_are_listed_in_priority_order() {
    let repo = Arc::new(MemoryRepository::with_default_plans());
    let (status, body) = send(app(repo), Method::GET, "/plans", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Gratis", "Pro", "Platino"]);
}
