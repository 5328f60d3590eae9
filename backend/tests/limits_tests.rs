//! Plan limiter tests against the in-memory store.

mod common;

use std::sync::Arc;

use uuid::Uuid;

use common::{listing, owned_by, profile};
use listing_feed::error::AppError;
use listing_feed::limits::{Decision, PlanLimiter, UNLIMITED_PLAN};
use listing_feed::models::{PlanFeatures, Role};
use listing_feed::repository::MemoryRepository;

fn setup() -> (Arc<MemoryRepository>, PlanLimiter) {
    let repo = Arc::new(MemoryRepository::with_default_plans());
    let limiter = PlanLimiter::new(repo.clone(), "Gratis");
    (repo, limiter)
}

fn give_listings(repo: &MemoryRepository, agent_id: Uuid, count: usize) {
    for i in 0..count {
        repo.add_property(owned_by(
            listing(&format!("Listing {}", i), "Casa", 1_000_000, 1, i as i64),
            agent_id,
        ));
    }
}

#[tokio::test]
async fn free_plan_allows_up_to_five() {
    let (repo, limiter) = setup();
    let agent = Uuid::new_v4();
    repo.add_profile(profile(agent, Role::Agent, Some("Gratis")));

    give_listings(&repo, agent, 4);
    assert!(limiter.check_create_property(agent).await.unwrap().is_allowed());

    give_listings(&repo, agent, 1);
    let decision = limiter.check_create_property(agent).await.unwrap();
    match decision {
        Decision::Denied { message } => {
            assert!(message.contains('5'));
            assert!(message.contains("Gratis"));
        }
        Decision::Allowed => panic!("sixth listing must be denied"),
    }
}

#[tokio::test]
async fn denial_maps_to_limit_reached() {
    let (repo, limiter) = setup();
    let agent = Uuid::new_v4();
    repo.add_profile(profile(agent, Role::Agent, Some("Gratis")));
    give_listings(&repo, agent, 5);

    let err = limiter
        .check_create_property(agent)
        .await
        .unwrap()
        .into_result()
        .unwrap_err();
    assert!(matches!(err, AppError::LimitReached(_)));
}

#[tokio::test]
async fn paid_plan_limits_come_from_the_plan() {
    let (repo, limiter) = setup();
    let agent = Uuid::new_v4();
    repo.add_profile(profile(agent, Role::Agent, Some("Pro")));
    give_listings(&repo, agent, 12);

    let usage = limiter.usage(agent).await.unwrap();
    assert_eq!(usage.plan_name, "Pro");
    assert_eq!(usage.limits.properties_limit, 50);
    assert_eq!(usage.limits.priority_tier, 2);
    assert_eq!(usage.properties_count, 12);
    assert_eq!(usage.remaining_properties(), 38);
}

#[tokio::test]
async fn unknown_plan_keeps_its_name_with_free_tier_limits() {
    let (repo, limiter) = setup();
    let agent = Uuid::new_v4();
    repo.add_profile(profile(agent, Role::Agent, Some("Legacy")));
    give_listings(&repo, agent, 5);

    let usage = limiter.usage(agent).await.unwrap();
    assert_eq!(usage.plan_name, "Legacy");
    assert_eq!(usage.limits, PlanFeatures::default());
    match usage.check_create_property() {
        Decision::Denied { message } => assert!(message.contains("Legacy")),
        Decision::Allowed => panic!("free tier limit must apply"),
    }
}

#[tokio::test]
async fn failed_plan_lookup_falls_back_to_free_tier() {
    let (repo, limiter) = setup();
    let agent = Uuid::new_v4();
    repo.add_profile(profile(agent, Role::Agent, Some("Platino")));
    give_listings(&repo, agent, 7);
    repo.set_plans_unavailable(true);

    let usage = limiter.usage(agent).await.unwrap();
    assert_eq!(usage.plan_name, "Platino");
    assert_eq!(usage.limits, PlanFeatures::default());
    assert_eq!(usage.properties_count, 7);
    assert!(!usage.check_create_property().is_allowed());

    repo.set_plans_unavailable(false);
    let usage = limiter.usage(agent).await.unwrap();
    assert_eq!(usage.limits.properties_limit, 500);
    assert!(usage.check_create_property().is_allowed());
}

#[tokio::test]
async fn missing_profile_uses_the_default_plan() {
    let (_repo, limiter) = setup();
    let usage = limiter.usage(Uuid::new_v4()).await.unwrap();
    assert_eq!(usage.plan_name, "Gratis");
    assert_eq!(usage.limits.properties_limit, 5);
    assert_eq!(usage.properties_count, 0);
}

#[tokio::test]
async fn admins_and_flagged_accounts_are_unlimited() {
    let (repo, limiter) = setup();
    let admin = Uuid::new_v4();
    repo.add_profile(profile(admin, Role::Admin, Some("Gratis")));
    give_listings(&repo, admin, 40);

    let flagged = Uuid::new_v4();
    let mut flagged_profile = profile(flagged, Role::Agent, None);
    flagged_profile.is_unlimited = true;
    repo.add_profile(flagged_profile);
    give_listings(&repo, flagged, 40);

    for agent in [admin, flagged] {
        let usage = limiter.usage(agent).await.unwrap();
        assert!(usage.is_unlimited);
        assert_eq!(usage.plan_name, UNLIMITED_PLAN);
        assert!(usage.check_create_property().is_allowed());
    }
}

#[tokio::test]
async fn counting_failure_is_an_error() {
    let (repo, limiter) = setup();
    repo.set_unavailable(true);
    assert!(limiter.usage(Uuid::new_v4()).await.is_err());
}
