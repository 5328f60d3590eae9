use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{delete, get, post, put};
use axum::Router;
use std::sync::Arc;

use crate::analytics::Analytics;
use crate::auth;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::feed::{FeedService, ListingSource};
use crate::handlers;
use crate::limits::PlanLimiter;
use crate::repository::Repository;
use crate::settings::SiteSettings;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub repo: Arc<dyn Repository>,
    pub feed: FeedService,
    pub limiter: PlanLimiter,
    pub analytics: Analytics,
    pub settings: SiteSettings,
}

impl AppState {
    pub fn new<R: Repository + 'static>(config: AppConfig, store: Arc<R>) -> Self {
        let listings: Arc<dyn ListingSource> = store.clone();
        let repo: Arc<dyn Repository> = store;
        AppState {
            feed: FeedService::new(listings, config.page_size),
            limiter: PlanLimiter::new(repo.clone(), config.default_plan.clone()),
            analytics: Analytics::new(repo.clone()),
            settings: SiteSettings::new(repo.clone()),
            repo,
            config,
        }
    }
}

async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = {
        let header = request
            .headers()
            .get(AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;
        let token = header
            .to_str()
            .ok()
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization header format".into()))?;
        auth::validate_token(token, &state.config.jwt_secret)?
    };
    log::info!("Authenticated user: {} for {}", user.0, request.uri().path());
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

pub fn router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/properties", post(handlers::create_property))
        .route("/properties/:id", delete(handlers::delete_property))
        .route("/properties/:id/analytics", get(handlers::property_analytics))
        .route("/me/properties", get(handlers::my_properties))
        .route("/me/limits", get(handlers::my_limits))
        .route("/me/stats", get(handlers::my_stats))
        .route("/me/stats/refresh", post(handlers::refresh_my_stats))
        .route("/me/stats/top", get(handlers::my_top_properties))
        .route("/admin/agents", get(handlers::list_agents))
        .route("/admin/agents/:id/plan", put(handlers::change_agent_plan))
        .layer(middleware::from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .route("/", get(|| async { "Listing feed is running" }))
        .route("/properties", get(handlers::list_properties))
        .route("/properties/featured", get(handlers::featured_properties))
        .route("/properties/:id", get(handlers::get_property))
        .route("/properties/:id/views", post(handlers::track_view))
        .route("/properties/:id/interactions", post(handlers::track_interaction))
        .route("/plans", get(handlers::list_plans))
        .route("/settings/:key", get(handlers::site_setting))
        .merge(protected_routes)
        .with_state(state)
}
