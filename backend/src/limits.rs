//! Subscription quota checks for listing creation and image uploads.

use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{PlanFeatures, Profile};
use crate::repository::Repository;

/// Plan name reported for admins and accounts flagged unlimited.
pub const UNLIMITED_PLAN: &str = "Ilimitado";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum Decision {
    Allowed,
    Denied { message: String },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }

    /// Turns a denial into an error for request handlers.
    pub fn into_result(self) -> Result<(), AppError> {
        match self {
            Decision::Allowed => Ok(()),
            Decision::Denied { message } => Err(AppError::LimitReached(message)),
        }
    }
}

/// An agent's plan quotas together with what they currently use.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanUsage {
    pub plan_name: String,
    pub is_unlimited: bool,
    pub limits: PlanFeatures,
    pub properties_count: i64,
}

impl PlanUsage {
    pub fn remaining_properties(&self) -> i64 {
        if self.is_unlimited {
            return i64::MAX;
        }
        (self.limits.properties_limit - self.properties_count).max(0)
    }

    pub fn check_create_property(&self) -> Decision {
        if self.is_unlimited || self.properties_count < self.limits.properties_limit {
            return Decision::Allowed;
        }
        Decision::Denied {
            message: format!(
                "You have reached the limit of {} properties on your {} plan. Upgrade your plan to create more properties.",
                self.limits.properties_limit, self.plan_name
            ),
        }
    }

    pub fn check_upload_images(&self, current_images: usize) -> Decision {
        if self.is_unlimited || (current_images as i64) < self.limits.images_per_property {
            return Decision::Allowed;
        }
        Decision::Denied {
            message: format!(
                "You have reached the limit of {} images per property on your {} plan.",
                self.limits.images_per_property, self.plan_name
            ),
        }
    }

    /// Checks a full image list about to be attached to one listing.
    pub fn check_image_count(&self, total_images: usize) -> Decision {
        if total_images == 0 {
            return Decision::Allowed;
        }
        self.check_upload_images(total_images - 1)
    }
}

#[derive(Clone)]
pub struct PlanLimiter {
    repo: Arc<dyn Repository>,
    default_plan: String,
}

impl PlanLimiter {
    pub fn new(repo: Arc<dyn Repository>, default_plan: impl Into<String>) -> Self {
        PlanLimiter {
            repo,
            default_plan: default_plan.into(),
        }
    }

    /// Resolves the agent's plan and counts their listings. Plan lookup
    /// failures fall back to the free tier; a failed count is an error.
    pub async fn usage(&self, agent_id: Uuid) -> Result<PlanUsage, AppError> {
        let profile = match self.repo.find_profile(agent_id).await {
            Ok(profile) => profile,
            Err(e) => {
                log::error!("Error fetching profile {}: {}", agent_id, e);
                None
            }
        };

        if profile.as_ref().is_some_and(|p| p.is_unlimited || p.is_admin()) {
            return Ok(PlanUsage {
                plan_name: UNLIMITED_PLAN.to_string(),
                is_unlimited: true,
                limits: PlanFeatures::unlimited(),
                properties_count: self.repo.count_agent_properties(agent_id).await?,
            });
        }

        let (plan_name, limits) = self.resolve_plan(profile.as_ref()).await;
        let properties_count = self.repo.count_agent_properties(agent_id).await?;
        Ok(PlanUsage {
            plan_name,
            is_unlimited: false,
            limits,
            properties_count,
        })
    }

    async fn resolve_plan(&self, profile: Option<&Profile>) -> (String, PlanFeatures) {
        let name = profile
            .and_then(|p| p.subscription_plan.clone())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.default_plan.clone());

        match self.repo.find_plan(&name).await {
            Ok(Some(plan)) => (plan.name, plan.features),
            Ok(None) => {
                log::warn!("Plan '{}' not found, using free tier limits", name);
                (name, PlanFeatures::default())
            }
            Err(e) => {
                log::error!("Error fetching plan '{}': {}, using free tier limits", name, e);
                (name, PlanFeatures::default())
            }
        }
    }

    pub async fn check_create_property(&self, agent_id: Uuid) -> Result<Decision, AppError> {
        Ok(self.usage(agent_id).await?.check_create_property())
    }
}
