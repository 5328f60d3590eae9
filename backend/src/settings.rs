use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::repository::Repository;

pub const HERO_CONFIG: &str = "hero_config";
pub const CONTACT_CONFIG: &str = "contact_config";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeroConfig {
    pub title: String,
    pub subtitle: String,
    pub image_url: Option<String>,
}

impl Default for HeroConfig {
    fn default() -> Self {
        HeroConfig {
            title: "Encuentra tu próximo hogar".to_string(),
            subtitle: "Propiedades seleccionadas por agentes verificados.".to_string(),
            image_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactConfig {
    pub phone: String,
    pub email: String,
    pub instagram: String,
    pub facebook: String,
    pub whatsapp: String,
}

impl Default for ContactConfig {
    fn default() -> Self {
        ContactConfig {
            phone: "+52 (81) 1234-5678".to_string(),
            email: "contacto@garzacasas.com".to_string(),
            instagram: "https://instagram.com".to_string(),
            facebook: "https://facebook.com".to_string(),
            whatsapp: "https://wa.me/528112345678".to_string(),
        }
    }
}

/// Read access to the key/value `site_settings` table.
#[derive(Clone)]
pub struct SiteSettings {
    repo: Arc<dyn Repository>,
}

impl SiteSettings {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        SiteSettings { repo }
    }

    /// Raw value for `key`; lookup errors are logged and read as missing.
    pub async fn get(&self, key: &str) -> Option<serde_json::Value> {
        match self.repo.site_setting(key).await {
            Ok(value) => value,
            Err(e) => {
                log::error!("Error fetching site setting '{}': {}", key, e);
                None
            }
        }
    }

    /// Typed value for `key`, or `T::default()` when absent or malformed.
    pub async fn get_or_default<T>(&self, key: &str) -> T
    where
        T: for<'de> Deserialize<'de> + Default,
    {
        match self.get(key).await {
            Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
                log::warn!("Malformed site setting '{}': {}", key, e);
                T::default()
            }),
            None => T::default(),
        }
    }

    pub async fn hero(&self) -> HeroConfig {
        self.get_or_default(HERO_CONFIG).await
    }

    pub async fn contact(&self) -> ContactConfig {
        self.get_or_default(CONTACT_CONFIG).await
    }
}
