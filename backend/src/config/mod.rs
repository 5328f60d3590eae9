use dotenv::dotenv;
use serde::Deserialize;

use crate::error::AppError;

pub const DEFAULT_PAGE_SIZE: usize = 6;
pub const DEFAULT_PLAN: &str = "Gratis";

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    /// Postgres connection string. Without one the service keeps its data in memory.
    #[serde(default)]
    pub database_url: Option<String>,
    pub port: u16,
    pub jwt_secret: String,
    pub page_size: usize,
    pub default_plan: String,
}

impl AppConfig {
    pub fn load() -> Result<Self, AppError> {
        dotenv().ok(); // Load .env file if present
        let settings = config::Config::builder()
            .set_default("port", 8080)?
            .set_default("page_size", DEFAULT_PAGE_SIZE as i64)?
            .set_default("default_plan", DEFAULT_PLAN)?
            .add_source(config::Environment::default().try_parsing(true))
            .build()?;
        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.jwt_secret.is_empty() {
            return Err(AppError::Config("JWT_SECRET must not be empty".into()));
        }
        if self.page_size == 0 {
            return Err(AppError::Config("PAGE_SIZE must be at least 1".into()));
        }
        Ok(())
    }
}
