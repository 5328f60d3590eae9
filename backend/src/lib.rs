//! Listing feed backend: tiered, paginated property listings with
//! subscription limits and engagement analytics.

pub mod analytics;
pub mod app;
pub mod auth;
pub mod client_state;
pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod handlers;
pub mod limits;
pub mod models;
pub mod repository;
pub mod schema;
pub mod settings;
