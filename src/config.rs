use std::{env, net::SocketAddr};

use crate::error::AppError;

pub const DEFAULT_PLACES_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    pub cookie_secret: String,
    pub places_api_key: Option<String>,
    pub places_base_url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://roadtrip.db".to_string());
        let listen_addr: SocketAddr = env::var("APP_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid APP_LISTEN_ADDR: {err}")))?;

        let cookie_secret = env::var("COOKIE_SECRET")
            .unwrap_or_else(|_| "change-me-super-secret-roadtrip-cookie".to_string());

        let places_api_key = env::var("GOOGLE_MAPS_API_KEY")
            .ok()
            .filter(|key| !key.is_empty());
        let places_base_url =
            env::var("PLACES_BASE_URL").unwrap_or_else(|_| DEFAULT_PLACES_BASE_URL.to_string());

        Ok(Self {
            database_url,
            listen_addr,
            cookie_secret,
            places_api_key,
            places_base_url,
        })
    }
}
