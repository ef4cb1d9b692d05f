//! Google Places web API client.
//!
//! Thin typed wrapper over the text search, nearby search, and place details
//! endpoints. Without a configured API key the searches come back empty and
//! details behaves as not found, so the rest of the app keeps working in
//! development.

use std::time::Duration;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::{config::AppConfig, error::AppError};

const REQUEST_TIMEOUT_SECS: u64 = 30;
const DETAIL_FIELDS: &str = "place_id,name,formatted_address,geometry,rating,\
user_ratings_total,price_level,formatted_phone_number,international_phone_number,\
website,opening_hours,photos,reviews,types,business_status";

#[derive(Clone)]
pub struct PlacesClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl PlacesClient {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        if config.places_api_key.is_none() {
            warn!("GOOGLE_MAPS_API_KEY not configured; place searches will return no results");
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            api_key: config.places_api_key.clone(),
            base_url: config.places_base_url.clone(),
        })
    }

    pub async fn search(
        &self,
        query: &str,
        location: Option<(f64, f64)>,
        radius: u32,
        place_type: Option<&str>,
    ) -> Result<Vec<PlaceSummary>, AppError> {
        let Some(api_key) = &self.api_key else {
            return Ok(Vec::new());
        };

        let mut params = vec![
            ("query".to_string(), query.to_string()),
            ("language".to_string(), "en".to_string()),
            ("key".to_string(), api_key.clone()),
        ];
        if let Some((lat, lng)) = location {
            params.push(("location".to_string(), format!("{lat},{lng}")));
            params.push(("radius".to_string(), radius.to_string()));
        }
        if let Some(kind) = place_type {
            params.push(("type".to_string(), kind.to_string()));
        }

        let url = format!("{}/textsearch/json", self.base_url);
        let response: SearchResponse = self.get_json(&url, &params).await?;
        response.into_results()
    }

    pub async fn nearby(
        &self,
        latitude: f64,
        longitude: f64,
        radius: u32,
        place_type: Option<&str>,
    ) -> Result<Vec<PlaceSummary>, AppError> {
        let Some(api_key) = &self.api_key else {
            return Ok(Vec::new());
        };

        let mut params = vec![
            ("location".to_string(), format!("{latitude},{longitude}")),
            ("radius".to_string(), radius.to_string()),
            ("language".to_string(), "en".to_string()),
            ("key".to_string(), api_key.clone()),
        ];
        if let Some(kind) = place_type {
            params.push(("type".to_string(), kind.to_string()));
        }

        let url = format!("{}/nearbysearch/json", self.base_url);
        let response: SearchResponse = self.get_json(&url, &params).await?;
        response.into_results()
    }

    pub async fn details(&self, place_id: &str) -> Result<Option<PlaceDetails>, AppError> {
        let Some(api_key) = &self.api_key else {
            return Ok(None);
        };

        let params = vec![
            ("place_id".to_string(), place_id.to_string()),
            ("fields".to_string(), DETAIL_FIELDS.to_string()),
            ("language".to_string(), "en".to_string()),
            ("key".to_string(), api_key.clone()),
        ];
        let url = format!("{}/details/json", self.base_url);
        let response: DetailsResponse = self.get_json(&url, &params).await?;

        match response.status.as_str() {
            "OK" => Ok(response.result.map(PlaceDetails::from)),
            "NOT_FOUND" | "ZERO_RESULTS" | "INVALID_REQUEST" => Ok(None),
            status => Err(AppError::Other(anyhow!("places API error: {status}"))),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> Result<T, AppError> {
        let response = self.http.get(url).query(params).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Other(anyhow!(
                "places API returned HTTP {status}: {body}"
            )));
        }
        Ok(response.json::<T>().await?)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    status: String,
    #[serde(default)]
    results: Vec<RawPlace>,
}

impl SearchResponse {
    fn into_results(self) -> Result<Vec<PlaceSummary>, AppError> {
        match self.status.as_str() {
            "OK" | "ZERO_RESULTS" => {
                Ok(self.results.into_iter().map(PlaceSummary::from).collect())
            }
            status => Err(AppError::Other(anyhow!("places API error: {status}"))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    status: String,
    result: Option<RawPlace>,
}

#[derive(Debug, Deserialize)]
struct RawPlace {
    place_id: Option<String>,
    name: Option<String>,
    formatted_address: Option<String>,
    vicinity: Option<String>,
    geometry: Option<RawGeometry>,
    rating: Option<f64>,
    user_ratings_total: Option<i64>,
    price_level: Option<i64>,
    #[serde(default)]
    types: Vec<String>,
    business_status: Option<String>,
    formatted_phone_number: Option<String>,
    international_phone_number: Option<String>,
    website: Option<String>,
    opening_hours: Option<Value>,
    #[serde(default)]
    photos: Vec<RawPhoto>,
    #[serde(default)]
    reviews: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawGeometry {
    location: RawLatLng,
}

#[derive(Debug, Deserialize)]
struct RawLatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct RawPhoto {
    photo_reference: Option<String>,
}

/// Search-result view of a place.
#[derive(Debug, Clone, Serialize)]
pub struct PlaceSummary {
    pub place_id: Option<String>,
    pub name: Option<String>,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub rating: Option<f64>,
    pub user_ratings_total: Option<i64>,
    pub price_level: Option<i64>,
    pub types: Vec<String>,
    pub business_status: Option<String>,
}

impl From<RawPlace> for PlaceSummary {
    fn from(raw: RawPlace) -> Self {
        let location = raw.geometry.as_ref().map(|g| &g.location);
        Self {
            place_id: raw.place_id,
            name: raw.name,
            address: raw
                .formatted_address
                .or(raw.vicinity)
                .unwrap_or_default(),
            latitude: location.map(|l| l.lat),
            longitude: location.map(|l| l.lng),
            rating: raw.rating,
            user_ratings_total: raw.user_ratings_total,
            price_level: raw.price_level,
            types: raw.types,
            business_status: raw.business_status,
        }
    }
}

/// Detail view, with contact and review data on top of the summary fields.
#[derive(Debug, Clone, Serialize)]
pub struct PlaceDetails {
    #[serde(flatten)]
    pub summary: PlaceSummary,
    pub phone_number: Option<String>,
    pub international_phone_number: Option<String>,
    pub website: Option<String>,
    pub opening_hours: Option<Value>,
    pub photos: Vec<String>,
    pub reviews: Vec<Value>,
}

impl From<RawPlace> for PlaceDetails {
    fn from(mut raw: RawPlace) -> Self {
        let phone_number = raw.formatted_phone_number.take();
        let international_phone_number = raw.international_phone_number.take();
        let website = raw.website.take();
        let opening_hours = raw.opening_hours.take();
        let photos = std::mem::take(&mut raw.photos)
            .into_iter()
            .filter_map(|photo| photo.photo_reference)
            .collect();
        let mut reviews = std::mem::take(&mut raw.reviews);
        reviews.truncate(5);
        Self {
            summary: PlaceSummary::from(raw),
            phone_number,
            international_phone_number,
            website,
            opening_hours,
            photos,
            reviews,
        }
    }
}
