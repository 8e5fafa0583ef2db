use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::{config::DEFAULT_BASE_URL, model::WeatherSnapshot};

use super::{ProviderError, WeatherProvider};

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http: Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    #[instrument(skip(self))]
    async fn fetch_current(&self, query: &str) -> Result<WeatherSnapshot, ProviderError> {
        let url = format!("{}/weather", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[
                ("q", query),
                ("units", "metric"),
                ("appid", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::transport(query, format!("request failed: {e}")))?;

        let status = res.status();
        let body = res.text().await.map_err(|e| {
            ProviderError::transport(query, format!("failed to read response body: {e}"))
        })?;

        debug!(%status, bytes = body.len(), "OpenWeather responded");

        snapshot_from_response(query, status, &body)
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current_conditions(&self, query: &str) -> Result<WeatherSnapshot, ProviderError> {
        self.fetch_current(query).await
    }
}

/// Map a raw `/weather` response onto a snapshot.
fn snapshot_from_response(
    query: &str,
    status: StatusCode,
    body: &str,
) -> Result<WeatherSnapshot, ProviderError> {
    if status == StatusCode::NOT_FOUND {
        return Err(ProviderError::NotFound {
            query: query.to_string(),
        });
    }

    if !status.is_success() {
        return Err(ProviderError::transport(
            query,
            format!("status {}: {}", status, truncate_body(body)),
        ));
    }

    let parsed: OwCurrentResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::transport(query, format!("malformed response: {e}")))?;

    let (condition_group, condition, icon) = match parsed.weather.first() {
        Some(w) => (w.main.clone(), w.description.clone(), Some(w.icon.clone())),
        None => ("Unknown".to_string(), "Unknown".to_string(), None),
    };

    Ok(WeatherSnapshot {
        location_name: parsed.name,
        country: parsed.sys.country.unwrap_or_default(),
        temperature_c: parsed.main.temp,
        feels_like_c: parsed.main.feels_like,
        humidity_pct: parsed.main.humidity,
        pressure_hpa: parsed.main.pressure,
        wind_speed_mps: parsed.wind.speed,
        visibility_m: parsed.visibility,
        condition_group,
        condition,
        icon,
        sunrise: parsed.sys.sunrise.and_then(unix_to_utc),
        sunset: parsed.sys.sunset.and_then(unix_to_utc),
        observation_time: parsed.dt.and_then(unix_to_utc).unwrap_or_else(Utc::now),
    })
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: u8,
    pressure: u32,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Default, Deserialize)]
struct OwSys {
    country: Option<String>,
    sunrise: Option<i64>,
    sunset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    dt: Option<i64>,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    wind: OwWind,
    #[serde(default)]
    sys: OwSys,
    visibility: Option<u32>,
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
