use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const ICON_BASE_URL: &str = "https://openweathermap.org/img/wn";
const HUMIDITY_BAR_WIDTH: usize = 20;

/// One complete set of current conditions for a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub location_name: String,
    pub country: String,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub humidity_pct: u8,
    pub pressure_hpa: u32,
    pub wind_speed_mps: f64,
    /// Absent when the provider does not report it.
    pub visibility_m: Option<u32>,
    /// Condition group, e.g. "Rain".
    pub condition_group: String,
    /// Short description, e.g. "light rain".
    pub condition: String,
    pub icon: Option<String>,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
    pub observation_time: DateTime<Utc>,
}

impl WeatherSnapshot {
    /// "Colombo, LK", or just the name when no country was reported.
    pub fn display_location(&self) -> String {
        if self.country.is_empty() {
            self.location_name.clone()
        } else {
            format!("{}, {}", self.location_name, self.country)
        }
    }

    pub fn icon_url(&self) -> Option<String> {
        self.icon
            .as_deref()
            .map(|icon| format!("{ICON_BASE_URL}/{icon}@4x.png"))
    }
}

/// Values shown in the highlights panel, derived from a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Highlights {
    pub temperature_c: i64,
    pub feels_like_c: i64,
    pub wind_speed_kmh: f64,
    pub humidity_pct: u8,
    pub visibility_km: Option<f64>,
    pub pressure_hpa: u32,
}

impl Highlights {
    pub fn from_snapshot(snapshot: &WeatherSnapshot) -> Self {
        Self {
            temperature_c: snapshot.temperature_c.round() as i64,
            feels_like_c: snapshot.feels_like_c.round() as i64,
            wind_speed_kmh: round_tenths(snapshot.wind_speed_mps * 3.6),
            humidity_pct: snapshot.humidity_pct.min(100),
            visibility_km: snapshot
                .visibility_m
                .map(|m| round_tenths(f64::from(m) / 1000.0)),
            pressure_hpa: snapshot.pressure_hpa,
        }
    }

    /// Fixed-width bar such as `[#########-----------]`.
    pub fn humidity_bar(&self) -> String {
        let filled = usize::from(self.humidity_pct) * HUMIDITY_BAR_WIDTH / 100;
        format!(
            "[{}{}]",
            "#".repeat(filled),
            "-".repeat(HUMIDITY_BAR_WIDTH - filled)
        )
    }
}

fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
