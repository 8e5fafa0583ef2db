use chrono::{DateTime, Local, Utc};
use weather_core::{DashboardState, Highlights, WeatherSnapshot};

const MISSING: &str = "--";
const TITLE: &str = "WeatherLy";

/// Render the whole dashboard for one state revision.
pub fn render(state: &DashboardState) -> String {
    let mut lines = vec![TITLE.to_string(), String::new()];

    if state.in_flight {
        let pending = state.pending_query.as_deref().unwrap_or_default();
        lines.push(format!("Loading weather data for {pending}..."));
        lines.push(String::new());
    }

    if let Some(error) = &state.error {
        lines.push(format!("! {}  (:d to dismiss)", error.message));
        lines.push(String::new());
    }

    match &state.result {
        Some(snapshot) => {
            lines.extend(current_conditions(snapshot));
            lines.push(String::new());
            lines.extend(highlights(snapshot));
        }
        None if !state.in_flight => lines.push("City not found".to_string()),
        None => {}
    }

    if !state.history.is_empty() {
        lines.push(String::new());
        lines.push("Recent searches".to_string());
        lines.extend(
            state
                .history
                .iter()
                .enumerate()
                .map(|(idx, entry)| format!("  {}. {entry}", idx + 1)),
        );
    }

    lines.push(String::new());
    lines.join("\n")
}

fn current_conditions(snapshot: &WeatherSnapshot) -> Vec<String> {
    let highlights = Highlights::from_snapshot(snapshot);

    let mut lines = vec![
        snapshot.display_location(),
        format!(
            "{}°C  {}  (feels like {}°C)",
            highlights.temperature_c, snapshot.condition, highlights.feels_like_c
        ),
    ];
    if let Some(url) = snapshot.icon_url() {
        lines.push(format!("Icon: {url}"));
    }
    lines.push(format!(
        "Updated {}",
        local_time(Some(snapshot.observation_time))
    ));
    lines
}

fn highlights(snapshot: &WeatherSnapshot) -> Vec<String> {
    let h = Highlights::from_snapshot(snapshot);
    let visibility = h
        .visibility_km
        .map(|km| format!("{km:.1} km"))
        .unwrap_or_else(|| MISSING.to_string());

    vec![
        "Highlights".to_string(),
        format!("  {:12}{:.1} km/h", "Wind", h.wind_speed_kmh),
        format!("  {:12}{} % {}", "Humidity", h.humidity_pct, h.humidity_bar()),
        format!("  {:12}{visibility}", "Visibility"),
        format!("  {:12}{} hPa", "Pressure", h.pressure_hpa),
        format!("  {:12}{}", "Sunrise", local_time(snapshot.sunrise)),
        format!("  {:12}{}", "Sunset", local_time(snapshot.sunset)),
    ]
}

fn local_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.with_timezone(&Local).format("%H:%M").to_string())
        .unwrap_or_else(|| MISSING.to_string())
}
