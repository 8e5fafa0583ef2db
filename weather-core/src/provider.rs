use crate::{Config, WeatherSnapshot, provider::openweather::OpenWeatherProvider};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};
use thiserror::Error;

pub mod openweather;

/// Failures a provider reports back to the controller.
///
/// Both kinds are handled the same way; they differ only in message text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("City not found: {query}")]
    NotFound { query: String },

    #[error("Could not fetch weather for {query}: {reason}")]
    Transport { query: String, reason: String },
}

impl ProviderError {
    pub fn transport(query: &str, err: impl std::fmt::Display) -> Self {
        ProviderError::Transport {
            query: query.to_string(),
            reason: err.to_string(),
        }
    }
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Current conditions for a free-text location, passed through verbatim.
    async fn current_conditions(&self, query: &str) -> Result<WeatherSnapshot, ProviderError>;
}

/// Construct the OpenWeather provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    let api_key = config.api_key()?;
    let provider = OpenWeatherProvider::new(api_key).with_base_url(config.base_url());

    Ok(Arc::new(provider))
}
