//! Core library for the `weather` dashboard.
//!
//! This crate defines:
//! - The query controller that owns dashboard state
//! - Abstraction over the weather provider (OpenWeather)
//! - Shared domain models (snapshots, derived highlights)
//! - Configuration & credentials handling
//!
//! It is used by `weather-cli`, but can also back other front ends.

pub mod config;
pub mod controller;
pub mod model;
pub mod provider;

pub use config::Config;
pub use controller::{ControllerHandle, ControllerSettings, DashboardState, QueryController};
pub use model::{Highlights, WeatherSnapshot};
pub use provider::{ProviderError, WeatherProvider, provider_from_config};
