//! Core library for the `sunshine` weather client.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeatherMap daily-forecast provider and the fetch task
//! - The SQLite forecast store, its content URIs and change notifications
//! - List and detail screen state machines, plus display formatting
//!
//! It is used by `sunshine-cli`, but can also be driven by any other front end.

pub mod config;
pub mod error;
pub mod fetch;
pub mod format;
pub mod model;
pub mod provider;
pub mod schema;
pub mod screen;
pub mod store;
pub mod uri;

pub use config::{Config, Units};
pub use error::StoreError;
pub use fetch::{FetchOutcome, FetchTask};
pub use model::{City, DailyForecast, ForecastRow, Location, WeatherDay};
pub use provider::{ForecastProvider, provider_from_config};
pub use screen::{DetailScreen, DetailView, ForecastListScreen, ListItem, ScreenState};
pub use store::{StoreChange, WeatherStore};
pub use uri::{ForecastUri, UriError, map_uri};
