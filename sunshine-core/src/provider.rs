use crate::{Config, model::DailyForecast, provider::openweather::OpenWeatherProvider};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod openweather;

/// A remote source of daily forecasts.
#[async_trait]
pub trait ForecastProvider: Send + Sync + Debug {
    /// One round trip for `location`. `Ok(None)` means the service answered
    /// with an empty body.
    async fn daily_forecast(&self, location: &str) -> anyhow::Result<Option<DailyForecast>>;
}

/// Construct the OpenWeatherMap provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Arc<dyn ForecastProvider>> {
    let api_key = config.api_key()?;

    let provider = OpenWeatherProvider::new(api_key.to_owned()).with_base_url(&config.base_url);

    Ok(Arc::new(provider))
}
