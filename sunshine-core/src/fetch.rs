//! Background fetch-and-persist task.
//!
//! A fetch is a single attempt: any failure is logged and the task yields
//! `None`. Nothing propagates past this boundary.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use crate::provider::ForecastProvider;
use crate::store::WeatherStore;

/// What a successful fetch wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub location_id: i64,
    pub rows_written: usize,
}

#[derive(Debug, Clone)]
pub struct FetchTask {
    provider: Arc<dyn ForecastProvider>,
    store: Arc<WeatherStore>,
}

impl FetchTask {
    pub fn new(provider: Arc<dyn ForecastProvider>, store: Arc<WeatherStore>) -> Self {
        Self { provider, store }
    }

    /// Run the fetch on its own tokio task.
    pub fn spawn(&self, location: String) -> JoinHandle<Option<FetchOutcome>> {
        let task = self.clone();
        tokio::spawn(async move { task.run(Some(&location)).await })
    }

    /// Fetch the forecast for `location` and persist it.
    ///
    /// Returns `None` without touching the network when no location is given,
    /// and `None` on any network, parse or store failure.
    #[instrument(skip(self))]
    pub async fn run(&self, location: Option<&str>) -> Option<FetchOutcome> {
        let location = match location.map(str::trim) {
            Some(location) if !location.is_empty() => location,
            _ => {
                debug!("No location to look up");
                return None;
            }
        };

        match self.fetch_and_store(location, Utc::now().date_naive()).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!("Forecast fetch for '{location}' failed: {err:#}");
                None
            }
        }
    }

    async fn fetch_and_store(
        &self,
        location: &str,
        today: NaiveDate,
    ) -> Result<Option<FetchOutcome>> {
        let Some(forecast) = self.provider.daily_forecast(location).await? else {
            return Ok(None);
        };

        let location_id = self
            .store
            .find_or_create_location(
                location,
                &forecast.city.name,
                forecast.city.latitude,
                forecast.city.longitude,
            )
            .context("Failed to store forecast location")?;

        let rows_written = self
            .store
            .upsert_weather(location_id, &forecast.days)
            .context("Failed to store forecast days")?;

        let pruned = self
            .store
            .delete_weather_before(today)
            .context("Failed to prune old forecast days")?;

        info!(location, rows_written, pruned, "Forecast refreshed");

        Ok(Some(FetchOutcome {
            location_id,
            rows_written,
        }))
    }
}
