use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::model::{City, DailyForecast, WeatherDay, timestamp_to_day};

use super::ForecastProvider;

pub const DEFAULT_BASE_URL: &str = "http://api.openweathermap.org";
pub const FORECAST_PATH: &str = "/data/2.5/forecast/daily";
/// Days requested per fetch.
pub const FORECAST_DAYS: u8 = 14;

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
}

#[async_trait]
impl ForecastProvider for OpenWeatherProvider {
    async fn daily_forecast(&self, location: &str) -> Result<Option<DailyForecast>> {
        let url = format!("{}{FORECAST_PATH}", self.base_url);
        let days = FORECAST_DAYS.to_string();

        debug!(location, days = FORECAST_DAYS, "Requesting OpenWeather daily forecast");

        let res = self
            .http
            .get(&url)
            .query(&[
                ("q", location),
                ("mode", "json"),
                ("units", "metric"),
                ("cnt", days.as_str()),
                ("APPID", self.api_key.as_str()),
            ])
            .send()
            .await
            .context("Failed to send request to OpenWeather (daily forecast)")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read OpenWeather daily forecast response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "OpenWeather daily forecast request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        if body.trim().is_empty() {
            warn!(location, "OpenWeather returned an empty forecast body");
            return Ok(None);
        }

        parse_daily_forecast(&body).map(Some)
    }
}

#[derive(Debug, Deserialize)]
struct OwCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    name: String,
    coord: OwCoord,
}

#[derive(Debug, Deserialize)]
struct OwTemp {
    min: f64,
    max: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    id: i32,
    main: String,
}

#[derive(Debug, Deserialize)]
struct OwDay {
    dt: i64,
    temp: OwTemp,
    #[serde(default)]
    pressure: f64,
    #[serde(default)]
    humidity: f64,
    #[serde(default)]
    speed: f64,
    #[serde(default)]
    deg: f64,
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwDailyResponse {
    city: OwCity,
    list: Vec<OwDay>,
}

/// Parse a `forecast/daily` JSON body into one row per day.
pub fn parse_daily_forecast(body: &str) -> Result<DailyForecast> {
    let parsed: OwDailyResponse =
        serde_json::from_str(body).context("Failed to parse OpenWeather daily forecast JSON")?;

    let days = parsed
        .list
        .into_iter()
        .map(|entry| -> Result<WeatherDay> {
            let date = timestamp_to_day(entry.dt)
                .ok_or_else(|| anyhow!("OpenWeather forecast has invalid timestamp {}", entry.dt))?;

            let (weather_condition_id, short_description) = entry
                .weather
                .into_iter()
                .next()
                .map(|w| (w.id, w.main))
                .unwrap_or_else(|| (0, "Unknown".to_string()));

            Ok(WeatherDay {
                date,
                short_description,
                max_temp: entry.temp.max,
                min_temp: entry.temp.min,
                humidity: entry.humidity,
                wind_speed: entry.speed,
                wind_direction_degrees: entry.deg,
                pressure: entry.pressure,
                weather_condition_id,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(DailyForecast {
        city: City {
            name: parsed.city.name,
            latitude: parsed.city.coord.lat,
            longitude: parsed.city.coord.lon,
        },
        days,
    })
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((end, _)) => format!("{}...", &body[..end]),
        None => body.to_string(),
    }
}
