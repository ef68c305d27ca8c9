use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::debug;

use crate::config::Units;
use crate::error::StoreError;
use crate::format::{self, WeatherArt};
use crate::model::ForecastRow;
use crate::store::{StoreChange, WeatherStore};
use crate::uri::ForecastUri;

use super::ScreenState;

/// Everything the detail screen shows for one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailView {
    pub row: ForecastRow,
    pub day: String,
    pub description: String,
    pub high: String,
    pub low: String,
    pub humidity: String,
    pub wind: String,
    pub pressure: String,
    pub icon: Option<&'static str>,
}

impl DetailView {
    pub fn new(row: ForecastRow, units: Units, today: NaiveDate) -> Self {
        let weather = &row.day;

        Self {
            day: format::friendly_day(weather.date, today),
            description: weather.short_description.clone(),
            high: format::temperature(weather.max_temp, units),
            low: format::temperature(weather.min_temp, units),
            humidity: format::humidity(weather.humidity),
            wind: format::wind(weather.wind_speed, weather.wind_direction_degrees, units),
            pressure: format::pressure(weather.pressure),
            icon: WeatherArt::from_condition_id(weather.weather_condition_id).map(|a| a.icon()),
            row,
        }
    }

    pub fn share_text(&self) -> String {
        format::share_text(&self.day, &self.description, &self.high, &self.low)
    }
}

/// A single day's forecast for one location.
#[derive(Debug)]
pub struct DetailScreen {
    store: Arc<WeatherStore>,
    uri: ForecastUri,
    units: Units,
    state: ScreenState<DetailView>,
}

impl DetailScreen {
    /// `uri` must name one `(location, date)` pair.
    pub fn new(
        store: Arc<WeatherStore>,
        uri: ForecastUri,
        units: Units,
    ) -> Result<Self, StoreError> {
        if uri.date().is_none() {
            return Err(StoreError::UnsupportedUri(uri));
        }

        Ok(Self {
            store,
            uri,
            units,
            state: ScreenState::Uninitialized,
        })
    }

    pub fn uri(&self) -> &ForecastUri {
        &self.uri
    }

    pub fn state(&self) -> &ScreenState<DetailView> {
        &self.state
    }

    pub fn view(&self) -> Option<&DetailView> {
        self.state.loaded()
    }

    pub fn load(&mut self) {
        self.state = match self.store.query_detail(&self.uri) {
            Ok(Some(row)) => {
                ScreenState::Loaded(DetailView::new(row, self.units, Utc::now().date_naive()))
            }
            Ok(None) => ScreenState::Error(format!("No forecast stored for {}", self.uri)),
            Err(err) => ScreenState::Error(err.to_string()),
        };
    }

    /// Text for the share action, once a day is loaded.
    pub fn share_text(&self) -> Option<String> {
        self.view().map(DetailView::share_text)
    }

    /// Point at the same date for `location` and reload.
    pub fn on_location_changed(&mut self, location: &str) {
        let uri = self.uri.with_location(location.trim());
        debug!(from = %self.uri, to = %uri, "Detail location changed");

        self.uri = uri;
        self.load();
    }

    /// Reload when a change touches the shown location. Returns whether the
    /// screen was updated.
    pub fn handle_change(&mut self, change: &StoreChange) -> bool {
        let Some(location) = self.uri.location_setting() else {
            return false;
        };

        if self.state.is_uninitialized() || !change.uri.affects_location(location) {
            return false;
        }

        self.load();
        true
    }
}
