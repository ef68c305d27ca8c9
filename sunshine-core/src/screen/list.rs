use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Units;
use crate::fetch::FetchTask;
use crate::format::{self, WeatherArt};
use crate::model::ForecastRow;
use crate::store::{StoreChange, WeatherStore};
use crate::uri::ForecastUri;

use super::ScreenState;

/// One rendered line of the forecast list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListItem {
    pub date: NaiveDate,
    pub day: String,
    pub description: String,
    pub high: String,
    pub low: String,
    pub icon: Option<&'static str>,
}

impl ListItem {
    pub fn from_row(row: &ForecastRow, units: Units, today: NaiveDate) -> Self {
        let date = row.day.date;

        Self {
            date,
            day: format::friendly_day(date, today),
            description: row.day.short_description.clone(),
            high: format::temperature(row.day.max_temp, units),
            low: format::temperature(row.day.min_temp, units),
            icon: WeatherArt::from_condition_id(row.day.weather_condition_id).map(|a| a.icon()),
        }
    }
}

/// Daily summaries for the current location.
#[derive(Debug)]
pub struct ForecastListScreen {
    store: Arc<WeatherStore>,
    fetcher: FetchTask,
    location: String,
    state: ScreenState<Vec<ForecastRow>>,
}

impl ForecastListScreen {
    /// `location` is stored trimmed, the same key the fetch task writes under.
    pub fn new(store: Arc<WeatherStore>, fetcher: FetchTask, location: &str) -> Self {
        Self {
            store,
            fetcher,
            location: location.trim().to_string(),
            state: ScreenState::Uninitialized,
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn state(&self) -> &ScreenState<Vec<ForecastRow>> {
        &self.state
    }

    pub fn rows(&self) -> &[ForecastRow] {
        self.state.loaded().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn items(&self, units: Units) -> Vec<ListItem> {
        let today = Utc::now().date_naive();
        self.rows()
            .iter()
            .map(|row| ListItem::from_row(row, units, today))
            .collect()
    }

    /// Fetch fresh data for the current location, then show what is stored.
    ///
    /// A failed fetch is not an error for the screen: whatever was stored
    /// before is shown.
    pub async fn refresh(&mut self) {
        self.state = ScreenState::Loading;

        if self.fetcher.run(Some(self.location.as_str())).await.is_none() {
            warn!(location = %self.location, "Refresh brought no new forecast");
        }

        self.requery();
    }

    /// Show stored rows without going to the network.
    pub fn requery(&mut self) {
        let today = Utc::now().date_naive();
        self.state = match self.store.query_forecast(&self.location, today) {
            Ok(rows) => ScreenState::Loaded(rows),
            Err(err) => ScreenState::Error(err.to_string()),
        };
    }

    /// Switch to another location; the next rows are scoped to it alone.
    pub async fn set_location(&mut self, location: &str) {
        let location = location.trim();
        if location == self.location && !self.state.is_uninitialized() {
            return;
        }

        debug!(from = %self.location, to = location, "Location changed");
        self.location = location.to_string();
        self.refresh().await;
    }

    /// Re-query when a change touches the current location. Returns whether
    /// the screen was updated.
    pub fn handle_change(&mut self, change: &StoreChange) -> bool {
        if self.state.is_uninitialized() || !change.uri.affects_location(&self.location) {
            return false;
        }

        self.requery();
        true
    }

    /// Navigation target for the row at `index`.
    pub fn select(&self, index: usize) -> Option<ForecastUri> {
        self.rows()
            .get(index)
            .map(|row| ForecastUri::for_location_and_date(self.location.clone(), row.day.date))
    }
}
