use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// A place the user asked forecasts for, keyed by its location setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub location_setting: String,
    pub city_name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// One day of forecast for a single location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherDay {
    pub date: NaiveDate,
    pub short_description: String,
    pub max_temp: f64,
    pub min_temp: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub wind_direction_degrees: f64,
    pub pressure: f64,
    pub weather_condition_id: i32,
}

/// City metadata reported alongside a forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Parsed result of one forecast request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub city: City,
    pub days: Vec<WeatherDay>,
}

/// A stored weather row joined with its location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub id: i64,
    pub location_setting: String,
    pub city_name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(flatten)]
    pub day: WeatherDay,
}

/// Unix seconds of UTC midnight for `date`; the stored form of a forecast day.
pub fn day_to_timestamp(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

/// Inverse of [`day_to_timestamp`]; any time within the day maps to that day.
pub fn timestamp_to_day(ts: i64) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp(ts, 0).map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midday_timestamp_maps_to_its_day() {
        let date = NaiveDate::from_ymd_opt(2017, 10, 6).unwrap();
        let midnight = day_to_timestamp(date);

        assert_eq!(timestamp_to_day(midnight), Some(date));
        assert_eq!(timestamp_to_day(midnight + 12 * 3600), Some(date));
        assert_eq!(
            timestamp_to_day(midnight - 1),
            NaiveDate::from_ymd_opt(2017, 10, 5)
        );
    }
}
