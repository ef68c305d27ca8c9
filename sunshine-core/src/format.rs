//! Human-readable rendering of forecast values.

use chrono::NaiveDate;

use crate::config::Units;

/// Appended to every shared forecast.
pub const SHARE_HASHTAG: &str = "#SunshineApp";

/// "Today, October 6", "Tomorrow", a weekday name within the coming week,
/// and "Fri Oct 13" beyond that.
pub fn friendly_day(date: NaiveDate, today: NaiveDate) -> String {
    let offset = (date - today).num_days();

    if offset == 0 {
        format!("Today, {}", date.format("%B %-d"))
    } else if offset == 1 {
        "Tomorrow".to_string()
    } else if (2..7).contains(&offset) {
        date.format("%A").to_string()
    } else {
        date.format("%a %b %-d").to_string()
    }
}

/// Temperatures are stored in Celsius.
pub fn temperature(celsius: f64, units: Units) -> String {
    let value = match units {
        Units::Metric => celsius,
        Units::Imperial => celsius * 9.0 / 5.0 + 32.0,
    };
    format!("{value:.0}°")
}

/// Wind speeds are stored in metres per second.
pub fn wind(speed_mps: f64, degrees: f64, units: Units) -> String {
    let direction = compass_direction(degrees);
    match units {
        Units::Metric => format!("Wind: {:.0} km/h {direction}", speed_mps * 3.6),
        Units::Imperial => format!("Wind: {:.0} mph {direction}", speed_mps * 2.236_936),
    }
}

pub fn pressure(hpa: f64) -> String {
    format!("Pressure: {hpa:.0} hPa")
}

pub fn humidity(percent: f64) -> String {
    format!("Humidity: {percent:.0} %")
}

/// 8-point compass direction the wind blows from.
pub fn compass_direction(degrees: f64) -> &'static str {
    const DIRECTIONS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];
    let normalized = degrees.rem_euclid(360.0);
    let sector = ((normalized + 22.5) / 45.0) as usize % 8;
    DIRECTIONS[sector]
}

/// `"<day> - <description> - <high>/<low> #SunshineApp"`
pub fn share_text(day: &str, description: &str, high: &str, low: &str) -> String {
    format!("{day} - {description} - {high}/{low} {SHARE_HASHTAG}")
}

/// Artwork group for an OpenWeatherMap condition id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherArt {
    Clear,
    LightClouds,
    Clouds,
    Fog,
    LightRain,
    Rain,
    Snow,
    Storm,
}

impl WeatherArt {
    /// See https://openweathermap.org/weather-conditions
    pub fn from_condition_id(id: i32) -> Option<Self> {
        match id {
            200..=232 => Some(Self::Storm),
            300..=321 => Some(Self::LightRain),
            500..=504 => Some(Self::Rain),
            511 => Some(Self::Snow),
            520..=531 => Some(Self::Rain),
            600..=622 => Some(Self::Snow),
            761 | 781 => Some(Self::Storm),
            701..=771 => Some(Self::Fog),
            800 => Some(Self::Clear),
            801 => Some(Self::LightClouds),
            802..=804 => Some(Self::Clouds),
            _ => None,
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Clear => "☀",
            Self::LightClouds => "🌤",
            Self::Clouds => "☁",
            Self::Fog => "🌫",
            Self::LightRain => "🌦",
            Self::Rain => "🌧",
            Self::Snow => "❄",
            Self::Storm => "⛈",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn friendly_day_names() {
        // 2017-10-06 was a Friday
        let today = day(2017, 10, 6);

        assert_eq!(friendly_day(today, today), "Today, October 6");
        assert_eq!(friendly_day(day(2017, 10, 7), today), "Tomorrow");
        assert_eq!(friendly_day(day(2017, 10, 9), today), "Monday");
        assert_eq!(friendly_day(day(2017, 10, 12), today), "Thursday");
        assert_eq!(friendly_day(day(2017, 10, 13), today), "Fri Oct 13");
        assert_eq!(friendly_day(day(2017, 10, 5), today), "Thu Oct 5");
    }

    #[test]
    fn temperature_converts_for_imperial() {
        assert_eq!(temperature(21.4, Units::Metric), "21°");
        assert_eq!(temperature(100.0, Units::Imperial), "212°");
        assert_eq!(temperature(-40.0, Units::Imperial), "-40°");
    }

    #[test]
    fn compass_sectors() {
        assert_eq!(compass_direction(0.0), "N");
        assert_eq!(compass_direction(350.0), "N");
        assert_eq!(compass_direction(45.0), "NE");
        assert_eq!(compass_direction(200.0), "S");
        assert_eq!(compass_direction(250.0), "W");
        assert_eq!(compass_direction(-90.0), "W");
    }

    #[test]
    fn wind_in_both_units() {
        assert_eq!(wind(10.0, 225.0, Units::Metric), "Wind: 36 km/h SW");
        assert_eq!(wind(10.0, 90.0, Units::Imperial), "Wind: 22 mph E");
    }

    #[test]
    fn share_text_keeps_field_order() {
        assert_eq!(
            share_text("Tomorrow", "Clear", "21°", "12°"),
            "Tomorrow - Clear - 21°/12° #SunshineApp"
        );
    }

    #[test]
    fn condition_ids_map_to_art() {
        assert_eq!(WeatherArt::from_condition_id(211), Some(WeatherArt::Storm));
        assert_eq!(WeatherArt::from_condition_id(511), Some(WeatherArt::Snow));
        assert_eq!(WeatherArt::from_condition_id(741), Some(WeatherArt::Fog));
        assert_eq!(WeatherArt::from_condition_id(781), Some(WeatherArt::Storm));
        assert_eq!(WeatherArt::from_condition_id(800), Some(WeatherArt::Clear));
        assert_eq!(WeatherArt::from_condition_id(803), Some(WeatherArt::Clouds));
        assert_eq!(WeatherArt::from_condition_id(42), None);
    }
}
