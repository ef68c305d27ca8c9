//! Content URIs naming slices of the forecast store.
//!
//! A URI scopes a query or a change notification:
//!
//! ```text
//! content://sunshine/weather                          all weather rows
//! content://sunshine/weather/<location>               rows for a location
//! content://sunshine/weather/<location>?date=<day>    rows from a start day
//! content://sunshine/weather/<location>/<day>         one day for a location
//! content://sunshine/location                         the location table
//! ```
//!
//! [`map_uri`] builds the `geo:` link used to show a location on a map.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use url::Url;

pub const CONTENT_SCHEME: &str = "content";
pub const CONTENT_AUTHORITY: &str = "sunshine";
pub const PATH_WEATHER: &str = "weather";
pub const PATH_LOCATION: &str = "location";

pub const MAP_SCHEME: &str = "geo";

const DATE_PARAM: &str = "date";
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ForecastUri {
    Weather,
    WeatherForLocation {
        location: String,
        start_date: Option<NaiveDate>,
    },
    WeatherForLocationAndDate {
        location: String,
        date: NaiveDate,
    },
    Location,
}

#[derive(Debug, thiserror::Error)]
pub enum UriError {
    #[error("Malformed URI '{uri}': {source}")]
    Malformed {
        uri: String,
        source: url::ParseError,
    },

    #[error("Unrecognised URI '{0}'")]
    Unrecognised(String),

    #[error("Invalid date '{value}' in URI '{uri}'")]
    InvalidDate { uri: String, value: String },
}

impl ForecastUri {
    pub fn for_location(location: impl Into<String>) -> Self {
        Self::WeatherForLocation {
            location: location.into(),
            start_date: None,
        }
    }

    pub fn for_location_from(location: impl Into<String>, start_date: NaiveDate) -> Self {
        Self::WeatherForLocation {
            location: location.into(),
            start_date: Some(start_date),
        }
    }

    pub fn for_location_and_date(location: impl Into<String>, date: NaiveDate) -> Self {
        Self::WeatherForLocationAndDate {
            location: location.into(),
            date,
        }
    }

    pub fn location_setting(&self) -> Option<&str> {
        match self {
            Self::WeatherForLocation { location, .. }
            | Self::WeatherForLocationAndDate { location, .. } => Some(location),
            Self::Weather | Self::Location => None,
        }
    }

    /// The single day this URI names, if it names one.
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::WeatherForLocationAndDate { date, .. } => Some(*date),
            _ => None,
        }
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        match self {
            Self::WeatherForLocation { start_date, .. } => *start_date,
            _ => None,
        }
    }

    /// Same resource for another location; dates are kept.
    pub fn with_location(&self, location: impl Into<String>) -> Self {
        match self {
            Self::WeatherForLocation { start_date, .. } => Self::WeatherForLocation {
                location: location.into(),
                start_date: *start_date,
            },
            Self::WeatherForLocationAndDate { date, .. } => Self::WeatherForLocationAndDate {
                location: location.into(),
                date: *date,
            },
            other => other.clone(),
        }
    }

    /// Whether a change to this URI can alter what is shown for `location`.
    pub fn affects_location(&self, location: &str) -> bool {
        match self.location_setting() {
            Some(own) => own == location,
            None => true,
        }
    }
}

impl fmt::Display for ForecastUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CONTENT_SCHEME}://{CONTENT_AUTHORITY}/")?;

        match self {
            Self::Weather => f.write_str(PATH_WEATHER),
            Self::Location => f.write_str(PATH_LOCATION),
            Self::WeatherForLocation {
                location,
                start_date,
            } => {
                write!(f, "{PATH_WEATHER}/{}", urlencoding::encode(location))?;
                if let Some(start) = start_date {
                    write!(f, "?{DATE_PARAM}={}", start.format(DATE_FORMAT))?;
                }
                Ok(())
            }
            Self::WeatherForLocationAndDate { location, date } => write!(
                f,
                "{PATH_WEATHER}/{}/{}",
                urlencoding::encode(location),
                date.format(DATE_FORMAT)
            ),
        }
    }
}

impl FromStr for ForecastUri {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(s).map_err(|source| UriError::Malformed {
            uri: s.to_string(),
            source,
        })?;

        if url.scheme() != CONTENT_SCHEME || url.host_str() != Some(CONTENT_AUTHORITY) {
            return Err(UriError::Unrecognised(s.to_string()));
        }

        let segments = url
            .path_segments()
            .into_iter()
            .flatten()
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                urlencoding::decode(segment)
                    .map(|decoded| decoded.into_owned())
                    .map_err(|_| UriError::Unrecognised(s.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        match segments.as_slice() {
            [table] if table == PATH_WEATHER => Ok(Self::Weather),
            [table] if table == PATH_LOCATION => Ok(Self::Location),
            [table, location] if table == PATH_WEATHER => {
                let start_date = url
                    .query_pairs()
                    .find(|(key, _)| key == DATE_PARAM)
                    .map(|(_, value)| parse_date(s, &value))
                    .transpose()?;

                Ok(Self::WeatherForLocation {
                    location: location.clone(),
                    start_date,
                })
            }
            [table, location, date] if table == PATH_WEATHER => {
                Ok(Self::WeatherForLocationAndDate {
                    location: location.clone(),
                    date: parse_date(s, date)?,
                })
            }
            _ => Err(UriError::Unrecognised(s.to_string())),
        }
    }
}

/// `geo:0,0?q=<location>`, asking a map viewer to search for `location`.
/// Blank locations have no map.
pub fn map_uri(location: &str) -> Option<Url> {
    let location = location.trim();
    if location.is_empty() {
        return None;
    }

    Url::parse(&format!("{MAP_SCHEME}:0,0?q={}", urlencoding::encode(location))).ok()
}

fn parse_date(uri: &str, value: &str) -> Result<NaiveDate, UriError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| UriError::InvalidDate {
        uri: uri.to_string(),
        value: value.to_string(),
    })
}
