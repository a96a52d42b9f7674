use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::zip::ZipCode;

/// Unit system requested from the weather provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Units {
    #[default]
    #[serde(rename = "f")]
    Fahrenheit,
    #[serde(rename = "m")]
    Metric,
    #[serde(rename = "s")]
    Scientific,
}

impl Units {
    /// Value of the provider's `units` query parameter.
    pub fn as_query(&self) -> &'static str {
        match self {
            Units::Fahrenheit => "f",
            Units::Metric => "m",
            Units::Scientific => "s",
        }
    }

    pub fn temperature_symbol(&self) -> &'static str {
        match self {
            Units::Fahrenheit => "°F",
            Units::Metric => "°C",
            Units::Scientific => "K",
        }
    }

    pub fn speed_symbol(&self) -> &'static str {
        match self {
            Units::Fahrenheit => "mph",
            Units::Metric => "km/h",
            Units::Scientific => "km/h",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query())
    }
}

/// Current conditions for one ZIP code, normalized from a provider response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub zip: ZipCode,
    pub city: String,
    pub state: String,
    pub temperature: f64,
    pub wind_speed: f64,
    pub feels_like: f64,
    /// All provider phrases joined with ", ".
    pub description: String,
    pub icon_url: String,
    pub local_time: Option<NaiveDateTime>,
    pub units: Units,
}

/// One stored document: the ZIP codes a username tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub username: String,
    #[serde(default)]
    pub zips: Vec<ZipCode>,
}

/// A row of the rendered watchlist table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatchlistRow {
    pub zip: ZipCode,
    pub conditions: RowConditions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowConditions {
    Current {
        city: String,
        state: String,
        temperature: f64,
        description: String,
    },
    /// The lookup for this ZIP failed; the rest of the table is unaffected.
    Unavailable { reason: String },
}

impl WatchlistRow {
    pub fn from_record(record: &WeatherRecord) -> Self {
        Self {
            zip: record.zip.clone(),
            conditions: RowConditions::Current {
                city: record.city.clone(),
                state: record.state.clone(),
                temperature: record.temperature,
                description: record.description.clone(),
            },
        }
    }

    pub fn unavailable(zip: ZipCode, reason: impl Into<String>) -> Self {
        Self {
            zip,
            conditions: RowConditions::Unavailable {
                reason: reason.into(),
            },
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.conditions, RowConditions::Current { .. })
    }
}
