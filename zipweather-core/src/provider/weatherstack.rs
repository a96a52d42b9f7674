use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::{
    config::{DEFAULT_BASE_URL, ProviderConfig},
    model::{Units, WeatherRecord},
    provider::WeatherError,
    zip::ZipCode,
};

use super::WeatherProvider;

/// Error types weatherstack uses when the account has run out of calls.
const QUOTA_ERROR_TYPES: &[&str] = &["rate_limit_reached", "usage_limit_reached"];

const LOCALTIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Client for the weatherstack `current` endpoint.
#[derive(Debug, Clone)]
pub struct WeatherstackProvider {
    api_key: String,
    base_url: String,
    units: Units,
    http: Client,
}

impl WeatherstackProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            units: Units::default(),
            http: Client::new(),
        }
    }

    pub fn from_config(api_key: String, config: &ProviderConfig) -> anyhow::Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .context("Failed to build HTTP client for weatherstack")?;

        Ok(Self {
            api_key,
            base_url: config.base_url.clone(),
            units: config.units,
            http,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_units(mut self, units: Units) -> Self {
        self.units = units;
        self
    }

    async fn fetch_current(&self, zip: &ZipCode) -> Result<WeatherRecord, WeatherError> {
        tracing::debug!(%zip, units = %self.units, "requesting current weather from weatherstack");

        let res = self
            .http
            .get(&self.base_url)
            .query(&[
                ("access_key", self.api_key.as_str()),
                ("query", zip.as_str()),
                ("units", self.units.as_query()),
            ])
            .send()
            .await
            .map_err(unreachable)?;

        let status = res.status();
        let body = res.text().await.map_err(unreachable)?;

        if status != StatusCode::OK {
            tracing::warn!(
                %zip,
                %status,
                body = %truncate_body(&body),
                "weatherstack request failed"
            );
            return Err(WeatherError::InvalidZip { status });
        }

        let record = parse_current(zip, self.units, &body)?;
        tracing::debug!(
            %zip,
            city = %record.city,
            temperature = record.temperature,
            "weatherstack request successful"
        );
        Ok(record)
    }
}

#[derive(Debug, Deserialize)]
struct WsError {
    code: Option<u16>,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    info: String,
}

#[derive(Debug, Deserialize)]
struct WsCurrent {
    temperature: f64,
    wind_speed: f64,
    #[serde(default)]
    weather_descriptions: Vec<String>,
    feelslike: f64,
    #[serde(default)]
    weather_icons: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WsLocation {
    name: String,
    region: String,
    localtime: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WsCurrentResponse {
    current: WsCurrent,
    location: WsLocation,
}

/// Turn a 200 response body into a record, or the error the payload reports.
fn parse_current(zip: &ZipCode, units: Units, body: &str) -> Result<WeatherRecord, WeatherError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| WeatherError::MalformedPayload(format!("invalid JSON: {e}")))?;

    if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
        return Err(classify_provider_error(zip, error));
    }

    let parsed: WsCurrentResponse = serde_json::from_value(value)
        .map_err(|e| WeatherError::MalformedPayload(e.to_string()))?;

    let local_time = parsed
        .location
        .localtime
        .as_deref()
        .and_then(|s| NaiveDateTime::parse_from_str(s, LOCALTIME_FORMAT).ok());

    Ok(WeatherRecord {
        zip: zip.clone(),
        city: parsed.location.name,
        state: parsed.location.region,
        temperature: parsed.current.temperature,
        wind_speed: parsed.current.wind_speed,
        feels_like: parsed.current.feelslike,
        description: parsed.current.weather_descriptions.join(", "),
        icon_url: parsed.current.weather_icons.into_iter().next().unwrap_or_default(),
        local_time,
        units,
    })
}

fn classify_provider_error(zip: &ZipCode, error: &serde_json::Value) -> WeatherError {
    let error: WsError = match serde_json::from_value(error.clone()) {
        Ok(e) => e,
        Err(_) => WsError {
            code: None,
            kind: "unknown".to_string(),
            info: error.to_string(),
        },
    };

    if QUOTA_ERROR_TYPES.contains(&error.kind.as_str()) {
        tracing::warn!(
            %zip,
            kind = %error.kind,
            info = %error.info,
            "weatherstack API limit reached"
        );
        return WeatherError::RateLimited { info: error.info };
    }

    tracing::warn!(
        %zip,
        code = ?error.code,
        kind = %error.kind,
        info = %error.info,
        "weatherstack reported an error"
    );
    WeatherError::Provider {
        code: error.code,
        kind: error.kind,
        info: error.info,
    }
}

#[async_trait]
impl WeatherProvider for WeatherstackProvider {
    async fn fetch_weather(&self, zip: &ZipCode) -> Result<WeatherRecord, WeatherError> {
        self.fetch_current(zip).await
    }
}

/// The request URL carries the API key, so it is stripped before the error
/// can reach a log line or an error page.
fn unreachable(err: reqwest::Error) -> WeatherError {
    WeatherError::Unreachable(err.without_url())
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zip(s: &str) -> ZipCode {
        ZipCode::parse(s).expect("valid zip")
    }

    const COLLEGE_PARK: &str = r#"{
        "request": {"type": "Zipcode", "query": "20742", "unit": "f"},
        "location": {"name": "College Park", "region": "Maryland", "localtime": "2024-05-01 14:30"},
        "current": {
            "temperature": 72,
            "wind_speed": 8,
            "weather_descriptions": ["Partly cloudy", "Mist"],
            "feelslike": 70,
            "weather_icons": ["https://cdn.worldweatheronline.com/images/wsymbols01_png_64/wsymbol_0002.png"]
        }
    }"#;

    #[test]
    fn parses_current_conditions() {
        let record = parse_current(&zip("20742"), Units::Fahrenheit, COLLEGE_PARK).unwrap();

        assert_eq!(record.zip.as_str(), "20742");
        assert_eq!(record.city, "College Park");
        assert_eq!(record.state, "Maryland");
        assert_eq!(record.temperature, 72.0);
        assert_eq!(record.wind_speed, 8.0);
        assert_eq!(record.feels_like, 70.0);
        assert_eq!(record.description, "Partly cloudy, Mist");
        assert!(record.icon_url.ends_with("wsymbol_0002.png"));
        assert_eq!(
            record.local_time.map(|t| t.format("%H:%M").to_string()).as_deref(),
            Some("14:30")
        );
    }

    #[test]
    fn no_descriptions_or_icons_gives_empty_strings() {
        let body = r#"{
            "location": {"name": "Nowhere", "region": "NA"},
            "current": {"temperature": 1, "wind_speed": 0, "feelslike": 1}
        }"#;
        let record = parse_current(&zip("99999"), Units::Metric, body).unwrap();
        assert_eq!(record.description, "");
        assert_eq!(record.icon_url, "");
        assert_eq!(record.local_time, None);
        assert_eq!(record.units, Units::Metric);
    }

    #[test]
    fn error_payload_is_a_provider_error() {
        let body = r#"{"success": false, "error": {"code": 601, "type": "invalid_request", "info": "Invalid query"}}"#;
        let err = parse_current(&zip("00000"), Units::Fahrenheit, body).unwrap_err();
        match err {
            WeatherError::Provider { code, kind, info } => {
                assert_eq!(code, Some(601));
                assert_eq!(kind, "invalid_request");
                assert_eq!(info, "Invalid query");
            }
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[test]
    fn quota_errors_are_rate_limited() {
        for kind in QUOTA_ERROR_TYPES {
            let body = format!(
                r#"{{"success": false, "error": {{"code": 104, "type": "{kind}", "info": "limit"}}}}"#
            );
            let err = parse_current(&zip("20742"), Units::Fahrenheit, &body).unwrap_err();
            assert!(err.is_rate_limited(), "{kind} should be rate limited");
        }
    }

    #[test]
    fn error_wins_over_present_data() {
        let body = r#"{
            "error": {"type": "invalid_access_key", "info": "bad key"},
            "location": {"name": "x", "region": "y"},
            "current": {"temperature": 1, "wind_speed": 0, "feelslike": 1}
        }"#;
        let err = parse_current(&zip("20742"), Units::Fahrenheit, body).unwrap_err();
        assert!(matches!(err, WeatherError::Provider { .. }));
    }

    #[test]
    fn unexpected_error_shape_is_still_a_provider_error() {
        let body = r#"{"error": "boom"}"#;
        let err = parse_current(&zip("20742"), Units::Fahrenheit, body).unwrap_err();
        assert!(matches!(err, WeatherError::Provider { ref kind, .. } if kind == "unknown"));
    }

    #[test]
    fn missing_sections_are_malformed() {
        let err =
            parse_current(&zip("20742"), Units::Fahrenheit, r#"{"success": true}"#).unwrap_err();
        assert!(matches!(err, WeatherError::MalformedPayload(_)));

        let err = parse_current(&zip("20742"), Units::Fahrenheit, "<html>").unwrap_err();
        assert!(matches!(err, WeatherError::MalformedPayload(_)));
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let long = "é".repeat(300);
        let truncated = truncate_body(&long);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), 203);
        assert_eq!(truncate_body("short"), "short");
    }
}
