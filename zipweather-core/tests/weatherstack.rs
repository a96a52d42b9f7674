//! Tests for the weatherstack client against a mock HTTP server.

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zipweather_core::{
    Units, WeatherError, WeatherProvider, ZipCode, provider::weatherstack::WeatherstackProvider,
};

fn provider(server: &MockServer) -> WeatherstackProvider {
    WeatherstackProvider::new("TEST_KEY".to_string())
        .with_base_url(format!("{}/current", server.uri()))
}

fn zip(s: &str) -> ZipCode {
    ZipCode::parse(s).unwrap()
}

fn current(temperature: f64) -> serde_json::Value {
    serde_json::json!({
        "success": true,
        "location": {"name": "College Park", "region": "Maryland", "localtime": "2024-05-01 09:00"},
        "current": {
            "temperature": temperature,
            "wind_speed": 7,
            "weather_descriptions": ["Sunny"],
            "feelslike": 74,
            "weather_icons": ["https://example.com/sunny.png"]
        }
    })
}

#[tokio::test]
async fn sends_key_zip_and_units() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/current"))
        .and(query_param("access_key", "TEST_KEY"))
        .and(query_param("query", "20742"))
        .and(query_param("units", "f"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current(72.0)))
        .expect(1)
        .mount(&server)
        .await;

    let record = provider(&server).fetch_weather(&zip("20742")).await.unwrap();

    assert_eq!(record.temperature, 72.0);
    assert_eq!(record.city, "College Park");
    assert_eq!(record.state, "Maryland");
    assert_eq!(record.description, "Sunny");
    assert_eq!(record.icon_url, "https://example.com/sunny.png");
}

#[tokio::test]
async fn configured_units_are_sent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("units", "m"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current(22.0)))
        .expect(1)
        .mount(&server)
        .await;

    let record = provider(&server)
        .with_units(Units::Metric)
        .fetch_weather(&zip("20742"))
        .await
        .unwrap();
    assert_eq!(record.units, Units::Metric);
}

#[tokio::test]
async fn invalid_request_is_a_provider_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": false,
            "error": {
                "code": 601,
                "type": "invalid_request",
                "info": "Please specify a valid location identifier."
            }
        })))
        .mount(&server)
        .await;

    let err = provider(&server).fetch_weather(&zip("00000")).await.unwrap_err();
    assert!(matches!(err, WeatherError::Provider { ref kind, .. } if kind == "invalid_request"));
}

#[tokio::test]
async fn quota_exhaustion_is_rate_limited() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": false,
            "error": {
                "code": 104,
                "type": "usage_limit_reached",
                "info": "Your monthly usage limit has been reached."
            }
        })))
        .mount(&server)
        .await;

    let err = provider(&server).fetch_weather(&zip("20742")).await.unwrap_err();
    assert!(err.is_rate_limited());
}

#[tokio::test]
async fn non_200_status_is_invalid_zip() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let err = provider(&server).fetch_weather(&zip("20742")).await.unwrap_err();
    match err {
        WeatherError::InvalidZip { status } => assert_eq!(status.as_u16(), 404),
        other => panic!("expected InvalidZip, got {other:?}"),
    }
}

#[tokio::test]
async fn status_wins_over_error_payload() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "error": {"type": "rate_limit_reached", "info": "slow down"}
        })))
        .mount(&server)
        .await;

    let err = provider(&server).fetch_weather(&zip("20742")).await.unwrap_err();
    assert!(matches!(err, WeatherError::InvalidZip { .. }));
}

#[tokio::test]
async fn unreachable_provider_is_classified() {
    // Bind and release a port so nothing is listening on it.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}/current", listener.local_addr().unwrap());
    drop(listener);

    let err = WeatherstackProvider::new("TEST_KEY".to_string())
        .with_base_url(base)
        .fetch_weather(&zip("20742"))
        .await
        .unwrap_err();
    assert!(matches!(err, WeatherError::Unreachable(_)));
}

#[tokio::test]
async fn unreachable_error_does_not_expose_the_api_key() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}/current", listener.local_addr().unwrap());
    drop(listener);

    let err = WeatherstackProvider::new("TEST_KEY".to_string())
        .with_base_url(base)
        .fetch_weather(&zip("20742"))
        .await
        .unwrap_err();

    assert!(!err.to_string().contains("TEST_KEY"), "{err}");
    assert!(!format!("{err:?}").contains("TEST_KEY"), "{err:?}");
    let source = std::error::Error::source(&err).expect("reqwest error attached");
    assert!(!source.to_string().contains("access_key"), "{source}");
}
