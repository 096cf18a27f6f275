//! Integration tests for `GoogleMapsProvider` against a local mock server.

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use roomscout::error::AppError;
use roomscout::geo::{GeoProvider, GoogleMapsProvider};
use roomscout::models::{Coordinate, TravelMode};

fn provider(server: &MockServer) -> GoogleMapsProvider {
    GoogleMapsProvider::with_base_url(reqwest::Client::new(), "test-key", &server.uri())
        .expect("failed to build provider")
}

#[tokio::test]
async fn geocode_returns_first_result_location() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/geocode/json"))
        .and(query_param("address", "McGill University"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "results": [{
                "formatted_address": "845 Sherbrooke St W, Montreal, QC H3A 0G4, Canada",
                "geometry": { "location": { "lat": 45.5048, "lng": -73.5772 } },
                "address_components": []
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let found = provider(&server).geocode("McGill University").await.unwrap();
    assert_eq!(found, Some(Coordinate::new(45.5048, -73.5772)));
}

#[tokio::test]
async fn geocode_zero_results_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/geocode/json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "status": "ZERO_RESULTS", "results": [] })),
        )
        .mount(&server)
        .await;

    assert!(provider(&server).geocode("Atlantis").await.unwrap().is_none());
}

#[tokio::test]
async fn geocode_denied_is_lookup_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/geocode/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid.",
            "results": []
        })))
        .mount(&server)
        .await;

    let err = provider(&server).geocode("McGill University").await.unwrap_err();
    assert!(matches!(err, AppError::ExternalLookup { .. }), "got {err:?}");
}

#[tokio::test]
async fn server_error_is_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/geocode/json"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = provider(&server).geocode("McGill University").await.unwrap_err();
    assert!(matches!(err, AppError::Http(_)), "got {err:?}");
}

#[tokio::test]
async fn reverse_geocode_returns_components() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/geocode/json"))
        .and(query_param("latlng", "45.5231,-73.5817"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "results": [{
                "formatted_address": "4521 Rue Saint-Denis, Montréal, QC H2J 2L4, Canada",
                "address_components": [
                    { "long_name": "4521", "short_name": "4521", "types": ["street_number"] },
                    { "long_name": "Rue Saint-Denis", "short_name": "Rue Saint-Denis", "types": ["route"] },
                    { "long_name": "Le Plateau-Mont-Royal", "short_name": "Le Plateau-Mont-Royal", "types": ["neighborhood", "political"] }
                ]
            }]
        })))
        .mount(&server)
        .await;

    let found = provider(&server)
        .reverse_geocode(Coordinate::new(45.5231, -73.5817))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        found.display_address().as_deref(),
        Some("4521 Rue Saint-Denis, Le Plateau-Mont-Royal")
    );
    assert!(found.formatted_address.starts_with("4521 Rue Saint-Denis"));
}

#[tokio::test]
async fn travel_duration_reads_first_element() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/distancematrix/json"))
        .and(query_param("mode", "bicycling"))
        .and(query_param("units", "metric"))
        .and(query_param("origins", "45.52,-73.58"))
        .and(query_param("destinations", "Concordia University"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "rows": [{
                "elements": [{
                    "status": "OK",
                    "duration": { "text": "18 mins", "value": 1080 },
                    "distance": { "text": "4.2 km", "value": 4200 }
                }]
            }]
        })))
        .mount(&server)
        .await;

    let text = provider(&server)
        .travel_duration("45.52,-73.58", "Concordia University", TravelMode::Bicycling)
        .await
        .unwrap();
    assert_eq!(text.as_deref(), Some("18 mins"));
}

#[tokio::test]
async fn travel_duration_without_route_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/distancematrix/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "rows": [{ "elements": [{ "status": "ZERO_RESULTS" }] }]
        })))
        .mount(&server)
        .await;

    let text = provider(&server)
        .travel_duration("45.52,-73.58", "Paris, France", TravelMode::Driving)
        .await
        .unwrap();
    assert!(text.is_none());
}
