use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::{api, config::Config, state::AppState};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Nothing listens on the discard port, so every upstream call is refused.
const UNREACHABLE: &str = "http://127.0.0.1:9";

fn setup_app() -> axum::Router {
    let mut config = Config::from_env();
    config.maps_base_url = UNREACHABLE.to_string();
    config.weather_base_url = UNREACHABLE.to_string();
    config.stations_base_url = UNREACHABLE.to_string();
    config.retries = 0;
    config.http_timeout_s = 2;
    let state = Arc::new(AppState::new(config).expect("state"));
    api::app(state)
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse json")
}

fn point_at_km(km: f64) -> Value {
    json!({"lat": 0.0, "lon": (km * 1000.0 / EARTH_RADIUS_M).to_degrees()})
}

fn full_vehicle() -> Value {
    json!({"battery_percent": 100.0, "battery_capacity_kwh": 75.0, "nominal_range_km": 500.0})
}

fn plan_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/trips/plan")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn long_route() -> Value {
    Value::Array(
        [0.0, 100.0, 200.0, 300.0, 401.0, 500.0, 600.0]
            .iter()
            .map(|km| point_at_km(*km))
            .collect(),
    )
}

#[tokio::test]
async fn health_returns_ok_with_request_id() {
    let app = setup_app();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn caller_request_id_is_echoed() {
    let app = setup_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "trip-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "trip-42");
}

#[tokio::test]
async fn plans_single_stop_with_inline_stations_and_weather() {
    let app = setup_app();
    let body = json!({
        "geometry": long_route(),
        "vehicle": full_vehicle(),
        "stations": [{
            "id": "station-400",
            "location": point_at_km(400.0),
            "available": true,
            "power_kw": 150.0
        }],
        "weather": [],
        "departure_at": "2026-06-01T08:00:00Z"
    });

    let response = app.oneshot(plan_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let plan = read_json(response).await;

    let stops = plan["stops"].as_array().unwrap();
    assert_eq!(stops.len(), 1);
    assert_eq!(stops[0]["station_id"], "station-400");
    assert_eq!(stops[0]["arrival_order_index"], 3);
    assert_eq!(stops[0]["departure_battery_percent"], 80.0);
    assert_eq!(plan["segments"].as_array().unwrap().len(), 6);
    assert_eq!(plan["departure_at"], "2026-06-01T08:00:00Z");
    assert!(plan["arrival_at"].is_string());
}

#[tokio::test]
async fn stalled_plan_returns_partial_plan() {
    let app = setup_app();
    let body = json!({
        "geometry": long_route(),
        "vehicle": full_vehicle(),
        "stations": [{
            "id": "station-400",
            "location": point_at_km(400.0),
            "available": false,
            "power_kw": 150.0
        }],
        "weather": []
    });

    let response = app.oneshot(plan_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let error = read_json(response).await;
    assert_eq!(error["error"], "insufficient_charging_infrastructure");
    assert_eq!(error["partial_plan"]["segments"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn oversized_segment_is_unprocessable() {
    let app = setup_app();
    let body = json!({
        "geometry": [point_at_km(0.0), point_at_km(600.0)],
        "vehicle": full_vehicle(),
        "stations": [],
        "weather": []
    });

    let response = app.oneshot(plan_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let error = read_json(response).await;
    assert_eq!(error["error"], "segment_unreachable");
    assert!(error.get("partial_plan").is_none());
}

#[tokio::test]
async fn single_point_route_is_rejected() {
    let app = setup_app();
    let body = json!({"geometry": [point_at_km(0.0)], "vehicle": full_vehicle()});

    let response = app.oneshot(plan_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["error"], "empty_route");
}

#[tokio::test]
async fn invalid_vehicle_is_rejected_before_any_lookup() {
    let app = setup_app();
    let body = json!({
        "origin_address": "Lyon",
        "destination_address": "Paris",
        "vehicle": {"battery_percent": 140.0, "battery_capacity_kwh": 75.0, "nominal_range_km": 500.0}
    });

    let response = app.oneshot(plan_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["error"], "invalid_vehicle");
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let app = setup_app();
    let request = Request::builder()
        .method("POST")
        .uri("/v1/trips/plan")
        .header("content-type", "application/json")
        .body(Body::from("{\"geometry\": "))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["error"], "bad_request");
}

#[tokio::test]
async fn unreachable_station_directory_is_bad_gateway() {
    let app = setup_app();
    let body = json!({
        "geometry": [point_at_km(0.0), point_at_km(50.0)],
        "vehicle": full_vehicle()
    });

    let response = app.oneshot(plan_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let error = read_json(response).await;
    assert_eq!(error["error"], "upstream_unavailable");
    assert!(error["message"].as_str().unwrap().contains("stations"));
}
