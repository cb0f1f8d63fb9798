#![cfg(feature = "http_api")]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
};
use chrono::NaiveDate;
use procurement_tracker::{
    FixedClock, Market, MarketStatus, MarketType, Register, Task, TaskStatus, http_api,
};
use serde_json::{Value, json};
use tower::util::ServiceExt;

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn new_router() -> axum::Router {
    let markets = vec![Market::new(
        "M1",
        "Construction de bureaux",
        MarketType::Works,
        "UCP",
    )];
    let register = Register::from_parts(markets, Vec::new()).unwrap();
    let state = http_api::AppState::new(register, Arc::new(FixedClock(d(2024, 3, 8))));
    http_api::router(state)
}

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).unwrap())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn task_lifecycle_drives_market_status() {
    let app = new_router();
    let task = Task::new("M1-T1", "M1", "Terrassement").with_plan(d(2024, 3, 1), d(2024, 3, 10));

    let (status, _) = send(&app, "POST", "/tasks", Some(serde_json::to_value(&task).unwrap())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, "GET", "/markets/M1/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "NOT_STARTED");

    let (status, body) = send(&app, "POST", "/tasks/M1-T1/start", None).await;
    assert_eq!(status, StatusCode::OK);
    let started: Task = serde_json::from_value(body).unwrap();
    assert_eq!(started.status, TaskStatus::InProgress);
    assert_eq!(started.actual_start, Some(d(2024, 3, 8)));

    let (_, body) = send(&app, "GET", "/markets/M1/status", None).await;
    assert_eq!(body["status"], "IN_PROGRESS");
    assert_eq!(body["last_task_id"], "M1-T1");

    let (status, _) = send(&app, "POST", "/tasks/M1-T1/complete", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "POST", "/refresh", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["completed_count"], 1);

    let (_, body) = send(&app, "GET", "/markets/M1", None).await;
    let market: Market = serde_json::from_value(body).unwrap();
    assert_eq!(market.status, MarketStatus::Completed);

    let (status, _) = send(&app, "DELETE", "/tasks/M1-T1", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = send(&app, "GET", "/tasks/M1-T1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn variance_endpoint_uses_clock_or_query_date() {
    let app = new_router();
    let mut task = Task::new("M1-T1", "M1", "Fondations").with_plan(d(2024, 3, 1), d(2024, 3, 10));
    task.actual_start = Some(d(2024, 3, 3));
    send(&app, "POST", "/tasks", Some(serde_json::to_value(&task).unwrap())).await;

    let (status, body) = send(&app, "GET", "/tasks/M1-T1/variance", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["today"], "2024-03-08");
    assert_eq!(body["start_variance_days"], 2);
    assert_eq!(body["end_variance_days"], Value::Null);
    assert_eq!(body["remaining_days"], 2);

    let (_, body) = send(&app, "GET", "/tasks/M1-T1/variance?today=2024-03-12", None).await;
    assert_eq!(body["remaining_days"], -2);

    let (status, body) = send(&app, "GET", "/tasks/M1-T1/variance?today=12-03-2024", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn variance_without_planned_dates_is_unprocessable() {
    let app = new_router();
    let task = json!({ "id": "M1-T1", "market_ref": "M1", "title": "Sans plan" });
    let (status, _) = send(&app, "POST", "/tasks", Some(task)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, "GET", "/tasks/M1-T1/variance", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invalid_task");
}

#[tokio::test]
async fn rejects_tasks_for_unknown_markets_and_duplicates() {
    let app = new_router();
    let orphan = json!({ "id": "X-T1", "market_ref": "X", "title": "Orpheline" });
    let (status, _) = send(&app, "POST", "/tasks", Some(orphan)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let market = json!({
        "market_ref": "M1",
        "title": "Doublon",
        "market_type": "works",
        "coordination": "UCP"
    });
    let (status, body) = send(&app, "POST", "/markets", Some(market)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn stats_count_overdue_tasks() {
    let app = new_router();
    let task = Task::new("M1-T1", "M1", "Charpente")
        .with_plan(d(2024, 2, 1), d(2024, 2, 20))
        .with_status(TaskStatus::InProgress);
    send(&app, "POST", "/tasks", Some(serde_json::to_value(&task).unwrap())).await;

    let (status, body) = send(&app, "GET", "/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["overdue"], 1);
}

#[tokio::test]
async fn market_listing_filters_and_sorts() {
    let app = new_router();
    for (market_ref, coordination) in [("M3", "UCP"), ("M2", "CIR_MANAKARA"), ("M0", "UCP")] {
        let market = json!({
            "market_ref": market_ref,
            "title": format!("Marché {market_ref}"),
            "market_type": "supplies",
            "coordination": coordination,
            "budget_lines": ["6011"]
        });
        let (status, _) = send(&app, "POST", "/markets", Some(market)).await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let task = json!({ "id": "M3-T1", "market_ref": "M3", "title": "Avis", "status": "EN_COURS" });
    send(&app, "POST", "/tasks", Some(task)).await;

    let (status, body) = send(&app, "GET", "/markets?coordination=UCP&sort=market_ref&order=desc", None).await;
    assert_eq!(status, StatusCode::OK);
    let refs: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["market_ref"].as_str().unwrap())
        .collect();
    assert_eq!(refs, vec!["M3", "M1", "M0"]);

    let (_, body) = send(&app, "GET", "/markets?status=IN_PROGRESS", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["market_ref"], "M3");
    assert_eq!(body[0]["status"], "IN_PROGRESS");

    let (status, body) = send(&app, "GET", "/markets?sort=colour", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn market_with_malformed_budget_line_is_rejected() {
    let app = new_router();
    let market = json!({
        "market_ref": "M2",
        "title": "Audit",
        "market_type": "consulting_services",
        "coordination": "UCP",
        "budget_lines": ["6011", "60-11"]
    });
    let (status, body) = send(&app, "POST", "/markets", Some(market)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");

    let (status, _) = send(&app, "GET", "/markets/M2", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
