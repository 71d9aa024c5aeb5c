//! Helpers for driving the router in integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, NaiveDate};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use todo_api::config::PagingConfig;
use todo_api::store::InMemoryTaskStore;
use todo_api::{router, AppState, TaskService};

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub struct TestApp {
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let service = TaskService::with_clock(Arc::new(InMemoryTaskStore::new()), today);
        Self {
            router: router(AppState::new(service, PagingConfig::default())),
        }
    }

    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("failed to build request");

        self.dispatch(request).await
    }

    pub async fn send_raw(&self, method: Method, uri: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("failed to build request");

        self.dispatch(request).await
    }

    pub async fn dispatch(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to read body")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("response body is not JSON")
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Creates a task through the API and returns its id.
    pub async fn create(&self, body: Value) -> i64 {
        let response = self.send(Method::POST, "/api/tasks", Some(body)).await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["id"].as_i64().expect("created task has an id")
    }

    pub async fn complete(&self, id: i64) {
        let response = self
            .send(Method::PATCH, &format!("/api/tasks/{id}/complete"), None)
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    }
}

/// The date the app under test treats as today.
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 3, 15).expect("valid calendar date")
}

pub fn days_from_today(days: i64) -> NaiveDate {
    today() + Duration::days(days)
}

pub fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Field names listed in a validation error body.
pub fn error_fields(body: &Value) -> Vec<String> {
    body["errors"]
        .as_array()
        .expect("body has an errors array")
        .iter()
        .map(|entry| entry["field"].as_str().unwrap_or_default().to_string())
        .collect()
}

pub fn ids(tasks: &Value) -> Vec<i64> {
    tasks
        .as_array()
        .expect("expected a JSON array")
        .iter()
        .map(|task| task["id"].as_i64().expect("task has an id"))
        .collect()
}
