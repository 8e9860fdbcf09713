//! HTTP API tests driven through the router with `tower::ServiceExt::oneshot`.

#![cfg(feature = "http-server")]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use visit_tracker::auth::{Claims, JwtManager};
use visit_tracker::db::{FullRepository, LocalRepository, ScheduleRepository};
use visit_tracker::http::{create_router, AppState};
use visit_tracker::models::{Role, ScheduleId, ScheduleStatus, UserId};
use visit_tracker::services::{FixedClock, LifecycleSettings};

const SECRET: &str = "integration-secret";

struct TestApp {
    router: Router,
    repo: Arc<LocalRepository>,
    clock: FixedClock,
    jwt: JwtManager,
}

impl TestApp {
    fn new(now: DateTime<Utc>) -> Self {
        let repo = Arc::new(LocalRepository::new());
        let clock = FixedClock::new(now);
        let state = AppState::new(
            repo.clone() as Arc<dyn FullRepository>,
            Arc::new(clock.clone()),
            JwtManager::new(SECRET),
            LifecycleSettings::default(),
        );
        Self {
            router: create_router(state),
            repo,
            clock,
            jwt: JwtManager::new(SECRET),
        }
    }

    fn token(&self, user_id: i64, role: Role) -> String {
        self.jwt
            .issue(UserId::new(user_id), role, Duration::hours(1))
            .unwrap()
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        tz: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(tz) = tz {
            builder = builder.header("X-Timezone", tz);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    /// Admin creates a schedule for `user_id`; returns its id.
    async fn create(&self, user_id: i64, shift_time: &str, tasks: &[&str]) -> i64 {
        let admin = self.token(1, Role::Admin);
        let tasks: Vec<Value> = tasks.iter().map(|t| json!({ "description": t })).collect();
        let (status, body) = self
            .send(
                Method::POST,
                "/v1/admin/schedules",
                Some(&admin),
                None,
                Some(json!({
                    "user_id": user_id,
                    "client_name": "Ada Lovelace",
                    "location": "12 Elm St",
                    "shift_time": shift_time,
                    "tasks": tasks,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["schedule"]["id"].as_i64().unwrap()
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new(now());
    let (status, body) = app.send(Method::GET, "/health", None, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");

    app.repo.set_healthy(false);
    let (_, body) = app.send(Method::GET, "/health", None, None, None).await;
    assert_eq!(body["database"], "disconnected");
}

#[tokio::test]
async fn test_requests_without_valid_token_are_rejected() {
    let app = TestApp::new(now());

    let (status, body) = app.send(Method::GET, "/v1/schedules", None, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHENTICATED");

    let (status, _) = app
        .send(Method::GET, "/v1/schedules", Some("not-a-jwt"), None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let other = JwtManager::new("someone-else")
        .issue(UserId::new(3), Role::Caregiver, Duration::hours(1))
        .unwrap();
    let (status, _) = app
        .send(Method::GET, "/v1/schedules", Some(&other), None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let unknown_role = app
        .jwt
        .encode(&Claims {
            user_id: 3,
            role_id: 42,
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
        })
        .unwrap();
    let (status, _) = app
        .send(Method::GET, "/v1/schedules", Some(&unknown_role), None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_only_admins_manage_schedules() {
    let app = TestApp::new(now());
    let caregiver = app.token(3, Role::Caregiver);

    let (status, body) = app
        .send(
            Method::POST,
            "/v1/admin/schedules",
            Some(&caregiver),
            None,
            Some(json!({
                "user_id": 3,
                "client_name": "Ada",
                "location": "Elm St",
                "shift_time": "2024-01-15T10:00:00Z",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let id = app.create(3, "2024-01-15T10:00:00Z", &[]).await;
    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/v1/admin/schedules/{}", id),
            Some(&caregiver),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = app.token(1, Role::Admin);
    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/v1/admin/schedules/{}", id),
            Some(&admin),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.repo.schedule_count(), 0);
}

#[tokio::test]
async fn test_visit_flow_over_http() {
    let app = TestApp::new(now());
    let caregiver = app.token(3, Role::Caregiver);
    let id = app.create(3, "2024-01-15T09:30:00Z", &[]).await;

    // No tasks yet.
    let (status, body) = app
        .send(
            Method::POST,
            &format!("/v1/schedules/{}/start", id),
            Some(&caregiver),
            None,
            Some(json!({ "latitude": 40.7, "longitude": -74.0 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_ARGUMENT");

    let admin = app.token(1, Role::Admin);
    let (status, body) = app
        .send(
            Method::POST,
            &format!("/v1/admin/schedules/{}/tasks", id),
            Some(&admin),
            None,
            Some(json!({ "tasks": [{ "description": "Meds" }, { "description": "Walk" }] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let task_id = body["tasks"][0]["id"].as_i64().unwrap();

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/v1/schedules/{}/start", id),
            Some(&caregiver),
            None,
            Some(json!({ "latitude": 91.0, "longitude": 0.0 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/v1/schedules/{}/start", id),
            Some(&caregiver),
            None,
            Some(json!({ "latitude": 40.7, "longitude": -74.0 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["schedule"]["status"], "in_progress");

    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/v1/tasks/{}/status", task_id),
            Some(&caregiver),
            None,
            Some(json!({ "status": "not_completed" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/v1/tasks/{}/status", task_id),
            Some(&caregiver),
            None,
            Some(json!({ "status": "completed" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task"]["status"], "completed");

    app.clock.advance(Duration::minutes(40));
    let (status, body) = app
        .send(
            Method::POST,
            &format!("/v1/schedules/{}/end", id),
            Some(&caregiver),
            None,
            Some(json!({ "latitude": 40.7, "longitude": -74.0 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["schedule"]["status"], "completed");

    let (status, body) = app
        .send(
            Method::GET,
            "/v1/schedules/completed/today",
            Some(&caregiver),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["schedules"][0]["id"], id);
}

#[tokio::test]
async fn test_other_caregivers_schedule_is_forbidden() {
    let app = TestApp::new(now());
    let id = app.create(3, "2024-01-15T10:00:00Z", &["Meds"]).await;
    let intruder = app.token(4, Role::Caregiver);

    for (method, path) in [
        (Method::GET, format!("/v1/schedules/{}", id)),
        (Method::POST, format!("/v1/schedules/{}/cancel-start", id)),
    ] {
        let (status, _) = app.send(method, &path, Some(&intruder), None, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{}", path);
    }

    let (status, body) = app
        .send(Method::GET, "/v1/schedules/9999", Some(&intruder), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_malformed_requests_get_json_errors() {
    let app = TestApp::new(now());
    let id = app.create(3, "2024-01-15T10:00:00Z", &["Meds"]).await;
    let caregiver = app.token(3, Role::Caregiver);
    let start = format!("/v1/schedules/{}/start", id);

    for body in [
        json!({ "latitude": 10.0 }),
        json!({ "latitude": "north", "longitude": 10.0 }),
    ] {
        let (status, error) = app
            .send(Method::POST, &start, Some(&caregiver), None, Some(body.clone()))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
        assert_eq!(error["code"], "INVALID_ARGUMENT", "{}", body);
        assert!(error["message"].is_string(), "{}", error);
    }
    let (_, error) = app
        .send(Method::POST, &start, Some(&caregiver), None, Some(json!({ "latitude": 10.0 })))
        .await;
    assert!(error["message"].as_str().unwrap().contains("longitude"));

    let stored = app.repo.get_schedule(ScheduleId::new(id)).await.unwrap();
    assert_eq!(stored.status, ScheduleStatus::Scheduled);

    for (method, path) in [
        (Method::GET, "/v1/schedules/abc"),
        (Method::POST, "/v1/schedules/abc/cancel-start"),
    ] {
        let (status, error) = app.send(method, path, Some(&caregiver), None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", path);
        assert_eq!(error["code"], "INVALID_ARGUMENT", "{}", path);
    }
}

#[tokio::test]
async fn test_body_without_json_content_type_is_rejected_as_json() {
    let app = TestApp::new(now());
    let admin = app.token(1, Role::Admin);
    let request = Request::builder()
        .method(Method::POST)
        .uri("/v1/admin/schedules")
        .header(header::AUTHORIZATION, format!("Bearer {}", admin))
        .body(Body::from("user_id=3"))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let error: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(error["code"], "INVALID_ARGUMENT");
    assert_eq!(app.repo.schedule_count(), 0);
}

#[tokio::test]
async fn test_timezone_header_shapes_day_and_display() {
    // 09:00 UTC is 18:00 in Tokyo.
    let app = TestApp::new(now());
    let caregiver = app.token(3, Role::Caregiver);
    let tokyo_late = app.create(3, "2024-01-15T14:30:00Z", &["Meds"]).await;
    let utc_evening = app.create(3, "2024-01-15T20:00:00Z", &["Meds"]).await;

    let (status, body) = app
        .send(
            Method::GET,
            "/v1/schedules/today",
            Some(&caregiver),
            Some("Asia/Tokyo"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["schedules"][0]["id"], tokyo_late);
    assert_eq!(body["schedules"][0]["shift_time"], "2024-01-15T23:30:00+09:00");

    let (_, body) = app
        .send(Method::GET, "/v1/schedules/today", Some(&caregiver), None, None)
        .await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["schedules"][1]["id"], utc_evening);

    // Unknown zones fall back to UTC.
    let (status, body) = app
        .send(
            Method::GET,
            "/v1/schedules/today",
            Some(&caregiver),
            Some("Mars/Olympus"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
}

#[tokio::test]
async fn test_missed_endpoint_persists_transition() {
    let app = TestApp::new(now());
    let caregiver = app.token(3, Role::Caregiver);
    let overdue = app.create(3, "2024-01-15T08:00:00Z", &["Meds"]).await;
    let within_grace = app.create(3, "2024-01-15T08:56:00Z", &["Meds"]).await;

    let (status, body) = app
        .send(Method::GET, "/v1/schedules/missed", Some(&caregiver), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["schedules"][0]["id"], overdue);
    assert_eq!(body["schedules"][0]["status"], "missed");

    let stored = app.repo.get_schedule(ScheduleId::new(overdue)).await.unwrap();
    assert_eq!(stored.status, ScheduleStatus::Missed);
    let pending = app
        .repo
        .get_schedule(ScheduleId::new(within_grace))
        .await
        .unwrap();
    assert_eq!(pending.status, ScheduleStatus::Scheduled);

    let (_, body) = app
        .send(Method::GET, "/v1/schedules/upcoming", Some(&caregiver), None, None)
        .await;
    assert_eq!(body["total"], 0);
}
