use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::middleware::auth_middleware;
use super::openapi;
use super::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/openapi.json", get(openapi::openapi_json))
        .merge(openapi::redoc_router());

    let notes = Router::new()
        .route("/", post(handlers::notes::create_note))
        .route("/relevant-notes", post(handlers::relevance::relevant_notes))
        .route("/{id}", get(handlers::notes::get_note))
        .route(
            "/{id}/reminder",
            axum::routing::delete(handlers::notes::clear_reminders),
        )
        .route(
            "/{id}/reminder/time",
            put(handlers::notes::set_time_reminder),
        )
        .route(
            "/{id}/reminder/geofence",
            put(handlers::notes::set_geofence_reminder),
        );

    let protected_routes = Router::new()
        .nest("/notes", notes)
        .route("/geofences", get(handlers::geofences::list_geofences))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api", public_routes.merge(protected_routes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{DateTime, Duration, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::create_router;
    use crate::api::state::AppState;
    use crate::config::{ClientConfig, Config, DatabaseConfig, RelevanceConfig, ServerConfig};
    use crate::db::testing::test_backend;

    const ALICE: &str = "alice-token";
    const BOB: &str = "bob-token";

    async fn test_app() -> (axum::Router, TempDir) {
        let (db, dir) = test_backend().await;
        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                api_tokens: HashMap::from([
                    (ALICE.to_string(), "alice".to_string()),
                    (BOB.to_string(), "bob".to_string()),
                ]),
            },
            database: DatabaseConfig::local("unused.db"),
            relevance: RelevanceConfig::default(),
            client: ClientConfig::default(),
        };
        (create_router(AppState::new(config, db)), dir)
    }

    async fn send(
        app: &axum::Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        app.clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create_note(app: &axum::Router, token: &str, body: Value) -> i64 {
        let response = send(app, "POST", "/api/notes", Some(token), Some(body)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["id"].as_i64().unwrap()
    }

    fn iso(dt: DateTime<Utc>) -> String {
        dt.to_rfc3339()
    }

    #[tokio::test]
    async fn health_is_public() {
        let (app, _dir) = test_app().await;

        let response = send(&app, "GET", "/api/health", None, None).await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["relevance_window_minutes"], 60);
    }

    #[tokio::test]
    async fn openapi_json_is_public_and_valid() {
        let (app, _dir) = test_app().await;

        let response = send(&app, "GET", "/api/openapi.json", None, None).await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let version = json["openapi"]
            .as_str()
            .expect("openapi field should be a string");
        assert!(version.starts_with('3'));
        assert!(json["paths"]["/api/notes/relevant-notes"].is_object());
    }

    #[tokio::test]
    async fn relevant_notes_requires_auth() {
        let (app, _dir) = test_app().await;

        let response = send(
            &app,
            "POST",
            "/api/notes/relevant-notes",
            None,
            Some(json!({ "nowUtc": iso(Utc::now()) })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "unauthorized");
    }

    #[tokio::test]
    async fn relevant_notes_missing_now_is_bad_request() {
        let (app, _dir) = test_app().await;

        let response = send(
            &app,
            "POST",
            "/api/notes/relevant-notes",
            Some(ALICE),
            Some(json!({ "insideGeofenceIds": ["note_1"] })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "invalid_request");
        assert_eq!(json["error"]["message"], "Missing required field: nowUtc");
    }

    #[tokio::test]
    async fn relevant_notes_malformed_now_is_bad_request() {
        let (app, _dir) = test_app().await;

        let response = send(
            &app,
            "POST",
            "/api/notes/relevant-notes",
            Some(ALICE),
            Some(json!({ "nowUtc": "half past nine" })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "invalid_request");
    }

    #[tokio::test]
    async fn relevant_notes_now_at_edge_of_range_is_bad_request() {
        let (app, _dir) = test_app().await;

        let response = send(
            &app,
            "POST",
            "/api/notes/relevant-notes",
            Some(ALICE),
            Some(json!({ "nowUtc": "+262142-12-31T23:30:00Z" })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "invalid_request");
        assert_eq!(json["error"]["message"], "nowUtc out of range");
    }

    #[tokio::test]
    async fn relevant_notes_union_over_http() {
        // Given: A is time-relevant, B is inside a reported geofence, C is neither
        let (app, _dir) = test_app().await;
        let now = Utc::now();
        let a = create_note(
            &app,
            ALICE,
            json!({ "title": "A", "reminderAtUtc": iso(now + Duration::minutes(10)) }),
        )
        .await;
        let b = create_note(
            &app,
            ALICE,
            json!({
                "title": "B",
                "tags": ["errands"],
                "geofence": { "latitude": 51.5, "longitude": -0.12, "radius": 80 }
            }),
        )
        .await;
        let c = create_note(
            &app,
            ALICE,
            json!({ "title": "C", "reminderAtUtc": iso(now + Duration::hours(5)) }),
        )
        .await;

        // When
        let response = send(
            &app,
            "POST",
            "/api/notes/relevant-notes",
            Some(ALICE),
            Some(json!({
                "nowUtc": iso(now),
                "insideGeofenceIds": [format!("note_{b}"), format!("note_{c}"), "bogus"]
            })),
        )
        .await;

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let notes = json.as_array().unwrap();
        let mut ids: Vec<i64> = notes.iter().map(|n| n["id"].as_i64().unwrap()).collect();
        ids.sort();
        assert_eq!(ids, vec![a, b]);

        let b_json = notes.iter().find(|n| n["id"] == b).unwrap();
        assert_eq!(b_json["geofence"]["id"], format!("note_{b}"));
        assert_eq!(b_json["geofence"]["radius"], 80);
        assert_eq!(b_json["tags"][0]["name"], "errands");
        assert_eq!(b_json["hasPhoto"], false);
    }

    #[tokio::test]
    async fn foreign_geofence_ids_are_not_leaked() {
        let (app, _dir) = test_app().await;
        let bobs = create_note(
            &app,
            BOB,
            json!({
                "title": "bob's secret",
                "geofence": { "latitude": 1.0, "longitude": 1.0, "radius": 10 }
            }),
        )
        .await;

        let response = send(
            &app,
            "POST",
            "/api/notes/relevant-notes",
            Some(ALICE),
            Some(json!({ "nowUtc": iso(Utc::now()), "insideGeofenceIds": [format!("note_{bobs}")] })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!([]));
    }

    #[tokio::test]
    async fn geofence_feed_lists_only_geofenced_notes() {
        let (app, _dir) = test_app().await;
        let mut fenced = Vec::new();
        for radius in [25, 50, 75] {
            fenced.push(
                create_note(
                    &app,
                    ALICE,
                    json!({ "geofence": { "latitude": 10.0, "longitude": 20.0, "radius": radius } }),
                )
                .await,
            );
        }
        create_note(&app, ALICE, json!({ "title": "plain" })).await;

        let response = send(&app, "GET", "/api/geofences", Some(ALICE), None).await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let entries = json.as_array().unwrap();
        assert_eq!(entries.len(), 3);
        for (entry, id) in entries.iter().zip(&fenced) {
            assert_eq!(entry["geofenceId"], format!("note_{id}"));
            assert_eq!(entry["latitude"], 10.0);
        }
        assert_eq!(entries[2]["radiusMeters"], 75);
    }

    #[tokio::test]
    async fn reminder_endpoints_round_trip() {
        let (app, _dir) = test_app().await;
        let id = create_note(&app, ALICE, json!({ "title": "dentist" })).await;
        let trigger = "2030-01-15T09:30:00Z";

        let response = send(
            &app,
            "PUT",
            &format!("/api/notes/{id}/reminder/time"),
            Some(ALICE),
            Some(json!({ "triggerAtUtc": trigger })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["noteId"], id);
        assert_eq!(
            json["reminderTimeUtc"].as_str().unwrap().parse::<DateTime<Utc>>().unwrap(),
            trigger.parse::<DateTime<Utc>>().unwrap()
        );

        let response = send(
            &app,
            "PUT",
            &format!("/api/notes/{id}/reminder/geofence"),
            Some(ALICE),
            Some(json!({ "latitude": 48.2, "longitude": 16.37, "radius": 120, "addressName": "Vienna" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["geofence"]["addressName"], "Vienna");
        assert!(json["reminderTimeUtc"].is_string());

        let response = send(
            &app,
            "DELETE",
            &format!("/api/notes/{id}/reminder"),
            Some(ALICE),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = send(&app, "GET", &format!("/api/notes/{id}"), Some(ALICE), None).await;
        let json = body_json(response).await;
        assert!(json["reminderTimeUtc"].is_null());
        assert!(json["geofence"].is_null());
    }

    #[tokio::test]
    async fn geofence_reminder_rejects_non_positive_radius() {
        let (app, _dir) = test_app().await;
        let id = create_note(&app, ALICE, json!({})).await;

        let response = send(
            &app,
            "PUT",
            &format!("/api/notes/{id}/reminder/geofence"),
            Some(ALICE),
            Some(json!({ "latitude": 1.0, "longitude": 1.0, "radius": -5 })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "invalid_request");
    }

    #[tokio::test]
    async fn reminders_on_foreign_note_are_not_found() {
        let (app, _dir) = test_app().await;
        let bobs = create_note(&app, BOB, json!({})).await;

        let response = send(
            &app,
            "DELETE",
            &format!("/api/notes/{bobs}/reminder"),
            Some(ALICE),
            None,
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"]["code"], "not_found");
    }
}
