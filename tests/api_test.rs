use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use bundlros::api_router::build_router;
use bundlros::config::{AiConfig, AppConfig, BackendMode, DatabaseConfig, ServerConfig};
use bundlros::shared::actor::SESSION_HEADER;
use bundlros::shared::state::AppState;

fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            username: "bundlros".to_string(),
            password: String::new(),
            server: "localhost".to_string(),
            port: 5432,
            database: "bundlros".to_string(),
        },
        backend: BackendMode::Mock,
        ai: AiConfig {
            api_key: None,
            base_url: "https://api.openai.com".to_string(),
        },
    }
}

async fn test_app() -> (Router, Arc<AppState>, String) {
    let state = Arc::new(AppState::mock(test_config()));
    let profile = state
        .profiles
        .find_by_email("ana@bundlr.studio")
        .await
        .expect("fixture admin present");
    let session = state
        .sessions
        .create(&profile)
        .await
        .expect("session created");
    (build_router(state.clone()), state, session.token)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(SESSION_HEADER, token);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn login_with_fixture_credentials_returns_a_session() {
    let (app, _state, _token) = test_app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/identity/login",
        None,
        Some(json!({"email": "ana@bundlr.studio", "password": "bundlr-demo"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].as_str().unwrap().len() >= 32);
    assert_eq!(body["profile"]["displayName"], "Ana Duarte");
    assert_eq!(body["profile"]["role"], "admin");
}

#[tokio::test]
async fn mutations_without_a_session_are_rejected() {
    let (app, _state, _token) = test_app().await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/intake",
        None,
        Some(json!({"title": "x", "client": "Acme", "requestor": "ops@acme.test"})),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn intake_create_defaults_sla_to_24_hours() {
    let (app, _state, token) = test_app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/intake",
        Some(&token),
        Some(json!({
            "title": "New banner set",
            "client": "Acme",
            "requestor": "ops@acme.test"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let created: DateTime<Utc> = body["createdAt"].as_str().unwrap().parse().unwrap();
    let due: DateTime<Utc> = body["slaDueAt"].as_str().unwrap().parse().unwrap();
    assert_eq!(due - created, chrono::Duration::hours(24));
    assert_eq!(body["status"], "new");
}

#[tokio::test]
async fn intake_create_rejects_out_of_range_sla_offsets() {
    let (app, _state, token) = test_app().await;

    for hours in [i64::MAX, 0, -24, 9000] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/intake",
            Some(&token),
            Some(json!({
                "title": "Rush request",
                "client": "Acme",
                "requestor": "ops@acme.test",
                "slaHours": hours
            })),
        )
        .await;
        assert_eq!(
            status,
            StatusCode::UNPROCESSABLE_ENTITY,
            "slaHours {hours} must be rejected"
        );
    }

    // A sane explicit offset still works.
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/intake",
        Some(&token),
        Some(json!({
            "title": "Rush request",
            "client": "Acme",
            "requestor": "ops@acme.test",
            "slaHours": 8
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let created: DateTime<Utc> = body["createdAt"].as_str().unwrap().parse().unwrap();
    let due: DateTime<Utc> = body["slaDueAt"].as_str().unwrap().parse().unwrap();
    assert_eq!(due - created, chrono::Duration::hours(8));
}

#[tokio::test]
async fn approval_decision_by_token_appends_one_status_event_per_decision() {
    let (app, _state, token) = test_app().await;

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/approvals",
        Some(&token),
        Some(json!({"title": "Homepage v3", "client": "Acme"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let link_token = created["token"].as_str().unwrap().to_string();
    let baseline = created["history"].as_array().unwrap().len();

    // Public decision through the link, no session header.
    let (status, decided) = send(
        &app,
        Method::POST,
        &format!("/api/verify/{link_token}"),
        None,
        Some(json!({"status": "approved"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decided["status"], "approved");
    let history = decided["history"].as_array().unwrap();
    assert_eq!(history.len(), baseline + 1);
    assert_eq!(history[0]["kind"], "statusChanged");
    assert!(history[0]["description"]
        .as_str()
        .unwrap()
        .contains("approved"));

    // The link is not consumed: a second decision stacks another event and
    // the earlier one survives untouched.
    let (status, redecided) = send(
        &app,
        Method::POST,
        &format!("/api/verify/{link_token}"),
        None,
        Some(json!({"status": "rejected"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(redecided["status"], "rejected");
    let history = redecided["history"].as_array().unwrap();
    assert_eq!(history.len(), baseline + 2);
    assert!(history[0]["description"]
        .as_str()
        .unwrap()
        .contains("rejected"));
    assert!(history[1]["description"]
        .as_str()
        .unwrap()
        .contains("approved"));
}

#[tokio::test]
async fn pending_is_not_a_decision() {
    let (app, _state, token) = test_app().await;

    let (_, created) = send(
        &app,
        Method::POST,
        "/api/approvals",
        Some(&token),
        Some(json!({"title": "Logo round 2", "client": "Lumon"})),
    )
    .await;
    let link_token = created["token"].as_str().unwrap();

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/verify/{link_token}"),
        None,
        Some(json!({"status": "pending"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn audit_trail_reads_newest_first_with_actor_attribution() {
    let (app, _state, token) = test_app().await;

    for title in ["First", "Second", "Third"] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/intake",
            Some(&token),
            Some(json!({"title": title, "client": "Acme", "requestor": "ops@acme.test"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, events) = send(&app, Method::GET, "/api/audit", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let events = events.as_array().unwrap();
    assert!(events.len() >= 3);

    let timestamps: Vec<DateTime<Utc>> = events
        .iter()
        .map(|e| e["timestamp"].as_str().unwrap().parse().unwrap())
        .collect();
    for pair in timestamps.windows(2) {
        assert!(pair[0] >= pair[1], "audit events must read newest first");
    }
    assert_eq!(events[0]["actorName"], "Ana Duarte");
    assert_eq!(events[0]["action"], "item.created");
}

#[tokio::test]
async fn budget_export_reproduces_the_builder_numbers() {
    let (app, _state, token) = test_app().await;

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/budgets",
        Some(&token),
        Some(json!({
            "clientName": "Acme",
            "title": "Landing sprint",
            "items": [{"serviceId": "web.landing_page", "tier": "fast"}]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = created["id"].as_str().unwrap();
    assert_eq!(created["pricing"]["totalHours"], 11.2);
    assert_eq!(created["pricing"]["totalPrice"], 420.0);

    let (status, export) = send(
        &app,
        Method::GET,
        &format!("/api/budgets/{id}/export"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(export["totalHours"], created["pricing"]["totalHours"]);
    assert_eq!(export["totalPrice"], created["pricing"]["totalPrice"]);
}

#[tokio::test]
async fn qa_toggle_and_mark_all_drive_progress() {
    let (app, _state, token) = test_app().await;

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/qa/deliverables",
        Some(&token),
        Some(json!({"name": "Release 1.2", "clientName": "Northwind", "kind": "software"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["progress"], 0);

    let (status, toggled) = send(
        &app,
        Method::PUT,
        &format!("/api/qa/deliverables/{id}/checks/0-0"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(toggled["checkedCount"], 1);
    assert_eq!(toggled["complete"], false);

    let (status, marked) = send(
        &app,
        Method::PUT,
        &format!("/api/qa/deliverables/{id}/checks"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(marked["progress"], 100);
    assert_eq!(marked["complete"], true);
    assert_eq!(marked["checkedCount"], marked["totalItems"]);
}

#[tokio::test]
async fn client_overview_aggregates_contracts_and_work() {
    let (app, _state, token) = test_app().await;

    let (_, clients) = send(&app, Method::GET, "/api/clients", Some(&token), None).await;
    let acme = clients
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["name"] == "Acme")
        .unwrap()
        .clone();
    let acme_id = acme["id"].as_str().unwrap().to_string();

    let (status, contract) = send(
        &app,
        Method::POST,
        "/api/contracts",
        Some(&token),
        Some(json!({"clientId": acme_id, "title": "Retainer 2026", "value": 4800.0})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let contract_id = contract["id"].as_str().unwrap();

    // Draft contracts do not count toward active contract value.
    let (_, overview) = send(
        &app,
        Method::GET,
        &format!("/api/clients/{acme_id}/overview"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(overview["contractValue"], 0.0);
    assert_eq!(overview["contracts"].as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/contracts/{contract_id}"),
        Some(&token),
        Some(json!({"status": "active"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, overview) = send(
        &app,
        Method::GET,
        &format!("/api/clients/{acme_id}/overview"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(overview["contractValue"], 4800.0);
    // Seeded intake carries two Acme items, one of them blocked past its SLA.
    assert_eq!(overview["openIntake"], 2);
    assert_eq!(overview["overdueIntake"], 1);
}

#[tokio::test]
async fn kpis_reflect_fixture_data() {
    let (app, _state, token) = test_app().await;

    let (status, kpis) = send(&app, Method::GET, "/api/reporting/kpis", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(kpis["activeClients"], 2);
    assert_eq!(kpis["pendingApprovals"], 2);
    assert_eq!(kpis["deliverablesTotal"], 3);
    assert_eq!(kpis["deliverablesComplete"], 0);
    assert_eq!(kpis["openIntake"], 4);
}

#[tokio::test]
async fn report_lifecycle_moves_forward_only() {
    let (app, _state, token) = test_app().await;

    let (status, report) = send(
        &app,
        Method::POST,
        "/api/reporting/reports",
        Some(&token),
        Some(json!({"title": "August ops", "period": "2026-08"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["status"], "requested");
    let id = report["id"].as_str().unwrap().to_string();

    // Cannot approve before generating.
    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/reporting/reports/{id}/approve"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // No API key configured: generation succeeds with the fallback note.
    let (status, generated) = send(
        &app,
        Method::POST,
        &format!("/api/reporting/reports/{id}/generate"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(generated["status"], "generated");
    assert_eq!(generated["narrative"], bundlros::ai::FALLBACK_NOTE);

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/reporting/reports/{id}/approve"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, sent) = send(
        &app,
        Method::POST,
        &format!("/api/reporting/reports/{id}/send"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sent["status"], "sent");

    // Sent is terminal.
    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/reporting/reports/{id}/generate"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn deactivated_users_stay_on_the_roster() {
    let (app, _state, token) = test_app().await;

    let (_, users) = send(&app, Method::GET, "/api/identity/users", Some(&token), None).await;
    let iris = users
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["email"] == "iris@bundlr.studio")
        .unwrap()
        .clone();
    let iris_id = iris["id"].as_str().unwrap().to_string();

    let (status, deactivated) = send(
        &app,
        Method::PUT,
        &format!("/api/identity/users/{iris_id}/deactivate"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deactivated["status"], "inactive");

    let (_, users) = send(&app, Method::GET, "/api/identity/users", Some(&token), None).await;
    assert!(users
        .as_array()
        .unwrap()
        .iter()
        .any(|u| u["id"].as_str() == Some(&iris_id)));
}
