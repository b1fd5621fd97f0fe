pub mod checklist;
pub mod service;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::audit::{self, AuditAction};
use crate::shared::actor::require_actor;
use crate::shared::state::AppState;
use checklist::{ChecklistBlock, ChecklistState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliverableKind {
    Software,
    Design,
    Report,
    Unknown(String),
}

impl DeliverableKind {
    pub fn as_wire(&self) -> &str {
        match self {
            DeliverableKind::Software => "software",
            DeliverableKind::Design => "design",
            DeliverableKind::Report => "report",
            DeliverableKind::Unknown(raw) => raw,
        }
    }

    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "software" => DeliverableKind::Software,
            "design" => DeliverableKind::Design,
            "report" => DeliverableKind::Report,
            other => {
                log::warn!("unknown deliverable kind {other:?} from backend");
                DeliverableKind::Unknown(other.to_string())
            }
        }
    }
}

impl Serialize for DeliverableKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for DeliverableKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(DeliverableKind::from_wire(&raw))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deliverable {
    pub id: Uuid,
    pub name: String,
    pub client_name: String,
    pub kind: DeliverableKind,
    /// Completion map keyed `"{block}-{item}"`; written back whole on every
    /// toggle.
    pub checks: ChecklistState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deliverable {
    pub fn is_complete(&self) -> bool {
        checklist::is_complete(&self.kind, &self.checks)
    }
}

/// Deliverable plus the derived checklist numbers the QA board renders.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliverableView {
    #[serde(flatten)]
    pub deliverable: Deliverable,
    pub checked_count: usize,
    pub total_items: usize,
    pub progress: u32,
    pub complete: bool,
}

impl From<Deliverable> for DeliverableView {
    fn from(deliverable: Deliverable) -> Self {
        let checked_count = checklist::checked_count(&deliverable.kind, &deliverable.checks);
        let total_items = checklist::total_items(&deliverable.kind);
        let progress = checklist::progress(&deliverable.kind, &deliverable.checks);
        let complete = deliverable.is_complete();
        DeliverableView {
            deliverable,
            checked_count,
            total_items,
            progress,
            complete,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeliverableRequest {
    pub name: String,
    pub client_name: String,
    pub kind: DeliverableKind,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateView {
    pub kind: &'static str,
    pub blocks: &'static [ChecklistBlock],
}

pub async fn list_deliverables(State(state): State<Arc<AppState>>) -> Json<Vec<DeliverableView>> {
    let rows = state.deliverables.list().await;
    Json(rows.into_iter().map(DeliverableView::from).collect())
}

pub async fn get_deliverable(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeliverableView>, (StatusCode, String)> {
    state
        .deliverables
        .get(id)
        .await
        .map(|d| Json(DeliverableView::from(d)))
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Deliverable not found".to_string()))
}

pub async fn create_deliverable(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateDeliverableRequest>,
) -> Result<Json<DeliverableView>, (StatusCode, String)> {
    let actor = require_actor(&state, &headers).await?;

    let now = Utc::now();
    let deliverable = Deliverable {
        id: Uuid::new_v4(),
        name: req.name,
        client_name: req.client_name,
        kind: req.kind,
        checks: ChecklistState::new(),
        created_at: now,
        updated_at: now,
    };

    let created = state
        .deliverables
        .create(deliverable)
        .await
        .map_err(|e| e.http())?;

    audit::record(
        &state,
        AuditAction::ItemCreated,
        format!("Deliverable \"{}\" for {}", created.name, created.client_name),
        &actor,
        Some(created.id),
    )
    .await;

    Ok(Json(DeliverableView::from(created)))
}

pub async fn toggle_check(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((id, key)): Path<(Uuid, String)>,
) -> Result<Json<DeliverableView>, (StatusCode, String)> {
    let actor = require_actor(&state, &headers).await?;

    let mut deliverable = state
        .deliverables
        .get(id)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Deliverable not found".to_string()))?;

    checklist::toggle(&mut deliverable.checks, &key);
    let updated = state
        .deliverables
        .save_checks(id, deliverable.checks)
        .await
        .map_err(|e| e.http())?;

    audit::record(
        &state,
        AuditAction::ItemUpdated,
        format!("Toggled check {key} on \"{}\"", updated.name),
        &actor,
        Some(id),
    )
    .await;

    Ok(Json(DeliverableView::from(updated)))
}

pub async fn mark_all_checks(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<DeliverableView>, (StatusCode, String)> {
    let actor = require_actor(&state, &headers).await?;

    let deliverable = state
        .deliverables
        .get(id)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Deliverable not found".to_string()))?;

    let updated = state
        .deliverables
        .save_checks(id, checklist::mark_all(&deliverable.kind))
        .await
        .map_err(|e| e.http())?;

    audit::record(
        &state,
        AuditAction::ItemUpdated,
        format!("Marked all checks on \"{}\"", updated.name),
        &actor,
        Some(id),
    )
    .await;

    Ok(Json(DeliverableView::from(updated)))
}

pub async fn reset_checks(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<DeliverableView>, (StatusCode, String)> {
    let actor = require_actor(&state, &headers).await?;

    let updated = state
        .deliverables
        .save_checks(id, ChecklistState::new())
        .await
        .map_err(|e| e.http())?;

    audit::record(
        &state,
        AuditAction::ItemUpdated,
        format!("Reset checks on \"{}\"", updated.name),
        &actor,
        Some(id),
    )
    .await;

    Ok(Json(DeliverableView::from(updated)))
}

pub async fn list_templates() -> Json<Vec<TemplateView>> {
    Json(vec![
        TemplateView {
            kind: "software",
            blocks: checklist::template(&DeliverableKind::Software),
        },
        TemplateView {
            kind: "design",
            blocks: checklist::template(&DeliverableKind::Design),
        },
        TemplateView {
            kind: "report",
            blocks: checklist::template(&DeliverableKind::Report),
        },
    ])
}

pub fn configure_qa_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/qa/deliverables",
            get(list_deliverables).post(create_deliverable),
        )
        .route("/api/qa/deliverables/:id", get(get_deliverable))
        .route(
            "/api/qa/deliverables/:id/checks",
            put(mark_all_checks).delete(reset_checks),
        )
        .route("/api/qa/deliverables/:id/checks/:key", put(toggle_check))
        .route("/api/qa/templates", get(list_templates))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_derives_progress_from_checks() {
        let now = Utc::now();
        let mut deliverable = Deliverable {
            id: Uuid::new_v4(),
            name: "Checkout service".to_string(),
            client_name: "Northwind".to_string(),
            kind: DeliverableKind::Software,
            checks: ChecklistState::new(),
            created_at: now,
            updated_at: now,
        };
        deliverable.checks = checklist::mark_all(&deliverable.kind);
        let view = DeliverableView::from(deliverable);
        assert_eq!(view.progress, 100);
        assert!(view.complete);
        assert_eq!(view.checked_count, view.total_items);
    }
}
