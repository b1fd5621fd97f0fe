pub mod service;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::audit::{self, AuditAction};
use crate::shared::actor::{require_actor, Actor};
use crate::shared::state::AppState;
use crate::shared::utils::opaque_token;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
    Unknown(String),
}

impl ApprovalStatus {
    pub fn as_wire(&self) -> &str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
            ApprovalStatus::Expired => "expired",
            ApprovalStatus::Unknown(raw) => raw,
        }
    }

    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "pending" => ApprovalStatus::Pending,
            "approved" => ApprovalStatus::Approved,
            "rejected" => ApprovalStatus::Rejected,
            "expired" => ApprovalStatus::Expired,
            other => {
                log::warn!("unknown approval status value {other:?} from backend");
                ApprovalStatus::Unknown(other.to_string())
            }
        }
    }

    pub fn is_decision(&self) -> bool {
        matches!(self, ApprovalStatus::Approved | ApprovalStatus::Rejected)
    }
}

impl Serialize for ApprovalStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for ApprovalStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ApprovalStatus::from_wire(&raw))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalEventKind {
    Created,
    Viewed,
    ReminderSent,
    Comment,
    StatusChanged,
    Unknown(String),
}

impl ApprovalEventKind {
    pub fn as_wire(&self) -> &str {
        match self {
            ApprovalEventKind::Created => "created",
            ApprovalEventKind::Viewed => "viewed",
            ApprovalEventKind::ReminderSent => "reminder_sent",
            ApprovalEventKind::Comment => "comment",
            ApprovalEventKind::StatusChanged => "status_changed",
            ApprovalEventKind::Unknown(raw) => raw,
        }
    }

    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "created" => ApprovalEventKind::Created,
            "viewed" => ApprovalEventKind::Viewed,
            "reminder_sent" => ApprovalEventKind::ReminderSent,
            "comment" => ApprovalEventKind::Comment,
            "status_changed" => ApprovalEventKind::StatusChanged,
            other => {
                log::warn!("unknown approval event kind {other:?} from backend");
                ApprovalEventKind::Unknown(other.to_string())
            }
        }
    }

    pub fn as_view(&self) -> &str {
        match self {
            ApprovalEventKind::ReminderSent => "reminderSent",
            ApprovalEventKind::StatusChanged => "statusChanged",
            other => other.as_wire(),
        }
    }

    pub fn from_view(raw: &str) -> Self {
        match raw {
            "reminderSent" => ApprovalEventKind::ReminderSent,
            "statusChanged" => ApprovalEventKind::StatusChanged,
            other => ApprovalEventKind::from_wire(other),
        }
    }
}

impl Serialize for ApprovalEventKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_view())
    }
}

impl<'de> Deserialize<'de> for ApprovalEventKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ApprovalEventKind::from_view(&raw))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub client: String,
    pub status: ApprovalStatus,
    pub due_date: Option<DateTime<Utc>>,
    /// Opaque token for the unauthenticated client route. Never expires and
    /// is not consumed on use; repeat decisions append history.
    pub token: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalEvent {
    pub id: Uuid,
    pub approval_id: Uuid,
    pub kind: ApprovalEventKind,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
}

/// An approval with its history, newest event first.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalDetail {
    #[serde(flatten)]
    pub approval: Approval,
    pub history: Vec<ApprovalEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApprovalRequest {
    pub title: String,
    pub description: Option<String>,
    pub client: String,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub status: ApprovalStatus,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub message: String,
}

fn event(approval_id: Uuid, kind: ApprovalEventKind, description: String) -> ApprovalEvent {
    ApprovalEvent {
        id: Uuid::new_v4(),
        approval_id,
        kind,
        description,
        occurred_at: Utc::now(),
    }
}

async fn detail(state: &AppState, approval: Approval) -> ApprovalDetail {
    let history = state.approvals.history(approval.id).await;
    ApprovalDetail { approval, history }
}

/// Shared decision path for the admin and public routes: overwrite the
/// status field, prepend exactly one StatusChanged event embedding the
/// target status. Prior history is never touched, so a resubmitted decision
/// stacks a second event instead of rewriting the first.
async fn apply_decision(
    state: &AppState,
    approval: Approval,
    status: ApprovalStatus,
    actor: &Actor,
) -> Result<ApprovalDetail, (StatusCode, String)> {
    if !status.is_decision() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "Decision must be approved or rejected".to_string(),
        ));
    }

    let updated = state
        .approvals
        .set_status(approval.id, status.clone())
        .await
        .map_err(|e| e.http())?;

    state
        .approvals
        .append_event(event(
            approval.id,
            ApprovalEventKind::StatusChanged,
            format!("Status changed to {} by {}", status.as_wire(), actor.name),
        ))
        .await
        .map_err(|e| e.http())?;

    audit::record(
        state,
        AuditAction::ApprovalDecision,
        format!("\"{}\" {}", updated.title, status.as_wire()),
        actor,
        Some(updated.id),
    )
    .await;

    Ok(detail(state, updated).await)
}

pub async fn list_approvals(State(state): State<Arc<AppState>>) -> Json<Vec<Approval>> {
    Json(state.approvals.list().await)
}

pub async fn get_approval(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApprovalDetail>, (StatusCode, String)> {
    let approval = state
        .approvals
        .get(id)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Approval not found".to_string()))?;
    Ok(Json(detail(&state, approval).await))
}

pub async fn create_approval(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateApprovalRequest>,
) -> Result<Json<ApprovalDetail>, (StatusCode, String)> {
    let actor = require_actor(&state, &headers).await?;

    let approval = Approval {
        id: Uuid::new_v4(),
        title: req.title,
        description: req.description.unwrap_or_default(),
        client: req.client,
        status: ApprovalStatus::Pending,
        due_date: req.due_date,
        token: opaque_token(),
        created_at: Utc::now(),
    };

    let created = state
        .approvals
        .create(approval)
        .await
        .map_err(|e| e.http())?;
    state
        .approvals
        .append_event(event(
            created.id,
            ApprovalEventKind::Created,
            format!("Created by {}", actor.name),
        ))
        .await
        .map_err(|e| e.http())?;

    audit::record(
        &state,
        AuditAction::ItemCreated,
        format!("Approval \"{}\" for {}", created.title, created.client),
        &actor,
        Some(created.id),
    )
    .await;

    Ok(Json(detail(&state, created).await))
}

pub async fn send_reminder(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<ApprovalDetail>, (StatusCode, String)> {
    let actor = require_actor(&state, &headers).await?;

    let approval = state
        .approvals
        .get(id)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Approval not found".to_string()))?;

    state
        .approvals
        .append_event(event(
            id,
            ApprovalEventKind::ReminderSent,
            format!("Reminder sent by {}", actor.name),
        ))
        .await
        .map_err(|e| e.http())?;

    Ok(Json(detail(&state, approval).await))
}

pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<CommentRequest>,
) -> Result<Json<ApprovalDetail>, (StatusCode, String)> {
    let actor = require_actor(&state, &headers).await?;

    let approval = state
        .approvals
        .get(id)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Approval not found".to_string()))?;

    state
        .approvals
        .append_event(event(
            id,
            ApprovalEventKind::Comment,
            format!("{}: {}", actor.name, req.message),
        ))
        .await
        .map_err(|e| e.http())?;

    Ok(Json(detail(&state, approval).await))
}

pub async fn decide(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<DecisionRequest>,
) -> Result<Json<ApprovalDetail>, (StatusCode, String)> {
    let actor = require_actor(&state, &headers).await?;

    let approval = state
        .approvals
        .get(id)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Approval not found".to_string()))?;

    apply_decision(&state, approval, req.status, &actor)
        .await
        .map(Json)
}

/// Public read by token. Each view leaves a Viewed event in the history.
pub async fn verify_token(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<ApprovalDetail>, (StatusCode, String)> {
    let approval = state
        .approvals
        .find_by_token(&token)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Approval link not found".to_string()))?;

    state
        .approvals
        .append_event(event(
            approval.id,
            ApprovalEventKind::Viewed,
            format!("Viewed via approval link by {}", approval.client),
        ))
        .await
        .map_err(|e| e.http())?;

    Ok(Json(detail(&state, approval).await))
}

/// Public decision by token, the only unauthenticated mutation path.
pub async fn decide_by_token(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(req): Json<DecisionRequest>,
) -> Result<Json<ApprovalDetail>, (StatusCode, String)> {
    let approval = state
        .approvals
        .find_by_token(&token)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Approval link not found".to_string()))?;

    let actor = Actor::client(&approval.client);
    apply_decision(&state, approval, req.status, &actor)
        .await
        .map(Json)
}

pub fn configure_approvals_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/approvals", get(list_approvals).post(create_approval))
        .route("/api/approvals/:id", get(get_approval))
        .route("/api/approvals/:id/remind", post(send_reminder))
        .route("/api/approvals/:id/comment", post(add_comment))
        .route("/api/approvals/:id/decide", post(decide))
        .route("/api/verify/:token", get(verify_token).post(decide_by_token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_wire_and_view_tables_agree() {
        for kind in [
            ApprovalEventKind::Created,
            ApprovalEventKind::Viewed,
            ApprovalEventKind::ReminderSent,
            ApprovalEventKind::Comment,
            ApprovalEventKind::StatusChanged,
        ] {
            assert_eq!(ApprovalEventKind::from_wire(kind.as_wire()), kind);
            assert_eq!(ApprovalEventKind::from_view(kind.as_view()), kind);
        }
        assert_eq!(ApprovalEventKind::StatusChanged.as_view(), "statusChanged");
    }

    #[test]
    fn only_approved_and_rejected_are_decisions() {
        assert!(ApprovalStatus::Approved.is_decision());
        assert!(ApprovalStatus::Rejected.is_decision());
        assert!(!ApprovalStatus::Pending.is_decision());
        assert!(!ApprovalStatus::Expired.is_decision());
    }
}
