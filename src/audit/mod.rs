pub mod service;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::actor::Actor;
use crate::shared::state::AppState;

/// Closed action vocabulary. Wire values unknown to this build are carried
/// through as `Unknown` instead of being aliased to something else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditAction {
    Login,
    Logout,
    UserCreated,
    UserUpdated,
    UserDeactivated,
    ItemCreated,
    ItemUpdated,
    StatusChanged,
    ApprovalDecision,
    BudgetSaved,
    ReportGenerated,
    Unknown(String),
}

impl AuditAction {
    pub fn as_wire(&self) -> &str {
        match self {
            AuditAction::Login => "login",
            AuditAction::Logout => "logout",
            AuditAction::UserCreated => "user.created",
            AuditAction::UserUpdated => "user.updated",
            AuditAction::UserDeactivated => "user.deactivated",
            AuditAction::ItemCreated => "item.created",
            AuditAction::ItemUpdated => "item.updated",
            AuditAction::StatusChanged => "status.changed",
            AuditAction::ApprovalDecision => "approval.decision",
            AuditAction::BudgetSaved => "budget.saved",
            AuditAction::ReportGenerated => "report.generated",
            AuditAction::Unknown(raw) => raw,
        }
    }

    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "login" => AuditAction::Login,
            "logout" => AuditAction::Logout,
            "user.created" => AuditAction::UserCreated,
            "user.updated" => AuditAction::UserUpdated,
            "user.deactivated" => AuditAction::UserDeactivated,
            "item.created" => AuditAction::ItemCreated,
            "item.updated" => AuditAction::ItemUpdated,
            "status.changed" => AuditAction::StatusChanged,
            "approval.decision" => AuditAction::ApprovalDecision,
            "budget.saved" => AuditAction::BudgetSaved,
            "report.generated" => AuditAction::ReportGenerated,
            other => {
                log::warn!("unknown audit action value {other:?} from backend");
                AuditAction::Unknown(other.to_string())
            }
        }
    }
}

impl Serialize for AuditAction {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for AuditAction {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(AuditAction::from_wire(&raw))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub id: Uuid,
    pub action: AuditAction,
    pub details: String,
    pub actor_id: Option<Uuid>,
    pub actor_name: String,
    pub target_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    pub action: Option<String>,
    pub actor_id: Option<Uuid>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl AuditQuery {
    pub fn matches(&self, event: &AuditEvent) -> bool {
        if let Some(action) = &self.action {
            if event.action.as_wire() != action {
                return false;
            }
        }
        if let Some(actor_id) = self.actor_id {
            if event.actor_id != Some(actor_id) {
                return false;
            }
        }
        if let Some(since) = self.since {
            if event.timestamp < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if event.timestamp > until {
                return false;
            }
        }
        true
    }
}

/// Best-effort append invoked from every module's mutation path. A failed
/// audit write is logged, never surfaced to the caller whose mutation
/// already succeeded.
pub async fn record(
    state: &AppState,
    action: AuditAction,
    details: String,
    actor: &Actor,
    target_id: Option<Uuid>,
) {
    if let Err(e) = state
        .audit
        .record(action.clone(), details, actor, target_id)
        .await
    {
        log::error!("failed to record audit event {}: {e}", action.as_wire());
    }
}

pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuditQuery>,
) -> Json<Vec<AuditEvent>> {
    Json(state.audit.list(query).await)
}

pub async fn export_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuditQuery>,
) -> Result<([(header::HeaderName, &'static str); 1], Vec<u8>), (StatusCode, String)> {
    let events = state.audit.list(query).await;

    let mut writer = csv::Writer::from_writer(vec![]);
    writer
        .write_record(["ID", "Timestamp", "Action", "Actor", "Target", "Details"])
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("CSV error: {e}")))?;
    for event in events {
        writer
            .write_record([
                event.id.to_string(),
                event.timestamp.to_rfc3339(),
                event.action.as_wire().to_string(),
                event.actor_name,
                event.target_id.map(|t| t.to_string()).unwrap_or_default(),
                event.details,
            ])
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("CSV error: {e}")))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("CSV error: {e}")))?;

    Ok(([(header::CONTENT_TYPE, "text/csv")], bytes))
}

pub fn configure_audit_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/audit", get(list_events))
        .route("/api/audit/export", get(export_events))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_wire_round_trip() {
        for action in [
            AuditAction::Login,
            AuditAction::Logout,
            AuditAction::UserCreated,
            AuditAction::UserUpdated,
            AuditAction::UserDeactivated,
            AuditAction::ApprovalDecision,
        ] {
            assert_eq!(AuditAction::from_wire(action.as_wire()), action);
        }
    }

    #[test]
    fn unknown_action_preserves_raw_value() {
        let action = AuditAction::from_wire("billing.invoiced");
        assert_eq!(action, AuditAction::Unknown("billing.invoiced".to_string()));
        assert_eq!(action.as_wire(), "billing.invoiced");
    }
}
