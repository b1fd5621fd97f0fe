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
use crate::clients::{ClientStatus, ContractStatus};
use crate::intake::IntakeQuery;
use crate::shared::actor::require_actor;
use crate::shared::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportStatus {
    Requested,
    Generated,
    Approved,
    Sent,
    Unknown(String),
}

impl ReportStatus {
    pub fn as_wire(&self) -> &str {
        match self {
            ReportStatus::Requested => "requested",
            ReportStatus::Generated => "generated",
            ReportStatus::Approved => "approved",
            ReportStatus::Sent => "sent",
            ReportStatus::Unknown(raw) => raw,
        }
    }

    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "requested" => ReportStatus::Requested,
            "generated" => ReportStatus::Generated,
            "approved" => ReportStatus::Approved,
            "sent" => ReportStatus::Sent,
            other => {
                log::warn!("unknown report status value {other:?} from backend");
                ReportStatus::Unknown(other.to_string())
            }
        }
    }

    /// The lifecycle only moves forward, one step at a time.
    pub fn can_advance_to(&self, next: &ReportStatus) -> bool {
        matches!(
            (self, next),
            (ReportStatus::Requested, ReportStatus::Generated)
                | (ReportStatus::Generated, ReportStatus::Approved)
                | (ReportStatus::Approved, ReportStatus::Sent)
        )
    }
}

impl Serialize for ReportStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for ReportStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ReportStatus::from_wire(&raw))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    pub title: String,
    pub period: String,
    pub narrative: Option<String>,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    pub title: String,
    pub period: String,
}

/// The dashboard numbers, computed on demand from parallel full-collection
/// reads. Nothing here is persisted.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiSnapshot {
    pub period: String,
    pub active_clients: usize,
    pub open_intake: usize,
    pub overdue_intake: usize,
    pub pending_approvals: usize,
    pub contract_value: f64,
    pub deliverables_complete: usize,
    pub deliverables_total: usize,
}

pub async fn compute_kpis(state: &AppState) -> KpiSnapshot {
    let (clients, contracts, intake, approvals, deliverables) = tokio::join!(
        state.clients.list(),
        state.contracts.list(),
        state.intake.list(IntakeQuery::default()),
        state.approvals.list(),
        state.deliverables.list(),
    );

    let now = Utc::now();
    KpiSnapshot {
        period: now.format("%Y-%m").to_string(),
        active_clients: clients
            .iter()
            .filter(|c| c.status == ClientStatus::Active)
            .count(),
        open_intake: intake.iter().filter(|i| i.status.is_open()).count(),
        overdue_intake: intake.iter().filter(|i| i.is_overdue(now)).count(),
        pending_approvals: approvals
            .iter()
            .filter(|a| a.status == crate::approvals::ApprovalStatus::Pending)
            .count(),
        contract_value: contracts
            .iter()
            .filter(|c| c.status == ContractStatus::Active)
            .map(|c| c.value)
            .sum(),
        deliverables_complete: deliverables.iter().filter(|d| d.is_complete()).count(),
        deliverables_total: deliverables.len(),
    }
}

pub async fn kpis(State(state): State<Arc<AppState>>) -> Json<KpiSnapshot> {
    Json(compute_kpis(&state).await)
}

pub async fn list_reports(State(state): State<Arc<AppState>>) -> Json<Vec<Report>> {
    Json(state.reports.list().await)
}

pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Report>, (StatusCode, String)> {
    state
        .reports
        .get(id)
        .await
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Report not found".to_string()))
}

pub async fn create_report(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateReportRequest>,
) -> Result<Json<Report>, (StatusCode, String)> {
    let actor = require_actor(&state, &headers).await?;

    let now = Utc::now();
    let report = Report {
        id: Uuid::new_v4(),
        title: req.title,
        period: req.period,
        narrative: None,
        status: ReportStatus::Requested,
        created_at: now,
        updated_at: now,
    };

    let created = state.reports.create(report).await.map_err(|e| e.http())?;

    audit::record(
        &state,
        AuditAction::ItemCreated,
        format!("Report \"{}\" for {}", created.title, created.period),
        &actor,
        Some(created.id),
    )
    .await;

    Ok(Json(created))
}

async fn advance_report(
    state: &AppState,
    id: Uuid,
    next: ReportStatus,
    narrative: Option<String>,
) -> Result<Report, (StatusCode, String)> {
    let report = state
        .reports
        .get(id)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Report not found".to_string()))?;

    if !report.status.can_advance_to(&next) {
        return Err((
            StatusCode::CONFLICT,
            format!(
                "Report cannot move from {} to {}",
                report.status.as_wire(),
                next.as_wire()
            ),
        ));
    }

    state
        .reports
        .set_status(id, next, narrative)
        .await
        .map_err(|e| e.http())
}

/// Generate the narrative and advance Requested -> Generated. The KPI
/// snapshot is summarized into the prompt; without an API key the client
/// hands back its fixed fallback note instead of failing.
pub async fn generate_report(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Report>, (StatusCode, String)> {
    let actor = require_actor(&state, &headers).await?;

    let report = state
        .reports
        .get(id)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Report not found".to_string()))?;

    let snapshot = compute_kpis(&state).await;
    let prompt = format!(
        "Write a short operations narrative for the report \"{}\" covering {}. \
         Active clients: {}. Open intake items: {} ({} overdue). Pending \
         approvals: {}. Active contract value: {:.2}. Deliverables complete: \
         {} of {}.",
        report.title,
        report.period,
        snapshot.active_clients,
        snapshot.open_intake,
        snapshot.overdue_intake,
        snapshot.pending_approvals,
        snapshot.contract_value,
        snapshot.deliverables_complete,
        snapshot.deliverables_total,
    );
    let narrative = state
        .ai
        .complete(&prompt)
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, e.to_string()))?;

    let updated = advance_report(&state, id, ReportStatus::Generated, Some(narrative)).await?;

    audit::record(
        &state,
        AuditAction::ReportGenerated,
        format!("Report \"{}\"", updated.title),
        &actor,
        Some(id),
    )
    .await;

    Ok(Json(updated))
}

pub async fn approve_report(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Report>, (StatusCode, String)> {
    let actor = require_actor(&state, &headers).await?;

    let updated = advance_report(&state, id, ReportStatus::Approved, None).await?;

    audit::record(
        &state,
        AuditAction::StatusChanged,
        format!("Report \"{}\" approved", updated.title),
        &actor,
        Some(id),
    )
    .await;

    Ok(Json(updated))
}

pub async fn send_report(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Report>, (StatusCode, String)> {
    let actor = require_actor(&state, &headers).await?;

    let updated = advance_report(&state, id, ReportStatus::Sent, None).await?;

    audit::record(
        &state,
        AuditAction::StatusChanged,
        format!("Report \"{}\" sent", updated.title),
        &actor,
        Some(id),
    )
    .await;

    Ok(Json(updated))
}

pub async fn delete_report(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let actor = require_actor(&state, &headers).await?;

    state.reports.delete(id).await.map_err(|e| e.http())?;

    audit::record(
        &state,
        AuditAction::ItemUpdated,
        "Report deleted".to_string(),
        &actor,
        Some(id),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

pub fn configure_reporting_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/reporting/kpis", get(kpis))
        .route("/api/reporting/reports", get(list_reports).post(create_report))
        .route(
            "/api/reporting/reports/:id",
            get(get_report).delete(delete_report),
        )
        .route("/api/reporting/reports/:id/generate", post(generate_report))
        .route("/api/reporting/reports/:id/approve", post(approve_report))
        .route("/api/reporting/reports/:id/send", post(send_report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_moves_forward_only() {
        assert!(ReportStatus::Requested.can_advance_to(&ReportStatus::Generated));
        assert!(ReportStatus::Generated.can_advance_to(&ReportStatus::Approved));
        assert!(ReportStatus::Approved.can_advance_to(&ReportStatus::Sent));

        assert!(!ReportStatus::Generated.can_advance_to(&ReportStatus::Requested));
        assert!(!ReportStatus::Requested.can_advance_to(&ReportStatus::Approved));
        assert!(!ReportStatus::Sent.can_advance_to(&ReportStatus::Sent));
        assert!(!ReportStatus::Sent.can_advance_to(&ReportStatus::Generated));
    }

    #[test]
    fn unknown_status_never_advances() {
        let odd = ReportStatus::Unknown("archived".to_string());
        assert!(!odd.can_advance_to(&ReportStatus::Generated));
        assert!(!ReportStatus::Requested.can_advance_to(&odd));
    }
}
