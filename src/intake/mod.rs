pub mod service;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::audit::{self, AuditAction};
use crate::shared::actor::require_actor;
use crate::shared::state::AppState;

pub const DEFAULT_SLA_HOURS: i64 = 24;

/// Largest client-supplied SLA offset accepted; one year.
pub const MAX_SLA_HOURS: i64 = 24 * 365;

/// An offset must be positive and within a year. `Duration::hours` panics on
/// overflow, so the bound is checked before any deadline is built.
pub fn valid_sla_hours(hours: i64) -> bool {
    (1..=MAX_SLA_HOURS).contains(&hours)
}

/// The SLA clock is fixed at creation and never recalculated afterwards.
pub fn sla_due(created_at: DateTime<Utc>, offset_hours: Option<i64>) -> DateTime<Utc> {
    created_at + Duration::hours(offset_hours.unwrap_or(DEFAULT_SLA_HOURS))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
    Unknown(String),
}

impl Priority {
    pub fn as_wire(&self) -> &str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
            Priority::Unknown(raw) => raw,
        }
    }

    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "low" => Priority::Low,
            "medium" => Priority::Medium,
            "high" => Priority::High,
            "critical" => Priority::Critical,
            other => {
                log::warn!("unknown priority value {other:?} from backend");
                Priority::Unknown(other.to_string())
            }
        }
    }
}

impl Serialize for Priority {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Priority::from_wire(&raw))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeStatus {
    New,
    Triaging,
    InProgress,
    Blocked,
    Resolved,
    Closed,
    Unknown(String),
}

impl IntakeStatus {
    pub fn as_wire(&self) -> &str {
        match self {
            IntakeStatus::New => "new",
            IntakeStatus::Triaging => "triaging",
            IntakeStatus::InProgress => "in_progress",
            IntakeStatus::Blocked => "blocked",
            IntakeStatus::Resolved => "resolved",
            IntakeStatus::Closed => "closed",
            IntakeStatus::Unknown(raw) => raw,
        }
    }

    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "new" => IntakeStatus::New,
            "triaging" => IntakeStatus::Triaging,
            "in_progress" => IntakeStatus::InProgress,
            "blocked" => IntakeStatus::Blocked,
            "resolved" => IntakeStatus::Resolved,
            "closed" => IntakeStatus::Closed,
            other => {
                log::warn!("unknown intake status value {other:?} from backend");
                IntakeStatus::Unknown(other.to_string())
            }
        }
    }

    pub fn as_view(&self) -> &str {
        match self {
            IntakeStatus::InProgress => "inProgress",
            other => other.as_wire(),
        }
    }

    pub fn from_view(raw: &str) -> Self {
        match raw {
            "inProgress" => IntakeStatus::InProgress,
            other => IntakeStatus::from_wire(other),
        }
    }

    /// Resolved and closed items are off the SLA clock.
    pub fn is_open(&self) -> bool {
        !matches!(self, IntakeStatus::Resolved | IntakeStatus::Closed)
    }
}

impl Serialize for IntakeStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_view())
    }
}

impl<'de> Deserialize<'de> for IntakeStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(IntakeStatus::from_view(&raw))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeItem {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub client: String,
    pub requestor: String,
    pub priority: Priority,
    pub status: IntakeStatus,
    pub sla_due_at: DateTime<Utc>,
    pub assignee: Option<String>,
    pub tags: Vec<String>,
    pub ai_triage: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IntakeItem {
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status.is_open() && self.sla_due_at < now
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntakeRequest {
    pub title: String,
    pub description: Option<String>,
    pub client: String,
    pub requestor: String,
    pub priority: Option<Priority>,
    pub tags: Option<Vec<String>>,
    pub assignee: Option<String>,
    /// Hours until the SLA due moment; defaults to 24 when absent.
    pub sla_hours: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIntakeRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: IntakeStatus,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub assignee: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntakeQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub assignee: Option<String>,
    pub client: Option<String>,
    pub search: Option<String>,
}

impl IntakeQuery {
    pub fn matches(&self, item: &IntakeItem) -> bool {
        if let Some(status) = &self.status {
            if item.status.as_view() != status && item.status.as_wire() != status {
                return false;
            }
        }
        if let Some(priority) = &self.priority {
            if item.priority.as_wire() != priority {
                return false;
            }
        }
        if let Some(assignee) = &self.assignee {
            if item.assignee.as_deref() != Some(assignee.as_str()) {
                return false;
            }
        }
        if let Some(client) = &self.client {
            if &item.client != client {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !item.title.to_lowercase().contains(&needle)
                && !item.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

pub async fn list_items(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IntakeQuery>,
) -> Json<Vec<IntakeItem>> {
    Json(state.intake.list(query).await)
}

pub async fn list_overdue(State(state): State<Arc<AppState>>) -> Json<Vec<IntakeItem>> {
    let now = Utc::now();
    let items = state
        .intake
        .list(IntakeQuery::default())
        .await
        .into_iter()
        .filter(|item| item.is_overdue(now))
        .collect();
    Json(items)
}

pub async fn get_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<IntakeItem>, (StatusCode, String)> {
    state
        .intake
        .get(id)
        .await
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Intake item not found".to_string()))
}

pub async fn create_item(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateIntakeRequest>,
) -> Result<Json<IntakeItem>, (StatusCode, String)> {
    let actor = require_actor(&state, &headers).await?;

    if let Some(hours) = req.sla_hours {
        if !valid_sla_hours(hours) {
            return Err((
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("slaHours must be between 1 and {MAX_SLA_HOURS}"),
            ));
        }
    }

    let now = Utc::now();
    let item = IntakeItem {
        id: Uuid::new_v4(),
        title: req.title,
        description: req.description.unwrap_or_default(),
        client: req.client,
        requestor: req.requestor,
        priority: req.priority.unwrap_or(Priority::Medium),
        status: IntakeStatus::New,
        sla_due_at: sla_due(now, req.sla_hours),
        assignee: req.assignee,
        tags: req.tags.unwrap_or_default(),
        ai_triage: None,
        created_at: now,
        updated_at: now,
    };

    let created = state.intake.create(item).await.map_err(|e| e.http())?;

    audit::record(
        &state,
        AuditAction::ItemCreated,
        format!("Intake item \"{}\" for {}", created.title, created.client),
        &actor,
        Some(created.id),
    )
    .await;

    Ok(Json(created))
}

pub async fn update_item(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateIntakeRequest>,
) -> Result<Json<IntakeItem>, (StatusCode, String)> {
    let actor = require_actor(&state, &headers).await?;

    let updated = state.intake.update(id, req).await.map_err(|e| e.http())?;

    audit::record(
        &state,
        AuditAction::ItemUpdated,
        format!("Updated intake item \"{}\"", updated.title),
        &actor,
        Some(id),
    )
    .await;

    Ok(Json(updated))
}

pub async fn set_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<SetStatusRequest>,
) -> Result<Json<IntakeItem>, (StatusCode, String)> {
    let actor = require_actor(&state, &headers).await?;

    let updated = state
        .intake
        .set_status(id, req.status)
        .await
        .map_err(|e| e.http())?;

    audit::record(
        &state,
        AuditAction::StatusChanged,
        format!(
            "Intake item \"{}\" moved to {}",
            updated.title,
            updated.status.as_view()
        ),
        &actor,
        Some(id),
    )
    .await;

    Ok(Json(updated))
}

pub async fn assign_item(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<AssignRequest>,
) -> Result<Json<IntakeItem>, (StatusCode, String)> {
    let actor = require_actor(&state, &headers).await?;

    let updated = state
        .intake
        .assign(id, req.assignee)
        .await
        .map_err(|e| e.http())?;

    audit::record(
        &state,
        AuditAction::ItemUpdated,
        match &updated.assignee {
            Some(assignee) => format!("Assigned \"{}\" to {assignee}", updated.title),
            None => format!("Unassigned \"{}\"", updated.title),
        },
        &actor,
        Some(id),
    )
    .await;

    Ok(Json(updated))
}

/// Attach an AI triage note. Without a configured key the AI client returns
/// its documented fallback string, which is stored like any other note.
pub async fn annotate_item(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<IntakeItem>, (StatusCode, String)> {
    let actor = require_actor(&state, &headers).await?;

    let item = state
        .intake
        .get(id)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Intake item not found".to_string()))?;

    let prompt = format!(
        "Triage this request for {} (priority {}): {}: {}. \
         Suggest a team and first step in two sentences.",
        item.client,
        item.priority.as_wire(),
        item.title,
        item.description
    );
    let note = state
        .ai
        .complete(&prompt)
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, format!("AI annotation failed: {e}")))?;

    let updated = state.intake.annotate(id, note).await.map_err(|e| e.http())?;

    audit::record(
        &state,
        AuditAction::ItemUpdated,
        format!("Annotated \"{}\"", updated.title),
        &actor,
        Some(id),
    )
    .await;

    Ok(Json(updated))
}

pub fn configure_intake_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/intake", get(list_items).post(create_item))
        .route("/api/intake/overdue", get(list_overdue))
        .route("/api/intake/:id", get(get_item).put(update_item))
        .route("/api/intake/:id/status", put(set_status))
        .route("/api/intake/:id/assign", put(assign_item))
        .route("/api/intake/:id/annotate", post(annotate_item))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sla_defaults_to_24_hours() {
        let created = Utc::now();
        assert_eq!(sla_due(created, None), created + Duration::hours(24));
        assert_eq!(sla_due(created, Some(4)), created + Duration::hours(4));
    }

    #[test]
    fn sla_offset_bounds_reject_overflow_candidates() {
        assert!(valid_sla_hours(1));
        assert!(valid_sla_hours(MAX_SLA_HOURS));
        assert!(!valid_sla_hours(0));
        assert!(!valid_sla_hours(-24));
        assert!(!valid_sla_hours(MAX_SLA_HOURS + 1));
        assert!(!valid_sla_hours(i64::MAX));
    }

    #[test]
    fn status_view_wire_translation() {
        assert_eq!(IntakeStatus::InProgress.as_wire(), "in_progress");
        assert_eq!(IntakeStatus::InProgress.as_view(), "inProgress");
        assert_eq!(
            IntakeStatus::from_view("inProgress"),
            IntakeStatus::InProgress
        );
        assert_eq!(
            IntakeStatus::from_wire("in_progress"),
            IntakeStatus::InProgress
        );
    }

    #[test]
    fn overdue_requires_open_status() {
        let now = Utc::now();
        let mut item = IntakeItem {
            id: Uuid::new_v4(),
            title: "Banner refresh".to_string(),
            description: String::new(),
            client: "Acme".to_string(),
            requestor: "pat@acme.test".to_string(),
            priority: Priority::High,
            status: IntakeStatus::InProgress,
            sla_due_at: now - Duration::hours(1),
            assignee: None,
            tags: vec![],
            ai_triage: None,
            created_at: now - Duration::hours(30),
            updated_at: now,
        };
        assert!(item.is_overdue(now));
        item.status = IntakeStatus::Resolved;
        assert!(!item.is_overdue(now));
    }
}
