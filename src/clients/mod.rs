pub mod service;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::audit::{self, AuditAction};
use crate::intake::IntakeQuery;
use crate::shared::actor::require_actor;
use crate::shared::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientStatus {
    Active,
    Paused,
    Churned,
    Unknown(String),
}

impl ClientStatus {
    pub fn as_wire(&self) -> &str {
        match self {
            ClientStatus::Active => "active",
            ClientStatus::Paused => "paused",
            ClientStatus::Churned => "churned",
            ClientStatus::Unknown(raw) => raw,
        }
    }

    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "active" => ClientStatus::Active,
            "paused" => ClientStatus::Paused,
            "churned" => ClientStatus::Churned,
            other => {
                log::warn!("unknown client status value {other:?} from backend");
                ClientStatus::Unknown(other.to_string())
            }
        }
    }
}

impl Serialize for ClientStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for ClientStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ClientStatus::from_wire(&raw))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractStatus {
    Draft,
    Active,
    Completed,
    Cancelled,
    Unknown(String),
}

impl ContractStatus {
    pub fn as_wire(&self) -> &str {
        match self {
            ContractStatus::Draft => "draft",
            ContractStatus::Active => "active",
            ContractStatus::Completed => "completed",
            ContractStatus::Cancelled => "cancelled",
            ContractStatus::Unknown(raw) => raw,
        }
    }

    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "draft" => ContractStatus::Draft,
            "active" => ContractStatus::Active,
            "completed" => ContractStatus::Completed,
            "cancelled" => ContractStatus::Cancelled,
            other => {
                log::warn!("unknown contract status value {other:?} from backend");
                ContractStatus::Unknown(other.to_string())
            }
        }
    }
}

impl Serialize for ContractStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for ContractStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ContractStatus::from_wire(&raw))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    pub contact_email: String,
    pub status: ClientStatus,
    pub owner_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: Uuid,
    pub client_id: Uuid,
    pub title: String,
    pub value: f64,
    pub status: ContractStatus,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientRequest {
    pub name: String,
    pub contact_email: String,
    pub owner_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClientRequest {
    pub name: Option<String>,
    pub contact_email: Option<String>,
    pub status: Option<ClientStatus>,
    pub owner_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContractRequest {
    pub client_id: Uuid,
    pub title: String,
    pub value: f64,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContractRequest {
    pub title: Option<String>,
    pub value: Option<f64>,
    pub status: Option<ContractStatus>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Everything the client detail page renders, assembled server-side from
/// parallel full-collection reads and filtered here by client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientOverview {
    pub client: Client,
    pub contracts: Vec<Contract>,
    pub contract_value: f64,
    pub open_intake: usize,
    pub overdue_intake: usize,
    pub pending_approvals: usize,
    pub deliverables_total: usize,
    pub deliverables_complete: usize,
}

pub async fn list_clients(State(state): State<Arc<AppState>>) -> Json<Vec<Client>> {
    Json(state.clients.list().await)
}

pub async fn get_client(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Client>, (StatusCode, String)> {
    state
        .clients
        .get(id)
        .await
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Client not found".to_string()))
}

pub async fn create_client(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateClientRequest>,
) -> Result<Json<Client>, (StatusCode, String)> {
    let actor = require_actor(&state, &headers).await?;

    let client = Client {
        id: Uuid::new_v4(),
        name: req.name,
        contact_email: req.contact_email,
        status: ClientStatus::Active,
        owner_name: req.owner_name,
        created_at: Utc::now(),
    };

    let created = state.clients.create(client).await.map_err(|e| e.http())?;

    audit::record(
        &state,
        AuditAction::ItemCreated,
        format!("Client \"{}\"", created.name),
        &actor,
        Some(created.id),
    )
    .await;

    Ok(Json(created))
}

pub async fn update_client(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateClientRequest>,
) -> Result<Json<Client>, (StatusCode, String)> {
    let actor = require_actor(&state, &headers).await?;

    let updated = state.clients.update(id, req).await.map_err(|e| e.http())?;

    audit::record(
        &state,
        AuditAction::ItemUpdated,
        format!("Client \"{}\"", updated.name),
        &actor,
        Some(id),
    )
    .await;

    Ok(Json(updated))
}

pub async fn client_overview(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ClientOverview>, (StatusCode, String)> {
    let client = state
        .clients
        .get(id)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Client not found".to_string()))?;

    let intake_query = IntakeQuery {
        client: Some(client.name.clone()),
        ..IntakeQuery::default()
    };
    let (contracts, intake, approvals, deliverables) = tokio::join!(
        state.contracts.list_for_client(id),
        state.intake.list(intake_query),
        state.approvals.list(),
        state.deliverables.list(),
    );

    let now = Utc::now();
    let contract_value = contracts
        .iter()
        .filter(|c| c.status == ContractStatus::Active)
        .map(|c| c.value)
        .sum();
    let open_intake = intake.iter().filter(|i| i.status.is_open()).count();
    let overdue_intake = intake.iter().filter(|i| i.is_overdue(now)).count();
    let pending_approvals = approvals
        .iter()
        .filter(|a| a.client == client.name && a.status == crate::approvals::ApprovalStatus::Pending)
        .count();
    let client_deliverables: Vec<_> = deliverables
        .iter()
        .filter(|d| d.client_name == client.name)
        .collect();
    let deliverables_total = client_deliverables.len();
    let deliverables_complete = client_deliverables
        .iter()
        .filter(|d| d.is_complete())
        .count();

    Ok(Json(ClientOverview {
        client,
        contracts,
        contract_value,
        open_intake,
        overdue_intake,
        pending_approvals,
        deliverables_total,
        deliverables_complete,
    }))
}

pub async fn list_contracts(State(state): State<Arc<AppState>>) -> Json<Vec<Contract>> {
    Json(state.contracts.list().await)
}

pub async fn get_contract(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Contract>, (StatusCode, String)> {
    state
        .contracts
        .get(id)
        .await
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Contract not found".to_string()))
}

pub async fn create_contract(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateContractRequest>,
) -> Result<Json<Contract>, (StatusCode, String)> {
    let actor = require_actor(&state, &headers).await?;

    if state.clients.get(req.client_id).await.is_none() {
        return Err((StatusCode::NOT_FOUND, "Client not found".to_string()));
    }

    let contract = Contract {
        id: Uuid::new_v4(),
        client_id: req.client_id,
        title: req.title,
        value: req.value,
        status: ContractStatus::Draft,
        start_date: req.start_date,
        end_date: req.end_date,
        created_at: Utc::now(),
    };

    let created = state
        .contracts
        .create(contract)
        .await
        .map_err(|e| e.http())?;

    audit::record(
        &state,
        AuditAction::ItemCreated,
        format!("Contract \"{}\"", created.title),
        &actor,
        Some(created.id),
    )
    .await;

    Ok(Json(created))
}

pub async fn update_contract(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateContractRequest>,
) -> Result<Json<Contract>, (StatusCode, String)> {
    let actor = require_actor(&state, &headers).await?;

    let status_change = req.status.clone();
    let updated = state
        .contracts
        .update(id, req)
        .await
        .map_err(|e| e.http())?;

    let action = if status_change.is_some() {
        AuditAction::StatusChanged
    } else {
        AuditAction::ItemUpdated
    };
    audit::record(
        &state,
        action,
        format!("Contract \"{}\"", updated.title),
        &actor,
        Some(id),
    )
    .await;

    Ok(Json(updated))
}

pub fn configure_clients_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/clients", get(list_clients).post(create_client))
        .route("/api/clients/:id", get(get_client).put(update_client))
        .route("/api/clients/:id/overview", get(client_overview))
        .route("/api/contracts", get(list_contracts).post(create_contract))
        .route("/api/contracts/:id", get(get_contract).put(update_contract))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_wire_round_trips() {
        for raw in ["active", "paused", "churned"] {
            assert_eq!(ClientStatus::from_wire(raw).as_wire(), raw);
        }
        for raw in ["draft", "active", "completed", "cancelled"] {
            assert_eq!(ContractStatus::from_wire(raw).as_wire(), raw);
        }
    }

    #[test]
    fn unknown_statuses_keep_their_raw_value() {
        let status = ClientStatus::from_wire("prospect");
        assert_eq!(status, ClientStatus::Unknown("prospect".to_string()));
        assert_eq!(status.as_wire(), "prospect");

        let status = ContractStatus::from_wire("suspended");
        assert_eq!(status.as_wire(), "suspended");
    }
}
