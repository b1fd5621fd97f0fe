pub mod pricing;
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
use pricing::{price_budget, PricedBudget, Tier, RATE_TABLE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BudgetStatus {
    Draft,
    Sent,
    Accepted,
    Unknown(String),
}

impl BudgetStatus {
    pub fn as_wire(&self) -> &str {
        match self {
            BudgetStatus::Draft => "draft",
            BudgetStatus::Sent => "sent",
            BudgetStatus::Accepted => "accepted",
            BudgetStatus::Unknown(raw) => raw,
        }
    }

    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "draft" => BudgetStatus::Draft,
            "sent" => BudgetStatus::Sent,
            "accepted" => BudgetStatus::Accepted,
            other => {
                log::warn!("unknown budget status value {other:?} from backend");
                BudgetStatus::Unknown(other.to_string())
            }
        }
    }
}

impl Serialize for BudgetStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for BudgetStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(BudgetStatus::from_wire(&raw))
    }
}

/// One selected service with its chosen tier. The `items` list is the
/// persisted source of truth; pricing is always derived, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetItem {
    pub service_id: String,
    pub tier: Tier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: Uuid,
    pub client_name: String,
    pub title: String,
    pub items: Vec<BudgetItem>,
    pub status: BudgetStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Budget {
    pub fn priced(&self) -> PricedBudget {
        price_budget(&self.items)
    }
}

/// The budget plus its derived pricing, served to every consumer (builder
/// preview, JSON export, totals) from the same computation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedBudgetView {
    #[serde(flatten)]
    pub budget: Budget,
    pub pricing: PricedBudget,
}

impl From<Budget> for PricedBudgetView {
    fn from(budget: Budget) -> Self {
        let pricing = budget.priced();
        PricedBudgetView { budget, pricing }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBudgetRequest {
    pub client_name: String,
    pub title: String,
    pub items: Option<Vec<BudgetItem>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBudgetRequest {
    pub client_name: Option<String>,
    pub title: Option<String>,
    pub items: Option<Vec<BudgetItem>>,
}

#[derive(Debug, Deserialize)]
pub struct SetBudgetStatusRequest {
    pub status: BudgetStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateCardEntry {
    pub service_id: &'static str,
    pub label: &'static str,
    pub category: pricing::ServiceCategory,
    pub base_hours: f64,
    pub base_price: f64,
}

pub async fn list_budgets(State(state): State<Arc<AppState>>) -> Json<Vec<PricedBudgetView>> {
    let budgets = state.budgets.list().await;
    Json(budgets.into_iter().map(PricedBudgetView::from).collect())
}

pub async fn get_budget(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<PricedBudgetView>, (StatusCode, String)> {
    state
        .budgets
        .get(id)
        .await
        .map(|b| Json(PricedBudgetView::from(b)))
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Budget not found".to_string()))
}

pub async fn create_budget(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateBudgetRequest>,
) -> Result<Json<PricedBudgetView>, (StatusCode, String)> {
    let actor = require_actor(&state, &headers).await?;

    let now = Utc::now();
    let budget = Budget {
        id: Uuid::new_v4(),
        client_name: req.client_name,
        title: req.title,
        items: req.items.unwrap_or_default(),
        status: BudgetStatus::Draft,
        created_at: now,
        updated_at: now,
    };

    let created = state.budgets.create(budget).await.map_err(|e| e.http())?;

    audit::record(
        &state,
        AuditAction::BudgetSaved,
        format!("Budget \"{}\" for {}", created.title, created.client_name),
        &actor,
        Some(created.id),
    )
    .await;

    Ok(Json(PricedBudgetView::from(created)))
}

pub async fn update_budget(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBudgetRequest>,
) -> Result<Json<PricedBudgetView>, (StatusCode, String)> {
    let actor = require_actor(&state, &headers).await?;

    let updated = state.budgets.update(id, req).await.map_err(|e| e.http())?;

    audit::record(
        &state,
        AuditAction::BudgetSaved,
        format!("Saved budget \"{}\"", updated.title),
        &actor,
        Some(id),
    )
    .await;

    Ok(Json(PricedBudgetView::from(updated)))
}

pub async fn set_budget_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<SetBudgetStatusRequest>,
) -> Result<Json<PricedBudgetView>, (StatusCode, String)> {
    let actor = require_actor(&state, &headers).await?;

    let updated = state
        .budgets
        .set_status(id, req.status)
        .await
        .map_err(|e| e.http())?;

    audit::record(
        &state,
        AuditAction::StatusChanged,
        format!(
            "Budget \"{}\" moved to {}",
            updated.title,
            updated.status.as_wire()
        ),
        &actor,
        Some(id),
    )
    .await;

    Ok(Json(PricedBudgetView::from(updated)))
}

/// Export view. Identical numbers to the builder preview because both run
/// through `Budget::priced`.
pub async fn export_budget(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<PricedBudget>, (StatusCode, String)> {
    state
        .budgets
        .get(id)
        .await
        .map(|b| Json(b.priced()))
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Budget not found".to_string()))
}

pub async fn rate_card() -> Json<Vec<RateCardEntry>> {
    let mut entries: Vec<RateCardEntry> = RATE_TABLE
        .iter()
        .map(|(id, rate)| RateCardEntry {
            service_id: id,
            label: rate.label,
            category: rate.category,
            base_hours: rate.base_hours,
            base_price: rate.base_price,
        })
        .collect();
    entries.sort_by(|a, b| a.service_id.cmp(b.service_id));
    Json(entries)
}

pub fn configure_budgets_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/budgets", get(list_budgets).post(create_budget))
        .route("/api/budgets/rates", get(rate_card))
        .route("/api/budgets/:id", get(get_budget).put(update_budget))
        .route("/api/budgets/:id/status", put(set_budget_status))
        .route("/api/budgets/:id/export", get(export_budget))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_and_preview_share_one_derivation() {
        let now = Utc::now();
        let budget = Budget {
            id: Uuid::new_v4(),
            client_name: "Acme".to_string(),
            title: "Site refresh".to_string(),
            items: vec![
                BudgetItem {
                    service_id: "web.landing_page".to_string(),
                    tier: Tier::Fast,
                },
                BudgetItem {
                    service_id: "branding.logo".to_string(),
                    tier: Tier::Standard,
                },
            ],
            status: BudgetStatus::Draft,
            created_at: now,
            updated_at: now,
        };
        let view = PricedBudgetView::from(budget.clone());
        let export = budget.priced();
        assert_eq!(view.pricing.total_price, export.total_price);
        assert_eq!(view.pricing.total_hours, export.total_hours);
        assert!((export.total_price - (420.0 + 900.0)).abs() < 1e-9);
        assert!((export.total_hours - (11.2 + 24.0)).abs() < 1e-9);
    }
}
