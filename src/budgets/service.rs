use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::pricing::Tier;
use super::{Budget, BudgetItem, BudgetStatus, UpdateBudgetRequest};
use crate::shared::schema::budgets;
use crate::shared::store::StoreError;
use crate::shared::utils::DbPool;

#[async_trait]
pub trait BudgetStore: Send + Sync {
    async fn list(&self) -> Vec<Budget>;
    async fn get(&self, id: Uuid) -> Option<Budget>;
    async fn create(&self, budget: Budget) -> Result<Budget, StoreError>;
    async fn update(&self, id: Uuid, changes: UpdateBudgetRequest) -> Result<Budget, StoreError>;
    async fn set_status(&self, id: Uuid, status: BudgetStatus) -> Result<Budget, StoreError>;
}

fn apply_changes(budget: &mut Budget, changes: UpdateBudgetRequest) {
    if let Some(client_name) = changes.client_name {
        budget.client_name = client_name;
    }
    if let Some(title) = changes.title {
        budget.title = title;
    }
    if let Some(items) = changes.items {
        budget.items = items;
    }
    budget.updated_at = Utc::now();
}

pub struct MemoryBudgetStore {
    rows: RwLock<Vec<Budget>>,
}

impl MemoryBudgetStore {
    pub fn new() -> Self {
        MemoryBudgetStore {
            rows: RwLock::new(Vec::new()),
        }
    }

    pub fn seeded() -> Self {
        let now = Utc::now();
        MemoryBudgetStore {
            rows: RwLock::new(vec![Budget {
                id: Uuid::new_v4(),
                client_name: "Acme".to_string(),
                title: "Website relaunch".to_string(),
                items: vec![
                    BudgetItem {
                        service_id: "web.corporate_site".to_string(),
                        tier: Tier::Standard,
                    },
                    BudgetItem {
                        service_id: "content.copywriting".to_string(),
                        tier: Tier::Fast,
                    },
                ],
                status: BudgetStatus::Draft,
                created_at: now,
                updated_at: now,
            }]),
        }
    }
}

impl Default for MemoryBudgetStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BudgetStore for MemoryBudgetStore {
    async fn list(&self) -> Vec<Budget> {
        let rows = self.rows.read().await;
        let mut all = rows.clone();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }

    async fn get(&self, id: Uuid) -> Option<Budget> {
        self.rows.read().await.iter().find(|b| b.id == id).cloned()
    }

    async fn create(&self, budget: Budget) -> Result<Budget, StoreError> {
        self.rows.write().await.push(budget.clone());
        Ok(budget)
    }

    async fn update(&self, id: Uuid, changes: UpdateBudgetRequest) -> Result<Budget, StoreError> {
        let mut rows = self.rows.write().await;
        let budget = rows
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(StoreError::NotFound("budget"))?;
        apply_changes(budget, changes);
        Ok(budget.clone())
    }

    async fn set_status(&self, id: Uuid, status: BudgetStatus) -> Result<Budget, StoreError> {
        let mut rows = self.rows.write().await;
        let budget = rows
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(StoreError::NotFound("budget"))?;
        budget.status = status;
        budget.updated_at = Utc::now();
        Ok(budget.clone())
    }
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = budgets)]
struct BudgetRow {
    id: Uuid,
    client_name: String,
    title: String,
    items: serde_json::Value,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BudgetRow {
    fn into_budget(self) -> Budget {
        let items: Vec<BudgetItem> = serde_json::from_value(self.items).unwrap_or_else(|e| {
            log::warn!("malformed budget items payload: {e}");
            Vec::new()
        });
        Budget {
            id: self.id,
            client_name: self.client_name,
            title: self.title,
            items,
            status: BudgetStatus::from_wire(&self.status),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn from_budget(budget: &Budget) -> Self {
        BudgetRow {
            id: budget.id,
            client_name: budget.client_name.clone(),
            title: budget.title.clone(),
            items: serde_json::to_value(&budget.items).unwrap_or_else(|_| serde_json::json!([])),
            status: budget.status.as_wire().to_string(),
            created_at: budget.created_at,
            updated_at: budget.updated_at,
        }
    }
}

pub struct PgBudgetStore {
    pool: DbPool,
}

impl PgBudgetStore {
    pub fn new(pool: DbPool) -> Self {
        PgBudgetStore { pool }
    }

    fn load(&self, id: Uuid) -> Result<Budget, StoreError> {
        let mut conn = self.pool.get()?;
        budgets::table
            .filter(budgets::id.eq(id))
            .first::<BudgetRow>(&mut conn)
            .map(BudgetRow::into_budget)
            .map_err(|_| StoreError::NotFound("budget"))
    }
}

#[async_trait]
impl BudgetStore for PgBudgetStore {
    async fn list(&self) -> Vec<Budget> {
        let mut conn = match self.pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                log::error!("budget list degraded to empty: {e}");
                return Vec::new();
            }
        };
        match budgets::table
            .order(budgets::created_at.desc())
            .load::<BudgetRow>(&mut conn)
        {
            Ok(rows) => rows.into_iter().map(BudgetRow::into_budget).collect(),
            Err(e) => {
                log::error!("budget list degraded to empty: {e}");
                Vec::new()
            }
        }
    }

    async fn get(&self, id: Uuid) -> Option<Budget> {
        self.load(id).ok()
    }

    async fn create(&self, budget: Budget) -> Result<Budget, StoreError> {
        let mut conn = self.pool.get()?;
        diesel::insert_into(budgets::table)
            .values(BudgetRow::from_budget(&budget))
            .execute(&mut conn)?;
        Ok(budget)
    }

    async fn update(&self, id: Uuid, changes: UpdateBudgetRequest) -> Result<Budget, StoreError> {
        let mut budget = self.load(id)?;
        apply_changes(&mut budget, changes);

        let mut conn = self.pool.get()?;
        let row = BudgetRow::from_budget(&budget);
        diesel::update(budgets::table.filter(budgets::id.eq(id)))
            .set((
                budgets::client_name.eq(row.client_name),
                budgets::title.eq(row.title),
                budgets::items.eq(row.items),
                budgets::updated_at.eq(row.updated_at),
            ))
            .execute(&mut conn)?;
        Ok(budget)
    }

    async fn set_status(&self, id: Uuid, status: BudgetStatus) -> Result<Budget, StoreError> {
        let mut conn = self.pool.get()?;
        diesel::update(budgets::table.filter(budgets::id.eq(id)))
            .set((
                budgets::status.eq(status.as_wire().to_string()),
                budgets::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;
        self.load(id)
    }
}
