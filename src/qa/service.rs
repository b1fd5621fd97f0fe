use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::checklist::ChecklistState;
use super::{Deliverable, DeliverableKind};
use crate::shared::schema::deliverables;
use crate::shared::store::StoreError;
use crate::shared::utils::DbPool;

#[async_trait]
pub trait DeliverableStore: Send + Sync {
    async fn list(&self) -> Vec<Deliverable>;
    async fn get(&self, id: Uuid) -> Option<Deliverable>;
    async fn create(&self, deliverable: Deliverable) -> Result<Deliverable, StoreError>;
    /// The whole completion map is persisted on every toggle; there is no
    /// per-key patching at the storage level.
    async fn save_checks(
        &self,
        id: Uuid,
        checks: ChecklistState,
    ) -> Result<Deliverable, StoreError>;
}

pub struct MemoryDeliverableStore {
    rows: RwLock<Vec<Deliverable>>,
}

impl MemoryDeliverableStore {
    pub fn new() -> Self {
        MemoryDeliverableStore {
            rows: RwLock::new(Vec::new()),
        }
    }

    pub fn seeded() -> Self {
        let now = Utc::now();
        let seed = |name: &str, client: &str, kind: DeliverableKind| Deliverable {
            id: Uuid::new_v4(),
            name: name.to_string(),
            client_name: client.to_string(),
            kind,
            checks: ChecklistState::new(),
            created_at: now,
            updated_at: now,
        };
        MemoryDeliverableStore {
            rows: RwLock::new(vec![
                seed("Checkout service v2", "Northwind", DeliverableKind::Software),
                seed("Brand refresh boards", "Acme", DeliverableKind::Design),
                seed("July performance report", "Lumon", DeliverableKind::Report),
            ]),
        }
    }
}

impl Default for MemoryDeliverableStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeliverableStore for MemoryDeliverableStore {
    async fn list(&self) -> Vec<Deliverable> {
        let rows = self.rows.read().await;
        let mut all = rows.clone();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }

    async fn get(&self, id: Uuid) -> Option<Deliverable> {
        self.rows.read().await.iter().find(|d| d.id == id).cloned()
    }

    async fn create(&self, deliverable: Deliverable) -> Result<Deliverable, StoreError> {
        self.rows.write().await.push(deliverable.clone());
        Ok(deliverable)
    }

    async fn save_checks(
        &self,
        id: Uuid,
        checks: ChecklistState,
    ) -> Result<Deliverable, StoreError> {
        let mut rows = self.rows.write().await;
        let deliverable = rows
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(StoreError::NotFound("deliverable"))?;
        deliverable.checks = checks;
        deliverable.updated_at = Utc::now();
        Ok(deliverable.clone())
    }
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = deliverables)]
struct DeliverableRow {
    id: Uuid,
    name: String,
    client_name: String,
    kind: String,
    checks: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DeliverableRow {
    fn into_deliverable(self) -> Deliverable {
        let checks: ChecklistState = serde_json::from_value(self.checks).unwrap_or_else(|e| {
            log::warn!("malformed checklist payload: {e}");
            ChecklistState::new()
        });
        Deliverable {
            id: self.id,
            name: self.name,
            client_name: self.client_name,
            kind: DeliverableKind::from_wire(&self.kind),
            checks,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn from_deliverable(deliverable: &Deliverable) -> Self {
        DeliverableRow {
            id: deliverable.id,
            name: deliverable.name.clone(),
            client_name: deliverable.client_name.clone(),
            kind: deliverable.kind.as_wire().to_string(),
            checks: serde_json::to_value(&deliverable.checks)
                .unwrap_or_else(|_| serde_json::json!({})),
            created_at: deliverable.created_at,
            updated_at: deliverable.updated_at,
        }
    }
}

pub struct PgDeliverableStore {
    pool: DbPool,
}

impl PgDeliverableStore {
    pub fn new(pool: DbPool) -> Self {
        PgDeliverableStore { pool }
    }

    fn load(&self, id: Uuid) -> Result<Deliverable, StoreError> {
        let mut conn = self.pool.get()?;
        deliverables::table
            .filter(deliverables::id.eq(id))
            .first::<DeliverableRow>(&mut conn)
            .map(DeliverableRow::into_deliverable)
            .map_err(|_| StoreError::NotFound("deliverable"))
    }
}

#[async_trait]
impl DeliverableStore for PgDeliverableStore {
    async fn list(&self) -> Vec<Deliverable> {
        let mut conn = match self.pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                log::error!("deliverable list degraded to empty: {e}");
                return Vec::new();
            }
        };
        match deliverables::table
            .order(deliverables::created_at.desc())
            .load::<DeliverableRow>(&mut conn)
        {
            Ok(rows) => rows
                .into_iter()
                .map(DeliverableRow::into_deliverable)
                .collect(),
            Err(e) => {
                log::error!("deliverable list degraded to empty: {e}");
                Vec::new()
            }
        }
    }

    async fn get(&self, id: Uuid) -> Option<Deliverable> {
        self.load(id).ok()
    }

    async fn create(&self, deliverable: Deliverable) -> Result<Deliverable, StoreError> {
        let mut conn = self.pool.get()?;
        diesel::insert_into(deliverables::table)
            .values(DeliverableRow::from_deliverable(&deliverable))
            .execute(&mut conn)?;
        Ok(deliverable)
    }

    async fn save_checks(
        &self,
        id: Uuid,
        checks: ChecklistState,
    ) -> Result<Deliverable, StoreError> {
        let payload = serde_json::to_value(&checks).unwrap_or_else(|_| serde_json::json!({}));
        let mut conn = self.pool.get()?;
        diesel::update(deliverables::table.filter(deliverables::id.eq(id)))
            .set((
                deliverables::checks.eq(payload),
                deliverables::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;
        self.load(id)
    }
}
