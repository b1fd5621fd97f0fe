use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Approval, ApprovalEvent, ApprovalEventKind, ApprovalStatus};
use crate::shared::schema::{approval_events, approvals};
use crate::shared::store::StoreError;
use crate::shared::utils::{opaque_token, DbPool};

#[async_trait]
pub trait ApprovalStore: Send + Sync {
    async fn list(&self) -> Vec<Approval>;
    async fn get(&self, id: Uuid) -> Option<Approval>;
    async fn find_by_token(&self, token: &str) -> Option<Approval>;
    async fn create(&self, approval: Approval) -> Result<Approval, StoreError>;
    async fn set_status(&self, id: Uuid, status: ApprovalStatus) -> Result<Approval, StoreError>;
    /// History is append-only; existing events are never edited or removed.
    async fn append_event(&self, event: ApprovalEvent) -> Result<ApprovalEvent, StoreError>;
    /// Newest-first.
    async fn history(&self, approval_id: Uuid) -> Vec<ApprovalEvent>;
}

pub struct MemoryApprovalStore {
    rows: RwLock<Vec<Approval>>,
    events: RwLock<Vec<ApprovalEvent>>,
}

impl MemoryApprovalStore {
    pub fn new() -> Self {
        MemoryApprovalStore {
            rows: RwLock::new(Vec::new()),
            events: RwLock::new(Vec::new()),
        }
    }

    pub fn seeded() -> Self {
        let now = Utc::now();
        let mut rows = Vec::new();
        let mut events = Vec::new();
        for (title, client, days_ago) in [
            ("Homepage hero concept", "Acme", 3),
            ("Q3 budget proposal", "Northwind", 1),
        ] {
            let created = now - Duration::days(days_ago);
            let approval = Approval {
                id: Uuid::new_v4(),
                title: title.to_string(),
                description: format!("{title} awaiting client sign-off"),
                client: client.to_string(),
                status: ApprovalStatus::Pending,
                due_date: Some(created + Duration::days(7)),
                token: opaque_token(),
                created_at: created,
            };
            events.insert(
                0,
                ApprovalEvent {
                    id: Uuid::new_v4(),
                    approval_id: approval.id,
                    kind: ApprovalEventKind::Created,
                    description: "Created".to_string(),
                    occurred_at: created,
                },
            );
            rows.push(approval);
        }
        MemoryApprovalStore {
            rows: RwLock::new(rows),
            events: RwLock::new(events),
        }
    }
}

impl Default for MemoryApprovalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ApprovalStore for MemoryApprovalStore {
    async fn list(&self) -> Vec<Approval> {
        let rows = self.rows.read().await;
        let mut all = rows.clone();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }

    async fn get(&self, id: Uuid) -> Option<Approval> {
        self.rows.read().await.iter().find(|a| a.id == id).cloned()
    }

    async fn find_by_token(&self, token: &str) -> Option<Approval> {
        self.rows
            .read()
            .await
            .iter()
            .find(|a| a.token == token)
            .cloned()
    }

    async fn create(&self, approval: Approval) -> Result<Approval, StoreError> {
        self.rows.write().await.push(approval.clone());
        Ok(approval)
    }

    async fn set_status(&self, id: Uuid, status: ApprovalStatus) -> Result<Approval, StoreError> {
        let mut rows = self.rows.write().await;
        let approval = rows
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(StoreError::NotFound("approval"))?;
        approval.status = status;
        Ok(approval.clone())
    }

    async fn append_event(&self, event: ApprovalEvent) -> Result<ApprovalEvent, StoreError> {
        // Prepend: history reads back newest-first without re-sorting.
        self.events.write().await.insert(0, event.clone());
        Ok(event)
    }

    async fn history(&self, approval_id: Uuid) -> Vec<ApprovalEvent> {
        self.events
            .read()
            .await
            .iter()
            .filter(|e| e.approval_id == approval_id)
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = approvals)]
struct ApprovalRow {
    id: Uuid,
    title: String,
    description: String,
    client: String,
    status: String,
    due_date: Option<DateTime<Utc>>,
    token: String,
    created_at: DateTime<Utc>,
}

impl ApprovalRow {
    fn into_approval(self) -> Approval {
        Approval {
            id: self.id,
            title: self.title,
            description: self.description,
            client: self.client,
            status: ApprovalStatus::from_wire(&self.status),
            due_date: self.due_date,
            token: self.token,
            created_at: self.created_at,
        }
    }

    fn from_approval(approval: &Approval) -> Self {
        ApprovalRow {
            id: approval.id,
            title: approval.title.clone(),
            description: approval.description.clone(),
            client: approval.client.clone(),
            status: approval.status.as_wire().to_string(),
            due_date: approval.due_date,
            token: approval.token.clone(),
            created_at: approval.created_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = approval_events)]
struct ApprovalEventRow {
    id: Uuid,
    approval_id: Uuid,
    kind: String,
    description: String,
    occurred_at: DateTime<Utc>,
}

impl ApprovalEventRow {
    fn into_event(self) -> ApprovalEvent {
        ApprovalEvent {
            id: self.id,
            approval_id: self.approval_id,
            kind: ApprovalEventKind::from_wire(&self.kind),
            description: self.description,
            occurred_at: self.occurred_at,
        }
    }
}

pub struct PgApprovalStore {
    pool: DbPool,
}

impl PgApprovalStore {
    pub fn new(pool: DbPool) -> Self {
        PgApprovalStore { pool }
    }
}

#[async_trait]
impl ApprovalStore for PgApprovalStore {
    async fn list(&self) -> Vec<Approval> {
        let mut conn = match self.pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                log::error!("approval list degraded to empty: {e}");
                return Vec::new();
            }
        };
        match approvals::table
            .order(approvals::created_at.desc())
            .load::<ApprovalRow>(&mut conn)
        {
            Ok(rows) => rows.into_iter().map(ApprovalRow::into_approval).collect(),
            Err(e) => {
                log::error!("approval list degraded to empty: {e}");
                Vec::new()
            }
        }
    }

    async fn get(&self, id: Uuid) -> Option<Approval> {
        let mut conn = self.pool.get().ok()?;
        approvals::table
            .filter(approvals::id.eq(id))
            .first::<ApprovalRow>(&mut conn)
            .ok()
            .map(ApprovalRow::into_approval)
    }

    async fn find_by_token(&self, token: &str) -> Option<Approval> {
        let mut conn = self.pool.get().ok()?;
        approvals::table
            .filter(approvals::token.eq(token))
            .first::<ApprovalRow>(&mut conn)
            .ok()
            .map(ApprovalRow::into_approval)
    }

    async fn create(&self, approval: Approval) -> Result<Approval, StoreError> {
        let mut conn = self.pool.get()?;
        diesel::insert_into(approvals::table)
            .values(ApprovalRow::from_approval(&approval))
            .execute(&mut conn)?;
        Ok(approval)
    }

    async fn set_status(&self, id: Uuid, status: ApprovalStatus) -> Result<Approval, StoreError> {
        let mut conn = self.pool.get()?;
        diesel::update(approvals::table.filter(approvals::id.eq(id)))
            .set(approvals::status.eq(status.as_wire().to_string()))
            .execute(&mut conn)?;
        approvals::table
            .filter(approvals::id.eq(id))
            .first::<ApprovalRow>(&mut conn)
            .map(ApprovalRow::into_approval)
            .map_err(|_| StoreError::NotFound("approval"))
    }

    async fn append_event(&self, event: ApprovalEvent) -> Result<ApprovalEvent, StoreError> {
        let mut conn = self.pool.get()?;
        let row = ApprovalEventRow {
            id: event.id,
            approval_id: event.approval_id,
            kind: event.kind.as_wire().to_string(),
            description: event.description.clone(),
            occurred_at: event.occurred_at,
        };
        diesel::insert_into(approval_events::table)
            .values(&row)
            .execute(&mut conn)?;
        Ok(event)
    }

    async fn history(&self, approval_id: Uuid) -> Vec<ApprovalEvent> {
        let mut conn = match self.pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                log::error!("approval history degraded to empty: {e}");
                return Vec::new();
            }
        };
        match approval_events::table
            .filter(approval_events::approval_id.eq(approval_id))
            .order(approval_events::occurred_at.desc())
            .load::<ApprovalEventRow>(&mut conn)
        {
            Ok(rows) => rows.into_iter().map(ApprovalEventRow::into_event).collect(),
            Err(e) => {
                log::error!("approval history degraded to empty: {e}");
                Vec::new()
            }
        }
    }
}
