use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{IntakeItem, IntakeQuery, IntakeStatus, Priority, UpdateIntakeRequest};
use crate::shared::schema::intake_items;
use crate::shared::store::StoreError;
use crate::shared::utils::DbPool;

#[async_trait]
pub trait IntakeStore: Send + Sync {
    async fn list(&self, query: IntakeQuery) -> Vec<IntakeItem>;
    async fn get(&self, id: Uuid) -> Option<IntakeItem>;
    async fn create(&self, item: IntakeItem) -> Result<IntakeItem, StoreError>;
    async fn update(&self, id: Uuid, changes: UpdateIntakeRequest)
        -> Result<IntakeItem, StoreError>;
    async fn set_status(&self, id: Uuid, status: IntakeStatus) -> Result<IntakeItem, StoreError>;
    async fn assign(&self, id: Uuid, assignee: Option<String>) -> Result<IntakeItem, StoreError>;
    async fn annotate(&self, id: Uuid, note: String) -> Result<IntakeItem, StoreError>;
}

fn apply_changes(item: &mut IntakeItem, changes: UpdateIntakeRequest) {
    if let Some(title) = changes.title {
        item.title = title;
    }
    if let Some(description) = changes.description {
        item.description = description;
    }
    if let Some(priority) = changes.priority {
        item.priority = priority;
    }
    if let Some(tags) = changes.tags {
        item.tags = tags;
    }
    item.updated_at = Utc::now();
}

pub struct MemoryIntakeStore {
    rows: RwLock<Vec<IntakeItem>>,
}

impl MemoryIntakeStore {
    pub fn new() -> Self {
        MemoryIntakeStore {
            rows: RwLock::new(Vec::new()),
        }
    }

    pub fn seeded() -> Self {
        let now = Utc::now();
        let seed = |title: &str, client: &str, priority: Priority, status: IntakeStatus,
                    hours_ago: i64, sla_hours: i64|
         -> IntakeItem {
            let created = now - Duration::hours(hours_ago);
            IntakeItem {
                id: Uuid::new_v4(),
                title: title.to_string(),
                description: format!("{title} requested by {client}"),
                client: client.to_string(),
                requestor: format!("ops@{}.test", client.to_lowercase()),
                priority,
                status,
                sla_due_at: created + Duration::hours(sla_hours),
                assignee: None,
                tags: vec![],
                ai_triage: None,
                created_at: created,
                updated_at: created,
            }
        };
        MemoryIntakeStore {
            rows: RwLock::new(vec![
                seed("Landing page copy swap", "Acme", Priority::Medium, IntakeStatus::New, 2, 24),
                seed("Checkout bug triage", "Northwind", Priority::Critical, IntakeStatus::Triaging, 6, 8),
                seed("Q3 campaign assets", "Lumon", Priority::Low, IntakeStatus::InProgress, 30, 72),
                seed("Broken webhook", "Acme", Priority::High, IntakeStatus::Blocked, 40, 24),
            ]),
        }
    }
}

impl Default for MemoryIntakeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IntakeStore for MemoryIntakeStore {
    async fn list(&self, query: IntakeQuery) -> Vec<IntakeItem> {
        let rows = self.rows.read().await;
        let mut matched: Vec<IntakeItem> =
            rows.iter().filter(|i| query.matches(i)).cloned().collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matched
    }

    async fn get(&self, id: Uuid) -> Option<IntakeItem> {
        self.rows.read().await.iter().find(|i| i.id == id).cloned()
    }

    async fn create(&self, item: IntakeItem) -> Result<IntakeItem, StoreError> {
        self.rows.write().await.push(item.clone());
        Ok(item)
    }

    async fn update(
        &self,
        id: Uuid,
        changes: UpdateIntakeRequest,
    ) -> Result<IntakeItem, StoreError> {
        let mut rows = self.rows.write().await;
        let item = rows
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(StoreError::NotFound("intake item"))?;
        apply_changes(item, changes);
        Ok(item.clone())
    }

    async fn set_status(&self, id: Uuid, status: IntakeStatus) -> Result<IntakeItem, StoreError> {
        let mut rows = self.rows.write().await;
        let item = rows
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(StoreError::NotFound("intake item"))?;
        item.status = status;
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn assign(&self, id: Uuid, assignee: Option<String>) -> Result<IntakeItem, StoreError> {
        let mut rows = self.rows.write().await;
        let item = rows
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(StoreError::NotFound("intake item"))?;
        item.assignee = assignee;
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn annotate(&self, id: Uuid, note: String) -> Result<IntakeItem, StoreError> {
        let mut rows = self.rows.write().await;
        let item = rows
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(StoreError::NotFound("intake item"))?;
        item.ai_triage = Some(note);
        item.updated_at = Utc::now();
        Ok(item.clone())
    }
}

#[derive(Debug, Clone, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = intake_items)]
struct IntakeItemRow {
    id: Uuid,
    title: String,
    description: String,
    client: String,
    requestor: String,
    priority: String,
    status: String,
    sla_due_at: DateTime<Utc>,
    assignee: Option<String>,
    tags: Vec<String>,
    ai_triage: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl IntakeItemRow {
    fn into_item(self) -> IntakeItem {
        IntakeItem {
            id: self.id,
            title: self.title,
            description: self.description,
            client: self.client,
            requestor: self.requestor,
            priority: Priority::from_wire(&self.priority),
            status: IntakeStatus::from_wire(&self.status),
            sla_due_at: self.sla_due_at,
            assignee: self.assignee,
            tags: self.tags,
            ai_triage: self.ai_triage,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn from_item(item: &IntakeItem) -> Self {
        IntakeItemRow {
            id: item.id,
            title: item.title.clone(),
            description: item.description.clone(),
            client: item.client.clone(),
            requestor: item.requestor.clone(),
            priority: item.priority.as_wire().to_string(),
            status: item.status.as_wire().to_string(),
            sla_due_at: item.sla_due_at,
            assignee: item.assignee.clone(),
            tags: item.tags.clone(),
            ai_triage: item.ai_triage.clone(),
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

pub struct PgIntakeStore {
    pool: DbPool,
}

impl PgIntakeStore {
    pub fn new(pool: DbPool) -> Self {
        PgIntakeStore { pool }
    }

    fn load(&self, id: Uuid) -> Result<IntakeItem, StoreError> {
        let mut conn = self.pool.get()?;
        intake_items::table
            .filter(intake_items::id.eq(id))
            .first::<IntakeItemRow>(&mut conn)
            .map(IntakeItemRow::into_item)
            .map_err(|_| StoreError::NotFound("intake item"))
    }
}

#[async_trait]
impl IntakeStore for PgIntakeStore {
    async fn list(&self, query: IntakeQuery) -> Vec<IntakeItem> {
        let mut conn = match self.pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                log::error!("intake list degraded to empty: {e}");
                return Vec::new();
            }
        };

        let mut q = intake_items::table.into_boxed();
        if let Some(status) = &query.status {
            q = q.filter(
                intake_items::status.eq(IntakeStatus::from_view(status).as_wire().to_string()),
            );
        }
        if let Some(priority) = &query.priority {
            q = q.filter(intake_items::priority.eq(priority.clone()));
        }
        if let Some(assignee) = &query.assignee {
            q = q.filter(intake_items::assignee.eq(assignee.clone()));
        }
        if let Some(client) = &query.client {
            q = q.filter(intake_items::client.eq(client.clone()));
        }
        if let Some(search) = &query.search {
            let pattern = format!("%{search}%");
            q = q.filter(
                intake_items::title
                    .ilike(pattern.clone())
                    .or(intake_items::description.ilike(pattern)),
            );
        }

        match q
            .order(intake_items::created_at.desc())
            .load::<IntakeItemRow>(&mut conn)
        {
            Ok(rows) => rows.into_iter().map(IntakeItemRow::into_item).collect(),
            Err(e) => {
                log::error!("intake list degraded to empty: {e}");
                Vec::new()
            }
        }
    }

    async fn get(&self, id: Uuid) -> Option<IntakeItem> {
        self.load(id).ok()
    }

    async fn create(&self, item: IntakeItem) -> Result<IntakeItem, StoreError> {
        let mut conn = self.pool.get()?;
        diesel::insert_into(intake_items::table)
            .values(IntakeItemRow::from_item(&item))
            .execute(&mut conn)?;
        Ok(item)
    }

    async fn update(
        &self,
        id: Uuid,
        changes: UpdateIntakeRequest,
    ) -> Result<IntakeItem, StoreError> {
        let mut item = self.load(id)?;
        apply_changes(&mut item, changes);

        let mut conn = self.pool.get()?;
        diesel::update(intake_items::table.filter(intake_items::id.eq(id)))
            .set(IntakeItemRow::from_item(&item))
            .execute(&mut conn)?;
        Ok(item)
    }

    async fn set_status(&self, id: Uuid, status: IntakeStatus) -> Result<IntakeItem, StoreError> {
        let mut conn = self.pool.get()?;
        diesel::update(intake_items::table.filter(intake_items::id.eq(id)))
            .set((
                intake_items::status.eq(status.as_wire().to_string()),
                intake_items::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;
        self.load(id)
    }

    async fn assign(&self, id: Uuid, assignee: Option<String>) -> Result<IntakeItem, StoreError> {
        let mut conn = self.pool.get()?;
        diesel::update(intake_items::table.filter(intake_items::id.eq(id)))
            .set((
                intake_items::assignee.eq(assignee),
                intake_items::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;
        self.load(id)
    }

    async fn annotate(&self, id: Uuid, note: String) -> Result<IntakeItem, StoreError> {
        let mut conn = self.pool.get()?;
        diesel::update(intake_items::table.filter(intake_items::id.eq(id)))
            .set((
                intake_items::ai_triage.eq(Some(note)),
                intake_items::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;
        self.load(id)
    }
}
