use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AuditAction, AuditEvent, AuditQuery};
use crate::shared::actor::Actor;
use crate::shared::schema::audit_events;
use crate::shared::store::StoreError;
use crate::shared::utils::DbPool;

/// Cap applied to unfiltered reads by both backends, so mock and hosted
/// answer the same query with the same window.
pub const DEFAULT_LIST_LIMIT: usize = 500;

/// Append-only event log shared by every module's mutation path. Writers
/// never maintain ordering; retrieval sorts newest-first at read time, the
/// single enforcement point for that invariant.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn record(
        &self,
        action: AuditAction,
        details: String,
        actor: &Actor,
        target_id: Option<Uuid>,
    ) -> Result<AuditEvent, StoreError>;

    /// Newest-first, filtered. Degrades to empty on backend failure.
    async fn list(&self, query: AuditQuery) -> Vec<AuditEvent>;
}

fn build_event(
    action: AuditAction,
    details: String,
    actor: &Actor,
    target_id: Option<Uuid>,
) -> AuditEvent {
    AuditEvent {
        id: Uuid::new_v4(),
        action,
        details,
        actor_id: actor.id,
        actor_name: actor.name.clone(),
        target_id,
        timestamp: Utc::now(),
    }
}

fn sort_newest_first(events: &mut [AuditEvent]) {
    events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

pub struct MemoryAuditStore {
    events: RwLock<Vec<AuditEvent>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        MemoryAuditStore {
            events: RwLock::new(Vec::new()),
        }
    }
}

impl Default for MemoryAuditStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn record(
        &self,
        action: AuditAction,
        details: String,
        actor: &Actor,
        target_id: Option<Uuid>,
    ) -> Result<AuditEvent, StoreError> {
        let event = build_event(action, details, actor, target_id);
        self.events.write().await.push(event.clone());
        Ok(event)
    }

    async fn list(&self, query: AuditQuery) -> Vec<AuditEvent> {
        let events = self.events.read().await;
        let mut matched: Vec<AuditEvent> =
            events.iter().filter(|e| query.matches(e)).cloned().collect();
        sort_newest_first(&mut matched);
        matched.truncate(query.limit.unwrap_or(DEFAULT_LIST_LIMIT));
        matched
    }
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = audit_events)]
struct AuditEventRow {
    id: Uuid,
    action: String,
    details: String,
    actor_id: Option<Uuid>,
    actor_name: String,
    target_id: Option<Uuid>,
    occurred_at: DateTime<Utc>,
}

impl From<AuditEventRow> for AuditEvent {
    fn from(row: AuditEventRow) -> Self {
        AuditEvent {
            id: row.id,
            action: AuditAction::from_wire(&row.action),
            details: row.details,
            actor_id: row.actor_id,
            actor_name: row.actor_name,
            target_id: row.target_id,
            timestamp: row.occurred_at,
        }
    }
}

pub struct PgAuditStore {
    pool: DbPool,
}

impl PgAuditStore {
    pub fn new(pool: DbPool) -> Self {
        PgAuditStore { pool }
    }
}

#[async_trait]
impl AuditStore for PgAuditStore {
    async fn record(
        &self,
        action: AuditAction,
        details: String,
        actor: &Actor,
        target_id: Option<Uuid>,
    ) -> Result<AuditEvent, StoreError> {
        let event = build_event(action, details, actor, target_id);
        let row = AuditEventRow {
            id: event.id,
            action: event.action.as_wire().to_string(),
            details: event.details.clone(),
            actor_id: event.actor_id,
            actor_name: event.actor_name.clone(),
            target_id: event.target_id,
            occurred_at: event.timestamp,
        };

        let mut conn = self.pool.get()?;
        diesel::insert_into(audit_events::table)
            .values(&row)
            .execute(&mut conn)?;
        Ok(event)
    }

    async fn list(&self, query: AuditQuery) -> Vec<AuditEvent> {
        let mut conn = match self.pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                log::error!("audit list degraded to empty: {e}");
                return Vec::new();
            }
        };

        let mut q = audit_events::table.into_boxed();
        if let Some(action) = &query.action {
            q = q.filter(audit_events::action.eq(action.clone()));
        }
        if let Some(actor_id) = query.actor_id {
            q = q.filter(audit_events::actor_id.eq(actor_id));
        }
        if let Some(since) = query.since {
            q = q.filter(audit_events::occurred_at.ge(since));
        }
        if let Some(until) = query.until {
            q = q.filter(audit_events::occurred_at.le(until));
        }

        let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT) as i64;
        match q
            .order(audit_events::occurred_at.desc())
            .limit(limit)
            .load::<AuditEventRow>(&mut conn)
        {
            Ok(rows) => rows.into_iter().map(AuditEvent::from).collect(),
            Err(e) => {
                log::error!("audit list degraded to empty: {e}");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unfiltered_reads_share_the_default_window() {
        let store = MemoryAuditStore::new();
        let actor = Actor::user(Uuid::new_v4(), "Ana Duarte");
        for i in 0..(DEFAULT_LIST_LIMIT + 5) {
            store
                .record(AuditAction::ItemCreated, format!("event {i}"), &actor, None)
                .await
                .unwrap();
        }

        let events = store.list(AuditQuery::default()).await;
        assert_eq!(events.len(), DEFAULT_LIST_LIMIT);

        let widened = store
            .list(AuditQuery {
                limit: Some(DEFAULT_LIST_LIMIT + 5),
                ..AuditQuery::default()
            })
            .await;
        assert_eq!(widened.len(), DEFAULT_LIST_LIMIT + 5);
    }
}
