use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Report, ReportStatus};
use crate::shared::schema::reports;
use crate::shared::store::StoreError;
use crate::shared::utils::DbPool;

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn list(&self) -> Vec<Report>;
    async fn get(&self, id: Uuid) -> Option<Report>;
    async fn create(&self, report: Report) -> Result<Report, StoreError>;
    async fn set_status(
        &self,
        id: Uuid,
        status: ReportStatus,
        narrative: Option<String>,
    ) -> Result<Report, StoreError>;
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
}

pub struct MemoryReportStore {
    rows: RwLock<Vec<Report>>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        MemoryReportStore {
            rows: RwLock::new(Vec::new()),
        }
    }
}

impl Default for MemoryReportStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn list(&self) -> Vec<Report> {
        let rows = self.rows.read().await;
        let mut all = rows.clone();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }

    async fn get(&self, id: Uuid) -> Option<Report> {
        self.rows.read().await.iter().find(|r| r.id == id).cloned()
    }

    async fn create(&self, report: Report) -> Result<Report, StoreError> {
        self.rows.write().await.push(report.clone());
        Ok(report)
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: ReportStatus,
        narrative: Option<String>,
    ) -> Result<Report, StoreError> {
        let mut rows = self.rows.write().await;
        let report = rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound("report"))?;
        report.status = status;
        if narrative.is_some() {
            report.narrative = narrative;
        }
        report.updated_at = Utc::now();
        Ok(report.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|r| r.id != id);
        if rows.len() == before {
            return Err(StoreError::NotFound("report"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = reports)]
struct ReportRow {
    id: Uuid,
    title: String,
    period: String,
    narrative: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ReportRow {
    fn into_report(self) -> Report {
        Report {
            id: self.id,
            title: self.title,
            period: self.period,
            narrative: self.narrative,
            status: ReportStatus::from_wire(&self.status),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn from_report(report: &Report) -> Self {
        ReportRow {
            id: report.id,
            title: report.title.clone(),
            period: report.period.clone(),
            narrative: report.narrative.clone(),
            status: report.status.as_wire().to_string(),
            created_at: report.created_at,
            updated_at: report.updated_at,
        }
    }
}

pub struct PgReportStore {
    pool: DbPool,
}

impl PgReportStore {
    pub fn new(pool: DbPool) -> Self {
        PgReportStore { pool }
    }

    fn load(&self, id: Uuid) -> Result<Report, StoreError> {
        let mut conn = self.pool.get()?;
        reports::table
            .filter(reports::id.eq(id))
            .first::<ReportRow>(&mut conn)
            .map(ReportRow::into_report)
            .map_err(|_| StoreError::NotFound("report"))
    }
}

#[async_trait]
impl ReportStore for PgReportStore {
    async fn list(&self) -> Vec<Report> {
        let mut conn = match self.pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                log::error!("report list degraded to empty: {e}");
                return Vec::new();
            }
        };
        match reports::table
            .order(reports::created_at.desc())
            .load::<ReportRow>(&mut conn)
        {
            Ok(rows) => rows.into_iter().map(ReportRow::into_report).collect(),
            Err(e) => {
                log::error!("report list degraded to empty: {e}");
                Vec::new()
            }
        }
    }

    async fn get(&self, id: Uuid) -> Option<Report> {
        self.load(id).ok()
    }

    async fn create(&self, report: Report) -> Result<Report, StoreError> {
        let mut conn = self.pool.get()?;
        diesel::insert_into(reports::table)
            .values(ReportRow::from_report(&report))
            .execute(&mut conn)?;
        Ok(report)
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: ReportStatus,
        narrative: Option<String>,
    ) -> Result<Report, StoreError> {
        let mut conn = self.pool.get()?;
        match narrative {
            Some(narrative) => {
                diesel::update(reports::table.filter(reports::id.eq(id)))
                    .set((
                        reports::status.eq(status.as_wire().to_string()),
                        reports::narrative.eq(narrative),
                        reports::updated_at.eq(Utc::now()),
                    ))
                    .execute(&mut conn)?;
            }
            None => {
                diesel::update(reports::table.filter(reports::id.eq(id)))
                    .set((
                        reports::status.eq(status.as_wire().to_string()),
                        reports::updated_at.eq(Utc::now()),
                    ))
                    .execute(&mut conn)?;
            }
        }
        self.load(id)
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut conn = self.pool.get()?;
        let deleted = diesel::delete(reports::table.filter(reports::id.eq(id)))
            .execute(&mut conn)?;
        if deleted == 0 {
            return Err(StoreError::NotFound("report"));
        }
        Ok(())
    }
}
