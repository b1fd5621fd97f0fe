use std::sync::Arc;

use crate::ai::AiClient;
use crate::approvals::service::{ApprovalStore, MemoryApprovalStore, PgApprovalStore};
use crate::audit::service::{AuditStore, MemoryAuditStore, PgAuditStore};
use crate::budgets::service::{BudgetStore, MemoryBudgetStore, PgBudgetStore};
use crate::clients::service::{
    ClientStore, ContractStore, MemoryClientStore, MemoryContractStore, PgClientStore,
    PgContractStore,
};
use crate::config::AppConfig;
use crate::identity::service::{
    MemoryProfileStore, MemorySessionStore, PgProfileStore, PgSessionStore, ProfileStore,
    SessionStore,
};
use crate::intake::service::{IntakeStore, MemoryIntakeStore, PgIntakeStore};
use crate::qa::service::{DeliverableStore, MemoryDeliverableStore, PgDeliverableStore};
use crate::reporting::service::{MemoryReportStore, PgReportStore, ReportStore};
use crate::shared::utils::DbPool;

/// One store handle per entity family, bound once at startup to either the
/// fixture-seeded memory backend or the hosted Postgres backend.
pub struct AppState {
    pub config: AppConfig,
    pub conn: Option<DbPool>,
    pub ai: AiClient,
    pub profiles: Arc<dyn ProfileStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub audit: Arc<dyn AuditStore>,
    pub intake: Arc<dyn IntakeStore>,
    pub approvals: Arc<dyn ApprovalStore>,
    pub budgets: Arc<dyn BudgetStore>,
    pub deliverables: Arc<dyn DeliverableStore>,
    pub clients: Arc<dyn ClientStore>,
    pub contracts: Arc<dyn ContractStore>,
    pub reports: Arc<dyn ReportStore>,
}

impl AppState {
    /// Mock mode: no database, every store seeded from fixtures. Data is
    /// process-local and disposable.
    pub fn mock(config: AppConfig) -> Self {
        let ai = AiClient::from_config(&config.ai);
        AppState {
            ai,
            conn: None,
            profiles: Arc::new(MemoryProfileStore::seeded()),
            sessions: Arc::new(MemorySessionStore::new()),
            audit: Arc::new(MemoryAuditStore::new()),
            intake: Arc::new(MemoryIntakeStore::seeded()),
            approvals: Arc::new(MemoryApprovalStore::seeded()),
            budgets: Arc::new(MemoryBudgetStore::seeded()),
            deliverables: Arc::new(MemoryDeliverableStore::seeded()),
            clients: Arc::new(MemoryClientStore::seeded()),
            contracts: Arc::new(MemoryContractStore::seeded()),
            reports: Arc::new(MemoryReportStore::new()),
            config,
        }
    }

    /// Hosted mode: every store reads and writes through the shared pool.
    pub fn hosted(config: AppConfig, pool: DbPool) -> Self {
        let ai = AiClient::from_config(&config.ai);
        AppState {
            ai,
            profiles: Arc::new(PgProfileStore::new(pool.clone())),
            sessions: Arc::new(PgSessionStore::new(pool.clone())),
            audit: Arc::new(PgAuditStore::new(pool.clone())),
            intake: Arc::new(PgIntakeStore::new(pool.clone())),
            approvals: Arc::new(PgApprovalStore::new(pool.clone())),
            budgets: Arc::new(PgBudgetStore::new(pool.clone())),
            deliverables: Arc::new(PgDeliverableStore::new(pool.clone())),
            clients: Arc::new(PgClientStore::new(pool.clone())),
            contracts: Arc::new(PgContractStore::new(pool.clone())),
            reports: Arc::new(PgReportStore::new(pool.clone())),
            conn: Some(pool),
            config,
        }
    }
}
