use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    Client, ClientStatus, Contract, ContractStatus, UpdateClientRequest, UpdateContractRequest,
};
use crate::shared::schema::{clients, contracts};
use crate::shared::store::StoreError;
use crate::shared::utils::DbPool;

#[async_trait]
pub trait ClientStore: Send + Sync {
    async fn list(&self) -> Vec<Client>;
    async fn get(&self, id: Uuid) -> Option<Client>;
    async fn create(&self, client: Client) -> Result<Client, StoreError>;
    async fn update(&self, id: Uuid, changes: UpdateClientRequest) -> Result<Client, StoreError>;
}

#[async_trait]
pub trait ContractStore: Send + Sync {
    async fn list(&self) -> Vec<Contract>;
    async fn list_for_client(&self, client_id: Uuid) -> Vec<Contract>;
    async fn get(&self, id: Uuid) -> Option<Contract>;
    async fn create(&self, contract: Contract) -> Result<Contract, StoreError>;
    async fn update(
        &self,
        id: Uuid,
        changes: UpdateContractRequest,
    ) -> Result<Contract, StoreError>;
}

fn apply_client_changes(client: &mut Client, changes: UpdateClientRequest) {
    if let Some(name) = changes.name {
        client.name = name;
    }
    if let Some(contact_email) = changes.contact_email {
        client.contact_email = contact_email;
    }
    if let Some(status) = changes.status {
        client.status = status;
    }
    if let Some(owner_name) = changes.owner_name {
        client.owner_name = owner_name;
    }
}

fn apply_contract_changes(contract: &mut Contract, changes: UpdateContractRequest) {
    if let Some(title) = changes.title {
        contract.title = title;
    }
    if let Some(value) = changes.value {
        contract.value = value;
    }
    if let Some(status) = changes.status {
        contract.status = status;
    }
    if changes.start_date.is_some() {
        contract.start_date = changes.start_date;
    }
    if changes.end_date.is_some() {
        contract.end_date = changes.end_date;
    }
}

pub struct MemoryClientStore {
    rows: RwLock<Vec<Client>>,
}

impl MemoryClientStore {
    pub fn new() -> Self {
        MemoryClientStore {
            rows: RwLock::new(Vec::new()),
        }
    }

    pub fn seeded() -> Self {
        let now = Utc::now();
        let seed = |name: &str, email: &str, status: ClientStatus, owner: &str| Client {
            id: Uuid::new_v4(),
            name: name.to_string(),
            contact_email: email.to_string(),
            status,
            owner_name: owner.to_string(),
            created_at: now,
        };
        MemoryClientStore {
            rows: RwLock::new(vec![
                seed("Acme", "ops@acme.example", ClientStatus::Active, "Marco"),
                seed(
                    "Northwind",
                    "it@northwind.example",
                    ClientStatus::Active,
                    "Marco",
                ),
                seed(
                    "Lumon",
                    "outreach@lumon.example",
                    ClientStatus::Paused,
                    "Sofia",
                ),
            ]),
        }
    }
}

impl Default for MemoryClientStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClientStore for MemoryClientStore {
    async fn list(&self) -> Vec<Client> {
        let rows = self.rows.read().await;
        let mut all = rows.clone();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    async fn get(&self, id: Uuid) -> Option<Client> {
        self.rows.read().await.iter().find(|c| c.id == id).cloned()
    }

    async fn create(&self, client: Client) -> Result<Client, StoreError> {
        self.rows.write().await.push(client.clone());
        Ok(client)
    }

    async fn update(&self, id: Uuid, changes: UpdateClientRequest) -> Result<Client, StoreError> {
        let mut rows = self.rows.write().await;
        let client = rows
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(StoreError::NotFound("client"))?;
        apply_client_changes(client, changes);
        Ok(client.clone())
    }
}

pub struct MemoryContractStore {
    rows: RwLock<Vec<Contract>>,
}

impl MemoryContractStore {
    pub fn new() -> Self {
        MemoryContractStore {
            rows: RwLock::new(Vec::new()),
        }
    }

    /// Contracts reference clients by id, and fixture client ids are minted
    /// per process. Mock mode therefore starts with no contracts; they are
    /// created against whatever clients the seeded client store handed out.
    pub fn seeded() -> Self {
        Self::new()
    }
}

impl Default for MemoryContractStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContractStore for MemoryContractStore {
    async fn list(&self) -> Vec<Contract> {
        let rows = self.rows.read().await;
        let mut all = rows.clone();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }

    async fn list_for_client(&self, client_id: Uuid) -> Vec<Contract> {
        self.rows
            .read()
            .await
            .iter()
            .filter(|c| c.client_id == client_id)
            .cloned()
            .collect()
    }

    async fn get(&self, id: Uuid) -> Option<Contract> {
        self.rows.read().await.iter().find(|c| c.id == id).cloned()
    }

    async fn create(&self, contract: Contract) -> Result<Contract, StoreError> {
        self.rows.write().await.push(contract.clone());
        Ok(contract)
    }

    async fn update(
        &self,
        id: Uuid,
        changes: UpdateContractRequest,
    ) -> Result<Contract, StoreError> {
        let mut rows = self.rows.write().await;
        let contract = rows
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(StoreError::NotFound("contract"))?;
        apply_contract_changes(contract, changes);
        Ok(contract.clone())
    }
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = clients)]
struct ClientRow {
    id: Uuid,
    name: String,
    contact_email: String,
    status: String,
    owner_name: String,
    created_at: DateTime<Utc>,
}

impl ClientRow {
    fn into_client(self) -> Client {
        Client {
            id: self.id,
            name: self.name,
            contact_email: self.contact_email,
            status: ClientStatus::from_wire(&self.status),
            owner_name: self.owner_name,
            created_at: self.created_at,
        }
    }

    fn from_client(client: &Client) -> Self {
        ClientRow {
            id: client.id,
            name: client.name.clone(),
            contact_email: client.contact_email.clone(),
            status: client.status.as_wire().to_string(),
            owner_name: client.owner_name.clone(),
            created_at: client.created_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = contracts)]
struct ContractRow {
    id: Uuid,
    client_id: Uuid,
    title: String,
    value: f64,
    status: String,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl ContractRow {
    fn into_contract(self) -> Contract {
        Contract {
            id: self.id,
            client_id: self.client_id,
            title: self.title,
            value: self.value,
            status: ContractStatus::from_wire(&self.status),
            start_date: self.start_date,
            end_date: self.end_date,
            created_at: self.created_at,
        }
    }

    fn from_contract(contract: &Contract) -> Self {
        ContractRow {
            id: contract.id,
            client_id: contract.client_id,
            title: contract.title.clone(),
            value: contract.value,
            status: contract.status.as_wire().to_string(),
            start_date: contract.start_date,
            end_date: contract.end_date,
            created_at: contract.created_at,
        }
    }
}

pub struct PgClientStore {
    pool: DbPool,
}

impl PgClientStore {
    pub fn new(pool: DbPool) -> Self {
        PgClientStore { pool }
    }

    fn load(&self, id: Uuid) -> Result<Client, StoreError> {
        let mut conn = self.pool.get()?;
        clients::table
            .filter(clients::id.eq(id))
            .first::<ClientRow>(&mut conn)
            .map(ClientRow::into_client)
            .map_err(|_| StoreError::NotFound("client"))
    }
}

#[async_trait]
impl ClientStore for PgClientStore {
    async fn list(&self) -> Vec<Client> {
        let mut conn = match self.pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                log::error!("client list degraded to empty: {e}");
                return Vec::new();
            }
        };
        match clients::table
            .order(clients::name.asc())
            .load::<ClientRow>(&mut conn)
        {
            Ok(rows) => rows.into_iter().map(ClientRow::into_client).collect(),
            Err(e) => {
                log::error!("client list degraded to empty: {e}");
                Vec::new()
            }
        }
    }

    async fn get(&self, id: Uuid) -> Option<Client> {
        self.load(id).ok()
    }

    async fn create(&self, client: Client) -> Result<Client, StoreError> {
        let mut conn = self.pool.get()?;
        diesel::insert_into(clients::table)
            .values(ClientRow::from_client(&client))
            .execute(&mut conn)?;
        Ok(client)
    }

    async fn update(&self, id: Uuid, changes: UpdateClientRequest) -> Result<Client, StoreError> {
        let mut client = self.load(id)?;
        apply_client_changes(&mut client, changes);

        let mut conn = self.pool.get()?;
        let row = ClientRow::from_client(&client);
        diesel::update(clients::table.filter(clients::id.eq(id)))
            .set((
                clients::name.eq(row.name),
                clients::contact_email.eq(row.contact_email),
                clients::status.eq(row.status),
                clients::owner_name.eq(row.owner_name),
            ))
            .execute(&mut conn)?;
        Ok(client)
    }
}

pub struct PgContractStore {
    pool: DbPool,
}

impl PgContractStore {
    pub fn new(pool: DbPool) -> Self {
        PgContractStore { pool }
    }

    fn load(&self, id: Uuid) -> Result<Contract, StoreError> {
        let mut conn = self.pool.get()?;
        contracts::table
            .filter(contracts::id.eq(id))
            .first::<ContractRow>(&mut conn)
            .map(ContractRow::into_contract)
            .map_err(|_| StoreError::NotFound("contract"))
    }

    fn load_many(
        &self,
        client_id: Option<Uuid>,
    ) -> Result<Vec<Contract>, StoreError> {
        let mut conn = self.pool.get()?;
        let mut query = contracts::table.into_boxed();
        if let Some(client_id) = client_id {
            query = query.filter(contracts::client_id.eq(client_id));
        }
        let rows = query
            .order(contracts::created_at.desc())
            .load::<ContractRow>(&mut conn)
            .map_err(StoreError::from)?;
        Ok(rows.into_iter().map(ContractRow::into_contract).collect())
    }
}

#[async_trait]
impl ContractStore for PgContractStore {
    async fn list(&self) -> Vec<Contract> {
        self.load_many(None).unwrap_or_else(|e| {
            log::error!("contract list degraded to empty: {e}");
            Vec::new()
        })
    }

    async fn list_for_client(&self, client_id: Uuid) -> Vec<Contract> {
        self.load_many(Some(client_id)).unwrap_or_else(|e| {
            log::error!("contract list degraded to empty: {e}");
            Vec::new()
        })
    }

    async fn get(&self, id: Uuid) -> Option<Contract> {
        self.load(id).ok()
    }

    async fn create(&self, contract: Contract) -> Result<Contract, StoreError> {
        let mut conn = self.pool.get()?;
        diesel::insert_into(contracts::table)
            .values(ContractRow::from_contract(&contract))
            .execute(&mut conn)?;
        Ok(contract)
    }

    async fn update(
        &self,
        id: Uuid,
        changes: UpdateContractRequest,
    ) -> Result<Contract, StoreError> {
        let mut contract = self.load(id)?;
        apply_contract_changes(&mut contract, changes);

        let mut conn = self.pool.get()?;
        let row = ContractRow::from_contract(&contract);
        diesel::update(contracts::table.filter(contracts::id.eq(id)))
            .set((
                contracts::title.eq(row.title),
                contracts::value.eq(row.value),
                contracts::status.eq(row.status),
                contracts::start_date.eq(row.start_date),
                contracts::end_date.eq(row.end_date),
            ))
            .execute(&mut conn)?;
        Ok(contract)
    }
}
