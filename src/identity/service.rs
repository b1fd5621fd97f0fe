use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, SaltString};
use argon2::{Argon2, PasswordVerifier};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Profile, ProfileStatus, Role, Session, UpdateUserRequest};
use crate::shared::schema::{profiles, sessions};
use crate::shared::store::StoreError;
use crate::shared::utils::{opaque_token, DbPool};

pub fn hash_password(password: &str) -> Result<String, StoreError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| StoreError::Backend(format!("password hashing: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn list(&self) -> Vec<Profile>;
    async fn get(&self, id: Uuid) -> Option<Profile>;
    async fn find_by_email(&self, email: &str) -> Option<Profile>;
    /// Profile plus password hash, for the login path only.
    async fn credentials(&self, email: &str) -> Option<(Profile, String)>;
    async fn create(&self, profile: Profile, password_hash: String) -> Result<Profile, StoreError>;
    async fn update(&self, id: Uuid, changes: UpdateUserRequest) -> Result<Profile, StoreError>;
    async fn set_status(&self, id: Uuid, status: ProfileStatus) -> Result<Profile, StoreError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, profile: &Profile) -> Result<Session, StoreError>;
    async fn find(&self, token: &str) -> Option<Session>;
    async fn delete(&self, token: &str) -> Result<(), StoreError>;
}

fn apply_changes(profile: &mut Profile, changes: UpdateUserRequest) {
    if let Some(email) = changes.email {
        profile.email = email;
    }
    if let Some(display_name) = changes.display_name {
        profile.display_name = display_name;
    }
    if let Some(role) = changes.role {
        profile.role = role;
    }
    if let Some(organization) = changes.organization {
        profile.organization = organization;
    }
    if let Some(avatar_url) = changes.avatar_url {
        profile.avatar_url = Some(avatar_url);
    }
}

pub struct MemoryProfileStore {
    rows: RwLock<Vec<(Profile, String)>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        MemoryProfileStore {
            rows: RwLock::new(Vec::new()),
        }
    }

    /// Demo roster used in mock mode. All fixture accounts share one
    /// password so local walkthroughs do not need a credential sheet.
    pub fn seeded() -> Self {
        let demo_hash = hash_password("bundlr-demo").unwrap_or_default();
        let seed = |email: &str, name: &str, role: Role| -> (Profile, String) {
            (
                Profile {
                    id: Uuid::new_v4(),
                    email: email.to_string(),
                    display_name: name.to_string(),
                    role,
                    status: ProfileStatus::Active,
                    organization: "bundlr".to_string(),
                    avatar_url: None,
                    created_at: Utc::now(),
                },
                demo_hash.clone(),
            )
        };
        MemoryProfileStore {
            rows: RwLock::new(vec![
                seed("ana@bundlr.studio", "Ana Duarte", Role::Admin),
                seed("marco@bundlr.studio", "Marco Lima", Role::AccountManager),
                seed("sofia@bundlr.studio", "Sofia Reis", Role::PodLead),
                seed("teo@bundlr.studio", "Teo Alves", Role::Qa),
                seed("iris@bundlr.studio", "Iris Campos", Role::Designer),
            ]),
        }
    }
}

impl Default for MemoryProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn list(&self) -> Vec<Profile> {
        self.rows.read().await.iter().map(|(p, _)| p.clone()).collect()
    }

    async fn get(&self, id: Uuid) -> Option<Profile> {
        self.rows
            .read()
            .await
            .iter()
            .find(|(p, _)| p.id == id)
            .map(|(p, _)| p.clone())
    }

    async fn find_by_email(&self, email: &str) -> Option<Profile> {
        self.rows
            .read()
            .await
            .iter()
            .find(|(p, _)| p.email.eq_ignore_ascii_case(email))
            .map(|(p, _)| p.clone())
    }

    async fn credentials(&self, email: &str) -> Option<(Profile, String)> {
        self.rows
            .read()
            .await
            .iter()
            .find(|(p, _)| p.email.eq_ignore_ascii_case(email))
            .cloned()
    }

    async fn create(&self, profile: Profile, password_hash: String) -> Result<Profile, StoreError> {
        let mut rows = self.rows.write().await;
        if rows.iter().any(|(p, _)| p.email.eq_ignore_ascii_case(&profile.email)) {
            return Err(StoreError::Conflict(format!(
                "email {} already registered",
                profile.email
            )));
        }
        rows.push((profile.clone(), password_hash));
        Ok(profile)
    }

    async fn update(&self, id: Uuid, changes: UpdateUserRequest) -> Result<Profile, StoreError> {
        let mut rows = self.rows.write().await;
        let (profile, _) = rows
            .iter_mut()
            .find(|(p, _)| p.id == id)
            .ok_or(StoreError::NotFound("user"))?;
        apply_changes(profile, changes);
        Ok(profile.clone())
    }

    async fn set_status(&self, id: Uuid, status: ProfileStatus) -> Result<Profile, StoreError> {
        let mut rows = self.rows.write().await;
        let (profile, _) = rows
            .iter_mut()
            .find(|(p, _)| p.id == id)
            .ok_or(StoreError::NotFound("user"))?;
        profile.status = status;
        Ok(profile.clone())
    }
}

pub struct MemorySessionStore {
    rows: RwLock<Vec<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        MemorySessionStore {
            rows: RwLock::new(Vec::new()),
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, profile: &Profile) -> Result<Session, StoreError> {
        let session = Session {
            token: opaque_token(),
            profile_id: profile.id,
            display_name: profile.display_name.clone(),
            created_at: Utc::now(),
        };
        self.rows.write().await.push(session.clone());
        Ok(session)
    }

    async fn find(&self, token: &str) -> Option<Session> {
        self.rows
            .read()
            .await
            .iter()
            .find(|s| s.token == token)
            .cloned()
    }

    async fn delete(&self, token: &str) -> Result<(), StoreError> {
        self.rows.write().await.retain(|s| s.token != token);
        Ok(())
    }
}

#[derive(Debug, Clone, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = profiles)]
struct ProfileRow {
    id: Uuid,
    email: String,
    display_name: String,
    role: String,
    status: String,
    organization: String,
    avatar_url: Option<String>,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl ProfileRow {
    fn into_profile(self) -> Profile {
        Profile {
            id: self.id,
            email: self.email,
            display_name: self.display_name,
            role: Role::from_wire(&self.role),
            status: ProfileStatus::from_wire(&self.status),
            organization: self.organization,
            avatar_url: self.avatar_url,
            created_at: self.created_at,
        }
    }

    fn from_profile(profile: &Profile, password_hash: String) -> Self {
        ProfileRow {
            id: profile.id,
            email: profile.email.clone(),
            display_name: profile.display_name.clone(),
            role: profile.role.as_wire().to_string(),
            status: profile.status.as_wire().to_string(),
            organization: profile.organization.clone(),
            avatar_url: profile.avatar_url.clone(),
            password_hash,
            created_at: profile.created_at,
        }
    }
}

pub struct PgProfileStore {
    pool: DbPool,
}

impl PgProfileStore {
    pub fn new(pool: DbPool) -> Self {
        PgProfileStore { pool }
    }

    fn load_by_email(&self, email: &str) -> Result<ProfileRow, StoreError> {
        let mut conn = self.pool.get()?;
        profiles::table
            .filter(profiles::email.eq(email))
            .first::<ProfileRow>(&mut conn)
            .map_err(StoreError::from)
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn list(&self) -> Vec<Profile> {
        let mut conn = match self.pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                log::error!("profile list degraded to empty: {e}");
                return Vec::new();
            }
        };
        match profiles::table
            .order(profiles::created_at.desc())
            .load::<ProfileRow>(&mut conn)
        {
            Ok(rows) => rows.into_iter().map(ProfileRow::into_profile).collect(),
            Err(e) => {
                log::error!("profile list degraded to empty: {e}");
                Vec::new()
            }
        }
    }

    async fn get(&self, id: Uuid) -> Option<Profile> {
        let mut conn = self.pool.get().ok()?;
        profiles::table
            .filter(profiles::id.eq(id))
            .first::<ProfileRow>(&mut conn)
            .ok()
            .map(ProfileRow::into_profile)
    }

    async fn find_by_email(&self, email: &str) -> Option<Profile> {
        self.load_by_email(email).ok().map(ProfileRow::into_profile)
    }

    async fn credentials(&self, email: &str) -> Option<(Profile, String)> {
        let row = self.load_by_email(email).ok()?;
        let hash = row.password_hash.clone();
        Some((row.into_profile(), hash))
    }

    async fn create(&self, profile: Profile, password_hash: String) -> Result<Profile, StoreError> {
        let mut conn = self.pool.get()?;
        let row = ProfileRow::from_profile(&profile, password_hash);
        diesel::insert_into(profiles::table)
            .values(&row)
            .execute(&mut conn)?;
        Ok(profile)
    }

    async fn update(&self, id: Uuid, changes: UpdateUserRequest) -> Result<Profile, StoreError> {
        let mut conn = self.pool.get()?;
        let row: ProfileRow = profiles::table
            .filter(profiles::id.eq(id))
            .first(&mut conn)
            .map_err(|_| StoreError::NotFound("user"))?;

        let mut profile = row.into_profile();
        apply_changes(&mut profile, changes);

        diesel::update(profiles::table.filter(profiles::id.eq(id)))
            .set((
                profiles::email.eq(profile.email.clone()),
                profiles::display_name.eq(profile.display_name.clone()),
                profiles::role.eq(profile.role.as_wire().to_string()),
                profiles::organization.eq(profile.organization.clone()),
                profiles::avatar_url.eq(profile.avatar_url.clone()),
            ))
            .execute(&mut conn)?;
        Ok(profile)
    }

    async fn set_status(&self, id: Uuid, status: ProfileStatus) -> Result<Profile, StoreError> {
        let mut conn = self.pool.get()?;
        diesel::update(profiles::table.filter(profiles::id.eq(id)))
            .set(profiles::status.eq(status.as_wire().to_string()))
            .execute(&mut conn)?;

        let row: ProfileRow = profiles::table
            .filter(profiles::id.eq(id))
            .first(&mut conn)
            .map_err(|_| StoreError::NotFound("user"))?;
        Ok(row.into_profile())
    }
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = sessions)]
struct SessionRow {
    token: String,
    profile_id: Uuid,
    display_name: String,
    created_at: DateTime<Utc>,
}

pub struct PgSessionStore {
    pool: DbPool,
}

impl PgSessionStore {
    pub fn new(pool: DbPool) -> Self {
        PgSessionStore { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create(&self, profile: &Profile) -> Result<Session, StoreError> {
        let mut conn = self.pool.get()?;
        let row = SessionRow {
            token: opaque_token(),
            profile_id: profile.id,
            display_name: profile.display_name.clone(),
            created_at: Utc::now(),
        };
        diesel::insert_into(sessions::table)
            .values(&row)
            .execute(&mut conn)?;
        Ok(Session {
            token: row.token,
            profile_id: row.profile_id,
            display_name: row.display_name,
            created_at: row.created_at,
        })
    }

    async fn find(&self, token: &str) -> Option<Session> {
        let mut conn = self.pool.get().ok()?;
        sessions::table
            .filter(sessions::token.eq(token))
            .first::<SessionRow>(&mut conn)
            .ok()
            .map(|row| Session {
                token: row.token,
                profile_id: row.profile_id,
                display_name: row.display_name,
                created_at: row.created_at,
            })
    }

    async fn delete(&self, token: &str) -> Result<(), StoreError> {
        let mut conn = self.pool.get()?;
        diesel::delete(sessions::table.filter(sessions::token.eq(token))).execute(&mut conn)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies_and_rejects() {
        let hash = hash_password("bundlr-demo").unwrap();
        assert!(verify_password("bundlr-demo", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("bundlr-demo", "not-a-phc-string"));
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryProfileStore::seeded();
        let existing = store.find_by_email("ana@bundlr.studio").await.unwrap();
        let dup = Profile {
            id: Uuid::new_v4(),
            email: existing.email.clone(),
            display_name: "Impostor".to_string(),
            role: Role::Developer,
            status: ProfileStatus::Pending,
            organization: "bundlr".to_string(),
            avatar_url: None,
            created_at: Utc::now(),
        };
        let err = store.create(dup, "hash".to_string()).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn deactivate_keeps_record_around() {
        let store = MemoryProfileStore::seeded();
        let user = store.find_by_email("teo@bundlr.studio").await.unwrap();
        store
            .set_status(user.id, ProfileStatus::Inactive)
            .await
            .unwrap();
        let after = store.get(user.id).await.unwrap();
        assert_eq!(after.status, ProfileStatus::Inactive);
        assert_eq!(store.list().await.len(), 5);
    }
}
