pub mod service;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::audit::{self, AuditAction};
use crate::shared::actor::{require_actor, SESSION_HEADER};
use crate::shared::state::AppState;
use service::{hash_password, verify_password};

/// Business role. The hosted backend speaks snake_case, the module JSON
/// shape speaks camelCase; both translations go through explicit tables and
/// unrecognized values surface as `Unknown` with a data-quality warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Admin,
    AccountManager,
    PodLead,
    Qa,
    Designer,
    Developer,
    ClientApprover,
    Unknown(String),
}

impl Role {
    pub fn as_wire(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::AccountManager => "account_manager",
            Role::PodLead => "pod_lead",
            Role::Qa => "qa",
            Role::Designer => "designer",
            Role::Developer => "developer",
            Role::ClientApprover => "client_approver",
            Role::Unknown(raw) => raw,
        }
    }

    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "admin" => Role::Admin,
            "account_manager" => Role::AccountManager,
            "pod_lead" => Role::PodLead,
            "qa" => Role::Qa,
            "designer" => Role::Designer,
            "developer" => Role::Developer,
            "client_approver" => Role::ClientApprover,
            other => {
                log::warn!("unknown role value {other:?} from backend");
                Role::Unknown(other.to_string())
            }
        }
    }

    pub fn as_view(&self) -> &str {
        match self {
            Role::AccountManager => "accountManager",
            Role::PodLead => "podLead",
            Role::ClientApprover => "clientApprover",
            other => other.as_wire(),
        }
    }

    pub fn from_view(raw: &str) -> Self {
        match raw {
            "accountManager" => Role::AccountManager,
            "podLead" => Role::PodLead,
            "clientApprover" => Role::ClientApprover,
            other => Role::from_wire(other),
        }
    }
}

impl Serialize for Role {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_view())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Role::from_view(&raw))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileStatus {
    Active,
    Inactive,
    Pending,
    Unknown(String),
}

impl ProfileStatus {
    pub fn as_wire(&self) -> &str {
        match self {
            ProfileStatus::Active => "active",
            ProfileStatus::Inactive => "inactive",
            ProfileStatus::Pending => "pending",
            ProfileStatus::Unknown(raw) => raw,
        }
    }

    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "active" => ProfileStatus::Active,
            "inactive" => ProfileStatus::Inactive,
            "pending" => ProfileStatus::Pending,
            other => {
                log::warn!("unknown profile status value {other:?} from backend");
                ProfileStatus::Unknown(other.to_string())
            }
        }
    }
}

impl Serialize for ProfileStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for ProfileStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ProfileStatus::from_wire(&raw))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub status: ProfileStatus,
    pub organization: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub profile_id: Uuid,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub organization: Option<String>,
    pub avatar_url: Option<String>,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role: Option<Role>,
    pub organization: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub profile: Profile,
}

pub async fn list_users(State(state): State<Arc<AppState>>) -> Json<Vec<Profile>> {
    Json(state.profiles.list().await)
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Profile>, (StatusCode, String)> {
    state
        .profiles
        .get(id)
        .await
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "User not found".to_string()))
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<Profile>, (StatusCode, String)> {
    let actor = require_actor(&state, &headers).await?;

    if state.profiles.find_by_email(&req.email).await.is_some() {
        return Err((
            StatusCode::CONFLICT,
            format!("A user with email {} already exists", req.email),
        ));
    }

    let profile = Profile {
        id: Uuid::new_v4(),
        email: req.email,
        display_name: req.display_name,
        role: req.role,
        status: ProfileStatus::Pending,
        organization: req.organization.unwrap_or_else(|| "bundlr".to_string()),
        avatar_url: req.avatar_url,
        created_at: Utc::now(),
    };
    let password_hash = hash_password(&req.password).map_err(|e| e.http())?;

    let created = state
        .profiles
        .create(profile, password_hash)
        .await
        .map_err(|e| e.http())?;

    audit::record(
        &state,
        AuditAction::UserCreated,
        format!("Created user {}", created.email),
        &actor,
        Some(created.id),
    )
    .await;

    Ok(Json(created))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<Profile>, (StatusCode, String)> {
    let actor = require_actor(&state, &headers).await?;

    let updated = state.profiles.update(id, req).await.map_err(|e| e.http())?;

    audit::record(
        &state,
        AuditAction::UserUpdated,
        format!("Updated profile of {}", updated.email),
        &actor,
        Some(id),
    )
    .await;

    Ok(Json(updated))
}

/// Users are never hard-deleted; deactivation is the terminal admin action.
pub async fn deactivate_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Profile>, (StatusCode, String)> {
    let actor = require_actor(&state, &headers).await?;

    let updated = state
        .profiles
        .set_status(id, ProfileStatus::Inactive)
        .await
        .map_err(|e| e.http())?;

    audit::record(
        &state,
        AuditAction::UserDeactivated,
        format!("Deactivated {}", updated.email),
        &actor,
        Some(id),
    )
    .await;

    Ok(Json(updated))
}

pub async fn reactivate_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Profile>, (StatusCode, String)> {
    let actor = require_actor(&state, &headers).await?;

    let updated = state
        .profiles
        .set_status(id, ProfileStatus::Active)
        .await
        .map_err(|e| e.http())?;

    audit::record(
        &state,
        AuditAction::UserUpdated,
        format!("Reactivated {}", updated.email),
        &actor,
        Some(id),
    )
    .await;

    Ok(Json(updated))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, String)> {
    let invalid = || (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string());

    let (profile, password_hash) = state
        .profiles
        .credentials(&req.email)
        .await
        .ok_or_else(invalid)?;

    if !verify_password(&req.password, &password_hash) {
        return Err(invalid());
    }
    if profile.status != ProfileStatus::Active {
        return Err((
            StatusCode::FORBIDDEN,
            "Account is not active".to_string(),
        ));
    }

    let session = state
        .sessions
        .create(&profile)
        .await
        .map_err(|e| e.http())?;

    let actor = crate::shared::actor::Actor::user(profile.id, profile.display_name.clone());
    audit::record(
        &state,
        AuditAction::Login,
        format!("{} signed in", profile.email),
        &actor,
        Some(profile.id),
    )
    .await;

    Ok(Json(LoginResponse {
        token: session.token,
        profile,
    }))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<StatusCode, (StatusCode, String)> {
    let actor = require_actor(&state, &headers).await?;

    if let Some(token) = headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok()) {
        state.sessions.delete(token).await.map_err(|e| e.http())?;
    }

    audit::record(
        &state,
        AuditAction::Logout,
        format!("{} signed out", actor.name),
        &actor,
        actor.id,
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Profile>, (StatusCode, String)> {
    let actor = require_actor(&state, &headers).await?;
    let id = actor
        .id
        .ok_or_else(|| (StatusCode::UNAUTHORIZED, "No profile for session".to_string()))?;
    state
        .profiles
        .get(id)
        .await
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "User not found".to_string()))
}

pub fn configure_identity_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/identity/users", get(list_users).post(create_user))
        .route("/api/identity/users/:id", get(get_user).put(update_user))
        .route("/api/identity/users/:id/deactivate", put(deactivate_user))
        .route("/api/identity/users/:id/reactivate", put(reactivate_user))
        .route("/api/identity/login", post(login))
        .route("/api/identity/logout", post(logout))
        .route("/api/identity/me", get(me))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_wire_and_view_tables_agree() {
        for role in [
            Role::Admin,
            Role::AccountManager,
            Role::PodLead,
            Role::Qa,
            Role::Designer,
            Role::Developer,
            Role::ClientApprover,
        ] {
            assert_eq!(Role::from_wire(role.as_wire()), role);
            assert_eq!(Role::from_view(role.as_view()), role);
        }
        assert_eq!(Role::AccountManager.as_wire(), "account_manager");
        assert_eq!(Role::AccountManager.as_view(), "accountManager");
    }

    #[test]
    fn unknown_role_is_surfaced_not_coerced() {
        let role = Role::from_wire("finance_lead");
        assert_eq!(role, Role::Unknown("finance_lead".to_string()));
        // Round-trips unchanged instead of aliasing to a default role.
        assert_eq!(role.as_wire(), "finance_lead");
    }

    #[test]
    fn profile_serializes_camel_case() {
        let profile = Profile {
            id: Uuid::nil(),
            email: "ana@bundlr.studio".to_string(),
            display_name: "Ana".to_string(),
            role: Role::PodLead,
            status: ProfileStatus::Active,
            organization: "bundlr".to_string(),
            avatar_url: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["displayName"], "Ana");
        assert_eq!(json["role"], "podLead");
        assert_eq!(json["status"], "active");
    }
}
