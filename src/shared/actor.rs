use axum::http::{HeaderMap, StatusCode};
use uuid::Uuid;

use crate::shared::state::AppState;

pub const SESSION_HEADER: &str = "x-session-token";

/// The identity performing a mutation. Threaded explicitly into every
/// mutating call so audit attribution never falls back to a placeholder.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: Option<Uuid>,
    pub name: String,
}

impl Actor {
    pub fn user(id: Uuid, name: impl Into<String>) -> Self {
        Actor {
            id: Some(id),
            name: name.into(),
        }
    }

    /// Unauthenticated client acting through a public approval link.
    pub fn client(client_name: &str) -> Self {
        Actor {
            id: None,
            name: format!("client:{client_name}"),
        }
    }
}

/// Resolve the session token header to an actor, rejecting the request when
/// it is missing or stale. The public approval-token route is the only
/// mutation path that skips this.
pub async fn require_actor(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Actor, (StatusCode, String)> {
    let token = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                "missing session token".to_string(),
            )
        })?;

    let session = state.sessions.find(token).await.ok_or_else(|| {
        (
            StatusCode::UNAUTHORIZED,
            "invalid or expired session".to_string(),
        )
    })?;

    Ok(Actor::user(session.profile_id, session.display_name))
}
