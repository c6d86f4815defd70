//! Session administration, mounted only when explicitly enabled. Meant for
//! operators on trusted interfaces; minting a session here is how API
//! bearer tokens get issued.

use axum::Router;
use axum::extract::{Query, State};
use axum::routing::get;
use gauged_session::{SessionId, UserId};
use serde::{Deserialize, Serialize};

use crate::SharedState;
use crate::error::RequestResult;
use crate::routes::AppJson;

#[derive(Serialize, Deserialize)]
pub struct SessionInfo {
    pub user: UserId,
    /// Absolute expiry epoch; `0` never expires.
    pub expired_in: u64,
}

#[derive(Serialize)]
pub struct SidInfo {
    pub sid: SessionId,
}

#[derive(Deserialize)]
pub struct SidQuery {
    sid: SessionId,
}

pub fn route_handler() -> Router<SharedState> {
    Router::new().route(
        "/admin/api/session",
        get(session_get).post(session_post).delete(session_delete),
    )
}

/// Inspect a session by id. Pending sessions read as absent, just like they
/// do for API authorization.
async fn session_get(
    State(state): State<SharedState>,
    Query(query): Query<SidQuery>,
) -> RequestResult<AppJson<Option<SessionInfo>>> {
    let info = state
        .sessions
        .lookup_by_id(&query.sid)
        .await?
        .and_then(|session| {
            let user = session.user().cloned()?;
            Some(SessionInfo {
                user,
                expired_in: session.expiry(),
            })
        });

    Ok(AppJson(info))
}

async fn session_post(
    State(state): State<SharedState>,
    AppJson(info): AppJson<SessionInfo>,
) -> RequestResult<AppJson<SidInfo>> {
    let sid = state.sessions.insert(info.user, info.expired_in).await?;
    Ok(AppJson(SidInfo { sid }))
}

async fn session_delete(
    State(state): State<SharedState>,
    Query(query): Query<SidQuery>,
) -> RequestResult<()> {
    state.sessions.delete(&query.sid).await?;
    Ok(())
}
