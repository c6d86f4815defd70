//! The request side of the session subsystem: lazy per-request resolution,
//! and the end-of-request flush that persists a session only when its
//! durable form actually changed.

use std::sync::{Arc, Mutex, OnceLock};

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse as _, Response};
use gauged_session::{
    AlreadyLoggedOutError, Session, SessionId, SessionRecord, TransientData, UserId,
};
use tower_cookies::{Cookie, Cookies};
use tracing::debug;

use crate::error::{ForbiddenSnafu, InternalServerSnafu, RequestError, RequestResult};
use crate::{LOG_TARGET, SharedState};

const BEARER_PREFIX: &str = "Bearer ";

/// A session bound to the current request: its id, the durable form it had
/// when resolved, and the live value handler code mutates.
#[derive(Debug)]
struct BoundSession {
    id: SessionId,
    initial: SessionRecord,
    session: Mutex<Session>,
}

/// Shared handle to the request's resolved session.
///
/// Clones refer to the same session; the flush middleware reads the final
/// state through the same handle once the handler is done.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    inner: Arc<BoundSession>,
}

impl SessionHandle {
    fn bind(id: SessionId, session: Session) -> Self {
        let initial = session.to_record();
        Self {
            inner: Arc::new(BoundSession {
                id,
                initial,
                session: Mutex::new(session),
            }),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.inner.id
    }

    fn with<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        f(&mut self.inner.session.lock().expect("Locking failed"))
    }

    pub fn user(&self) -> Option<UserId> {
        self.with(|s| s.user().cloned())
    }

    pub fn is_authenticated(&self) -> bool {
        self.with(|s| s.is_authenticated())
    }

    /// Absolute expiry epoch of the underlying record; `0` never expires.
    pub fn expiry(&self) -> u64 {
        self.with(|s| s.expiry())
    }

    /// Attach a confirmed identity (pending → authenticated; an already
    /// authenticated session gets its identity overwritten).
    pub fn elevate(&self, user: UserId) {
        self.with(|s| s.elevate(user));
    }

    /// Mark the session for deletion at flush time.
    pub fn mark_logged_out(&self) -> Result<(), AlreadyLoggedOutError> {
        self.with(|s| s.mark_logged_out())
    }

    /// Replace the handshake scratch space, discarding stale state.
    pub fn transient_replace(&self, data: TransientData) {
        self.with(|s| s.transient_replace(data));
    }

    pub fn transient_remove(&self, key: &str) -> Option<Option<String>> {
        self.with(|s| s.transient_remove(key))
    }

    pub fn transient_clear(&self) {
        self.with(|s| s.transient_clear());
    }

    pub fn transient_snapshot(&self) -> TransientData {
        self.with(|s| s.transient().clone())
    }

    fn is_logged_out(&self) -> bool {
        self.with(|s| s.is_logged_out())
    }

    fn final_record(&self) -> SessionRecord {
        self.with(|s| s.to_record())
    }

    fn initial_record(&self) -> &SessionRecord {
        &self.inner.initial
    }
}

/// Per-request slot the resolver extractors bind the session into.
///
/// Inserted empty by [`flush_session`]; staying empty means the request
/// never touched a session, and the flush (cookie instructions included) is
/// skipped entirely.
#[derive(Debug, Clone, Default)]
pub(crate) struct SessionCell(Arc<OnceLock<SessionHandle>>);

impl SessionCell {
    fn get(&self) -> Option<&SessionHandle> {
        self.0.get()
    }

    fn bind(&self, handle: SessionHandle) -> SessionHandle {
        self.0.get_or_init(|| handle).clone()
    }
}

/// Middleware wrapping every request; resolution itself happens lazily in
/// the extractors.
///
/// After the inner handler finishes (success or handled error — the
/// response passes through untouched), the bound session is flushed:
/// logged-out sessions are deleted along with their cookie, anything else
/// is written back only when the durable form changed, and the cookie is
/// re-set either way so the browser-side expiry window keeps sliding.
pub(crate) async fn flush_session(
    State(state): State<SharedState>,
    cookies: Cookies,
    mut request: Request,
    next: Next,
) -> Response {
    let cell = SessionCell::default();
    request.extensions_mut().insert(cell.clone());

    let response = next.run(request).await;

    let Some(handle) = cell.get() else {
        return response;
    };

    match flush(&state, &cookies, handle).await {
        Ok(()) => response,
        Err(err) => err.into_response(),
    }
}

async fn flush(
    state: &SharedState,
    cookies: &Cookies,
    handle: &SessionHandle,
) -> RequestResult<()> {
    let id = handle.id();

    if handle.is_logged_out() {
        state.sessions.delete(id).await?;
        let mut removal = Cookie::new(state.opts().cookie_name.clone(), "");
        removal.set_path("/");
        cookies.remove(removal);
        debug!(target: LOG_TARGET, %id, "Deleted logged-out session");
        return Ok(());
    }

    let final_record = handle.final_record();
    if final_record != *handle.initial_record() {
        state.sessions.persist(id, &final_record).await?;
    }
    cookies.add(session_cookie(state, id));

    Ok(())
}

fn session_cookie(state: &SharedState, id: &SessionId) -> Cookie<'static> {
    let opts = state.opts();
    let mut cookie = Cookie::new(opts.cookie_name.clone(), id.to_string());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(tower_cookies::cookie::SameSite::Lax);
    cookie.set_max_age(time::Duration::seconds(i64::from(opts.session_ttl_secs)));
    cookie
}

fn request_cell(parts: &Parts) -> RequestResult<SessionCell> {
    parts.extensions.get::<SessionCell>().cloned().ok_or_else(|| {
        InternalServerSnafu {
            msg: "session middleware not installed",
        }
        .build()
    })
}

async fn extract_cookies(parts: &mut Parts, state: &SharedState) -> RequestResult<Cookies> {
    Cookies::from_request_parts(parts, state)
        .await
        .map_err(|(_, msg)| InternalServerSnafu { msg }.build())
}

fn cookie_session_id(state: &SharedState, cookies: &Cookies) -> Option<SessionId> {
    let cookie = cookies.get(&state.opts().cookie_name)?;
    cookie
        .value()
        .parse()
        .inspect_err(|err| {
            debug!(target: LOG_TARGET, %err, "Invalid session cookie value");
        })
        .ok()
}

fn bearer_session_id(parts: &Parts) -> Option<SessionId> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix(BEARER_PREFIX)?;
    token
        .parse()
        .inspect_err(|err| {
            debug!(target: LOG_TARGET, %err, "Invalid bearer token");
        })
        .ok()
}

/// Cookie-resolved session with create-on-miss, for routes that must work
/// without prior authentication (page loads, the login handshake).
#[derive(Debug, Clone)]
pub struct UserSession(pub SessionHandle);

impl FromRequestParts<SharedState> for UserSession {
    type Rejection = RequestError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let cell = request_cell(parts)?;
        if let Some(handle) = cell.get() {
            return Ok(Self(handle.clone()));
        }

        let cookies = extract_cookies(parts, state).await?;
        let cookie_id = cookie_session_id(state, &cookies);
        let (id, session) = state.sessions.resolve_or_create(cookie_id.as_ref()).await?;

        Ok(Self(cell.bind(SessionHandle::bind(id, session))))
    }
}

/// Authenticated session required: bearer token first, cookie second, and
/// the request is rejected before the handler runs otherwise. No session is
/// created on this path.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: UserId,
    pub session: SessionHandle,
}

impl FromRequestParts<SharedState> for AuthSession {
    type Rejection = RequestError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let cell = request_cell(parts)?;
        if let Some(handle) = cell.get() {
            let user = handle.user().ok_or_else(|| ForbiddenSnafu.build())?;
            return Ok(Self {
                user,
                session: handle.clone(),
            });
        }

        let bearer = bearer_session_id(parts);
        let cookies = extract_cookies(parts, state).await?;
        let cookie_id = cookie_session_id(state, &cookies);

        let Some((id, session)) = state
            .sessions
            .resolve_for_request(cookie_id.as_ref(), bearer.as_ref())
            .await?
        else {
            return ForbiddenSnafu.fail();
        };

        let handle = cell.bind(SessionHandle::bind(id, session));
        let user = handle.user().ok_or_else(|| ForbiddenSnafu.build())?;
        Ok(Self {
            user,
            session: handle,
        })
    }
}

/// The current user, if the (create-on-miss) cookie session is
/// authenticated. Pages use this to render login state.
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Option<UserId>);

impl FromRequestParts<SharedState> for OptionalUser {
    type Rejection = RequestError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let UserSession(handle) = UserSession::from_request_parts(parts, state).await?;
        Ok(Self(handle.user()))
    }
}
