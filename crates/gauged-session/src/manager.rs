use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::record::SessionRecord;
use crate::session::{Session, now_epoch};
use crate::store::{SessionStore, StoreResult};
use crate::{LOG_TARGET, SessionId, UserId};

/// Creates, resolves and expires sessions over a [`SessionStore`].
///
/// Cheap to clone; one instance serves all concurrently executing requests.
#[derive(Debug, Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Mint a fresh pending session and persist it immediately, so a cookie
    /// issued for it is always redeemable even if the request never mutates
    /// the session again.
    pub async fn create(&self) -> StoreResult<(SessionId, Session)> {
        let id = SessionId::generate();
        let record = SessionRecord {
            user: None,
            expiry: now_epoch() + self.ttl.as_secs(),
            transient: Default::default(),
        };
        self.store.set(&id, record.encode()).await?;
        debug!(target: LOG_TARGET, %id, "Created session");
        Ok((id, Session::from_record(record)))
    }

    /// Mint an already-authenticated session with an explicit expiry.
    ///
    /// `expiry` is absolute epoch seconds; `0` never expires. This is the
    /// administrative path for issuing bearer credentials outside the
    /// browser login flow.
    pub async fn insert(&self, user: UserId, expiry: u64) -> StoreResult<SessionId> {
        let id = SessionId::generate();
        let record = SessionRecord {
            user: Some(user),
            expiry,
            transient: Default::default(),
        };
        self.store.set(&id, record.encode()).await?;
        Ok(id)
    }

    /// Look up a session by id, enforcing expiry.
    ///
    /// Expired records are deleted as a side effect (lazy expiry; there is
    /// no background sweep). Corrupt records read as absent.
    pub async fn lookup_by_id(&self, id: &SessionId) -> StoreResult<Option<Session>> {
        let Some(raw) = self.store.get(id).await? else {
            return Ok(None);
        };

        let record = match SessionRecord::decode(&raw) {
            Ok(record) => record,
            Err(err) => {
                debug!(target: LOG_TARGET, %id, %err, "Unreadable session record");
                return Ok(None);
            }
        };

        if record.is_expired_at(now_epoch()) {
            debug!(target: LOG_TARGET, %id, "Session expired");
            self.store.delete(id).await?;
            return Ok(None);
        }

        Ok(Some(Session::from_record(record)))
    }

    /// Resolve the session authorizing a protected request.
    ///
    /// A bearer token wins over the cookie; either is honored only while the
    /// session it names is authenticated. Pending sessions never authorize
    /// anything.
    pub async fn resolve_for_request(
        &self,
        cookie: Option<&SessionId>,
        bearer: Option<&SessionId>,
    ) -> StoreResult<Option<(SessionId, Session)>> {
        for id in [bearer, cookie].into_iter().flatten() {
            if let Some(session) = self.lookup_by_id(id).await? {
                if session.is_authenticated() {
                    return Ok(Some((id.clone(), session)));
                }
            }
        }
        Ok(None)
    }

    /// Cookie resolution for endpoints that must work without prior
    /// authentication: any live session counts, and a missing, expired or
    /// unreadable one is replaced by a fresh pending session under a fresh
    /// id.
    pub async fn resolve_or_create(
        &self,
        cookie: Option<&SessionId>,
    ) -> StoreResult<(SessionId, Session)> {
        if let Some(id) = cookie {
            if let Some(session) = self.lookup_by_id(id).await? {
                return Ok((id.clone(), session));
            }
        }
        self.create().await
    }

    /// Persist a session's current record under `id`.
    pub async fn persist(&self, id: &SessionId, record: &SessionRecord) -> StoreResult<()> {
        self.store.set(id, record.encode()).await
    }

    /// Remove a session record.
    pub async fn delete(&self, id: &SessionId) -> StoreResult<()> {
        self.store.delete(id).await
    }
}
