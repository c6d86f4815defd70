use snafu::Snafu;
use time::OffsetDateTime;

use crate::UserId;
use crate::record::{SessionRecord, TransientData};

/// Seconds since the Unix epoch.
pub fn now_epoch() -> u64 {
    u64::try_from(OffsetDateTime::now_utc().unix_timestamp()).unwrap_or(0)
}

/// Authentication state of a session.
///
/// Only the optional user is stored; the variant is derived on decode and
/// collapses back on encode. `LoggedOut` exists in memory only: flushing
/// such a session deletes its record instead of writing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAuth {
    /// No verified identity yet (anonymous browsing or mid-login).
    Pending,
    Authenticated(UserId),
    /// Marked for deletion at the end of the current request.
    LoggedOut,
}

#[derive(Debug, Snafu)]
#[snafu(display("no authenticated user to log out"))]
pub struct AlreadyLoggedOutError;

/// In-memory, request-scoped view of one session.
///
/// Invariant: [`Session::user`] is `Some` iff the state is
/// [`SessionAuth::Authenticated`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    auth: SessionAuth,
    expiry: u64,
    transient: TransientData,
}

impl Session {
    pub fn from_record(record: SessionRecord) -> Self {
        let auth = match record.user {
            Some(user) => SessionAuth::Authenticated(user),
            None => SessionAuth::Pending,
        };
        Self {
            auth,
            expiry: record.expiry,
            transient: record.transient,
        }
    }

    pub fn to_record(&self) -> SessionRecord {
        SessionRecord {
            user: self.user().cloned(),
            expiry: self.expiry,
            transient: self.transient.clone(),
        }
    }

    pub fn auth(&self) -> &SessionAuth {
        &self.auth
    }

    pub fn user(&self) -> Option<&UserId> {
        match &self.auth {
            SessionAuth::Authenticated(user) => Some(user),
            SessionAuth::Pending | SessionAuth::LoggedOut => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.auth, SessionAuth::Authenticated(_))
    }

    pub fn is_logged_out(&self) -> bool {
        matches!(self.auth, SessionAuth::LoggedOut)
    }

    /// Absolute expiry epoch; `0` never expires.
    pub fn expiry(&self) -> u64 {
        self.expiry
    }

    /// Attach a confirmed identity. Re-elevating an already authenticated
    /// session overwrites the identity.
    pub fn elevate(&mut self, user: UserId) {
        self.auth = SessionAuth::Authenticated(user);
    }

    /// Mark the session for deletion at flush time.
    ///
    /// Fails when there is no authenticated identity to terminate.
    pub fn mark_logged_out(&mut self) -> Result<(), AlreadyLoggedOutError> {
        if !self.is_authenticated() {
            return Err(AlreadyLoggedOutError);
        }
        self.auth = SessionAuth::LoggedOut;
        Ok(())
    }

    pub fn transient(&self) -> &TransientData {
        &self.transient
    }

    pub fn transient_insert(&mut self, key: impl Into<String>, value: Option<String>) {
        self.transient.insert(key.into(), value);
    }

    pub fn transient_remove(&mut self, key: &str) -> Option<Option<String>> {
        self.transient.remove(key)
    }

    /// Replace the whole transient map, discarding stale handshake state.
    pub fn transient_replace(&mut self, data: TransientData) {
        self.transient = data;
    }

    pub fn transient_clear(&mut self) {
        self.transient.clear();
    }
}
