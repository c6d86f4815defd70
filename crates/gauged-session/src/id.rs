use std::fmt;
use std::str::FromStr;

use rand::RngCore as _;
use serde::{Deserialize, Serialize};
use snafu::Snafu;

/// Ids longer than this are rejected outright rather than hashed or
/// truncated; nothing legitimate mints them.
const MAX_SESSION_ID_LEN: usize = 128;

#[derive(Debug, Snafu)]
#[snafu(display("invalid session id"))]
pub struct InvalidSessionIdError;

/// Opaque, unguessable token identifying a session record.
///
/// Doubles as the cookie value and as a bearer credential, and is used
/// verbatim as the storage key, so only non-empty alphanumeric values are
/// accepted on input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Mint a fresh id with 128 bits of entropy, hex-encoded.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut bytes);
        Self(data_encoding::HEXLOWER.encode(&bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SessionId {
    type Err = InvalidSessionIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty()
            || MAX_SESSION_ID_LEN < s.len()
            || !s.bytes().all(|b| b.is_ascii_alphanumeric())
        {
            return Err(InvalidSessionIdError);
        }
        Ok(Self(s.to_owned()))
    }
}

impl TryFrom<String> for SessionId {
    type Error = InvalidSessionIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

/// Verified external identity: the nickname the identity provider vouched
/// for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(user: impl Into<String>) -> Self {
        Self(user.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(user: &str) -> Self {
        Self(user.to_owned())
    }
}

impl From<String> for UserId {
    fn from(user: String) -> Self {
        Self(user)
    }
}
