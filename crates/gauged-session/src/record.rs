use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use snafu::{ResultExt as _, Snafu};

use crate::UserId;

/// Scratch space that survives exactly one round trip of the external
/// identity flow (redirect target, handshake state) and is cleared once
/// consumed.
pub type TransientData = BTreeMap<String, Option<String>>;

/// The durable form of a session, exactly as stored.
///
/// The state-machine state is never stored; it is derived from the presence
/// of `user` on decode. Field names match the wire contract: anything else
/// in a stored value reads as corrupt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionRecord {
    #[serde(rename = "u")]
    pub user: Option<UserId>,
    /// Absolute expiry, seconds since the Unix epoch. `0` (or an absent
    /// field) means the record never expires.
    #[serde(rename = "e", default)]
    pub expiry: u64,
    #[serde(rename = "o", default)]
    pub transient: TransientData,
}

impl SessionRecord {
    pub fn encode(&self) -> String {
        serde_json::to_string(self).expect("Can't fail")
    }

    pub fn decode(raw: &str) -> Result<Self, CorruptRecord> {
        serde_json::from_str(raw).context(CorruptRecordSnafu)
    }

    pub fn is_expired_at(&self, now: u64) -> bool {
        self.expiry != 0 && self.expiry <= now
    }
}

/// A stored value failed to decode. Callers treat this as "no session";
/// it never fails a whole request.
#[derive(Debug, Snafu)]
#[snafu(display("corrupt session record: {source}"))]
pub struct CorruptRecord {
    source: serde_json::Error,
}
