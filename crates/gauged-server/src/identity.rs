use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use gauged_session::{TransientData, UserId};
use snafu::Snafu;

/// The external identity flow failed to produce a verified identity.
#[derive(Debug, Snafu)]
#[snafu(display("identity confirmation failed: {message}"))]
pub struct IdentityError {
    message: String,
}

impl IdentityError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Boundary to the external identity provider.
///
/// The provider protocol itself (OAuth or otherwise) is not this crate's
/// concern. The login route stashes handshake state in the session's
/// transient data and sends the user agent to [`authorize_url`]; the
/// callback route hands the transient data and the callback query
/// parameters to [`confirm`], which yields the verified identity.
///
/// [`authorize_url`]: IdentityProvider::authorize_url
/// [`confirm`]: IdentityProvider::confirm
#[async_trait]
pub trait IdentityProvider: fmt::Debug + Send + Sync {
    /// Where to send the user agent to get their identity confirmed.
    fn authorize_url(&self, callback_url: &str) -> String;

    /// Confirm the identity for the session carrying `transient`.
    async fn confirm(
        &self,
        transient: &TransientData,
        params: &BTreeMap<String, String>,
    ) -> Result<UserId, IdentityError>;
}

/// Provider stand-in that confirms every handshake as one fixed identity.
///
/// For development setups and tests; deployments wire up a real provider
/// implementing [`IdentityProvider`] instead.
#[derive(Debug, Clone)]
pub struct DevIdentityProvider {
    nickname: UserId,
}

impl DevIdentityProvider {
    pub fn new(nickname: impl Into<UserId>) -> Self {
        Self {
            nickname: nickname.into(),
        }
    }
}

#[async_trait]
impl IdentityProvider for DevIdentityProvider {
    fn authorize_url(&self, callback_url: &str) -> String {
        // no external hop to make: straight to the callback
        callback_url.to_owned()
    }

    async fn confirm(
        &self,
        _transient: &TransientData,
        _params: &BTreeMap<String, String>,
    ) -> Result<UserId, IdentityError> {
        Ok(self.nickname.clone())
    }
}
