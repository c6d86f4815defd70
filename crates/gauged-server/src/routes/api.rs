use gauged_session::UserId;
use serde::Serialize;

use crate::routes::AppJson;
use crate::session::AuthSession;

#[derive(Serialize)]
pub struct UserInfo {
    pub user: UserId,
    pub expired_in: u64,
}

/// Identity behind the presented credential; the extractor already rejected
/// anything unauthenticated.
pub async fn user(auth: AuthSession) -> AppJson<UserInfo> {
    AppJson(UserInfo {
        user: auth.user,
        expired_in: auth.session.expiry(),
    })
}
