//! The session-side half of the external identity flow. The provider
//! protocol itself lives behind [`crate::identity::IdentityProvider`].

use std::collections::BTreeMap;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Redirect, Response};

use crate::SharedState;
use crate::error::{ForbiddenSnafu, RequestResult};
use crate::session::UserSession;

/// Transient-data key carrying where to send the user back after the
/// identity round trip.
const INTERNAL_REDIRECT: &str = "internal_redirect";

fn referer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .map(ToOwned::to_owned)
}

pub async fn login(
    State(state): State<SharedState>,
    UserSession(session): UserSession,
    headers: HeaderMap,
) -> RequestResult<Redirect> {
    session.transient_replace(
        [(INTERNAL_REDIRECT.to_owned(), referer(&headers))]
            .into_iter()
            .collect(),
    );

    let authorize = state.identity.authorize_url(&state.opts().callback_url());
    Ok(Redirect::to(&authorize))
}

pub async fn callback(
    State(state): State<SharedState>,
    UserSession(session): UserSession,
    Query(params): Query<BTreeMap<String, String>>,
) -> RequestResult<Response> {
    let redirect = session.transient_remove(INTERNAL_REDIRECT).flatten();

    let user = state
        .identity
        .confirm(&session.transient_snapshot(), &params)
        .await?;
    session.elevate(user);
    // handshake state is single use
    session.transient_clear();

    Ok(match redirect {
        Some(target) => Redirect::to(&target).into_response(),
        None => "Successful login".into_response(),
    })
}

pub async fn logout(
    UserSession(session): UserSession,
    headers: HeaderMap,
) -> RequestResult<Response> {
    if session.mark_logged_out().is_err() {
        return ForbiddenSnafu.fail();
    }

    Ok(match referer(&headers) {
        Some(target) => Redirect::to(&target).into_response(),
        None => "Successful logout".into_response(),
    })
}
