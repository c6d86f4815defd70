mod admin;
mod api;
mod auth;

use axum::Router;
use axum::extract::{FromRequest, Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use maud::Markup;
use tower_cookies::CookieManagerLayer;

use crate::SharedState;
use crate::error::{ErrorResponse, RequestError};
use crate::session::{self, OptionalUser};

#[derive(Clone, Debug)]
#[must_use]
pub struct Maud(pub Markup);

impl IntoResponse for Maud {
    fn into_response(self) -> Response {
        (
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/html; charset=utf-8"),
            )],
            self.0.0,
        )
            .into_response()
    }
}

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(RequestError))]
pub struct AppJson<T>(pub T);

impl<T> IntoResponse for AppJson<T>
where
    axum::Json<T>: IntoResponse,
{
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

pub async fn not_found(_state: State<SharedState>, _req: Request) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        AppJson(ErrorResponse {
            message: "Not Found".to_string(),
        }),
    )
}

pub fn route_handler(state: SharedState) -> Router {
    let mut router = Router::new()
        .route("/", get(index))
        .route("/oauth/login", get(auth::login))
        .route("/oauth/callback", get(auth::callback))
        .route("/oauth/logout", get(auth::logout))
        .route("/api/user", get(api::user));

    if state.opts().admin_api {
        router = router.merge(admin::route_handler());
    }

    router
        .fallback(not_found)
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(state, session::flush_session))
        // cookie handling must wrap the flush middleware so the cookie
        // instructions it issues still make it onto the response
        .layer(CookieManagerLayer::new())
}

async fn index(OptionalUser(user): OptionalUser) -> Maud {
    Maud(maud::html! {
        (maud::DOCTYPE)
        html {
            head {
                title { "Metrics" }
            }
            body {
                h1 { "Metrics" }
                @if let Some(user) = user {
                    p { "Signed in as " (user) }
                    p { a href="/oauth/logout" { "Sign out" } }
                } @else {
                    p { a href="/oauth/login" { "Sign in" } }
                }
            }
        }
    })
}
