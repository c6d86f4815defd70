mod error;
mod identity;
mod routes;
mod session;

use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr as _;
use std::sync::Arc;
use std::time::Duration;
use std::{io, result};

use axum::http::HeaderValue;
use axum::http::Method;
use axum::http::header::{ACCEPT, CONTENT_TYPE};
use gauged_session::{RedbSessionStore, SessionManager, StoreOpenError};
use snafu::{ResultExt as _, Snafu, Whatever};
use tokio::net::{TcpListener, TcpSocket};
use tokio::signal;
use tower_http::cors::CorsLayer;
use tracing::info;

pub use crate::error::{ErrorResponse, RequestError, RequestResult};
pub use crate::identity::{DevIdentityProvider, IdentityError, IdentityProvider};
pub use crate::session::{AuthSession, OptionalUser, SessionHandle, UserSession};

const LOG_TARGET: &str = "gauged::server";

type WhateverResult<T> = result::Result<T, Whatever>;

#[derive(Clone, Debug)]
pub struct Opts {
    /// Listen address, e.g. `127.0.0.1:8080`.
    pub listen: String,
    pub data_dir: PathBuf,
    /// Name of the client-visible cookie carrying the session id.
    pub cookie_name: String,
    pub session_ttl_secs: u32,
    /// Mount the session administration API.
    pub admin_api: bool,
    pub cors_origin: Option<String>,
    /// Public base URL, used to build the identity-callback URL. Relative
    /// callback URLs (same-host providers, the dev provider) work without
    /// it.
    pub public_url: Option<String>,
    pub reuseport: bool,
}

impl Opts {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.session_ttl_secs))
    }

    pub fn callback_url(&self) -> String {
        match &self.public_url {
            Some(base) => format!("{}/oauth/callback", base.trim_end_matches('/')),
            None => "/oauth/callback".to_owned(),
        }
    }

    pub fn cors_origin(&self, listen: SocketAddr) -> WhateverResult<HeaderValue> {
        self.cors_origin
            .clone()
            .unwrap_or_else(|| format!("http://{}", listen))
            .parse()
            .whatever_context("cors_origin does not parse as an http value")
    }
}

pub struct AppState {
    pub sessions: SessionManager,
    pub identity: Arc<dyn IdentityProvider>,
    opts: Opts,
}

impl AppState {
    pub fn new(sessions: SessionManager, identity: Arc<dyn IdentityProvider>, opts: Opts) -> Self {
        Self {
            sessions,
            identity,
            opts,
        }
    }

    pub fn opts(&self) -> &Opts {
        &self.opts
    }
}

pub type SharedState = Arc<AppState>;

#[derive(Debug, Snafu)]
pub enum ServerError {
    #[snafu(transparent)]
    Io {
        source: io::Error,
    },

    ListenAddr {
        source: AddrParseError,
    },

    Database {
        source: redb::DatabaseError,
    },

    StoreOpen {
        source: StoreOpenError,
    },

    #[snafu(display("database thread panicked"))]
    DbJoin {
        source: tokio::task::JoinError,
    },

    Cors {
        source: Whatever,
    },
}

pub type ServerResult<T> = std::result::Result<T, ServerError>;

pub struct Server {
    listener: TcpListener,

    state: SharedState,
    opts: Opts,
}

impl Server {
    pub async fn init(opts: Opts, identity: Arc<dyn IdentityProvider>) -> ServerResult<Server> {
        let listener = Self::get_listener(&opts).await?;

        tokio::fs::create_dir_all(&opts.data_dir).await?;
        let db_path = opts.data_dir.join("sessions.redb");
        let store = tokio::task::spawn_blocking(move || {
            let db = redb_bincode::Database::create(db_path).context(DatabaseSnafu)?;
            RedbSessionStore::new(Arc::new(db)).context(StoreOpenSnafu)
        })
        .await
        .context(DbJoinSnafu)??;

        let sessions = SessionManager::new(Arc::new(store), opts.session_ttl());
        let state = Arc::new(AppState::new(sessions, identity, opts.clone()));

        info!(target: LOG_TARGET, "Listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            state,
            opts,
        })
    }

    pub async fn get_listener(opts: &Opts) -> ServerResult<TcpListener> {
        let socket = {
            let addr = SocketAddr::from_str(&opts.listen).context(ListenAddrSnafu)?;

            let socket = if addr.is_ipv4() {
                TcpSocket::new_v4()?
            } else {
                TcpSocket::new_v6()?
            };
            if opts.reuseport {
                #[cfg(unix)]
                socket.set_reuseport(true)?;
            }
            socket.set_nodelay(true)?;

            socket.bind(addr)?;

            socket
        };

        Ok(socket.listen(1024)?)
    }

    pub async fn run(self) -> ServerResult<()> {
        let listen = self.addr()?;
        let router = routes::route_handler(self.state.clone());

        info!(target: LOG_TARGET, "Starting server");
        axum::serve(
            self.listener,
            router
                .layer(cors_layer(&self.opts, listen)?)
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        Ok(())
    }

    pub fn addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}

fn cors_layer(opts: &Opts, listen: SocketAddr) -> ServerResult<CorsLayer> {
    Ok(CorsLayer::new()
        .allow_credentials(true)
        .allow_headers([ACCEPT, CONTENT_TYPE])
        .max_age(Duration::from_secs(86400))
        .allow_origin(opts.cors_origin(listen).context(CorsSnafu)?)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
            Method::HEAD,
        ]))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
