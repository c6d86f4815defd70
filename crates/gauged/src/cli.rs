use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use clap::{Args, Parser, Subcommand};

/// Command line options for the gauged server
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Opts {
    /// Global options that apply to all commands
    #[command(flatten)]
    pub global: GlobalOpts,

    /// The specific command to execute
    #[command(subcommand)]
    pub cmd: OptsCmd,
}

/// Global options that apply across all commands
#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Where to keep databases (defaults to the platform state dir)
    #[arg(env = "GAUGED_DATA_DIR", long)]
    pub data_dir: Option<PathBuf>,
}

static PROJECTS_DIR: LazyLock<directories::ProjectDirs> = LazyLock::new(|| {
    directories::ProjectDirs::from("org", "Gauged", "gauged")
        .expect("Unable to determine project's dir")
});

impl GlobalOpts {
    pub fn data_dir(&self) -> &Path {
        self.data_dir.as_deref().unwrap_or_else(|| {
            PROJECTS_DIR
                .state_dir()
                .unwrap_or_else(|| PROJECTS_DIR.data_local_dir())
        })
    }
}

/// Available commands for the gauged CLI
#[derive(Debug, Subcommand)]
pub enum OptsCmd {
    /// Start the dashboard server
    Serve(ServeOpts),
}

#[derive(Debug, Args)]
pub struct ServeOpts {
    /// Listen address
    #[arg(long, short, default_value = "127.0.0.1:8080", env = "GAUGED_LISTEN")]
    pub listen: String,

    /// Set SO_REUSEPORT
    #[arg(long, env = "GAUGED_REUSEPORT")]
    pub reuseport: bool,

    /// Cors origin settings
    #[arg(long, env = "GAUGED_CORS_ORIGIN")]
    pub cors_origin: Option<String>,

    /// Public base URL, used to build the identity-callback URL
    #[arg(long, env = "GAUGED_PUBLIC_URL")]
    pub public_url: Option<String>,

    /// Name of the session cookie
    #[arg(long, default_value = "session", env = "GAUGED_SESSION_COOKIE")]
    pub session_cookie: String,

    /// Session time-to-live in seconds
    #[arg(long, default_value = "86400", env = "GAUGED_SESSION_TTL_SECS")]
    pub session_ttl_secs: u32,

    /// Expose the session administration API
    #[arg(long, env = "GAUGED_ADMIN_API")]
    pub admin_api: bool,

    /// Identity every login confirms as, standing in for a real identity
    /// provider. Development only.
    #[arg(long, default_value = "dev", env = "GAUGED_DEV_IDENTITY")]
    pub dev_identity: String,
}

pub fn make_server_opts(data_dir: &Path, opts: &ServeOpts) -> gauged_server::Opts {
    gauged_server::Opts {
        listen: opts.listen.clone(),
        data_dir: data_dir.to_owned(),
        cookie_name: opts.session_cookie.clone(),
        session_ttl_secs: opts.session_ttl_secs,
        admin_api: opts.admin_api,
        cors_origin: opts.cors_origin.clone(),
        public_url: opts.public_url.clone(),
        reuseport: opts.reuseport,
    }
}
