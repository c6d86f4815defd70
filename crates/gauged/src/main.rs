mod cli;

use std::io;
use std::sync::Arc;

use clap::Parser;
use cli::{Opts, make_server_opts};
use gauged_server::{DevIdentityProvider, Server, ServerError};
use snafu::{FromString as _, ResultExt as _, Snafu, Whatever};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

type WhateverResult<T> = std::result::Result<T, snafu::Whatever>;

#[derive(Debug, Snafu)]
pub enum CliError {
    #[snafu(display("Server error: {source}"))]
    Server { source: ServerError },
    #[snafu(display("Miscellaneous error: {source}"))]
    Whatever { source: Whatever },
}

pub type CliResult<T> = std::result::Result<T, CliError>;

#[snafu::report]
#[tokio::main]
async fn main() -> CliResult<()> {
    init_logging().context(WhateverSnafu)?;

    let opts = Opts::parse();
    handle_cmd(opts).await
}

async fn handle_cmd(opts: Opts) -> CliResult<()> {
    match opts.cmd {
        cli::OptsCmd::Serve(ref serve_opts) => {
            let identity = Arc::new(DevIdentityProvider::new(serve_opts.dev_identity.as_str()));
            let server = Server::init(
                make_server_opts(opts.global.data_dir(), serve_opts),
                identity,
            )
            .await
            .context(ServerSnafu)?;

            server.run().await.context(ServerSnafu)?;
        }
    }

    Ok(())
}

pub fn init_logging() -> WhateverResult<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .try_init()
        .map_err(|_| Whatever::without_source("Failed to initialize logging".to_string()))?;

    Ok(())
}
