mod abi;
mod cli;
mod client;
mod commands;
mod config;
mod error;
mod multicall;
mod query;
mod rpc;
mod signer;
mod typed_data;
mod types;

use clap::Parser;

use tracing_subscriber::{fmt, EnvFilter};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr) // stdout carries command output
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .compact()
        .init();
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_logging();

    let cli = cli::Cli::parse();
    tracing::debug!(chain = %cli.chain, "starting");
    if let Err(err) = cli.run().await {
        tracing::debug!("command failed: {err:?}");
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
