use clap::Parser;
use tracing_subscriber::EnvFilter;

use matrix::cli::{self, Args};
use matrix::core::config::{ConfigPaths, ConfigStore};
use matrix::core::error::MatrixError;
use matrix::core::keyring::TokenStore;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if let Err(err) = run(args).await {
        eprintln!("Error: {err}");
        std::process::exit(err.exit_code());
    }
}

async fn run(args: Args) -> Result<(), MatrixError> {
    let paths = ConfigPaths::discover()?;
    let mut store = ConfigStore::load(paths)?;
    let tokens = TokenStore::new();
    cli::run(args, &mut store, &tokens).await
}
