//! # shelter
//!
//! Command-line access to the shelter's animal records.
//!
//! ## Environment Variables
//!
//! - `MONGODB_URL` or `DATABASE_URL`: MongoDB connection string (optional)
//! - `SHELTER_USERNAME`, `SHELTER_PASSWORD`, `SHELTER_HOST`, `SHELTER_PORT`
//! - `SHELTER_DB`, `SHELTER_COLLECTION`
//! - `RUST_LOG`: log filter, `info` by default

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = animal_shelter::cli::handle_cli().await {
        tracing::error!(error = %e, "shelter command failed");
        std::process::exit(1);
    }
}
