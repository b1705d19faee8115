#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, NEXUS_JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    // Initialize configuration (this loads the config singleton)
    let config = nexus_api::config::config();
    tracing::info!("Starting Nexus API in {:?} mode", config.environment);

    if let Err(e) = nexus_api::server::serve().await {
        eprintln!("server error: {e}");
        std::process::exit(1);
    }
}
