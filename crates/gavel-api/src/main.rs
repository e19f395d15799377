use gavel_api::{setup, telemetry};
use gavel_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load .env in development; real deployments set the environment.
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    telemetry::init_telemetry(config.is_production());

    // Initialize the application (database, services, routes)
    let (state, router) = setup::initialize_app(config).await?;

    // Start the server
    setup::server::start_server(&state.config, router).await?;

    Ok(())
}
