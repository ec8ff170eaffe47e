use std::error::Error;
use std::sync::Arc;

use gear_tracker::config::Config;
use gear_tracker::db;
use gear_tracker::environment::Environment;
use gear_tracker::log::{error, info, initialize_logger};
use gear_tracker::routes;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    let logger = initialize_logger();

    let config = Config::from_env().map_err(|e| {
        error!(logger, "Invalid configuration"; "error" => %e);
        e
    })?;

    info!(logger, "Starting..."; "address" => %config.socket_address());
    let logger = Arc::new(logger);

    let db = db::connect(logger.clone(), &config)?;
    let address = config.socket_address();
    let environment = Environment::new(logger.clone(), db);

    let (address, server) = warp::serve(routes::make_routes(environment))
        .try_bind_with_graceful_shutdown(address, async {
            tokio::signal::ctrl_c().await.ok();
        })?;

    info!(logger, "Listening"; "address" => %address);

    server.await;

    info!(logger, "Exiting gracefully...");

    Ok(())
}
