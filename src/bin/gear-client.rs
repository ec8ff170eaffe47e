use std::error::Error;

use dotenv::dotenv;
use structopt::StructOpt;

use gear_tracker::config::get_variable_or;
use gear_tracker::log::{debug, error, info, initialize_logger};

const DEFAULT_URL: &str = "http://localhost:5000/api/gear";

#[derive(Debug, StructOpt)]
#[structopt(
    name = "gear-client",
    about = "Fetch the gear list once and log the result"
)]
struct Opt {
    /// The API URL to fetch (defaults to `BACKEND_CLIENT_URL`)
    #[structopt(long)]
    url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();

    let opt = Opt::from_args();

    let logger = initialize_logger();

    let url = opt
        .url
        .unwrap_or_else(|| get_variable_or("BACKEND_CLIENT_URL", DEFAULT_URL));
    debug!(logger, "Fetching..."; "url" => &url);

    match fetch(&url).await {
        Ok(body) => info!(logger, "Fetched gear"; "url" => &url, "body" => %body),
        Err(e) => error!(logger, "Error fetching gear"; "url" => &url, "error" => %e),
    }

    Ok(())
}

async fn fetch(url: &str) -> Result<serde_json::Value, reqwest::Error> {
    reqwest::get(url).await?.error_for_status()?.json().await
}
