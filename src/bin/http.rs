#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use procurement_tracker::{Register, TrackerConfig, config, http_api, load_register_from_json};
    use tracing::info;

    config::init_tracing();
    let config = TrackerConfig::from_env()?;

    let register = match &config.data_path {
        Some(path) => load_register_from_json(path)?,
        None => Register::new(),
    };
    info!(
        markets = register.markets().len(),
        tasks = register.tasks().len(),
        fixed_today = ?config.fixed_today,
        "starting procurement-tracker http api"
    );

    let state = http_api::AppState::new(register, config.clock());
    http_api::serve(config.http_addr, state).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}
