use std::sync::Arc;

use recipe_share_sdk::{connect, migrate, routes, Config};
use tracing_subscriber::EnvFilter;
use warp::Filter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let pool = connect(&config).await?;
    migrate(&pool).await?;

    let secret: Arc<str> = Arc::from(config.jwt_secret.as_str());
    let api = routes::api(pool, secret)
        .recover(routes::handle_rejection)
        .with(warp::log("recipe_share::http"));

    log::info!("Listening on {}", config.bind_address);
    warp::serve(api).run(config.bind_address).await;

    Ok(())
}
