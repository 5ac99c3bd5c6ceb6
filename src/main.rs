use std::convert::Infallible;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info};
use mimalloc::MiMalloc;
use warp::Filter;

use boxd_wrapped::config::Config;
use boxd_wrapped::fetch::HttpFetcher;
use boxd_wrapped::fonts::FontStack;
use boxd_wrapped::handlers_collage::build_collage_routes;
use boxd_wrapped::handlers_diary::build_diary_routes;
use boxd_wrapped::handlers_wrapped::build_wrapped_routes;
use boxd_wrapped::poster_cache::PosterCache;
use boxd_wrapped::poster_resolver::PosterResolver;
use boxd_wrapped::warp_helpers::{cors, handle_rejection, AppState};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = Config::from_env()?;
    let port = config.port;

    info!("Starting boxd-wrapped server on port {}", port);
    info!("Source site: {}", config.base_url);
    info!("Poster cache: {}", config.poster_cache_path);
    info!("Poster workers: {}", config.workers);

    if !is_port_available(port) {
        error!(
            "Port {} is already in use. Stop the existing boxd-wrapped instance or pick a different BOXD_PORT.",
            port
        );
        return Err(format!("Port {} is already in use", port).into());
    }

    let state = initialize_state(&config)?;
    info!("Poster resolver initialized");

    let health = warp::path("health").and(warp::get()).and_then(health_check);

    let routes = health
        .or(build_diary_routes(state.clone()))
        .or(build_collage_routes(state.clone()))
        .or(build_wrapped_routes(state))
        .with(cors())
        .with(warp::log("boxd_wrapped"))
        .recover(handle_rejection);

    info!(
        "Server started successfully, listening on http://localhost:{}",
        port
    );

    warp::serve(routes).run(([0, 0, 0, 0], port)).await;

    Ok(())
}

fn is_port_available(port: u16) -> bool {
    TcpListener::bind(("0.0.0.0", port)).is_ok()
}

fn initialize_state(config: &Config) -> Result<AppState, Box<dyn std::error::Error>> {
    let fetcher = Arc::new(HttpFetcher::new(Duration::from_secs(
        config.http_timeout_secs,
    )));
    let cache = PosterCache::new(&config.poster_cache_path)?;
    let resolver = PosterResolver::new(
        fetcher.clone(),
        cache,
        &config.base_url,
        (config.poster_width, config.poster_height),
        FontStack::load(),
        config.workers,
    )?;

    Ok(AppState {
        config: Arc::new(config.clone()),
        fetcher,
        resolver: Arc::new(resolver),
    })
}

async fn health_check() -> Result<impl warp::Reply, Infallible> {
    Ok(warp::reply::json(&serde_json::json!({ "status": "ok" })))
}
