use chirp_api::{
    AppState,
    config::Config,
    directory::{AuthorDirectory, HttpIdentityProvider},
    rate_limit::{SlidingWindowLimiter, ingress_limiter},
    routes,
    service::{PostService, ServiceOptions},
    store::InMemoryPostStore,
};
use std::{sync::Arc, time::Instant};
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env()?;

    let identity = Arc::new(HttpIdentityProvider::new(
        &config.identity_api_url,
        &config.identity_api_key,
        config.upstream_timeout,
    )?);
    let directory = AuthorDirectory::new(
        identity,
        config.directory_batch_size,
        config.upstream_timeout,
    );

    let limiter = Arc::new(SlidingWindowLimiter::new(config.rate_limit.clone()));

    // Idle identities are dropped once their window has passed
    let sweeper = limiter.clone();
    let sweep_every = config.rate_limit.window;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_every);
        loop {
            ticker.tick().await;
            sweeper.purge_expired(Instant::now());
        }
    });

    let service = PostService::new(
        Arc::new(InMemoryPostStore::new()),
        limiter,
        directory,
        ServiceOptions::from(&config),
    );
    let state = AppState::new(service, ingress_limiter(config.global_rps), &config.jwt_secret);

    let app = routes::router(state, config.request_timeout);

    let listener = TcpListener::bind(&config.bind_addr).await?;

    info!("Server running on http://{}", config.bind_addr);
    info!("API Endpoints:");
    info!("  GET    /health                 - Health check");
    info!("  GET    /posts                  - Latest posts with authors");
    info!("  POST   /posts                  - Create post (auth, rate limited)");
    info!("  GET    /posts/:id              - Get specific post");
    info!("  GET    /users/:user_id/posts   - Posts by one author");
    info!("  GET    /profiles/:username     - Author profile");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
            info!("Shutting down");
        })
        .await?;

    Ok(())
}
