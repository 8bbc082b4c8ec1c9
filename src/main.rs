mod cache;
mod config;
mod db;
mod dtos;
mod error;
mod geo;
mod handler;
mod middleware;
mod models;
mod routes;
mod scoring;
mod tracing_config;
mod utils;

use axum::http::{
    HeaderValue, Method,
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
use cache::CacheClient;
use config::Config;
use db::DBClient;
use dotenv::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

use axum_client_ip::ClientIpSource;
use std::net::SocketAddr;

#[derive(Clone)]
pub struct AppState {
    pub env: Arc<Config>,
    pub db_client: DBClient,
    pub cache_client: CacheClient,
    pub ip_extraction: ClientIpSource,
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let _guard = tracing_config::init_tracing();

    let config = Config::init();

    let ip_source = if cfg!(debug_assertions) {
        ClientIpSource::ConnectInfo
    } else {
        ClientIpSource::CfConnectingIp
    };

    let pool = match PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(2))
        .idle_timeout(Duration::from_secs(30))
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("Connection to PostgreSQL established");
            pool
        }
        Err(err) => {
            tracing::error!("Failed to connect to PostgreSQL: {:?}", err);
            std::process::exit(1);
        }
    };

    let db_client = DBClient::new(pool);

    // PostGIS extension, enum types, tables and spatial indexes.
    if let Err(err) = db_client.init_schema().await {
        tracing::error!("Failed to initialize database schema: {:?}", err);
        std::process::exit(1);
    }
    tracing::info!("Database schema ready");

    let cache_client = CacheClient::connect(config.redis_url.as_deref()).await;

    // Mobile clients send no Origin; browsers only hit this API from the
    // configured frontend, when one is set.
    let cors = match &config.frontend_url {
        Some(origin) => CorsLayer::new()
            .allow_origin(
                origin
                    .parse::<HeaderValue>()
                    .expect("FRONTEND_URL must be a valid origin"),
            )
            .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
            .allow_credentials(true)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ]),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_headers(Any)
            .allow_methods(Any),
    };

    let app_state = AppState {
        env: Arc::new(config.clone()),
        db_client,
        cache_client,
        ip_extraction: ip_source,
    };

    let app = routes::create_router(app_state).layer(cors);

    tracing::info!("Server running on http://0.0.0.0:{}", config.port);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", &config.port))
        .await
        .unwrap();

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
