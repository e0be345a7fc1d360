use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};

use rookery_shared::clients::db::create_pool;
use rookery_shared::clients::rabbitmq::RabbitMQClient;
use rookery_shared::middleware::{init_metrics, init_tracing};
use rookery_shared::types::auth::JwtKeys;
use rookery_social::config::{AppConfig, StorageBackend};
use rookery_social::store::Store;
use rookery_social::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("rookery-social");

    let config = AppConfig::load()?;
    let port = config.port;

    let store = match config.storage {
        StorageBackend::Postgres => Store::postgres(create_pool(&config.database_url, config.db_pool_size)?),
        StorageBackend::Memory => {
            tracing::warn!("using the in-memory store, data is lost on restart");
            Store::memory()
        }
    };

    // The broker is optional; without it events are dropped.
    let rabbitmq = match &config.rabbitmq_url {
        Some(url) => match RabbitMQClient::connect(url).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "RabbitMQ unavailable, events disabled");
                None
            }
        },
        None => None,
    };

    let metrics_handle = match init_metrics() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "prometheus recorder not installed");
            None
        }
    };

    let keys = JwtKeys::new(&config.jwt_secret, config.jwt_access_ttl);
    let state = Arc::new(AppState { store, rabbitmq, metrics_handle });

    let cors = if config.cors_permissive {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin([
                HeaderValue::from_static("http://localhost:3000"),
                HeaderValue::from_static("http://127.0.0.1:3000"),
            ])
            .allow_methods(AllowMethods::list([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ]))
            .allow_headers(AllowHeaders::list([
                header::AUTHORIZATION,
                header::CONTENT_TYPE,
                header::ACCEPT,
            ]))
    };

    let app = build_router(state, keys).layer(cors);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "rookery-social starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
