use std::{net::SocketAddr, sync::Arc};

use axum::serve;
use cineverse::{
    auth::{FirestoreProfiles, IdentityClient},
    build_app,
    config::AppConfig,
    media::{TmdbClient, WikipediaClient},
    routes::Catalog,
    session::AuthService,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("cineverse=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    let tmdb = TmdbClient::new(
        &config.tmdb_base_url,
        &config.tmdb_api_key,
        &config.language,
        config.http_timeout,
    )?;
    let wiki = WikipediaClient::new(&config.wikipedia_base_url, config.http_timeout)?;
    let identity = IdentityClient::new(
        &config.identity_base_url,
        &config.firebase_api_key,
        config.http_timeout,
    )?;
    let profiles = FirestoreProfiles::new(
        &config.firestore_base_url,
        &config.firebase_project_id,
        config.http_timeout,
    )?;

    let auth = AuthService::new(Arc::new(identity), Arc::new(profiles))
        .with_session_ttl(config.session_ttl);
    let catalog = Catalog::new(tmdb, wiki, config.base_path.as_str());

    let app = build_app(catalog, auth, config.auth_rate_limit)
        .layer(TraceLayer::new_for_http())
        .into_make_service_with_connect_info::<SocketAddr>();

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "CinéVerse API listening");

    serve(listener, app).await?;

    Ok(())
}
