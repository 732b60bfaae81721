//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, FsStorageAdapter, WavProbeAdapter},
    config::Config,
    error::ApiError,
    web::{
        auth::{login_handler, logout_handler, me_handler, signup_handler},
        middleware::require_auth,
        rest::{
            self, favorite_ids_handler, get_folktale_handler, get_notes_handler,
            get_progress_handler, list_favorites_handler, list_folktales_handler,
            list_music_handler, list_regions_handler, list_sources_handler,
            put_notes_handler, put_progress_handler, reading_stats_handler,
            toggle_favorite_handler, upload_music_handler,
        },
        state::AppState,
        ws_handler,
    },
};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Uploads are validated at 50 MiB; the transport limit sits above that so the
// validator, not the body limit, is what refuses an oversized file.
const BODY_LIMIT_BYTES: usize = 64 * 1024 * 1024;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let storage_adapter = Arc::new(FsStorageAdapter::new(
        config.media_root.clone(),
        config.public_base_url.clone(),
    ));
    let probe_adapter = Arc::new(WavProbeAdapter::new());

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db: db_adapter,
        storage: storage_adapter,
        probe: probe_adapter,
        config: config.clone(),
    });

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .cors_origin
                .parse::<HeaderValue>()
                .map_err(|e| ApiError::Internal(format!("Invalid CORS_ORIGIN: {e}")))?,
        )
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/folktales", get(list_folktales_handler))
        .route("/filters/regions", get(list_regions_handler))
        .route("/filters/sources", get(list_sources_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/me", get(me_handler))
        .route("/folktales/{id}", get(get_folktale_handler))
        .route("/folktales/{id}/favorite", post(toggle_favorite_handler))
        .route(
            "/folktales/{id}/progress",
            get(get_progress_handler).put(put_progress_handler),
        )
        .route(
            "/folktales/{id}/notes",
            get(get_notes_handler).put(put_notes_handler),
        )
        .route("/favorites", get(list_favorites_handler))
        .route("/favorites/ids", get(favorite_ids_handler))
        .route("/progress/stats", get(reading_stats_handler))
        .route(
            "/music",
            get(list_music_handler).post(upload_music_handler),
        )
        .route("/ws/player", get(ws_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the uploaded-media directory and the Swagger
    // UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .nest_service("/media", ServeDir::new(&config.media_root))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", rest::ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
