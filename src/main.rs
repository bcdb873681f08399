use std::sync::{Arc, Mutex};

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use salonbook::config::AppConfig;
use salonbook::db;
use salonbook::handlers;
use salonbook::services::clock::BusinessClock;
use salonbook::services::conversation::ConversationStore;
use salonbook::services::messaging::whatsapp::WhatsAppProvider;
use salonbook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let clock = BusinessClock::resolve(&config.business_timezone);
    tracing::info!(timezone = %config.business_timezone, "resolved business timezone");

    let chat = WhatsAppProvider::new(
        config.whatsapp_access_token.clone(),
        config.whatsapp_phone_number_id.clone(),
    );

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        clock,
        chat: Box::new(chat),
        conversations: ConversationStore::default(),
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/webhook/whatsapp", get(handlers::webhook::verify_webhook))
        .route("/webhook/whatsapp", post(handlers::webhook::receive_webhook))
        .route("/api/admin/appointments", get(handlers::admin::get_appointments))
        .route("/api/admin/appointments", post(handlers::admin::create_appointment))
        .route(
            "/api/admin/appointments/:id",
            put(handlers::admin::update_appointment),
        )
        .route(
            "/api/admin/appointments/:id",
            delete(handlers::admin::delete_appointment),
        )
        .route(
            "/api/admin/appointments/:id/status",
            post(handlers::admin::update_appointment_status),
        )
        .route(
            "/api/admin/appointments/:id/notes",
            post(handlers::admin::update_appointment_notes),
        )
        .route("/api/admin/workers", get(handlers::admin::get_workers))
        .route("/api/admin/workers", post(handlers::admin::create_worker))
        .route("/api/admin/workers/:id", put(handlers::admin::update_worker))
        .route(
            "/api/admin/workers/:id",
            delete(handlers::admin::delete_worker),
        )
        .route(
            "/api/admin/workers/:id/toggle",
            post(handlers::admin::toggle_worker),
        )
        .route(
            "/api/admin/workers/:id/slots",
            get(handlers::admin::get_worker_slots),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
