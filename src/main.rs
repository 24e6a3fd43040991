use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roomcast::auth::{JwtAuthService, TokenConfig};
use roomcast::broadcast::BroadcastEngine;
use roomcast::chat::{ChatService, InMemoryMessageStore, MessageStore, PostgresMessageStore};
use roomcast::config::AppConfig;
use roomcast::event::{EventBus, Scope};
use roomcast::moderation::ContentFilter;
use roomcast::room::{ConnectionRegistry, RoomSessionManager};
use roomcast::shared::AppState;
use roomcast::signaling::SignalingRelay;
use roomcast::websockets::{websocket_handler, MessageDispatcher, WebSocketSubscriber};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roomcast=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting roomcast routing server");

    let config = AppConfig::from_env();

    // Persistence collaborator: Postgres when configured, in-memory otherwise
    let store: Arc<dyn MessageStore> = match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = sqlx::PgPool::connect(&database_url)
                .await
                .expect("Failed to connect to database");
            info!("Using PostgreSQL message store");
            Arc::new(PostgresMessageStore::new(pool))
        }
        Err(_) => {
            info!("Using in-memory message store");
            Arc::new(InMemoryMessageStore::new())
        }
    };

    // Service graph, leaves first
    let registry = Arc::new(ConnectionRegistry::new(config.max_participants));
    let engine = Arc::new(BroadcastEngine::new(Arc::clone(&registry)));
    let sessions = Arc::new(RoomSessionManager::new(
        Arc::clone(&registry),
        Arc::clone(&engine),
    ));
    let relay = Arc::new(SignalingRelay::new(Arc::clone(&engine)));
    let event_bus = EventBus::new();
    let chat = Arc::new(ChatService::new(
        ContentFilter::new(),
        store,
        event_bus.clone(),
    ));
    let dispatcher = Arc::new(MessageDispatcher::new(
        Arc::clone(&sessions),
        Arc::clone(&engine),
        Arc::clone(&relay),
        Arc::clone(&chat),
    ));

    // Bridge persisted domain events to live connections
    event_bus
        .subscribe(
            Scope::Global,
            Arc::new(WebSocketSubscriber::new(Arc::clone(&engine))),
        )
        .await;

    let auth = Arc::new(JwtAuthService::new(TokenConfig::new()));

    let app_state = AppState {
        config: config.clone(),
        auth,
        sessions,
        engine,
        relay,
        chat,
        dispatcher,
        event_bus,
    };

    let app = Router::new()
        .route("/", get(|| async { "roomcast" }))
        .route("/ws/:room_id", get(websocket_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind listener");
    info!(addr = %config.bind_addr, "Server running");
    axum::serve(listener, app).await.expect("Server error");
}
