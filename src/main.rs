use axum::{routing::get, Router};
use classmeet_signaling::shared::AppState;
use classmeet_signaling::signaling::websocket_handler;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// One task per connection on a single-threaded runtime: room state mutation
// between awaits never interleaves, so the registry needs no finer locking.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "classmeet_signaling=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting classmeet signaling server");

    let app_state = AppState::new();

    let app = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/ws/:room_id", get(websocket_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    info!(%addr, "Server running");
    axum::serve(listener, app).await.unwrap();
}
