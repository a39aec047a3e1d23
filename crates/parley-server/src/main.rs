use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use parley_api::{AppState, AppStateInner, auth, channels, messages};
use parley_gateway::{Gateway, connection};
use parley_types::api::StateResponse;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let db_path = std::env::var("PARLEY_DB_PATH").unwrap_or_else(|_| "parley.db".into());
    let host = std::env::var("PARLEY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("PARLEY_PORT")
        .unwrap_or_else(|_| "8000".into())
        .parse()?;

    // Init database
    let db = Arc::new(parley_db::Database::open(&PathBuf::from(&db_path))?);

    // The migration seeds the public channel; this re-check keeps the
    // invariant even against databases created before the seed existed.
    if db.ensure_public_channel()? {
        info!("Public chat channel created");
    } else {
        info!("Public chat channel already exists");
    }

    // Shared state
    let gateway = Gateway::new(db.clone());
    let app_state: AppState = Arc::new(AppStateInner {
        db,
        broadcaster: gateway.broadcaster.clone(),
    });

    // Routes
    let http_routes = Router::new()
        .route("/", get(index))
        .route("/sign-up", post(auth::sign_up))
        .route("/login-in", post(auth::login))
        .route("/get-channels", post(channels::get_channels))
        .route("/create-channel", post(channels::create_channel))
        .route("/start-dm/{user_id}", post(channels::start_dm))
        .route("/edit-channel/{channel_id}", post(channels::edit_channel))
        .route("/get-messages/{channel_id}", post(messages::get_messages))
        .route("/send-message/{channel_id}", post(messages::send_message))
        .with_state(app_state);

    let ws_route = Router::new()
        .route("/ws", get(ws_upgrade))
        .with_state(gateway);

    let app = Router::new()
        .merge(http_routes)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Parley server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn index() -> Json<StateResponse> {
    Json(StateResponse { state: "running" })
}

async fn ws_upgrade(State(gateway): State<Gateway>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| connection::handle_connection(socket, gateway))
}
