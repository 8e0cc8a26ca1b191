mod config;
mod orchestrator;
mod registry;
mod session;
mod types;

use std::sync::Arc;

use axum::Router;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use futures::{SinkExt, StreamExt};

use crate::orchestrator::Orchestrator;
use crate::types::ClientMsg;

#[derive(Clone)]
struct AppState {
    orchestrator: Arc<Orchestrator>,
}

/// Plain health response; also the target of the deployment's keep-warm ping.
async fn health() -> &'static str {
    "ok"
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let connection_id = uuid::Uuid::new_v4().to_string();
    tracing::info!("WebSocket connected: {}", connection_id);

    // Pump everything the orchestrator addresses to this connection out to
    // the wire.
    let mut outbound = state.orchestrator.hub.register(connection_id.clone());
    let send_task = tokio::spawn(async move {
        while let Some(msg) = outbound.recv().await {
            let Ok(json) = serde_json::to_string(&msg) else {
                continue;
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                return;
            }
        }
    });

    while let Some(Ok(msg)) = receiver.next().await {
        let Message::Text(text) = msg else { continue };

        let client_msg: ClientMsg = match serde_json::from_str(&text) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("Invalid message from {}: {}", connection_id, e);
                continue;
            }
        };

        orchestrator::handle_message(&state.orchestrator, &connection_id, client_msg).await;
    }

    tracing::info!("WebSocket disconnected: {}", connection_id);
    orchestrator::disconnect(&state.orchestrator, &connection_id).await;
    state.orchestrator.hub.unregister(&connection_id);
    send_task.abort();
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let port = config::port();
    let orchestrator = Orchestrator::new(config::Timeouts::default());

    let app = Router::new()
        .route("/", get(health))
        .route("/ws", get(ws_handler))
        .layer(config::cors_layer())
        .with_state(AppState { orchestrator });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .expect("Failed to bind");

    tracing::info!("redblack server running on port {}", port);

    axum::serve(listener, app).await.unwrap();
}
