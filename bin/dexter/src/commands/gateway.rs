//! HTTP/WebSocket front end over the research loop. One shared agent serves
//! every request, so concurrent clients share the cache.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use dexter_agent::Agent;
use dexter_core::{Config, Paths};

use super::build_agent;

#[derive(Clone)]
struct GatewayState {
    agent: Arc<Agent>,
}

#[derive(Deserialize)]
struct AnalyzeRequest {
    query: String,
}

#[derive(Serialize)]
struct AnalyzeResponse {
    answer: String,
    from_cache: bool,
    steps_used: u32,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub async fn run(host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let paths = Paths::new();
    let config = Config::load_or_default(&paths)?;
    let host = host.unwrap_or_else(|| config.gateway.host.clone());
    let port = port.unwrap_or(config.gateway.port);

    let state = GatewayState {
        agent: build_agent()?,
    };

    let app = Router::new()
        .route("/api/analyze", post(analyze_handler))
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("{host}:{port}");
    info!(addr = %addr, "Gateway listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn analyze_handler(
    State(state): State<GatewayState>,
    Json(request): Json<AnalyzeRequest>,
) -> impl IntoResponse {
    match state.agent.run(&request.query).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(AnalyzeResponse {
                answer: outcome.answer,
                from_cache: outcome.from_cache,
                steps_used: outcome.steps_used,
            }),
        )
            .into_response(),
        Err(err) => {
            warn!(error = %err, "Analysis request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

async fn ws_handler(State(state): State<GatewayState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_session(socket, state))
}

/// Query-per-message protocol: each text frame is a query, each reply frame
/// is the JSON analyze response for it.
async fn ws_session(mut socket: WebSocket, state: GatewayState) {
    while let Some(Ok(message)) = socket.recv().await {
        let query = match message {
            WsMessage::Text(text) => text,
            WsMessage::Close(_) => break,
            _ => continue,
        };

        let reply = match state.agent.run(&query).await {
            Ok(outcome) => serde_json::json!({
                "answer": outcome.answer,
                "from_cache": outcome.from_cache,
                "steps_used": outcome.steps_used,
            }),
            Err(err) => serde_json::json!({ "error": err.to_string() }),
        };

        let payload = reply.to_string();
        if socket.send(WsMessage::Text(payload)).await.is_err() {
            break;
        }
    }
}
