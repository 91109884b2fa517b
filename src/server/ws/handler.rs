//! WebSocket chat endpoint.
//!
//! One `ask` message runs one retrieve → generate cycle. The retrieval
//! result is pushed first so the client can render cited sources while
//! fragments stream in.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};

use super::protocol::{WsIncomingMessage, WS_APP_PROTOCOL};
use crate::core::errors::ApiError;
use crate::rag::Query;
use crate::state::AppState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.protocols([WS_APP_PROTOCOL])
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    while let Some(Ok(msg)) = receiver.next().await {
        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let Ok(incoming) = serde_json::from_str::<WsIncomingMessage>(&text) else {
            let _ = send_json(
                &mut sender,
                json!({"type": "error", "message": "malformed message"}),
            )
            .await;
            continue;
        };

        if let Err(err) = handle_message(&mut sender, &state, incoming).await {
            let _ = send_json(
                &mut sender,
                json!({"type": "error", "message": err.to_string()}),
            )
            .await;
        }
    }
}

async fn handle_message(
    sender: &mut SplitSink<WebSocket, Message>,
    state: &Arc<AppState>,
    data: WsIncomingMessage,
) -> Result<(), ApiError> {
    let msg_type = data.msg_type.as_deref().unwrap_or("");
    if msg_type != "ask" {
        return Err(ApiError::BadRequest(format!(
            "unsupported message type '{}'",
            msg_type
        )));
    }

    let query = Query {
        question: data.question.unwrap_or_default(),
        product: data.product,
        top_k: data.top_k,
    };

    let mut stream = state.engine.ask_stream(&query).await?;

    send_json(
        sender,
        json!({"type": "sources", "sources": stream.sources}),
    )
    .await?;

    while let Some(item) = stream.fragments.recv().await {
        match item {
            Ok(fragment) => {
                send_json(sender, json!({"type": "fragment", "text": fragment})).await?;
            }
            Err(err) => {
                // Sources already went out; the client keeps them.
                send_json(sender, json!({"type": "error", "message": err.to_string()}))
                    .await?;
                return Ok(());
            }
        }
    }

    send_json(sender, json!({"type": "done"})).await?;
    Ok(())
}

async fn send_json(
    sender: &mut SplitSink<WebSocket, Message>,
    payload: Value,
) -> Result<(), ApiError> {
    sender
        .send(Message::Text(payload.to_string()))
        .await
        .map_err(|e| ApiError::internal(format!("websocket send failed: {}", e)))
}
