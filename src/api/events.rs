use crate::api::AppState;
use crate::api::dto::chat::{EventFrame, MessageDto};
use crate::domain::message::Message;
use crate::domain::session::Claims;
use axum::{
    extract::{
        Path, Query, State,
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::{broadcast, watch};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    token: String,
}

/// WebSocket feed of inserts for one conversation. Browsers cannot set an
/// Authorization header on the upgrade request, so the token travels in the
/// query string. Access is checked before the upgrade completes.
pub async fn conversation_events(
    ws: WebSocketUpgrade,
    Path(conversation_id): Path<Uuid>,
    Query(params): Query<WsParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let claims = match Claims::decode(&params.token, &state.config.auth.jwt_secret) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!(error = %e, "WebSocket handshake failed: invalid token");
            return axum::http::StatusCode::UNAUTHORIZED.into_response();
        }
    };

    match state.chat_service.subscribe(conversation_id, claims.sub).await {
        Ok(inserts) => {
            let shutdown_rx = state.shutdown_rx.clone();
            ws.on_upgrade(move |socket| stream_inserts(socket, inserts, shutdown_rx))
        }
        Err(e) => e.into_response(),
    }
}

/// Maps one broadcast receive result to the frame pushed to the client.
/// A lagged receiver gets a `Resync` frame telling it to re-fetch the
/// history; a closed channel ends the stream.
fn next_frame(event: Result<Message, broadcast::error::RecvError>) -> Option<EventFrame> {
    match event {
        Ok(message) => Some(EventFrame::Message { message: MessageDto::from(&message) }),
        Err(broadcast::error::RecvError::Lagged(missed)) => {
            tracing::debug!(missed, "Insert subscriber lagged, requesting resync");
            Some(EventFrame::Resync)
        }
        Err(broadcast::error::RecvError::Closed) => None,
    }
}

async fn stream_inserts(
    mut socket: WebSocket,
    mut inserts: broadcast::Receiver<Message>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            event = inserts.recv() => {
                let Some(frame) = next_frame(event) else { break };

                let Ok(json) = serde_json::to_string(&frame) else { break };
                if socket.send(WsMessage::Text(json.into())).await.is_err() {
                    break;
                }
            }

            incoming = socket.next() => {
                match incoming {
                    None | Some(Err(_)) | Some(Ok(WsMessage::Close(_))) => break,
                    Some(Ok(_)) => {}
                }
            }

            _ = async { shutdown_rx.wait_for(|&s| s).await.map(|_| ()) } => {
                let _ = socket.send(WsMessage::Close(None)).await;
                break;
            }
        }
    }
}
