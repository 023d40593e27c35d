use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::HeaderMap,
    response::Response,
};
use futures::stream::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::auth::types::AuthClaims;
use crate::shared::{AppError, AppState};
use crate::signaling::channel::{OutboundFrame, PeerChannel, WebSocketChannel};
use crate::signaling::connection::SignalingConnection;

/// WebSocket endpoint that handles authentication via Sec-WebSocket-Protocol header
/// GET /ws/{room_id} with JWT token in Sec-WebSocket-Protocol header
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path(room_id): Path<String>,
    headers: HeaderMap,
    State(app_state): State<AppState>,
) -> Result<Response, AppError> {
    info!(
        room_id = %room_id,
        "WebSocket connection requested"
    );

    // Extract JWT from Sec-WebSocket-Protocol header
    let jwt_token = headers
        .get("sec-websocket-protocol")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            warn!("Missing or invalid Sec-WebSocket-Protocol header");
            AppError::Unauthorized("Missing authentication token".to_string())
        })?;

    // Validate JWT token and get the verified identity from claims
    let claims = app_state.token_config.validate_token(jwt_token)?;

    info!(
        room_id = %room_id,
        email = %claims.email,
        role = %claims.role,
        "WebSocket authentication successful"
    );

    Ok(ws.on_upgrade(move |socket| handle_websocket_connection(socket, room_id, claims, app_state)))
}

/// Handle the upgraded WebSocket connection
///
/// Pumps outbound frames queued by the coordinator and inbound frames into
/// the dispatcher until either side closes, then runs disconnect cleanup.
async fn handle_websocket_connection(
    mut socket: WebSocket,
    room_id: String,
    claims: AuthClaims,
    app_state: AppState,
) {
    info!(
        room_id = %room_id,
        email = %claims.email,
        "WebSocket connection established"
    );

    // Create the outbound channel (app -> client); the core holds only the
    // sending handle, stored in the room maps.
    let (outbound_sender, mut outbound_receiver) = mpsc::unbounded_channel::<OutboundFrame>();
    let channel: Arc<dyn PeerChannel> = Arc::new(WebSocketChannel::new(outbound_sender));

    let mut connection = SignalingConnection::new(
        Arc::clone(&app_state.coordinator),
        Arc::clone(&app_state.registry),
        Arc::clone(&channel),
        claims,
        room_id.clone(),
    );
    connection.open().await;

    loop {
        tokio::select! {
            // Outbound frames (from our app to the client)
            frame = outbound_receiver.recv() => {
                match frame {
                    Some(OutboundFrame::Text(text)) => {
                        if socket.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    // Close requested by the core (kick, session replacement)
                    Some(OutboundFrame::Close) | None => break,
                }
            }

            // Inbound frames (from the client to our app)
            inbound = socket.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(e) = connection.handle_frame(&text).await {
                            warn!(
                                room_id = %room_id,
                                peer_id = %connection.peer_id(),
                                error = %e,
                                "Tearing down connection on invalid frame"
                            );
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // Ignore binary/ping/pong
                    Some(Err(e)) => {
                        warn!(
                            room_id = %room_id,
                            peer_id = %connection.peer_id(),
                            error = %e,
                            "WebSocket receive error"
                        );
                        break;
                    }
                }
            }
        }
    }

    // Clean close; errors here mean the peer is already gone.
    let _ = socket.send(Message::Close(None)).await;

    connection.closed().await;

    info!(
        room_id = %room_id,
        peer_id = %connection.peer_id(),
        "WebSocket connection closed"
    );
}
