use crate::state::AppState;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use openpenpal_models::realtime::RoomId;
use openpenpal_realtime::ConnId;
use serde::Deserialize;
use tokio::time::{interval, Duration};
use tracing::{debug, instrument, warn};

const KEEPALIVE_INTERVAL_SECONDS: u64 = 25;

#[derive(Deserialize)]
pub struct StreamQuery {
    token: String,
}

#[derive(Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum ClientCommand {
    Subscribe { room: String },
    Unsubscribe { room: String },
}

/// `GET /stream` (spec §4.7 C7): upgrades to a WebSocket and joins the
/// caller into whatever rooms it requests. The access token travels as a
/// query parameter since the WebSocket handshake cannot carry a bearer
/// header from browser clients.
#[instrument(skip(upgrade, state, query))]
pub async fn upgrade(upgrade: WebSocketUpgrade, State(state): State<AppState>, Query(query): Query<StreamQuery>) -> impl IntoResponse {
    match state.token_verifier.verify(&query.token) {
        Ok(claims) if !claims.refresh => upgrade.on_upgrade(move |socket| handle_socket(socket, state)),
        _ => axum::http::StatusCode::UNAUTHORIZED.into_response(),
    }
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (conn_id, mut outbound) = state.hub.connect().await;

    let mut writer_task = tokio::spawn(async move {
        let mut keepalive = interval(Duration::from_secs(KEEPALIVE_INTERVAL_SECONDS));
        loop {
            tokio::select! {
                _ = keepalive.tick() => {
                    if sender.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                }
                payload = outbound.recv() => {
                    match payload {
                        Some(event) => {
                            let Ok(body) = serde_json::to_string(&event) else { continue };
                            if sender.send(Message::Text(body)).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
            }
        }
    });

    let hub = state.hub.clone();
    let reader_conn_id = conn_id;
    let mut reader_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Text(raw) => {
                    if let Err(err) = dispatch_command(&hub, reader_conn_id, &raw).await {
                        warn!(%err, "ignoring malformed stream command");
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut writer_task => reader_task.abort(),
        _ = &mut reader_task => writer_task.abort(),
    }

    debug!(conn = %conn_id, "stream session closed");
    state.hub.disconnect(conn_id).await;
}

async fn dispatch_command(hub: &openpenpal_realtime::Hub, conn: ConnId, raw: &str) -> Result<(), serde_json::Error> {
    match serde_json::from_str::<ClientCommand>(raw)? {
        ClientCommand::Subscribe { room } => hub.subscribe(conn, RoomId(room)).await,
        ClientCommand::Unsubscribe { room } => hub.unsubscribe(conn, &RoomId(room)).await,
    }
    Ok(())
}
