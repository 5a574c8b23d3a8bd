use crate::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use battle_models::{CombatState, Deployment, MatchResult};
use combat_simulator::BroadcastFrame;
use futures::{Sink, SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateMatchRequest {
    #[serde(default = "Uuid::new_v4")]
    pub match_id: Uuid,
    pub deployments: Vec<Deployment>,
}

#[derive(Debug, Serialize)]
pub struct CreateMatchResponse {
    pub match_id: Uuid,
}

/// POST /api/v1/matches — the "both players ready" trigger.
/// Matchmaking itself (who plays whom) is an external collaborator's
/// concern; this boundary only accepts an already-decided deployment set
/// and starts the simulator.
#[instrument(skip(state, payload), fields(match_id = %payload.match_id))]
pub async fn create_match(State(state): State<AppState>, Json(payload): Json<CreateMatchRequest>) -> impl IntoResponse {
    state.matches.create_match(payload.match_id, payload.deployments);
    (StatusCode::CREATED, Json(CreateMatchResponse { match_id: payload.match_id }))
}

/// GET /api/v1/matches/:match_id/stream — combat stream boundary.
#[instrument(skip(websocket, state), fields(%match_id))]
pub async fn stream_match(
    websocket: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
) -> axum::response::Response {
    let broadcast = state.matches.broadcast();
    match broadcast.join(match_id) {
        Ok((snapshot, receiver)) => websocket.on_upgrade(move |socket| handle_match_socket(socket, snapshot, receiver)).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "no room open for that match").into_response(),
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum CombatFrame<'a> {
    Joined,
    State { snapshot: &'a CombatState },
    Completed { result: &'a MatchResult },
    Left,
}

async fn handle_match_socket(
    socket: WebSocket,
    initial_snapshot: CombatState,
    mut receiver: tokio::sync::broadcast::Receiver<BroadcastFrame>,
) {
    let (mut sender, mut incoming) = socket.split();

    // Incoming messages are not part of this boundary's contract; the task
    // only exists to notice the connection closing so the outer select can
    // tear the session down instead of leaking a subscriber.
    let mut reader = tokio::spawn(async move { while incoming.next().await.is_some() {} });

    if send_json(&mut sender, &CombatFrame::Joined).await.is_err() {
        reader.abort();
        return;
    }
    if send_json(&mut sender, &CombatFrame::State { snapshot: &initial_snapshot }).await.is_err() {
        reader.abort();
        return;
    }

    loop {
        tokio::select! {
            _ = &mut reader => break,
            frame = receiver.recv() => {
                match frame {
                    Ok(BroadcastFrame::State(snapshot)) => {
                        if send_json(&mut sender, &CombatFrame::State { snapshot: &snapshot }).await.is_err() {
                            break;
                        }
                    }
                    Ok(BroadcastFrame::Completed(result)) => {
                        let _ = send_json(&mut sender, &CombatFrame::Completed { result: &result }).await;
                        let _ = send_json(&mut sender, &CombatFrame::Left).await;
                        break;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "combat stream subscriber lagged, resuming from latest");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    reader.abort();
    let _ = sender.send(Message::Close(None)).await;
}

async fn send_json(sender: &mut (impl Sink<Message, Error = axum::Error> + Unpin), frame: &CombatFrame<'_>) -> Result<(), ()> {
    let Ok(text) = serde_json::to_string(frame) else { return Err(()) };
    sender.send(Message::Text(text)).await.map_err(|e| warn!(%e, "combat stream send failed"))
}
