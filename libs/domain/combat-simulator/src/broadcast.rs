use battle_models::{CombatState, MatchResult};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

const ROOM_CHANNEL_CAPACITY: usize = 128;

#[derive(Debug, Clone)]
pub enum BroadcastFrame {
    State(Box<CombatState>),
    Completed(MatchResult),
}

#[derive(Debug, Clone, Error)]
pub enum BroadcastError {
    #[error("no room open for match {0}")]
    UnknownMatch(Uuid),
}

struct Room {
    sender: broadcast::Sender<BroadcastFrame>,
    latest_snapshot: CombatState,
    ticks_per_broadcast: u64,
    ticks_since_broadcast: u64,
}

/// Per-match spectator fan-out. One room per active match, opened when that
/// match's simulator initializes and torn down once the match completes.
/// Joins on an unknown `match_id` are rejected rather than silently
/// creating a room, since a room's existence tracks a live simulator task.
pub struct CombatBroadcast {
    rooms: Mutex<HashMap<Uuid, Room>>,
}

impl CombatBroadcast {
    pub fn new() -> Self {
        Self { rooms: Mutex::new(HashMap::new()) }
    }

    /// Opens a room for `match_id`. `ticks_per_broadcast` decouples the
    /// simulation's tick rate from the spectator fan-out cadence (10 Hz
    /// default, independent of the 60 Hz simulation) — every tick updates
    /// the latest snapshot so a joiner always sees current state, but only
    /// every Nth tick actually pushes a frame to subscribers.
    pub fn open_room(&self, match_id: Uuid, initial_snapshot: CombatState, ticks_per_broadcast: u64) {
        let mut guard = self.rooms.lock().expect("combat broadcast lock poisoned");
        guard.insert(
            match_id,
            Room {
                sender: broadcast::channel(ROOM_CHANNEL_CAPACITY).0,
                latest_snapshot: initial_snapshot,
                ticks_per_broadcast: ticks_per_broadcast.max(1),
                ticks_since_broadcast: 0,
            },
        );
    }

    /// Joins a room: returns the current snapshot plus a receiver for
    /// subsequent frames. The caller (the combat stream boundary) is
    /// responsible for sending its own `{type=joined}` frame before
    /// relaying the snapshot, since that framing is a boundary concern.
    pub fn join(&self, match_id: Uuid) -> Result<(CombatState, broadcast::Receiver<BroadcastFrame>), BroadcastError> {
        let guard = self.rooms.lock().expect("combat broadcast lock poisoned");
        let room = guard.get(&match_id).ok_or(BroadcastError::UnknownMatch(match_id))?;
        Ok((room.latest_snapshot.clone(), room.sender.subscribe()))
    }

    /// Called every tick by the simulator. Always refreshes the latest
    /// snapshot; only broadcasts to the room's channel once every
    /// `ticks_per_broadcast` ticks.
    pub fn publish_state(&self, match_id: Uuid, snapshot: CombatState) {
        let mut guard = self.rooms.lock().expect("combat broadcast lock poisoned");
        if let Some(room) = guard.get_mut(&match_id) {
            room.latest_snapshot = snapshot.clone();
            room.ticks_since_broadcast += 1;
            if room.ticks_since_broadcast >= room.ticks_per_broadcast {
                room.ticks_since_broadcast = 0;
                let _ = room.sender.send(BroadcastFrame::State(Box::new(snapshot)));
            }
        }
    }

    /// Publishes the final result and tears the room down; any subscriber
    /// still attached observes the channel close immediately after.
    pub fn publish_completed(&self, match_id: Uuid, result: MatchResult) {
        let mut guard = self.rooms.lock().expect("combat broadcast lock poisoned");
        if let Some(room) = guard.remove(&match_id) {
            let _ = room.sender.send(BroadcastFrame::Completed(result));
        }
    }
}

impl Default for CombatBroadcast {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use battle_models::{MatchWinner, VictoryReason};
    use std::collections::BTreeMap;

    #[test]
    fn join_on_unknown_match_is_rejected() {
        let broadcast = CombatBroadcast::new();
        assert!(matches!(broadcast.join(Uuid::new_v4()), Err(BroadcastError::UnknownMatch(_))));
    }

    #[tokio::test]
    async fn join_receives_the_latest_snapshot_and_then_live_frames() {
        let broadcast = CombatBroadcast::new();
        let match_id = Uuid::new_v4();
        let state = CombatState::new(match_id, BTreeMap::new());
        broadcast.open_room(match_id, state.clone(), 1);

        let (snapshot, mut rx) = broadcast.join(match_id).unwrap();
        assert_eq!(snapshot.match_id, match_id);

        let mut next = state.clone();
        next.tick = 1;
        broadcast.publish_state(match_id, next);
        let frame = rx.recv().await.unwrap();
        assert!(matches!(frame, BroadcastFrame::State(s) if s.tick == 1));
    }

    #[tokio::test]
    async fn publish_completed_tears_the_room_down() {
        let broadcast = CombatBroadcast::new();
        let match_id = Uuid::new_v4();
        let state = CombatState::new(match_id, BTreeMap::new());
        broadcast.open_room(match_id, state, 1);
        let (_, mut rx) = broadcast.join(match_id).unwrap();

        broadcast.publish_completed(match_id, MatchResult { winner: MatchWinner::Draw, reason: VictoryReason::Timeout, duration_ticks: 10 });
        assert!(matches!(rx.recv().await.unwrap(), BroadcastFrame::Completed(_)));
        assert!(matches!(broadcast.join(match_id), Err(BroadcastError::UnknownMatch(_))));
    }
}
