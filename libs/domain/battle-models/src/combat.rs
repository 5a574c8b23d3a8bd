use hex_geometry::HexPosition;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use uuid::Uuid;

pub type UnitId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Player {
    P1,
    P2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitStatus {
    Alive,
    Dead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Facing {
    East,
    NorthEast,
    NorthWest,
    West,
    SouthWest,
    SouthEast,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UnitStats {
    pub damage: u32,
    pub armor: u32,
    pub range: i32,
    /// Movement speed in hexes per second.
    pub speed: u32,
    pub attacks_per_second: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub unit_id: UnitId,
    pub owner: Player,
    pub position: HexPosition,
    pub health: u32,
    pub max_health: u32,
    pub stats: UnitStats,
    /// Ticks remaining before this unit may attack again.
    pub attack_cooldown: u32,
    pub current_target: Option<UnitId>,
    pub facing: Facing,
    pub status: UnitStatus,
    /// Fixed-point millihex progress toward the next hex along the unit's
    /// current movement path; see `hex_geometry::advance_along_path`.
    pub move_progress: i64,
}

impl Unit {
    pub fn is_alive(&self) -> bool {
        self.status == UnitStatus::Alive
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CombatEvent {
    Spawn { unit_id: UnitId, owner: Player },
    Damage { attacker_id: UnitId, defender_id: UnitId, amount: u32, defender_health_after: u32 },
    Death { victim_id: UnitId, killer_id: Option<UnitId> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub tick: u64,
    pub event: CombatEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    Pending,
    Running,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VictoryReason {
    Elimination,
    Timeout,
    SimultaneousDeath,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchWinner {
    P1,
    P2,
    Draw,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub winner: MatchWinner,
    pub reason: VictoryReason,
    pub duration_ticks: u64,
}

/// A unit placement supplied by a match caller at initialization time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub unit_id: UnitId,
    pub owner: Player,
    pub position: HexPosition,
    pub max_health: u32,
    pub stats: UnitStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatState {
    pub match_id: Uuid,
    pub tick: u64,
    pub status: MatchStatus,
    pub units: BTreeMap<UnitId, Unit>,
    pub events: VecDeque<EventRecord>,
    pub result: Option<MatchResult>,
}

impl CombatState {
    pub fn new(match_id: Uuid, units: BTreeMap<UnitId, Unit>) -> Self {
        let events = units
            .values()
            .map(|u| EventRecord { tick: 0, event: CombatEvent::Spawn { unit_id: u.unit_id, owner: u.owner } })
            .collect();
        Self {
            match_id,
            tick: 0,
            status: MatchStatus::Pending,
            units,
            events,
            result: None,
        }
    }

    pub fn units_of(&self, player: Player) -> impl Iterator<Item = &Unit> {
        self.units.values().filter(move |u| u.owner == player)
    }

    pub fn alive_units_of(&self, player: Player) -> impl Iterator<Item = &Unit> {
        self.units_of(player).filter(|u| u.is_alive())
    }

    /// Drops events older than `retention_window` ticks behind the current
    /// tick, bounding memory regardless of match length.
    pub fn prune_events(&mut self, retention_window: u64) {
        let floor = self.tick.saturating_sub(retention_window);
        while let Some(front) = self.events.front() {
            if front.tick < floor {
                self.events.pop_front();
            } else {
                break;
            }
        }
    }
}
