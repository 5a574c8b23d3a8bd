use crate::broadcast::CombatBroadcast;
use crate::simulator::CombatSimulator;
use battle_models::{Deployment, SimulatorConfig};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::info;
use uuid::Uuid;

/// Owns every concurrently running match's [`CombatSimulator`]: a single
/// manager holding many independently trackable units rather than
/// scattering match handles across route handlers. The gateway binary holds
/// one `MatchRegistry` for its entire lifetime and keys all match lookups
/// through it.
pub struct MatchRegistry {
    broadcast: Arc<CombatBroadcast>,
    matches: Mutex<HashMap<Uuid, Arc<CombatSimulator>>>,
    config: SimulatorConfig,
}

impl MatchRegistry {
    pub fn new(config: SimulatorConfig) -> Self {
        Self { broadcast: Arc::new(CombatBroadcast::new()), matches: Mutex::new(HashMap::new()), config }
    }

    pub fn broadcast(&self) -> Arc<CombatBroadcast> {
        self.broadcast.clone()
    }

    /// Initializes and immediately starts a new match's simulator task,
    /// tracking it under `match_id` for later lookup.
    pub fn create_match(&self, match_id: Uuid, deployments: Vec<Deployment>) -> Arc<CombatSimulator> {
        let simulator = Arc::new(CombatSimulator::initialize(match_id, deployments, self.config, self.broadcast.clone()));
        simulator.start();
        self.matches.lock().expect("match registry lock poisoned").insert(match_id, simulator.clone());
        info!(%match_id, "match registered and started");
        simulator
    }

    pub fn get(&self, match_id: Uuid) -> Option<Arc<CombatSimulator>> {
        self.matches.lock().expect("match registry lock poisoned").get(&match_id).cloned()
    }

    pub fn stop(&self, match_id: Uuid) {
        if let Some(simulator) = self.get(match_id) {
            simulator.stop();
        }
    }

    /// Drops the registry's handle to a finished match. The broadcast
    /// room is already torn down by `publish_completed`; this only frees
    /// the `CombatSimulator` handle itself once callers no longer need
    /// `snapshot()`/control access to it.
    pub fn remove(&self, match_id: Uuid) {
        self.matches.lock().expect("match registry lock poisoned").remove(&match_id);
    }

    pub fn active_match_count(&self) -> usize {
        self.matches.lock().expect("match registry lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use battle_models::{Player, UnitStats};
    use hex_geometry::HexPosition;

    #[tokio::test]
    async fn create_match_registers_and_starts_a_simulator() {
        let registry = MatchRegistry::new(SimulatorConfig::default());
        let match_id = Uuid::new_v4();
        let deployments = vec![
            Deployment { unit_id: 1, owner: Player::P1, position: HexPosition::new(0, 0), max_health: 10, stats: UnitStats { damage: 1, armor: 0, range: 1, speed: 1, attacks_per_second: 1.0 } },
            Deployment { unit_id: 2, owner: Player::P2, position: HexPosition::new(1, 0), max_health: 10, stats: UnitStats { damage: 1, armor: 0, range: 1, speed: 1, attacks_per_second: 1.0 } },
        ];
        registry.create_match(match_id, deployments);
        assert_eq!(registry.active_match_count(), 1);
        assert!(registry.get(match_id).is_some());
        assert!(registry.broadcast().join(match_id).is_ok());
    }
}
