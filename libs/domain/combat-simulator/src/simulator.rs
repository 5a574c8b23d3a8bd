use crate::broadcast::CombatBroadcast;
use crate::resolution::resolve_tick;
use crate::victory::{check_victory, VictoryOutcome};
use battle_models::{
    CombatState, Deployment, Facing, MatchResult, MatchStatus, MatchWinner, SimulatorConfig, Unit,
    UnitStatus, VictoryReason,
};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{info, instrument, warn};
use uuid::Uuid;

enum SimulatorCommand {
    Start,
    Pause,
    Resume,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunMode {
    Idle,
    Running,
    Paused,
}

/// Match orchestrator. One instance exclusively
/// owns one match's `CombatState` for its entire lifecycle: the tick loop
/// runs as a background task spawned by `initialize`, and every other task
/// (route handlers, the match registry) only ever sees snapshots through
/// `snapshot()` or the broadcast room, never the live state.
pub struct CombatSimulator {
    match_id: Uuid,
    commands: mpsc::UnboundedSender<SimulatorCommand>,
    latest: Arc<RwLock<CombatState>>,
}

impl CombatSimulator {
    /// Builds the pending `CombatState` from
    /// `deployments`, opens its broadcast room, and spawns the tick-loop
    /// task. The loop does not advance until `start()` is called.
    pub fn initialize(
        match_id: Uuid,
        deployments: Vec<Deployment>,
        config: SimulatorConfig,
        broadcast: Arc<CombatBroadcast>,
    ) -> Self {
        let units = deployments
            .into_iter()
            .map(|deployment| {
                let unit = Unit {
                    unit_id: deployment.unit_id,
                    owner: deployment.owner,
                    position: deployment.position,
                    health: deployment.max_health,
                    max_health: deployment.max_health,
                    stats: deployment.stats,
                    attack_cooldown: 0,
                    current_target: None,
                    facing: Facing::East,
                    status: UnitStatus::Alive,
                    move_progress: 0,
                };
                (deployment.unit_id, unit)
            })
            .collect::<BTreeMap<_, _>>();

        let state = CombatState::new(match_id, units);
        let ticks_per_broadcast = (config.tick_rate as u64 / config.snapshot_fanout_hz.max(1) as u64).max(1);
        broadcast.open_room(match_id, state.clone(), ticks_per_broadcast);

        let latest = Arc::new(RwLock::new(state));
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        tokio::spawn(Self::run(match_id, config, latest.clone(), broadcast, commands_rx));

        Self { match_id, commands: commands_tx, latest }
    }

    pub fn match_id(&self) -> Uuid {
        self.match_id
    }

    /// Starts the tick loop. A no-op if the loop is already running; use `resume`
    /// to continue after a `pause`.
    pub fn start(&self) {
        let _ = self.commands.send(SimulatorCommand::Start);
    }

    /// Preserves `tick`; the tick loop stops consuming its ticker until
    /// `resume` is called.
    pub fn pause(&self) {
        let _ = self.commands.send(SimulatorCommand::Pause);
    }

    /// Continues from the tick preserved by `pause`.
    pub fn resume(&self) {
        let _ = self.commands.send(SimulatorCommand::Resume);
    }

    /// Forces termination. In-flight per-tick work (if any is
    /// running when this is called) completes before the loop exits —
    /// `tokio::select!` only observes this command between ticks, never
    /// mid-resolution.
    pub fn stop(&self) {
        let _ = self.commands.send(SimulatorCommand::Stop);
    }

    pub fn snapshot(&self) -> CombatState {
        self.latest.read().expect("combat simulator snapshot lock poisoned").clone()
    }

    #[instrument(skip(config, latest, broadcast, commands), fields(match_id = %match_id))]
    async fn run(
        match_id: Uuid,
        config: SimulatorConfig,
        latest: Arc<RwLock<CombatState>>,
        broadcast: Arc<CombatBroadcast>,
        mut commands: mpsc::UnboundedReceiver<SimulatorCommand>,
    ) {
        let mut mode = RunMode::Idle;
        let tick_duration = Duration::from_millis(config.tick_duration_ms().max(1) as u64);

        // MissedTickBehavior::Delay: if a tick's resolution overruns the
        // nominal interval, the next deadline is scheduled from the moment
        // work finished rather than trying to catch up to the original
        // fixed-rate schedule, so a slow tick never causes several ticks to
        // burst back-to-back.
        let mut ticker = interval(tick_duration);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = commands.recv() => {
                    match command {
                        Some(SimulatorCommand::Start) if mode == RunMode::Idle => {
                            mode = RunMode::Running;
                            latest.write().expect("combat simulator lock poisoned").status = MatchStatus::Running;
                            ticker = interval(tick_duration);
                            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                            info!("match started");
                        }
                        Some(SimulatorCommand::Start) => {}
                        Some(SimulatorCommand::Pause) if mode == RunMode::Running => {
                            mode = RunMode::Paused;
                        }
                        Some(SimulatorCommand::Resume) if mode == RunMode::Paused => {
                            mode = RunMode::Running;
                            ticker = interval(tick_duration);
                            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                        }
                        Some(SimulatorCommand::Pause) | Some(SimulatorCommand::Resume) => {}
                        Some(SimulatorCommand::Stop) | None => {
                            Self::force_complete(match_id, &latest, &broadcast);
                            warn!("match stopped before natural completion");
                            return;
                        }
                    }
                }
                _ = ticker.tick(), if mode == RunMode::Running => {
                    let outcome = {
                        let mut state = latest.write().expect("combat simulator lock poisoned");
                        state.tick += 1;
                        let events = resolve_tick(
                            &mut state.units,
                            state.tick,
                            config.tick_duration_ms(),
                            config.tick_rate,
                            config.grid_width,
                            config.grid_height,
                            config.target_selection_radius,
                        );
                        state.events.extend(events);
                        state.prune_events(config.event_retention_ticks);

                        match check_victory(&state, config.max_ticks) {
                            VictoryOutcome::Over(result) => {
                                state.status = MatchStatus::Completed;
                                state.result = Some(result.clone());
                                Some((state.clone(), result))
                            }
                            VictoryOutcome::NotOver => {
                                broadcast.publish_state(match_id, state.clone());
                                None
                            }
                        }
                    };

                    if let Some((snapshot, result)) = outcome {
                        broadcast.publish_state(match_id, snapshot);
                        broadcast.publish_completed(match_id, result);
                        info!("match completed");
                        return;
                    }
                }
            }
        }
    }

    fn force_complete(match_id: Uuid, latest: &RwLock<CombatState>, broadcast: &CombatBroadcast) {
        let mut state = latest.write().expect("combat simulator lock poisoned");
        if state.status == MatchStatus::Completed {
            return;
        }
        // Timeout if the match had made progress, an explicit aborted
        // marker if it was stopped before ticking at all.
        let reason = if state.tick == 0 { VictoryReason::Aborted } else { VictoryReason::Timeout };
        let result = MatchResult { winner: MatchWinner::Draw, reason, duration_ticks: state.tick };
        state.status = MatchStatus::Completed;
        state.result = Some(result.clone());
        drop(state);
        broadcast.publish_completed(match_id, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use battle_models::{Player, UnitStats};
    use hex_geometry::HexPosition;

    fn deployment(id: u32, owner: Player, position: HexPosition) -> Deployment {
        Deployment {
            unit_id: id,
            owner,
            position,
            max_health: 50,
            stats: UnitStats { damage: 50, armor: 0, range: 10, speed: 5, attacks_per_second: 2.0 },
        }
    }

    #[tokio::test]
    async fn a_mismatched_pair_eliminates_the_weaker_side() {
        let broadcast = Arc::new(CombatBroadcast::new());
        let config = SimulatorConfig { tick_rate: 60, max_ticks: 600, speed_multiplier: 1.0, ..SimulatorConfig::default() };
        let match_id = Uuid::new_v4();
        let deployments = vec![
            deployment(1, Player::P1, HexPosition::new(1, 2)),
            deployment(2, Player::P2, HexPosition::new(10, 2)),
        ];
        let simulator = CombatSimulator::initialize(match_id, deployments, config, broadcast.clone());
        let (_, mut rx) = broadcast.join(match_id).unwrap();
        simulator.start();

        loop {
            match rx.recv().await.unwrap() {
                crate::broadcast::BroadcastFrame::Completed(result) => {
                    assert!(matches!(result.reason, VictoryReason::Elimination));
                    break;
                }
                crate::broadcast::BroadcastFrame::State(_) => continue,
            }
        }
    }

    #[tokio::test]
    async fn stop_before_any_tick_reports_aborted() {
        let broadcast = Arc::new(CombatBroadcast::new());
        let config = SimulatorConfig::default();
        let match_id = Uuid::new_v4();
        let deployments = vec![
            deployment(1, Player::P1, HexPosition::new(0, 0)),
            deployment(2, Player::P2, HexPosition::new(1, 0)),
        ];
        let simulator = CombatSimulator::initialize(match_id, deployments, config, broadcast.clone());
        let (_, mut rx) = broadcast.join(match_id).unwrap();
        simulator.stop();

        match rx.recv().await.unwrap() {
            crate::broadcast::BroadcastFrame::Completed(result) => {
                assert!(matches!(result.reason, VictoryReason::Aborted));
            }
            _ => panic!("expected a completed frame"),
        }
    }
}
