use battle_models::{CombatState, MatchResult, MatchWinner, Player, VictoryReason};

pub enum VictoryOutcome {
    NotOver,
    Over(MatchResult),
}

/// Determines whether a match is over. A pure function of the current state and the
/// configured tick ceiling; holds no state of its own and is safe to call
/// every tick without side effects.
pub fn check_victory(state: &CombatState, max_ticks: u64) -> VictoryOutcome {
    let p1_alive = state.alive_units_of(Player::P1).count();
    let p2_alive = state.alive_units_of(Player::P2).count();

    if p1_alive == 0 && p2_alive == 0 {
        return VictoryOutcome::Over(MatchResult { winner: MatchWinner::Draw, reason: VictoryReason::SimultaneousDeath, duration_ticks: state.tick });
    }
    if p1_alive == 0 {
        return VictoryOutcome::Over(MatchResult { winner: MatchWinner::P2, reason: VictoryReason::Elimination, duration_ticks: state.tick });
    }
    if p2_alive == 0 {
        return VictoryOutcome::Over(MatchResult { winner: MatchWinner::P1, reason: VictoryReason::Elimination, duration_ticks: state.tick });
    }

    if state.tick >= max_ticks {
        let p1_health: u64 = state.alive_units_of(Player::P1).map(|u| u.health as u64).sum();
        let p2_health: u64 = state.alive_units_of(Player::P2).map(|u| u.health as u64).sum();
        let winner = if p1_health > p2_health {
            MatchWinner::P1
        } else if p2_health > p1_health {
            MatchWinner::P2
        } else if p1_alive > p2_alive {
            MatchWinner::P1
        } else if p2_alive > p1_alive {
            MatchWinner::P2
        } else {
            MatchWinner::Draw
        };
        return VictoryOutcome::Over(MatchResult { winner, reason: VictoryReason::Timeout, duration_ticks: state.tick });
    }

    VictoryOutcome::NotOver
}

#[cfg(test)]
mod tests {
    use super::*;
    use battle_models::{Facing, HexPosition, Unit, UnitStats, UnitStatus};
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn unit(id: u32, owner: Player, health: u32, status: UnitStatus) -> Unit {
        Unit {
            unit_id: id,
            owner,
            position: HexPosition::new(0, 0),
            health,
            max_health: 100,
            stats: UnitStats { damage: 10, armor: 0, range: 1, speed: 1, attacks_per_second: 1.0 },
            attack_cooldown: 0,
            current_target: None,
            facing: Facing::East,
            status,
            move_progress: 0,
        }
    }

    #[test]
    fn elimination_declares_the_surviving_player() {
        let mut units = BTreeMap::new();
        units.insert(1, unit(1, Player::P1, 50, UnitStatus::Alive));
        units.insert(2, unit(2, Player::P2, 0, UnitStatus::Dead));
        let state = CombatState::new(Uuid::new_v4(), units);
        match check_victory(&state, 3600) {
            VictoryOutcome::Over(result) => {
                assert!(matches!(result.winner, MatchWinner::P1));
                assert!(matches!(result.reason, VictoryReason::Elimination));
            }
            VictoryOutcome::NotOver => panic!("expected a decided match"),
        }
    }

    #[test]
    fn timeout_breaks_ties_by_remaining_health_then_survivor_count() {
        let mut units = BTreeMap::new();
        units.insert(1, unit(1, Player::P1, 80, UnitStatus::Alive));
        units.insert(2, unit(2, Player::P2, 20, UnitStatus::Alive));
        let mut state = CombatState::new(Uuid::new_v4(), units);
        state.tick = 3600;
        match check_victory(&state, 3600) {
            VictoryOutcome::Over(result) => {
                assert!(matches!(result.winner, MatchWinner::P1));
                assert!(matches!(result.reason, VictoryReason::Timeout));
            }
            VictoryOutcome::NotOver => panic!("expected the timeout path"),
        }
    }

    #[test]
    fn ongoing_match_is_not_over() {
        let mut units = BTreeMap::new();
        units.insert(1, unit(1, Player::P1, 80, UnitStatus::Alive));
        units.insert(2, unit(2, Player::P2, 20, UnitStatus::Alive));
        let state = CombatState::new(Uuid::new_v4(), units);
        assert!(matches!(check_victory(&state, 3600), VictoryOutcome::NotOver));
    }
}
