use battle_models::{CombatEvent, EventRecord, Player, Unit, UnitId, UnitStatus};
use hex_geometry::{advance_along_path, hex_line, millihexes_per_tick};
use std::collections::BTreeMap;

/// Resolves one tick of combat: targeting, movement, attacks, deaths, and
/// cooldown decay. Operates on the unit map in place and appends events for
/// this tick; victory checking and event pruning are the caller's
/// responsibility since they need the rest of `CombatState`.
pub fn resolve_tick(
    units: &mut BTreeMap<UnitId, Unit>,
    tick: u64,
    tick_duration_ms: u32,
    tick_rate: u32,
    grid_width: i32,
    grid_height: i32,
    target_selection_radius: i32,
) -> Vec<EventRecord> {
    let mut events = Vec::new();

    let ids: Vec<UnitId> = units.keys().copied().collect();
    let mut attacks: Vec<(UnitId, UnitId)> = Vec::new();
    let _ = (grid_width, grid_height);

    for &unit_id in &ids {
        let Some(unit) = units.get(&unit_id).cloned() else { continue };
        if !unit.is_alive() {
            continue;
        }

        let target_id = choose_target(&unit, units, target_selection_radius);
        if target_id != unit.current_target {
            if let Some(u) = units.get_mut(&unit_id) {
                u.current_target = target_id;
            }
        }

        let Some(target_id) = target_id else { continue };
        let Some(target_position) = units.get(&target_id).map(|t| t.position) else { continue };
        let distance = unit.position.distance_to(target_position);

        if distance <= unit.stats.range {
            if unit.attack_cooldown == 0 {
                attacks.push((unit_id, target_id));
            }
        } else {
            let budget = millihexes_per_tick(unit.stats.speed, tick_duration_ms);
            let path = hex_line(unit.position, target_position);
            let (next_position, leftover) = advance_along_path(&path, unit.move_progress, budget);
            if let Some(u) = units.get_mut(&unit_id) {
                u.position = next_position;
                u.move_progress = leftover;
            }
        }
    }

    for (attacker_id, defender_id) in attacks {
        let Some(attacker) = units.get(&attacker_id).cloned() else { continue };
        let Some(defender) = units.get(&defender_id).cloned() else { continue };
        if !defender.is_alive() {
            continue;
        }
        let damage = attacker.stats.damage.saturating_sub(defender.stats.armor);
        let health_after = defender.health.saturating_sub(damage);

        if let Some(defender_mut) = units.get_mut(&defender_id) {
            defender_mut.health = health_after;
        }
        events.push(EventRecord { tick, event: CombatEvent::Damage { attacker_id, defender_id, amount: damage, defender_health_after: health_after } });

        if health_after == 0 {
            if let Some(defender_mut) = units.get_mut(&defender_id) {
                defender_mut.status = UnitStatus::Dead;
                defender_mut.current_target = None;
            }
            events.push(EventRecord { tick, event: CombatEvent::Death { victim_id: defender_id, killer_id: Some(attacker_id) } });
        }

        if let Some(attacker_mut) = units.get_mut(&attacker_id) {
            let rate = attacker_mut.stats.attacks_per_second.max(0.01);
            attacker_mut.attack_cooldown = (tick_rate as f32 / rate).round() as u32;
        }
    }

    for unit in units.values_mut() {
        if unit.attack_cooldown > 0 {
            unit.attack_cooldown -= 1;
        }
    }

    events
}

/// Nearest alive enemy within `radius`, tie-broken by ascending `unit_id`.
/// Sticky: if the unit's current target is still alive and in range, it is
/// kept rather than re-evaluated.
fn choose_target(unit: &Unit, units: &BTreeMap<UnitId, Unit>, radius: i32) -> Option<UnitId> {
    if let Some(current) = unit.current_target {
        if let Some(target) = units.get(&current) {
            if target.is_alive() && unit.position.distance_to(target.position) <= radius {
                return Some(current);
            }
        }
    }

    let enemy = match unit.owner {
        Player::P1 => Player::P2,
        Player::P2 => Player::P1,
    };

    units
        .values()
        .filter(|candidate| candidate.owner == enemy && candidate.is_alive())
        .map(|candidate| (unit.position.distance_to(candidate.position), candidate.unit_id))
        .filter(|(distance, _)| *distance <= radius)
        .min()
        .map(|(_, unit_id)| unit_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use battle_models::{Facing, HexPosition, UnitStats};

    fn unit(id: UnitId, owner: Player, position: HexPosition) -> Unit {
        Unit {
            unit_id: id,
            owner,
            position,
            health: 100,
            max_health: 100,
            stats: UnitStats { damage: 15, armor: 5, range: 1, speed: 2, attacks_per_second: 1.0 },
            attack_cooldown: 0,
            current_target: None,
            facing: Facing::East,
            status: UnitStatus::Alive,
            move_progress: 0,
        }
    }

    #[test]
    fn adjacent_units_trade_damage_and_set_cooldown() {
        let mut units = BTreeMap::new();
        units.insert(1, unit(1, Player::P1, HexPosition::new(0, 0)));
        units.insert(2, unit(2, Player::P2, HexPosition::new(1, 0)));
        let events = resolve_tick(&mut units, 1, 16, 60, 20, 20, 10);
        assert!(events.iter().any(|e| matches!(e.event, CombatEvent::Damage { amount: 10, .. })));
        assert!(units[&1].attack_cooldown > 0);
        assert!(units[&2].attack_cooldown > 0);
    }

    #[test]
    fn distant_unit_moves_toward_its_target_instead_of_attacking() {
        let mut units = BTreeMap::new();
        units.insert(1, unit(1, Player::P1, HexPosition::new(0, 0)));
        units.insert(2, unit(2, Player::P2, HexPosition::new(5, 0)));
        let events = resolve_tick(&mut units, 1, 16, 60, 20, 20, 10);
        assert!(events.is_empty());
        assert_eq!(units[&1].current_target, Some(2));
    }

    #[test]
    fn lethal_damage_marks_the_defender_dead_and_clears_its_target() {
        let mut units = BTreeMap::new();
        let mut weak = unit(2, Player::P2, HexPosition::new(1, 0));
        weak.health = 5;
        units.insert(1, unit(1, Player::P1, HexPosition::new(0, 0)));
        units.insert(2, weak);
        let events = resolve_tick(&mut units, 1, 16, 60, 20, 20, 10);
        assert!(events.iter().any(|e| matches!(e.event, CombatEvent::Death { victim_id: 2, .. })));
        assert_eq!(units[&2].status, UnitStatus::Dead);
        assert_eq!(units[&2].current_target, None);
    }
}
