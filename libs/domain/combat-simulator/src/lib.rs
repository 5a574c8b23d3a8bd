//! Combat Simulator Core: the per-match fixed-timestep tick loop and unit
//! AI/attack resolution, victory detection, and the per-match spectator
//! broadcast.

mod broadcast;
mod registry;
mod resolution;
mod simulator;
mod victory;

pub use broadcast::{BroadcastError, BroadcastFrame, CombatBroadcast};
pub use registry::MatchRegistry;
pub use resolution::resolve_tick;
pub use simulator::CombatSimulator;
pub use victory::{check_victory, VictoryOutcome};
