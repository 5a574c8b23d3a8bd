//! Shared data model for the tactical arena platform: the sprite generation
//! job and the combat-simulator state, plus the configuration and error
//! types both cores hang off of.

pub mod combat;
pub mod config;
pub mod errors;
pub mod job;
pub mod request;
pub mod result;

pub use combat::{
    CombatEvent, CombatState, Deployment, EventRecord, Facing, MatchResult, MatchStatus,
    MatchWinner, Player, Unit, UnitId, UnitStats, UnitStatus, VictoryReason,
};
pub use hex_geometry::HexPosition;
pub use config::{BattleConfig, CacheConfig, DedupConfig, QueueConfig, RetryConfig, SimulatorConfig, StreamConfig};
pub use errors::{AdmissionError, GenerationErrorCategory};
pub use job::{Job, JobError, JobState};
pub use request::{Dimensions, GenerationRequest};
pub use result::{BaseDirection, CombatAttributes, DirectionalFrameSet, GenerationResult, SpriteAsset};
