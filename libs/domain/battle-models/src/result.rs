use serde::{Deserialize, Serialize};

/// The committed output of a successful pipeline run: a base sprite, the
/// combat attributes extracted from it, and the three directional frame
/// sets the pipeline actually generates (the remaining three directions are
/// produced downstream by horizontal mirroring, not by this service).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub base_sprite: SpriteAsset,
    pub attributes: CombatAttributes,
    pub directional_frames: Vec<DirectionalFrameSet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpriteAsset {
    pub data: Vec<u8>,
    pub format: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CombatAttributes {
    pub damage: u32,
    pub armor: u32,
    pub range: u32,
    pub speed: u32,
    pub attacks_per_second: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaseDirection {
    East,
    NorthEast,
    SouthEast,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectionalFrameSet {
    pub direction: BaseDirection,
    pub walk: Vec<SpriteAsset>,
    pub idle: Vec<SpriteAsset>,
    pub attack: Vec<SpriteAsset>,
}
