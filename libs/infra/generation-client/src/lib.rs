//! Adapter seam for the external AI-image provider. The provider itself is
//! an external collaborator described only at its interface; this crate
//! only defines that interface — the per-stage calls a [`GenerationBackend`]
//! must answer — plus a deterministic in-process double used in development
//! and tests.

mod mock;

use async_trait::async_trait;
use battle_models::{BaseDirection, CombatAttributes, GenerationErrorCategory, GenerationRequest, SpriteAsset};

pub use mock::MockGenerationBackend;

pub type BackendResult<T> = Result<T, GenerationErrorCategory>;

/// The four external calls the pipeline stages issue. Every method call is
/// one "external call" subject to the error taxonomy and a per-call timeout.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Stage 1: generate the base sprite from the request.
    async fn generate_base_sprite(&self, request: &GenerationRequest) -> BackendResult<SpriteAsset>;

    /// Stage 2: analyze the base sprite via the external vision service.
    async fn analyze_sprite(&self, sprite: &SpriteAsset) -> BackendResult<SpriteAnalysis>;

    /// Stage 3: map the analysis to an animation set and combat attributes.
    async fn derive_combat_attributes(&self, analysis: &SpriteAnalysis) -> BackendResult<CombatAttributes>;

    /// Stage 4: rotate + animate one base direction (walk/idle/attack).
    async fn generate_direction_frames(&self, sprite: &SpriteAsset, direction: BaseDirection) -> BackendResult<DirectionFrames>;
}

#[derive(Debug, Clone)]
pub struct SpriteAnalysis {
    pub silhouette_complexity: u32,
    pub dominant_palette: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DirectionFrames {
    pub direction: BaseDirection,
    pub walk: Vec<SpriteAsset>,
    pub idle: Vec<SpriteAsset>,
    pub attack: Vec<SpriteAsset>,
}
