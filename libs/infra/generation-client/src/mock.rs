use crate::{BackendResult, DirectionFrames, GenerationBackend, SpriteAnalysis};
use async_trait::async_trait;
use battle_models::{BaseDirection, CombatAttributes, GenerationErrorCategory, GenerationRequest, SpriteAsset};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A deterministic stand-in for the real external AI-image provider. Used
/// by the gateway binary's default configuration and by pipeline tests.
/// Callers may queue one-shot injected failures to exercise the retry path.
pub struct MockGenerationBackend {
    injected_failures: Mutex<VecDeque<GenerationErrorCategory>>,
}

impl MockGenerationBackend {
    pub fn new() -> Self {
        Self { injected_failures: Mutex::new(VecDeque::new()) }
    }

    /// The next external call made through this backend fails with `error`
    /// instead of succeeding. Queued failures are consumed in FIFO order.
    pub fn queue_failure(&self, error: GenerationErrorCategory) {
        self.injected_failures.lock().expect("mock backend lock poisoned").push_back(error);
    }

    fn take_injected_failure(&self) -> Option<GenerationErrorCategory> {
        self.injected_failures.lock().expect("mock backend lock poisoned").pop_front()
    }
}

impl Default for MockGenerationBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationBackend for MockGenerationBackend {
    async fn generate_base_sprite(&self, request: &GenerationRequest) -> BackendResult<SpriteAsset> {
        if let Some(err) = self.take_injected_failure() {
            return Err(err);
        }
        Ok(SpriteAsset { data: request.description.as_bytes().to_vec(), format: "png".into() })
    }

    async fn analyze_sprite(&self, sprite: &SpriteAsset) -> BackendResult<SpriteAnalysis> {
        if let Some(err) = self.take_injected_failure() {
            return Err(err);
        }
        Ok(SpriteAnalysis {
            silhouette_complexity: (sprite.data.len() % 100) as u32,
            dominant_palette: vec!["#202020".into(), "#c0c0c0".into()],
        })
    }

    async fn derive_combat_attributes(&self, analysis: &SpriteAnalysis) -> BackendResult<CombatAttributes> {
        if let Some(err) = self.take_injected_failure() {
            return Err(err);
        }
        let complexity = analysis.silhouette_complexity.max(1);
        Ok(CombatAttributes {
            damage: 10 + complexity % 20,
            armor: complexity % 10,
            range: 1 + complexity % 5,
            speed: 3 + complexity % 4,
            attacks_per_second: 1.0,
        })
    }

    async fn generate_direction_frames(&self, sprite: &SpriteAsset, direction: BaseDirection) -> BackendResult<DirectionFrames> {
        if let Some(err) = self.take_injected_failure() {
            return Err(err);
        }
        let frame = SpriteAsset { data: sprite.data.clone(), format: sprite.format.clone() };
        Ok(DirectionFrames {
            direction,
            walk: vec![frame.clone()],
            idle: vec![frame.clone()],
            attack: vec![frame],
        })
    }
}
