use serde::{Deserialize, Serialize};

/// A submitter's request for a new sprite generation job. Canonicalized and
/// hashed by the `fingerprint` crate, never mutated after admission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub request_type: String,
    pub style: String,
    pub dimensions: Dimensions,
    pub description: String,
    #[serde(default)]
    pub action: Option<String>,
    /// Normalized image bytes for the image-reference path; absent for
    /// text-only requests.
    #[serde(default)]
    pub reference_image: Option<Vec<u8>>,
    #[serde(default)]
    pub text_guidance_scale: Option<f32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl GenerationRequest {
    /// Field-level validation per the admission algorithm's first step.
    /// Does not check `submitter_id` — that is the caller's responsibility.
    pub fn validate(&self) -> Result<(), String> {
        if self.request_type.trim().is_empty() {
            return Err("request_type must not be empty".into());
        }
        if self.style.trim().is_empty() {
            return Err("style must not be empty".into());
        }
        if self.dimensions.width == 0 || self.dimensions.height == 0 {
            return Err("dimensions must be positive".into());
        }
        if self.description.trim().is_empty() {
            return Err("description must not be empty".into());
        }
        if let Some(scale) = self.text_guidance_scale {
            if !(1.0..=20.0).contains(&scale) {
                return Err("text_guidance_scale must be within [1.0, 20.0]".into());
            }
        }
        Ok(())
    }
}
