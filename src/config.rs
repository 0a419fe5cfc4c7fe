//! Bake configuration
//!
//! [`BakeConfig`] is immutable for the duration of one bake. It can be built
//! in code, or read from JSON with every field optional:
//!
//! ```rust
//! use vertex_ao::config::{AoStrategy, BakeConfig};
//!
//! let config = BakeConfig::from_json_str(r#"{ "ray_count": 128, "blend_factor": 1.0 }"#).unwrap();
//! assert_eq!(config.ray_count, 128);
//! assert_eq!(config.strategy, AoStrategy::Hemisphere);
//! ```

use serde::{Deserialize, Serialize};

use crate::color::{AoGrading, ColorTarget};
use crate::error::{BakeError, BakeResult};
use crate::sampler::SAMPLE_SEED;

/// Occlusion estimation algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AoStrategy {
    /// Sorted cosine hemisphere, local and scene passes blended
    #[default]
    Hemisphere,
    /// Randomly jittered normal rays against the local mesh only
    JitteredNormal,
}

/// Parameters of one bake
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BakeConfig {
    /// Rays per vertex (at least 1)
    pub ray_count: u32,
    /// 0.0 = local mesh only, 1.0 = scene only
    pub blend_factor: f32,
    /// Maximum ray length, in the space the ray is cast in
    pub max_ray_distance: f32,
    /// Add a temporary occluder under the object (or darken near z = 0 for
    /// the jittered strategy)
    pub ground_plane: bool,
    /// Which estimator to run
    pub strategy: AoStrategy,
    /// Random seed for sampling and jitter
    pub seed: u64,
    /// Post-process applied when expanding to face corners
    pub grading: AoGrading,
    /// Corner color attribute receiving the result
    pub target: ColorTarget,
}

impl Default for BakeConfig {
    fn default() -> Self {
        BakeConfig {
            ray_count: 64,
            blend_factor: 0.5,
            max_ray_distance: 10.0,
            ground_plane: false,
            strategy: AoStrategy::Hemisphere,
            seed: SAMPLE_SEED,
            grading: AoGrading::default(),
            target: ColorTarget::default(),
        }
    }
}

impl BakeConfig {
    /// Config with the given ray count and blend, defaults elsewhere
    pub fn new(ray_count: u32, blend_factor: f32) -> Self {
        BakeConfig {
            ray_count,
            blend_factor,
            ..Default::default()
        }
    }

    /// Select the estimator
    pub fn with_strategy(mut self, strategy: AoStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the maximum ray distance
    pub fn with_max_distance(mut self, max_ray_distance: f32) -> Self {
        self.max_ray_distance = max_ray_distance;
        self
    }

    /// Enable or disable the ground plane
    pub fn with_ground_plane(mut self, ground_plane: bool) -> Self {
        self.ground_plane = ground_plane;
        self
    }

    /// Check ranges; run before any computation
    pub fn validate(&self) -> BakeResult<()> {
        if self.ray_count == 0 {
            return Err(BakeError::invalid("ray_count must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.blend_factor) {
            return Err(BakeError::invalid(format!(
                "blend_factor must be in [0, 1], got {}",
                self.blend_factor
            )));
        }
        if !self.max_ray_distance.is_finite() || self.max_ray_distance < 0.0 {
            return Err(BakeError::invalid(format!(
                "max_ray_distance must be a finite non-negative number, got {}",
                self.max_ray_distance
            )));
        }
        self.grading.validate()
    }

    /// Parse from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> BakeResult<Self> {
        serde_json::from_str(json).map_err(|e| BakeError::Config(e.to_string()))
    }

    /// Serialize to pretty JSON
    pub fn to_json_string(&self) -> BakeResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| BakeError::Config(e.to_string()))
    }
}
