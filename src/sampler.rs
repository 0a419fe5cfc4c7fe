//! Cosine-weighted hemisphere sample generation
//!
//! Samples live in a canonical frame whose up axis is +Z; the estimator
//! rotates them into each vertex's normal frame. The set is sorted by
//! descending up-dot so a vertex's self-occlusion horizon (`min_dot`) can
//! cut the list with a binary search instead of a per-ray test.

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

use crate::error::{BakeError, BakeResult};

/// Fixed seed used for reproducible sample sets
pub const SAMPLE_SEED: u64 = 42;

/// Unit direction on the upper hemisphere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HemisphereSample {
    /// Direction in the canonical +Z-up frame
    pub direction: Vec3,
    /// `direction.dot(Vec3::Z)`, the sort key
    pub up_dot: f32,
}

/// Generate `ray_count` cosine-weighted directions, sorted by descending z
///
/// The output is a pure function of `(ray_count, seed)`.
pub fn hemisphere_samples(ray_count: u32, seed: u64) -> BakeResult<Vec<HemisphereSample>> {
    if ray_count == 0 {
        return Err(BakeError::invalid("ray_count must be at least 1"));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut samples: Vec<HemisphereSample> = (0..ray_count)
        .map(|_| {
            let u1: f32 = rng.gen();
            let u2: f32 = rng.gen();
            let r = u1.sqrt();
            let theta = TAU * u2;
            let direction = Vec3::new(r * theta.cos(), r * theta.sin(), (1.0 - u1).max(0.0).sqrt());
            HemisphereSample {
                direction,
                up_dot: direction.dot(Vec3::Z),
            }
        })
        .collect();

    // Stable sort keeps generation order among equal keys
    samples.sort_by(|a, b| b.up_dot.total_cmp(&a.up_dot));
    Ok(samples)
}

/// Index of the first sample whose up-dot falls below `min_dot`
///
/// Every sample from this index on lies under the vertex's local horizon.
#[inline]
pub fn first_culled_index(samples: &[HemisphereSample], min_dot: f32) -> usize {
    samples.partition_point(|s| s.up_dot >= min_dot)
}
