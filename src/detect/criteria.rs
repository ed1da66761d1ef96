//! Shared, immutable configuration consumed by every detection component.

use serde::{Deserialize, Serialize};

/// Configuration bundle shared by training and detection.
///
/// Immutable once a session starts (§3, §5): construct via [`Criteria::default`]
/// or by deserializing a saved `criteria.json`, then pass by reference (or
/// wrapped in `Arc`) to every component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    /// Number of edge and stable feature points sampled per template (N).
    pub feature_point_count: usize,
    /// Canny low threshold used on the 8-bit blurred template grayscale.
    pub canny_low: f64,
    /// Canny high threshold used on the 8-bit blurred template grayscale.
    pub canny_high: f64,
    /// Maximum combined Sobel response admitted for a "stable" point.
    pub sobel_max: u8,
    /// Minimum grayscale intensity admitted for a "stable" point.
    pub gray_min_stable: u8,
    /// Number of hash tables (equivalently, random triplets) to train.
    pub hash_table_count: usize,
    /// Grid the random triplet points are drawn from, e.g. 12x12.
    pub triplet_grid: (i32, i32),
    /// Size of the smallest template's bounding box, used to size windows.
    /// Populated from the trained template set rather than hand-configured.
    pub smallest_template_size: (i32, i32),
    /// Minimum nonzero quantized-normal pixels for a window to pass objectness.
    pub min_edgels: usize,
    /// Camera focal length (fx, fy) used by the bilateral normal fit.
    pub focal_length: (f32, f32),
    /// Maximum depth (mm) considered when fitting surface normals.
    pub normal_max_distance: i64,
    /// Maximum neighbor depth difference (mm) admitted into the bilateral fit.
    pub normal_max_difference: i64,
    /// Half-open depth-difference ranges (mm) backing the relative-depth bins.
    pub depth_bin_ranges: Vec<(f32, f32)>,
    /// Search radius (x, y) in pixels used by the matcher's neighborhood tests.
    pub neighborhood_offset: (i32, i32),
    /// Per-test pass ratio for the matcher cascade (reference: 60%).
    pub match_ratio: f32,
    /// Minimum vote ratio for hash-table verification to admit a candidate.
    pub min_vote_ratio: f32,
    /// Maximum number of candidates kept per window after verification.
    pub max_candidates: usize,
    /// Per-channel HSV tolerance for the color test.
    pub color_tolerance: (u8, u8, u8),
    /// Weights combining the four numeric sub-scores into the final score.
    pub cascade_weights: [f32; 4],
    /// Greedy NMS IoU threshold.
    pub overlap_factor: f32,
    /// Initial pyramid scale.
    pub pyramid_initial_scale: f32,
    /// Per-level pyramid scale multiplier.
    pub pyramid_factor: f32,
    /// Number of pyramid levels to evaluate per frame.
    pub pyramid_levels: usize,
    /// Fixed seed driving random triplet generation (reproducibility).
    pub triplet_seed: u64,
    /// Fixed seed driving feature-point shuffling during training.
    pub shuffle_seed: u64,
}

impl Default for Criteria {
    fn default() -> Self {
        Self {
            feature_point_count: 100,
            canny_low: 50.0,
            canny_high: 150.0,
            sobel_max: 30,
            gray_min_stable: 5,
            hash_table_count: 100,
            triplet_grid: (12, 12),
            smallest_template_size: (0, 0),
            min_edgels: 10,
            focal_length: (572.41, 573.57),
            normal_max_distance: 2000,
            normal_max_difference: 20,
            depth_bin_ranges: vec![
                (-65536.0, -50.0),
                (-50.0, -15.0),
                (-15.0, 15.0),
                (15.0, 50.0),
                (50.0, 65536.0),
            ],
            neighborhood_offset: (5, 5),
            match_ratio: 0.6,
            min_vote_ratio: 0.5,
            max_candidates: 100,
            color_tolerance: (20, 40, 40),
            cascade_weights: [0.3, 0.3, 0.2, 0.2],
            overlap_factor: 0.5,
            pyramid_initial_scale: 0.4,
            pyramid_factor: 1.25,
            pyramid_levels: 9,
            triplet_seed: 0xC0FF_EE42,
            shuffle_seed: 1,
        }
    }
}

impl Criteria {
    /// Return a copy with `smallest_template_size` set from the trained
    /// template set. Kept as a method rather than a mutation since Criteria
    /// is treated as immutable for the duration of a session.
    #[must_use]
    pub fn with_smallest_template_size(&self, size: (i32, i32)) -> Self {
        Self {
            smallest_template_size: size,
            ..self.clone()
        }
    }

    /// Minimum passing score for one cascade test, `ceil(N * match_ratio)`.
    #[must_use]
    pub fn cascade_threshold(&self) -> usize {
        (self.feature_point_count as f32 * self.match_ratio).ceil() as usize
    }

    /// Minimum vote count for hash-table verification, `ceil(T * min_vote_ratio)`.
    #[must_use]
    pub fn vote_threshold(&self) -> usize {
        (self.hash_table_count as f32 * self.min_vote_ratio).ceil() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_json() {
        let criteria = Criteria::default();
        let json = serde_json::to_string(&criteria).unwrap();
        let back: Criteria = serde_json::from_str(&json).unwrap();
        assert_eq!(criteria, back);
    }

    #[test]
    fn thresholds_match_reference_defaults() {
        let criteria = Criteria::default();
        assert_eq!(criteria.cascade_threshold(), 60);
        assert_eq!(criteria.vote_threshold(), 50);
    }
}
