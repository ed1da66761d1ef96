//! Template data model and training-time feature extraction (§3, §4.4).

use crate::core::types::{Point, Rect};
use crate::core::{Mat, MatDepth};
use crate::detect::criteria::Criteria;
use crate::error::{Error, Result};
use crate::imgproc::{blur, canny, sobel};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// A synthetic, labeled view of a known rigid object with precomputed
/// features (§3 Template).
///
/// `id / 2000` recovers the owning object class id, matching the reference
/// implementation's template numbering convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: i32,
    pub object_bb: Rect,
    pub color: Mat,
    pub grayscale: Mat,
    pub hsv: Mat,
    pub depth: Mat,
    pub edge_points: Vec<Point>,
    pub stable_points: Vec<Point>,
    pub gradient_bins: Vec<u8>,
    pub normal_bins: Vec<u8>,
    pub depths: Vec<f32>,
    pub colors: Vec<(u8, u8, u8)>,
    pub depth_median: f32,
    pub diameter_mm: f32,
}

impl Template {
    #[must_use]
    pub fn object_class_id(&self) -> i32 {
        self.id / 2000
    }
}

/// Cropped, box-local pixel sources a template is trained from. Not
/// persisted on `Template` beyond the copies `Template` itself carries.
pub struct TemplateSource {
    pub id: i32,
    pub object_bb: Rect,
    pub color: Mat,
    pub grayscale: Mat,
    pub hsv: Mat,
    pub depth: Mat,
    pub diameter_mm: f32,
}

/// Train a single template's feature points and per-point feature vectors
/// from its cropped sources (§4.4).
///
/// Fails with [`Error::InsufficientData`] if fewer than `feature_point_count`
/// edge or stable candidates are found.
pub fn train_template(source: TemplateSource, criteria: &Criteria) -> Result<Template> {
    let n = criteria.feature_point_count;

    let mut gray_u8 = Mat::new(source.grayscale.rows(), source.grayscale.cols(), 1, MatDepth::U8)?;
    for y in 0..source.grayscale.rows() {
        for x in 0..source.grayscale.cols() {
            let v = source.grayscale.at_f32(y, x, 0)?;
            gray_u8.at_mut(y, x)?[0] = (v * 255.0).round().clamp(0.0, 255.0) as u8;
        }
    }

    let mut blurred = Mat::new(1, 1, 1, MatDepth::U8)?;
    blur(&gray_u8, &mut blurred, crate::core::types::Size::new(3, 3))?;

    let mut canny_mask = Mat::new(1, 1, 1, MatDepth::U8)?;
    canny(&blurred, &mut canny_mask, criteria.canny_low, criteria.canny_high)?;

    let mut sobel_x = Mat::new(1, 1, 1, MatDepth::U8)?;
    let mut sobel_y = Mat::new(1, 1, 1, MatDepth::U8)?;
    sobel(&blurred, &mut sobel_x, 1, 0, 3)?;
    sobel(&blurred, &mut sobel_y, 0, 1, 3)?;

    let rows = blurred.rows();
    let cols = blurred.cols();
    let mut edge_candidates = Vec::new();
    let mut stable_candidates = Vec::new();

    for y in 0..rows {
        for x in 0..cols {
            if canny_mask.at(y, x)?[0] > 0 {
                edge_candidates.push(Point::new(x as i32, y as i32));
            }

            let gray_val = blurred.at(y, x)?[0];
            let sobel_val =
                (u16::from(sobel_x.at(y, x)?[0]) / 2 + u16::from(sobel_y.at(y, x)?[0]) / 2) as u8;
            if gray_val > criteria.gray_min_stable && sobel_val <= criteria.sobel_max {
                stable_candidates.push(Point::new(x as i32, y as i32));
            }
        }
    }

    if edge_candidates.len() < n {
        return Err(Error::InsufficientData {
            id: source.id,
            reason: format!("only {} edge candidates, need {n}", edge_candidates.len()),
        });
    }
    if stable_candidates.len() < n {
        return Err(Error::InsufficientData {
            id: source.id,
            reason: format!("only {} stable candidates, need {n}", stable_candidates.len()),
        });
    }

    let mut rng = ChaCha8Rng::seed_from_u64(criteria.shuffle_seed);
    edge_candidates.shuffle(&mut rng);
    stable_candidates.shuffle(&mut rng);

    let edge_points: Vec<Point> = edge_candidates.into_iter().take(n).collect();

    let mut stable_points = Vec::with_capacity(n);
    for &candidate in &stable_candidates {
        if stable_points.len() >= n {
            break;
        }
        let depth = source.depth.at_f32(candidate.y as usize, candidate.x as usize, 0)?;
        if depth > 0.0 {
            stable_points.push(candidate);
        }
    }

    if stable_points.len() < n {
        return Err(Error::InsufficientData {
            id: source.id,
            reason: format!(
                "only {} stable points with positive depth, need {n}",
                stable_points.len()
            ),
        });
    }

    let (gradient_bins, normal_bins, depths, colors, depth_median) =
        extract_point_features(&source, &edge_points, &stable_points)?;

    Ok(Template {
        id: source.id,
        object_bb: source.object_bb,
        color: source.color,
        grayscale: source.grayscale,
        hsv: source.hsv,
        depth: source.depth,
        edge_points,
        stable_points,
        gradient_bins,
        normal_bins,
        depths,
        colors,
        depth_median,
        diameter_mm: source.diameter_mm,
    })
}

/// Extract per-point feature channels: gradient orientation bin at each edge
/// point, normal octant bin / depth / HSV at each stable point, and the
/// stable-point depth median.
///
/// Points on the box border are translated into the full-canvas source
/// before the central-difference operators run (avoiding a border read),
/// then translated back — but since templates here are already stored
/// box-local without a surrounding canvas, this resolves to a clamped
/// central difference at the border instead of a canvas round-trip.
fn extract_point_features(
    source: &TemplateSource,
    edge_points: &[Point],
    stable_points: &[Point],
) -> Result<(Vec<u8>, Vec<u8>, Vec<f32>, Vec<(u8, u8, u8)>, f32)> {
    let rows = source.grayscale.rows() as i32;
    let cols = source.grayscale.cols() as i32;

    let clamp_x = |x: i32| x.clamp(1, cols - 2);
    let clamp_y = |y: i32| y.clamp(1, rows - 2);

    let mut gradient_bins = Vec::with_capacity(edge_points.len());
    for p in edge_points {
        let x = clamp_x(p.x);
        let y = clamp_y(p.y);
        let bin = crate::imgproc::gradient_bin_at(&source.grayscale, x, y)?.ok_or_else(|| {
            Error::InsufficientData {
                id: source.id,
                reason: "edge point has no valid interior gradient after border clamping".to_string(),
            }
        })?;
        gradient_bins.push(bin);
    }

    let mut normal_bins = Vec::with_capacity(stable_points.len());
    let mut depths = Vec::with_capacity(stable_points.len());
    let mut colors = Vec::with_capacity(stable_points.len());
    let mut depth_ints = Vec::with_capacity(stable_points.len());

    for p in stable_points {
        let x = clamp_x(p.x);
        let y = clamp_y(p.y);

        let bin = crate::imgproc::normal_bin_at(&source.depth, x, y)?.ok_or_else(|| {
            Error::InsufficientData {
                id: source.id,
                reason: "stable point has no valid interior normal after border clamping".to_string(),
            }
        })?;
        normal_bins.push(bin);

        let depth = source.depth.at_f32(p.y as usize, p.x as usize, 0)?;
        depths.push(depth);
        depth_ints.push(depth as i64);

        let pixel = source.hsv.at(p.y as usize, p.x as usize)?;
        colors.push((pixel[0], pixel[1], pixel[2]));
    }

    depth_ints.sort_unstable();
    let depth_median = if depth_ints.is_empty() {
        0.0
    } else {
        depth_ints[depth_ints.len() / 2] as f32
    };

    Ok((gradient_bins, normal_bins, depths, colors, depth_median))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Scalar;

    fn flat_template(id: i32, n: usize) -> TemplateSource {
        let size = 64;
        let color = Mat::new_with_default(size, size, 3, MatDepth::U8, Scalar::all(128.0)).unwrap();
        let mut grayscale = Mat::new(size, size, 1, MatDepth::F32).unwrap();
        let mut depth = Mat::new(size, size, 1, MatDepth::F32).unwrap();
        for y in 0..size {
            for x in 0..size {
                // Checkerboard-ish gradient so Canny/Sobel produce plenty of candidates.
                let v = if (x / 4 + y / 4) % 2 == 0 { 0.2 } else { 0.8 };
                grayscale.set_f32(y, x, 0, v).unwrap();
                depth.set_f32(y, x, 0, 1000.0).unwrap();
            }
        }
        let mut hsv = Mat::new(size, size, 3, MatDepth::U8).unwrap();
        for y in 0..size {
            for x in 0..size {
                let pixel = hsv.at_mut(y, x).unwrap();
                pixel[0] = 10;
                pixel[1] = 100;
                pixel[2] = 200;
            }
        }

        let _ = n;
        TemplateSource {
            id,
            object_bb: Rect::new(0, 0, size as i32, size as i32),
            color,
            grayscale,
            hsv,
            depth,
            diameter_mm: 100.0,
        }
    }

    #[test]
    fn training_fills_all_feature_vectors() {
        let mut criteria = Criteria::default();
        criteria.feature_point_count = 20;
        let source = flat_template(0, criteria.feature_point_count);

        let template = train_template(source, &criteria).unwrap();
        assert_eq!(template.edge_points.len(), criteria.feature_point_count);
        assert_eq!(template.stable_points.len(), criteria.feature_point_count);
        assert_eq!(template.gradient_bins.len(), criteria.feature_point_count);
        assert_eq!(template.normal_bins.len(), criteria.feature_point_count);
        assert!(template.normal_bins.iter().all(|&b| b < 8));
        assert!(template.gradient_bins.iter().all(|&b| b < 5));
        assert!(template.depths.iter().all(|&d| d > 0.0));
    }

    #[test]
    fn template_round_trips_through_json() {
        let mut criteria = Criteria::default();
        criteria.feature_point_count = 20;
        let source = flat_template(1, criteria.feature_point_count);
        let template = train_template(source, &criteria).unwrap();

        let json = serde_json::to_string(&template).unwrap();
        let back: Template = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, template.id);
        assert_eq!(back.normal_bins, template.normal_bins);
        assert_eq!(back.stable_points.len(), template.stable_points.len());
    }
}
