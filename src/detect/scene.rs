//! The per-frame input bundle: color, grayscale, HSV, depth, and the
//! quantized maps derived from them.

use crate::core::types::ColorConversionCode;
use crate::core::{Mat, MatDepth};
use crate::detect::criteria::Criteria;
use crate::error::{Error, Result};
use crate::imgproc::{cvt_color, quantized_gradients, quantized_normals};
use tracing::debug;

/// One frame of RGB-D input plus its derived maps.
///
/// Invariant: every array shares the same pixel grid. Depth 0 encodes a
/// missing reading.
pub struct Scene {
    pub color: Mat,
    pub grayscale: Mat,
    pub hsv: Mat,
    pub depth: Mat,
    pub depth_f32: Mat,
    pub quantized_normals: Mat,
    pub quantized_gradients: Mat,
    pub magnitude: Mat,
}

impl Scene {
    /// Build a `Scene` from a BGR color image and an aligned 16-bit depth map
    /// (mm), deriving grayscale, HSV, and the quantized maps used by
    /// objectness and the matcher.
    pub fn build(color: Mat, depth: Mat, criteria: &Criteria) -> Result<Self> {
        if color.channels() != 3 || color.depth() != MatDepth::U8 {
            return Err(Error::InvalidInput(
                "scene color image must be 3-channel U8".to_string(),
            ));
        }
        if depth.channels() != 1 || depth.depth() != MatDepth::U16 {
            return Err(Error::InvalidInput(
                "scene depth image must be single-channel U16".to_string(),
            ));
        }
        if color.rows() != depth.rows() || color.cols() != depth.cols() {
            return Err(Error::InvalidInput(
                "scene color and depth images must share dimensions".to_string(),
            ));
        }

        let rows = color.rows();
        let cols = color.cols();

        let mut gray_u8 = Mat::new(rows, cols, 1, MatDepth::U8)?;
        cvt_color(&color, &mut gray_u8, ColorConversionCode::BgrToGray)?;
        let grayscale = gray_u8.convert_to(MatDepth::F32)?;

        let mut hsv = Mat::new(rows, cols, 3, MatDepth::U8)?;
        cvt_color(&color, &mut hsv, ColorConversionCode::BgrToHsv)?;

        let mut depth_f32 = Mat::new(rows, cols, 1, MatDepth::F32)?;
        for y in 0..rows {
            for x in 0..cols {
                let raw = depth.at_u16(y, x, 0)?;
                depth_f32.set_f32(y, x, 0, f32::from(raw))?;
            }
        }

        let has_valid_depth = (0..rows)
            .flat_map(|y| (0..cols).map(move |x| (y, x)))
            .any(|(y, x)| depth.at_u16(y, x, 0).unwrap_or(0) > 0);
        if !has_valid_depth {
            return Err(Error::DegenerateScene(
                "scene has no depth pixels within range".to_string(),
            ));
        }

        let (fx, fy) = criteria.focal_length;
        let quantized_normals = quantized_normals(
            &depth,
            fx,
            fy,
            criteria.normal_max_distance,
            criteria.normal_max_difference,
        )?;

        let (quantized_gradients, magnitude) = quantized_gradients(&grayscale)?;

        debug!(rows, cols, "scene built");

        Ok(Self {
            color,
            grayscale,
            hsv,
            depth,
            depth_f32,
            quantized_normals,
            quantized_gradients,
            magnitude,
        })
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.color.rows()
    }

    #[must_use]
    pub fn cols(&self) -> usize {
        self.color.cols()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Scalar;

    fn flat_scene(depth_mm: u16) -> (Mat, Mat) {
        let color = Mat::new_with_default(64, 64, 3, MatDepth::U8, Scalar::all(128.0)).unwrap();
        let mut depth = Mat::new(64, 64, 1, MatDepth::U16).unwrap();
        for y in 0..64 {
            for x in 0..64 {
                depth.set_u16(y, x, 0, depth_mm).unwrap();
            }
        }
        (color, depth)
    }

    #[test]
    fn build_succeeds_on_valid_input() {
        let (color, depth) = flat_scene(1000);
        let criteria = Criteria::default();
        let scene = Scene::build(color, depth, &criteria).unwrap();
        assert_eq!(scene.rows(), 64);
        assert_eq!(scene.cols(), 64);
    }

    #[test]
    fn build_rejects_all_zero_depth() {
        let (color, depth) = flat_scene(0);
        let criteria = Criteria::default();
        let err = Scene::build(color, depth, &criteria).unwrap_err();
        assert!(matches!(err, Error::DegenerateScene(_)));
    }
}
