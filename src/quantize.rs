//! Pure quantization functions shared by training and detection.
//!
//! Each quantizer maps a raw measurement (a surface normal, a gradient angle,
//! a relative depth) onto a small integer code. None of these functions touch
//! a `Mat` directly — the pixel-kernel drivers that scan an image and call
//! into these live in [`crate::imgproc::quantized`].

use crate::core::types::Point3f;
use crate::error::{Error, Result};

/// Octant-representative unit vectors used by [`quantize_surface_normal`].
///
/// Eight directions spanning the upper hemisphere (z >= 0) at 45-degree
/// azimuth increments and a fixed 45-degree elevation.
pub const OCTANT_NORMALS: [Point3f; 8] = [
    Point3f { x: 0.707_107, y: 0.0, z: 0.707_107 },
    Point3f { x: 0.577_35, y: 0.577_35, z: 0.707_107 },
    Point3f { x: 0.0, y: 0.707_107, z: 0.707_107 },
    Point3f { x: -0.577_35, y: 0.577_35, z: 0.707_107 },
    Point3f { x: -0.707_107, y: 0.0, z: 0.707_107 },
    Point3f { x: -0.577_35, y: -0.577_35, z: 0.707_107 },
    Point3f { x: 0.0, y: -0.707_107, z: 0.707_107 },
    Point3f { x: 0.577_35, y: -0.577_35, z: 0.707_107 },
];

/// 20x20 lookup table mapping a quantized (Nx, Ny) coordinate to one of
/// eight power-of-two bit codes (1, 2, 4, 8, 16, 32, 64, 128).
///
/// Indexed `[vY][vX]` where `vX`/`vY` are `N * 10 + 10` for a unit-length
/// component `N` in `[-1, 1]`.
pub const NORMAL_LUT_SIZE: usize = 20;
#[rustfmt::skip]
pub const NORMAL_LUT: [[u8; NORMAL_LUT_SIZE]; NORMAL_LUT_SIZE] = [
    [32, 32, 32, 32, 32, 32, 64, 64, 64, 64, 64, 64,  64,  64,  64,  128, 128, 128, 128, 128],
    [32, 32, 32, 32, 32, 32, 32, 64, 64, 64, 64, 64,  64,  64,  128, 128, 128, 128, 128, 128],
    [32, 32, 32, 32, 32, 32, 32, 64, 64, 64, 64, 64,  64,  64,  128, 128, 128, 128, 128, 128],
    [32, 32, 32, 32, 32, 32, 32, 32, 64, 64, 64, 64,  64,  128, 128, 128, 128, 128, 128, 128],
    [32, 32, 32, 32, 32, 32, 32, 32, 64, 64, 64, 64,  64,  128, 128, 128, 128, 128, 128, 128],
    [32, 32, 32, 32, 32, 32, 32, 32, 64, 64, 64, 64,  64,  128, 128, 128, 128, 128, 128, 128],
    [16, 32, 32, 32, 32, 32, 32, 32, 32, 64, 64, 64,  128, 128, 128, 128, 128, 128, 128, 128],
    [16, 16, 16, 32, 32, 32, 32, 32, 32, 64, 64, 64,  128, 128, 128, 128, 128, 128, 1,   1],
    [16, 16, 16, 16, 16, 16, 32, 32, 32, 32, 64, 128, 128, 128, 128, 1,   1,   1,   1,   1],
    [16, 16, 16, 16, 16, 16, 16, 16, 32, 32, 64, 128, 128, 1,   1,   1,   1,   1,   1,   1],
    [16, 16, 16, 16, 16, 16, 16, 16, 16, 16, 1,  1,   1,   1,   1,   1,   1,   1,   1,   1],
    [16, 16, 16, 16, 16, 16, 16, 16, 8,  8,  4,  2,   2,   1,   1,   1,   1,   1,   1,   1],
    [16, 16, 16, 16, 16, 16, 8,  8,  8,  8,  4,  2,   2,   2,   2,   1,   1,   1,   1,   1],
    [16, 16, 16, 8,  8,  8,  8,  8,  8,  4,  4,  4,   2,   2,   2,   2,   2,   2,   1,   1],
    [16, 8,  8,  8,  8,  8,  8,  8,  8,  4,  4,  4,   2,   2,   2,   2,   2,   2,   2,   2],
    [8,  8,  8,  8,  8,  8,  8,  8,  4,  4,  4,  4,   4,   2,   2,   2,   2,   2,   2,   2],
    [8,  8,  8,  8,  8,  8,  8,  8,  4,  4,  4,  4,   4,   2,   2,   2,   2,   2,   2,   2],
    [8,  8,  8,  8,  8,  8,  8,  8,  4,  4,  4,  4,   4,   2,   2,   2,   2,   2,   2,   2],
    [8,  8,  8,  8,  8,  8,  8,  4,  4,  4,  4,  4,   4,   4,   2,   2,   2,   2,   2,   2],
    [8,  8,  8,  8,  8,  8,  8,  4,  4,  4,  4,  4,   4,   4,   2,   2,   2,   2,   2,   2],
];

/// Power-of-two bit codes backing the 5-bin relative-depth quantizer.
pub const DEPTH_BIT_LUT: [u8; 5] = [1, 2, 4, 8, 16];

/// Quantize a unit surface normal (z >= 0) into one of 8 octant bins.
///
/// Returns [`Error::InvalidInput`] if `normal.z < 0` — a normal pointing away
/// from the sensor can never occur for a visible surface patch.
pub fn quantize_surface_normal(normal: Point3f) -> Result<u8> {
    if normal.z < 0.0 {
        return Err(Error::InvalidInput(
            "surface normal z component must be non-negative".to_string(),
        ));
    }

    let mut best_index = 0u8;
    let mut best_dot = f32::MIN;

    for (i, octant) in OCTANT_NORMALS.iter().enumerate() {
        let dot = normal.x * octant.x + normal.y * octant.y + normal.z * octant.z;
        if dot > best_dot {
            best_dot = dot;
            best_index = i as u8;
        }
    }

    Ok(best_index)
}

/// Look up the depth-normal bit code for a unit normal's (Nx, Ny) components
/// via the 20x20 table. Returns 0 for degenerate (zero-length) input.
#[must_use]
pub fn quantize_depth_normal(nx: f32, ny: f32) -> u8 {
    let offset = (NORMAL_LUT_SIZE / 2) as f32;
    let vx = (nx * offset + offset) as i32;
    let vy = (ny * offset + offset) as i32;

    let size = NORMAL_LUT_SIZE as i32;
    if vx < 0 || vx >= size || vy < 0 || vy >= size {
        return 0;
    }

    NORMAL_LUT[vy as usize][vx as usize]
}

/// Quantize an intensity-gradient angle in degrees (`[0, 360]`) into one of
/// 5 bins of 36 degrees each, folded modulo 180 degrees.
#[must_use]
pub fn quantize_gradient_angle(deg: f32) -> u8 {
    let deg_mod = (deg.rem_euclid(360.0) as i32) % 180;
    (deg_mod / 36).clamp(0, 4) as u8
}

/// Quantize a signed relative depth (mm) into one of the power-of-two bit
/// codes in [`DEPTH_BIT_LUT`], using the first half-open range `[start, end)`
/// from `ranges` that contains `depth`. Saturates to the last bin if no
/// range matches (mirrors the reference implementation's out-of-range rule).
#[must_use]
pub fn quantize_relative_depth(depth: f32, ranges: &[(f32, f32)]) -> u8 {
    debug_assert!(!ranges.is_empty());

    for (i, &(start, end)) in ranges.iter().enumerate() {
        if depth >= start && depth < end {
            return DEPTH_BIT_LUT[i.min(DEPTH_BIT_LUT.len() - 1)];
        }
    }

    DEPTH_BIT_LUT[ranges.len().saturating_sub(1).min(DEPTH_BIT_LUT.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn octant_quantizer_rejects_negative_z() {
        let n = Point3f::new(0.0, 0.0, -1.0);
        assert!(quantize_surface_normal(n).is_err());
    }

    #[test]
    fn octant_quantizer_is_idempotent_on_representatives() {
        for (i, octant) in OCTANT_NORMALS.iter().enumerate() {
            let idx = quantize_surface_normal(*octant).unwrap();
            assert_eq!(idx as usize, i);
        }
    }

    #[test]
    fn octant_quantizer_returns_in_range() {
        let n = Point3f::new(0.1, 0.2, 0.97);
        let idx = quantize_surface_normal(n).unwrap();
        assert!(idx < 8);
    }

    #[test]
    fn depth_normal_lut_has_exactly_one_bit_set() {
        for row in NORMAL_LUT {
            for code in row {
                assert_eq!(code.count_ones(), 1);
            }
        }
    }

    #[test]
    fn gradient_quantizer_invariant_modulo_180() {
        assert_eq!(quantize_gradient_angle(10.0), quantize_gradient_angle(190.0));
        assert_eq!(quantize_gradient_angle(0.0), quantize_gradient_angle(180.0));
    }

    #[test]
    fn gradient_quantizer_bins_in_range() {
        for deg in (0..360).step_by(7) {
            let bin = quantize_gradient_angle(deg as f32);
            assert!(bin < 5);
        }
    }

    #[test]
    fn relative_depth_quantizer_saturates_to_last_bin() {
        let ranges = [(-65536.0, -50.0), (-50.0, -15.0), (-15.0, 15.0), (15.0, 50.0), (50.0, 65536.0)];
        assert_eq!(quantize_relative_depth(1_000_000.0, &ranges), DEPTH_BIT_LUT[4]);
        assert_eq!(quantize_relative_depth(0.0, &ranges), DEPTH_BIT_LUT[2]);
    }
}
