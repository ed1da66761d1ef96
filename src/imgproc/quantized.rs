//! Dense pixel-kernel drivers for the quantization schemes in [`crate::quantize`].
//!
//! These are the image-processing primitives consumed by training and by
//! the per-pyramid-level detection loop: quantized surface normals from a
//! depth map, quantized gradient orientations from a grayscale image, a
//! Sobel-magnitude filter, and a trivial band-pass threshold.

use crate::core::{Mat, MatDepth};
use crate::core::types::Point3f;
use crate::error::{Error, Result};
use crate::quantize::{quantize_depth_normal, quantize_gradient_angle, quantize_surface_normal};
use rayon::prelude::*;

/// Octant-quantized surface normal at a single point via central difference
/// on an F32 depth/disparity map (mm). Distinct from [`quantized_normals`]'s
/// LUT-based bitmask map: this is the per-point extraction the hasher and
/// matcher use at training and live-matching time, matching the reference
/// `Hasher::extractSurfaceNormal` + `quantizeSurfaceNormals` pair.
///
/// Returns `Ok(None)` at the image border or where depth is non-positive.
pub fn normal_bin_at(depth: &Mat, x: i32, y: i32) -> Result<Option<u8>> {
    if depth.channels() != 1 {
        return Err(Error::InvalidInput(
            "normal_bin_at requires a single-channel depth image".to_string(),
        ));
    }

    let rows = depth.rows() as i32;
    let cols = depth.cols() as i32;
    if x < 1 || y < 1 || x >= cols - 1 || y >= rows - 1 {
        return Ok(None);
    }

    let center = depth.at_f32(y as usize, x as usize, 0)?;
    if center <= 0.0 {
        return Ok(None);
    }

    let dzdx = (depth.at_f32(y as usize, (x + 1) as usize, 0)?
        - depth.at_f32(y as usize, (x - 1) as usize, 0)?)
        / 2.0;
    let dzdy = (depth.at_f32((y + 1) as usize, x as usize, 0)?
        - depth.at_f32((y - 1) as usize, x as usize, 0)?)
        / 2.0;

    let raw = Point3f::new(-dzdx, -dzdy, 1.0);
    let norm = (raw.x * raw.x + raw.y * raw.y + raw.z * raw.z).sqrt();
    let unit = if norm > 0.0 {
        Point3f::new(raw.x / norm, raw.y / norm, raw.z / norm)
    } else {
        Point3f::new(0.0, 0.0, 1.0)
    };

    Ok(Some(quantize_surface_normal(unit)?))
}

/// Quantized gradient-orientation bin at a single point via central
/// difference on an F32 grayscale image, matching the reference
/// `extractOrientationGradient` + `quantizeOrientationGradient` pair used by
/// template training and live matching — distinct from the full-image
/// [`quantized_gradients`] map, which only feeds the objectness prefilter.
///
/// Returns `None` at the image border.
pub fn gradient_bin_at(grayscale: &Mat, x: i32, y: i32) -> Result<Option<u8>> {
    if grayscale.channels() != 1 {
        return Err(Error::InvalidInput(
            "gradient_bin_at requires a single-channel grayscale image".to_string(),
        ));
    }

    let rows = grayscale.rows() as i32;
    let cols = grayscale.cols() as i32;
    if x < 1 || y < 1 || x >= cols - 1 || y >= rows - 1 {
        return Ok(None);
    }

    let dx = (grayscale.at_f32(y as usize, (x - 1) as usize, 0)?
        - grayscale.at_f32(y as usize, (x + 1) as usize, 0)?)
        / 2.0;
    let dy = (grayscale.at_f32((y - 1) as usize, x as usize, 0)?
        - grayscale.at_f32((y + 1) as usize, x as usize, 0)?)
        / 2.0;

    let mut angle = dy.atan2(dx).to_degrees();
    if angle < 0.0 {
        angle += 360.0;
    }

    Ok(Some(quantize_gradient_angle(angle)))
}

/// Accumulates one bilateral-weighted neighbor contribution into the 2x2
/// normal-equations matrix `a` and right-hand side `b`, following the
/// reference implementation's `accumulateBilateral`.
fn accumulate_bilateral(delta: i64, x_shift: i64, y_shift: i64, a: &mut [i64; 3], b: &mut [i64; 2], max_difference: i64) {
    let f = i64::from(delta.abs() < max_difference);
    let fx = f * x_shift;
    let fy = f * y_shift;

    a[0] += fx * x_shift;
    a[1] += fx * y_shift;
    a[2] += fy * y_shift;
    b[0] += fx * delta;
    b[1] += fy * delta;
}

/// Compute quantized surface normals from a 16-bit depth image (mm).
///
/// For every interior pixel with depth below `max_distance`, fits a local
/// plane via bilateral-weighted least squares over its 8-neighbor patch of
/// radius 5, then quantizes the resulting unit normal's (Nx, Ny) through the
/// 20x20 lookup table. The result is median-filtered (5x5) to suppress
/// speckle, matching the reference `Processing::quantizedNormals`.
pub fn quantized_normals(src: &Mat, fx: f32, fy: f32, max_distance: i64, max_difference: i64) -> Result<Mat> {
    if src.depth() != MatDepth::U16 || src.channels() != 1 {
        return Err(Error::InvalidInput(
            "quantized_normals requires a single-channel U16 depth image".to_string(),
        ));
    }

    let rows = src.rows();
    let cols = src.cols();
    let mut raw = Mat::new(rows, cols, 1, MatDepth::U8)?;
    const PS: i64 = 5;

    if rows > 2 * PS as usize && cols > 2 * PS as usize {
        rayon::scope(|_s| {
            let dst_data = raw.data_mut();

            dst_data[PS as usize * cols..(rows - PS as usize) * cols]
                .par_chunks_mut(cols)
                .enumerate()
                .for_each(|(row_idx, dst_row)| {
                    let y = row_idx + PS as usize;

                    for x in PS as usize..cols - PS as usize {
                        let depth_at = |yy: usize, xx: usize| -> i64 {
                            i64::from(src.at_u16(yy, xx, 0).unwrap_or(0))
                        };

                        let d = depth_at(y, x);
                        if d >= max_distance || d == 0 {
                            continue;
                        }

                        let mut a = [0i64; 3];
                        let mut b = [0i64; 2];
                        let ps = PS as usize;

                        accumulate_bilateral(depth_at(y - ps, x - ps) - d, -PS, -PS, &mut a, &mut b, max_difference);
                        accumulate_bilateral(depth_at(y - ps, x) - d, 0, -PS, &mut a, &mut b, max_difference);
                        accumulate_bilateral(depth_at(y - ps, x + ps) - d, PS, -PS, &mut a, &mut b, max_difference);
                        accumulate_bilateral(depth_at(y, x - ps) - d, -PS, 0, &mut a, &mut b, max_difference);
                        accumulate_bilateral(depth_at(y, x + ps) - d, PS, 0, &mut a, &mut b, max_difference);
                        accumulate_bilateral(depth_at(y + ps, x - ps) - d, -PS, PS, &mut a, &mut b, max_difference);
                        accumulate_bilateral(depth_at(y + ps, x) - d, 0, PS, &mut a, &mut b, max_difference);
                        accumulate_bilateral(depth_at(y + ps, x + ps) - d, PS, PS, &mut a, &mut b, max_difference);

                        let det = a[0] * a[2] - a[1] * a[1];
                        let dx = a[2] * b[0] - a[1] * b[1];
                        let dy = -a[1] * b[0] + a[0] * b[1];

                        let nx = fx * dx as f32;
                        let ny = fy * dy as f32;
                        let nz = -(det as f32) * d as f32;

                        let norm = (nx * nx + ny * ny + nz * nz).sqrt();

                        dst_row[x - PS as usize] = if norm > 0.0 {
                            let inv = 1.0 / norm;
                            quantize_depth_normal(nx * inv, ny * inv)
                        } else {
                            0
                        };
                    }
                });
        });
    }

    median_blur_u8(&raw, 5)
}

/// Simple 5x5 median blur over a single-channel U8 image, border pixels
/// left as-is (matches the reference's use of `cv::medianBlur` on a
/// zero-bordered buffer where border pixels never hold candidate features).
fn median_blur_u8(src: &Mat, ksize: i32) -> Result<Mat> {
    let rows = src.rows();
    let cols = src.cols();
    let half = (ksize / 2) as i64;
    let mut dst = Mat::new(rows, cols, 1, MatDepth::U8)?;

    rayon::scope(|_s| {
        let dst_data = dst.data_mut();
        dst_data.par_chunks_mut(cols).enumerate().for_each(|(row, dst_row)| {
            for (col, out) in dst_row.iter_mut().enumerate() {
                let mut values = [0u8; 25];
                let mut count = 0usize;

                for dy in -half..=half {
                    let ry = row as i64 + dy;
                    if ry < 0 || ry >= rows as i64 {
                        continue;
                    }
                    for dx in -half..=half {
                        let rx = col as i64 + dx;
                        if rx < 0 || rx >= cols as i64 {
                            continue;
                        }
                        values[count] = src.at(ry as usize, rx as usize).map(|p| p[0]).unwrap_or(0);
                        count += 1;
                    }
                }

                values[..count].sort_unstable();
                *out = values[count / 2];
            }
        });
    });

    Ok(dst)
}

/// Compute quantized gradient orientations and magnitude from a single-channel
/// F32 grayscale image, via 3x3 Sobel followed by Cartesian-to-polar
/// conversion (angle in degrees) and the 5-bin orientation quantizer.
pub fn quantized_gradients(src_gray: &Mat) -> Result<(Mat, Mat)> {
    if src_gray.depth() != MatDepth::F32 || src_gray.channels() != 1 {
        return Err(Error::InvalidInput(
            "quantized_gradients requires a single-channel F32 grayscale image".to_string(),
        ));
    }

    let rows = src_gray.rows();
    let cols = src_gray.cols();
    let mut orientations = Mat::new(rows, cols, 1, MatDepth::U8)?;
    let mut magnitude = Mat::new(rows, cols, 1, MatDepth::F32)?;

    const KX: [[f32; 3]; 3] = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
    const KY: [[f32; 3]; 3] = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];

    for y in 1..rows.saturating_sub(1) {
        for x in 1..cols.saturating_sub(1) {
            let mut sx = 0.0f32;
            let mut sy = 0.0f32;

            for ky in 0..3 {
                for kx in 0..3 {
                    let val = src_gray.at_f32(y + ky - 1, x + kx - 1, 0)?;
                    sx += val * KX[ky][kx];
                    sy += val * KY[ky][kx];
                }
            }

            let mag = (sx * sx + sy * sy).sqrt();
            let mut angle = sy.atan2(sx).to_degrees();
            if angle < 0.0 {
                angle += 360.0;
            }

            magnitude.set_f32(y, x, 0, mag)?;
            orientations.at_mut(y, x)?[0] = quantize_gradient_angle(angle);
        }
    }

    Ok((orientations, magnitude))
}

/// Sobel-magnitude filter over a single-channel F32 image: a 3x3 Gaussian
/// blur followed by an optional x and/or y 3x3 Sobel combined as the
/// Euclidean norm, matching `Processing::filterSobel`.
pub fn filter_sobel(src: &Mat, x_filter: bool, y_filter: bool) -> Result<Mat> {
    if src.depth() != MatDepth::F32 || src.channels() != 1 {
        return Err(Error::InvalidInput(
            "filter_sobel requires a single-channel F32 image".to_string(),
        ));
    }

    let rows = src.rows();
    let cols = src.cols();
    let blurred = gaussian_blur_f32_3x3(src)?;
    let mut dst = Mat::new(rows, cols, 1, MatDepth::F32)?;

    const KX: [i32; 9] = [-1, 0, 1, -2, 0, 2, -1, 0, 1];
    const KY: [i32; 9] = [-1, -2, -1, 0, 0, 0, 1, 2, 1];

    for y in 1..rows.saturating_sub(1) {
        for x in 1..cols.saturating_sub(1) {
            let mut sum_x = 0.0f32;
            let mut sum_y = 0.0f32;
            let mut i = 0usize;

            for yy in 0..3 {
                for xx in 0..3 {
                    let px = blurred.at_f32(y + yy - 1, x + xx - 1, 0)?;
                    if x_filter {
                        sum_x += px * KX[i] as f32;
                    }
                    if y_filter {
                        sum_y += px * KY[i] as f32;
                    }
                    i += 1;
                }
            }

            dst.set_f32(y, x, 0, (sum_x * sum_x + sum_y * sum_y).sqrt())?;
        }
    }

    Ok(dst)
}

fn gaussian_blur_f32_3x3(src: &Mat) -> Result<Mat> {
    let rows = src.rows();
    let cols = src.cols();
    let mut dst = Mat::new(rows, cols, 1, MatDepth::F32)?;
    const K: [f32; 3] = [0.25, 0.5, 0.25];

    for y in 0..rows {
        for x in 0..cols {
            let mut sum = 0.0f32;
            let mut weight = 0.0f32;
            for (dy, wy) in (-1i64..=1).zip(K) {
                let ry = y as i64 + dy;
                if ry < 0 || ry >= rows as i64 {
                    continue;
                }
                for (dx, wx) in (-1i64..=1).zip(K) {
                    let rx = x as i64 + dx;
                    if rx < 0 || rx >= cols as i64 {
                        continue;
                    }
                    let w = wy * wx;
                    sum += src.at_f32(ry as usize, rx as usize, 0)? * w;
                    weight += w;
                }
            }
            dst.set_f32(y, x, 0, sum / weight)?;
        }
    }

    Ok(dst)
}

/// Band-pass threshold over a single-channel F32 image: 1.0 where
/// `min <= value <= max`, 0.0 elsewhere.
pub fn threshold_min_max(src: &Mat, min: f32, max: f32) -> Result<Mat> {
    if src.depth() != MatDepth::F32 || src.channels() != 1 {
        return Err(Error::InvalidInput(
            "threshold_min_max requires a single-channel F32 image".to_string(),
        ));
    }

    let rows = src.rows();
    let cols = src.cols();
    let mut dst = Mat::new(rows, cols, 1, MatDepth::F32)?;

    for y in 0..rows {
        for x in 0..cols {
            let v = src.at_f32(y, x, 0)?;
            dst.set_f32(y, x, 0, if v >= min && v <= max { 1.0 } else { 0.0 })?;
        }
    }

    Ok(dst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantized_normals_zero_on_far_depth() {
        let mut src = Mat::new(32, 32, 1, MatDepth::U16).unwrap();
        for y in 0..32 {
            for x in 0..32 {
                src.set_u16(y, x, 0, 5000).unwrap();
            }
        }

        let dst = quantized_normals(&src, 500.0, 500.0, 2000, 20).unwrap();
        for y in 0..32 {
            for x in 0..32 {
                assert_eq!(dst.at(y, x).unwrap()[0], 0);
            }
        }
    }

    #[test]
    fn quantized_normals_flat_plane_nonzero() {
        let mut src = Mat::new(32, 32, 1, MatDepth::U16).unwrap();
        for y in 0..32 {
            for x in 0..32 {
                src.set_u16(y, x, 0, 1000).unwrap();
            }
        }

        let dst = quantized_normals(&src, 500.0, 500.0, 2000, 20).unwrap();
        let center = dst.at(16, 16).unwrap()[0];
        assert_ne!(center, 0);
        assert_eq!(center.count_ones(), 1);
    }

    #[test]
    fn threshold_min_max_band_pass() {
        let mut src = Mat::new(4, 4, 1, MatDepth::F32).unwrap();
        src.set_f32(0, 0, 0, 0.5).unwrap();
        src.set_f32(0, 1, 0, 5.0).unwrap();

        let dst = threshold_min_max(&src, 0.0, 1.0).unwrap();
        assert_eq!(dst.at_f32(0, 0, 0).unwrap(), 1.0);
        assert_eq!(dst.at_f32(0, 1, 0).unwrap(), 0.0);
    }
}
