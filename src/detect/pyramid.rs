//! Per-frame pyramid driver: rescale, prefilter, verify, match, repeat (§4.7).

use crate::core::types::{InterpolationFlag, Size};
use crate::core::{Mat, MatDepth};
use crate::detect::criteria::Criteria;
use crate::detect::hasher::{verify_window, HashTable};
use crate::detect::matcher::{match_window, Detection};
use crate::detect::nms::non_max_suppression;
use crate::detect::objectness::objectness_windows;
use crate::detect::scene::Scene;
use crate::detect::template::Template;
use crate::error::Result;
use crate::imgproc::resize;
use std::collections::HashMap;

/// Nearest-neighbor resize of a single-channel U16 depth map. `resize`
/// proper only supports U8, so depth is rescaled by hand here.
fn resize_depth_u16(src: &Mat, new_rows: usize, new_cols: usize) -> Result<Mat> {
    let mut dst = Mat::new(new_rows, new_cols, 1, MatDepth::U16)?;
    let x_ratio = src.cols() as f32 / new_cols as f32;
    let y_ratio = src.rows() as f32 / new_rows as f32;

    for row in 0..new_rows {
        for col in 0..new_cols {
            let src_row = ((row as f32 * y_ratio) as usize).min(src.rows() - 1);
            let src_col = ((col as f32 * x_ratio) as usize).min(src.cols() - 1);
            let value = src.at_u16(src_row, src_col, 0)?;
            dst.set_u16(row, col, 0, value)?;
        }
    }

    Ok(dst)
}

/// Run the full cascade over one frame: for each of `criteria.pyramid_levels`
/// scales, rescale the scene, run objectness, verify candidates against
/// `tables`, score survivors against `templates`, and accumulate matches in
/// original-frame coordinates. Finishes with NMS at `criteria.overlap_factor`.
pub fn detect(
    color: &Mat,
    depth: &Mat,
    templates: &[Template],
    tables: &[HashTable],
    criteria: &Criteria,
) -> Result<Vec<Detection>> {
    let templates_by_id: HashMap<i32, &Template> =
        templates.iter().map(|t| (t.id, t)).collect();

    let mut scale = criteria.pyramid_initial_scale;
    let mut all_matches = Vec::new();

    let base_rows = color.rows();
    let base_cols = color.cols();

    for level in 0..criteria.pyramid_levels {
        let new_rows = ((base_rows as f32) * scale).round().max(1.0) as usize;
        let new_cols = ((base_cols as f32) * scale).round().max(1.0) as usize;

        if new_rows < 2 || new_cols < 2 {
            scale *= criteria.pyramid_factor;
            continue;
        }

        let mut scaled_color = Mat::new(1, 1, 3, MatDepth::U8)?;
        resize(
            color,
            &mut scaled_color,
            Size::new(new_cols as i32, new_rows as i32),
            InterpolationFlag::Nearest,
        )?;
        let scaled_depth = resize_depth_u16(depth, new_rows, new_cols)?;

        let scene = match Scene::build(scaled_color, scaled_depth, criteria) {
            Ok(scene) => scene,
            Err(_) => {
                scale *= criteria.pyramid_factor;
                continue;
            }
        };

        let windows = objectness_windows(&scene, level, scale, criteria);

        for mut window in windows {
            window.candidates = verify_window(
                &scene,
                tables,
                window.top_left,
                (window.width, window.height),
                criteria,
            );

            for (template_id, _votes) in &window.candidates {
                if let Some(&template) = templates_by_id.get(template_id) {
                    if let Some(detection) = match_window(&window, template, &scene, criteria) {
                        all_matches.push(detection);
                    }
                }
            }
        }

        scale *= criteria.pyramid_factor;
    }

    Ok(non_max_suppression(all_matches, criteria.overlap_factor))
}
