//! Five-test scoring cascade run per (window, candidate template) pair (§4.6).

use crate::core::types::Rect;
use crate::detect::criteria::Criteria;
use crate::detect::scene::Scene;
use crate::detect::template::Template;
use crate::detect::window::Window;

/// A surviving, scored detection in original-frame coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub template_id: i32,
    pub bbox: Rect,
    pub score: f32,
}

/// Map a template-local point, sampled at its own scale, onto the window's
/// scene-pixel footprint.
fn map_point(
    p: crate::core::types::Point,
    template_size: (i32, i32),
    window: &Window,
) -> crate::core::types::Point {
    let (tw, th) = template_size;
    let x = window.top_left.x + (p.x * window.width) / tw.max(1);
    let y = window.top_left.y + (p.y * window.height) / th.max(1);
    crate::core::types::Point::new(x, y)
}

fn search_neighborhood<F>(center: crate::core::types::Point, offset: (i32, i32), mut pred: F) -> bool
where
    F: FnMut(crate::core::types::Point) -> bool,
{
    let (ox, oy) = offset;
    for dy in -oy..=oy {
        for dx in -ox..=ox {
            let p = crate::core::types::Point::new(center.x + dx, center.y + dy);
            if pred(p) {
                return true;
            }
        }
    }
    false
}

/// Test 1: expected template footprint at the window's scale must match the
/// window size within one objectness step.
fn test_object_size(template: &Template, window: &Window, criteria: &Criteria) -> bool {
    let (wt, _ht) = criteria.smallest_template_size;
    let tolerance = (wt / 4).max(1);
    (template.object_bb.width - window.width).abs() <= tolerance
        && (template.object_bb.height - window.height).abs() <= tolerance
}

fn test_surface_normals(template: &Template, window: &Window, scene: &Scene, criteria: &Criteria) -> usize {
    let size = (template.object_bb.width, template.object_bb.height);
    template
        .stable_points
        .iter()
        .zip(&template.normal_bins)
        .filter(|(p, &bin)| {
            let center = map_point(**p, size, window);
            search_neighborhood(center, criteria.neighborhood_offset, |q| {
                crate::imgproc::normal_bin_at(&scene.depth_f32, q.x, q.y)
                    .ok()
                    .flatten()
                    == Some(bin)
            })
        })
        .count()
}

fn test_gradient_orientation(template: &Template, window: &Window, scene: &Scene, criteria: &Criteria) -> usize {
    let size = (template.object_bb.width, template.object_bb.height);
    template
        .edge_points
        .iter()
        .zip(&template.gradient_bins)
        .filter(|(p, &bin)| {
            let center = map_point(**p, size, window);
            search_neighborhood(center, criteria.neighborhood_offset, |q| {
                crate::imgproc::gradient_bin_at(&scene.grayscale, q.x, q.y).ok().flatten() == Some(bin)
            })
        })
        .count()
}

fn window_median_depth(template: &Template, window: &Window, scene: &Scene) -> f32 {
    let size = (template.object_bb.width, template.object_bb.height);
    let mut depths: Vec<i64> = template
        .stable_points
        .iter()
        .filter_map(|p| {
            let center = map_point(*p, size, window);
            if center.x < 0 || center.y < 0 || center.x as usize >= scene.cols() || center.y as usize >= scene.rows() {
                return None;
            }
            let v = scene.depth_f32.at_f32(center.y as usize, center.x as usize, 0).ok()?;
            if v > 0.0 {
                Some(v as i64)
            } else {
                None
            }
        })
        .collect();
    if depths.is_empty() {
        return 0.0;
    }
    depths.sort_unstable();
    depths[depths.len() / 2] as f32
}

fn test_depth(template: &Template, window: &Window, scene: &Scene) -> usize {
    let size = (template.object_bb.width, template.object_bb.height);
    let median = window_median_depth(template, window, scene);
    let threshold = template.diameter_mm;
    template
        .stable_points
        .iter()
        .filter(|p| {
            let center = map_point(**p, size, window);
            if center.x < 0 || center.y < 0 || center.x as usize >= scene.cols() || center.y as usize >= scene.rows() {
                return false;
            }
            scene
                .depth_f32
                .at_f32(center.y as usize, center.x as usize, 0)
                .map(|d| (d - median).abs() < threshold)
                .unwrap_or(false)
        })
        .count()
}

fn test_color(template: &Template, window: &Window, scene: &Scene, criteria: &Criteria) -> usize {
    let size = (template.object_bb.width, template.object_bb.height);
    let (th, ts, tv) = criteria.color_tolerance;
    template
        .stable_points
        .iter()
        .zip(&template.colors)
        .filter(|(p, &(h, s, v))| {
            let center = map_point(**p, size, window);
            if center.x < 0 || center.y < 0 || center.x as usize >= scene.cols() || center.y as usize >= scene.rows() {
                return false;
            }
            scene
                .hsv
                .at(center.y as usize, center.x as usize)
                .map(|pixel| {
                    pixel[0].abs_diff(h) <= th && pixel[1].abs_diff(s) <= ts && pixel[2].abs_diff(v) <= tv
                })
                .unwrap_or(false)
        })
        .count()
}

/// Run the five-test cascade for one (window, candidate template) pair.
/// Returns `None` as soon as a test falls below `criteria.cascade_threshold()`.
#[must_use]
pub fn match_window(window: &Window, template: &Template, scene: &Scene, criteria: &Criteria) -> Option<Detection> {
    if !test_object_size(template, window, criteria) {
        return None;
    }

    let threshold = criteria.cascade_threshold();
    let n = template.stable_points.len().max(template.edge_points.len()).max(1) as f32;

    let normal_score = test_surface_normals(template, window, scene, criteria);
    if normal_score < threshold {
        return None;
    }

    let gradient_score = test_gradient_orientation(template, window, scene, criteria);
    if gradient_score < threshold {
        return None;
    }

    let depth_score = test_depth(template, window, scene);
    if depth_score < threshold {
        return None;
    }

    let color_score = test_color(template, window, scene, criteria);
    if color_score < threshold {
        return None;
    }

    let w = criteria.cascade_weights;
    let score = w[0] * (normal_score as f32 / n)
        + w[1] * (gradient_score as f32 / n)
        + w[2] * (depth_score as f32 / n)
        + w[3] * (color_score as f32 / n);

    let bbox = Rect::new(window.top_left.x, window.top_left.y, window.width, window.height);
    let frame_bbox = Rect::new(
        (bbox.x as f32 / window.scale).round() as i32,
        (bbox.y as f32 / window.scale).round() as i32,
        (bbox.width as f32 / window.scale).round() as i32,
        (bbox.height as f32 / window.scale).round() as i32,
    );

    Some(Detection {
        template_id: template.id,
        bbox: frame_bbox,
        score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Point, Scalar};
    use crate::core::{Mat, MatDepth};

    fn trivial_template() -> Template {
        Template {
            id: 42,
            object_bb: Rect::new(0, 0, 32, 32),
            color: Mat::new(32, 32, 3, MatDepth::U8).unwrap(),
            grayscale: Mat::new(32, 32, 1, MatDepth::F32).unwrap(),
            hsv: Mat::new(32, 32, 3, MatDepth::U8).unwrap(),
            depth: Mat::new(32, 32, 1, MatDepth::F32).unwrap(),
            edge_points: vec![Point::new(16, 16)],
            stable_points: vec![Point::new(16, 16)],
            gradient_bins: vec![0],
            normal_bins: vec![0],
            depths: vec![1000.0],
            colors: vec![(10, 100, 200)],
            depth_median: 1000.0,
            diameter_mm: 100.0,
        }
    }

    fn flat_scene() -> Scene {
        let color = Mat::new_with_default(64, 64, 3, MatDepth::U8, Scalar::all(128.0)).unwrap();
        let mut depth = Mat::new(64, 64, 1, MatDepth::U16).unwrap();
        for y in 0..64 {
            for x in 0..64 {
                depth.set_u16(y, x, 0, 1000).unwrap();
            }
        }
        let criteria = Criteria::default();
        Scene::build(color, depth, &criteria).unwrap()
    }

    #[test]
    fn size_mismatch_is_rejected() {
        let template = trivial_template();
        let scene = flat_scene();
        let mut criteria = Criteria::default();
        criteria.smallest_template_size = (32, 32);
        let window = Window::new(0, 1.0, Point::new(0, 0), 8, 8);
        assert!(match_window(&window, &template, &scene, &criteria).is_none());
    }
}
