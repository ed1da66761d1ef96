//! The objectness prefilter: sliding-window edgel-density screen over the
//! quantized normal map (§4.3).

use crate::core::types::Point;
use crate::detect::criteria::Criteria;
use crate::detect::scene::Scene;
use crate::detect::window::Window;

/// Slide a `(wT, hT)` window with step `(wT/4, hT/4)` over `scene`'s
/// quantized normal map, keeping every position with at least
/// `criteria.min_edgels` non-zero pixels.
///
/// Terminates immediately, returning no windows, if the normal map is
/// entirely zero.
#[must_use]
pub fn objectness_windows(
    scene: &Scene,
    pyramid_level: usize,
    scale: f32,
    criteria: &Criteria,
) -> Vec<Window> {
    let (wt, ht) = criteria.smallest_template_size;
    if wt <= 0 || ht <= 0 {
        return Vec::new();
    }

    let rows = scene.rows() as i32;
    let cols = scene.cols() as i32;
    if rows < ht || cols < wt {
        return Vec::new();
    }

    let normals = &scene.quantized_normals;
    let any_nonzero = (0..rows as usize)
        .flat_map(|y| (0..cols as usize).map(move |x| (y, x)))
        .any(|(y, x)| normals.at(y, x).map(|p| p[0] != 0).unwrap_or(false));
    if !any_nonzero {
        return Vec::new();
    }

    let step_x = (wt / 4).max(1);
    let step_y = (ht / 4).max(1);

    let mut windows = Vec::new();
    let mut y = 0;
    while y + ht <= rows {
        let mut x = 0;
        while x + wt <= cols {
            let mut count = 0usize;
            'scan: for row in y..y + ht {
                for col in x..x + wt {
                    if normals
                        .at(row as usize, col as usize)
                        .map(|p| p[0] != 0)
                        .unwrap_or(false)
                    {
                        count += 1;
                        if count >= criteria.min_edgels {
                            break 'scan;
                        }
                    }
                }
            }

            if count >= criteria.min_edgels {
                windows.push(Window::new(
                    pyramid_level,
                    scale,
                    Point::new(x, y),
                    wt,
                    ht,
                ));
            }

            x += step_x;
        }
        y += step_y;
    }

    windows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Mat, MatDepth};
    use crate::core::types::Scalar;

    fn scene_with_edges() -> Scene {
        let color = Mat::new_with_default(64, 64, 3, MatDepth::U8, Scalar::all(128.0)).unwrap();
        let mut depth = Mat::new(64, 64, 1, MatDepth::U16).unwrap();
        for y in 0..64 {
            for x in 0..64 {
                let v = if x < 32 { 800 } else { 1200 };
                depth.set_u16(y, x, 0, v).unwrap();
            }
        }
        let criteria = Criteria::default();
        Scene::build(color, depth, &criteria).unwrap()
    }

    #[test]
    fn empty_normal_map_yields_no_windows() {
        let color = Mat::new_with_default(32, 32, 3, MatDepth::U8, Scalar::all(128.0)).unwrap();
        let mut depth = Mat::new(32, 32, 1, MatDepth::U16).unwrap();
        for y in 0..32 {
            for x in 0..32 {
                depth.set_u16(y, x, 0, 1000).unwrap();
            }
        }
        let mut criteria = Criteria::default();
        criteria.smallest_template_size = (8, 8);
        criteria.min_edgels = 1;
        let scene = Scene::build(color, depth, &criteria).unwrap();
        let windows = objectness_windows(&scene, 0, 1.0, &criteria);
        assert!(windows.is_empty());
    }

    #[test]
    fn step_boundary_windows_near_edge_are_found() {
        let scene = scene_with_edges();
        let mut criteria = Criteria::default();
        criteria.smallest_template_size = (16, 16);
        criteria.min_edgels = 5;
        let windows = objectness_windows(&scene, 0, 1.0, &criteria);
        assert!(!windows.is_empty());
        assert!(windows.iter().any(|w| w.top_left.x >= 24 && w.top_left.x <= 40));
    }
}
