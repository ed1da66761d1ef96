//! End-to-end cascade tests on small synthetic scenes (no real RGB-D dataset
//! is available at build time).

use tless_detect::core::types::{ColorConversionCode, Point, Rect};
use tless_detect::core::{Mat, MatDepth};
use tless_detect::detect::{
    detect, match_window, train_hash_tables, train_template, Criteria, Scene, Template, TemplateSource, Window,
};
use tless_detect::imgproc::{cvt_color, gradient_bin_at, normal_bin_at};

const SIZE: usize = 128;

/// A checkerboard color frame (8x8 blocks) over a flat depth plane.
fn checkerboard_frame(depth_mm: u16) -> (Mat, Mat) {
    let mut color = Mat::new(SIZE, SIZE, 3, MatDepth::U8).unwrap();
    for y in 0..SIZE {
        for x in 0..SIZE {
            let light = (x / 8 + y / 8) % 2 == 0;
            let value = if light { 180u8 } else { 70u8 };
            let pixel = color.at_mut(y, x).unwrap();
            pixel[0] = value;
            pixel[1] = value;
            pixel[2] = value;
        }
    }

    let mut depth = Mat::new(SIZE, SIZE, 1, MatDepth::U16).unwrap();
    for y in 0..SIZE {
        for x in 0..SIZE {
            depth.set_u16(y, x, 0, depth_mm).unwrap();
        }
    }

    (color, depth)
}

/// Derive grayscale/hsv/depth_f32 from `color`/`depth` the same way
/// `Scene::build` does, so a template cropped from the same frame sees
/// bit-identical per-pixel features at detection time.
fn derive_source(color: &Mat, depth: &Mat, id: i32, diameter_mm: f32) -> TemplateSource {
    let mut gray_u8 = Mat::new(color.rows(), color.cols(), 1, MatDepth::U8).unwrap();
    cvt_color(color, &mut gray_u8, ColorConversionCode::BgrToGray).unwrap();
    let grayscale = gray_u8.convert_to(MatDepth::F32).unwrap();

    let mut hsv = Mat::new(color.rows(), color.cols(), 3, MatDepth::U8).unwrap();
    cvt_color(color, &mut hsv, ColorConversionCode::BgrToHsv).unwrap();

    let mut depth_f32 = Mat::new(depth.rows(), depth.cols(), 1, MatDepth::F32).unwrap();
    for y in 0..depth.rows() {
        for x in 0..depth.cols() {
            let raw = depth.at_u16(y, x, 0).unwrap();
            depth_f32.set_f32(y, x, 0, f32::from(raw)).unwrap();
        }
    }

    TemplateSource {
        id,
        object_bb: Rect::new(0, 0, color.cols() as i32, color.rows() as i32),
        color: color.clone(),
        grayscale,
        hsv,
        depth: depth_f32,
        diameter_mm,
    }
}

fn single_level_criteria() -> Criteria {
    let mut criteria = Criteria::default();
    criteria.feature_point_count = 20;
    criteria.hash_table_count = 20;
    // A handful of random triplets will land a point on the bbox border
    // (grid coordinate 0 always maps to pixel 0, which both hashing paths
    // treat as invalid); a low ratio keeps the test robust to that without
    // weakening the five-test matcher cascade, which uses match_ratio instead.
    criteria.min_vote_ratio = 0.2;
    criteria.smallest_template_size = (SIZE as i32, SIZE as i32);
    criteria.min_edgels = 10;
    criteria.pyramid_initial_scale = 1.0;
    criteria.pyramid_factor = 1.0;
    criteria.pyramid_levels = 1;
    criteria
}

#[test]
fn single_template_full_frame_detection_matches_ground_truth() {
    let (color, depth) = checkerboard_frame(1500);
    let criteria = single_level_criteria();

    let source = derive_source(&color, &depth, 2000, 300.0);
    let template = train_template(source, &criteria).expect("template training should succeed");

    let templates = vec![template];
    let tables = train_hash_tables(&templates, &criteria);

    let detections =
        detect(&color, &depth, &templates, &tables, &criteria).expect("detection should not error");

    assert_eq!(detections.len(), 1, "expected exactly one surviving detection");
    let d = &detections[0];
    assert_eq!(d.template_id, 2000);
    assert!((d.bbox.x).abs() <= 2);
    assert!((d.bbox.y).abs() <= 2);
    assert!((d.bbox.width - SIZE as i32).abs() <= 2);
    assert!((d.bbox.height - SIZE as i32).abs() <= 2);
    assert!(d.score > 0.7, "score {} should exceed 0.7", d.score);
}

/// A window whose stable points split across a depth step: most of them see
/// the same depth as the window's own median, a minority sit on the other
/// side of the step. The offset is chosen between 10% and 100% of
/// `diameter_mm`, so the per-point depth test (`|scene_depth - median| <
/// k * diameter_mm`) hinges entirely on the constant `k`: at the reference's
/// `k = 1.0` every point still passes; at a stricter `k = 0.1` the minority
/// fails and drags the vote below the cascade threshold.
#[test]
fn non_uniform_depth_inside_window_still_passes_under_reference_depth_tolerance() {
    let (color, mut depth) = checkerboard_frame(1500);
    for y in 0..SIZE {
        for x in 0..64 {
            depth.set_u16(y, x, 0, 1600).unwrap();
        }
    }

    let criteria = single_level_criteria();
    let scene = Scene::build(color, depth, &criteria).expect("scene should build");

    // 9 points on the unperturbed (1500mm) side, 11 on the shifted (1600mm)
    // side: the shifted majority sets the window's own median to 1600, so
    // the unperturbed minority is the one sitting `100mm` away from it.
    let background: [(i32, i32); 9] =
        [(70, 10), (80, 20), (90, 30), (100, 40), (110, 50), (120, 60), (75, 70), (85, 80), (95, 90)];
    let shifted: [(i32, i32); 11] = [
        (4, 10),
        (10, 20),
        (16, 30),
        (22, 40),
        (28, 50),
        (34, 60),
        (40, 70),
        (46, 80),
        (52, 90),
        (58, 100),
        (6, 110),
    ];

    let points: Vec<Point> = background
        .iter()
        .chain(shifted.iter())
        .map(|&(x, y)| Point::new(x, y))
        .collect();

    let normal_bins: Vec<u8> = points
        .iter()
        .map(|p| {
            normal_bin_at(&scene.depth_f32, p.x, p.y)
                .expect("normal lookup should not error")
                .expect("point should have a valid interior normal")
        })
        .collect();
    let gradient_bins: Vec<u8> = points
        .iter()
        .map(|p| {
            gradient_bin_at(&scene.grayscale, p.x, p.y)
                .expect("gradient lookup should not error")
                .expect("point should have a valid interior gradient")
        })
        .collect();
    let colors: Vec<(u8, u8, u8)> = points
        .iter()
        .map(|p| {
            let pixel = scene.hsv.at(p.y as usize, p.x as usize).unwrap();
            (pixel[0], pixel[1], pixel[2])
        })
        .collect();
    let depths: Vec<f32> = points
        .iter()
        .map(|p| scene.depth_f32.at_f32(p.y as usize, p.x as usize, 0).unwrap())
        .collect();

    let template = Template {
        id: 7000,
        object_bb: Rect::new(0, 0, SIZE as i32, SIZE as i32),
        color: scene.color.clone(),
        grayscale: scene.grayscale.clone(),
        hsv: scene.hsv.clone(),
        depth: scene.depth_f32.clone(),
        edge_points: points.clone(),
        stable_points: points,
        gradient_bins,
        normal_bins,
        depths,
        colors,
        depth_median: 1600.0,
        diameter_mm: 300.0,
    };

    let window = Window::new(0, 1.0, Point::new(0, 0), SIZE as i32, SIZE as i32);

    let result = match_window(&window, &template, &scene, &criteria);
    assert!(
        result.is_some(),
        "a window whose minority of points sit 100mm (33% of a 300mm diameter) from the median should still pass \
         the depth test at k=1.0"
    );
}

#[test]
fn scene_entirely_beyond_max_distance_yields_no_detections() {
    let (color, depth) = checkerboard_frame(1500);
    let mut criteria = single_level_criteria();
    criteria.normal_max_distance = 1000;

    let source = derive_source(&color, &depth, 3000, 300.0);
    let template = train_template(source, &criteria).expect("template training should succeed");
    let templates = vec![template];
    let tables = train_hash_tables(&templates, &criteria);

    let (far_color, far_depth) = checkerboard_frame(5000);
    let detections = detect(&far_color, &far_depth, &templates, &tables, &criteria)
        .expect("detection on an out-of-range scene should not error");

    assert!(detections.is_empty());
}
