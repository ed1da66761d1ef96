//! Greedy IoU-based non-maximum suppression (§4.8).

use crate::core::types::Rect;
use crate::detect::matcher::Detection;

fn iou(a: &Rect, b: &Rect) -> f32 {
    let x1 = a.x.max(b.x);
    let y1 = a.y.max(b.y);
    let x2 = (a.x + a.width).min(b.x + b.width);
    let y2 = (a.y + a.height).min(b.y + b.height);

    let inter_w = (x2 - x1).max(0);
    let inter_h = (y2 - y1).max(0);
    let inter = (inter_w * inter_h) as f32;
    if inter == 0.0 {
        return 0.0;
    }

    let union = (a.area() + b.area()) as f32 - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

/// Sort `detections` by score descending, then greedily drop any later
/// detection whose bbox IoU with an already-kept one exceeds `overlap_factor`.
#[must_use]
pub fn non_max_suppression(mut detections: Vec<Detection>, overlap_factor: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    let mut kept: Vec<Detection> = Vec::new();
    for candidate in detections {
        let suppressed = kept.iter().any(|k| iou(&k.bbox, &candidate.bbox) > overlap_factor);
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(id: i32, x: i32, y: i32, w: i32, h: i32, score: f32) -> Detection {
        Detection {
            template_id: id,
            bbox: Rect::new(x, y, w, h),
            score,
        }
    }

    #[test]
    fn overlapping_lower_score_is_suppressed() {
        let detections = vec![det(1, 0, 0, 10, 10, 0.9), det(2, 1, 1, 10, 10, 0.5)];
        let kept = non_max_suppression(detections, 0.3);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].template_id, 1);
    }

    #[test]
    fn non_overlapping_detections_are_both_kept() {
        let detections = vec![det(1, 0, 0, 10, 10, 0.9), det(2, 100, 100, 10, 10, 0.5)];
        let kept = non_max_suppression(detections, 0.3);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn output_is_sorted_descending_by_score() {
        let detections = vec![det(1, 0, 0, 10, 10, 0.2), det(2, 200, 200, 10, 10, 0.9)];
        let kept = non_max_suppression(detections, 0.3);
        assert_eq!(kept[0].template_id, 2);
        assert_eq!(kept[1].template_id, 1);
    }
}
