//! Loads templates and scenes from a small on-disk convention: a color PNG,
//! a 16-bit depth PNG, and (for templates) a `bbox.json` sidecar describing
//! the object's bounding box and physical diameter. The external collaborator
//! called out in the overview — the only place permitted to surface
//! [`Error::IoFailure`].

use crate::core::types::Rect;
use crate::detect::criteria::Criteria;
use crate::detect::template::{train_template, Template, TemplateSource};
use crate::error::{Error, Result};
use crate::imgcodecs::imread;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// `bbox.json` sidecar contents: the object's bounding box within the
/// template's color/depth images, plus its physical diameter in mm.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BoundingBoxSidecar {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    diameter_mm: f32,
}

/// Read one template directory: `color.png`, `depth.png`, `bbox.json`.
fn load_template_source(dir: &Path, id: i32) -> Result<TemplateSource> {
    let color = imread(dir.join("color.png").to_string_lossy().as_ref())?;
    let depth_u16 = imread(dir.join("depth.png").to_string_lossy().as_ref())?;

    let bbox_json = std::fs::read_to_string(dir.join("bbox.json"))
        .map_err(|e| Error::IoFailure(format!("reading {}/bbox.json: {e}", dir.display())))?;
    let sidecar: BoundingBoxSidecar = serde_json::from_str(&bbox_json)?;

    let mut hsv = crate::core::Mat::new(color.rows(), color.cols(), 3, crate::core::MatDepth::U8)?;
    crate::imgproc::cvt_color(&color, &mut hsv, crate::core::types::ColorConversionCode::BgrToHsv)?;

    let mut depth = crate::core::Mat::new(depth_u16.rows(), depth_u16.cols(), 1, crate::core::MatDepth::F32)?;
    for y in 0..depth_u16.rows() {
        for x in 0..depth_u16.cols() {
            let raw = depth_u16.at_u16(y, x, 0)?;
            depth.set_f32(y, x, 0, f32::from(raw))?;
        }
    }

    let mut grayscale = crate::core::Mat::new(color.rows(), color.cols(), 1, crate::core::MatDepth::U8)?;
    crate::imgproc::cvt_color(&color, &mut grayscale, crate::core::types::ColorConversionCode::BgrToGray)?;
    let grayscale = grayscale.convert_to(crate::core::MatDepth::F32)?;

    Ok(TemplateSource {
        id,
        object_bb: Rect::new(sidecar.x, sidecar.y, sidecar.width, sidecar.height),
        color,
        grayscale,
        hsv,
        depth,
        diameter_mm: sidecar.diameter_mm,
    })
}

/// Parse a template list file (one template directory per line, matching
/// the original `TemplateParser` idiom) and train every listed template.
///
/// Lines are assigned consecutive indices starting at 0 (matching the
/// reference `Classifier::train`'s `indices` parameter); when `indices` is
/// non-empty, only lines whose index appears in it are loaded and trained —
/// this selects which per-object pose subset gets trained, the same filter
/// the reference forwards into `TemplateParser::parseObject`. An empty
/// `indices` trains every line, matching the grammar's optional trailing
/// `[indices...]`. Blank lines and lines starting with `#` are skipped and
/// do not consume an index. Templates that fail training (too few
/// edge/stable candidates) are reported, not silently dropped.
pub fn load_and_train_templates(
    list_path: &Path,
    criteria: &Criteria,
    indices: &[usize],
) -> Result<Vec<Template>> {
    let list = std::fs::read_to_string(list_path)
        .map_err(|e| Error::IoFailure(format!("reading template list {}: {e}", list_path.display())))?;

    let base = list_path.parent().unwrap_or_else(|| Path::new("."));

    let mut templates = Vec::new();
    let mut index = 0usize;
    let mut next_id = 0i32;
    for line in list.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if !indices.is_empty() && !indices.contains(&index) {
            index += 1;
            continue;
        }
        index += 1;

        let dir: PathBuf = if Path::new(line).is_absolute() {
            PathBuf::from(line)
        } else {
            base.join(line)
        };

        let source = load_template_source(&dir, next_id)?;
        let template = train_template(source, criteria)?;
        templates.push(template);
        next_id += 1;
    }

    Ok(templates)
}

/// Load one scene: `<scene_dir>/rgb/<frame>.png` and `<scene_dir>/depth/<frame>.png`.
pub fn load_scene_frame(scene_dir: &Path, frame: &str) -> Result<(crate::core::Mat, crate::core::Mat)> {
    let color_path = scene_dir.join("rgb").join(format!("{frame}.png"));
    let depth_path = scene_dir.join("depth").join(format!("{frame}.png"));

    let color = imread(color_path.to_string_lossy().as_ref())?;
    let depth = imread(depth_path.to_string_lossy().as_ref())?;

    if depth.depth() != crate::core::MatDepth::U16 {
        return Err(Error::IoFailure(format!(
            "{} is not a 16-bit depth PNG",
            depth_path.display()
        )));
    }

    Ok((color, depth))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_template_list_surfaces_io_failure() {
        let err = load_and_train_templates(Path::new("/nonexistent/list.txt"), &Criteria::default(), &[])
            .unwrap_err();
        assert!(matches!(err, Error::IoFailure(_)));
    }

    #[test]
    fn missing_scene_surfaces_io_failure() {
        let err = load_scene_frame(Path::new("/nonexistent/scene"), "0000").unwrap_err();
        assert!(matches!(err, Error::IoFailure(_) | Error::ImageError(_) | Error::Io(_)));
    }
}
