//! # tless-detect
//!
//! Detection and localization of rigid, texture-less 3D objects in
//! cluttered RGB-D scenes via a three-stage sliding-window cascade:
//! an objectness prefilter, hash-table candidate verification, and a
//! five-test template-matching cascade, backed by an `imgcodecs`/`imgproc`
//! foundation for image I/O and per-pixel kernels.
//!
//! ## Modules
//!
//! - **core**: Basic data structures (Mat, Point, Size, Rect, Scalar)
//! - **imgcodecs**: Reading and writing color (8-bit) and depth (16-bit) images
//! - **imgproc**: Color conversion, filtering, geometric transforms, quantization kernels
//! - **quantize**: The four quantization schemes feeding hashing and matching
//! - **detect**: Criteria, Scene, Template, Hasher, objectness, matcher, pyramid driver, NMS
//! - **dataset**: Template-set and scene loading from disk
//!
//! ## Example
//!
//! ```rust,no_run
//! use tless_detect::prelude::*;
//! use tless_detect::imgcodecs::imread;
//! use tless_detect::detect::{Criteria, Scene};
//!
//! # fn main() -> tless_detect::error::Result<()> {
//! let color = imread("scene_color.png")?;
//! let depth = imread("scene_depth.png")?;
//! let criteria = Criteria::default();
//! let scene = Scene::build(color, depth, &criteria)?;
//! # let _ = scene;
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod dataset;
pub mod detect;
pub mod error;
pub mod imgcodecs;
pub mod imgproc;
pub mod quantize;

pub mod prelude {
    //! Convenience module that re-exports commonly used items
    pub use crate::core::{Mat, MatDepth, Point, Point2f, Size, Rect, Scalar};
    pub use crate::core::types::{Point3f, ColorConversionCode, InterpolationFlag};
    pub use crate::detect::Criteria;
    pub use crate::error::{Error, Result};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;

    #[test]
    fn test_basic_workflow() {
        // Create a mat
        let mat = Mat::new(100, 100, 3, MatDepth::U8).unwrap();
        assert_eq!(mat.rows(), 100);
        assert_eq!(mat.cols(), 100);

        // Create geometric types
        let p = Point::new(10, 20);
        let s = Size::new(640, 480);
        let r = Rect::new(0, 0, 100, 100);

        assert!(r.contains(p));
        assert_eq!(s.area(), 640 * 480);
    }
}
