use crate::core::{Mat, MatDepth};
use crate::error::{Error, Result};
use image::{DynamicImage, GenericImageView, ImageBuffer, Rgb, Rgba, Luma};
use std::path::Path;

/// Read an image from file.
///
/// 16-bit single-channel PNGs (the depth-map format used throughout the
/// dataset loader) are preserved at `MatDepth::U16` rather than being
/// rescaled to 8 bits, since downstream range/normal estimation needs the
/// millimetre-precision values intact.
pub fn imread<P: AsRef<Path>>(path: P) -> Result<Mat> {
    let img = image::open(path)?;

    match img {
        DynamicImage::ImageRgb8(buffer) => {
            let (width, height) = buffer.dimensions();
            let data = buffer.into_raw();
            Mat::from_raw(data, height as usize, width as usize, 3, MatDepth::U8)
        }
        DynamicImage::ImageRgba8(buffer) => {
            let (width, height) = buffer.dimensions();
            let data = buffer.into_raw();
            Mat::from_raw(data, height as usize, width as usize, 4, MatDepth::U8)
        }
        DynamicImage::ImageLuma8(buffer) => {
            let (width, height) = buffer.dimensions();
            let data = buffer.into_raw();
            Mat::from_raw(data, height as usize, width as usize, 1, MatDepth::U8)
        }
        DynamicImage::ImageLuma16(buffer) => {
            let (width, height) = buffer.dimensions();
            let raw: Vec<u16> = buffer.into_raw();
            let mut bytes = Vec::with_capacity(raw.len() * 2);
            for v in raw {
                bytes.extend_from_slice(&v.to_le_bytes());
            }
            Mat::from_raw(bytes, height as usize, width as usize, 1, MatDepth::U16)
        }
        _ => {
            // Convert any other format to RGB8
            let rgb_img = img.to_rgb8();
            let (width, height) = rgb_img.dimensions();
            let data = rgb_img.into_raw();
            Mat::from_raw(data, height as usize, width as usize, 3, MatDepth::U8)
        }
    }
}

/// Write an image to file
pub fn imwrite<P: AsRef<Path>>(path: P, mat: &Mat) -> Result<()> {
    if mat.depth() == MatDepth::U16 {
        if mat.channels() != 1 {
            return Err(Error::UnsupportedOperation(
                "imwrite only supports single-channel U16 depth maps".to_string(),
            ));
        }

        let mut raw = Vec::with_capacity(mat.rows() * mat.cols());
        for chunk in mat.data().chunks_exact(2) {
            raw.push(u16::from_le_bytes([chunk[0], chunk[1]]));
        }

        let buffer = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(
            mat.cols() as u32,
            mat.rows() as u32,
            raw,
        )
        .ok_or_else(|| Error::InvalidDimensions("Failed to create 16-bit image buffer".to_string()))?;

        buffer.save(path)?;
        return Ok(());
    }

    if mat.depth() != MatDepth::U8 {
        return Err(Error::UnsupportedOperation(
            "imwrite only supports U8 or single-channel U16 depth".to_string(),
        ));
    }

    match mat.channels() {
        1 => {
            let buffer = ImageBuffer::<Luma<u8>, Vec<u8>>::from_raw(
                mat.cols() as u32,
                mat.rows() as u32,
                mat.data().to_vec(),
            )
            .ok_or_else(|| Error::InvalidDimensions("Failed to create image buffer".to_string()))?;

            buffer.save(path)?;
        }
        3 => {
            let buffer = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_raw(
                mat.cols() as u32,
                mat.rows() as u32,
                mat.data().to_vec(),
            )
            .ok_or_else(|| Error::InvalidDimensions("Failed to create image buffer".to_string()))?;

            buffer.save(path)?;
        }
        4 => {
            let buffer = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(
                mat.cols() as u32,
                mat.rows() as u32,
                mat.data().to_vec(),
            )
            .ok_or_else(|| Error::InvalidDimensions("Failed to create image buffer".to_string()))?;

            buffer.save(path)?;
        }
        _ => {
            return Err(Error::UnsupportedOperation(format!(
                "imwrite doesn't support {} channels",
                mat.channels()
            )));
        }
    }

    Ok(())
}

/// Read flags for imread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImreadFlag {
    Color,
    Grayscale,
    Unchanged,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Scalar;

    #[test]
    fn test_write_and_read() {
        let mat = Mat::new_with_default(100, 100, 3, MatDepth::U8, Scalar::from_rgb(255, 0, 0))
            .unwrap();

        let temp_path = "/tmp/test_opencv_rust.png";
        imwrite(temp_path, &mat).unwrap();

        let loaded = imread(temp_path).unwrap();
        assert_eq!(loaded.rows(), mat.rows());
        assert_eq!(loaded.cols(), mat.cols());
    }

    #[test]
    fn test_write_and_read_depth16() {
        let mut mat = Mat::new(64, 48, 1, MatDepth::U16).unwrap();
        for row in 0..mat.rows() {
            for col in 0..mat.cols() {
                mat.set_u16(row, col, 0, 1200).unwrap();
            }
        }

        let temp_path = "/tmp/test_tless_detect_depth16.png";
        imwrite(temp_path, &mat).unwrap();

        let loaded = imread(temp_path).unwrap();
        assert_eq!(loaded.rows(), mat.rows());
        assert_eq!(loaded.cols(), mat.cols());
        assert_eq!(loaded.depth(), MatDepth::U16);
        assert_eq!(loaded.at_u16(10, 10, 0).unwrap(), 1200);
    }
}
