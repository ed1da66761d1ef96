//! The sliding window unit shared by objectness, hashing, and matching.

use crate::core::types::Point;

/// One sliding-window position at a given pyramid level, carrying the
/// hash-verified candidate template ids it should be matched against.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub pyramid_level: usize,
    pub scale: f32,
    pub top_left: Point,
    pub width: i32,
    pub height: i32,
    pub candidates: Vec<(i32, usize)>,
}

impl Window {
    #[must_use]
    pub fn new(pyramid_level: usize, scale: f32, top_left: Point, width: i32, height: i32) -> Self {
        Self {
            pyramid_level,
            scale,
            top_left,
            width,
            height,
            candidates: Vec::new(),
        }
    }

    /// Map this window's top-left + size back to the original frame's pixel
    /// coordinates, undoing the pyramid level's scale factor.
    #[must_use]
    pub fn to_frame_rect(&self) -> crate::core::types::Rect {
        crate::core::types::Rect::new(
            (self.top_left.x as f32 / self.scale).round() as i32,
            (self.top_left.y as f32 / self.scale).round() as i32,
            (self.width as f32 / self.scale).round() as i32,
            (self.height as f32 / self.scale).round() as i32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_frame_rect_undoes_scale() {
        let window = Window::new(2, 0.5, Point::new(50, 60), 40, 40);
        let rect = window.to_frame_rect();
        assert_eq!(rect.x, 100);
        assert_eq!(rect.y, 120);
        assert_eq!(rect.width, 80);
        assert_eq!(rect.height, 80);
    }
}
