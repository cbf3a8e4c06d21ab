//! Geometric primitives in PDF user space.
//!
//! PDF places the origin at the lower-left corner of the page with y growing
//! upwards, so rectangles are stored as lower-left / upper-right corners
//! (`llx`, `lly`, `urx`, `ury`) exactly as they appear in a `/Rect` array.

/// A 2D point in user space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// X coordinate
    pub x: f32,
    /// Y coordinate
    pub y: f32,
}

impl Point {
    /// Create a new point.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_signet::geometry::Point;
    ///
    /// let point = Point::new(10.0, 20.0);
    /// assert_eq!(point.x, 10.0);
    /// assert_eq!(point.y, 20.0);
    /// ```
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A rectangle given by its lower-left and upper-right corners.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Lower-left x
    pub llx: f32,
    /// Lower-left y
    pub lly: f32,
    /// Upper-right x
    pub urx: f32,
    /// Upper-right y
    pub ury: f32,
}

impl Rect {
    /// Create a rectangle from its corner coordinates.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_signet::geometry::Rect;
    ///
    /// let rect = Rect::new(50.0, 50.0, 250.0, 130.0);
    /// assert_eq!(rect.width(), 200.0);
    /// assert_eq!(rect.height(), 80.0);
    /// ```
    pub fn new(llx: f32, lly: f32, urx: f32, ury: f32) -> Self {
        Self { llx, lly, urx, ury }
    }

    /// The degenerate `[0 0 0 0]` rectangle used by hidden widgets.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Create a rectangle from its lower-left corner and size.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_signet::geometry::Rect;
    ///
    /// let rect = Rect::from_origin_size(10.0, 20.0, 100.0, 50.0);
    /// assert_eq!(rect.urx, 110.0);
    /// assert_eq!(rect.ury, 70.0);
    /// ```
    pub fn from_origin_size(llx: f32, lly: f32, width: f32, height: f32) -> Self {
        Self::new(llx, lly, llx + width, lly + height)
    }

    /// Width of the rectangle.
    pub fn width(&self) -> f32 {
        self.urx - self.llx
    }

    /// Height of the rectangle.
    pub fn height(&self) -> f32 {
        self.ury - self.lly
    }

    /// Check whether the rectangle has no area.
    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Corner coordinates in `/Rect` order.
    pub fn to_array(&self) -> [f32; 4] {
        [self.llx, self.lly, self.urx, self.ury]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_rect_is_empty() {
        let rect = Rect::zero();
        assert!(rect.is_empty());
        assert_eq!(rect.to_array(), [0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_from_origin_size() {
        let rect = Rect::from_origin_size(50.0, 50.0, 200.0, 80.0);
        assert_eq!(rect.to_array(), [50.0, 50.0, 250.0, 130.0]);
        assert!(!rect.is_empty());
    }
}
