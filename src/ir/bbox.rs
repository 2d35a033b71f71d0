//! Axis-aligned rectangle geometry in XYXY form.
//!
//! [`BBoxXYXY`] is the working representation for every geometric label
//! operation (corner mapping, enclosing rectangles, clamping, normalization).
//! The public annotation type, [`BoundingBox`](super::BoundingBox), keeps the
//! `x, y, width, height` shape that labeling tools produce and converts to
//! this type when geometry is needed.

use super::coord::{Coord, Normalized, Pixel};

/// An axis-aligned bounding box in XYXY format (xmin, ymin, xmax, ymax).
///
/// Construction does not enforce `min <= max`; [`BBoxXYXY::is_degenerate`]
/// reports boxes without positive area.
#[derive(Clone, Copy, PartialEq)]
pub struct BBoxXYXY<TSpace> {
    pub min: Coord<TSpace>,
    pub max: Coord<TSpace>,
}

impl<TSpace> BBoxXYXY<TSpace> {
    /// Creates a new bounding box from min and max coordinates.
    #[inline]
    pub fn new(min: Coord<TSpace>, max: Coord<TSpace>) -> Self {
        Self { min, max }
    }

    /// Creates a new bounding box from explicit coordinates.
    #[inline]
    pub fn from_xyxy(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            min: Coord::new(xmin, ymin),
            max: Coord::new(xmax, ymax),
        }
    }

    /// Converts from XYWH format where (x, y) is the top-left corner.
    #[inline]
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::from_xyxy(x, y, x + width, y + height)
    }

    /// Converts to XYWH format (x, y, width, height).
    #[inline]
    pub fn to_xywh(&self) -> (f64, f64, f64, f64) {
        (self.xmin(), self.ymin(), self.width(), self.height())
    }

    #[inline]
    pub fn xmin(&self) -> f64 {
        self.min.x
    }

    #[inline]
    pub fn ymin(&self) -> f64 {
        self.min.y
    }

    #[inline]
    pub fn xmax(&self) -> f64 {
        self.max.x
    }

    #[inline]
    pub fn ymax(&self) -> f64 {
        self.max.y
    }

    /// Returns the width of the bounding box (negative if malformed).
    #[inline]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Returns the height of the bounding box (negative if malformed).
    #[inline]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Returns true if all coordinates are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    /// Returns true when the box has no positive area or is not finite.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        !self.is_finite() || self.width() <= 0.0 || self.height() <= 0.0
    }

    /// The four corners, clockwise from top-left.
    pub fn corners(&self) -> [Coord<TSpace>; 4] {
        [
            Coord::new(self.min.x, self.min.y),
            Coord::new(self.max.x, self.min.y),
            Coord::new(self.max.x, self.max.y),
            Coord::new(self.min.x, self.max.y),
        ]
    }

    /// Smallest axis-aligned box containing every point.
    ///
    /// Returns `None` for an empty iterator.
    pub fn enclosing<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Coord<TSpace>>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (mut xmin, mut ymin, mut xmax, mut ymax) = (first.x, first.y, first.x, first.y);
        for p in iter {
            xmin = xmin.min(p.x);
            ymin = ymin.min(p.y);
            xmax = xmax.max(p.x);
            ymax = ymax.max(p.y);
        }
        Some(Self::from_xyxy(xmin, ymin, xmax, ymax))
    }
}

impl BBoxXYXY<Pixel> {
    /// Clamps both corners into the image rectangle.
    pub fn clamp_to(&self, image_width: f64, image_height: f64) -> Self {
        Self::new(
            self.min.clamp_to(image_width, image_height),
            self.max.clamp_to(image_width, image_height),
        )
    }

    /// Converts pixel coordinates to normalized coordinates.
    pub fn to_normalized(&self, image_width: f64, image_height: f64) -> BBoxXYXY<Normalized> {
        BBoxXYXY::from_xyxy(
            self.min.x / image_width,
            self.min.y / image_height,
            self.max.x / image_width,
            self.max.y / image_height,
        )
    }
}

impl BBoxXYXY<Normalized> {
    /// Converts normalized coordinates to pixel coordinates.
    pub fn to_pixel(&self, image_width: f64, image_height: f64) -> BBoxXYXY<Pixel> {
        BBoxXYXY::from_xyxy(
            self.min.x * image_width,
            self.min.y * image_height,
            self.max.x * image_width,
            self.max.y * image_height,
        )
    }

    /// Center-based form used by YOLO label files: (cx, cy, w, h).
    pub fn to_cxcywh(&self) -> (f64, f64, f64, f64) {
        let w = self.width();
        let h = self.height();
        (self.min.x + w / 2.0, self.min.y + h / 2.0, w, h)
    }

    /// Inverse of [`BBoxXYXY::to_cxcywh`].
    pub fn from_cxcywh(cx: f64, cy: f64, w: f64, h: f64) -> Self {
        Self::from_xyxy(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
    }
}

impl<TSpace> std::fmt::Debug for BBoxXYXY<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BBoxXYXY")
            .field("xmin", &self.min.x)
            .field("ymin", &self.min.y)
            .field("xmax", &self.max.x)
            .field("ymax", &self.max.y)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_from_xywh() {
        let bbox: BBoxXYXY<Pixel> = BBoxXYXY::from_xywh(10.0, 20.0, 90.0, 60.0);
        assert_eq!(bbox.xmax(), 100.0);
        assert_eq!(bbox.ymax(), 80.0);
        assert_eq!(bbox.area(), 5400.0);
    }

    #[test]
    fn test_enclosing_rectangle_of_corners() {
        let points = [
            Coord::<Pixel>::new(5.0, 1.0),
            Coord::new(-2.0, 7.0),
            Coord::new(3.0, 9.5),
        ];
        let bbox = BBoxXYXY::enclosing(points).expect("non-empty");
        assert_eq!(bbox, BBoxXYXY::from_xyxy(-2.0, 1.0, 5.0, 9.5));
        assert!(BBoxXYXY::<Pixel>::enclosing(Vec::new()).is_none());
    }

    #[test]
    fn test_clamp_and_degenerate() {
        let bbox: BBoxXYXY<Pixel> = BBoxXYXY::from_xyxy(-10.0, 50.0, 30.0, 700.0);
        let clamped = bbox.clamp_to(100.0, 600.0);
        assert_eq!(clamped, BBoxXYXY::from_xyxy(0.0, 50.0, 30.0, 600.0));
        assert!(!clamped.is_degenerate());

        let outside: BBoxXYXY<Pixel> = BBoxXYXY::from_xyxy(120.0, 10.0, 150.0, 20.0);
        assert!(outside.clamp_to(100.0, 100.0).is_degenerate());
    }

    #[test]
    fn test_cxcywh_roundtrip() {
        let bbox: BBoxXYXY<Pixel> = BBoxXYXY::from_xywh(100.0, 100.0, 200.0, 150.0);
        let (cx, cy, w, h) = bbox.to_normalized(800.0, 600.0).to_cxcywh();
        assert!((cx - 0.25).abs() < 1e-12);
        assert!((cy - 0.291_666_666).abs() < 1e-6);
        let restored = BBoxXYXY::from_cxcywh(cx, cy, w, h).to_pixel(800.0, 600.0);
        assert!((restored.xmin() - 100.0).abs() < 1e-9);
        assert!((restored.ymax() - 250.0).abs() < 1e-9);
    }
}
