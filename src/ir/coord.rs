//! Typed 2D points and coordinate-space markers.
//!
//! The space markers are zero-sized types used as type parameters so that
//! pixel and normalized coordinates cannot be mixed by accident.

use std::fmt;
use std::marker::PhantomData;

/// Marker type for pixel coordinates (absolute values, origin top-left).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pixel {}

/// Marker type for coordinates normalized by the image dimensions (0.0 to 1.0).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Normalized {}

impl fmt::Debug for Pixel {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

impl fmt::Debug for Normalized {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

/// A 2D point tagged with its coordinate space.
#[derive(Clone, Copy, PartialEq)]
pub struct Coord<TSpace> {
    pub x: f64,
    pub y: f64,
    _space: PhantomData<TSpace>,
}

impl<TSpace> Coord<TSpace> {
    /// Creates a new coordinate with the given x and y values.
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            _space: PhantomData,
        }
    }

    /// Returns true if both coordinates are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Coord<Pixel> {
    /// Clamps the point into `[0, width] x [0, height]`.
    #[inline]
    pub fn clamp_to(&self, width: f64, height: f64) -> Self {
        Self::new(self.x.clamp(0.0, width), self.y.clamp(0.0, height))
    }
}

impl<TSpace> fmt::Debug for Coord<TSpace> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coord")
            .field("x", &self.x)
            .field("y", &self.y)
            .finish()
    }
}

impl<TSpace> Default for Coord<TSpace> {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coord_is_finite() {
        let finite: Coord<Pixel> = Coord::new(10.0, 20.0);
        assert!(finite.is_finite());

        let nan: Coord<Pixel> = Coord::new(f64::NAN, 20.0);
        assert!(!nan.is_finite());
    }

    #[test]
    fn test_clamp_to_image_bounds() {
        let p: Coord<Pixel> = Coord::new(-4.0, 900.0);
        let clamped = p.clamp_to(800.0, 600.0);
        assert_eq!(clamped.x, 0.0);
        assert_eq!(clamped.y, 600.0);
    }
}
