//! Affine maps and bounding-box propagation.
//!
//! Geometric transforms build one [`Affine`] per sample. The same matrix
//! drives the pixel warp (through [`Affine::to_projection`]) and the box
//! corners, so pixels and labels cannot drift apart.

use imageproc::geometric_transformations::Projection;
use log::debug;

use super::catalog::{LabelRule, TransformKind};
use crate::ir::{BBoxXYXY, BoundingBox, Coord, Pixel};

/// A 2D affine map `x' = a*x + b*y + c`, `y' = d*x + e*y + f`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Affine {
    m: [f64; 6],
}

impl Affine {
    pub const IDENTITY: Affine = Affine {
        m: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
    };

    pub fn translate(tx: f64, ty: f64) -> Self {
        Self {
            m: [1.0, 0.0, tx, 0.0, 1.0, ty],
        }
    }

    /// Rotation by `degrees` about `(cx, cy)`.
    ///
    /// With y pointing down, positive angles turn the image clockwise.
    pub fn rotate_about(degrees: f64, cx: f64, cy: f64) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self::translate(cx, cy)
            .then_after(&Self {
                m: [cos, -sin, 0.0, sin, cos, 0.0],
            })
            .then_after(&Self::translate(-cx, -cy))
    }

    /// Uniform scaling by `factor` about `(cx, cy)`.
    pub fn scale_about(factor: f64, cx: f64, cy: f64) -> Self {
        Self {
            m: [factor, 0.0, cx - factor * cx, 0.0, factor, cy - factor * cy],
        }
    }

    /// Composition `self ∘ inner`: applies `inner` first, then `self`.
    pub fn then_after(&self, inner: &Affine) -> Affine {
        let [a, b, c, d, e, f] = self.m;
        let [ia, ib, ic, id, ie, i_f] = inner.m;
        Affine {
            m: [
                a * ia + b * id,
                a * ib + b * ie,
                a * ic + b * i_f + c,
                d * ia + e * id,
                d * ib + e * ie,
                d * ic + e * i_f + f,
            ],
        }
    }

    #[inline]
    pub fn apply(&self, p: Coord<Pixel>) -> Coord<Pixel> {
        let [a, b, c, d, e, f] = self.m;
        Coord::new(a * p.x + b * p.y + c, d * p.x + e * p.y + f)
    }

    /// The same map as an `imageproc` projection for warping pixels.
    ///
    /// Returns `None` for singular matrices.
    pub fn to_projection(&self) -> Option<Projection> {
        let [a, b, c, d, e, f] = self.m.map(|v| v as f32);
        Projection::from_matrix([a, b, c, d, e, f, 0.0, 0.0, 1.0])
    }

    /// Map for a geometric transform sample on a `width x height` image.
    ///
    /// Rotation and scaling act about the image centre; translation moves
    /// by `value` times the image width and height. Other kinds have no map.
    pub fn for_transform(kind: TransformKind, value: f64, width: u32, height: u32) -> Option<Self> {
        let (w, h) = (width as f64, height as f64);
        match kind {
            TransformKind::Rotation => Some(Self::rotate_about(value, w / 2.0, h / 2.0)),
            TransformKind::Scaling => Some(Self::scale_about(value, w / 2.0, h / 2.0)),
            TransformKind::Translation => Some(Self::translate(value * w, value * h)),
            _ => None,
        }
    }
}

/// Moves boxes along with the pixels of one transform sample.
///
/// Every output box lies inside the image. Boxes that end up with no area
/// are dropped.
pub fn propagate_boxes(
    kind: TransformKind,
    value: f64,
    boxes: &[BoundingBox],
    width: u32,
    height: u32,
) -> Vec<BoundingBox> {
    let (w, h) = (width as f64, height as f64);
    let affine = Affine::for_transform(kind, value, width, height);

    boxes
        .iter()
        .filter_map(|bbox| {
            let moved = match (kind.label_rule(), affine.as_ref()) {
                (LabelRule::MirrorX, _) => BoundingBox {
                    x: w - bbox.x - bbox.width,
                    ..bbox.clone()
                },
                (LabelRule::MirrorY, _) => BoundingBox {
                    y: h - bbox.y - bbox.height,
                    ..bbox.clone()
                },
                (LabelRule::Affine, Some(affine)) => {
                    let corners = bbox.to_xyxy().corners().map(|p| affine.apply(p));
                    let enclosing = BBoxXYXY::enclosing(corners)?;
                    bbox.with_rect(enclosing)
                }
                _ => bbox.clone(),
            };

            let clamped = moved.clamped(width, height);
            if clamped.is_none() {
                debug!(
                    "box {} ({}) left the image under {kind} {value}",
                    bbox.id, bbox.class_name
                );
            }
            clamped
        })
        .collect()
}
