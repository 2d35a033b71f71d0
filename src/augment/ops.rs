//! Pixel operations, one per transform kind.
//!
//! Every function takes the source image by reference and returns a newly
//! allocated image of the same dimensions; nothing here mutates its input.

use image::{imageops, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_line_segment_mut};
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometric_transformations::{warp, Interpolation};
use imageproc::map::map_colors;
use imageproc::rect::Rect;
use rand::Rng;

use super::catalog::TransformKind;
use super::geometry::Affine;

const FILL: Rgb<u8> = Rgb([0, 0, 0]);

/// Renders one sample of `kind` at `value`.
///
/// `rng` is only consulted by stochastic kinds (noise, cutout, weather).
pub fn render<R: Rng + ?Sized>(
    kind: TransformKind,
    value: f64,
    src: &RgbImage,
    rng: &mut R,
) -> RgbImage {
    match kind {
        TransformKind::Rotation | TransformKind::Scaling | TransformKind::Translation => {
            let (width, height) = src.dimensions();
            match Affine::for_transform(kind, value, width, height).and_then(|a| a.to_projection())
            {
                Some(projection) => warp(src, &projection, Interpolation::Bilinear, FILL),
                None => src.clone(),
            }
        }
        TransformKind::FlipHorizontal => imageops::flip_horizontal(src),
        TransformKind::FlipVertical => imageops::flip_vertical(src),
        TransformKind::Brightness => brightness(src, value),
        TransformKind::Contrast => contrast(src, value),
        TransformKind::Saturation => saturation(src, value),
        TransformKind::Hue => imageops::huerotate(src, value.round() as i32),
        TransformKind::Gamma => gamma(src, value),
        TransformKind::GaussianBlur => blur(src, value),
        TransformKind::Sharpen => sharpen(src, value),
        TransformKind::GaussianNoise => gaussian_noise(src, value, rng),
        TransformKind::SaltPepperNoise => salt_pepper(src, value, rng),
        TransformKind::Cutout => cutout(src, value, rng),
        TransformKind::Rain => rain(src, value, rng),
        TransformKind::Snow => snow(src, value, rng),
        TransformKind::Fog => fog(src, value, rng),
    }
}

#[inline]
fn to_u8(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

fn map_channels(src: &RgbImage, f: impl Fn(f64) -> f64) -> RgbImage {
    map_colors(src, |p: Rgb<u8>| Rgb(p.0.map(|c| to_u8(f(c as f64)))))
}

/// Multiplies every channel by `factor`.
pub fn brightness(src: &RgbImage, factor: f64) -> RgbImage {
    map_channels(src, |c| c * factor)
}

/// Scales the distance from mid-grey by `factor`.
pub fn contrast(src: &RgbImage, factor: f64) -> RgbImage {
    map_channels(src, |c| (c - 127.5) * factor + 127.5)
}

/// Blends each pixel with its luma; 0 is greyscale, 1 is unchanged.
pub fn saturation(src: &RgbImage, factor: f64) -> RgbImage {
    map_colors(src, |p: Rgb<u8>| {
        let [r, g, b] = p.0.map(f64::from);
        let luma = 0.2126 * r + 0.7152 * g + 0.0722 * b;
        Rgb([r, g, b].map(|c| to_u8(luma + (c - luma) * factor)))
    })
}

/// `out = in^(1/gamma)` on normalized channels; values above 1 brighten.
pub fn gamma(src: &RgbImage, gamma: f64) -> RgbImage {
    let inv = 1.0 / gamma.max(f64::EPSILON);
    let lut: Vec<u8> = (0..=255u32)
        .map(|c| to_u8((c as f64 / 255.0).powf(inv) * 255.0))
        .collect();
    map_colors(src, |p: Rgb<u8>| Rgb(p.0.map(|c| lut[c as usize])))
}

pub fn blur(src: &RgbImage, sigma: f64) -> RgbImage {
    if sigma <= 0.0 {
        return src.clone();
    }
    gaussian_blur_f32(src, sigma as f32)
}

/// Unsharp mask: `src + amount * (src - blur(src))`.
pub fn sharpen(src: &RgbImage, amount: f64) -> RgbImage {
    let blurred = gaussian_blur_f32(src, 1.0);
    let mut out = src.clone();
    for (dst, soft) in out.pixels_mut().zip(blurred.pixels()) {
        for (c, s) in dst.0.iter_mut().zip(soft.0) {
            let sharp = *c as f64;
            *c = to_u8(sharp + amount * (sharp - s as f64));
        }
    }
    out
}

/// Standard normal sample (Box-Muller).
fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Adds the same zero-mean gaussian offset to the three channels of a pixel.
pub fn gaussian_noise<R: Rng + ?Sized>(src: &RgbImage, std_dev: f64, rng: &mut R) -> RgbImage {
    let mut out = src.clone();
    for p in out.pixels_mut() {
        let n = standard_normal(rng) * std_dev;
        p.0 = p.0.map(|c| to_u8(c as f64 + n));
    }
    out
}

/// Turns a `density` fraction of pixels black or white with equal odds.
pub fn salt_pepper<R: Rng + ?Sized>(src: &RgbImage, density: f64, rng: &mut R) -> RgbImage {
    let density = density.clamp(0.0, 1.0);
    let mut out = src.clone();
    for p in out.pixels_mut() {
        if rng.random_bool(density) {
            *p = if rng.random_bool(0.5) {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            };
        }
    }
    out
}

/// Blacks out one square covering `area_fraction` of the image.
pub fn cutout<R: Rng + ?Sized>(src: &RgbImage, area_fraction: f64, rng: &mut R) -> RgbImage {
    let (width, height) = src.dimensions();
    let side = ((width as f64 * height as f64 * area_fraction).sqrt()).round() as u32;
    let (w, h) = (side.min(width), side.min(height));
    let mut out = src.clone();
    if w == 0 || h == 0 {
        return out;
    }
    let x = rng.random_range(0..=width - w);
    let y = rng.random_range(0..=height - h);
    draw_filled_rect_mut(&mut out, Rect::at(x as i32, y as i32).of_size(w, h), FILL);
    out
}

/// Darkens slightly and draws slanted light streaks.
pub fn rain<R: Rng + ?Sized>(src: &RgbImage, intensity: f64, rng: &mut R) -> RgbImage {
    let (width, height) = src.dimensions();
    let mut out = brightness(src, 1.0 - 0.2 * intensity);
    let drops = (width as f64 * height as f64 * intensity / 150.0) as usize;
    let max_len = (height as f32 / 20.0).max(4.0);
    for _ in 0..drops {
        let x = rng.random_range(0.0..width as f32);
        let y = rng.random_range(0.0..height as f32);
        let len = rng.random_range(max_len / 2.0..=max_len);
        draw_line_segment_mut(
            &mut out,
            (x, y),
            (x + len * 0.2, y + len),
            Rgb([200, 200, 210]),
        );
    }
    out
}

/// Scatters small white discs.
pub fn snow<R: Rng + ?Sized>(src: &RgbImage, intensity: f64, rng: &mut R) -> RgbImage {
    let (width, height) = src.dimensions();
    let mut out = src.clone();
    let flakes = (width as f64 * height as f64 * intensity / 250.0) as usize;
    for _ in 0..flakes {
        let x = rng.random_range(0..width) as i32;
        let y = rng.random_range(0..height) as i32;
        let radius = rng.random_range(1..=3);
        draw_filled_circle_mut(&mut out, (x, y), radius, Rgb([250, 250, 250]));
    }
    out
}

/// Blends toward light grey, densest at the top, with a random density jitter.
pub fn fog<R: Rng + ?Sized>(src: &RgbImage, intensity: f64, rng: &mut R) -> RgbImage {
    let height = src.height().max(1) as f64;
    let density = intensity * rng.random_range(0.6..=1.0) * 0.8;
    let mut out = src.clone();
    for (_, y, p) in out.enumerate_pixels_mut() {
        let t = (density * (1.0 - 0.5 * y as f64 / height)).clamp(0.0, 1.0);
        p.0 = p.0.map(|c| to_u8(c as f64 * (1.0 - t) + 220.0 * t));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 5 % 256) as u8, ((x + y) % 256) as u8])
        })
    }

    #[test]
    fn every_kind_keeps_dimensions_and_source() {
        let src = gradient(32, 24);
        let before = src.clone();
        let mut rng = StdRng::seed_from_u64(7);
        for kind in TransformKind::ALL {
            let value = kind.default_params().samples()[0];
            let out = render(kind, value, &src, &mut rng);
            assert_eq!(out.dimensions(), (32, 24), "{kind}");
        }
        assert_eq!(src, before);
    }

    #[test]
    fn horizontal_flip_mirrors_pixels() {
        let src = gradient(8, 4);
        let mut rng = StdRng::seed_from_u64(0);
        let out = render(TransformKind::FlipHorizontal, 1.0, &src, &mut rng);
        assert_eq!(out.get_pixel(0, 1), src.get_pixel(7, 1));
    }

    #[test]
    fn brightness_scales_and_saturates() {
        let src = RgbImage::from_pixel(2, 2, Rgb([100, 200, 10]));
        let out = brightness(&src, 1.5);
        assert_eq!(out.get_pixel(0, 0), &Rgb([150, 255, 15]));
    }

    #[test]
    fn zero_saturation_is_grey() {
        let src = RgbImage::from_pixel(1, 1, Rgb([200, 50, 10]));
        let out = saturation(&src, 0.0);
        let [r, g, b] = out.get_pixel(0, 0).0;
        assert_eq!(r, g);
        assert_eq!(g, b);
    }

    #[test]
    fn noise_differs_across_seeds_and_repeats_per_seed() {
        let src = gradient(16, 16);
        let a = gaussian_noise(&src, 30.0, &mut StdRng::seed_from_u64(1));
        let b = gaussian_noise(&src, 30.0, &mut StdRng::seed_from_u64(1));
        let c = gaussian_noise(&src, 30.0, &mut StdRng::seed_from_u64(2));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn cutout_blacks_out_requested_area() {
        let src = RgbImage::from_pixel(20, 20, Rgb([255, 255, 255]));
        let out = cutout(&src, 0.25, &mut StdRng::seed_from_u64(3));
        let black = out.pixels().filter(|p| p.0 == [0, 0, 0]).count();
        assert_eq!(black, 100);
    }
}
