#![allow(dead_code)]

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use boxforge::ir::io_json::write_project_json;
use boxforge::ir::{BoundingBox, LabeledImage, PixelData};
use image::{ImageFormat, Rgb, RgbImage};

/// A small PNG with a diagonal gradient so transforms change real pixels.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 96])
    });
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).expect("encode png");
    buf.into_inner()
}

pub fn write_png(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, png_bytes(width, height)).expect("write png file");
}

/// In-memory labeled image with one box per `(x, y, w, h, class)`.
pub fn labeled(
    id: &str,
    width: u32,
    height: u32,
    boxes: &[(f64, f64, f64, f64, &str)],
) -> LabeledImage {
    let mut image = LabeledImage::new(
        id,
        format!("{id}.png"),
        PixelData::encoded(png_bytes(width, height)),
    )
    .with_size(width, height);
    for (i, (x, y, w, h, class)) in boxes.iter().enumerate() {
        image = image.with_box(BoundingBox::new(i as u64 + 1, *x, *y, *w, *h, *class));
    }
    image
}

/// Writes PNGs for `images` under `root/images` and a `project.json` next
/// to them; returns the project path.
pub fn write_project(root: &Path, images: &[(&str, u32, u32, Vec<(f64, f64, f64, f64, &str)>)]) -> PathBuf {
    let mut labeled_images = Vec::new();
    for (id, width, height, boxes) in images {
        let path = root.join("images").join(format!("{id}.png"));
        write_png(&path, *width, *height);
        let mut image = LabeledImage::new(*id, format!("{id}.png"), PixelData::File(path));
        for (i, (x, y, w, h, class)) in boxes.iter().enumerate() {
            image = image.with_box(BoundingBox::new(i as u64 + 1, *x, *y, *w, *h, *class));
        }
        labeled_images.push(image);
    }
    let project = root.join("project.json");
    write_project_json(&project, &labeled_images).expect("write project");
    project
}
