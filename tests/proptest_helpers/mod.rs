#![allow(dead_code)]

use boxforge::ir::{BoundingBox, LabeledImage, PixelData};
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub const EPS_PIXEL: f64 = 1e-6;

/// Relative tolerance for values that went through 6-decimal text.
pub const REL_YOLO: f64 = 1e-3;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

pub fn class_names() -> &'static [&'static str] {
    &["car", "person", "dog", "bicycle"]
}

pub fn arb_image_size() -> impl Strategy<Value = (u32, u32)> {
    (16u32..=2000, 16u32..=2000)
}

/// A box with positive area lying inside a `width x height` image.
pub fn arb_box_in(width: u32, height: u32) -> BoxedStrategy<(f64, f64, f64, f64)> {
    let (w, h) = (width as f64, height as f64);
    (0.0..w - 1.0, 0.0..h - 1.0)
        .prop_flat_map(move |(x, y)| (Just(x), Just(y), 1.0..=(w - x), 1.0..=(h - y)))
        .boxed()
}

/// An image with a size, between 1 and `max_boxes` boxes and random classes.
pub fn arb_labeled_image(id: String, max_boxes: usize) -> BoxedStrategy<LabeledImage> {
    arb_image_size()
        .prop_flat_map(move |(width, height)| {
            let boxes = prop::collection::vec(
                (arb_box_in(width, height), prop::sample::select(class_names())),
                1..=max_boxes,
            );
            (Just(width), Just(height), boxes)
        })
        .prop_map(move |(width, height, boxes)| {
            let image = LabeledImage::new(
                id.clone(),
                format!("{id}.jpg"),
                PixelData::File(format!("{id}.jpg").into()),
            )
            .with_size(width, height);
            boxes
                .into_iter()
                .enumerate()
                .fold(image, |image, (i, ((x, y, w, h), class))| {
                    image.with_box(BoundingBox::new(i as u64 + 1, x, y, w, h, class))
                })
        })
        .boxed()
}

/// Between `min` and `max` images with distinct ids.
pub fn arb_images(min: usize, max: usize, max_boxes: usize) -> BoxedStrategy<Vec<LabeledImage>> {
    (min..=max)
        .prop_flat_map(move |n| {
            (0..n)
                .map(|i| arb_labeled_image(format!("img{i:03}"), max_boxes))
                .collect::<Vec<_>>()
        })
        .boxed()
}

pub fn close_rel(a: f64, b: f64, rel: f64) -> bool {
    (a - b).abs() <= rel * a.abs().max(b.abs()).max(1.0)
}
