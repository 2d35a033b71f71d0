use boxforge::export::{Exporter, YoloExporter};
use boxforge::ir::ClassList;
use boxforge::split::{DatasetSplit, SplitName};
use proptest::prelude::*;

mod proptest_helpers;

/// Relative tolerance, or the rounding step of a 6-decimal normalized value
/// scaled back to pixels for values near zero.
fn close(actual: f64, expected: f64, dim: f64) -> bool {
    proptest_helpers::close_rel(actual, expected, proptest_helpers::REL_YOLO)
        || (actual - expected).abs() <= dim * 1e-6
}

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn yolo_labels_denormalize_to_source_boxes(
        images in proptest_helpers::arb_images(1, 4, 6)
    ) {
        let classes = ClassList::discover(images.iter());
        let split = DatasetSplit { name: SplitName::Train, images: images.clone(), target_percent: 100 };
        let artifacts = YoloExporter.export(&split, &classes).expect("export yolo");
        prop_assert_eq!(artifacts.len(), images.len());

        for (image, artifact) in images.iter().zip(&artifacts) {
            let size = image.size.expect("sized");
            let (w, h) = (size.width as f64, size.height as f64);
            let lines: Vec<&str> = artifact.text().split('\n').collect();
            prop_assert_eq!(lines.len(), image.boxes.len());

            for (bbox, line) in image.boxes.iter().zip(lines) {
                let fields: Vec<&str> = line.split(' ').collect();
                prop_assert_eq!(fields.len(), 5);
                let class_id: usize = fields[0].parse().expect("class id");
                prop_assert_eq!(classes.names()[class_id].as_str(), bbox.class_name.as_str());

                let nums: Vec<f64> = fields[1..].iter().map(|f| f.parse().expect("float")).collect();
                let x = (nums[0] - nums[2] / 2.0) * w;
                let y = (nums[1] - nums[3] / 2.0) * h;
                let bw = nums[2] * w;
                let bh = nums[3] * h;
                prop_assert!(close(x, bbox.x, w), "x {} vs {}", x, bbox.x);
                prop_assert!(close(y, bbox.y, h), "y {} vs {}", y, bbox.y);
                prop_assert!(close(bw, bbox.width, w), "w {} vs {}", bw, bbox.width);
                prop_assert!(close(bh, bbox.height, h), "h {} vs {}", bh, bbox.height);
            }
        }
    }

    #[test]
    fn yolo_export_is_deterministic(
        images in proptest_helpers::arb_images(1, 3, 4)
    ) {
        let classes = ClassList::discover(images.iter());
        let split = DatasetSplit { name: SplitName::Val, images, target_percent: 20 };
        let a = YoloExporter.export(&split, &classes).expect("first");
        let b = YoloExporter.export(&split, &classes).expect("second");
        prop_assert_eq!(a, b);
    }
}
