use boxforge::export::{CocoExporter, Exporter};
use boxforge::ir::ClassList;
use boxforge::split::{DatasetSplit, SplitName};
use proptest::prelude::*;

mod proptest_helpers;

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn coco_ids_increase_and_categories_resolve(
        images in proptest_helpers::arb_images(0, 5, 5)
    ) {
        let classes = ClassList::discover(images.iter());
        let box_count: usize = images.iter().map(|i| i.boxes.len()).sum();
        let split = DatasetSplit { name: SplitName::Test, images, target_percent: 10 };

        let artifacts = CocoExporter.export(&split, &classes).expect("export coco");
        prop_assert_eq!(artifacts.len(), 1);
        let json: serde_json::Value = serde_json::from_slice(&artifacts[0].contents).expect("json");

        let categories = json["categories"].as_array().expect("categories");
        prop_assert_eq!(categories.len(), classes.len());
        let annotations = json["annotations"].as_array().expect("annotations");
        prop_assert_eq!(annotations.len(), box_count);

        let mut previous = 0u64;
        for ann in annotations {
            let id = ann["id"].as_u64().expect("id");
            prop_assert!(id > previous, "annotation ids must increase: {} after {}", id, previous);
            previous = id;

            let category_id = ann["category_id"].as_u64().expect("category") as usize;
            prop_assert!(category_id < categories.len());
            prop_assert_eq!(categories[category_id]["id"].as_u64(), Some(category_id as u64));

            let image_id = ann["image_id"].as_u64().expect("image id") as usize;
            prop_assert!(image_id < split.images.len());
        }
    }

    #[test]
    fn coco_bbox_and_area_match_source(
        images in proptest_helpers::arb_images(1, 3, 4)
    ) {
        let classes = ClassList::discover(images.iter());
        let split = DatasetSplit { name: SplitName::Train, images, target_percent: 70 };
        let artifacts = CocoExporter.export(&split, &classes).expect("export coco");
        let json: serde_json::Value = serde_json::from_slice(&artifacts[0].contents).expect("json");

        let boxes: Vec<_> = split.images.iter().flat_map(|i| i.boxes.iter()).collect();
        let annotations = json["annotations"].as_array().expect("annotations");
        for (bbox, ann) in boxes.iter().zip(annotations) {
            let coords: Vec<f64> = ann["bbox"].as_array().expect("bbox").iter().map(|v| v.as_f64().expect("num")).collect();
            prop_assert!((coords[0] - bbox.x).abs() < proptest_helpers::EPS_PIXEL);
            prop_assert!((coords[3] - bbox.height).abs() < proptest_helpers::EPS_PIXEL);
            let area = ann["area"].as_f64().expect("area");
            prop_assert!((area - bbox.width * bbox.height).abs() < 1e-6 * area.max(1.0));
            prop_assert_eq!(ann["iscrowd"].as_u64(), Some(0));
        }
    }
}
