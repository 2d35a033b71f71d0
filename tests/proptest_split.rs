use std::collections::HashSet;

use boxforge::split::{partition_with_rng, SplitRatio};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

mod proptest_helpers;

fn arb_ratio() -> impl Strategy<Value = SplitRatio> {
    (0u32..=100)
        .prop_flat_map(|train| (Just(train), 0u32..=(100 - train)))
        .prop_map(|(train, val)| SplitRatio { train, val, test: 100 - train - val })
}

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn every_image_lands_in_exactly_one_split(
        images in proptest_helpers::arb_images(0, 30, 1),
        ratio in arb_ratio(),
        seed in any::<u64>(),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let partition = partition_with_rng(&images, ratio, &mut rng).expect("valid ratio");

        prop_assert_eq!(partition.total_images(), images.len());
        let n = images.len();
        prop_assert_eq!(partition.splits[0].len(), n * ratio.train as usize / 100);
        prop_assert_eq!(partition.splits[1].len(), n * ratio.val as usize / 100);

        let mut seen = HashSet::new();
        for split in partition.iter() {
            for image in &split.images {
                prop_assert!(seen.insert(image.id.clone()), "{} appears twice", image.id);
            }
        }
        prop_assert_eq!(seen.len(), n);
    }
}
