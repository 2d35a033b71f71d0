//! Train/validation/test partitioning.

use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::BoxforgeError;
use crate::ir::LabeledImage;

/// Split percentages; each in `0..=100`, summing to 100.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitRatio {
    pub train: u32,
    pub val: u32,
    pub test: u32,
}

impl Default for SplitRatio {
    fn default() -> Self {
        Self {
            train: 70,
            val: 20,
            test: 10,
        }
    }
}

impl SplitRatio {
    /// Builds a validated ratio.
    pub fn new(train: u32, val: u32, test: u32) -> Result<Self, BoxforgeError> {
        let ratio = Self { train, val, test };
        ratio.validate()?;
        Ok(ratio)
    }

    pub fn validate(&self) -> Result<(), BoxforgeError> {
        for (name, value) in [("train", self.train), ("val", self.val), ("test", self.test)] {
            if value > 100 {
                return Err(BoxforgeError::validation(format!(
                    "{name} ratio {value} is outside 0..=100"
                )));
            }
        }
        let sum = self.train + self.val + self.test;
        if sum != 100 {
            return Err(BoxforgeError::validation(format!(
                "split ratios must sum to 100, got {sum}"
            )));
        }
        Ok(())
    }

    pub fn percent(&self, name: SplitName) -> u32 {
        match name {
            SplitName::Train => self.train,
            SplitName::Val => self.val,
            SplitName::Test => self.test,
        }
    }

    /// Image count per split for `n` images: train and val round down, test
    /// takes the remainder.
    pub fn counts(&self, n: usize) -> [usize; 3] {
        let train = n * self.train as usize / 100;
        let val = n * self.val as usize / 100;
        [train, val, n - train - val]
    }
}

impl fmt::Display for SplitRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.train, self.val, self.test)
    }
}

impl FromStr for SplitRatio {
    type Err = BoxforgeError;

    /// Parses `"70,20,10"` (also accepts `/` or `:` separators).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split([',', '/', ':']).map(str::trim).collect();
        let [train, val, test] = parts.as_slice() else {
            return Err(BoxforgeError::validation(format!(
                "expected three ratios like 70,20,10, got '{s}'"
            )));
        };
        let parse = |part: &str| {
            part.parse::<u32>().map_err(|_| {
                BoxforgeError::validation(format!("invalid split ratio '{part}' in '{s}'"))
            })
        };
        Self::new(parse(*train)?, parse(*val)?, parse(*test)?)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitName {
    Train,
    Val,
    Test,
}

impl SplitName {
    pub const ALL: [SplitName; 3] = [SplitName::Train, SplitName::Val, SplitName::Test];

    pub fn as_str(&self) -> &'static str {
        match self {
            SplitName::Train => "train",
            SplitName::Val => "val",
            SplitName::Test => "test",
        }
    }
}

impl fmt::Display for SplitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One partition of the dataset.
#[derive(Clone, Debug)]
pub struct DatasetSplit {
    pub name: SplitName,
    pub images: Vec<LabeledImage>,
    pub target_percent: u32,
}

impl DatasetSplit {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// The three splits, always in train/val/test order.
#[derive(Clone, Debug)]
pub struct Partition {
    pub ratio: SplitRatio,
    pub splits: [DatasetSplit; 3],
}

impl Partition {
    pub fn get(&self, name: SplitName) -> &DatasetSplit {
        &self.splits[name as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = &DatasetSplit> {
        self.splits.iter()
    }

    pub fn total_images(&self) -> usize {
        self.splits.iter().map(DatasetSplit::len).sum()
    }

    pub fn total_boxes(&self) -> usize {
        self.splits
            .iter()
            .flat_map(|split| split.images.iter())
            .map(|image| image.boxes.len())
            .sum()
    }
}

/// Partitions eligible images with a caller-supplied random source.
///
/// Images without boxes are left out. The eligible images are shuffled
/// uniformly and cut at the counts from [`SplitRatio::counts`], so every
/// eligible image lands in exactly one split.
pub fn partition_with_rng<R: Rng + ?Sized>(
    images: &[LabeledImage],
    ratio: SplitRatio,
    rng: &mut R,
) -> Result<Partition, BoxforgeError> {
    ratio.validate()?;

    let mut eligible: Vec<LabeledImage> = images
        .iter()
        .filter(|image| image.is_eligible())
        .cloned()
        .collect();
    eligible.shuffle(rng);

    let [train_count, val_count, _] = ratio.counts(eligible.len());
    let test = eligible.split_off(train_count + val_count);
    let val = eligible.split_off(train_count);
    let train = eligible;

    let split = |name: SplitName, images: Vec<LabeledImage>| DatasetSplit {
        name,
        images,
        target_percent: ratio.percent(name),
    };

    Ok(Partition {
        ratio,
        splits: [
            split(SplitName::Train, train),
            split(SplitName::Val, val),
            split(SplitName::Test, test),
        ],
    })
}

/// Partitions with a fixed seed, or OS entropy when `seed` is `None`.
pub fn partition(
    images: &[LabeledImage],
    ratio: SplitRatio,
    seed: Option<u64>,
) -> Result<Partition, BoxforgeError> {
    if let Some(seed) = seed {
        let mut rng = StdRng::seed_from_u64(seed);
        partition_with_rng(images, ratio, &mut rng)
    } else {
        let mut rng = rand::rng();
        partition_with_rng(images, ratio, &mut rng)
    }
}
