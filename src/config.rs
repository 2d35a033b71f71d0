//! Augmentation run configuration.
//!
//! Parsed once from YAML and then shared read-only through
//! [`RunContext`](crate::run::RunContext).

use std::fs;
use std::path::Path;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::augment::TransformSpec;
use crate::error::BoxforgeError;
use crate::run::PartialPolicy;

pub const DEFAULT_DECODE_TIMEOUT_MS: u64 = 10_000;

fn default_decode_timeout_ms() -> u64 {
    DEFAULT_DECODE_TIMEOUT_MS
}

/// Immutable settings of one augmentation run.
///
/// ```yaml
/// seed: 42
/// decode_timeout_ms: 5000
/// on_fatal: discard
/// transforms:
///   - kind: rotation
///     params: { type: range, min: -10, max: 10, sample_count: 3 }
///   - kind: flip-h
///     params: { type: toggle }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AugmentConfig {
    #[serde(default)]
    pub transforms: Vec<TransformSpec>,

    #[serde(default = "default_decode_timeout_ms")]
    pub decode_timeout_ms: u64,

    /// Fixed seed for reproducible stochastic transforms; OS entropy if unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    #[serde(default)]
    pub on_fatal: PartialPolicy,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            transforms: Vec::new(),
            decode_timeout_ms: DEFAULT_DECODE_TIMEOUT_MS,
            seed: None,
            on_fatal: PartialPolicy::default(),
        }
    }
}

impl AugmentConfig {
    pub fn new(transforms: Vec<TransformSpec>) -> Self {
        Self {
            transforms,
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_decode_timeout(mut self, timeout: Duration) -> Self {
        self.decode_timeout_ms = timeout.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    pub fn with_partial_policy(mut self, policy: PartialPolicy) -> Self {
        self.on_fatal = policy;
        self
    }

    /// Reads and validates a YAML config file.
    pub fn from_path(path: &Path) -> Result<Self, BoxforgeError> {
        let text = fs::read_to_string(path)?;
        let config: AugmentConfig =
            serde_yaml::from_str(&text).map_err(|source| BoxforgeError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every enabled transform and that at least one is enabled.
    pub fn validate(&self) -> Result<(), BoxforgeError> {
        let mut any = false;
        for spec in self.enabled() {
            spec.validate()?;
            any = true;
        }
        if !any {
            return Err(BoxforgeError::validation(
                "no augmentation transform is enabled",
            ));
        }
        if self.decode_timeout_ms == 0 {
            return Err(BoxforgeError::validation(
                "decode_timeout_ms must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Enabled transforms in configuration order.
    pub fn enabled(&self) -> impl Iterator<Item = &TransformSpec> {
        self.transforms.iter().filter(|spec| spec.enabled)
    }

    /// Derived images produced per eligible source image.
    pub fn samples_per_image(&self) -> usize {
        self.transforms
            .iter()
            .map(TransformSpec::effective_sample_count)
            .sum()
    }

    pub fn decode_timeout(&self) -> Duration {
        Duration::from_millis(self.decode_timeout_ms)
    }

    /// Run RNG: seeded when `seed` is set, otherwise from OS entropy.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::augment::{TransformKind, TransformParams};
    use rand::Rng;

    const YAML: &str = r#"
seed: 7
on_fatal: discard
transforms:
  - kind: rotation
    params: { type: range, min: -10, max: 10, sample_count: 3 }
  - kind: flip-h
    params: { type: toggle }
  - kind: rain
    enabled: false
    params: { type: intensity, value: 0.4, sample_count: 2 }
"#;

    #[test]
    fn parses_yaml_with_defaults() {
        let config: AugmentConfig = serde_yaml::from_str(YAML).expect("parse");
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.on_fatal, PartialPolicy::Discard);
        assert_eq!(config.decode_timeout(), Duration::from_secs(10));
        assert_eq!(config.transforms.len(), 3);
        assert_eq!(config.enabled().count(), 2);
        assert_eq!(config.samples_per_image(), 4);
        assert_eq!(
            config.transforms[2].params,
            TransformParams::Intensity {
                value: 0.4,
                sample_count: 2
            }
        );
        config.validate().expect("valid");
    }

    #[test]
    fn nothing_enabled_is_a_validation_error() {
        let config = AugmentConfig::new(vec![crate::augment::TransformSpec::default_for(
            TransformKind::Hue,
        )]);
        assert!(matches!(
            config.validate(),
            Err(BoxforgeError::Validation { .. })
        ));
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        let config = AugmentConfig::default().with_seed(99);
        let a: u64 = config.rng().random();
        let b: u64 = config.rng().random();
        assert_eq!(a, b);
    }

    #[test]
    fn from_path_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("augment.yaml");
        fs::write(&path, "transforms: [ {kind: warp-drive} ]").unwrap();
        assert!(matches!(
            AugmentConfig::from_path(&path),
            Err(BoxforgeError::ConfigParse { .. })
        ));
    }
}
