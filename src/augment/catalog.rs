//! Transform catalog: every augmentation kind, its parameter shape and
//! domain, its label rule, and how its parameter samples are generated.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BoxforgeError;

/// Every augmentation the executor knows how to render.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransformKind {
    Rotation,
    Scaling,
    Translation,
    #[serde(rename = "flip-h")]
    FlipHorizontal,
    #[serde(rename = "flip-v")]
    FlipVertical,
    Brightness,
    Contrast,
    Saturation,
    Hue,
    Gamma,
    GaussianBlur,
    GaussianNoise,
    SaltPepperNoise,
    Sharpen,
    Cutout,
    Rain,
    Snow,
    Fog,
}

/// Grouping used for display and for the label rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransformFamily {
    Geometric,
    Color,
    NoiseFilter,
    Occlusion,
    Weather,
}

/// Which parameter variant a kind accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamShape {
    /// `min..=max` sampled at `sample_count` evenly spaced points.
    Range,
    /// On/off; one derived image.
    Toggle,
    /// One intensity regenerated `sample_count` times with fresh randomness.
    Intensity,
}

/// How bounding boxes follow the pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelRule {
    /// Boxes are copied as-is.
    Unchanged,
    /// `x' = W - x - w`.
    MirrorX,
    /// `y' = H - y - h`.
    MirrorY,
    /// Corners go through the pixel warp matrix, then enclose and clamp.
    Affine,
}

/// Allowed parameter values for a kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParamDomain {
    pub min: f64,
    pub max: f64,
    pub unit: &'static str,
}

impl ParamDomain {
    const fn new(min: f64, max: f64, unit: &'static str) -> Self {
        Self { min, max, unit }
    }

    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }
}

impl TransformKind {
    pub const ALL: [TransformKind; 18] = [
        TransformKind::Rotation,
        TransformKind::Scaling,
        TransformKind::Translation,
        TransformKind::FlipHorizontal,
        TransformKind::FlipVertical,
        TransformKind::Brightness,
        TransformKind::Contrast,
        TransformKind::Saturation,
        TransformKind::Hue,
        TransformKind::Gamma,
        TransformKind::GaussianBlur,
        TransformKind::GaussianNoise,
        TransformKind::SaltPepperNoise,
        TransformKind::Sharpen,
        TransformKind::Cutout,
        TransformKind::Rain,
        TransformKind::Snow,
        TransformKind::Fog,
    ];

    /// Stable name used in config files, derived ids and file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformKind::Rotation => "rotation",
            TransformKind::Scaling => "scaling",
            TransformKind::Translation => "translation",
            TransformKind::FlipHorizontal => "flip-h",
            TransformKind::FlipVertical => "flip-v",
            TransformKind::Brightness => "brightness",
            TransformKind::Contrast => "contrast",
            TransformKind::Saturation => "saturation",
            TransformKind::Hue => "hue",
            TransformKind::Gamma => "gamma",
            TransformKind::GaussianBlur => "gaussian-blur",
            TransformKind::GaussianNoise => "gaussian-noise",
            TransformKind::SaltPepperNoise => "salt-pepper-noise",
            TransformKind::Sharpen => "sharpen",
            TransformKind::Cutout => "cutout",
            TransformKind::Rain => "rain",
            TransformKind::Snow => "snow",
            TransformKind::Fog => "fog",
        }
    }

    pub fn family(&self) -> TransformFamily {
        use TransformKind::*;
        match self {
            Rotation | Scaling | Translation | FlipHorizontal | FlipVertical => {
                TransformFamily::Geometric
            }
            Brightness | Contrast | Saturation | Hue | Gamma => TransformFamily::Color,
            GaussianBlur | GaussianNoise | SaltPepperNoise | Sharpen => {
                TransformFamily::NoiseFilter
            }
            Cutout => TransformFamily::Occlusion,
            Rain | Snow | Fog => TransformFamily::Weather,
        }
    }

    pub fn shape(&self) -> ParamShape {
        use TransformKind::*;
        match self {
            FlipHorizontal | FlipVertical => ParamShape::Toggle,
            GaussianNoise | SaltPepperNoise | Cutout | Rain | Snow | Fog => ParamShape::Intensity,
            _ => ParamShape::Range,
        }
    }

    pub fn label_rule(&self) -> LabelRule {
        match self {
            TransformKind::FlipHorizontal => LabelRule::MirrorX,
            TransformKind::FlipVertical => LabelRule::MirrorY,
            TransformKind::Rotation | TransformKind::Scaling | TransformKind::Translation => {
                LabelRule::Affine
            }
            _ => LabelRule::Unchanged,
        }
    }

    pub fn domain(&self) -> ParamDomain {
        use TransformKind::*;
        match self {
            Rotation => ParamDomain::new(-180.0, 180.0, "degrees"),
            Scaling => ParamDomain::new(0.1, 4.0, "factor"),
            Translation => ParamDomain::new(-1.0, 1.0, "fraction of image size"),
            FlipHorizontal | FlipVertical => ParamDomain::new(1.0, 1.0, "toggle"),
            Brightness | Contrast | Saturation => ParamDomain::new(0.0, 3.0, "factor"),
            Hue => ParamDomain::new(-180.0, 180.0, "degrees"),
            Gamma => ParamDomain::new(0.1, 5.0, "exponent"),
            GaussianBlur => ParamDomain::new(0.0, 20.0, "sigma px"),
            Sharpen => ParamDomain::new(0.0, 10.0, "amount"),
            GaussianNoise => ParamDomain::new(0.0, 255.0, "std-dev"),
            SaltPepperNoise => ParamDomain::new(0.0, 1.0, "pixel fraction"),
            Cutout => ParamDomain::new(0.0, 1.0, "area fraction"),
            Rain | Snow | Fog => ParamDomain::new(0.0, 1.0, "intensity"),
        }
    }

    /// Parameters used when a kind is enabled without explicit settings.
    pub fn default_params(&self) -> TransformParams {
        use TransformKind::*;
        let range = |min, max| TransformParams::Range {
            min,
            max,
            sample_count: 3,
        };
        let intensity = |value, sample_count| TransformParams::Intensity {
            value,
            sample_count,
        };
        match self {
            Rotation => range(-15.0, 15.0),
            Scaling => range(0.8, 1.2),
            Translation => range(-0.1, 0.1),
            FlipHorizontal | FlipVertical => TransformParams::Toggle,
            Brightness | Contrast | Saturation => range(0.5, 1.5),
            Hue => range(-30.0, 30.0),
            Gamma => range(0.5, 2.0),
            GaussianBlur => range(0.0, 5.0),
            Sharpen => range(0.5, 2.0),
            GaussianNoise => intensity(25.0, 2),
            SaltPepperNoise => intensity(0.05, 2),
            Cutout => intensity(0.1, 2),
            Rain | Snow | Fog => intensity(0.5, 1),
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransformKind {
    type Err = BoxforgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransformKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| BoxforgeError::validation(format!("unknown transform kind '{s}'")))
    }
}

impl fmt::Display for TransformFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransformFamily::Geometric => "geometric",
            TransformFamily::Color => "color",
            TransformFamily::NoiseFilter => "noise/filter",
            TransformFamily::Occlusion => "occlusion",
            TransformFamily::Weather => "weather",
        };
        f.write_str(name)
    }
}

/// Parameters of one transform, tagged by shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformParams {
    Range {
        min: f64,
        max: f64,
        sample_count: usize,
    },
    Toggle,
    Intensity {
        value: f64,
        sample_count: usize,
    },
}

impl TransformParams {
    pub fn shape(&self) -> ParamShape {
        match self {
            TransformParams::Range { .. } => ParamShape::Range,
            TransformParams::Toggle => ParamShape::Toggle,
            TransformParams::Intensity { .. } => ParamShape::Intensity,
        }
    }

    /// Number of derived images one source image yields.
    pub fn sample_count(&self) -> usize {
        match self {
            TransformParams::Range { sample_count, .. }
            | TransformParams::Intensity { sample_count, .. } => *sample_count,
            TransformParams::Toggle => 1,
        }
    }

    /// The parameter value of each sample, in sample-index order.
    ///
    /// Ranges are sampled at `sample_count` evenly spaced points including
    /// both ends; a single sample is the midpoint. Toggles yield `1.0`.
    pub fn samples(&self) -> Vec<f64> {
        match *self {
            TransformParams::Range {
                min,
                max,
                sample_count,
            } => match sample_count {
                0 => Vec::new(),
                1 => vec![(min + max) / 2.0],
                n => {
                    let step = (max - min) / (n - 1) as f64;
                    (0..n).map(|i| min + i as f64 * step).collect()
                }
            },
            TransformParams::Toggle => vec![1.0],
            TransformParams::Intensity {
                value,
                sample_count,
            } => vec![value; sample_count],
        }
    }
}

fn default_true() -> bool {
    true
}

/// One entry of an augmentation configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransformSpec {
    pub kind: TransformKind,

    #[serde(default = "default_true")]
    pub enabled: bool,

    pub params: TransformParams,
}

impl TransformSpec {
    /// Catalog entry for `kind` with default parameters, disabled.
    pub fn default_for(kind: TransformKind) -> Self {
        Self {
            kind,
            enabled: false,
            params: kind.default_params(),
        }
    }

    /// Enabled ranged transform.
    pub fn range(kind: TransformKind, min: f64, max: f64, sample_count: usize) -> Self {
        Self {
            kind,
            enabled: true,
            params: TransformParams::Range {
                min,
                max,
                sample_count,
            },
        }
    }

    /// Enabled toggle transform (flips).
    pub fn toggle(kind: TransformKind) -> Self {
        Self {
            kind,
            enabled: true,
            params: TransformParams::Toggle,
        }
    }

    /// Enabled stochastic transform at a fixed intensity.
    pub fn intensity(kind: TransformKind, value: f64, sample_count: usize) -> Self {
        Self {
            kind,
            enabled: true,
            params: TransformParams::Intensity {
                value,
                sample_count,
            },
        }
    }

    /// Flip specs for the selected axes; each axis is its own transform.
    pub fn flips(horizontal: bool, vertical: bool) -> Vec<Self> {
        let mut specs = Vec::new();
        if horizontal {
            specs.push(Self::toggle(TransformKind::FlipHorizontal));
        }
        if vertical {
            specs.push(Self::toggle(TransformKind::FlipVertical));
        }
        specs
    }

    /// Samples this spec contributes per eligible image (0 when disabled).
    pub fn effective_sample_count(&self) -> usize {
        if self.enabled {
            self.params.sample_count()
        } else {
            0
        }
    }

    /// Checks the parameter shape, sample count and domain.
    pub fn validate(&self) -> Result<(), BoxforgeError> {
        let kind = self.kind;
        if self.params.shape() != kind.shape() {
            return Err(BoxforgeError::validation(format!(
                "{kind} expects {:?} parameters, got {:?}",
                kind.shape(),
                self.params.shape()
            )));
        }

        let domain = kind.domain();
        let check = |label: &str, value: f64| {
            if domain.contains(value) {
                Ok(())
            } else {
                Err(BoxforgeError::validation(format!(
                    "{kind} {label} {value} is outside [{}, {}] ({})",
                    domain.min, domain.max, domain.unit
                )))
            }
        };

        match self.params {
            TransformParams::Range {
                min,
                max,
                sample_count,
            } => {
                check("min", min)?;
                check("max", max)?;
                if min > max {
                    return Err(BoxforgeError::validation(format!(
                        "{kind} min {min} is greater than max {max}"
                    )));
                }
                if sample_count == 0 {
                    return Err(BoxforgeError::validation(format!(
                        "{kind} sample_count must be at least 1"
                    )));
                }
            }
            TransformParams::Toggle => {}
            TransformParams::Intensity {
                value,
                sample_count,
            } => {
                check("intensity", value)?;
                if sample_count == 0 {
                    return Err(BoxforgeError::validation(format!(
                        "{kind} sample_count must be at least 1"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Every kind with its default parameters, all disabled.
pub fn default_specs() -> Vec<TransformSpec> {
    TransformKind::ALL
        .iter()
        .map(|kind| TransformSpec::default_for(*kind))
        .collect()
}

/// Read-only view over the catalog, one row per kind.
#[derive(Clone, Copy, Debug, Default)]
pub struct TransformCatalog;

impl TransformCatalog {
    pub fn kinds(&self) -> &'static [TransformKind] {
        &TransformKind::ALL
    }

    pub fn default_specs(&self) -> Vec<TransformSpec> {
        default_specs()
    }

    /// Human-readable table of kinds, families, shapes and defaults.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for kind in self.kinds() {
            let domain = kind.domain();
            let default = match kind.default_params() {
                TransformParams::Range {
                    min,
                    max,
                    sample_count,
                } => format!("{min}..{max} x{sample_count}"),
                TransformParams::Toggle => "on".to_string(),
                TransformParams::Intensity {
                    value,
                    sample_count,
                } => format!("{value} x{sample_count}"),
            };
            out.push_str(&format!(
                "{:<18} {:<13} {:<10} [{}, {}] {:<24} default {}\n",
                kind.as_str(),
                kind.family().to_string(),
                format!("{:?}", kind.shape()).to_lowercase(),
                domain.min,
                domain.max,
                domain.unit,
                default
            ));
        }
        out
    }
}
