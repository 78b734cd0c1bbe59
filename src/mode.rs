//! Display modes and the runtime tunables of the reconstruction pass.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Grayscale linear depth of the captured scene.
    Depth,
    #[default]
    Stereo,
    /// The captured scene colors, unshifted.
    Original,
}

impl DisplayMode {
    pub const ALL: [DisplayMode; 3] = [DisplayMode::Original, DisplayMode::Depth, DisplayMode::Stereo];

    pub fn blend_factors(self) -> BlendFactors {
        match self {
            DisplayMode::Stereo => BlendFactors {
                show_original: 0.0,
                show_depth: 0.0,
            },
            DisplayMode::Depth => BlendFactors {
                show_original: 0.0,
                show_depth: 1.0,
            },
            DisplayMode::Original => BlendFactors {
                show_original: 1.0,
                show_depth: 1.0,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DisplayMode::Depth => "depth",
            DisplayMode::Stereo => "stereo",
            DisplayMode::Original => "original",
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDisplayMode(pub String);

impl fmt::Display for UnknownDisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown display mode '{}', expected depth, stereo or original",
            self.0
        )
    }
}

impl std::error::Error for UnknownDisplayMode {}

impl FromStr for DisplayMode {
    type Err = UnknownDisplayMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "depth" => Ok(DisplayMode::Depth),
            "stereo" => Ok(DisplayMode::Stereo),
            "original" => Ok(DisplayMode::Original),
            other => Err(UnknownDisplayMode(other.to_string())),
        }
    }
}

/// Weights of the nested output blend
/// `lerp(stereo, lerp(depth_gray, original, show_original), show_depth)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendFactors {
    pub show_original: f32,
    pub show_depth: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructionParameters {
    /// On-screen distance between pattern repetitions, in pixels.
    pub repeat_size: f32,
    /// Fraction of `repeat_size` the nearest surface shortens a step by.
    pub max_step_fraction: f32,
    pub display_mode: DisplayMode,
}

impl Default for ReconstructionParameters {
    fn default() -> Self {
        Self {
            repeat_size: 100.0,
            max_step_fraction: 0.3,
            display_mode: DisplayMode::Stereo,
        }
    }
}

impl ReconstructionParameters {
    /// Largest distance a single step can be shortened by.
    pub fn max_step(&self) -> f32 {
        self.repeat_size * self.max_step_fraction
    }
}

/// Owns the tunables. The renderer reads one snapshot per frame, so any setter
/// called between frames takes effect on the next one.
///
/// Values are taken as given; clamping belongs to whatever UI drives the setters.
#[derive(Debug, Clone, Default)]
pub struct ModeController {
    params: ReconstructionParameters,
}

impl ModeController {
    pub fn new(params: ReconstructionParameters) -> Self {
        Self { params }
    }

    pub fn set_display_mode(&mut self, mode: DisplayMode) {
        self.params.display_mode = mode;
    }

    pub fn set_repeat_size(&mut self, px: f32) {
        self.params.repeat_size = px;
    }

    pub fn set_max_step_fraction(&mut self, fraction: f32) {
        self.params.max_step_fraction = fraction;
    }

    pub fn show_depth(&mut self) {
        self.set_display_mode(DisplayMode::Depth);
    }

    pub fn show_stereo(&mut self) {
        self.set_display_mode(DisplayMode::Stereo);
    }

    pub fn show_original(&mut self) {
        self.set_display_mode(DisplayMode::Original);
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.params.display_mode
    }

    pub fn repeat_size(&self) -> f32 {
        self.params.repeat_size
    }

    pub fn max_step_fraction(&self) -> f32 {
        self.params.max_step_fraction
    }

    /// The frozen parameter set for one frame.
    pub fn snapshot(&self) -> ReconstructionParameters {
        self.params
    }
}
