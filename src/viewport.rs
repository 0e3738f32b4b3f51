use serde::{Deserialize, Serialize};

/// Sanity band for pixel aspect ratios. Spacing metadata outside this band is
/// treated as corrupt and discarded.
const PAR_MIN: f32 = 0.2;
const PAR_MAX: f32 = 5.0;

/// Lowest scale the fit computation or a zoom clamp may produce.
pub const MIN_SANE_SCALE: f32 = 0.01;

/// Display rotation, restricted to quarter turns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    /// Rounds an arbitrary angle to the nearest quarter turn, modulo 360.
    /// Non-finite input maps to no rotation.
    pub fn from_degrees(degrees: f32) -> Self {
        if !degrees.is_finite() {
            return Rotation::R0;
        }
        let quarter = (degrees / 90.0).round() as i64;
        match quarter.rem_euclid(4) {
            1 => Rotation::R90,
            2 => Rotation::R180,
            3 => Rotation::R270,
            _ => Rotation::R0,
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 90,
            Rotation::R180 => 180,
            Rotation::R270 => 270,
        }
    }

    /// True when the image's rows run horizontally on screen.
    pub fn is_sideways(self) -> bool {
        matches!(self, Rotation::R90 | Rotation::R270)
    }
}

/// Window center/width (VOI) pair mapped onto displayable contrast.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voi {
    pub center: i32,
    pub width: i32,
}

impl Voi {
    /// Builds a VOI with both values clamped to their safe ranges:
    /// center in `[-32768, 32767]`, width in `[1, 65535]`.
    pub fn clamped(center: i32, width: i32) -> Self {
        Self {
            center: center.clamp(i32::from(i16::MIN), i32::from(i16::MAX)),
            width: width.clamp(1, i32::from(u16::MAX)),
        }
    }

    pub fn with_center(self, center: i32) -> Self {
        Self::clamped(center, self.width)
    }

    pub fn with_width(self, width: i32) -> Self {
        Self::clamped(self.center, width)
    }
}

impl Default for Voi {
    fn default() -> Self {
        Self { center: 0, width: 1 }
    }
}

/// The transform applied when presenting one decoded image.
///
/// Owned exclusively by the controller of the surface it describes. `invert`
/// holds the *effective* inversion (user toggle XOR the image's native
/// photometric inversion), never the raw user toggle.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewportState {
    pub scale: f32,
    pub translation: (f32, f32),
    pub rotation: Rotation,
    pub voi: Option<Voi>,
    pub invert: bool,
    /// True for smooth resampling, false for nearest-neighbour replication.
    pub interpolation: bool,
    pub pixel_aspect_ratio: Option<f32>,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            scale: 1.0,
            translation: (0.0, 0.0),
            rotation: Rotation::R0,
            voi: None,
            invert: false,
            interpolation: true,
            pixel_aspect_ratio: None,
        }
    }
}

impl ViewportState {
    /// Sets the scale, clamped to `[min_zoom, max_zoom]`.
    pub fn set_scale(&mut self, scale: f32, min_zoom: f32, max_zoom: f32) {
        self.scale = clamp_scale(scale, min_zoom, max_zoom);
    }

    /// Adopts a fit result: scale as given, translation zeroed.
    pub fn apply_fit(&mut self, scale: f32) {
        self.scale = scale;
        self.translation = (0.0, 0.0);
    }
}

/// Clamps a zoom value into `[min_zoom, max_zoom]`, rejecting non-finite
/// input in favour of the lower bound.
pub fn clamp_scale(scale: f32, min_zoom: f32, max_zoom: f32) -> f32 {
    if !scale.is_finite() {
        return min_zoom.max(MIN_SANE_SCALE);
    }
    scale.clamp(min_zoom.max(MIN_SANE_SCALE), max_zoom)
}

/// Validates a pixel aspect ratio against the sanity band. Returns `None`
/// for non-finite values or values outside `(0.2, 5.0)`.
pub fn sanitize_aspect_ratio(ratio: f32) -> Option<f32> {
    (ratio.is_finite() && ratio > PAR_MIN && ratio < PAR_MAX).then_some(ratio)
}
