use serde::{Deserialize, Serialize};

use crate::enums::WheelMode;

/// Tunables for one viewport controller.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ViewerOptions {
    /// Lower zoom bound.
    pub min_zoom: f32,
    /// Upper zoom bound.
    pub max_zoom: f32,
    /// Multiplicative step for one wheel zoom tick.
    pub zoom_step: f32,
    /// Recompute the deterministic fit on attach, slice change and resize.
    pub fit_to_window: bool,
    #[serde(default)]
    pub wheel_mode: WheelMode,
    /// How long after a wheel zoom the fit stays suppressed on resize.
    pub manual_zoom_hold_ms: u64,
    #[serde(default)]
    pub prefetch: PrefetchOptions,
    /// Cine playback rate, clamped to `[1, 60]` at the clock.
    pub cine_fps: f64,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            min_zoom: 0.1,
            max_zoom: 5.0,
            zoom_step: 0.2,
            fit_to_window: true,
            wheel_mode: WheelMode::default(),
            manual_zoom_hold_ms: 600,
            prefetch: PrefetchOptions::default(),
            cine_fps: 12.0,
        }
    }
}

/// Tunables for background prefetch of neighbouring slices.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PrefetchOptions {
    pub enabled: bool,
    /// Neighbour window: slices within this distance of the current index
    /// are warmed.
    pub window: usize,
    /// Maximum simultaneous decode operations.
    pub concurrency: usize,
}

impl Default for PrefetchOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            window: 2,
            concurrency: 4,
        }
    }
}
