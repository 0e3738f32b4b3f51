use serde::{Deserialize, Serialize};

/// What a mouse wheel tick means for the bound stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WheelMode {
    /// Wheel steps through slices.
    Slice,
    /// Wheel zooms.
    Zoom,
    /// Wheel steps through slices, zooms while the modifier key is held.
    #[default]
    Mixed,
}

/// Lifecycle phase of one stack binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Unbound,
    Initializing,
    Ready,
    Loading,
    Detached,
}

impl Phase {
    /// True while a stack is bound and the surface is enabled.
    pub fn is_bound(self) -> bool {
        matches!(self, Phase::Initializing | Phase::Ready | Phase::Loading)
    }
}
