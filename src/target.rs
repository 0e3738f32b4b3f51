use crate::source::DecodedImage;
use crate::viewport::ViewportState;

/// The pixel presentation engine behind one viewport.
///
/// Implemented by the host (a canvas, a GPU texture pane, a test double).
/// All calls are synchronous; the controller sequences them. `disable` must
/// be safe on an already-disabled or never-enabled surface.
pub trait RenderSurface {
    /// Acquire rendering resources for this surface.
    fn enable(&mut self);

    /// Release rendering resources. Idempotent.
    fn disable(&mut self);

    /// Current drawable size in device pixels, (width, height).
    fn dimensions(&self) -> (u32, u32);

    /// Present an image with the given transform.
    fn display(&mut self, image: &DecodedImage, viewport: &ViewportState);

    /// Re-apply a transform to whatever is currently displayed, without
    /// redecoding.
    fn set_viewport(&mut self, viewport: &ViewportState);

    /// The transform currently applied, if anything has been displayed.
    fn viewport(&self) -> Option<ViewportState>;

    /// Notification that the drawable size changed.
    fn resized(&mut self);
}
