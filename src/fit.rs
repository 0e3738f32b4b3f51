use crate::viewport::{MIN_SANE_SCALE, Rotation};

/// Computes the deterministic fit-to-window scale for an image inside a
/// surface.
///
/// The basis is the image's *physical* footprint: the column count is
/// stretched by the pixel aspect ratio (column spacing over row spacing)
/// before comparing against the surface, and the width/height basis is
/// swapped for quarter turns. Same inputs always yield the same scale; the
/// caller pairs the result with a zeroed translation.
pub fn fit_scale(
    rows: u32,
    columns: u32,
    surface_width: u32,
    surface_height: u32,
    rotation: Rotation,
    pixel_aspect_ratio: Option<f32>,
) -> f32 {
    if rows == 0 || columns == 0 || surface_width == 0 || surface_height == 0 {
        return MIN_SANE_SCALE;
    }

    let par = pixel_aspect_ratio.unwrap_or(1.0);
    let physical_width = columns as f32 * par;
    let physical_height = rows as f32;

    let (basis_width, basis_height) = if rotation.is_sideways() {
        (physical_height, physical_width)
    } else {
        (physical_width, physical_height)
    };

    let scale = (surface_width as f32 / basis_width).min(surface_height as f32 / basis_height);
    scale.max(MIN_SANE_SCALE)
}
