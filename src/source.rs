use std::rc::Rc;

use ndarray::Array2;
use thiserror::Error;

use crate::viewport::{Voi, sanitize_aspect_ratio};

/// Failure to resolve or decode an image identifier.
///
/// Carries owned messages rather than wrapped error types so results can be
/// cloned — shared in-flight loads hand the same outcome to every waiter.
#[derive(Clone, Debug, Error)]
pub enum DecodeError {
    #[error("unknown image identifier: {0}")]
    UnknownId(String),

    #[error("malformed image data: {0}")]
    Malformed(String),

    #[error("image source unreachable: {0}")]
    Unreachable(String),
}

/// A decoded image in its normalized form.
///
/// Produced once by the source adapter; the controller only ever references
/// it behind `Rc` and never re-probes raw metadata.
#[derive(Clone, Debug)]
pub struct DecodedImage {
    /// Pixel values, row-major, shape = (rows, columns).
    pub pixels: Array2<u16>,
    /// Physical row spacing in mm, when the source carried it.
    pub row_spacing: Option<f32>,
    /// Physical column spacing in mm, when the source carried it.
    pub column_spacing: Option<f32>,
    /// True when the photometric interpretation requires display inversion
    /// (MONOCHROME1 and equivalents), independent of any user preference.
    pub native_invert: bool,
    /// Stored bit depth of the original pixel data.
    pub bit_depth: u8,
    /// Window center/width the source suggested for initial display.
    pub default_voi: Option<Voi>,
}

impl DecodedImage {
    pub fn rows(&self) -> u32 {
        self.pixels.nrows() as u32
    }

    pub fn columns(&self) -> u32 {
        self.pixels.ncols() as u32
    }

    /// Column spacing over row spacing, when both are present and positive
    /// and the ratio passes the sanity band. `None` means square pixels.
    pub fn pixel_aspect_ratio(&self) -> Option<f32> {
        match (self.row_spacing, self.column_spacing) {
            (Some(row), Some(column)) if row > 0.0 && column > 0.0 => {
                sanitize_aspect_ratio(column / row)
            }
            _ => None,
        }
    }
}

/// Resolves an image identifier to its decoded form.
///
/// Implementations must be idempotent and cacheable: repeated calls with the
/// same identifier must not re-fetch once the image is cached or in flight.
/// [`CachedSource`] gives any source that property.
///
/// [`CachedSource`]: crate::cache::CachedSource
pub trait ImageSource {
    fn load_image(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Rc<DecodedImage>, DecodeError>>;
}
