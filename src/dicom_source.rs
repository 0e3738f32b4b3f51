use std::path::{Path, PathBuf};
use std::rc::Rc;

use dicom::object::{FileDicomObject, InMemDicomObject, open_file};
use dicom::pixeldata::{ConvertOptions, PixelDecoder, VoiLutOption};
use dicom_dictionary_std::tags;
use ndarray::s;

use crate::source::{DecodeError, DecodedImage, ImageSource};
use crate::viewport::Voi;

/// [`ImageSource`] backed by `.dcm` files under a root directory.
///
/// An image identifier is a path relative to the root. Decoding is delegated
/// to the dicom-rs pixeldata pipeline and runs inline on the calling task;
/// wrap the source in [`CachedSource`] so each file is decoded at most once.
///
/// All raw-metadata probing happens here: the rest of the crate only ever
/// sees the normalized [`DecodedImage`].
///
/// [`CachedSource`]: crate::cache::CachedSource
pub struct DicomFileSource {
    root: PathBuf,
}

impl DicomFileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, id: &str) -> Result<PathBuf, DecodeError> {
        let path = self.root.join(id);
        if !path.is_file() {
            return Err(DecodeError::UnknownId(id.to_string()));
        }
        Ok(path)
    }

    fn decode(path: &Path) -> Result<DecodedImage, DecodeError> {
        let object =
            open_file(path).map_err(|error| DecodeError::Malformed(error.to_string()))?;

        let pixel_data = object
            .decode_pixel_data()
            .map_err(|error| DecodeError::Malformed(error.to_string()))?;
        let options = ConvertOptions::new().with_voi_lut(VoiLutOption::First);
        let pixels = pixel_data
            .to_ndarray_with_options::<u16>(&options)
            .map_err(|error| DecodeError::Malformed(error.to_string()))?
            .slice_move(s![0, .., .., 0]);

        let (row_spacing, column_spacing) = Self::pixel_spacing(&object);

        Ok(DecodedImage {
            pixels,
            row_spacing,
            column_spacing,
            native_invert: Self::is_monochrome1(&object),
            bit_depth: Self::bit_depth(&object),
            default_voi: Self::default_voi(&object),
        })
    }

    /// PixelSpacing is ordered row spacing first, column spacing second.
    fn pixel_spacing(
        object: &FileDicomObject<InMemDicomObject>,
    ) -> (Option<f32>, Option<f32>) {
        let spacing = object
            .element(tags::PIXEL_SPACING)
            .ok()
            .and_then(|element| element.to_multi_float32().ok());
        match spacing {
            Some(values) => (values.first().copied(), values.get(1).copied()),
            None => (None, None),
        }
    }

    fn is_monochrome1(object: &FileDicomObject<InMemDicomObject>) -> bool {
        object
            .element(tags::PHOTOMETRIC_INTERPRETATION)
            .ok()
            .and_then(|element| element.to_str().ok())
            .is_some_and(|value| value.trim().eq_ignore_ascii_case("MONOCHROME1"))
    }

    fn bit_depth(object: &FileDicomObject<InMemDicomObject>) -> u8 {
        object
            .element(tags::BITS_STORED)
            .ok()
            .and_then(|element| element.to_int::<u16>().ok())
            .map_or(16, |bits| bits.min(u16::from(u8::MAX)) as u8)
    }

    /// First value of WindowCenter/WindowWidth when both are present; these
    /// may be multi-valued for multi-VOI presets.
    fn default_voi(object: &FileDicomObject<InMemDicomObject>) -> Option<Voi> {
        let first_of = |tag| {
            object
                .element(tag)
                .ok()
                .and_then(|element| element.to_multi_float32().ok())
                .and_then(|values| values.first().copied())
        };
        let center = first_of(tags::WINDOW_CENTER)?;
        let width = first_of(tags::WINDOW_WIDTH)?;
        Some(Voi::clamped(center.round() as i32, width.round() as i32))
    }
}

impl ImageSource for DicomFileSource {
    async fn load_image(&self, id: &str) -> Result<Rc<DecodedImage>, DecodeError> {
        let path = self.resolve(id)?;
        Self::decode(&path).map(Rc::new)
    }
}
