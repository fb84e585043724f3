use image::{DynamicImage, ImageBuffer, Rgba};

use crate::result::CvResult;

/// Composited view images carry an alpha channel since the overlay layer is
/// alpha-blended over the alpha-converted source.
pub type ViewImage = ImageBuffer<Rgba<u8>, Vec<u8>>;
pub type ResultImage = CvResult<DynamicImage>;
