use crate::shared::face::Face;
use crate::shared::photo::Photo;

/// Domain interface for cropping a face thumbnail out of its source photo.
///
/// Image decoding lives behind this seam. An error means the person backed
/// by this face has no visual identity and is dropped from the persisted
/// output.
pub trait ThumbnailExtractor: Send {
    fn extract(
        &mut self,
        photo: &Photo,
        face: &Face,
    ) -> Result<Vec<u8>, Box<dyn std::error::Error>>;
}

/// Produces empty thumbnails. For headless callers and tests where
/// thumbnail bytes are irrelevant.
pub struct NullThumbnailExtractor;

impl ThumbnailExtractor for NullThumbnailExtractor {
    fn extract(
        &mut self,
        _photo: &Photo,
        _face: &Face,
    ) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        Ok(Vec::new())
    }
}
