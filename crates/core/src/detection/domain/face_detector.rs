use crate::shared::face::Face;
use crate::shared::photo::Photo;

/// Domain interface for the external face detection/embedding stack.
///
/// Implementations own model loading and timeouts; descriptor length must
/// be constant across every face produced for one clustering run. A failed
/// detection is reported as an error and the orchestrator degrades the
/// photo to zero faces.
pub trait FaceDetector: Send {
    fn detect(&mut self, photo: &Photo) -> Result<Vec<Face>, Box<dyn std::error::Error>>;
}
