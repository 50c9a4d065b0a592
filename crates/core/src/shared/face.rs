use serde::{Deserialize, Serialize};

/// Face bounding box in source-image pixel space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl FaceBox {
    /// Height/width ratio. A degenerate width yields 0 so shape comparison
    /// degrades instead of producing infinities.
    pub fn aspect_ratio(&self) -> f64 {
        if self.width <= 0.0 {
            return 0.0;
        }
        self.height / self.width
    }
}

/// Average {r,g,b} sampled from a central facial patch, 0-255 per channel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkinTone {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl SkinTone {
    pub fn distance(&self, other: &SkinTone) -> f64 {
        let dr = self.r - other.r;
        let dg = self.g - other.g;
        let db = self.b - other.b;
        (dr * dr + dg * dg + db * db).sqrt()
    }
}

/// One detected face. Immutable once produced; owned by the photo it was
/// detected in.
///
/// `descriptor` is the identity embedding from the external extractor; its
/// length must be constant across all faces fed into one clustering run.
/// `landmarks`, `quality`, and `skin_tone` are optional detector extras and
/// every consumer handles the absent branch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Face {
    pub id: String,
    pub bounding_box: FaceBox,
    pub descriptor: Vec<f32>,
    #[serde(default)]
    pub landmarks: Option<Vec<(f64, f64)>>,
    pub score: f64,
    #[serde(default)]
    pub quality: Option<f64>,
    #[serde(default)]
    pub skin_tone: Option<SkinTone>,
}

impl Face {
    /// Composite quality, falling back to detector confidence when the
    /// quality signals were not derived.
    pub fn effective_quality(&self) -> f64 {
        self.quality.unwrap_or(self.score)
    }
}
