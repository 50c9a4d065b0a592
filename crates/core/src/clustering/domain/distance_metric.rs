//! Fused face distance metric.
//!
//! Embedding distance alone is not robust against lookalikes across lighting
//! and pose; landmark proportions, skin tone, and box shape are blended in
//! to buy precision at a controlled recall cost. Auxiliary terms degrade to
//! neutral values when their inputs are absent, so a comparison never fails.

use crate::shared::constants::{
    DEFAULT_EMBEDDING_WEIGHT, DEFAULT_LANDMARK_WEIGHT, DEFAULT_SHAPE_WEIGHT,
    DEFAULT_SKIN_TONE_WEIGHT, LANDMARK_COUNT, LEFT_EYE_OUTER, MAX_RGB_DISTANCE,
    MOUTH_INNER_BOTTOM, MOUTH_INNER_TOP, NOSE_TIP, RIGHT_EYE_OUTER,
};
use crate::shared::face::Face;

/// Relative term weights. Expected to sum to 1.0.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistanceWeights {
    pub embedding: f64,
    pub landmarks: f64,
    pub skin_tone: f64,
    pub shape: f64,
}

impl Default for DistanceWeights {
    fn default() -> Self {
        Self {
            embedding: DEFAULT_EMBEDDING_WEIGHT,
            landmarks: DEFAULT_LANDMARK_WEIGHT,
            skin_tone: DEFAULT_SKIN_TONE_WEIGHT,
            shape: DEFAULT_SHAPE_WEIGHT,
        }
    }
}

/// Weighted distance between two faces. Symmetric, >= 0.
///
/// All terms except the raw embedding distance are clamped into [0,1]
/// before weighting.
pub fn distance(a: &Face, b: &Face, weights: &DistanceWeights) -> f64 {
    weights.embedding * embedding_distance(&a.descriptor, &b.descriptor)
        + weights.landmarks * clamp01(landmark_distance(a, b))
        + weights.skin_tone * clamp01(skin_tone_distance(a, b))
        + weights.shape * clamp01(shape_distance(a, b))
}

/// Euclidean distance between descriptors, unnormalized as produced by the
/// embedding extractor.
fn embedding_distance(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = (*x as f64) - (*y as f64);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Mean absolute difference of the two scale-invariant landmark ratios.
///
/// Contributes 0 when landmarks are missing or malformed on either side.
fn landmark_distance(a: &Face, b: &Face) -> f64 {
    match (proportion_ratios(a), proportion_ratios(b)) {
        (Some((a1, a2)), Some((b1, b2))) => ((a1 - b1).abs() + (a2 - b2).abs()) / 2.0,
        _ => 0.0,
    }
}

/// (eye-to-nose, nose-to-mouth) each normalized by the inter-eye distance.
fn proportion_ratios(face: &Face) -> Option<(f64, f64)> {
    let landmarks = face.landmarks.as_ref()?;
    if landmarks.len() < LANDMARK_COUNT {
        return None;
    }

    let left_eye = landmarks[LEFT_EYE_OUTER];
    let right_eye = landmarks[RIGHT_EYE_OUTER];
    let nose = landmarks[NOSE_TIP];
    let mouth = midpoint(landmarks[MOUTH_INNER_TOP], landmarks[MOUTH_INNER_BOTTOM]);

    let inter_eye = point_distance(left_eye, right_eye);
    if inter_eye <= f64::EPSILON {
        return None;
    }

    let eye_mid = midpoint(left_eye, right_eye);
    Some((
        point_distance(eye_mid, nose) / inter_eye,
        point_distance(nose, mouth) / inter_eye,
    ))
}

/// Normalized RGB distance; a missing tone on either side reads as
/// maximally dissimilar so tone absence never causes a spurious merge.
fn skin_tone_distance(a: &Face, b: &Face) -> f64 {
    match (&a.skin_tone, &b.skin_tone) {
        (Some(ta), Some(tb)) => ta.distance(tb) / MAX_RGB_DISTANCE,
        _ => 1.0,
    }
}

fn shape_distance(a: &Face, b: &Face) -> f64 {
    (a.bounding_box.aspect_ratio() - b.bounding_box.aspect_ratio()).abs()
}

fn clamp01(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

fn midpoint(a: (f64, f64), b: (f64, f64)) -> (f64, f64) {
    ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0)
}

fn point_distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}
