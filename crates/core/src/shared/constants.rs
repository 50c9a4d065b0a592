/// Merge threshold the clustering engine stops at. Calibrated against
/// per-session photo sets; tune together with the distance weights.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.65;

/// Distance metric weights. Must sum to 1.0.
pub const DEFAULT_EMBEDDING_WEIGHT: f64 = 0.60;
pub const DEFAULT_LANDMARK_WEIGHT: f64 = 0.20;
pub const DEFAULT_SKIN_TONE_WEIGHT: f64 = 0.15;
pub const DEFAULT_SHAPE_WEIGHT: f64 = 0.05;

/// Max representative descriptors retained per person.
pub const MAX_ANCHORS: usize = 5;

/// Quiet period after the last detection completion before a re-cluster fires.
pub const DEBOUNCE_QUIET_MS: u64 = 500;

/// Indices into a 68-point landmark set.
pub const LEFT_EYE_OUTER: usize = 36;
pub const RIGHT_EYE_OUTER: usize = 45;
pub const NOSE_TIP: usize = 30;
/// Inner-lip top/bottom; their midpoint is the mouth center, which stays
/// stable across open and closed mouths.
pub const MOUTH_INNER_TOP: usize = 62;
pub const MOUTH_INNER_BOTTOM: usize = 66;

/// Minimum landmark count for the proportion term to engage.
pub const LANDMARK_COUNT: usize = 68;

/// Max possible RGB distance, used to normalize skin tone comparison.
pub const MAX_RGB_DISTANCE: f64 = 441.672_955_930_063_7; // sqrt(255^2 * 3)
