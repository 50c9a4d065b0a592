use serde::{Deserialize, Serialize};

use super::face::SkinTone;

/// A resolved person-identity cluster as persisted between runs.
///
/// Ids are regenerated on every clustering run; display names survive
/// re-clustering through the content-based vote in the name resolver, so
/// `auto_named` marks names that must not cast votes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    pub name: String,
    pub auto_named: bool,
    pub face_ids: Vec<String>,
    pub anchors: Vec<Vec<f32>>,
    pub skin_tone: Option<SkinTone>,
    pub representative_face_id: String,
    pub photo_count: usize,
    pub quality_score: f64,
    pub thumbnail: Vec<u8>,
}

/// The shape handed to the application layer for listing people.
#[derive(Clone, Debug, PartialEq)]
pub struct PersonSummary {
    pub id: String,
    pub name: String,
    pub photo_count: usize,
    pub thumbnail: Vec<u8>,
}

impl Person {
    pub fn summary(&self) -> PersonSummary {
        PersonSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            photo_count: self.photo_count,
            thumbnail: self.thumbnail.clone(),
        }
    }
}
