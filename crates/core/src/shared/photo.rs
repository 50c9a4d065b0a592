use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::face::Face;

/// A photo and the faces detected in it.
///
/// The photo-to-faces association is the sole input to clustering and is
/// read in full on every run; photos whose detection failed simply carry
/// zero faces.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: String,
    #[serde(default)]
    pub source_path: Option<PathBuf>,
    #[serde(default)]
    pub faces: Vec<Face>,
}

impl Photo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source_path: None,
            faces: Vec::new(),
        }
    }
}
