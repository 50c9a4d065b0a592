use std::collections::HashMap;

use thiserror::Error;

use crate::clustering::domain::cluster_engine::{cluster, ClusterError, ClusterMember, ClusterParams};
use crate::clustering::domain::cluster_repair::repair;
use crate::clustering::domain::cluster_summarizer::summarize;
use crate::detection::domain::thumbnail_extractor::ThumbnailExtractor;
use crate::shared::person::Person;
use crate::shared::photo::Photo;
use crate::storage::domain::identity_store::IdentityStore;

use super::name_resolver::resolve_names;

#[derive(Error, Debug)]
pub enum ReclusterError {
    #[error(transparent)]
    Cluster(#[from] ClusterError),
    #[error("storage failure: {0}")]
    Storage(String),
}

/// One full clustering pass over the current photo set.
///
/// Reads every photo, clusters, repairs, summarizes, resolves names against
/// the previous person set, extracts thumbnails, and swaps the persisted
/// person set atomically. Runs to completion once started; incrementality
/// lives in the orchestrator's scheduling, not here.
pub struct ReclusterUseCase<'a> {
    store: &'a mut dyn IdentityStore,
    thumbnailer: &'a mut dyn ThumbnailExtractor,
    params: ClusterParams,
}

impl<'a> ReclusterUseCase<'a> {
    pub fn new(
        store: &'a mut dyn IdentityStore,
        thumbnailer: &'a mut dyn ThumbnailExtractor,
        params: ClusterParams,
    ) -> Self {
        Self {
            store,
            thumbnailer,
            params,
        }
    }

    /// Executes the pass. `run_seq` salts the generated person ids so ids
    /// from different runs never collide within a process.
    pub fn execute(&mut self, run_seq: u64) -> Result<Vec<Person>, ReclusterError> {
        let photos = self.store.all_photos().map_err(storage_err)?;
        let face_count: usize = photos.iter().map(|p| p.faces.len()).sum();

        if face_count == 0 {
            // Stale person records must not outlive their faces.
            self.store
                .replace_all_persons(Vec::new())
                .map_err(storage_err)?;
            return Ok(Vec::new());
        }

        let raw = cluster(&photos, &self.params)?;
        let validated: Vec<Vec<ClusterMember>> =
            raw.into_iter().flat_map(|c| repair(c.members)).collect();
        let summaries = summarize(validated);

        let previous = self.store.all_persons().map_err(storage_err)?;
        let names = resolve_names(&previous, &summaries);

        let photos_by_id: HashMap<&str, &Photo> =
            photos.iter().map(|p| (p.id.as_str(), p)).collect();

        let mut persons: Vec<Person> = Vec::with_capacity(summaries.len());
        for (rank, (summary, resolved)) in summaries.iter().zip(names).enumerate() {
            let Some(&photo) = photos_by_id.get(summary.representative_photo_id.as_str()) else {
                log::warn!(
                    "skipping person {:?}: source photo {} not found",
                    resolved.name,
                    summary.representative_photo_id
                );
                continue;
            };
            let Some(face) = photo
                .faces
                .iter()
                .find(|f| f.id == summary.representative_face_id)
            else {
                log::warn!(
                    "skipping person {:?}: representative face {} missing from photo {}",
                    resolved.name,
                    summary.representative_face_id,
                    photo.id
                );
                continue;
            };
            let thumbnail = match self.thumbnailer.extract(photo, face) {
                Ok(bytes) => bytes,
                Err(e) => {
                    log::warn!(
                        "skipping person {:?}: thumbnail extraction failed: {e}",
                        resolved.name
                    );
                    continue;
                }
            };

            persons.push(Person {
                id: format!("p{run_seq}-{}", rank + 1),
                name: resolved.name,
                auto_named: resolved.auto_named,
                face_ids: summary.face_ids(),
                anchors: summary.anchors.clone(),
                skin_tone: summary.skin_tone,
                representative_face_id: summary.representative_face_id.clone(),
                photo_count: summary.photo_count,
                quality_score: summary.quality_score,
                thumbnail,
            });
        }

        self.store
            .replace_all_persons(persons.clone())
            .map_err(storage_err)?;
        Ok(persons)
    }
}

fn storage_err(e: Box<dyn std::error::Error>) -> ReclusterError {
    ReclusterError::Storage(e.to_string())
}
