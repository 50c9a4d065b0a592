//! Builds person-facing summaries out of repaired clusters.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::shared::constants::MAX_ANCHORS;
use crate::shared::face::SkinTone;

use super::cluster_engine::ClusterMember;

/// A validated cluster reduced to its representative data.
#[derive(Clone, Debug)]
pub struct ClusterSummary {
    /// Members ordered by effective quality, best first.
    pub members: Vec<ClusterMember>,
    /// Up to `MAX_ANCHORS` descriptors spanning the cluster's appearance
    /// variation, used to match the person without comparing every face.
    pub anchors: Vec<Vec<f32>>,
    pub representative_face_id: String,
    pub representative_photo_id: String,
    pub skin_tone: Option<SkinTone>,
    /// Distinct photos contributing to the cluster. Equals the member
    /// count after repair.
    pub photo_count: usize,
    pub quality_score: f64,
}

impl ClusterSummary {
    pub fn face_ids(&self) -> Vec<String> {
        self.members.iter().map(|m| m.face.id.clone()).collect()
    }
}

/// Summarizes repaired sub-clusters, most-photographed people first.
pub fn summarize(sub_clusters: Vec<Vec<ClusterMember>>) -> Vec<ClusterSummary> {
    let mut summaries: Vec<ClusterSummary> = sub_clusters
        .into_iter()
        .filter(|members| !members.is_empty())
        .map(summarize_one)
        .collect();
    // Stable sort: equal photo counts keep their engine order.
    summaries.sort_by(|a, b| b.photo_count.cmp(&a.photo_count));
    summaries
}

fn summarize_one(mut members: Vec<ClusterMember>) -> ClusterSummary {
    members.sort_by(|a, b| {
        b.face
            .effective_quality()
            .partial_cmp(&a.face.effective_quality())
            .unwrap_or(Ordering::Equal)
    });

    let photo_count: usize = members
        .iter()
        .map(|m| m.photo_id.as_str())
        .collect::<HashSet<_>>()
        .len();
    debug_assert_eq!(
        photo_count,
        members.len(),
        "repaired cluster must hold one face per photo"
    );

    let anchors: Vec<Vec<f32>> = members
        .iter()
        .take(MAX_ANCHORS)
        .map(|m| m.face.descriptor.clone())
        .collect();
    let quality_score =
        members.iter().map(|m| m.face.effective_quality()).sum::<f64>() / members.len() as f64;
    let best = &members[0];

    ClusterSummary {
        anchors,
        representative_face_id: best.face.id.clone(),
        representative_photo_id: best.photo_id.clone(),
        skin_tone: best.face.skin_tone,
        photo_count,
        quality_score,
        members,
    }
}
