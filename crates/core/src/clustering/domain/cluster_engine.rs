//! Constrained average-linkage agglomerative clustering.
//!
//! Merges face nodes bottom-up until no pair under the threshold remains,
//! under a hard co-occurrence constraint: two faces detected in the same
//! photo can never share a cluster, directly or through absorption. Pair
//! validity is re-checked at selection time because photo sets grow as
//! nodes merge.
//!
//! Quadratic in the number of faces (full pair table, O(|A|*|B|) linkage
//! updates per merge). Sized for per-session photo volumes, not web scale.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::shared::constants::DEFAULT_MATCH_THRESHOLD;
use crate::shared::face::Face;
use crate::shared::photo::Photo;

use super::distance_metric::{distance, DistanceWeights};

#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("descriptor length mismatch: face {face_id} has {actual} dims, expected {expected}")]
    DescriptorLengthMismatch {
        face_id: String,
        expected: usize,
        actual: usize,
    },
}

/// Tunable clustering parameters. The defaults are a starting calibration,
/// not a guaranteed-correct one; expose them to callers rather than pinning
/// call sites to constants.
#[derive(Clone, Copy, Debug)]
pub struct ClusterParams {
    pub threshold: f64,
    pub weights: DistanceWeights,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MATCH_THRESHOLD,
            weights: DistanceWeights::default(),
        }
    }
}

/// A face together with the photo it was detected in.
#[derive(Clone, Debug)]
pub struct ClusterMember {
    pub face: Face,
    pub photo_id: String,
}

/// An unvalidated cluster as produced by the engine, before repair.
#[derive(Clone, Debug)]
pub struct RawCluster {
    pub members: Vec<ClusterMember>,
}

struct Node {
    faces: Vec<usize>,
    photos: HashSet<usize>,
    active: bool,
}

/// Clusters all faces across `photos`.
///
/// Photos are ordered by id internally, so the result does not depend on
/// input ordering. Ties on merge distance break by lexicographic node-index
/// order, which together with the ordering makes runs deterministic for a
/// given face set and threshold.
pub fn cluster(photos: &[Photo], params: &ClusterParams) -> Result<Vec<RawCluster>, ClusterError> {
    let mut ordered: Vec<&Photo> = photos.iter().collect();
    ordered.sort_by(|a, b| a.id.cmp(&b.id));

    // Flatten to one slot per face; slot order is the canonical index space.
    let mut slots: Vec<(&Face, usize)> = Vec::new();
    for (photo_idx, photo) in ordered.iter().enumerate() {
        for face in &photo.faces {
            slots.push((face, photo_idx));
        }
    }

    let n = slots.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let expected = slots[0].0.descriptor.len();
    for (face, _) in &slots {
        if face.descriptor.len() != expected {
            return Err(ClusterError::DescriptorLengthMismatch {
                face_id: face.id.clone(),
                expected,
                actual: face.descriptor.len(),
            });
        }
    }

    // Face-pair distances, computed once. Same-photo pairs are infinity:
    // never below any threshold, never a merge candidate.
    let mut face_dist = vec![0.0f64; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = if slots[i].1 == slots[j].1 {
                f64::INFINITY
            } else {
                distance(slots[i].0, slots[j].0, &params.weights)
            };
            face_dist[i * n + j] = d;
            face_dist[j * n + i] = d;
        }
    }

    let mut nodes: Vec<Node> = (0..n)
        .map(|i| Node {
            faces: vec![i],
            photos: HashSet::from([slots[i].1]),
            active: true,
        })
        .collect();

    // Sparse candidate table: only pairs already below threshold are kept,
    // since a pair at or above it can never be chosen.
    let mut candidates: HashMap<(usize, usize), f64> = HashMap::new();
    for i in 0..n {
        for j in (i + 1)..n {
            let d = face_dist[i * n + j];
            if d < params.threshold {
                candidates.insert((i, j), d);
            }
        }
    }

    loop {
        // Minimum valid pair. Photo-set disjointness must be re-verified
        // here, not only at table build time: sets grow after merges.
        let mut best: Option<(f64, usize, usize)> = None;
        for (&(i, j), &d) in &candidates {
            if !nodes[i].active || !nodes[j].active {
                continue;
            }
            if !nodes[i].photos.is_disjoint(&nodes[j].photos) {
                continue;
            }
            let entry = (d, i, j);
            let is_better = match best {
                None => true,
                Some(b) => entry.0 < b.0 || (entry.0 == b.0 && (entry.1, entry.2) < (b.1, b.2)),
            };
            if is_better {
                best = Some(entry);
            }
        }

        let Some((_, i, j)) = best else {
            break;
        };

        // Absorb j into i.
        let absorbed_faces = std::mem::take(&mut nodes[j].faces);
        let absorbed_photos = std::mem::take(&mut nodes[j].photos);
        nodes[j].active = false;
        nodes[i].faces.extend(absorbed_faces);
        nodes[i].photos.extend(absorbed_photos);

        // Refresh the merged node's rows with average linkage.
        candidates.retain(|&(a, b), _| a != i && b != i && a != j && b != j);
        for (k, other) in nodes.iter().enumerate() {
            if k == i || !other.active {
                continue;
            }
            if !nodes[i].photos.is_disjoint(&other.photos) {
                continue;
            }
            let d = average_linkage(&nodes[i].faces, &other.faces, &face_dist, n);
            if d < params.threshold {
                candidates.insert((i.min(k), i.max(k)), d);
            }
        }
    }

    let mut clusters: Vec<RawCluster> = nodes
        .iter()
        .filter(|node| node.active)
        .map(|node| {
            let mut indices = node.faces.clone();
            indices.sort_unstable();
            RawCluster {
                members: indices
                    .into_iter()
                    .map(|idx| ClusterMember {
                        face: slots[idx].0.clone(),
                        photo_id: ordered[slots[idx].1].id.clone(),
                    })
                    .collect(),
            }
        })
        .collect();
    clusters.sort_by_key(|c| {
        c.members
            .first()
            .map(|m| m.face.id.clone())
            .unwrap_or_default()
    });
    Ok(clusters)
}

/// Mean of the face-pair distances across two clusters.
fn average_linkage(a: &[usize], b: &[usize], face_dist: &[f64], n: usize) -> f64 {
    let mut sum = 0.0;
    for &fa in a {
        for &fb in b {
            sum += face_dist[fa * n + fb];
        }
    }
    sum / (a.len() * b.len()) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::face::FaceBox;
    use rstest::rstest;
    use std::collections::HashSet;

    fn face(id: &str, descriptor: Vec<f32>) -> Face {
        Face {
            id: id.into(),
            bounding_box: FaceBox {
                x: 0.0,
                y: 0.0,
                width: 100.0,
                height: 100.0,
            },
            descriptor,
            landmarks: None,
            score: 0.9,
            quality: None,
            skin_tone: None,
        }
    }

    fn photo(id: &str, faces: Vec<Face>) -> Photo {
        Photo {
            id: id.into(),
            source_path: None,
            faces,
        }
    }

    fn params(threshold: f64) -> ClusterParams {
        ClusterParams {
            threshold,
            ..ClusterParams::default()
        }
    }

    /// Membership as a set of sorted face-id groups, ignoring cluster order.
    fn membership(clusters: &[RawCluster]) -> HashSet<Vec<String>> {
        clusters
            .iter()
            .map(|c| {
                let mut ids: Vec<String> =
                    c.members.iter().map(|m| m.face.id.clone()).collect();
                ids.sort();
                ids
            })
            .collect()
    }

    // With no landmarks/skin tone and equal boxes, the metric reduces to
    // 0.6 * embedding_distance + 0.15 (missing-tone floor).
    fn metric_floor(embedding_distance: f64) -> f64 {
        0.6 * embedding_distance + 0.15
    }

    #[test]
    fn test_empty_input_yields_no_clusters() {
        let clusters = cluster(&[], &ClusterParams::default()).unwrap();
        assert!(clusters.is_empty());
    }

    #[test]
    fn test_single_face_becomes_singleton() {
        let photos = vec![photo("p1", vec![face("a", vec![0.0])])];
        let clusters = cluster(&photos, &ClusterParams::default()).unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members.len(), 1);
        assert_eq!(clusters[0].members[0].photo_id, "p1");
    }

    #[test]
    fn test_merges_similar_faces_across_photos() {
        let photos = vec![
            photo("p1", vec![face("a", vec![0.0])]),
            photo("p2", vec![face("b", vec![0.05])]),
        ];
        // metric_floor(0.05) = 0.18, well under the default threshold
        let clusters = cluster(&photos, &ClusterParams::default()).unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members.len(), 2);
    }

    #[test]
    fn test_keeps_dissimilar_faces_apart() {
        let photos = vec![
            photo("p1", vec![face("a", vec![0.0])]),
            photo("p2", vec![face("b", vec![5.0])]),
        ];
        let clusters = cluster(&photos, &ClusterParams::default()).unwrap();
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn test_same_photo_twins_never_merge() {
        // Near-identical descriptors (twins, or a detector duplicate) in
        // one photo: distance would be far below threshold, but the
        // exclusion wins.
        let photos = vec![photo(
            "p1",
            vec![face("a", vec![0.0]), face("b", vec![0.01])],
        )];
        let clusters = cluster(&photos, &ClusterParams::default()).unwrap();
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn test_exclusion_survives_absorption() {
        // a (p1) and b (p2) merge; c is in p1 and close to b. The merged
        // {a,b} node now owns photo p1, so c must stay out even though the
        // b-c pair alone is valid.
        let photos = vec![
            photo("p1", vec![face("a", vec![0.0]), face("c", vec![0.1])]),
            photo("p2", vec![face("b", vec![0.02])]),
        ];
        let clusters = cluster(&photos, &ClusterParams::default()).unwrap();
        let groups = membership(&clusters);
        assert!(groups.contains(&vec!["a".to_string(), "b".to_string()]));
        assert!(groups.contains(&vec!["c".to_string()]));
    }

    #[test]
    fn test_threshold_zero_degenerates_to_singletons() {
        let photos: Vec<Photo> = (0..5)
            .map(|i| photo(&format!("p{i}"), vec![face(&format!("f{i}"), vec![0.0])]))
            .collect();
        let clusters = cluster(&photos, &params(0.0)).unwrap();
        assert_eq!(clusters.len(), 5);
        for c in &clusters {
            assert_eq!(c.members.len(), 1);
        }
    }

    #[test]
    fn test_partition_invariant() {
        let photos = vec![
            photo("p1", vec![face("a1", vec![0.0]), face("b1", vec![3.0])]),
            photo("p2", vec![face("a2", vec![0.05]), face("c1", vec![6.0])]),
            photo("p3", vec![face("b2", vec![3.05]), face("c2", vec![6.05])]),
        ];
        let clusters = cluster(&photos, &ClusterParams::default()).unwrap();

        let mut seen: Vec<String> = clusters
            .iter()
            .flat_map(|c| c.members.iter().map(|m| m.face.id.clone()))
            .collect();
        seen.sort();
        assert_eq!(seen, vec!["a1", "a2", "b1", "b2", "c1", "c2"]);
    }

    #[test]
    fn test_disjointness_invariant() {
        let photos = vec![
            photo("p1", vec![face("a1", vec![0.0]), face("b1", vec![0.2])]),
            photo("p2", vec![face("a2", vec![0.05]), face("b2", vec![0.25])]),
            photo("p3", vec![face("a3", vec![0.1]), face("b3", vec![0.3])]),
        ];
        let clusters = cluster(&photos, &ClusterParams::default()).unwrap();
        for c in &clusters {
            let photo_ids: HashSet<&str> =
                c.members.iter().map(|m| m.photo_id.as_str()).collect();
            assert_eq!(
                photo_ids.len(),
                c.members.len(),
                "cluster holds two faces from one photo"
            );
        }
    }

    #[test]
    fn test_deterministic_across_input_order() {
        let mut photos = vec![
            photo("p1", vec![face("a1", vec![0.0])]),
            photo("p2", vec![face("a2", vec![0.05]), face("b1", vec![4.0])]),
            photo("p3", vec![face("b2", vec![4.05])]),
        ];
        let forward = cluster(&photos, &ClusterParams::default()).unwrap();
        photos.reverse();
        let reversed = cluster(&photos, &ClusterParams::default()).unwrap();
        assert_eq!(membership(&forward), membership(&reversed));
    }

    #[test]
    fn test_repeated_runs_identical_membership() {
        let photos = vec![
            photo("p1", vec![face("a", vec![0.0, 1.0])]),
            photo("p2", vec![face("b", vec![0.1, 1.0])]),
            photo("p3", vec![face("c", vec![0.2, 1.1])]),
        ];
        let first = cluster(&photos, &ClusterParams::default()).unwrap();
        let second = cluster(&photos, &ClusterParams::default()).unwrap();
        assert_eq!(membership(&first), membership(&second));
    }

    #[test]
    fn test_average_linkage_gates_chain_merges() {
        // a-b are close (0.21); c sits at embedding distance 0.5 from b and
        // 0.6 from a. After {a,b} merges, linkage to c is the mean
        // (metric_floor(0.5) + metric_floor(0.6)) / 2 = 0.48 < 0.65, so the
        // chain completes. With a threshold under that mean (but above the
        // a-b pair), c stays out.
        let photos = vec![
            photo("p1", vec![face("a", vec![0.0])]),
            photo("p2", vec![face("b", vec![0.1])]),
            photo("p3", vec![face("c", vec![0.6])]),
        ];
        let merged = cluster(&photos, &ClusterParams::default()).unwrap();
        assert_eq!(merged.len(), 1);

        let mean_link = (metric_floor(0.5) + metric_floor(0.6)) / 2.0;
        let gated = cluster(&photos, &params(mean_link - 0.01)).unwrap();
        let groups = membership(&gated);
        assert!(groups.contains(&vec!["a".to_string(), "b".to_string()]));
        assert!(groups.contains(&vec!["c".to_string()]));
    }

    #[rstest]
    #[case(0.3, 0.5)]
    #[case(0.4, 0.65)]
    #[case(0.5, 0.9)]
    fn test_threshold_monotonicity(#[case] low: f64, #[case] high: f64) {
        // Raising the threshold may only merge further, never split.
        let photos = vec![
            photo("p1", vec![face("a", vec![0.0]), face("d", vec![9.0])]),
            photo("p2", vec![face("b", vec![0.2])]),
            photo("p3", vec![face("c", vec![0.55])]),
            photo("p4", vec![face("e", vec![9.3])]),
        ];
        let tight = cluster(&photos, &params(low)).unwrap();
        let loose = cluster(&photos, &params(high)).unwrap();

        let loose_groups: Vec<HashSet<String>> = loose
            .iter()
            .map(|c| c.members.iter().map(|m| m.face.id.clone()).collect())
            .collect();
        for c in &tight {
            let ids: HashSet<String> =
                c.members.iter().map(|m| m.face.id.clone()).collect();
            assert!(
                loose_groups.iter().any(|g| ids.is_subset(g)),
                "cluster {ids:?} from threshold {low} not contained at {high}"
            );
        }
    }

    #[test]
    fn test_descriptor_length_mismatch_fails_loudly() {
        let photos = vec![
            photo("p1", vec![face("a", vec![0.0, 0.0])]),
            photo("p2", vec![face("b", vec![0.0])]),
        ];
        let err = cluster(&photos, &ClusterParams::default()).unwrap_err();
        match err {
            ClusterError::DescriptorLengthMismatch {
                face_id,
                expected,
                actual,
            } => {
                assert_eq!(face_id, "b");
                assert_eq!(expected, 2);
                assert_eq!(actual, 1);
            }
        }
    }
}
