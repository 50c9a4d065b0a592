//! Carries user-assigned names across clustering runs.
//!
//! Cluster ids are regenerated every run, so names survive by content: each
//! new cluster polls its member faces against the previous person set and
//! adopts the name with the most votes.

use std::collections::HashMap;

use crate::clustering::domain::cluster_summarizer::ClusterSummary;
use crate::shared::person::Person;

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedName {
    pub name: String,
    pub auto_named: bool,
}

/// Resolves a display name for every cluster, in cluster order.
///
/// Only user-assigned names vote; generated `Person N` names do not carry
/// forward. Vote ties break by first-seen order while scanning members, and
/// clusters with no votes get `Person N` where N is their 1-based rank.
pub fn resolve_names(previous: &[Person], clusters: &[ClusterSummary]) -> Vec<ResolvedName> {
    let mut name_by_face: HashMap<&str, &str> = HashMap::new();
    for person in previous.iter().filter(|p| !p.auto_named) {
        for face_id in &person.face_ids {
            name_by_face.insert(face_id.as_str(), person.name.as_str());
        }
    }

    clusters
        .iter()
        .enumerate()
        .map(|(rank, cluster)| {
            let mut votes: HashMap<&str, usize> = HashMap::new();
            let mut first_seen: Vec<&str> = Vec::new();
            for member in &cluster.members {
                if let Some(&name) = name_by_face.get(member.face.id.as_str()) {
                    let count = votes.entry(name).or_insert(0);
                    if *count == 0 {
                        first_seen.push(name);
                    }
                    *count += 1;
                }
            }

            let mut winner: Option<(&str, usize)> = None;
            for &name in &first_seen {
                let count = votes[name];
                if winner.map_or(true, |(_, best)| count > best) {
                    winner = Some((name, count));
                }
            }

            match winner {
                Some((name, _)) => ResolvedName {
                    name: name.to_string(),
                    auto_named: false,
                },
                None => ResolvedName {
                    name: format!("Person {}", rank + 1),
                    auto_named: true,
                },
            }
        })
        .collect()
}
