//! Post-merge co-occurrence repair.
//!
//! The engine enforces pairwise disjointness at merge time; this pass is
//! the authoritative safety net behind it. It decomposes a cluster along a
//! compatibility graph (edge iff two faces do NOT share a photo) into
//! connected components, and shatters any component the graph still lets
//! pair same-photo faces transitively. Idempotent: valid clusters come
//! back unchanged.

use std::collections::{HashSet, VecDeque};

use super::cluster_engine::ClusterMember;

/// Splits one cluster's members into co-occurrence-valid sub-clusters.
pub fn repair(members: Vec<ClusterMember>) -> Vec<Vec<ClusterMember>> {
    let n = members.len();
    if n <= 1 {
        return if n == 0 { Vec::new() } else { vec![members] };
    }

    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
    for i in 0..n {
        for j in (i + 1)..n {
            if members[i].photo_id != members[j].photo_id {
                adjacency[i].push(j);
                adjacency[j].push(i);
            }
        }
    }

    let components = connected_components(&adjacency);

    let mut slots: Vec<Option<ClusterMember>> = members.into_iter().map(Some).collect();
    let mut result: Vec<Vec<ClusterMember>> = Vec::with_capacity(components.len());
    for component in components {
        let conflicted = has_photo_conflict(&component, &slots);
        if conflicted {
            // The component itself pairs two same-photo faces through a
            // shared neighbor; shatter to singletons rather than guess.
            for idx in component {
                result.push(vec![take_slot(&mut slots, idx)]);
            }
        } else {
            result.push(
                component
                    .into_iter()
                    .map(|idx| take_slot(&mut slots, idx))
                    .collect(),
            );
        }
    }
    result
}

/// Iterative BFS over an index arena; components come out ordered by their
/// smallest member index, members ascending.
fn connected_components(adjacency: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let n = adjacency.len();
    let mut visited = vec![false; n];
    let mut components = Vec::new();

    for start in 0..n {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        let mut queue = VecDeque::from([start]);
        let mut component = vec![start];
        while let Some(current) = queue.pop_front() {
            for &next in &adjacency[current] {
                if !visited[next] {
                    visited[next] = true;
                    component.push(next);
                    queue.push_back(next);
                }
            }
        }
        component.sort_unstable();
        components.push(component);
    }
    components
}

fn has_photo_conflict(component: &[usize], slots: &[Option<ClusterMember>]) -> bool {
    let mut seen: HashSet<&str> = HashSet::with_capacity(component.len());
    for &idx in component {
        if let Some(member) = &slots[idx] {
            if !seen.insert(member.photo_id.as_str()) {
                return true;
            }
        }
    }
    false
}

// Component index sets are disjoint, so every slot is taken exactly once.
fn take_slot(slots: &mut [Option<ClusterMember>], idx: usize) -> ClusterMember {
    slots[idx].take().unwrap()
}
