//! LBVH construction: Morton sort, Karras radix tree, bottom-up bbox fill

use rayon::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

use crate::core::types::Vec3;
use crate::math::{morton, Aabb, Triangle};

use super::node::{Bvh, InternalNode, LeafNode, NO_PARENT};

/// Build the LBVH for a triangle slice
pub(crate) fn build(tris: &[Triangle]) -> Bvh<'_> {
    let n = tris.len();
    if n == 0 {
        return Bvh { tris, internals: Vec::new(), leaves: Vec::new() };
    }

    let start = Instant::now();

    // Per-triangle bounds and the scene box that normalizes centroids
    let aabbs: Vec<Aabb> = tris.par_iter().map(Triangle::aabb).collect();
    let scene = aabbs
        .par_iter()
        .copied()
        .reduce(Aabb::empty, |a, b| a.merged(&b));

    // Degenerate extents collapse to a single Morton slice
    let size = scene.size();
    let extent = Vec3::new(
        if size.x > 0.0 { size.x } else { 1.0 },
        if size.y > 0.0 { size.y } else { 1.0 },
        if size.z > 0.0 { size.z } else { 1.0 },
    );

    let codes: Vec<u32> = tris
        .par_iter()
        .map(|t| morton::morton_from_unit((t.centroid() - scene.min) / extent))
        .collect();

    // Stable sort of the identity permutation; duplicate codes keep
    // ascending triangle id
    let mut order: Vec<u32> = (0..n as u32).collect();
    order.sort_by_key(|&i| codes[i as usize]);

    let leaves: Vec<LeafNode> = order
        .par_iter()
        .map(|&i| LeafNode {
            bbox: aabbs[i as usize],
            tri: i,
            parent: NO_PARENT,
        })
        .collect();

    if n == 1 {
        return Bvh { tris, internals: Vec::new(), leaves };
    }

    // Effective sort keys: the Morton code with the triangle id appended,
    // so every pair of leaves has a unique prefix
    let keys: Vec<u64> = order
        .iter()
        .map(|&i| ((codes[i as usize] as u64) << 32) | i as u64)
        .collect();

    // Radix tree topology (Karras 2012), one internal node per worker
    let n_int = n - 1;
    let children: Vec<(u32, u32)> = (0..n_int)
        .into_par_iter()
        .map(|i| node_children(&keys, i))
        .collect();

    let mut internals: Vec<InternalNode> = children
        .iter()
        .map(|&(left, right)| InternalNode {
            bbox: Aabb::empty(),
            left,
            right,
            parent: NO_PARENT,
        })
        .collect();
    let mut leaves = leaves;
    for (i, &(left, right)) in children.iter().enumerate() {
        for child in [left, right] {
            if (child as usize) < n_int {
                internals[child as usize].parent = i as u32;
            } else {
                leaves[child as usize - n_int].parent = i as u32;
            }
        }
    }

    fill_bboxes(&mut internals, &leaves, n_int);

    log::debug!(
        "built LBVH over {} triangles in {:.2}ms",
        n,
        start.elapsed().as_secs_f64() * 1000.0
    );

    Bvh { tris, internals, leaves }
}

/// Bottom-up bbox fill with atomic parent-visitation counters
///
/// Every leaf climbs toward the root. The first arrival at an internal node
/// stops (its sibling subtree is not done); the second arrival unions the
/// children boxes, publishes the node and continues upward. Each internal
/// node is therefore written exactly once.
fn fill_bboxes(internals: &mut [InternalNode], leaves: &[LeafNode], n_int: usize) {
    let counters: Vec<AtomicU32> = (0..n_int).map(|_| AtomicU32::new(0)).collect();
    let filled: Vec<OnceLock<Aabb>> = (0..n_int).map(|_| OnceLock::new()).collect();

    {
        let internals = &*internals;
        let child_bbox = |id: u32| -> Aabb {
            if (id as usize) < n_int {
                *filled[id as usize]
                    .get()
                    .expect("child bbox published before parent ascent")
            } else {
                leaves[id as usize - n_int].bbox
            }
        };

        leaves.par_iter().for_each(|leaf| {
            let mut node = leaf.parent;
            while node != NO_PARENT {
                if counters[node as usize].fetch_add(1, Ordering::AcqRel) == 0 {
                    break;
                }
                let int = &internals[node as usize];
                let bbox = child_bbox(int.left).merged(&child_bbox(int.right));
                let _ = filled[node as usize].set(bbox);
                node = int.parent;
            }
        });
    }

    for (int, cell) in internals.iter_mut().zip(filled) {
        int.bbox = cell
            .into_inner()
            .expect("every internal node is visited twice");
    }
}

/// Number of leading bits shared by the keys at i and j, or -1 out of range
#[inline]
fn delta(keys: &[u64], i: i64, j: i64) -> i64 {
    if j < 0 || j >= keys.len() as i64 {
        return -1;
    }
    // Keys are unique (id bits appended), so the xor is never zero
    (keys[i as usize] ^ keys[j as usize]).leading_zeros() as i64
}

/// Children of internal node i per Karras 2012
///
/// Determines the node's key range by expanding away from i while the common
/// prefix stays above the neighbor's, then binary-searches the split point.
fn node_children(keys: &[u64], i: usize) -> (u32, u32) {
    let n_int = (keys.len() - 1) as i64;
    let i = i as i64;

    let d: i64 = if delta(keys, i, i + 1) > delta(keys, i, i - 1) {
        1
    } else {
        -1
    };
    let delta_min = delta(keys, i, i - d);

    let mut l_max = 2i64;
    while delta(keys, i, i + l_max * d) > delta_min {
        l_max *= 2;
    }

    let mut l = 0i64;
    let mut t = l_max / 2;
    while t >= 1 {
        if delta(keys, i, i + (l + t) * d) > delta_min {
            l += t;
        }
        t /= 2;
    }
    let j = i + l * d;

    let delta_node = delta(keys, i, j);
    let mut s = 0i64;
    let mut t = l;
    while t > 1 {
        t = (t + 1) / 2;
        if delta(keys, i, i + (s + t) * d) > delta_node {
            s += t;
        }
    }
    let gamma = i + s * d + d.min(0);

    let left = if i.min(j) == gamma {
        n_int + gamma
    } else {
        gamma
    };
    let right = if i.max(j) == gamma + 1 {
        n_int + gamma + 1
    } else {
        gamma + 1
    };

    (left as u32, right as u32)
}
