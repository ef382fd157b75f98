//! Density clustering with a size-adaptive similarity cutoff.
//!
//! A variant of DBSCAN over a minimum-similarity relation: two vectors are
//! neighbors when `sqrt(dot / dim)` reaches the threshold. Expansion runs in
//! several passes with a shrinking neighborhood requirement, so points that
//! fail the strict first pass can still seed or join clusters later.

use rayon::prelude::*;

use crate::types::EmbeddingVector;

/// Neighborhood size required in the first expansion pass.
pub const DEFAULT_MIN_PTS: usize = 32;

/// `(batch size, threshold bonus)` breakpoints, interpolated linearly.
const BONUS_BREAKPOINTS: [(usize, f32); 10] = [
    (10, 0.0),
    (20, 0.00625),
    (40, 0.0125),
    (80, 0.03),
    (160, 0.0475),
    (320, 0.05),
    (640, 0.0525),
    (1280, 0.055),
    (2560, 0.0575),
    (5120, 0.06),
];

/// Threshold increase for a batch of `n` vectors.
///
/// Zero below 10 vectors, flat at 0.06 from 5120 on.
pub fn size_bonus(n: usize) -> f32 {
    let (first_n, _) = BONUS_BREAKPOINTS[0];
    let (last_n, last_bonus) = BONUS_BREAKPOINTS[BONUS_BREAKPOINTS.len() - 1];
    if n < first_n {
        return 0.0;
    }
    if n >= last_n {
        return last_bonus;
    }

    BONUS_BREAKPOINTS
        .windows(2)
        .find(|w| n >= w[0].0 && n < w[1].0)
        .map(|w| {
            let ((lo_n, lo_bonus), (hi_n, hi_bonus)) = (w[0], w[1]);
            lo_bonus + (n - lo_n) as f32 * (hi_bonus - lo_bonus) / (hi_n - lo_n) as f32
        })
        .unwrap_or(last_bonus)
}

/// Effective similarity threshold for a batch of `n` vectors.
pub fn adaptive_threshold(eps: f32, n: usize) -> f32 {
    eps + size_bonus(n)
}

/// Similarity score: `sqrt(dot(a, b) / dim)` for a positive dot product, else 0.
pub fn similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    if dot > 0.0 {
        (dot / a.len() as f32).sqrt()
    } else {
        0.0
    }
}

/// Cluster membership of one input vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    /// Cluster id, starting at 1
    pub cluster_id: usize,
    /// Position of the vector in the input batch
    pub index: usize,
    /// Neighbor count of the vector when it joined its cluster; 0 for a leftover singleton
    pub weight: usize,
}

/// Result of clustering one batch.
///
/// # Example
///
/// ```rust,ignore
/// let dbscan = Dbscan::new(&vectors, 0.895, DEFAULT_MIN_PTS);
/// for a in dbscan.assignments() {
///     println!("{} -> cluster {} (weight {})", a.index, a.cluster_id, a.weight);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Dbscan {
    threshold: f32,
    clusters: usize,
    assignments: Vec<Assignment>,
}

impl Dbscan {
    /// Cluster `vectors` with base sensitivity `eps` and first-pass neighborhood size `min_pts`.
    pub fn new(vectors: &[EmbeddingVector], eps: f32, min_pts: usize) -> Self {
        let n = vectors.len();
        let threshold = adaptive_threshold(eps, n);
        let neighbors = neighbor_lists(vectors, threshold);

        let mut cluster_of = vec![0usize; n];
        let mut weights = vec![0usize; n];
        // seed list membership, stamped with the cluster id being expanded
        let mut seeded = vec![0usize; n];
        let mut next_id = 0usize;

        for pts in (1..=min_pts).rev() {
            for start in 0..n {
                if cluster_of[start] != 0 || neighbors[start].len() < pts {
                    continue;
                }

                next_id += 1;
                cluster_of[start] = next_id;
                weights[start] = neighbors[start].len();
                seeded[start] = next_id;

                let mut seeds: Vec<usize> = Vec::new();
                for &k in &neighbors[start] {
                    if seeded[k] != next_id {
                        seeded[k] = next_id;
                        seeds.push(k);
                    }
                }

                let mut cursor = 0;
                while cursor < seeds.len() {
                    let point = seeds[cursor];
                    cursor += 1;
                    if cluster_of[point] != 0 {
                        continue;
                    }
                    cluster_of[point] = next_id;
                    weights[point] = neighbors[point].len();
                    for &k in &neighbors[point] {
                        if seeded[k] != next_id {
                            seeded[k] = next_id;
                            seeds.push(k);
                        }
                    }
                }
            }
        }

        let mut assignments = Vec::with_capacity(n);
        for index in 0..n {
            if cluster_of[index] == 0 {
                next_id += 1;
                cluster_of[index] = next_id;
            }
            assignments.push(Assignment {
                cluster_id: cluster_of[index],
                index,
                weight: weights[index],
            });
        }
        assignments.sort_by(|a, b| {
            a.cluster_id
                .cmp(&b.cluster_id)
                .then_with(|| b.weight.cmp(&a.weight))
        });

        Self {
            threshold,
            clusters: next_id,
            assignments,
        }
    }

    /// Number of distinct cluster ids, singletons included.
    pub fn size(&self) -> usize {
        self.clusters
    }

    /// Effective threshold used for this batch.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Assignments ordered by cluster id, then by descending weight.
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// Assignments grouped per cluster; group `i` holds cluster id `i + 1`.
    pub fn groups(&self) -> Vec<&[Assignment]> {
        let mut groups = Vec::with_capacity(self.clusters);
        let mut start = 0;
        for end in 1..=self.assignments.len() {
            if end == self.assignments.len()
                || self.assignments[end].cluster_id != self.assignments[start].cluster_id
            {
                groups.push(&self.assignments[start..end]);
                start = end;
            }
        }
        groups
    }
}

/// Neighbor indices of every vector, each list in increasing index order.
fn neighbor_lists(vectors: &[EmbeddingVector], threshold: f32) -> Vec<Vec<usize>> {
    (0..vectors.len())
        .into_par_iter()
        .map(|i| {
            (0..vectors.len())
                .filter(|&k| k != i && similarity(&vectors[i], &vectors[k]) >= threshold)
                .collect()
        })
        .collect()
}
