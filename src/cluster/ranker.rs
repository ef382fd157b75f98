//! Display ranking of clusters.

use super::model::Cluster;

/// Scores clusters for display ordering.
///
/// `score = (size_fraction + quality / 2) * category_weight`, where
/// `size_fraction` is the cluster size relative to the largest cluster of the
/// same category in the same batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ranker;

impl Ranker {
    pub fn new() -> Self {
        Self
    }

    /// Score `cluster` against the largest cluster size of its batch.
    ///
    /// Empty clusters score 0.
    pub fn score(&self, cluster: &Cluster, batch_max_size: usize) -> f32 {
        if cluster.is_empty() || batch_max_size == 0 {
            return 0.0;
        }
        let size_fraction = cluster.len() as f32 / batch_max_size as f32;
        (size_fraction + self.quality_mark(cluster) / 2.0) * cluster.category.weight()
    }

    /// Score every cluster of one category batch in place.
    pub fn rank_batch(&self, clusters: &mut [Cluster]) {
        let batch_max_size = clusters.iter().map(Cluster::len).max().unwrap_or(0);
        for cluster in clusters.iter_mut() {
            cluster.rank = self.score(cluster, batch_max_size);
        }
    }

    /// Content quality in `[0, 0.8]`. No quality model is wired in, so this is 0.
    fn quality_mark(&self, _cluster: &Cluster) -> f32 {
        0.0
    }
}
