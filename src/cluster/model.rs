//! Clusters assembled from clustering output, ready for ranking.

use super::dbscan::Dbscan;
use crate::types::Category;

/// Display attributes of one clustered article.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterMember {
    pub name: String,
    pub title: String,
    /// Neighbor count when the article joined its cluster
    pub weight: usize,
}

/// Group of related articles of one category.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub category: Category,
    /// Ranking score, recomputed on every retrieval
    pub rank: f32,
    /// Members, most connected first
    pub members: Vec<ClusterMember>,
}

impl Cluster {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            rank: 0.0,
            members: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Title shown for the cluster.
    ///
    /// Starts from the first member's title and takes the shortest title among
    /// the members sharing the first member's weight.
    pub fn representative_title(&self) -> Option<&str> {
        let first = self.members.first()?;
        let title = self
            .members
            .iter()
            .filter(|m| m.weight == first.weight)
            .map(|m| m.title.as_str())
            .fold(first.title.as_str(), |best, t| {
                if t.len() < best.len() {
                    t
                } else {
                    best
                }
            });
        Some(title)
    }

    /// Member names in display order.
    pub fn article_names(&self) -> Vec<String> {
        self.members.iter().map(|m| m.name.clone()).collect()
    }
}

/// Build one `Cluster` per cluster id of `dbscan`.
///
/// `member` turns a batch index and its weight into a member.
pub fn assemble<F>(category: Category, dbscan: &Dbscan, mut member: F) -> Vec<Cluster>
where
    F: FnMut(usize, usize) -> ClusterMember,
{
    dbscan
        .groups()
        .into_iter()
        .map(|group| Cluster {
            category,
            rank: 0.0,
            members: group.iter().map(|a| member(a.index, a.weight)).collect(),
        })
        .collect()
}
