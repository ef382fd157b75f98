//! Clustering engine, batch dispatch and ranking.

pub mod dbscan;
pub mod dispatcher;
pub mod model;
pub mod ranker;

pub use dbscan::{adaptive_threshold, similarity, Assignment, Dbscan, DEFAULT_MIN_PTS};
pub use dispatcher::{shard_bounds, Dispatcher};
pub use model::{assemble, Cluster, ClusterMember};
pub use ranker::Ranker;
