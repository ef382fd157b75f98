//! Windowed retrieval: cluster each category, rank, and render threads.

use rayon::prelude::*;
use std::collections::BTreeMap;

use super::language::LanguageState;
use crate::cluster::{assemble, Cluster, ClusterMember, Dbscan, Ranker, DEFAULT_MIN_PTS};
use crate::types::{Category, CategoryFilter, EmbeddingVector, Record, ThreadView, ThreadsPayload};

/// Cluster and rank the records of one language window.
pub(crate) fn collect_threads(language: &LanguageState, records: Vec<Record>, filter: CategoryFilter) -> ThreadsPayload {
    let grouped = language.attach_vectors(records);
    let clusters = rank_categories(grouped, language.threshold());
    render(clusters, filter)
}

/// Cluster every category in parallel and return all clusters sorted by rank, best first.
pub(crate) fn rank_categories(
    grouped: BTreeMap<Category, Vec<(Record, EmbeddingVector)>>,
    eps: f32,
) -> Vec<Cluster> {
    let ranker = Ranker::new();
    let mut clusters: Vec<Cluster> = grouped
        .into_par_iter()
        .flat_map_iter(|(category, entries)| cluster_category(&ranker, category, entries, eps))
        .collect();
    clusters.sort_by(|a, b| b.rank.total_cmp(&a.rank));
    clusters
}

fn cluster_category(
    ranker: &Ranker,
    category: Category,
    entries: Vec<(Record, EmbeddingVector)>,
    eps: f32,
) -> Vec<Cluster> {
    let (records, vectors): (Vec<Record>, Vec<EmbeddingVector>) = entries.into_iter().unzip();
    let dbscan = Dbscan::new(&vectors, eps, DEFAULT_MIN_PTS);

    let mut clusters = assemble(category, &dbscan, |index, weight| ClusterMember {
        name: records[index].name.clone(),
        title: records[index].title.clone(),
        weight,
    });
    ranker.rank_batch(&mut clusters);
    clusters
}

fn render(clusters: Vec<Cluster>, filter: CategoryFilter) -> ThreadsPayload {
    let threads = clusters
        .into_iter()
        .filter(|cluster| !cluster.is_empty())
        .map(|cluster| ThreadView {
            title: cluster.representative_title().unwrap_or_default().to_string(),
            category: match filter {
                CategoryFilter::Any => Some(cluster.category),
                CategoryFilter::Only(_) => None,
            },
            articles: cluster.article_names(),
        })
        .collect();
    ThreadsPayload { threads }
}
