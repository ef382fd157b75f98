mod common;

use common::{article, at, TestEnv, BASE_TIME, DIMENSIONS};
use news_threads::cluster::{Cluster, ClusterMember, Ranker};
use news_threads::index::VectorIndex;
use news_threads::models::Extractor;
use news_threads::types::{CreateKind, Document, ThreadView};
use news_threads::{Category, DeleteStatus, GetStatus, PutStatus, Repository, ThreadsError};
use std::thread;

const DAY: u64 = 86_400;

fn put(repository: &Repository, name: &str, ttl: u64, title: &str, offset: i64, text: &str) -> PutStatus {
    repository.put(name, ttl, article(title, &at(offset), text).as_bytes())
}

fn threads(status: GetStatus) -> Vec<ThreadView> {
    match status {
        GetStatus::Ok(payload) => payload.threads,
        other => panic!("expected threads, got {other:?}"),
    }
}

#[test]
fn test_zero_ttl_is_bad_input() {
    let env = TestEnv::new();
    let repository = env.load();

    let status = put(&repository, "a", 0, "Quake hits coast", 0, "Quake damage");
    assert_eq!(status, PutStatus::BadInput);
    assert_eq!(status.code(), 400);
    assert_eq!(repository.store().count().unwrap(), 0);
}

#[test]
fn test_no_title_or_text_is_no_content() {
    let env = TestEnv::new();
    let repository = env.load();

    let status = repository.put("a", 3600, b"<html><head></head><body><div></div></body></html>");
    assert_eq!(status, PutStatus::NoContentExtracted);
    assert!(!repository.is_dirty());
}

#[test]
fn test_blank_body_is_no_content() {
    let env = TestEnv::new();
    let repository = env.load();

    assert_eq!(repository.put("a", 3600, b""), PutStatus::NoContentExtracted);
    assert_eq!(repository.put("b", 3600, b"  \n"), PutStatus::NoContentExtracted);
    assert_eq!(repository.store().count().unwrap(), 0);
}

struct FailingExtractor;

impl Extractor for FailingExtractor {
    fn extract(&self, _raw: &[u8]) -> news_threads::Result<Document> {
        Err(ThreadsError::extraction("unreadable"))
    }
}

#[test]
fn test_extraction_failure_is_internal_error() {
    let env = TestEnv::new();
    let mut collaborators = env.collaborators();
    collaborators.extractor = Box::new(FailingExtractor);
    let repository = Repository::load(&env.config, collaborators).unwrap();

    let status = put(&repository, "a", 3600, "Quake hits coast", 0, "Quake damage");
    assert_eq!(status, PutStatus::InternalError);
    assert_eq!(status.code(), 500);
}

#[test]
fn test_soft_rejections_are_ignored() {
    let env = TestEnv::new();
    let repository = env.load();

    // no known word: zero vector, rejected by the news filter
    let status = put(&repository, "plain", 3600, "Nothing here", 0, "Lorem ipsum dolor");
    assert_eq!(status, PutStatus::Ignored);
    assert_eq!(status.code(), 202);

    // Cyrillic text is detected as a language that is not configured
    let status = put(&repository, "ru", 3600, "Землетрясение", 0, "Сильное землетрясение на побережье");
    assert_eq!(status, PutStatus::Ignored);

    assert_eq!(repository.store().count().unwrap(), 0);
    assert_eq!(repository.language("en").unwrap().index_len(), 0);
}

#[test]
fn test_reingest_replaces_record_and_vector() {
    let env = TestEnv::new();
    let repository = env.load();
    let en = repository.language("en").unwrap();

    let first = put(&repository, "a", 3600, "Quake hits coast", 0, "Quake damage");
    assert_eq!(first, PutStatus::Created(CreateKind::New));
    assert_eq!(first.code(), 201);
    let first_id = repository.store().get("a").unwrap().unwrap().vector_id;

    let second = put(&repository, "a", 3600, "Quake toll rises", 60, "Quake update");
    assert_eq!(second, PutStatus::Created(CreateKind::Replaced));
    let record = repository.store().get("a").unwrap().unwrap();

    assert_eq!(repository.store().count().unwrap(), 1);
    assert_eq!(record.title, "Quake toll rises");
    assert_ne!(record.vector_id, first_id);
    assert!(!en.contains_vector(first_id));
    assert!(en.contains_vector(record.vector_id));
    assert_eq!(en.index_len(), 1);
    assert!(repository.is_dirty());
}

#[test]
fn test_delete() {
    let env = TestEnv::new();
    let repository = env.load();

    assert_eq!(repository.delete("missing"), DeleteStatus::NotFound);
    assert_eq!(repository.delete("missing").code(), 404);

    put(&repository, "a", 3600, "Quake hits coast", 0, "Quake damage");
    let id = repository.store().get("a").unwrap().unwrap().vector_id;

    assert_eq!(repository.delete("a"), DeleteStatus::Deleted);
    assert_eq!(repository.store().get("a").unwrap(), None);
    assert!(!repository.language("en").unwrap().contains_vector(id));
    assert_eq!(repository.delete("a"), DeleteStatus::NotFound);

    assert!(threads(repository.get(DAY, "en", "any")).is_empty());
}

#[test]
fn test_get_rejects_unknown_language_and_category() {
    let env = TestEnv::new();
    let repository = env.load();

    assert_eq!(repository.get(DAY, "xx", "any"), GetStatus::BadInput);
    assert_eq!(repository.get(DAY, "en", "weather"), GetStatus::BadInput);
    assert_eq!(repository.get(DAY, "en", "any").code(), 200);
}

#[test]
fn test_get_ranks_threads() {
    let env = TestEnv::new();
    let repository = env.load();

    let trio = [
        ("quake-1", "Quake hits coast"),
        ("quake-2", "Quake death toll rises"),
        ("quake-3", "Quake aftershocks continue"),
    ];
    for (i, (name, title)) in trio.iter().enumerate() {
        let status = put(&repository, name, DAY, title, i as i64 * 60, "Quake rescue teams");
        assert_eq!(status, PutStatus::Created(CreateKind::New));
    }
    put(&repository, "match-1", DAY, "Match ends in draw", 300, "Match report");

    let threads = threads(repository.get(DAY, "en", "any"));
    assert_eq!(threads.len(), 2);

    // recompute the expected order from the ranking formula
    let cluster = |category: Category, size: usize| Cluster {
        category,
        rank: 0.0,
        members: (0..size)
            .map(|i| ClusterMember {
                name: i.to_string(),
                title: String::new(),
                weight: 0,
            })
            .collect(),
    };
    let ranker = Ranker::new();
    let society = ranker.score(&cluster(Category::Society, 3), 3);
    let sports = ranker.score(&cluster(Category::Sports, 1), 1);
    let (first, second) = if society >= sports {
        (Category::Society, Category::Sports)
    } else {
        (Category::Sports, Category::Society)
    };
    assert_eq!(threads[0].category, Some(first));
    assert_eq!(threads[1].category, Some(second));

    let quake = threads.iter().find(|t| t.category == Some(Category::Society)).unwrap();
    assert_eq!(quake.articles, vec!["quake-1", "quake-2", "quake-3"]);
    assert_eq!(quake.title, "Quake hits coast");

    let sport = threads.iter().find(|t| t.category == Some(Category::Sports)).unwrap();
    assert_eq!(sport.articles, vec!["match-1"]);
}

#[test]
fn test_get_single_category_omits_category() {
    let env = TestEnv::new();
    let repository = env.load();

    put(&repository, "quake", DAY, "Quake hits coast", 0, "Quake");
    put(&repository, "match", DAY, "Match ends in draw", 10, "Match");

    let threads = threads(repository.get(DAY, "en", "sports"));
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].category, None);
    assert_eq!(threads[0].articles, vec!["match"]);
}

#[test]
fn test_window_is_anchored_to_newest_article() {
    let env = TestEnv::new();
    let repository = env.load();

    put(&repository, "old", 10 * DAY, "Quake hits coast", 0, "Quake");
    put(&repository, "new", 10 * DAY, "Match ends in draw", 2 * DAY as i64, "Match");

    let recent = threads(repository.get(DAY, "en", "any"));
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].articles, vec!["new"]);

    assert_eq!(threads(repository.get(3 * DAY, "en", "any")).len(), 2);
}

#[test]
fn test_sync_evicts_strictly_expired_records() {
    let env = TestEnv::new();
    let repository = env.load();

    // newest article sets max_published = BASE_TIME + 100
    put(&repository, "newest", 1000, "Match ends in draw", 100, "Match");
    // published == max - ttl: kept
    put(&repository, "boundary", 100, "Quake hits coast", 0, "Quake");
    // published == max - ttl - 1: evicted
    put(&repository, "expired", 100, "Film festival opens", -1, "Film");

    let expired_id = repository.store().get("expired").unwrap().unwrap().vector_id;
    let report = repository.sync();

    assert_eq!(report.languages, 1);
    assert_eq!(report.evicted, 1);
    assert_eq!(report.failed, 0);
    assert!(!repository.is_dirty());
    assert!(repository.store().get("boundary").unwrap().is_some());
    assert!(repository.store().get("expired").unwrap().is_none());
    assert!(!repository.language("en").unwrap().contains_vector(expired_id));

    let saved = VectorIndex::load(env.index_file(), DIMENSIONS).unwrap();
    assert_eq!(saved.len(), 2);
    assert!(!saved.contains(expired_id));
}

#[test]
fn test_sync_if_idle_skips_clean_repository() {
    let env = TestEnv::new();
    let repository = env.load();

    assert!(repository.sync_if_idle().is_none());
    put(&repository, "a", 3600, "Quake hits coast", 0, "Quake");
    assert!(repository.sync_if_idle().is_some());
    assert!(repository.sync_if_idle().is_none());
}

#[test]
fn test_reopen_continues_vector_ids() {
    let env = TestEnv::new();
    {
        let repository = env.load();
        put(&repository, "a", DAY, "Quake hits coast", 0, "Quake");
        put(&repository, "b", DAY, "Match ends in draw", 10, "Match");
        repository.close().unwrap();
    }

    let repository = env.load();
    let en = repository.language("en").unwrap();
    assert_eq!(en.last_vector_id(), 2);
    assert_eq!(en.index_len(), 2);

    put(&repository, "c", DAY, "Film festival opens", 20, "Film");
    assert_eq!(repository.store().get("c").unwrap().unwrap().vector_id, 3);

    let stats = repository.stats().unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].vectors, 3);
    assert_eq!(stats[0].newest_published, Some(BASE_TIME + 20));
}

#[test]
fn test_open_requires_index_file() {
    let env = TestEnv::new();
    std::fs::remove_file(env.index_file()).unwrap();

    let result = Repository::load(&env.config, env.collaborators());
    assert!(matches!(result, Err(news_threads::ThreadsError::ConfigError(_))));
}

#[test]
fn test_open_requires_models_for_every_language() {
    let env = TestEnv::new();
    let mut collaborators = env.collaborators();
    collaborators.models.clear();

    assert!(Repository::load(&env.config, collaborators).is_err());
}

#[test]
fn test_background_worker_and_close() {
    let env = TestEnv::new();
    let repository = Repository::open(&env.config, env.collaborators()).unwrap();

    put(&repository, "a", DAY, "Quake hits coast", 0, "Quake");
    let report = repository.close().unwrap();
    assert_eq!(report.evicted, 0);
    assert!(!repository.is_dirty());

    // second close is a no-op
    assert_eq!(repository.close().unwrap().languages, 0);
    assert_eq!(VectorIndex::load(env.index_file(), DIMENSIONS).unwrap().len(), 1);
}

#[test]
fn test_reingest_in_other_language_moves_vector() {
    let env = TestEnv::with_languages(&["en", "ru"]);
    let repository = env.load();
    let en = repository.language("en").unwrap();
    let ru = repository.language("ru").unwrap();

    let status = put(&repository, "story", 3600, "Quake hits coast", 0, "Quake damage");
    assert_eq!(status, PutStatus::Created(CreateKind::New));
    let first = repository.store().get("story").unwrap().unwrap();
    assert_eq!(first.lang_id, en.lang_id());
    assert!(en.contains_vector(first.vector_id));

    let status = put(&repository, "story", 3600, "Землетрясение", 0, "Сильное землетрясение");
    assert_eq!(status, PutStatus::Created(CreateKind::Replaced));
    let second = repository.store().get("story").unwrap().unwrap();
    assert_eq!(second.lang_id, ru.lang_id());

    assert!(!en.contains_vector(first.vector_id));
    assert_eq!(en.index_len(), 0);
    assert!(ru.contains_vector(second.vector_id));
    assert_eq!(ru.index_len(), 1);
    assert_eq!(repository.store().count().unwrap(), 1);
}

#[test]
fn test_concurrent_mutations_of_one_name_keep_index_consistent() {
    let env = TestEnv::new();
    let repository = env.load();

    thread::scope(|scope| {
        for worker in 0..8 {
            let repository = &repository;
            scope.spawn(move || {
                for round in 0..20 {
                    if worker % 4 == 3 && round % 3 == 0 {
                        repository.delete("same");
                    } else {
                        put(repository, "same", 3600, "Quake hits coast", round, "Quake damage");
                    }
                }
            });
        }
    });

    let en = repository.language("en").unwrap();
    match repository.store().get("same").unwrap() {
        Some(record) => {
            assert_eq!(en.index_len(), 1);
            assert!(en.contains_vector(record.vector_id));
        }
        None => assert_eq!(en.index_len(), 0),
    }
    assert!(repository.store().count().unwrap() <= 1);
}

#[test]
fn test_stats_and_drop_leave_index_file_untouched() {
    let env = TestEnv::new();
    let repository = env.load();
    put(&repository, "a", DAY, "Quake hits coast", 0, "Quake damage");

    let stats = repository.stats().unwrap();
    assert_eq!(stats[0].vectors, 1);
    assert_eq!(stats[0].newest_published, Some(BASE_TIME));
    assert!(repository.is_dirty());
    drop(repository);

    assert_eq!(VectorIndex::load(env.index_file(), DIMENSIONS).unwrap().len(), 0);
}
