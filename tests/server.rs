mod common;

use common::{article, at, TestEnv};
use news_threads::models::{Extractor, HtmlExtractor};
use news_threads::server::{serve_lines, Operation, Reply, WorkerPool};
use news_threads::types::{CreateKind, Document, Result};
use news_threads::{DeleteStatus, GetStatus, PutStatus, Repository};
use std::io::Cursor;
use std::sync::Arc;

/// Extractor that panics on bodies containing `boom`.
struct ExplodingExtractor;

impl Extractor for ExplodingExtractor {
    fn extract(&self, raw: &[u8]) -> Result<Document> {
        if raw.windows(4).any(|w| w == b"boom") {
            panic!("extractor exploded");
        }
        HtmlExtractor::new().extract(raw)
    }
}

fn put_op(name: &str, title: &str, offset: i64) -> Operation {
    Operation::Put {
        name: name.to_string(),
        ttl: 86_400,
        body: article(title, &at(offset), title).into_bytes(),
    }
}

#[test]
fn test_pool_handles_requests() {
    let env = TestEnv::new();
    let repository = Arc::new(env.load());
    let pool = WorkerPool::start(Arc::clone(&repository), 2).unwrap();

    let reply = pool.call(put_op("a", "Quake hits coast", 0)).unwrap();
    assert_eq!(reply, Reply::Put(PutStatus::Created(CreateKind::New)));
    assert_eq!(reply.code(), 201);
    assert_eq!(reply.description(), "Created");

    let reply = pool
        .call(Operation::Get {
            period: 86_400,
            lang_code: "en".to_string(),
            category: "any".to_string(),
        })
        .unwrap();
    match reply {
        Reply::Get(GetStatus::Ok(payload)) => assert_eq!(payload.threads.len(), 1),
        other => panic!("unexpected reply {other:?}"),
    }

    let reply = pool.call(Operation::Delete { name: "a".to_string() }).unwrap();
    assert_eq!(reply, Reply::Delete(DeleteStatus::Deleted));

    pool.shutdown();
    repository.close().unwrap();
}

#[test]
fn test_pool_concurrent_submissions() {
    let env = TestEnv::new();
    let repository = Arc::new(env.load());
    let pool = WorkerPool::start(Arc::clone(&repository), 4).unwrap();

    let receivers: Vec<_> = (0..16)
        .map(|i| pool.submit(put_op(&format!("quake-{i}"), "Quake hits coast", i)).unwrap())
        .collect();
    for receiver in receivers {
        assert_eq!(
            receiver.recv().unwrap(),
            Reply::Put(PutStatus::Created(CreateKind::New))
        );
    }

    assert_eq!(repository.store().count().unwrap(), 16);
    assert_eq!(repository.language("en").unwrap().index_len(), 16);
    pool.shutdown();
}

#[test]
fn test_panicking_request_keeps_worker_alive() {
    let env = TestEnv::new();
    let mut collaborators = env.collaborators();
    collaborators.extractor = Box::new(ExplodingExtractor);
    let repository = Arc::new(Repository::load(&env.config, collaborators).unwrap());
    let pool = WorkerPool::start(Arc::clone(&repository), 1).unwrap();

    let reply = pool.call(put_op("bad", "Quake boom", 0)).unwrap();
    assert_eq!(reply, Reply::Put(PutStatus::InternalError));
    assert_eq!(reply.code(), 500);

    // the single worker is still serving
    let reply = pool.call(put_op("good", "Quake hits coast", 0)).unwrap();
    assert_eq!(reply, Reply::Put(PutStatus::Created(CreateKind::New)));
    pool.shutdown();
}

#[test]
fn test_start_rejects_zero_workers() {
    let env = TestEnv::new();
    let repository = Arc::new(env.load());
    assert!(WorkerPool::start(repository, 0).is_err());
}

#[test]
fn test_serve_lines_replies_in_order() {
    let env = TestEnv::new();
    let repository = Arc::new(env.load());
    // one worker keeps execution order equal to request order
    let pool = WorkerPool::start(Arc::clone(&repository), 1).unwrap();

    let put = serde_json::json!({
        "method": "PUT",
        "name": "a",
        "ttl": 3600,
        "body": article("Quake hits coast", &at(0), "Quake damage"),
    });
    let input = [
        put.to_string(),
        "not json".to_string(),
        String::new(),
        r#"{"method":"GET","period":86400,"lang_code":"en","category":"any"}"#.to_string(),
        r#"{"method":"DELETE","name":"missing"}"#.to_string(),
        put.to_string(),
    ]
    .join("\n");

    let mut output = Vec::new();
    let written = serve_lines(&pool, Cursor::new(input), &mut output).unwrap();
    assert_eq!(written, 5);

    let replies: Vec<serde_json::Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let codes: Vec<u64> = replies.iter().map(|r| r["code"].as_u64().unwrap()).collect();
    assert_eq!(codes, vec![201, 400, 200, 404, 204]);

    assert_eq!(replies[4]["status"], "Replaced");
    let threads = replies[2]["body"]["threads"].as_array().unwrap();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0]["title"], "Quake hits coast");
    assert_eq!(threads[0]["category"], "society");
    assert_eq!(threads[0]["articles"], serde_json::json!(["a"]));

    pool.shutdown();
}
