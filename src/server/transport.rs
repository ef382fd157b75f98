//! Line-delimited JSON transport.
//!
//! Each input line is one request object:
//!
//! ```text
//! {"method":"PUT","name":"a.html","ttl":3600,"body":"<html>..</html>"}
//! {"method":"DELETE","name":"a.html"}
//! {"method":"GET","period":86400,"lang_code":"en","category":"any"}
//! ```
//!
//! Each request gets exactly one reply line `{"code":..,"status":..,"body"?:..}`,
//! written in request order even though requests run concurrently.

use crossbeam::channel::Receiver;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::io::{BufRead, Write};
use tracing::{debug, warn};

use super::pool::{Operation, Reply, WorkerPool};
use crate::types::{Result, ThreadsPayload};

/// Requests allowed in flight per worker before the reader waits.
const PENDING_PER_WORKER: usize = 4;

/// Request line.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "method", rename_all = "UPPERCASE")]
pub enum WireRequest {
    Put { name: String, ttl: u64, body: String },
    Delete { name: String },
    Get { period: u64, lang_code: String, category: String },
}

impl From<WireRequest> for Operation {
    fn from(request: WireRequest) -> Self {
        match request {
            WireRequest::Put { name, ttl, body } => Operation::Put {
                name,
                ttl,
                body: body.into_bytes(),
            },
            WireRequest::Delete { name } => Operation::Delete { name },
            WireRequest::Get {
                period,
                lang_code,
                category,
            } => Operation::Get {
                period,
                lang_code,
                category,
            },
        }
    }
}

/// Reply line.
#[derive(Debug, Clone, Serialize)]
pub struct WireReply {
    pub code: u16,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<ThreadsPayload>,
}

impl WireReply {
    fn bad_request() -> Self {
        Self {
            code: 400,
            status: "Bad Request".to_string(),
            body: None,
        }
    }

    fn unavailable() -> Self {
        Self {
            code: 503,
            status: "Service Unavailable".to_string(),
            body: None,
        }
    }
}

impl From<Reply> for WireReply {
    fn from(reply: Reply) -> Self {
        let code = reply.code();
        let status = reply.description().to_string();
        let body = match reply {
            Reply::Get(status) => status.payload().cloned(),
            _ => None,
        };
        Self { code, status, body }
    }
}

enum Pending {
    Ready(WireReply),
    Waiting(Receiver<Reply>),
}

/// Serve requests from `input` until end of input, writing replies to `output`.
///
/// Returns the number of replies written.
pub fn serve_lines<R: BufRead, W: Write>(pool: &WorkerPool, input: R, mut output: W) -> Result<usize> {
    let max_pending = pool.workers().max(1) * PENDING_PER_WORKER;
    let mut pending: VecDeque<Pending> = VecDeque::new();
    let mut written = 0usize;

    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let entry = match serde_json::from_str::<WireRequest>(line) {
            Ok(request) => match pool.submit(request.into()) {
                Ok(receiver) => Pending::Waiting(receiver),
                Err(e) => {
                    warn!(error = %e, "Request rejected");
                    Pending::Ready(WireReply::unavailable())
                }
            },
            Err(e) => {
                debug!(error = %e, "Malformed request line");
                Pending::Ready(WireReply::bad_request())
            }
        };
        pending.push_back(entry);

        written += drain(&mut pending, &mut output, false)?;
        while pending.len() >= max_pending {
            written += write_front(&mut pending, &mut output)?;
        }
    }

    written += drain(&mut pending, &mut output, true)?;
    output.flush()?;
    Ok(written)
}

/// Write replies from the front of the queue; without `block`, stop at the
/// first reply that is not ready yet.
fn drain<W: Write>(pending: &mut VecDeque<Pending>, output: &mut W, block: bool) -> Result<usize> {
    let mut written = 0;
    loop {
        let ready = match pending.front() {
            None => break,
            Some(Pending::Ready(_)) => true,
            Some(Pending::Waiting(receiver)) => !receiver.is_empty() || block,
        };
        if !ready {
            break;
        }
        written += write_front(pending, output)?;
    }
    Ok(written)
}

fn write_front<W: Write>(pending: &mut VecDeque<Pending>, output: &mut W) -> Result<usize> {
    let Some(entry) = pending.pop_front() else {
        return Ok(0);
    };
    let reply = match entry {
        Pending::Ready(reply) => reply,
        Pending::Waiting(receiver) => match receiver.recv() {
            Ok(reply) => reply.into(),
            Err(_) => WireReply::unavailable(),
        },
    };
    serde_json::to_writer(&mut *output, &reply)?;
    output.write_all(b"\n")?;
    Ok(1)
}
