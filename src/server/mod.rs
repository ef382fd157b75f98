//! Serving path: a fixed worker pool draining one request queue, and a
//! line-delimited JSON transport in front of it.

mod pool;
mod transport;

pub use pool::{Operation, Reply, Request, WorkerPool};
pub use transport::{serve_lines, WireReply, WireRequest};
