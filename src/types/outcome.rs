//! Named request outcomes and the retrieval payload.
//!
//! Outcomes stay distinct in the API even when two of them share a
//! transport code; see `code()` for the mapping used by the transports.

use serde::Serialize;

use super::category::Category;

/// Whether an accepted ingest created a new record or replaced one with the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateKind {
    New,
    Replaced,
}

/// Outcome of `put`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutStatus {
    /// Zero time to live
    BadInput,
    /// Extraction or storage failure
    InternalError,
    /// Neither title nor text could be extracted
    NoContentExtracted,
    /// Valid input not worth storing (language, embedding, news filter, category)
    Ignored,
    Created(CreateKind),
}

impl PutStatus {
    pub fn code(&self) -> u16 {
        match self {
            PutStatus::BadInput => 400,
            PutStatus::InternalError => 500,
            PutStatus::NoContentExtracted => 204,
            PutStatus::Ignored => 202,
            PutStatus::Created(CreateKind::New) => 201,
            PutStatus::Created(CreateKind::Replaced) => 204,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PutStatus::BadInput => "Bad Request",
            PutStatus::InternalError => "Internal Server Error",
            PutStatus::NoContentExtracted => "No Content",
            PutStatus::Ignored => "Ignored",
            PutStatus::Created(CreateKind::New) => "Created",
            PutStatus::Created(CreateKind::Replaced) => "Replaced",
        }
    }
}

/// Outcome of `delete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteStatus {
    NotFound,
    Deleted,
    InternalError,
}

impl DeleteStatus {
    pub fn code(&self) -> u16 {
        match self {
            DeleteStatus::NotFound => 404,
            DeleteStatus::Deleted => 204,
            DeleteStatus::InternalError => 500,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            DeleteStatus::NotFound => "Not Found",
            DeleteStatus::Deleted => "Deleted",
            DeleteStatus::InternalError => "Internal Server Error",
        }
    }
}

/// Outcome of `get`.
#[derive(Debug, Clone, PartialEq)]
pub enum GetStatus {
    /// Unknown language or category
    BadInput,
    InternalError,
    Ok(ThreadsPayload),
}

impl GetStatus {
    pub fn code(&self) -> u16 {
        match self {
            GetStatus::BadInput => 400,
            GetStatus::InternalError => 500,
            GetStatus::Ok(_) => 200,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            GetStatus::BadInput => "Bad Request",
            GetStatus::InternalError => "Internal Server Error",
            GetStatus::Ok(_) => "OK",
        }
    }

    /// Payload of a successful retrieval.
    pub fn payload(&self) -> Option<&ThreadsPayload> {
        match self {
            GetStatus::Ok(payload) => Some(payload),
            _ => None,
        }
    }
}

/// Ranked thread listing returned by `get`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ThreadsPayload {
    pub threads: Vec<ThreadView>,
}

/// One thread of a retrieval response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreadView {
    /// Representative title
    pub title: String,
    /// Present only when the request asked for every category
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    /// Member article names, most connected first
    pub articles: Vec<String>,
}
