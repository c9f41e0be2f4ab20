// ===============================
// src/error.rs
// ===============================
/*
=============================================================================
Project : tally_bot — daily buy/sell tally service with a live chat summary
Module  : error.rs
Version : 0.1.0
Author  : Kukuh Tripamungkas Wicaksono (Kukuh TW)
License : MIT (see LICENSE)

Summary : Counts buy/sell events per item over HTTP, keeps one JSON file per
          day, mirrors the running totals into a single chat message that is
          edited in place, and starts a fresh tally at local midnight.

(c) 2025 Kukuh TW. All rights reserved where applicable.
=============================================================================
*/
use hyper::StatusCode;
use thiserror::Error;

/// Startup misconfiguration. Fatal: the process does not start.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid timezone '{0}': {1}")]
    Timezone(String, String),
    #[error("invalid catalog: {0}")]
    Catalog(String),
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
    #[error("missing required setting {0}")]
    Missing(&'static str),
}

/// Rejections from `DailyTally::apply`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApplyError {
    #[error("unrecognized item kind '{0}'")]
    UnrecognizedKind(String),
    #[error("item '{0}' needs a buy or sell direction")]
    DirectionRequired(String),
}

/// Disk read/write failure. Logged only; the in-memory tally stays authoritative.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Create/edit failure on the outward chat channel. Logged only.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("api error {code}: {description}")]
    Api { code: i64, description: String },
    #[error("message {0} no longer exists")]
    MessageGone(i64),
}

/// The only failures a caller of the HTTP surface ever sees.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("{0}")]
    BadRequest(String),
    #[error("Not found")]
    NotFound,
}

impl RequestError {
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            RequestError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RequestError::NotFound => StatusCode::NOT_FOUND,
        }
    }

    /// Metric label.
    pub fn reason(&self) -> &'static str {
        match self {
            RequestError::MethodNotAllowed => "method",
            RequestError::BadRequest(_) => "bad_request",
            RequestError::NotFound => "not_found",
        }
    }
}

impl From<ApplyError> for RequestError {
    fn from(e: ApplyError) -> Self {
        RequestError::BadRequest(e.to_string())
    }
}
