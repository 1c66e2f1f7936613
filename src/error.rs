// SPDX-License-Identifier: AGPL-3.0-only
// SPDX-FileCopyrightText: 2025 Steve Clarke <stephenlclarke@mac.com> - https://xyzzy.tools

//! Crate-wide error types. Per-row soft errors are deliberately not part of
//! this hierarchy — they live in `parse_error` strings and never abort a scan.

use thiserror::Error;

/// Returned from [`crate::bind::bind`]. A bind error means zero rows are produced.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("no files matched path pattern '{0}'")]
    EmptyGlob(String),

    #[error("invalid path pattern '{0}': {1}")]
    BadGlob(String, glob::PatternError),

    #[error("failed to read dictionary file '{path}': {source}")]
    DictionaryIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse dictionary: {0}")]
    DictionaryParse(#[from] crate::dictionary::xml::XmlError),

    #[error("dictionary build error: {0}")]
    DictionaryBuild(String),

    #[error("invalid delimiter option '{0}'")]
    InvalidDelimiter(String),

    #[error("unknown field name in rtags: '{0}'")]
    UnknownFieldName(String),
}

/// Returned from the row iterator. End-of-file is not an error and never
/// produces one of these.
#[derive(Debug, Error)]
pub enum ScanIoError {
    #[error("failed to open '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("read failure on '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
