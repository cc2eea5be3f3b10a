//
// Copyright (c) The yangdb Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Error handling.

/// A convenience wrapper around `Result` for `yangdb::Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum listing the possible error kinds.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// An xml key violating the key grammar.
    MalformedKey,
    /// A key format whose placeholders cannot be satisfied by the
    /// provided values.
    BadFormat,
    /// An unknown value of the `operation` attribute.
    BadOperation,
    /// Unparseable XML input.
    BadXml,
    /// Unparseable XPath expression.
    BadXpath,
    /// Unparseable YANG module text.
    BadYang,
    /// A node name that does not resolve in the current schema scope.
    UnknownNode,
    /// An XML node without a schema binding, or whose name does not
    /// match its schema node.
    SchemaMismatch,
    /// A YANG list without a `key` statement.
    ListWithoutKey,
    /// `create` of a key that already exists.
    CreateExists,
    /// `delete` of a key that does not exist.
    DeleteMissing,
    /// The key-value backend failed to scan.
    KvScan,
    /// The key-value backend failed to apply a write.
    KvWrite,
    /// The key-value backend failed to (re)initialize.
    KvInit,
}

/// NETCONF `error-type` category of an error kind.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorType {
    /// Input, schema and precondition failures.
    Application,
    /// Backend failures.
    OperationFailed,
}

/// Error struct returned by all fallible operations.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Error {
    pub kind: ErrorKind,
    pub msg: Option<String>,
    pub path: Option<String>,
}

// ===== impl ErrorKind =====

impl ErrorKind {
    /// NETCONF `error-type` this kind maps to.
    pub fn error_type(&self) -> ErrorType {
        match self {
            ErrorKind::KvScan | ErrorKind::KvWrite | ErrorKind::KvInit => {
                ErrorType::OperationFailed
            }
            _ => ErrorType::Application,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MalformedKey => "malformed key",
            ErrorKind::BadFormat => "bad key format",
            ErrorKind::BadOperation => "bad operation",
            ErrorKind::BadXml => "bad xml",
            ErrorKind::BadXpath => "bad xpath",
            ErrorKind::BadYang => "bad yang",
            ErrorKind::UnknownNode => "unknown node",
            ErrorKind::SchemaMismatch => "schema mismatch",
            ErrorKind::ListWithoutKey => "list without key",
            ErrorKind::CreateExists => "create: already exists",
            ErrorKind::DeleteMissing => "delete: does not exist",
            ErrorKind::KvScan => "database scan failed",
            ErrorKind::KvWrite => "database write failed",
            ErrorKind::KvInit => "database init failed",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ===== impl Error =====

impl Error {
    pub fn new(kind: ErrorKind) -> Error {
        Error {
            kind,
            msg: None,
            path: None,
        }
    }

    pub fn msg(kind: ErrorKind, msg: impl Into<String>) -> Error {
        Error {
            kind,
            msg: Some(msg.into()),
            path: None,
        }
    }

    /// Attach the offending key or node path.
    pub fn with_path(mut self, path: impl Into<String>) -> Error {
        self.path = Some(path.into());
        self
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(msg) = &self.msg {
            write!(f, ": {}", msg)?;
        }
        if let Some(path) = &self.path {
            write!(f, " ({})", path)?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}
