//! Catalog error taxonomy.
//!
//! Every layer speaks this one error type. The [`ErrorKind`] tag is the only
//! thing the HTTP layer looks at when choosing a status code; storage error
//! codes are translated into a kind at the repository boundary and never leak
//! further up.

use std::collections::BTreeMap;
use std::error::Error as StdError;

use thiserror::Error;

/// Result type used across the catalog.
pub type CatalogResult<T> = Result<T, CatalogError>;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Closed set of error categories.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Duplicate,
    Conflict,
    Unauthorized,
    Forbidden,
    Internal,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Validation => "validation",
            ErrorKind::Duplicate => "duplicate",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Internal => "internal",
            ErrorKind::Unknown => "unknown",
        }
    }

    /// `Duplicate` and `Conflict` are the same category as far as callers go.
    pub fn is_conflict(self) -> bool {
        matches!(self, ErrorKind::Duplicate | ErrorKind::Conflict)
    }

    /// Kinds whose message must not reach a client verbatim.
    pub fn is_opaque(self) -> bool {
        matches!(self, ErrorKind::Internal | ErrorKind::Unknown)
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured catalog error: category, message, optional cause and context.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CatalogError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<BoxError>,
    context: BTreeMap<String, String>,
}

impl CatalogError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
            context: BTreeMap::new(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, msg)
    }

    pub fn duplicate(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Duplicate, msg)
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, msg)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, msg)
    }

    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, msg)
    }

    /// Attach a category and message to an existing cause.
    ///
    /// Wrapping `None` yields `None`, so call sites can wrap an optional
    /// failure without branching first.
    pub fn wrap<E>(cause: Option<E>, kind: ErrorKind, message: impl Into<String>) -> Option<Self>
    where
        E: Into<BoxError>,
    {
        cause.map(|cause| Self::new(kind, message).with_source(cause))
    }

    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &BTreeMap<String, String> {
        &self.context
    }

    /// Is this error, or any error it wraps, of category `kind`?
    pub fn is(&self, kind: ErrorKind) -> bool {
        is_kind(self, kind)
    }

    /// Render the cause chain (`a: b: c`) for logs.
    pub fn chain(&self) -> String {
        let mut out = self.message.clone();
        let mut next = self.source();
        while let Some(err) = next {
            out.push_str(": ");
            out.push_str(&err.to_string());
            next = err.source();
        }
        out
    }
}

/// Walk the `source()` chain of `err` looking for a [`CatalogError`] of `kind`.
pub fn is_kind(err: &(dyn StdError + 'static), kind: ErrorKind) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(catalog) = e.downcast_ref::<CatalogError>() {
            if catalog.kind == kind {
                return true;
            }
        }
        current = e.source();
    }
    false
}

/// The kind of the outermost [`CatalogError`] in the chain, if any.
pub fn kind_of(err: &(dyn StdError + 'static)) -> Option<ErrorKind> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(catalog) = e.downcast_ref::<CatalogError>() {
            return Some(catalog.kind);
        }
        current = e.source();
    }
    None
}
