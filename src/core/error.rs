use std::fmt;
use thiserror::Error;

/// Store operation that produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Query,
    Subscribe,
    Get,
    Create,
    Set,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Query => "query",
            Self::Subscribe => "subscribe",
            Self::Get => "get",
            Self::Create => "create",
            Self::Set => "set",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Store-agnostic error kind, stable across the `Operation` wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Connection,
    PermissionDenied,
    NotFound,
    Conflict,
    InvalidQuery,
    Unauthenticated,
    Serialization,
    Config,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Document '{0}' not found")]
    NotFound(String),

    #[error("Document '{0}' already exists")]
    Conflict(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("User not authenticated")]
    Unauthenticated,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{op} failed: {source}")]
    Operation {
        op: Operation,
        #[source]
        source: Box<StoreError>,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Kind of the underlying store error, looking through any operation annotation
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection(_) => ErrorKind::Connection,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::InvalidQuery(_) => ErrorKind::InvalidQuery,
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::Serialization(_) => ErrorKind::Serialization,
            Self::Config(_) => ErrorKind::Config,
            Self::Operation { source, .. } => source.kind(),
        }
    }

    /// Operation this error was annotated with, if any
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::Operation { op, .. } => Some(*op),
            _ => None,
        }
    }

    /// Annotate with the operation that produced the error.
    /// An already annotated error keeps its original operation.
    pub fn during(self, op: Operation) -> Self {
        match self {
            annotated @ Self::Operation { .. } => annotated,
            other => Self::Operation {
                op,
                source: Box::new(other),
            },
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
