use std::fmt;
use tern_ast::Origin;

/// Category of a user-facing compile error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Arity,
    TypeMismatch,
    NonExhaustive,
    UnknownName,
    Duplicate,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Arity => "arity mismatch",
            ErrorKind::TypeMismatch => "type mismatch",
            ErrorKind::NonExhaustive => "non-exhaustive match",
            ErrorKind::UnknownName => "unknown name",
            ErrorKind::Duplicate => "duplicate declaration",
        };
        write!(f, "{}", s)
    }
}

/// Fatal error raised while checking or lowering a compilation unit.
///
/// `Compile` is a mistake in the user's program; `Internal` means an earlier
/// stage handed over something malformed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TypeError {
    #[error("{message}")]
    Compile {
        kind: ErrorKind,
        message: String,
        origin: Option<Origin>,
    },
    #[error("internal compiler error: {message}")]
    Internal {
        message: String,
        origin: Option<Origin>,
    },
}

impl TypeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        TypeError::Compile {
            kind,
            message: message.into(),
            origin: None,
        }
    }

    pub fn arity(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Arity, message)
    }

    pub fn mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeMismatch, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownName, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        TypeError::Internal {
            message: message.into(),
            origin: None,
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            TypeError::Compile { kind, .. } => Some(*kind),
            TypeError::Internal { .. } => None,
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, TypeError::Internal { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            TypeError::Compile { message, .. } | TypeError::Internal { message, .. } => message,
        }
    }

    pub fn origin(&self) -> Option<&Origin> {
        match self {
            TypeError::Compile { origin, .. } | TypeError::Internal { origin, .. } => origin.as_ref(),
        }
    }

    /// Attach `origin` unless the error already has one.
    pub fn or_origin(mut self, fallback: Option<&Origin>) -> Self {
        let slot = match &mut self {
            TypeError::Compile { origin, .. } | TypeError::Internal { origin, .. } => origin,
        };
        if slot.is_none() {
            *slot = fallback.cloned();
        }
        self
    }
}

pub type TypeResult<T> = Result<T, TypeError>;
