//! Error handling for the IELE IR layer
//!
//! Every failure in this layer means the lowering front end handed us IR that
//! breaks one of the structural invariants. None of them is recoverable inside
//! the IR; they are reported uniformly and the caller aborts the compilation.

use std::fmt;
use thiserror::Error;

/// The invariant an [`IrError`] reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    OwnershipViolation,
    MalformedInstruction,
    MalformedName,
    UnresolvedControlFlow,
    Unsupported,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::OwnershipViolation => write!(f, "ownership violation"),
            ErrorKind::MalformedInstruction => write!(f, "malformed instruction"),
            ErrorKind::MalformedName => write!(f, "malformed name"),
            ErrorKind::UnresolvedControlFlow => write!(f, "unresolved control flow"),
            ErrorKind::Unsupported => write!(f, "unsupported construct"),
        }
    }
}

/// Main IR error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IrError {
    #[error("Ownership violation: {message}")]
    OwnershipViolation { message: String },

    #[error("Malformed instruction: {message}")]
    MalformedInstruction { message: String },

    #[error("Malformed name: {message}")]
    MalformedName { message: String },

    #[error("Unresolved control flow: {message}")]
    UnresolvedControlFlow { message: String },

    #[error("Unsupported: {message}")]
    Unsupported { message: String },
}

/// Result alias used by every fallible IR operation
pub type IrResult<T> = Result<T, IrError>;

impl IrError {
    /// Create an ownership violation error
    pub fn ownership(message: impl Into<String>) -> Self {
        IrError::OwnershipViolation { message: message.into() }
    }

    /// Create a malformed instruction error
    pub fn malformed_instruction(message: impl Into<String>) -> Self {
        IrError::MalformedInstruction { message: message.into() }
    }

    /// Create a malformed name error
    pub fn malformed_name(message: impl Into<String>) -> Self {
        IrError::MalformedName { message: message.into() }
    }

    /// Create an unresolved control flow error
    pub fn unresolved_control_flow(message: impl Into<String>) -> Self {
        IrError::UnresolvedControlFlow { message: message.into() }
    }

    /// Create an unsupported construct error
    pub fn unsupported(message: impl Into<String>) -> Self {
        IrError::Unsupported { message: message.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            IrError::OwnershipViolation { .. } => ErrorKind::OwnershipViolation,
            IrError::MalformedInstruction { .. } => ErrorKind::MalformedInstruction,
            IrError::MalformedName { .. } => ErrorKind::MalformedName,
            IrError::UnresolvedControlFlow { .. } => ErrorKind::UnresolvedControlFlow,
            IrError::Unsupported { .. } => ErrorKind::Unsupported,
        }
    }

    /// The diagnostic text without the kind prefix
    pub fn message(&self) -> &str {
        match self {
            IrError::OwnershipViolation { message }
            | IrError::MalformedInstruction { message }
            | IrError::MalformedName { message }
            | IrError::UnresolvedControlFlow { message }
            | IrError::Unsupported { message } => message,
        }
    }
}
