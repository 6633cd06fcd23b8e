//! Error Types
//!
//! This module defines the error types used throughout the shader compiler.
//!
//! # Overview
//!
//! The main error type [`ShaderError`] covers every failure mode of a build:
//! - Type errors (casts, mismatched operands, unknown members, bad swizzles)
//! - Call errors (parameter count/type, no matching overload)
//! - Reference and pointer misuse (assigning into uniforms, `&` on values)
//! - Dialect and device capability gaps
//! - Builder lifecycle violations and internal invariant failures
//!
//! Errors are raised synchronously where the violation happens and are never
//! recovered internally. The top-level build entry point turns the error into
//! an [`ErrorReport`], stores it as the builder's last error and returns it.
//!
//! # Usage
//!
//! All fallible APIs return [`Result<T>`], an alias for
//! `std::result::Result<T, ShaderError>`.
//!
//! ```rust,ignore
//! use myth_shader::errors::{Result, ShaderError};
//!
//! fn check(ok: bool) -> Result<()> {
//!     if ok { Ok(()) } else { Err(ShaderError::internal("check failed")) }
//! }
//! ```

use serde::Serialize;
use thiserror::Error;

use crate::dialect::Dialect;

/// The main error type for the shader compiler.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShaderError {
    // ========================================================================
    // Type Errors
    // ========================================================================
    /// A value cannot be used as (or converted to) the requested type.
    #[error("Type cast error: cannot use {found} as {expected}")]
    TypeCast {
        /// The type that was required
        expected: String,
        /// The type that was provided
        found: String,
    },

    /// The member does not exist on the accessed type.
    #[error("Type {ty} has no member '{member}'")]
    UnknownMember { ty: String, member: String },

    /// The swizzle mask is malformed or out of range for the vector.
    #[error("Invalid swizzle '{mask}' on {ty}")]
    InvalidSwizzle { ty: String, mask: String },

    // ========================================================================
    // Call Errors
    // ========================================================================
    /// Wrong number of arguments.
    #[error("Parameter count error in '{function}': expected {expected}, found {found}")]
    ParamCount {
        function: String,
        expected: usize,
        found: usize,
    },

    /// An argument has the wrong type or value.
    #[error("Parameter error in '{function}' (argument {index}): {message}")]
    ParamType {
        function: String,
        index: usize,
        message: String,
    },

    /// No overload of a builtin accepts the argument list.
    #[error("No overload of '{function}' matches ({args})")]
    NoOverload { function: String, args: String },

    /// A function was called that has not been declared.
    #[error("Undeclared function '{0}'")]
    UndeclaredFunction(String),

    /// A function was called while the current scope is the global scope.
    #[error("Function '{0}' cannot be called outside of a function body")]
    NonScopedCall(String),

    // ========================================================================
    // Reference & Pointer Errors
    // ========================================================================
    /// The operation needs an addressable, assignable operand.
    #[error("Reference required: {0}")]
    ReferenceRequired(String),

    /// Uniforms are immutable; they cannot be assigned or referenced mutably.
    #[error("Uniform '{0}' is not writable")]
    UniformNotWritable(String),

    /// The operation needs a pointer operand.
    #[error("Pointer required: {0}")]
    PointerRequired(String),

    // ========================================================================
    // Dialect & Device Errors
    // ========================================================================
    /// The target dialect or device does not support the requested feature.
    #[error("{feature} is not supported by {dialect}")]
    Unsupported { feature: String, dialect: Dialect },

    // ========================================================================
    // Scope & Lifecycle Errors
    // ========================================================================
    /// A name was declared twice in the same scope.
    #[error("'{0}' is already declared in this scope")]
    Redeclared(String),

    /// A builder call was made in a state that does not allow it.
    #[error("Invalid builder state: {0}")]
    InvalidState(String),

    /// A message attached to the textual form of the offending expression.
    #[error("{message}: `{expr}`")]
    Ast { message: String, expr: String },

    // ========================================================================
    // Internal Errors
    // ========================================================================
    /// An invariant of the compiler itself was violated.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse error category, recorded in [`ErrorReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    TypeCast,
    ParamCount,
    ParamType,
    NoOverload,
    ReferenceRequired,
    PointerRequired,
    Unsupported,
    NonScopedCall,
    Ast,
    Scope,
    Internal,
}

impl ShaderError {
    /// Shorthand for [`ShaderError::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Shorthand for [`ShaderError::Unsupported`].
    pub fn unsupported(feature: impl Into<String>, dialect: Dialect) -> Self {
        Self::Unsupported {
            feature: feature.into(),
            dialect,
        }
    }

    /// Shorthand for [`ShaderError::TypeCast`].
    pub fn type_cast(expected: impl ToString, found: impl ToString) -> Self {
        Self::TypeCast {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Returns the category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TypeCast { .. } | Self::UnknownMember { .. } | Self::InvalidSwizzle { .. } => {
                ErrorKind::TypeCast
            }
            Self::ParamCount { .. } => ErrorKind::ParamCount,
            Self::ParamType { .. } => ErrorKind::ParamType,
            Self::NoOverload { .. } => ErrorKind::NoOverload,
            Self::ReferenceRequired(_) | Self::UniformNotWritable(_) => {
                ErrorKind::ReferenceRequired
            }
            Self::PointerRequired(_) => ErrorKind::PointerRequired,
            Self::Unsupported { .. } => ErrorKind::Unsupported,
            Self::NonScopedCall(_) => ErrorKind::NonScopedCall,
            Self::Ast { .. } => ErrorKind::Ast,
            Self::Redeclared(_) | Self::UndeclaredFunction(_) | Self::InvalidState(_) => {
                ErrorKind::Scope
            }
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether this error reports a broken compiler invariant rather than
    /// a mistake in the shader description.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

/// The readable record of a failed build.
///
/// The message is rendered at failure time, so any expression text embedded
/// in it uses the syntax of the dialect that was being built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
    pub dialect: Dialect,
}

impl ErrorReport {
    #[must_use]
    pub fn new(error: &ShaderError, dialect: Dialect) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
            dialect,
        }
    }
}

/// Alias for `Result<T, ShaderError>`.
pub type Result<T> = std::result::Result<T, ShaderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_errors_are_framed() {
        let err = ShaderError::internal("uniform record lost");
        assert!(err.is_internal());
        assert_eq!(err.to_string(), "Internal error: uniform record lost");
    }

    #[test]
    fn uniform_write_is_a_reference_error() {
        let err = ShaderError::UniformNotWritable("time".into());
        assert_eq!(err.kind(), ErrorKind::ReferenceRequired);
        assert!(!err.is_internal());
    }

    #[test]
    fn report_keeps_dialect() {
        let err = ShaderError::unsupported("storage buffers", Dialect::GlslEs300);
        let report = ErrorReport::new(&err, Dialect::GlslEs300);
        assert_eq!(report.kind, ErrorKind::Unsupported);
        assert!(report.message.contains("GLSL ES 3.00"));
    }
}
