//! Expression / Statement AST
//!
//! The typed tree the stage builder assembles and the emitters in
//! [`crate::emit`] turn into source text.
//!
//! # Overview
//!
//! - [`Expr`]: shared, immutable expression node with its resolved type,
//!   constness and reference flags. Only the writable flag changes after
//!   construction, when a location is later assigned or passed by reference.
//! - [`Stmt`]: statement node; scopes hold ordered [`Block`]s of them.
//! - [`Variable`]: shared handle to a declaration, identified by pointer.
//! - [`classify_access`]: resolves named access (`"xy"`, `"0"`, `"color"`)
//!   against a type.

mod access;
mod expr;
mod literal;
mod stmt;
mod variable;

pub use access::{AccessKind, classify_access};
pub use expr::{BinaryOp, Callee, Expr, ExprKind, ExprNode, IntoExpr, MemberAccess, UnaryOp};
pub use literal::Literal;
pub use stmt::{Block, FunctionDef, Param, Stmt, visit_block};
pub use variable::{BuiltinVar, DeclKind, Variable, VariableData};
