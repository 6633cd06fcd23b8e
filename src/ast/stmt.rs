//! Statement nodes.

use std::rc::Rc;

use super::expr::Expr;
use super::variable::Variable;
use crate::types::Type;

/// Ordered statement list. Order is preserved verbatim into emitted code.
pub type Block = Vec<Stmt>;

/// A function parameter.
#[derive(Debug, Clone)]
pub struct Param {
    pub var: Variable,
    /// Passed by reference: `inout` in GLSL, `ptr<function, T>` in WGSL.
    pub by_ref: bool,
}

/// A user function definition.
#[derive(Debug, Clone)]
pub struct FunctionDef {
    /// Name the host declared the function with.
    pub name: String,
    /// Name emitted in source; differs from `name` for later overloads.
    pub emitted_name: String,
    pub ret: Type,
    pub params: Vec<Param>,
    pub body: Block,
}

/// Statement shape.
#[derive(Debug, Clone)]
pub enum Stmt {
    Assign {
        target: Expr,
        value: Expr,
    },
    Declare {
        var: Variable,
        init: Option<Expr>,
    },
    /// Evaluates an expression for its side effects.
    Touch(Expr),
    Discard,
    Break,
    Continue,
    Return(Option<Expr>),
    Block(Block),
    If {
        branches: Vec<(Expr, Block)>,
        otherwise: Option<Block>,
    },
    /// `for var in [start, end)`.
    Range {
        var: Variable,
        start: Expr,
        end: Expr,
        body: Block,
    },
    While {
        cond: Expr,
        body: Block,
    },
    DoWhile {
        body: Block,
        cond: Expr,
    },
    Function(Rc<FunctionDef>),
    Struct(Type),
}

impl Stmt {
    /// Calls `f` on every expression in this statement, recursively.
    pub fn visit_exprs(&self, f: &mut impl FnMut(&Expr)) {
        match self {
            Self::Assign { target, value } => {
                f(target);
                f(value);
            }
            Self::Declare { init, .. } => {
                if let Some(init) = init {
                    f(init);
                }
            }
            Self::Touch(e) | Self::Return(Some(e)) => f(e),
            Self::Discard | Self::Break | Self::Continue | Self::Return(None) | Self::Struct(_) => {}
            Self::Block(body) => visit_block(body, f),
            Self::If {
                branches,
                otherwise,
            } => {
                for (cond, body) in branches {
                    f(cond);
                    visit_block(body, f);
                }
                if let Some(body) = otherwise {
                    visit_block(body, f);
                }
            }
            Self::Range {
                start, end, body, ..
            } => {
                f(start);
                f(end);
                visit_block(body, f);
            }
            Self::While { cond, body } | Self::DoWhile { body, cond } => {
                f(cond);
                visit_block(body, f);
            }
            Self::Function(def) => visit_block(&def.body, f),
        }
    }
}

/// Calls `f` on every expression in `block`, recursively.
pub fn visit_block(block: &[Stmt], f: &mut impl FnMut(&Expr)) {
    for stmt in block {
        stmt.visit_exprs(f);
    }
}
