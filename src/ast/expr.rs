//! Expression nodes.
//!
//! An [`Expr`] is an immutable, shared node carrying its resolved [`Type`].
//! Nodes are built by the stage builder, which performs all validation;
//! the constructors here only record the shape.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::literal::Literal;
use super::variable::{DeclKind, Variable};
use crate::types::Type;

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
}

impl UnaryOp {
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Not => "!",
            Self::BitNot => "~",
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinaryOp {
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "&&",
            Self::Or => "||",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
        }
    }

    #[must_use]
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge
        )
    }

    #[must_use]
    pub fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    #[must_use]
    pub fn is_bitwise(self) -> bool {
        matches!(
            self,
            Self::BitAnd | Self::BitOr | Self::BitXor | Self::Shl | Self::Shr
        )
    }

    #[must_use]
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Rem
        )
    }
}

/// Named access on a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberAccess {
    Field(String),
    /// Normalized to `xyzw` letters.
    Swizzle(String),
}

/// Target of a call expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callee {
    /// Builtin function, already resolved to its dialect-specific name.
    Builtin(&'static str),
    /// User-defined function, by emitted name.
    User(String),
}

impl Callee {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Builtin(name) => name,
            Self::User(name) => name,
        }
    }
}

/// Expression shape.
#[derive(Debug, Clone)]
pub enum ExprKind {
    Var(Variable),
    Literal(Literal),
    /// Type constructor; the constructed type is the node type.
    Construct(Vec<Expr>),
    /// Value conversion to the node type.
    Cast(Expr),
    Unary {
        op: UnaryOp,
        operand: Expr,
    },
    Binary {
        op: BinaryOp,
        lhs: Expr,
        rhs: Expr,
    },
    Index {
        base: Expr,
        index: Expr,
    },
    Member {
        base: Expr,
        access: MemberAccess,
    },
    AddressOf(Expr),
    Deref(Expr),
    Call {
        callee: Callee,
        args: Vec<Expr>,
    },
}

/// Data behind an [`Expr`] handle.
pub struct ExprNode {
    pub kind: ExprKind,
    pub ty: Type,
    pub is_const: bool,
    pub is_reference: bool,
    writable: Cell<bool>,
    access_cache: RefCell<FxHashMap<String, Expr>>,
}

/// Shared expression handle.
#[derive(Clone)]
pub struct Expr(Rc<ExprNode>);

impl Expr {
    #[must_use]
    pub fn new(kind: ExprKind, ty: Type, is_const: bool, is_reference: bool) -> Self {
        Self(Rc::new(ExprNode {
            kind,
            ty,
            is_const,
            is_reference,
            writable: Cell::new(false),
            access_cache: RefCell::new(FxHashMap::default()),
        }))
    }

    /// Reference to a variable.
    #[must_use]
    pub fn var(var: &Variable) -> Self {
        let is_reference = match var.kind {
            DeclKind::Local | DeclKind::Out | DeclKind::Workgroup | DeclKind::Storage => true,
            DeclKind::Uniform => !var.ty.is_texture() && !var.ty.is_sampler(),
            DeclKind::Builtin => var.builtin.is_some_and(|b| b.is_output()),
            DeclKind::Let | DeclKind::Param | DeclKind::In => false,
        };
        Self::new(ExprKind::Var(var.clone()), var.ty.clone(), false, is_reference)
    }

    /// Untyped or typed literal.
    #[must_use]
    pub fn literal(lit: impl Into<Literal>) -> Self {
        let lit = lit.into();
        Self::new(ExprKind::Literal(lit), lit.ty(), true, false)
    }

    /// Concrete `f32` literal.
    #[must_use]
    pub fn f32(v: f32) -> Self {
        Self::literal(Literal::F32(v))
    }

    /// Concrete `i32` literal.
    #[must_use]
    pub fn i32(v: i32) -> Self {
        Self::literal(Literal::I32(v))
    }

    /// Concrete `u32` literal.
    #[must_use]
    pub fn u32(v: u32) -> Self {
        Self::literal(Literal::U32(v))
    }

    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// The untyped literal this expression is, if any.
    #[must_use]
    pub fn abstract_literal(&self) -> Option<Literal> {
        match &self.kind {
            ExprKind::Literal(lit) if lit.is_abstract() || matches!(lit, Literal::Bool(_)) => {
                Some(*lit)
            }
            _ => None,
        }
    }

    /// Variable at the root of an access chain.
    #[must_use]
    pub fn root_variable(&self) -> Option<Variable> {
        match &self.kind {
            ExprKind::Var(v) => Some(v.clone()),
            ExprKind::Index { base, .. }
            | ExprKind::Member { base, .. }
            | ExprKind::Deref(base)
            | ExprKind::AddressOf(base) => base.root_variable(),
            _ => None,
        }
    }

    /// Marks this location and its root variable as written.
    pub fn mark_writable(&self) {
        self.writable.set(true);
        match &self.kind {
            ExprKind::Var(v) => v.mark_writable(),
            ExprKind::Index { base, .. }
            | ExprKind::Member { base, .. }
            | ExprKind::Deref(base)
            | ExprKind::AddressOf(base) => base.mark_writable(),
            _ => {}
        }
    }

    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.writable.get()
    }

    #[must_use]
    pub fn is_pointer(&self) -> bool {
        self.ty.is_pointer()
    }

    pub(crate) fn cached_access(&self, name: &str) -> Option<Expr> {
        self.access_cache.borrow().get(name).cloned()
    }

    pub(crate) fn cache_access(&self, name: &str, expr: &Expr) {
        self.access_cache
            .borrow_mut()
            .insert(name.to_string(), expr.clone());
    }

    /// Calls `f` on every variable referenced by this expression.
    pub fn visit_variables(&self, f: &mut impl FnMut(&Variable)) {
        match &self.kind {
            ExprKind::Var(v) => f(v),
            ExprKind::Literal(_) => {}
            ExprKind::Construct(args) | ExprKind::Call { args, .. } => {
                for a in args {
                    a.visit_variables(f);
                }
            }
            ExprKind::Cast(e)
            | ExprKind::AddressOf(e)
            | ExprKind::Deref(e)
            | ExprKind::Unary { operand: e, .. }
            | ExprKind::Member { base: e, .. } => e.visit_variables(f),
            ExprKind::Binary { lhs, rhs, .. } => {
                lhs.visit_variables(f);
                rhs.visit_variables(f);
            }
            ExprKind::Index { base, index } => {
                base.visit_variables(f);
                index.visit_variables(f);
            }
        }
    }
}

impl Deref for Expr {
    type Target = ExprNode;

    fn deref(&self) -> &ExprNode {
        &self.0
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expr")
            .field("kind", &self.kind)
            .field("ty", &self.ty)
            .finish_non_exhaustive()
    }
}

/// Conversion of host values into expressions.
///
/// Rust numeric literals become untyped shader literals, so `1.0` matches
/// both `f32` and `f16` parameters and `3` matches `i32`, `u32` or floats.
pub trait IntoExpr {
    fn into_expr(self) -> Expr;
}

impl IntoExpr for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

impl IntoExpr for &Expr {
    fn into_expr(self) -> Expr {
        self.clone()
    }
}

impl IntoExpr for &Variable {
    fn into_expr(self) -> Expr {
        Expr::var(self)
    }
}

impl IntoExpr for Variable {
    fn into_expr(self) -> Expr {
        Expr::var(&self)
    }
}

macro_rules! impl_into_expr_literal {
    ($($t:ty),*) => {
        $(
            impl IntoExpr for $t {
                fn into_expr(self) -> Expr {
                    Expr::literal(self)
                }
            }
        )*
    };
}

impl_into_expr_literal!(bool, i32, i64, u32, f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniforms_are_references_but_textures_are_not() {
        let u = Variable::new("time", Type::f32(), DeclKind::Uniform);
        assert!(Expr::var(&u).is_reference);
        let p = Variable::new("x", Type::f32(), DeclKind::Param);
        assert!(!Expr::var(&p).is_reference);
    }

    #[test]
    fn writability_reaches_root_variable() {
        let v = Variable::new("arr", Type::array(Type::f32(), Some(4)), DeclKind::Local);
        let base = Expr::var(&v);
        let elem = Expr::new(
            ExprKind::Index {
                base,
                index: Expr::literal(1),
            },
            Type::f32(),
            false,
            true,
        );
        elem.mark_writable();
        assert!(v.is_writable());
    }

    #[test]
    fn untyped_literals_default_to_i32_and_f32() {
        assert_eq!(Expr::literal(3).ty, Type::i32());
        assert_eq!(Expr::literal(0.5).ty, Type::f32());
        assert!(Expr::literal(3).abstract_literal().is_some());
        assert!(Expr::f32(3.0).abstract_literal().is_none());
    }
}
