//! Statements and structured control flow.

use super::StageBuilder;
use crate::ast::{DeclKind, Expr, IntoExpr, Stmt, Variable};
use crate::builtins::match_arg;
use crate::dialect::ShaderStage;
use crate::errors::{Result, ShaderError};
use crate::scope::ScopeKind;
use crate::types::{ScalarKind, Type};

impl StageBuilder<'_> {
    fn require_body(&self, what: &str) -> Result<()> {
        if self.scopes.is_global() {
            return Err(ShaderError::InvalidState(format!(
                "'{what}' outside of a function body"
            )));
        }
        Ok(())
    }

    fn condition(&self, cond: impl IntoExpr) -> Result<Expr> {
        let cond = cond.into_expr();
        if cond.ty != Type::bool() {
            return Err(ShaderError::type_cast(Type::bool(), &cond.ty));
        }
        Ok(cond)
    }

    /// Runs `body` in a fresh scope of `kind` and returns its statements.
    fn nested(
        &mut self,
        kind: ScopeKind,
        body: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<Vec<Stmt>> {
        self.scopes.push(kind);
        body(self)?;
        Ok(self.scopes.pop()?.stmts)
    }

    fn declare_local(
        &mut self,
        name: &str,
        ty: Type,
        kind: DeclKind,
        init: Option<Expr>,
    ) -> Result<Expr> {
        self.require_body("var")?;
        self.use_type(&ty)?;
        let var = Variable::new(name, ty, kind);
        self.scopes.declare(&var)?;
        self.scopes.push_stmt(Stmt::Declare {
            var: var.clone(),
            init,
        })?;
        Ok(Expr::var(&var))
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    /// Declares a mutable local initialized from `init`. Its type is the type
    /// of `init`; untyped literals take their default type.
    pub fn var(&mut self, name: &str, init: impl IntoExpr) -> Result<Expr> {
        let init = self.concretize(init.into_expr());
        let kind = if init.ty.is_pointer() {
            DeclKind::Let
        } else {
            DeclKind::Local
        };
        self.declare_local(name, init.ty.clone(), kind, Some(init))
    }

    /// Declares a local of an explicit type. Pointer locals must be
    /// initialized and become immutable bindings.
    pub fn var_typed(&mut self, name: &str, ty: Type, init: Option<Expr>) -> Result<Expr> {
        let init = match init {
            Some(init) => {
                let (_, adapted) = match_arg(&init, &ty)
                    .ok_or_else(|| ShaderError::type_cast(&ty, &init.ty))?;
                Some(adapted)
            }
            None if ty.is_pointer() => {
                return Err(ShaderError::PointerRequired(format!(
                    "pointer variable '{name}' requires an initializer"
                )));
            }
            None => None,
        };
        let kind = if ty.is_pointer() {
            DeclKind::Let
        } else {
            DeclKind::Local
        };
        self.declare_local(name, ty, kind, init)
    }

    /// Declares an immutable local.
    pub fn let_(&mut self, name: &str, init: impl IntoExpr) -> Result<Expr> {
        let init = self.concretize(init.into_expr());
        self.declare_local(name, init.ty.clone(), DeclKind::Let, Some(init))
    }

    // ========================================================================
    // Statements
    // ========================================================================

    /// `target = value`.
    pub fn assign(&mut self, target: impl IntoExpr, value: impl IntoExpr) -> Result<()> {
        self.require_body("assign")?;
        let target = target.into_expr();
        let value = value.into_expr();
        if let Some(root) = target.root_variable()
            && root.kind == DeclKind::Uniform
        {
            return Err(ShaderError::UniformNotWritable(root.name.clone()));
        }
        if !target.is_reference {
            return Err(ShaderError::ReferenceRequired(format!(
                "cannot assign to {}",
                crate::emit::render_expr(&target, self.dialect())
            )));
        }
        let (_, value) = match_arg(&value, &target.ty)
            .ok_or_else(|| ShaderError::type_cast(&target.ty, &value.ty))?;
        target.mark_writable();
        self.scopes.push_stmt(Stmt::Assign { target, value })
    }

    /// Evaluates `value` for its side effects.
    pub fn touch(&mut self, value: impl IntoExpr) -> Result<()> {
        self.require_body("touch")?;
        self.scopes.push_stmt(Stmt::Touch(value.into_expr()))
    }

    pub fn discard(&mut self) -> Result<()> {
        self.require_body("discard")?;
        if self.stage != ShaderStage::Fragment {
            return Err(ShaderError::InvalidState(format!(
                "'discard' in the {} stage",
                self.stage.name()
            )));
        }
        self.scopes.push_stmt(Stmt::Discard)
    }

    pub fn break_(&mut self) -> Result<()> {
        if !self.scopes.in_loop() {
            return Err(ShaderError::InvalidState("'break' outside of a loop".into()));
        }
        self.scopes.push_stmt(Stmt::Break)
    }

    pub fn continue_(&mut self) -> Result<()> {
        if !self.scopes.in_loop() {
            return Err(ShaderError::InvalidState("'continue' outside of a loop".into()));
        }
        self.scopes.push_stmt(Stmt::Continue)
    }

    /// Returns from the enclosing function. The first return of a function
    /// without a declared return type fixes it.
    pub fn return_(&mut self, value: Option<Expr>) -> Result<()> {
        self.require_body("return")?;
        let inferred = self
            .scopes
            .function_scope_mut()
            .ok_or_else(|| ShaderError::internal("no enclosing function scope"))?
            .ret
            .is_none();
        let value = match value {
            Some(v) if inferred => Some(self.concretize(v)),
            other => other,
        };
        let scope = self
            .scopes
            .function_scope_mut()
            .ok_or_else(|| ShaderError::internal("no enclosing function scope"))?;
        let value = match (scope.ret.clone(), value) {
            (None, value) => {
                scope.ret = Some(value.as_ref().map_or_else(Type::void, |v| v.ty.clone()));
                value
            }
            (Some(ret), None) if ret.is_void() => None,
            (Some(ret), None) => return Err(ShaderError::type_cast(&ret, "void")),
            (Some(ret), Some(v)) => {
                if ret.is_void() {
                    return Err(ShaderError::type_cast("void", &v.ty));
                }
                let (_, v) =
                    match_arg(&v, &ret).ok_or_else(|| ShaderError::type_cast(&ret, &v.ty))?;
                Some(v)
            }
        };
        self.scopes.push_stmt(Stmt::Return(value))
    }

    /// Nested block scope.
    pub fn block(&mut self, body: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
        self.require_body("block")?;
        let stmts = self.nested(ScopeKind::Block, body)?;
        self.scopes.push_stmt(Stmt::Block(stmts))
    }

    // ========================================================================
    // Conditionals
    // ========================================================================

    pub fn if_(
        &mut self,
        cond: impl IntoExpr,
        body: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<()> {
        self.require_body("if")?;
        let cond = self.condition(cond)?;
        let stmts = self.nested(ScopeKind::Conditional, body)?;
        self.scopes.push_stmt(Stmt::If {
            branches: vec![(cond, stmts)],
            otherwise: None,
        })
    }

    fn open_if(&mut self, what: &str) -> Result<()> {
        match self.scopes.last_stmt_mut() {
            Some(Stmt::If { otherwise: None, .. }) => Ok(()),
            _ => Err(ShaderError::InvalidState(format!(
                "'{what}' without a preceding 'if_'"
            ))),
        }
    }

    /// Adds a branch to the `if_` that was the last statement.
    pub fn else_if(
        &mut self,
        cond: impl IntoExpr,
        body: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<()> {
        self.require_body("else_if")?;
        self.open_if("else_if")?;
        let cond = self.condition(cond)?;
        let stmts = self.nested(ScopeKind::Conditional, body)?;
        if let Some(Stmt::If { branches, .. }) = self.scopes.last_stmt_mut() {
            branches.push((cond, stmts));
        }
        Ok(())
    }

    /// Closes the `if_` that was the last statement with an else branch.
    pub fn else_(&mut self, body: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
        self.require_body("else")?;
        self.open_if("else")?;
        let stmts = self.nested(ScopeKind::Conditional, body)?;
        if let Some(Stmt::If { otherwise, .. }) = self.scopes.last_stmt_mut() {
            *otherwise = Some(stmts);
        }
        Ok(())
    }

    // ========================================================================
    // Loops
    // ========================================================================

    /// Counts an integer from `start` (inclusive) to `end` (exclusive).
    pub fn for_range(
        &mut self,
        name: &str,
        start: impl IntoExpr,
        end: impl IntoExpr,
        body: impl FnOnce(&mut Self, Expr) -> Result<()>,
    ) -> Result<()> {
        self.require_body("for")?;
        let (start, end) = (start.into_expr(), end.into_expr());
        let kind = [&start, &end]
            .iter()
            .find(|e| e.abstract_literal().is_none())
            .and_then(|e| e.ty.scalar_kind())
            .unwrap_or(ScalarKind::I32);
        let counter = Type::scalar(kind);
        if !kind.is_integer() {
            return Err(ShaderError::type_cast(Type::i32(), &counter));
        }
        let (_, start) =
            match_arg(&start, &counter).ok_or_else(|| ShaderError::type_cast(&counter, &start.ty))?;
        let (_, end) =
            match_arg(&end, &counter).ok_or_else(|| ShaderError::type_cast(&counter, &end.ty))?;

        let var = Variable::new(name, counter, DeclKind::Let);
        self.scopes.push(ScopeKind::Loop);
        self.scopes.declare(&var)?;
        body(self, Expr::var(&var))?;
        let stmts = self.scopes.pop()?.stmts;
        self.scopes.push_stmt(Stmt::Range {
            var,
            start,
            end,
            body: stmts,
        })
    }

    pub fn while_(
        &mut self,
        cond: impl IntoExpr,
        body: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<()> {
        self.require_body("while")?;
        let cond = self.condition(cond)?;
        let stmts = self.nested(ScopeKind::Loop, body)?;
        self.scopes.push_stmt(Stmt::While { cond, body: stmts })
    }

    /// Runs `body` once, then again while `cond` holds. `cond` is built
    /// after the body so it can read variables the body declares.
    pub fn do_while(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<()>,
        cond: impl FnOnce(&mut Self) -> Result<Expr>,
    ) -> Result<()> {
        self.require_body("do_while")?;
        self.scopes.push(ScopeKind::Loop);
        body(self)?;
        let cond = cond(self)?;
        let cond = self.condition(cond)?;
        let stmts = self.scopes.pop()?.stmts;
        self.scopes.push_stmt(Stmt::DoWhile { body: stmts, cond })
    }
}
