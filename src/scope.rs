//! Lexical Scopes
//!
//! A stack of scopes, each owning an ordered statement list and a variable
//! table. Lookup walks outward so the nearest declaration shadows outer ones;
//! declaring a name twice in the same scope is rejected.

use rustc_hash::FxHashMap;

use crate::ast::{Block, Stmt, Variable};
use crate::errors::{Result, ShaderError};
use crate::types::Type;

/// What opened a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Global,
    Function,
    Block,
    Loop,
    Conditional,
}

/// One lexical scope.
#[derive(Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    pub stmts: Block,
    vars: FxHashMap<String, Variable>,
    /// Return type of a function scope, fixed by the declaration or inferred
    /// from the first `return`.
    pub ret: Option<Type>,
}

impl Scope {
    fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            stmts: Vec::new(),
            vars: FxHashMap::default(),
            ret: None,
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.vars.get(name)
    }
}

/// The active scope chain of one stage.
#[derive(Debug)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    #[must_use]
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(ScopeKind::Global)],
        }
    }

    pub fn push(&mut self, kind: ScopeKind) {
        log::trace!("enter {kind:?} scope");
        self.scopes.push(Scope::new(kind));
    }

    /// Leaves the current scope and returns it.
    pub fn pop(&mut self) -> Result<Scope> {
        if self.scopes.len() <= 1 {
            return Err(ShaderError::internal("attempted to leave the global scope"));
        }
        self.scopes
            .pop()
            .ok_or_else(|| ShaderError::internal("scope stack is empty"))
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    #[must_use]
    pub fn is_global(&self) -> bool {
        self.scopes.len() == 1
    }

    #[must_use]
    pub fn current_kind(&self) -> ScopeKind {
        self.scopes.last().map_or(ScopeKind::Global, |s| s.kind)
    }

    fn current_mut(&mut self) -> Result<&mut Scope> {
        self.scopes
            .last_mut()
            .ok_or_else(|| ShaderError::internal("scope stack is empty"))
    }

    /// Binds `var` in the current scope.
    pub fn declare(&mut self, var: &Variable) -> Result<()> {
        let scope = self.current_mut()?;
        if scope.vars.contains_key(&var.name) {
            return Err(ShaderError::Redeclared(var.name.clone()));
        }
        scope.vars.insert(var.name.clone(), var.clone());
        Ok(())
    }

    /// Binds `var` in the global scope.
    pub fn declare_global(&mut self, var: &Variable) -> Result<()> {
        let global = self
            .scopes
            .first_mut()
            .ok_or_else(|| ShaderError::internal("scope stack is empty"))?;
        if global.vars.contains_key(&var.name) {
            return Err(ShaderError::Redeclared(var.name.clone()));
        }
        global.vars.insert(var.name.clone(), var.clone());
        Ok(())
    }

    /// Nearest declaration of `name`.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Variable> {
        self.scopes
            .iter()
            .rev()
            .find_map(|s| s.vars.get(name).cloned())
    }

    /// Appends a statement to the current scope.
    pub fn push_stmt(&mut self, stmt: Stmt) -> Result<()> {
        self.current_mut()?.stmts.push(stmt);
        Ok(())
    }

    /// Appends a statement to the global scope.
    pub fn push_global_stmt(&mut self, stmt: Stmt) -> Result<()> {
        self.scopes
            .first_mut()
            .ok_or_else(|| ShaderError::internal("scope stack is empty"))?
            .stmts
            .push(stmt);
        Ok(())
    }

    /// Last statement of the current scope.
    pub fn last_stmt_mut(&mut self) -> Option<&mut Stmt> {
        self.scopes.last_mut().and_then(|s| s.stmts.last_mut())
    }

    /// Whether a loop encloses the current position within its function.
    #[must_use]
    pub fn in_loop(&self) -> bool {
        for scope in self.scopes.iter().rev() {
            match scope.kind {
                ScopeKind::Loop => return true,
                ScopeKind::Function | ScopeKind::Global => return false,
                _ => {}
            }
        }
        false
    }

    /// Nearest enclosing function scope.
    pub fn function_scope_mut(&mut self) -> Option<&mut Scope> {
        self.scopes
            .iter_mut()
            .rev()
            .find(|s| s.kind == ScopeKind::Function)
    }

    /// Consumes the stack, returning the global statements.
    pub fn into_global(mut self) -> Result<Block> {
        if self.scopes.len() != 1 {
            return Err(ShaderError::internal(format!(
                "{} scopes still open at the end of the stage",
                self.scopes.len() - 1
            )));
        }
        Ok(self
            .scopes
            .pop()
            .map(|s| s.stmts)
            .unwrap_or_default())
    }

    /// Global statements built so far.
    #[must_use]
    pub fn global_stmts(&self) -> &[Stmt] {
        self.scopes.first().map_or(&[], |s| s.stmts.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::DeclKind;

    fn local(name: &str) -> Variable {
        Variable::new(name, Type::f32(), DeclKind::Local)
    }

    #[test]
    fn inner_declarations_do_not_leak() {
        let mut stack = ScopeStack::new();
        stack.push(ScopeKind::Function);
        stack.declare(&local("a")).unwrap();
        stack.push(ScopeKind::Block);
        stack.declare(&local("b")).unwrap();
        stack.pop().unwrap();
        assert!(stack.lookup("b").is_none());
        stack.declare(&local("b")).unwrap();
        assert!(matches!(
            stack.declare(&local("a")),
            Err(ShaderError::Redeclared(_))
        ));
    }

    #[test]
    fn shadowing_resolves_nearest() {
        let mut stack = ScopeStack::new();
        stack.push(ScopeKind::Function);
        let outer = local("x");
        stack.declare(&outer).unwrap();
        stack.push(ScopeKind::Block);
        let inner = local("x");
        stack.declare(&inner).unwrap();
        assert!(stack.lookup("x").unwrap().ptr_eq(&inner));
        stack.pop().unwrap();
        assert!(stack.lookup("x").unwrap().ptr_eq(&outer));
    }

    #[test]
    fn loop_detection_stops_at_function() {
        let mut stack = ScopeStack::new();
        stack.push(ScopeKind::Function);
        stack.push(ScopeKind::Loop);
        stack.push(ScopeKind::Conditional);
        assert!(stack.in_loop());
        stack.push(ScopeKind::Function);
        assert!(!stack.in_loop());
    }

    #[test]
    fn global_scope_cannot_be_popped() {
        let mut stack = ScopeStack::new();
        assert!(stack.pop().unwrap_err().is_internal());
    }
}
