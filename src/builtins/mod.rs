//! Builtin Function Registry
//!
//! Name to overload table of the builtin shader functions, with per-dialect
//! availability and optional rewrite routines for operations whose call
//! shape differs between dialects.
//!
//! # Overload resolution
//!
//! Only overloads available in the target dialect are considered. Each
//! argument is scored against its parameter:
//!
//! | Match                                         | Cost |
//! |-----------------------------------------------|------|
//! | exact type                                    | 0    |
//! | untyped literal promoted to the scalar kind   | 1    |
//! | untyped scalar literal splatted into a vector | 2    |
//!
//! The overload with the lowest total cost wins; ties go to the overload
//! listed first. Resolution is therefore deterministic for a fixed argument
//! list and dialect.

mod normalize;
mod table;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::ast::{Expr, ExprKind};
use crate::builder::StageBuilder;
use crate::dialect::{Dialect, DialectMask};
use crate::errors::{Result, ShaderError};
use crate::types::Type;

/// One parameter of a builtin overload.
#[derive(Debug, Clone)]
pub struct OverloadParam {
    pub ty: Type,
    /// The argument is passed as a pointer to a writable location.
    pub by_ref: bool,
}

/// One signature of a builtin.
#[derive(Debug, Clone)]
pub struct Overload {
    pub dialects: DialectMask,
    /// Name emitted in the target dialect.
    pub name: &'static str,
    pub params: SmallVec<[OverloadParam; 4]>,
    pub ret: Type,
}

/// Dialect-specific rewrite of a builtin call.
pub type Normalize = fn(&mut StageBuilder<'_>, &str, &[Expr]) -> Result<Expr>;

/// A named builtin.
#[derive(Debug, Clone, Default)]
pub struct BuiltinEntry {
    pub overloads: Vec<Overload>,
    pub normalize: Option<Normalize>,
}

/// A successful overload match.
#[derive(Debug)]
pub struct Resolved<'r> {
    pub overload: &'r Overload,
    /// Arguments after literal promotion and broadcast.
    pub args: Vec<Expr>,
    pub cost: u32,
}

/// Scores `arg` against a parameter of type `param`.
///
/// Returns the cost and the argument rewritten to the parameter type.
#[must_use]
pub fn match_arg(arg: &Expr, param: &Type) -> Option<(u32, Expr)> {
    if arg.ty == *param {
        return Some((0, arg.clone()));
    }
    let lit = arg.abstract_literal()?;
    let prim = param.as_primitive()?;
    let promoted = lit.promote_to(prim.scalar)?;
    let scalar = Expr::literal(promoted);
    if prim.is_scalar() {
        return Some((1, scalar));
    }
    if prim.is_vector() {
        let splat = Expr::new(ExprKind::Construct(vec![scalar]), param.clone(), true, false);
        return Some((2, splat));
    }
    None
}

/// Registry of builtin functions.
#[derive(Debug, Clone)]
pub struct BuiltinRegistry {
    entries: FxHashMap<&'static str, BuiltinEntry>,
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl BuiltinRegistry {
    /// An empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }

    /// The standard builtin table.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        table::populate(&mut registry);
        registry
    }

    /// Adds an overload to `name`.
    pub fn add_overload(
        &mut self,
        name: &'static str,
        dialects: DialectMask,
        emitted: &'static str,
        params: &[Type],
        ret: Type,
    ) {
        self.entries.entry(name).or_default().overloads.push(Overload {
            dialects,
            name: emitted,
            params: params
                .iter()
                .map(|ty| OverloadParam {
                    ty: ty.clone(),
                    by_ref: false,
                })
                .collect(),
            ret,
        });
    }

    /// Adds an overload whose first parameter is passed by reference.
    pub fn add_ref_overload(
        &mut self,
        name: &'static str,
        dialects: DialectMask,
        params: &[Type],
        ret: Type,
    ) {
        self.entries.entry(name).or_default().overloads.push(Overload {
            dialects,
            name,
            params: params
                .iter()
                .enumerate()
                .map(|(i, ty)| OverloadParam {
                    ty: ty.clone(),
                    by_ref: i == 0,
                })
                .collect(),
            ret,
        });
    }

    /// Installs a rewrite routine for `name`.
    pub fn set_normalize(&mut self, name: &'static str, normalize: Normalize) {
        self.entries.entry(name).or_default().normalize = Some(normalize);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BuiltinEntry> {
        self.entries.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Picks the overload of `name` that best matches `args` in `dialect`.
    pub fn resolve(&self, name: &str, dialect: Dialect, args: &[Expr]) -> Result<Resolved<'_>> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| ShaderError::UndeclaredFunction(name.to_string()))?;

        let candidates: Vec<&Overload> = entry
            .overloads
            .iter()
            .filter(|o| o.dialects.contains(dialect.mask()))
            .collect();
        if candidates.is_empty() {
            return Err(ShaderError::unsupported(format!("builtin '{name}'"), dialect));
        }

        let mut best: Option<Resolved<'_>> = None;
        let mut arity_seen = false;
        for overload in candidates.iter().copied() {
            if overload.params.len() != args.len() {
                continue;
            }
            arity_seen = true;
            let mut cost = 0;
            let mut adapted = Vec::with_capacity(args.len());
            let mut ok = true;
            for (arg, param) in args.iter().zip(&overload.params) {
                let matched = if param.by_ref {
                    (arg.ty == param.ty).then(|| (0, arg.clone()))
                } else {
                    match_arg(arg, &param.ty)
                };
                match matched {
                    Some((c, e)) => {
                        cost += c;
                        adapted.push(e);
                    }
                    None => {
                        ok = false;
                        break;
                    }
                }
            }
            if ok && best.as_ref().is_none_or(|b| cost < b.cost) {
                best = Some(Resolved {
                    overload,
                    args: adapted,
                    cost,
                });
            }
        }

        if let Some(resolved) = best {
            log::trace!(
                "resolved {name}({}) -> {} (cost {})",
                describe_args(args),
                resolved.overload.name,
                resolved.cost
            );
            return Ok(resolved);
        }
        if !arity_seen {
            return Err(ShaderError::ParamCount {
                function: name.to_string(),
                expected: candidates[0].params.len(),
                found: args.len(),
            });
        }
        Err(ShaderError::NoOverload {
            function: name.to_string(),
            args: describe_args(args),
        })
    }
}

/// Comma-separated argument types, for diagnostics.
#[must_use]
pub fn describe_args(args: &[Expr]) -> String {
    args.iter()
        .map(|a| a.ty.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_literal_broadcasts_into_vector_overload() {
        let registry = BuiltinRegistry::standard();
        let v = Expr::new(
            ExprKind::Literal(crate::ast::Literal::F32(0.0)),
            Type::vec3f(),
            true,
            false,
        );
        let resolved = registry
            .resolve("max", Dialect::Wgsl, &[v, Expr::literal(0.5)])
            .unwrap();
        assert_eq!(resolved.cost, 2);
        assert_eq!(resolved.args[1].ty, Type::vec3f());
    }

    #[test]
    fn exact_match_beats_promotion() {
        let registry = BuiltinRegistry::standard();
        let resolved = registry
            .resolve("abs", Dialect::Wgsl, &[Expr::i32(-3)])
            .unwrap();
        assert_eq!(resolved.cost, 0);
        assert_eq!(resolved.overload.ret, Type::i32());
    }

    #[test]
    fn unknown_builtin() {
        let registry = BuiltinRegistry::standard();
        assert!(matches!(
            registry.resolve("frobnicate", Dialect::Wgsl, &[]),
            Err(ShaderError::UndeclaredFunction(_))
        ));
    }

    #[test]
    fn wrong_arity_reports_param_count() {
        let registry = BuiltinRegistry::standard();
        let err = registry
            .resolve("sin", Dialect::GlslEs300, &[Expr::f32(1.0), Expr::f32(2.0)])
            .unwrap_err();
        assert!(matches!(err, ShaderError::ParamCount { expected: 1, found: 2, .. }));
    }
}
