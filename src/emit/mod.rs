//! Source Emission
//!
//! Turns the finished stage modules into source text.
//!
//! # Overview
//!
//! - [`glsl`]: GLSL ES 1.00 and GLSL ES 3.00, one emitter parameterized by
//!   version.
//! - [`wgsl`]: WGSL, including synthesis of the entry point and its
//!   input/output structs.
//! - [`templates`]: the embedded module templates both emitters render into.
//!
//! Expressions render the same way in every dialect apart from variable
//! references and pointer operations, so the expression renderer lives
//! here and the emitters only differ in statements and module layout.

mod glsl;
mod templates;
mod wgsl;

use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::ast::{
    Block, BuiltinVar, DeclKind, Expr, ExprKind, MemberAccess, Stmt, Variable, visit_block,
};
use crate::dialect::{Dialect, ShaderStage};
use crate::errors::{Result, ShaderError};
use crate::program::ProgramOptions;
use crate::types::{ScalarKind, Type};
use crate::uniforms::BLOCK_TAG;

const INDENT: &str = "    ";

/// A finished stage, ready for binding assignment and emission.
#[derive(Debug)]
pub(crate) struct StageModule {
    pub stage: ShaderStage,
    /// Structs, global declarations and functions, in declaration order.
    pub globals: Block,
    /// Body of the user `main`.
    pub main: Block,
    /// Builtin variables the stage requested.
    pub builtins: Vec<Variable>,
    /// GLSL extension directives.
    pub extensions: BTreeSet<&'static str>,
    pub uses_f16: bool,
    /// Varying location carrying the unclamped depth, when depth clamping
    /// is emulated.
    pub depth_clamp_location: Option<u32>,
}

impl StageModule {
    /// Builtins referenced anywhere in the stage.
    pub(crate) fn used_builtins(&self) -> BTreeSet<BuiltinVar> {
        let mut used = BTreeSet::new();
        let mut visit = |e: &Expr| {
            e.visit_variables(&mut |v: &Variable| {
                if let Some(b) = v.builtin {
                    used.insert(b);
                }
            });
        };
        visit_block(&self.globals, &mut visit);
        visit_block(&self.main, &mut visit);
        used
    }

    /// Whether the stage body writes `builtin`.
    pub(crate) fn writes_builtin(&self, builtin: BuiltinVar) -> bool {
        self.builtins
            .iter()
            .any(|v| v.builtin == Some(builtin) && v.is_writable())
    }

    /// Struct types declared in this stage.
    pub(crate) fn structs(&self) -> Vec<Type> {
        self.globals
            .iter()
            .filter_map(|s| match s {
                Stmt::Struct(ty) => Some(ty.clone()),
                _ => None,
            })
            .collect()
    }

    /// Struct types of generated uniform blocks.
    pub(crate) fn block_types(&self) -> Vec<Type> {
        self.globals
            .iter()
            .filter_map(|s| match s {
                Stmt::Declare { var, .. } if var.has_tag(BLOCK_TAG) => Some(var.ty.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Emits one stage in the dialect selected by `options`.
pub(crate) fn emit_stage(module: &StageModule, options: &ProgramOptions) -> Result<String> {
    match options.dialect {
        Dialect::Wgsl => wgsl::emit(module, options),
        Dialect::GlslEs100 | Dialect::GlslEs300 => glsl::emit(module, options),
    }
}

/// Source text of `expr`, for diagnostics.
#[must_use]
pub fn render_expr(expr: &Expr, dialect: Dialect) -> String {
    let ctx = Ctx {
        dialect,
        stage: ShaderStage::Vertex,
        padded: &[],
    };
    ctx.expr(expr).unwrap_or_else(|_| format!("<{}>", expr.ty))
}

/// Whether every struct reachable from `ty` is declared in `structs`.
pub(crate) fn structs_declared(ty: &Type, structs: &[Type]) -> bool {
    let mut ok = true;
    ty.visit_structs(&mut |s| ok &= structs.contains(s));
    ok
}

// ============================================================================
// Expressions
// ============================================================================

/// Vector an element of a uniform array is widened to so that the array
/// gets the 16-byte stride uniform buffers require. Only 32-bit scalars and
/// 2-component vectors are widened.
pub(crate) fn padded_element(element: &Type) -> Option<Type> {
    let p = element.as_primitive()?;
    let kind = p.scalar.shader_kind();
    let narrow = p.is_scalar() || (p.is_vector() && p.rows == 2);
    (narrow && matches!(kind, ScalarKind::F32 | ScalarKind::I32 | ScalarKind::U32))
        .then(|| Type::vector(kind, 4))
}

/// Whether `ty` is, or nests, an array whose elements are widened in
/// uniform memory.
pub(crate) fn has_padded_array(ty: &Type) -> bool {
    ty.element().is_some_and(|element| {
        ty.is_array() && (padded_element(&element).is_some() || has_padded_array(&element))
    })
}

/// Dialect and stage an expression is rendered for.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Ctx<'a> {
    pub dialect: Dialect,
    pub stage: ShaderStage,
    /// Structs declared with uniform buffer placement, whose widened array
    /// members are read back through a swizzle.
    pub padded: &'a [Type],
}

impl Ctx<'_> {
    fn var(self, v: &Variable) -> Result<String> {
        if let Some(builtin) = v.builtin {
            if self.dialect.is_wgsl() {
                let holder = if builtin.is_output() { "builtin_out" } else { "builtin_in" };
                return Ok(format!("{holder}.{}", builtin.field_name()));
            }
            return builtin.glsl_name(self.dialect).map(str::to_string).ok_or_else(|| {
                ShaderError::unsupported(format!("builtin {}", builtin.wgsl_name()), self.dialect)
            });
        }
        if self.dialect == Dialect::GlslEs100
            && self.stage == ShaderStage::Fragment
            && v.kind == DeclKind::Out
        {
            return Ok("gl_FragColor".into());
        }
        Ok(v.access_path().unwrap_or_else(|| v.name.clone()))
    }

    fn list(self, args: &[Expr]) -> Result<String> {
        let parts = args.iter().map(|a| self.expr(a)).collect::<Result<Vec<_>>>()?;
        Ok(parts.join(", "))
    }

    /// Whether `e` reads memory laid out for a uniform buffer.
    fn in_uniform_memory(self, e: &Expr) -> bool {
        match &e.kind {
            ExprKind::Var(v) => {
                v.kind == DeclKind::Uniform && !v.ty.is_texture() && !v.ty.is_sampler()
            }
            ExprKind::Member {
                base,
                access: MemberAccess::Field(_),
            } => self.padded.contains(&base.ty),
            ExprKind::Index { base, .. } => self.in_uniform_memory(base),
            _ => false,
        }
    }

    /// Swizzle reading an element back out of a widened uniform array.
    fn widened_component(self, base: &Expr) -> Option<&'static str> {
        if !self.dialect.is_wgsl() || !self.in_uniform_memory(base) {
            return None;
        }
        let element = base.ty.element().filter(|_| base.ty.is_array())?;
        padded_element(&element)?;
        Some(if element.is_vector() { "xy" } else { "x" })
    }

    pub(crate) fn expr(self, e: &Expr) -> Result<String> {
        if self.dialect.is_wgsl() && has_padded_array(&e.ty) && self.in_uniform_memory(e) {
            return Err(ShaderError::unsupported(
                "whole-array reads of uniform arrays of scalars or 2-component vectors",
                self.dialect,
            ));
        }
        self.place(e)
    }

    /// Renders `e` without the whole-array check, for index bases.
    fn place(self, e: &Expr) -> Result<String> {
        Ok(match &e.kind {
            ExprKind::Var(v) => self.var(v)?,
            ExprKind::Literal(lit) => lit.render(self.dialect),
            ExprKind::Construct(args) => {
                if self.padded.contains(&e.ty)
                    && e.ty
                        .as_struct()
                        .is_some_and(|st| st.members.iter().any(|m| has_padded_array(&m.ty)))
                {
                    return Err(ShaderError::unsupported(
                        format!("constructing {} with a widened uniform array", e.ty),
                        self.dialect,
                    ));
                }
                format!("{}({})", e.ty.type_name(self.dialect)?, self.list(args)?)
            }
            ExprKind::Cast(value) => {
                format!("{}({})", e.ty.type_name(self.dialect)?, self.expr(value)?)
            }
            ExprKind::Unary { op, operand } => format!("({}{})", op.symbol(), self.expr(operand)?),
            ExprKind::Binary { op, lhs, rhs } => {
                format!("({} {} {})", self.expr(lhs)?, op.symbol(), self.expr(rhs)?)
            }
            ExprKind::Index { base, index } => {
                let text = format!("{}[{}]", self.place(base)?, self.expr(index)?);
                match self.widened_component(base) {
                    Some(swizzle) => format!("{text}.{swizzle}"),
                    None => text,
                }
            }
            ExprKind::Member { base, access } => {
                let name = match access {
                    MemberAccess::Field(name) | MemberAccess::Swizzle(name) => name,
                };
                format!("{}.{name}", self.expr(base)?)
            }
            ExprKind::AddressOf(inner) => {
                self.require_pointers()?;
                match &inner.kind {
                    ExprKind::Deref(ptr) => self.expr(ptr)?,
                    _ => format!("&{}", self.expr(inner)?),
                }
            }
            ExprKind::Deref(inner) => {
                self.require_pointers()?;
                match &inner.kind {
                    ExprKind::AddressOf(target) => self.expr(target)?,
                    _ => format!("(*{})", self.expr(inner)?),
                }
            }
            ExprKind::Call { callee, args } => format!("{}({})", callee.name(), self.list(args)?),
        })
    }

    fn require_pointers(self) -> Result<()> {
        if self.dialect.is_wgsl() {
            Ok(())
        } else {
            Err(ShaderError::internal(format!(
                "pointer expression reached the {} backend",
                self.dialect
            )))
        }
    }
}

/// Whether `text` is a single parenthesized group.
fn is_grouped(text: &str) -> bool {
    if !text.starts_with('(') || !text.ends_with(')') {
        return false;
    }
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 && i + 1 < text.len() {
                    return false;
                }
            }
            _ => {}
        }
    }
    true
}

/// `text` in parentheses, without doubling existing ones.
pub(crate) fn paren(text: &str) -> String {
    if is_grouped(text) {
        text.to_string()
    } else {
        format!("({text})")
    }
}

/// Negation of a rendered condition.
pub(crate) fn negate(cond: &str) -> String {
    format!("!{}", paren(cond))
}

// ============================================================================
// Line Writer
// ============================================================================

/// Accumulates indented source lines.
#[derive(Debug, Default)]
pub(crate) struct Lines {
    out: String,
    depth: usize,
}

impl Lines {
    pub(crate) fn with_depth(depth: usize) -> Self {
        Self {
            out: String::new(),
            depth,
        }
    }

    pub(crate) fn line(&mut self, text: impl AsRef<str>) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        let _ = writeln!(self.out, "{}", text.as_ref());
    }

    pub(crate) fn open(&mut self, text: impl AsRef<str>) {
        self.line(text);
        self.depth += 1;
    }

    pub(crate) fn close(&mut self, text: impl AsRef<str>) {
        self.depth = self.depth.saturating_sub(1);
        self.line(text);
    }

    pub(crate) fn finish(self) -> String {
        self.out
    }
}
