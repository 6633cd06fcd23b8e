//! Expression construction and type checking.

use super::StageBuilder;
use crate::ast::{
    AccessKind, BinaryOp, Callee, DeclKind, Expr, ExprKind, IntoExpr, Literal, MemberAccess,
    UnaryOp, classify_access,
};
use crate::builtins::{describe_args, match_arg};
use crate::dialect::Dialect;
use crate::errors::{Result, ShaderError};
use crate::types::{AddressSpace, Primitive, ScalarKind, Type};

/// GLSL builtin implementing a component-wise vector comparison.
fn vector_compare_builtin(op: BinaryOp) -> Option<&'static str> {
    Some(match op {
        BinaryOp::Lt => "lessThan",
        BinaryOp::Le => "lessThanEqual",
        BinaryOp::Gt => "greaterThan",
        BinaryOp::Ge => "greaterThanEqual",
        BinaryOp::Eq => "equal",
        BinaryOp::Ne => "notEqual",
        _ => return None,
    })
}

/// Scalar kind shared by two untyped literals.
fn common_literal_kind(a: Literal, b: Literal) -> ScalarKind {
    let any = |f: fn(&Literal) -> bool| f(&a) || f(&b);
    if any(|l| matches!(l, Literal::Bool(_))) {
        ScalarKind::Bool
    } else if any(|l| matches!(l, Literal::AbstractFloat(_))) {
        ScalarKind::F32
    } else if a.promote_to(ScalarKind::I32).is_some() && b.promote_to(ScalarKind::I32).is_some() {
        ScalarKind::I32
    } else {
        ScalarKind::U32
    }
}

fn promote(lit: Literal, kind: ScalarKind, other: &Type) -> Result<Expr> {
    lit.promote_to(kind)
        .map(Expr::literal)
        .ok_or_else(|| ShaderError::type_cast(other, lit.ty()))
}

impl StageBuilder<'_> {
    /// An untyped literal.
    #[must_use]
    pub fn lit(&self, value: impl Into<Literal>) -> Expr {
        Expr::literal(value)
    }

    /// Gives an untyped literal its default concrete type.
    pub(crate) fn concretize(&self, e: Expr) -> Expr {
        match e.abstract_literal() {
            Some(lit) if lit.is_abstract() => lit
                .promote_to(lit.default_kind())
                .map_or(e, Expr::literal),
            _ => e,
        }
    }

    // ========================================================================
    // Constructors & Casts
    // ========================================================================

    /// Type constructor. `args` are matched against every constructor shape
    /// of `ty` with the same scoring as builtin overloads.
    pub fn construct(&mut self, ty: Type, args: &[Expr]) -> Result<Expr> {
        self.use_type(&ty)?;
        let name = ty.type_name(self.dialect())?;
        if !ty.is_constructible() {
            return Err(ShaderError::ParamType {
                function: name,
                index: 0,
                message: format!("{ty} has no constructor"),
            });
        }
        let variants = ty.constructor_variants(self.dialect());
        if variants.is_empty() {
            return Err(ShaderError::unsupported(format!("{ty} constructors"), self.dialect()));
        }

        let mut best: Option<(u32, Vec<Expr>)> = None;
        for variant in variants.iter().filter(|v| v.len() == args.len()) {
            let mut cost = 0;
            let mut adapted = Vec::with_capacity(args.len());
            let matched = args.iter().zip(variant).all(|(arg, param)| {
                match_arg(arg, param).is_some_and(|(c, e)| {
                    cost += c;
                    adapted.push(e);
                    true
                })
            });
            if matched && best.as_ref().is_none_or(|(c, _)| cost < *c) {
                best = Some((cost, adapted));
            }
        }

        let Some((_, args)) = best else {
            if variants.iter().all(|v| v.len() != args.len()) {
                return Err(ShaderError::ParamCount {
                    function: name,
                    expected: variants[0].len(),
                    found: args.len(),
                });
            }
            return Err(ShaderError::NoOverload {
                function: name,
                args: describe_args(args),
            });
        };
        let is_const = args.iter().all(|a| a.is_const);
        Ok(Expr::new(ExprKind::Construct(args), ty, is_const, false))
    }

    /// Value conversion between primitives of the same shape.
    pub fn cast(&mut self, ty: Type, value: impl IntoExpr) -> Result<Expr> {
        let value = value.into_expr();
        ty.type_name(self.dialect())?;
        if value.ty == ty {
            return Ok(value);
        }
        let (Some(to), Some(from)) = (ty.as_primitive(), value.ty.as_primitive()) else {
            return Err(ShaderError::type_cast(&ty, &value.ty));
        };
        if to.rows != from.rows || to.cols != from.cols {
            return Err(ShaderError::type_cast(&ty, &value.ty));
        }
        if let Some(lit) = value.abstract_literal()
            && let Some(promoted) = lit.promote_to(to.scalar)
        {
            return Ok(Expr::literal(promoted));
        }
        let value = self.concretize(value);
        let is_const = value.is_const;
        Ok(Expr::new(ExprKind::Cast(value), ty, is_const, false))
    }

    // ========================================================================
    // Operators
    // ========================================================================

    pub fn unary(&mut self, op: UnaryOp, operand: impl IntoExpr) -> Result<Expr> {
        let operand = operand.into_expr();
        if op == UnaryOp::Neg
            && let Some(lit) = operand.abstract_literal()
        {
            match lit {
                Literal::AbstractInt(v) => {
                    let negated = v.checked_neg().ok_or_else(|| {
                        ShaderError::type_cast("an integer literal", format!("-({v})"))
                    })?;
                    return Ok(Expr::literal(Literal::AbstractInt(negated)));
                }
                Literal::AbstractFloat(v) => {
                    return Ok(Expr::literal(Literal::AbstractFloat(-v)));
                }
                _ => {}
            }
        }
        let operand = self.concretize(operand);
        let prim = operand
            .ty
            .as_primitive()
            .ok_or_else(|| ShaderError::type_cast("a scalar or vector", &operand.ty))?;
        let ok = match op {
            UnaryOp::Neg => prim.scalar.is_numeric(),
            UnaryOp::Not => prim.scalar == ScalarKind::Bool && prim.is_scalar(),
            UnaryOp::BitNot => {
                if self.dialect() == Dialect::GlslEs100 {
                    return Err(ShaderError::unsupported("bitwise operators", self.dialect()));
                }
                prim.scalar.is_integer() && !prim.is_matrix()
            }
        };
        if !ok {
            let expected = match op {
                UnaryOp::Neg => "a numeric type",
                UnaryOp::Not => "bool",
                UnaryOp::BitNot => "an integer type",
            };
            return Err(ShaderError::type_cast(expected, &operand.ty));
        }
        let ty = operand.ty.clone();
        let is_const = operand.is_const;
        Ok(Expr::new(ExprKind::Unary { op, operand }, ty, is_const, false))
    }

    pub fn neg(&mut self, operand: impl IntoExpr) -> Result<Expr> {
        self.unary(UnaryOp::Neg, operand)
    }

    pub fn not(&mut self, operand: impl IntoExpr) -> Result<Expr> {
        self.unary(UnaryOp::Not, operand)
    }

    /// Binary operation. Operations GLSL spells as functions (float `%`,
    /// vector comparisons) are rewritten into builtin calls.
    pub fn binary(&mut self, op: BinaryOp, lhs: impl IntoExpr, rhs: impl IntoExpr) -> Result<Expr> {
        let (lhs, rhs) = self.unify(op, lhs.into_expr(), rhs.into_expr())?;
        if self.dialect().is_glsl() {
            if op == BinaryOp::Rem {
                let float = lhs.ty.scalar_kind().is_some_and(ScalarKind::is_float);
                if float || self.dialect() == Dialect::GlslEs100 {
                    return self.call("mod", &[lhs, rhs]);
                }
            }
            if let Some(name) = vector_compare_builtin(op)
                && (lhs.ty.is_vector() || rhs.ty.is_vector())
            {
                return self.call(name, &[lhs, rhs]);
            }
        }
        self.binary_node(op, lhs, rhs)
    }

    /// Gives untyped literal operands the type of the other side.
    fn unify(&self, op: BinaryOp, lhs: Expr, rhs: Expr) -> Result<(Expr, Expr)> {
        let shift = matches!(op, BinaryOp::Shl | BinaryOp::Shr);
        match (lhs.abstract_literal(), rhs.abstract_literal()) {
            (Some(a), Some(b)) => {
                let kind = common_literal_kind(a, b);
                let rhs_kind = if shift && self.dialect().is_wgsl() {
                    ScalarKind::U32
                } else {
                    kind
                };
                Ok((
                    promote(a, kind, &rhs.ty)?,
                    promote(b, rhs_kind, &lhs.ty)?,
                ))
            }
            (Some(a), None) => {
                let kind = rhs
                    .ty
                    .scalar_kind()
                    .ok_or_else(|| ShaderError::type_cast("a scalar or vector", &rhs.ty))?;
                Ok((promote(a, kind, &rhs.ty)?, rhs))
            }
            (None, Some(b)) => {
                let kind = lhs
                    .ty
                    .scalar_kind()
                    .ok_or_else(|| ShaderError::type_cast("a scalar or vector", &lhs.ty))?;
                if shift && self.dialect().is_wgsl() {
                    let amount = promote(b, ScalarKind::U32, &Type::u32())?;
                    let amount = match lhs.ty.as_primitive() {
                        Some(p) if p.is_vector() => Expr::new(
                            ExprKind::Construct(vec![amount]),
                            Type::vector(ScalarKind::U32, p.rows),
                            true,
                            false,
                        ),
                        _ => amount,
                    };
                    return Ok((lhs, amount));
                }
                let rhs = promote(b, kind, &lhs.ty)?;
                Ok((lhs, rhs))
            }
            (None, None) => Ok((lhs, rhs)),
        }
    }

    /// Typed binary node, without dialect rewriting.
    pub(crate) fn binary_node(&mut self, op: BinaryOp, lhs: Expr, rhs: Expr) -> Result<Expr> {
        let (lhs, rhs) = self.unify(op, lhs, rhs)?;
        let mismatch = || ShaderError::type_cast(&lhs.ty, &rhs.ty);
        let (Some(l), Some(r)) = (lhs.ty.as_primitive(), rhs.ty.as_primitive()) else {
            return Err(mismatch());
        };
        let shift = matches!(op, BinaryOp::Shl | BinaryOp::Shr);
        if !shift && l.scalar.shader_kind() != r.scalar.shader_kind() {
            return Err(mismatch());
        }

        let ty = if op.is_arithmetic() {
            if !l.scalar.is_numeric() {
                return Err(ShaderError::type_cast("a numeric type", &lhs.ty));
            }
            arithmetic_result(op, l, r).ok_or_else(mismatch)?
        } else if op.is_comparison() {
            let ordered = !matches!(op, BinaryOp::Eq | BinaryOp::Ne);
            if l != r || l.is_matrix() || (ordered && !l.scalar.is_numeric()) {
                return Err(mismatch());
            }
            Type::vector(ScalarKind::Bool, l.rows)
        } else if op.is_logical() {
            if !(l.scalar == ScalarKind::Bool && l.is_scalar() && r.is_scalar()) {
                return Err(ShaderError::type_cast(Type::bool(), &lhs.ty));
            }
            Type::bool()
        } else {
            if self.dialect() == Dialect::GlslEs100 {
                return Err(ShaderError::unsupported("bitwise operators", self.dialect()));
            }
            if !l.scalar.is_integer() || !r.scalar.is_integer() || l.is_matrix() {
                return Err(ShaderError::type_cast("an integer type", &lhs.ty));
            }
            if shift {
                if self.dialect().is_wgsl()
                    && (r.scalar != ScalarKind::U32 || r.rows != l.rows)
                {
                    return Err(ShaderError::type_cast(
                        Type::vector(ScalarKind::U32, l.rows),
                        &rhs.ty,
                    ));
                }
                lhs.ty.clone()
            } else if l == r || r.is_scalar() {
                lhs.ty.clone()
            } else if l.is_scalar() {
                rhs.ty.clone()
            } else {
                return Err(mismatch());
            }
        };

        let is_const = lhs.is_const && rhs.is_const;
        Ok(Expr::new(ExprKind::Binary { op, lhs, rhs }, ty, is_const, false))
    }

    // ========================================================================
    // Access
    // ========================================================================

    fn auto_deref(&self, e: Expr) -> Expr {
        match e.ty.pointee() {
            Some(pointee) => Expr::new(ExprKind::Deref(e), pointee, false, true),
            None => e,
        }
    }

    /// Indexes an array, vector or matrix.
    pub fn index(&mut self, base: impl IntoExpr, index: impl IntoExpr) -> Result<Expr> {
        let base = self.auto_deref(base.into_expr());
        let mut index = index.into_expr();
        if let Some(lit) = index.abstract_literal() {
            index = lit
                .promote_to(ScalarKind::I32)
                .or_else(|| lit.promote_to(ScalarKind::U32))
                .map(Expr::literal)
                .ok_or_else(|| ShaderError::type_cast(Type::i32(), lit.ty()))?;
        }
        if !index.ty.as_primitive().is_some_and(|p| p.is_scalar() && p.scalar.is_integer()) {
            return Err(ShaderError::type_cast(Type::i32(), &index.ty));
        }
        let element = base
            .ty
            .element()
            .ok_or_else(|| ShaderError::type_cast("an indexable type", &base.ty))?;
        if let (ExprKind::Literal(lit), Some(count)) = (&index.kind, base.ty.element_count()) {
            let value = match *lit {
                Literal::I32(v) => i64::from(v),
                Literal::U32(v) => i64::from(v),
                _ => 0,
            };
            if value < 0 || value >= i64::from(count) {
                return Err(ShaderError::ParamType {
                    function: "index".into(),
                    index: 1,
                    message: format!("index {value} is out of bounds for {}", base.ty),
                });
            }
        }
        let is_reference = base.is_reference;
        let is_const = base.is_const && index.is_const;
        Ok(Expr::new(ExprKind::Index { base, index }, element, is_const, is_reference))
    }

    /// Member access by name: a struct field, a swizzle (`xyz`, `rgba`,
    /// `stpq`) or a numeric index (`"0"`).
    pub fn get(&mut self, base: impl IntoExpr, name: &str) -> Result<Expr> {
        let base = self.auto_deref(base.into_expr());
        if let Some(cached) = base.cached_access(name) {
            return Ok(cached);
        }
        let expr = match classify_access(&base.ty, name)? {
            AccessKind::Index(i) => self.index(&base, Expr::literal(i64::from(i)))?,
            AccessKind::Swizzle(mask) => {
                let kind = base.ty.scalar_kind().unwrap_or(ScalarKind::F32);
                let ty = Type::vector(kind, mask.len() as u8);
                let distinct = mask
                    .chars()
                    .enumerate()
                    .all(|(i, c)| !mask[..i].contains(c));
                let is_reference = base.is_reference
                    && (mask.len() == 1 || (self.dialect().is_glsl() && distinct));
                let is_const = base.is_const;
                Expr::new(
                    ExprKind::Member {
                        base: base.clone(),
                        access: MemberAccess::Swizzle(mask),
                    },
                    ty,
                    is_const,
                    is_reference,
                )
            }
            AccessKind::Field(ty) => {
                let is_reference = base.is_reference;
                let is_const = base.is_const;
                Expr::new(
                    ExprKind::Member {
                        base: base.clone(),
                        access: MemberAccess::Field(name.to_string()),
                    },
                    ty,
                    is_const,
                    is_reference,
                )
            }
        };
        base.cache_access(name, &expr);
        Ok(expr)
    }

    /// Takes the address of a writable location.
    pub fn address_of(&mut self, target: impl IntoExpr) -> Result<Expr> {
        let target = target.into_expr();
        let root = target.root_variable();
        if let Some(root) = &root
            && root.kind == DeclKind::Uniform
        {
            return Err(ShaderError::UniformNotWritable(root.name.clone()));
        }
        let swizzle = matches!(
            &target.kind,
            ExprKind::Member {
                access: MemberAccess::Swizzle(_),
                ..
            }
        );
        if !target.is_reference || swizzle {
            return Err(ShaderError::ReferenceRequired(format!(
                "cannot take the address of a {} value",
                target.ty
            )));
        }
        if self.dialect().is_glsl() {
            return Err(ShaderError::unsupported("pointers", self.dialect()));
        }
        let space = match root.as_ref().map(|r| r.kind) {
            Some(DeclKind::Workgroup) => AddressSpace::Workgroup,
            Some(DeclKind::Storage) => AddressSpace::Storage,
            Some(DeclKind::Out | DeclKind::In | DeclKind::Builtin) => AddressSpace::Private,
            _ => AddressSpace::Function,
        };
        target.mark_writable();
        let ty = Type::pointer(target.ty.clone(), space);
        Ok(Expr::new(ExprKind::AddressOf(target), ty, false, false))
    }

    /// Dereferences a pointer. Non-pointer values pass through unchanged.
    pub fn deref(&mut self, value: impl IntoExpr) -> Result<Expr> {
        Ok(self.auto_deref(value.into_expr()))
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Calls a builtin function.
    ///
    /// Calls returning `void` are also emitted as statements.
    pub fn call(&mut self, name: &str, args: &[Expr]) -> Result<Expr> {
        if self.scopes.is_global() {
            return Err(ShaderError::NonScopedCall(name.to_string()));
        }
        let entry = self
            .registry
            .get(name)
            .ok_or_else(|| ShaderError::UndeclaredFunction(name.to_string()))?;
        let expr = match entry.normalize {
            Some(normalize) => normalize(self, name, args)?,
            None => self.builtin_call(name, args)?,
        };
        if expr.ty.is_void() {
            self.scopes.push_stmt(crate::ast::Stmt::Touch(expr.clone()))?;
        }
        Ok(expr)
    }

    /// Resolves `name` against the registry and builds the call node.
    pub(crate) fn builtin_call(&mut self, name: &str, args: &[Expr]) -> Result<Expr> {
        let registry = self.registry;
        let resolved = registry.resolve(name, self.dialect(), args)?;
        let wgsl = self.dialect().is_wgsl();
        let mut call_args = Vec::with_capacity(resolved.args.len());
        for (index, (arg, param)) in resolved.args.into_iter().zip(&resolved.overload.params).enumerate() {
            if !param.by_ref {
                call_args.push(arg);
                continue;
            }
            if let Some(root) = arg.root_variable()
                && root.kind == DeclKind::Uniform
            {
                return Err(ShaderError::UniformNotWritable(root.name.clone()));
            }
            if !arg.is_reference {
                return Err(ShaderError::ReferenceRequired(format!(
                    "argument {index} of '{name}' must be a writable location"
                )));
            }
            if wgsl {
                call_args.push(self.address_of(arg)?);
            } else {
                arg.mark_writable();
                call_args.push(arg);
            }
        }
        let is_const = false;
        Ok(Expr::new(
            ExprKind::Call {
                callee: Callee::Builtin(resolved.overload.name),
                args: call_args,
            },
            resolved.overload.ret.clone(),
            is_const,
            false,
        ))
    }
}

/// Result type of an arithmetic operator, if the operand shapes combine.
fn arithmetic_result(op: BinaryOp, l: Primitive, r: Primitive) -> Option<Type> {
    let prim = |p: Primitive| Type::primitive(p);
    if l == r {
        if l.is_matrix() {
            let square_product = op == BinaryOp::Mul && l.rows == l.cols;
            if !(square_product || matches!(op, BinaryOp::Add | BinaryOp::Sub)) {
                return None;
            }
        }
        return Some(prim(l));
    }
    if op == BinaryOp::Mul {
        if l.is_matrix() && r.is_matrix() && l.cols == r.rows {
            return Some(prim(Primitive::new(l.scalar, l.rows, r.cols)));
        }
        if l.is_matrix() && r.is_vector() && l.cols == r.rows {
            return Some(Type::vector(l.scalar, l.rows));
        }
        if l.is_vector() && r.is_matrix() && l.rows == r.rows {
            return Some(Type::vector(l.scalar, r.cols));
        }
        if l.is_matrix() && r.is_scalar() {
            return Some(prim(l));
        }
        if l.is_scalar() && r.is_matrix() {
            return Some(prim(r));
        }
    }
    if l.is_vector() && r.is_scalar() {
        return Some(prim(l));
    }
    if l.is_scalar() && r.is_vector() {
        return Some(prim(r));
    }
    None
}
