//! Constructor argument shapes.
//!
//! Enumerates the argument type lists a type constructor accepts so the
//! builder can match a construct call against them the same way it matches
//! builtin overloads.

use super::{Primitive, ScalarKind, Type, TypeKind};
use crate::dialect::Dialect;

fn conversion_sources(dialect: Dialect) -> Vec<ScalarKind> {
    let mut kinds = vec![ScalarKind::F32, ScalarKind::I32];
    if dialect != Dialect::GlslEs100 {
        kinds.push(ScalarKind::U32);
    }
    kinds.push(ScalarKind::Bool);
    kinds
}

/// Ordered splits of `width` components into at least two parts, each part
/// a scalar or a vector no wider than the remaining components.
fn compositions(width: u8) -> Vec<Vec<u8>> {
    fn walk(remaining: u8, current: &mut Vec<u8>, out: &mut Vec<Vec<u8>>) {
        if remaining == 0 {
            if current.len() > 1 {
                out.push(current.clone());
            }
            return;
        }
        for part in 1..=remaining.min(4) {
            current.push(part);
            walk(remaining - part, current, out);
            current.pop();
        }
    }
    let mut out = Vec::new();
    walk(width, &mut Vec::new(), &mut out);
    out
}

fn vector_variants(p: Primitive, dialect: Dialect) -> Vec<Vec<Type>> {
    let kind = p.scalar.shader_kind();
    let mut out = Vec::new();
    if dialect.is_wgsl() {
        out.push(Vec::new());
    }
    out.push(vec![Type::scalar(kind)]);
    for parts in compositions(p.rows) {
        out.push(parts.into_iter().map(|w| Type::vector(kind, w)).collect());
    }
    for src in conversion_sources(dialect) {
        if src != kind {
            out.push(vec![Type::vector(src, p.rows)]);
        }
    }
    out
}

fn matrix_variants(p: Primitive, dialect: Dialect) -> Vec<Vec<Type>> {
    let kind = p.scalar.shader_kind();
    let mut out = Vec::new();
    if dialect.is_wgsl() {
        out.push(Vec::new());
    }
    out.push(vec![Type::vector(kind, p.rows); usize::from(p.cols)]);
    out.push(vec![Type::scalar(kind); p.components() as usize]);
    if dialect.is_glsl() {
        // Diagonal matrix.
        out.push(vec![Type::scalar(kind)]);
        let sizes: &[u8] = if dialect == Dialect::GlslEs300 { &[2, 3, 4] } else { &[] };
        for &c in sizes {
            for &r in sizes {
                if (c, r) != (p.cols, p.rows) {
                    out.push(vec![Type::matrix(kind, c, r)]);
                }
            }
        }
    }
    out
}

pub(super) fn variants(ty: &Type, dialect: Dialect) -> Vec<Vec<Type>> {
    match ty.kind() {
        TypeKind::Primitive(p) if p.is_scalar() => conversion_sources(dialect)
            .into_iter()
            .map(|k| vec![Type::scalar(k)])
            .collect(),
        TypeKind::Primitive(p) if p.is_vector() => vector_variants(*p, dialect),
        TypeKind::Primitive(p) => matrix_variants(*p, dialect),
        TypeKind::Array {
            element,
            size: Some(n),
        } => {
            if dialect == Dialect::GlslEs100 {
                return Vec::new();
            }
            let mut out = Vec::new();
            if dialect.is_wgsl() {
                out.push(Vec::new());
            }
            out.push(vec![element.clone(); *n as usize]);
            out
        }
        TypeKind::Struct(s) => {
            vec![s.members.iter().map(|m| m.ty.clone()).collect()]
        }
        _ => Vec::new(),
    }
}
