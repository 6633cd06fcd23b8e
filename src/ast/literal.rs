//! Literal scalars and the implicit promotion rules for untyped literals.

use crate::dialect::Dialect;
use crate::types::{ScalarKind, Type};

/// A literal scalar value.
///
/// `AbstractInt` and `AbstractFloat` are untyped literals written by the
/// host without a suffix. They take a concrete type when matched against a
/// parameter (see [`Literal::promote_to`]) and otherwise fall back to
/// [`Literal::default_kind`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    Bool(bool),
    AbstractInt(i64),
    AbstractFloat(f64),
    F32(f32),
    F16(f32),
    I32(i32),
    U32(u32),
}

impl Literal {
    #[inline]
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        matches!(self, Self::AbstractInt(_) | Self::AbstractFloat(_))
    }

    /// Concrete kind an unmatched literal takes.
    #[must_use]
    pub fn default_kind(&self) -> ScalarKind {
        match *self {
            Self::Bool(_) => ScalarKind::Bool,
            Self::AbstractInt(v) if i32::try_from(v).is_ok() => ScalarKind::I32,
            Self::AbstractInt(v) if u32::try_from(v).is_ok() => ScalarKind::U32,
            Self::AbstractInt(_) | Self::AbstractFloat(_) | Self::F32(_) => ScalarKind::F32,
            Self::F16(_) => ScalarKind::F16,
            Self::I32(_) => ScalarKind::I32,
            Self::U32(_) => ScalarKind::U32,
        }
    }

    #[must_use]
    pub fn ty(&self) -> Type {
        Type::scalar(self.default_kind())
    }

    /// Converts an untyped literal to a literal of `kind`.
    ///
    /// Integer literals become signed when they fit in `i32`, unsigned when
    /// they fit in `u32`, and may always become floats. Float literals only
    /// become floats. `true`/`false` only match `bool`. Concrete literals
    /// only match their own kind.
    #[must_use]
    pub fn promote_to(&self, kind: ScalarKind) -> Option<Self> {
        let kind = kind.shader_kind();
        match (*self, kind) {
            (Self::Bool(b), ScalarKind::Bool) => Some(Self::Bool(b)),
            (Self::AbstractInt(v), ScalarKind::I32) => i32::try_from(v).ok().map(Self::I32),
            (Self::AbstractInt(v), ScalarKind::U32) => u32::try_from(v).ok().map(Self::U32),
            (Self::AbstractInt(v), ScalarKind::F32) => Some(Self::F32(v as f32)),
            (Self::AbstractInt(v), ScalarKind::F16) => Some(Self::F16(v as f32)),
            (Self::AbstractFloat(v), ScalarKind::F32) => Some(Self::F32(v as f32)),
            (Self::AbstractFloat(v), ScalarKind::F16) => Some(Self::F16(v as f32)),
            (lit, k) if !lit.is_abstract() && lit.default_kind() == k => Some(lit),
            _ => None,
        }
    }

    /// Literal text in the given dialect.
    #[must_use]
    pub fn render(&self, dialect: Dialect) -> String {
        match *self {
            Self::Bool(b) => b.to_string(),
            Self::AbstractInt(v) => match self.default_kind() {
                ScalarKind::I32 => Self::I32(v as i32).render(dialect),
                ScalarKind::U32 => Self::U32(v as u32).render(dialect),
                _ => Self::F32(v as f32).render(dialect),
            },
            Self::AbstractFloat(v) => Self::F32(v as f32).render(dialect),
            Self::F32(v) => float_text(v),
            Self::F16(v) if dialect.is_wgsl() => format!("{}h", float_text(v)),
            Self::F16(v) => float_text(v),
            Self::I32(i32::MIN) => {
                if dialect.is_wgsl() {
                    "i32(-2147483648)".to_string()
                } else {
                    "(-2147483647 - 1)".to_string()
                }
            }
            Self::I32(v) if dialect.is_wgsl() => format!("{v}i"),
            Self::I32(v) => v.to_string(),
            Self::U32(v) => format!("{v}u"),
        }
    }
}

fn float_text(v: f32) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{v:.1}")
    } else {
        let text = v.to_string();
        if text.contains(['.', 'e', 'E']) || !v.is_finite() {
            text
        } else {
            format!("{text}.0")
        }
    }
}

impl From<bool> for Literal {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Literal {
    fn from(v: i32) -> Self {
        Self::AbstractInt(i64::from(v))
    }
}

impl From<i64> for Literal {
    fn from(v: i64) -> Self {
        Self::AbstractInt(v)
    }
}

impl From<u32> for Literal {
    fn from(v: u32) -> Self {
        Self::U32(v)
    }
}

impl From<f32> for Literal {
    fn from(v: f32) -> Self {
        Self::AbstractFloat(f64::from(v))
    }
}

impl From<f64> for Literal {
    fn from(v: f64) -> Self {
        Self::AbstractFloat(v)
    }
}
