//! Scalar kinds and primitive (scalar / vector / matrix) shapes.

use serde::Serialize;

use crate::dialect::Dialect;
use crate::errors::{Result, ShaderError};

/// Component kind of a primitive type.
///
/// The 8/16-bit integer kinds and the normalized kinds only exist in memory
/// (vertex attributes, buffer layouts); inside a shader they are widened to
/// their 32-bit or float counterpart, see [`ScalarKind::shader_kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    Bool,
    F16,
    F32,
    I8,
    I16,
    I32,
    U8,
    U16,
    U32,
    Unorm8,
    Snorm8,
    Unorm16,
    Snorm16,
}

impl ScalarKind {
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::F16 => "f16",
            Self::F32 => "f32",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::Unorm8 => "unorm8",
            Self::Snorm8 => "snorm8",
            Self::Unorm16 => "unorm16",
            Self::Snorm16 => "snorm16",
        }
    }

    /// The kind a value of this scalar has once loaded into a shader.
    #[must_use]
    pub fn shader_kind(self) -> Self {
        match self {
            Self::I8 | Self::I16 | Self::I32 => Self::I32,
            Self::U8 | Self::U16 | Self::U32 => Self::U32,
            Self::Unorm8 | Self::Snorm8 | Self::Unorm16 | Self::Snorm16 | Self::F32 => Self::F32,
            Self::F16 => Self::F16,
            Self::Bool => Self::Bool,
        }
    }

    #[must_use]
    pub fn is_float(self) -> bool {
        matches!(self.shader_kind(), Self::F16 | Self::F32)
    }

    #[must_use]
    pub fn is_signed_int(self) -> bool {
        self.shader_kind() == Self::I32
    }

    #[must_use]
    pub fn is_unsigned_int(self) -> bool {
        self.shader_kind() == Self::U32
    }

    #[must_use]
    pub fn is_integer(self) -> bool {
        self.is_signed_int() || self.is_unsigned_int()
    }

    #[must_use]
    pub fn is_numeric(self) -> bool {
        self != Self::Bool
    }

    /// Size in bytes in memory. `bool` occupies a 32-bit word in buffers.
    #[must_use]
    pub fn byte_size(self) -> u32 {
        match self {
            Self::I8 | Self::U8 | Self::Unorm8 | Self::Snorm8 => 1,
            Self::F16 | Self::I16 | Self::U16 | Self::Unorm16 | Self::Snorm16 => 2,
            Self::Bool | Self::F32 | Self::I32 | Self::U32 => 4,
        }
    }

    /// Scalar type name in the given dialect.
    pub fn type_name(self, dialect: Dialect) -> Result<&'static str> {
        let kind = self.shader_kind();
        if dialect.is_wgsl() {
            return Ok(kind.key());
        }
        Ok(match kind {
            Self::Bool => "bool",
            Self::F16 | Self::F32 => "float",
            Self::I32 => "int",
            Self::U32 if dialect == Dialect::GlslEs300 => "uint",
            _ => return Err(ShaderError::unsupported("unsigned integer types", dialect)),
        })
    }

    /// GLSL vector name prefix (`vec`, `ivec`, `uvec`, `bvec`).
    fn glsl_vector_prefix(self, dialect: Dialect) -> Result<&'static str> {
        Ok(match self.shader_kind() {
            Self::Bool => "bvec",
            Self::F16 | Self::F32 => "vec",
            Self::I32 => "ivec",
            Self::U32 if dialect == Dialect::GlslEs300 => "uvec",
            _ => return Err(ShaderError::unsupported("unsigned integer vectors", dialect)),
        })
    }
}

/// A scalar, vector or matrix shape.
///
/// `rows` is the vector width (or matrix column height); `cols` is 1 for
/// scalars and vectors and the column count for matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Primitive {
    pub scalar: ScalarKind,
    pub rows: u8,
    pub cols: u8,
}

impl Primitive {
    #[must_use]
    pub const fn new(scalar: ScalarKind, rows: u8, cols: u8) -> Self {
        Self { scalar, rows, cols }
    }

    #[inline]
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        self.rows == 1 && self.cols == 1
    }

    #[inline]
    #[must_use]
    pub fn is_vector(&self) -> bool {
        self.rows > 1 && self.cols == 1
    }

    #[inline]
    #[must_use]
    pub fn is_matrix(&self) -> bool {
        self.cols > 1
    }

    /// Number of scalar components.
    #[must_use]
    pub fn components(&self) -> u32 {
        u32::from(self.rows) * u32::from(self.cols)
    }

    /// Same shape with a different component kind.
    #[must_use]
    pub fn with_scalar(&self, scalar: ScalarKind) -> Self {
        Self { scalar, ..*self }
    }

    pub(crate) fn key(&self) -> String {
        format!("{}x{}x{}", self.scalar.key(), self.rows, self.cols)
    }

    pub(crate) fn type_name(&self, dialect: Dialect) -> Result<String> {
        let kind = self.scalar.shader_kind();
        if self.is_scalar() {
            return self.scalar.type_name(dialect).map(str::to_string);
        }
        if self.is_vector() {
            return if dialect.is_wgsl() {
                Ok(format!("vec{}<{}>", self.rows, kind.key()))
            } else {
                Ok(format!("{}{}", self.scalar.glsl_vector_prefix(dialect)?, self.rows))
            };
        }
        if !kind.is_float() {
            return Err(ShaderError::unsupported(
                format!("{} matrices", kind.key()),
                dialect,
            ));
        }
        match dialect {
            Dialect::Wgsl => Ok(format!("mat{}x{}<{}>", self.cols, self.rows, kind.key())),
            _ if self.rows == self.cols => Ok(format!("mat{}", self.rows)),
            Dialect::GlslEs300 => Ok(format!("mat{}x{}", self.cols, self.rows)),
            Dialect::GlslEs100 => Err(ShaderError::unsupported("non-square matrices", dialect)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_integers_widen_in_shaders() {
        assert_eq!(ScalarKind::I8.shader_kind(), ScalarKind::I32);
        assert_eq!(ScalarKind::U16.shader_kind(), ScalarKind::U32);
        assert_eq!(ScalarKind::Unorm8.shader_kind(), ScalarKind::F32);
        assert!(ScalarKind::Snorm16.is_float());
    }

    #[test]
    fn primitive_names_per_dialect() {
        let v3 = Primitive::new(ScalarKind::F32, 3, 1);
        assert_eq!(v3.type_name(Dialect::Wgsl).unwrap(), "vec3<f32>");
        assert_eq!(v3.type_name(Dialect::GlslEs100).unwrap(), "vec3");

        let m = Primitive::new(ScalarKind::F32, 3, 2);
        assert_eq!(m.type_name(Dialect::Wgsl).unwrap(), "mat2x3<f32>");
        assert_eq!(m.type_name(Dialect::GlslEs300).unwrap(), "mat2x3");
        assert!(m.type_name(Dialect::GlslEs100).is_err());
    }

    #[test]
    fn unsigned_types_need_es3() {
        let u = Primitive::new(ScalarKind::U32, 2, 1);
        assert_eq!(u.type_name(Dialect::GlslEs300).unwrap(), "uvec2");
        assert!(u.type_name(Dialect::GlslEs100).is_err());
    }
}
