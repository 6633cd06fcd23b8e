//! Named access classification.
//!
//! Resolves a textual accessor (`"0"`, `"xy"`, `"color"`) against the type
//! of the value it is applied to.

use crate::errors::{Result, ShaderError};
use crate::types::{Type, TypeKind};

/// What a named access denotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessKind {
    /// Constant element index.
    Index(u32),
    /// Swizzle, normalized to `xyzw` letters.
    Swizzle(String),
    /// Struct field; carries the field type.
    Field(Type),
}

const SWIZZLE_SETS: [&str; 3] = ["xyzw", "rgba", "stpq"];

fn swizzle(ty: &Type, width: u8, mask: &str) -> Result<String> {
    let invalid = || ShaderError::InvalidSwizzle {
        ty: ty.to_string(),
        mask: mask.to_string(),
    };
    if mask.is_empty() || mask.len() > 4 {
        return Err(invalid());
    }
    let set = SWIZZLE_SETS
        .iter()
        .find(|set| mask.chars().all(|c| set.contains(c)))
        .ok_or_else(invalid)?;
    mask.chars()
        .map(|c| {
            let idx = set.find(c).ok_or_else(invalid)?;
            if idx >= usize::from(width) {
                return Err(invalid());
            }
            Ok(char::from(b"xyzw"[idx]))
        })
        .collect()
}

/// Classifies `name` applied to a value of type `ty`.
pub fn classify_access(ty: &Type, name: &str) -> Result<AccessKind> {
    if !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()) {
        let index: u32 = name.parse().map_err(|_| ShaderError::UnknownMember {
            ty: ty.to_string(),
            member: name.to_string(),
        })?;
        if ty.element().is_none() {
            return Err(ShaderError::UnknownMember {
                ty: ty.to_string(),
                member: name.to_string(),
            });
        }
        if let Some(count) = ty.element_count()
            && index >= count
        {
            return Err(ShaderError::ParamType {
                function: "index".into(),
                index: 0,
                message: format!("index {index} out of bounds for {ty}"),
            });
        }
        return Ok(AccessKind::Index(index));
    }

    match ty.kind() {
        TypeKind::Struct(s) => s
            .member(name)
            .map(|m| AccessKind::Field(m.ty.clone()))
            .ok_or_else(|| ShaderError::UnknownMember {
                ty: ty.to_string(),
                member: name.to_string(),
            }),
        TypeKind::Primitive(p) if p.is_vector() => {
            swizzle(ty, p.rows, name).map(AccessKind::Swizzle)
        }
        TypeKind::Primitive(p) if p.is_scalar() => Err(ShaderError::InvalidSwizzle {
            ty: ty.to_string(),
            mask: name.to_string(),
        }),
        _ => Err(ShaderError::UnknownMember {
            ty: ty.to_string(),
            member: name.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swizzles_normalize_to_xyzw() {
        assert_eq!(
            classify_access(&Type::vec4f(), "bgr").unwrap(),
            AccessKind::Swizzle("zyx".into())
        );
        assert_eq!(
            classify_access(&Type::vec2f(), "ts").unwrap(),
            AccessKind::Swizzle("yx".into())
        );
    }

    #[test]
    fn swizzle_errors() {
        assert!(matches!(
            classify_access(&Type::vec2f(), "xyz"),
            Err(ShaderError::InvalidSwizzle { .. })
        ));
        assert!(classify_access(&Type::vec4f(), "xg").is_err());
        assert!(classify_access(&Type::vec4f(), "xyzwx").is_err());
        assert!(classify_access(&Type::f32(), "x").is_err());
    }

    #[test]
    fn numeric_and_field_access() {
        assert_eq!(
            classify_access(&Type::mat4f(), "2").unwrap(),
            AccessKind::Index(2)
        );
        let s = Type::structure("S").member("a", Type::f32()).build();
        assert_eq!(
            classify_access(&s, "a").unwrap(),
            AccessKind::Field(Type::f32())
        );
        assert!(matches!(
            classify_access(&s, "b"),
            Err(ShaderError::UnknownMember { .. })
        ));
    }
}
