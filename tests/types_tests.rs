//! Type system tests
//!
//! Tests for:
//! - Structural identity of types built independently
//! - std140 / std430 layouts of structs, arrays and matrices
//! - Type names and declarations per dialect

use myth_shader::prelude::*;

fn light_type() -> Type {
    Type::structure("Light")
        .member("color", Type::vec3f())
        .member("intensity", Type::f32())
        .build()
}

// ============================================================================
// Identity
// ============================================================================

#[test]
fn independently_built_types_are_equal() {
    assert_eq!(Type::vector(ScalarKind::F32, 3), Type::vec3f());
    assert_eq!(Type::vector(ScalarKind::F32, 3).id(), Type::vec3f().id());
    assert_eq!(light_type(), light_type());
    assert_ne!(Type::vec3f(), Type::vector(ScalarKind::I32, 3));
    assert_ne!(
        Type::array(Type::f32(), Some(4)),
        Type::array(Type::f32(), Some(5))
    );
}

#[test]
fn layouts_are_deterministic() {
    let first = light_type().struct_layout(LayoutPolicy::Std140).unwrap();
    for _ in 0..8 {
        assert_eq!(light_type().struct_layout(LayoutPolicy::Std140).unwrap(), first);
    }
}

// ============================================================================
// Layouts
// ============================================================================

#[test]
fn std140_packs_scalar_after_vec3() {
    let layout = light_type().struct_layout(LayoutPolicy::Std140).unwrap();
    assert_eq!(layout.size, 16);
    assert_eq!(layout.align, 16);
    let offsets: Vec<_> = layout.members.iter().map(|m| (m.name.as_str(), m.offset)).collect();
    assert_eq!(offsets, vec![("color", 0), ("intensity", 12)]);
}

#[test]
fn std140_aligns_vec3_after_scalar() {
    let ty = Type::structure("Falloff")
        .member("range", Type::f32())
        .member("direction", Type::vec3f())
        .build();
    let layout = ty.struct_layout(LayoutPolicy::Std140).unwrap();
    assert_eq!(layout.members[1].offset, 16);
    assert_eq!(layout.size, 32);
}

#[test]
fn std140_arrays_use_16_byte_strides() {
    let weights = Type::array(Type::f32(), Some(4));
    assert_eq!(weights.layout(LayoutPolicy::Std140).unwrap().size, 64);
    assert_eq!(weights.layout(LayoutPolicy::Std430).unwrap().size, 16);
}

#[test]
fn matrices_are_column_arrays() {
    assert_eq!(Type::mat4f().layout(LayoutPolicy::Std140).unwrap().size, 64);
    assert_eq!(Type::mat3f().layout(LayoutPolicy::Std140).unwrap().size, 48);
}

#[test]
fn nested_structs_round_to_their_alignment() {
    let ty = Type::structure("Lights")
        .member("key", light_type())
        .member("count", Type::u32())
        .build();
    let layout = ty.struct_layout(LayoutPolicy::Std140).unwrap();
    assert_eq!(layout.members[1].offset, 16);
    assert_eq!(layout.size, 32);
}

// ============================================================================
// Names
// ============================================================================

#[test]
fn names_per_dialect() {
    let v = Type::vec3f();
    assert_eq!(v.type_name(Dialect::Wgsl).unwrap(), "vec3<f32>");
    assert_eq!(v.type_name(Dialect::GlslEs300).unwrap(), "vec3");
    assert_eq!(Type::mat4f().type_name(Dialect::Wgsl).unwrap(), "mat4x4<f32>");
    assert_eq!(Type::mat4f().type_name(Dialect::GlslEs100).unwrap(), "mat4");
}

#[test]
fn array_declarations_per_dialect() {
    let weights = Type::array(Type::f32(), Some(4));
    assert_eq!(weights.declare(Dialect::Wgsl, "w").unwrap(), "w: array<f32, 4>");
    assert_eq!(weights.declare(Dialect::GlslEs300, "w").unwrap(), "float w[4]");
}

#[test]
fn runtime_arrays_are_wgsl_only() {
    let data = Type::array(Type::f32(), None);
    assert!(data.is_runtime_array());
    assert_eq!(data.type_name(Dialect::Wgsl).unwrap(), "array<f32>");
    let err = data.type_name(Dialect::GlslEs300).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);
}

#[test]
fn unsigned_integers_need_es3() {
    assert!(Type::u32().type_name(Dialect::GlslEs100).is_err());
    assert_eq!(Type::u32().type_name(Dialect::GlslEs300).unwrap(), "uint");
}
