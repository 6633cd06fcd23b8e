//! Dialect-specific rewrites of builtin calls.
//!
//! A normalizer receives the builder, the builtin name and the raw call
//! arguments, and returns the expression the call lowers to. Most defer to
//! `builtin_call` once they have adjusted the arguments; texture builtins
//! build their call nodes directly because their signatures depend on the
//! texture type rather than on a fixed overload list.

use crate::ast::{BinaryOp, Callee, DeclKind, Expr, ExprKind, Variable};
use crate::builder::StageBuilder;
use crate::dialect::{DeviceCaps, Dialect, ShaderStage};
use crate::errors::{Result, ShaderError};
use crate::types::{
    SamplerKind, ScalarKind, StorageAccess, TextureClass, TextureDim, TextureType, Type,
};

fn call_node(name: &'static str, args: Vec<Expr>, ret: Type) -> Expr {
    Expr::new(
        ExprKind::Call {
            callee: Callee::Builtin(name),
            args,
        },
        ret,
        false,
        false,
    )
}

fn arity(name: &str, args: &[Expr], expected: &[usize]) -> Result<()> {
    if expected.contains(&args.len()) {
        Ok(())
    } else {
        Err(ShaderError::ParamCount {
            function: name.to_string(),
            expected: expected[0],
            found: args.len(),
        })
    }
}

fn param_type(name: &str, index: usize, message: impl Into<String>) -> ShaderError {
    ShaderError::ParamType {
        function: name.to_string(),
        index,
        message: message.into(),
    }
}

/// Converts `arg` to `ty`, promoting untyped literals.
fn coerce(name: &str, index: usize, arg: &Expr, ty: &Type) -> Result<Expr> {
    super::match_arg(arg, ty)
        .map(|(_, e)| e)
        .ok_or_else(|| param_type(name, index, format!("expected {ty}, found {}", arg.ty)))
}

/// Type shared by two operands, taken from the first typed one.
fn operand_type(b: &StageBuilder<'_>, args: &[Expr]) -> Type {
    args.iter()
        .find(|a| a.abstract_literal().is_none())
        .map_or_else(|| b.concretize(args[0].clone()).ty.clone(), |a| a.ty.clone())
}

// ============================================================================
// Arithmetic & Logic
// ============================================================================

/// `mod`: GLSL float modulo, `%` elsewhere. GLSL ES 1.00 has no integer
/// `%`, so integers go through float `mod`.
pub(super) fn modulo(b: &mut StageBuilder<'_>, name: &str, args: &[Expr]) -> Result<Expr> {
    arity(name, args, &[2])?;
    let ty = operand_type(b, args);
    let float = ty.scalar_kind().is_some_and(ScalarKind::is_float);
    if b.dialect().is_wgsl() || (!float && b.dialect() == Dialect::GlslEs300) {
        return b.binary_node(BinaryOp::Rem, args[0].clone(), args[1].clone());
    }
    if float {
        return b.builtin_call(name, args);
    }

    let prim = ty
        .as_primitive()
        .ok_or_else(|| param_type(name, 0, format!("expected a number, found {ty}")))?;
    let float_ty = Type::primitive(prim.with_scalar(ScalarKind::F32));
    let lhs = coerce(name, 0, &args[0], &ty)?;
    let rhs = coerce(name, 1, &args[1], &ty)?;
    let lhs = b.cast(float_ty.clone(), lhs)?;
    let rhs = b.cast(float_ty, rhs)?;
    let m = b.builtin_call(name, &[lhs, rhs])?;
    b.cast(ty, m)
}

/// Component-wise comparisons. WGSL spells them as operators, and so does
/// GLSL for scalars.
pub(super) fn compare(b: &mut StageBuilder<'_>, name: &str, args: &[Expr]) -> Result<Expr> {
    arity(name, args, &[2])?;
    let vector = args.iter().any(|a| a.ty.is_vector());
    if b.dialect().is_glsl() && vector {
        return b.builtin_call(name, args);
    }
    let op = match name {
        "lessThan" => BinaryOp::Lt,
        "lessThanEqual" => BinaryOp::Le,
        "greaterThan" => BinaryOp::Gt,
        "greaterThanEqual" => BinaryOp::Ge,
        "equal" => BinaryOp::Eq,
        "notEqual" => BinaryOp::Ne,
        other => return Err(ShaderError::internal(format!("'{other}' is not a comparison"))),
    };
    b.binary_node(op, args[0].clone(), args[1].clone())
}

/// `select(f, t, cond)`. GLSL lowers float selection to `mix`.
pub(super) fn select(b: &mut StageBuilder<'_>, name: &str, args: &[Expr]) -> Result<Expr> {
    if b.dialect().is_wgsl() {
        return b.builtin_call(name, args);
    }
    arity(name, args, &[3])?;
    let ty = operand_type(b, &args[..2]);
    if !ty.scalar_kind().is_some_and(ScalarKind::is_float) {
        return Err(ShaderError::unsupported("select on non-float values", b.dialect()));
    }
    let f = coerce(name, 0, &args[0], &ty)?;
    let t = coerce(name, 1, &args[1], &ty)?;
    let cond = &args[2];
    let factor = match cond.ty.as_primitive() {
        Some(p) if p.scalar == ScalarKind::Bool => {
            b.cast(Type::vector(ScalarKind::F32, p.rows), cond.clone())?
        }
        _ => return Err(param_type(name, 2, format!("expected bool, found {}", cond.ty))),
    };
    b.call("mix", &[f, t, factor])
}

/// Left fold of a binary operator over two or more operands.
pub(super) fn fold_operator(b: &mut StageBuilder<'_>, name: &str, args: &[Expr]) -> Result<Expr> {
    let op = match name {
        "add" => BinaryOp::Add,
        "sub" => BinaryOp::Sub,
        "mul" => BinaryOp::Mul,
        "div" => BinaryOp::Div,
        "and" => BinaryOp::And,
        "or" => BinaryOp::Or,
        other => return Err(ShaderError::internal(format!("'{other}' is not an operator"))),
    };
    let [first, rest @ ..] = args else {
        return Err(ShaderError::ParamCount {
            function: name.to_string(),
            expected: 2,
            found: 0,
        });
    };
    if rest.is_empty() {
        return Err(ShaderError::ParamCount {
            function: name.to_string(),
            expected: 2,
            found: 1,
        });
    }
    rest.iter()
        .try_fold(first.clone(), |acc, next| b.binary(op, acc, next))
}

// ============================================================================
// Stage Restricted
// ============================================================================

/// Screen-space derivatives: fragment stage only, and an extension in
/// GLSL ES 1.00.
pub(super) fn derivative(b: &mut StageBuilder<'_>, name: &str, args: &[Expr]) -> Result<Expr> {
    if b.stage() != ShaderStage::Fragment {
        return Err(ShaderError::InvalidState(format!(
            "'{name}' is only available in the fragment stage"
        )));
    }
    if b.dialect() == Dialect::GlslEs100 {
        b.require_cap(DeviceCaps::STANDARD_DERIVATIVES, "derivatives")?;
        b.add_extension("GL_OES_standard_derivatives");
    }
    b.builtin_call(name, args)
}

pub(super) fn barrier(b: &mut StageBuilder<'_>, name: &str, args: &[Expr]) -> Result<Expr> {
    if b.stage() != ShaderStage::Compute {
        return Err(ShaderError::InvalidState(format!(
            "'{name}' is only available in the compute stage"
        )));
    }
    b.builtin_call(name, args)
}

/// `arrayLength(arr)` of a runtime-sized storage array.
pub(super) fn array_length(b: &mut StageBuilder<'_>, name: &str, args: &[Expr]) -> Result<Expr> {
    arity(name, args, &[1])?;
    if !b.dialect().is_wgsl() {
        return Err(ShaderError::unsupported("runtime-sized arrays", b.dialect()));
    }
    let arr = &args[0];
    if !arr.ty.is_runtime_array() {
        return Err(param_type(name, 0, format!("expected a runtime-sized array, found {}", arr.ty)));
    }
    let ptr = match &arr.kind {
        ExprKind::Deref(inner) => inner.clone(),
        _ => b.address_of(arr)?,
    };
    Ok(call_node("arrayLength", vec![ptr], Type::u32()))
}

// ============================================================================
// Textures
// ============================================================================

/// The texture argument and the variable it is bound to.
fn texture_arg(name: &str, arg: &Expr) -> Result<(TextureType, Variable)> {
    let texture = arg
        .ty
        .as_texture()
        .ok_or_else(|| param_type(name, 0, format!("expected a texture, found {}", arg.ty)))?;
    let var = arg
        .root_variable()
        .filter(|v| v.kind == DeclKind::Uniform)
        .ok_or_else(|| param_type(name, 0, "textures must be bound resources"))?;
    Ok((texture, var))
}

fn texel_type(texture: TextureType) -> Type {
    if texture.is_depth() {
        Type::f32()
    } else {
        Type::vector(texture.texel_kind().shader_kind(), 4)
    }
}

fn coord_type(kind: ScalarKind, dim: TextureDim) -> Type {
    Type::vector(kind, dim.coord_width())
}

/// Folds an array layer into the coordinate for GLSL's `sampler2DArray`.
fn fold_layer(b: &mut StageBuilder<'_>, coord: Expr, layer: Expr) -> Result<Expr> {
    let layer = b.cast(Type::f32(), layer)?;
    b.construct(Type::vec3f(), &[coord, layer])
}

fn sampleable(name: &str, texture: TextureType) -> Result<()> {
    match texture.class {
        TextureClass::Storage { .. } => Err(param_type(name, 0, "storage textures cannot be sampled")),
        TextureClass::Multisampled { .. } => {
            Err(param_type(name, 0, "multisampled textures cannot be sampled"))
        }
        _ => Ok(()),
    }
}

/// GLSL ES 1.00 sampling function for a texture dimension.
fn es1_sampler_fn(b: &StageBuilder<'_>, dim: TextureDim, lod: bool) -> Result<&'static str> {
    let fragment_lod = lod && b.stage() == ShaderStage::Fragment;
    Ok(match (dim, lod, fragment_lod) {
        (TextureDim::D2, false, _) => "texture2D",
        (TextureDim::Cube, false, _) => "textureCube",
        (TextureDim::D2, true, false) => "texture2DLod",
        (TextureDim::Cube, true, false) => "textureCubeLod",
        (TextureDim::D2, true, true) => "texture2DLodEXT",
        (TextureDim::Cube, true, true) => "textureCubeLodEXT",
        _ => return Err(ShaderError::unsupported(format!("{dim:?} textures"), b.dialect())),
    })
}

/// `textureSample(t, coord[, layer])`.
pub(super) fn texture_sample(b: &mut StageBuilder<'_>, name: &str, args: &[Expr]) -> Result<Expr> {
    let (texture, var) = texture_arg(name, args.first().ok_or_else(|| ShaderError::ParamCount {
        function: name.to_string(),
        expected: 2,
        found: 0,
    })?)?;
    sampleable(name, texture)?;
    arity(name, args, if texture.arrayed { &[3] } else { &[2] })?;
    if texture.is_depth() && b.dialect().is_glsl() {
        return Err(ShaderError::unsupported("depth sampling without comparison", b.dialect()));
    }
    let tex = args[0].clone();
    let coord = coerce(name, 1, &args[1], &coord_type(ScalarKind::F32, texture.dim))?;
    let layer = args
        .get(2)
        .map(|l| coerce(name, 2, l, &Type::i32()))
        .transpose()?;
    let ret = texel_type(texture);

    match b.dialect() {
        Dialect::Wgsl => {
            let sampler = Expr::var(&b.implicit_sampler(&var, SamplerKind::Sample)?);
            let mut call_args = vec![tex, sampler, coord];
            call_args.extend(layer);
            if texture.is_external() {
                return Ok(call_node("textureSampleBaseClampToEdge", call_args, ret));
            }
            if b.stage() != ShaderStage::Fragment {
                if !texture.is_depth() {
                    call_args.push(Expr::f32(0.0));
                } else {
                    call_args.push(Expr::i32(0));
                }
                return Ok(call_node("textureSampleLevel", call_args, ret));
            }
            Ok(call_node("textureSample", call_args, ret))
        }
        Dialect::GlslEs300 => {
            let coord = match layer {
                Some(layer) => fold_layer(b, coord, layer)?,
                None => coord,
            };
            Ok(call_node("texture", vec![tex, coord], ret))
        }
        Dialect::GlslEs100 => {
            let vertex = b.stage() == ShaderStage::Vertex;
            let function = es1_sampler_fn(b, texture.dim, vertex)?;
            let mut call_args = vec![tex, coord];
            if vertex {
                call_args.push(Expr::f32(0.0));
            }
            Ok(call_node(function, call_args, ret))
        }
    }
}

/// `textureSampleLevel(t, coord[, layer], level)`.
pub(super) fn texture_sample_level(
    b: &mut StageBuilder<'_>,
    name: &str,
    args: &[Expr],
) -> Result<Expr> {
    let (texture, var) = texture_arg(name, args.first().ok_or_else(|| ShaderError::ParamCount {
        function: name.to_string(),
        expected: 3,
        found: 0,
    })?)?;
    sampleable(name, texture)?;
    if texture.is_external() {
        return Err(param_type(name, 0, "external textures have a single level"));
    }
    arity(name, args, if texture.arrayed { &[4] } else { &[3] })?;
    if texture.is_depth() && b.dialect().is_glsl() {
        return Err(ShaderError::unsupported("depth sampling without comparison", b.dialect()));
    }
    let tex = args[0].clone();
    let coord = coerce(name, 1, &args[1], &coord_type(ScalarKind::F32, texture.dim))?;
    let (layer, level) = if texture.arrayed {
        (Some(coerce(name, 2, &args[2], &Type::i32())?), &args[3])
    } else {
        (None, &args[2])
    };
    let level_ty = if texture.is_depth() { Type::i32() } else { Type::f32() };
    let level = coerce(name, args.len() - 1, level, &level_ty)?;
    let ret = texel_type(texture);

    match b.dialect() {
        Dialect::Wgsl => {
            let sampler = Expr::var(&b.implicit_sampler(&var, SamplerKind::Sample)?);
            let mut call_args = vec![tex, sampler, coord];
            call_args.extend(layer);
            call_args.push(level);
            Ok(call_node("textureSampleLevel", call_args, ret))
        }
        Dialect::GlslEs300 => {
            let coord = match layer {
                Some(layer) => fold_layer(b, coord, layer)?,
                None => coord,
            };
            Ok(call_node("textureLod", vec![tex, coord, level], ret))
        }
        Dialect::GlslEs100 => {
            if b.stage() == ShaderStage::Fragment {
                b.require_cap(DeviceCaps::SHADER_TEXTURE_LOD, "explicit texture LOD")?;
                b.add_extension("GL_EXT_shader_texture_lod");
            }
            let function = es1_sampler_fn(b, texture.dim, true)?;
            Ok(call_node(function, vec![tex, coord, level], ret))
        }
    }
}

/// The texture of a call whose other arguments are still unchecked.
fn leading_texture(name: &str, args: &[Expr], expected: usize) -> Result<(TextureType, Variable)> {
    let first = args.first().ok_or_else(|| ShaderError::ParamCount {
        function: name.to_string(),
        expected,
        found: 0,
    })?;
    texture_arg(name, first)
}

/// Coordinate and optional array layer of a sampling call, starting at
/// argument 1.
fn coord_and_layer(
    name: &str,
    args: &[Expr],
    texture: TextureType,
) -> Result<(Expr, Option<Expr>)> {
    let coord = coerce(name, 1, &args[1], &coord_type(ScalarKind::F32, texture.dim))?;
    let layer = if texture.arrayed {
        Some(coerce(name, 2, &args[2], &Type::i32())?)
    } else {
        None
    };
    Ok((coord, layer))
}

/// `textureSampleBias(t, coord[, layer], bias)`, fragment stage only.
pub(super) fn texture_sample_bias(
    b: &mut StageBuilder<'_>,
    name: &str,
    args: &[Expr],
) -> Result<Expr> {
    let (texture, var) = leading_texture(name, args, 3)?;
    sampleable(name, texture)?;
    if texture.is_depth() || texture.is_external() {
        let found = Type::texture(texture);
        return Err(param_type(name, 0, format!("{found} cannot be sampled with a bias")));
    }
    if b.stage() != ShaderStage::Fragment {
        return Err(ShaderError::InvalidState(format!(
            "'{name}' is only available in the fragment stage"
        )));
    }
    arity(name, args, if texture.arrayed { &[4] } else { &[3] })?;
    let tex = args[0].clone();
    let (coord, layer) = coord_and_layer(name, args, texture)?;
    let bias = coerce(name, args.len() - 1, &args[args.len() - 1], &Type::f32())?;
    let ret = texel_type(texture);

    match b.dialect() {
        Dialect::Wgsl => {
            let sampler = Expr::var(&b.implicit_sampler(&var, SamplerKind::Sample)?);
            let mut call_args = vec![tex, sampler, coord];
            call_args.extend(layer);
            call_args.push(bias);
            Ok(call_node("textureSampleBias", call_args, ret))
        }
        Dialect::GlslEs300 => {
            let coord = match layer {
                Some(layer) => fold_layer(b, coord, layer)?,
                None => coord,
            };
            Ok(call_node("texture", vec![tex, coord, bias], ret))
        }
        Dialect::GlslEs100 => {
            let function = es1_sampler_fn(b, texture.dim, false)?;
            Ok(call_node(function, vec![tex, coord, bias], ret))
        }
    }
}

/// `textureSampleGrad(t, coord[, layer], ddx, ddy)`.
pub(super) fn texture_sample_grad(
    b: &mut StageBuilder<'_>,
    name: &str,
    args: &[Expr],
) -> Result<Expr> {
    let (texture, var) = leading_texture(name, args, 4)?;
    sampleable(name, texture)?;
    if texture.is_depth() || texture.is_external() {
        let found = Type::texture(texture);
        return Err(param_type(name, 0, format!("{found} cannot be sampled with gradients")));
    }
    arity(name, args, if texture.arrayed { &[5] } else { &[4] })?;
    let tex = args[0].clone();
    let (coord, layer) = coord_and_layer(name, args, texture)?;
    let grad_ty = coord_type(ScalarKind::F32, texture.dim);
    let first = args.len() - 2;
    let ddx = coerce(name, first, &args[first], &grad_ty)?;
    let ddy = coerce(name, first + 1, &args[first + 1], &grad_ty)?;
    let ret = texel_type(texture);

    match b.dialect() {
        Dialect::Wgsl => {
            let sampler = Expr::var(&b.implicit_sampler(&var, SamplerKind::Sample)?);
            let mut call_args = vec![tex, sampler, coord];
            call_args.extend(layer);
            call_args.extend([ddx, ddy]);
            Ok(call_node("textureSampleGrad", call_args, ret))
        }
        Dialect::GlslEs300 => {
            let coord = match layer {
                Some(layer) => fold_layer(b, coord, layer)?,
                None => coord,
            };
            Ok(call_node("textureGrad", vec![tex, coord, ddx, ddy], ret))
        }
        Dialect::GlslEs100 => {
            if b.stage() != ShaderStage::Fragment {
                return Err(ShaderError::unsupported(
                    "gradient sampling outside the fragment stage",
                    b.dialect(),
                ));
            }
            b.require_cap(DeviceCaps::SHADER_TEXTURE_LOD, "gradient sampling")?;
            b.add_extension("GL_EXT_shader_texture_lod");
            let function = match texture.dim {
                TextureDim::D2 => "texture2DGradEXT",
                TextureDim::Cube => "textureCubeGradEXT",
                dim => {
                    return Err(ShaderError::unsupported(format!("{dim:?} textures"), b.dialect()));
                }
            };
            Ok(call_node(function, vec![tex, coord, ddx, ddy], ret))
        }
    }
}

/// `textureSampleCompare(t, coord[, layer], depth_ref)` and its
/// `textureSampleCompareLevel` form, on depth textures.
///
/// WGSL pairs the texture with an implicit comparison sampler. GLSL ES 3.00
/// appends the reference to the coordinate of a shadow sampler. Implicit
/// derivatives only exist in the fragment stage, so other stages always
/// compare at level 0.
pub(super) fn texture_sample_compare(
    b: &mut StageBuilder<'_>,
    name: &str,
    args: &[Expr],
) -> Result<Expr> {
    let (texture, var) = leading_texture(name, args, 3)?;
    if !texture.is_depth() {
        return Err(param_type(
            name,
            0,
            format!("expected a depth texture, found {}", Type::texture(texture)),
        ));
    }
    if b.dialect() == Dialect::GlslEs100 {
        return Err(ShaderError::unsupported("depth comparison sampling", b.dialect()));
    }
    arity(name, args, if texture.arrayed { &[4] } else { &[3] })?;
    let tex = args[0].clone();
    let (coord, layer) = coord_and_layer(name, args, texture)?;
    let depth_ref = coerce(name, args.len() - 1, &args[args.len() - 1], &Type::f32())?;
    let level_zero = name == "textureSampleCompareLevel" || b.stage() != ShaderStage::Fragment;

    if b.dialect().is_wgsl() {
        let sampler = Expr::var(&b.implicit_sampler(&var, SamplerKind::Comparison)?);
        let mut call_args = vec![tex, sampler, coord];
        call_args.extend(layer);
        call_args.push(depth_ref);
        let function = if level_zero {
            "textureSampleCompareLevel"
        } else {
            "textureSampleCompare"
        };
        return Ok(call_node(function, call_args, Type::f32()));
    }

    let mut parts = vec![coord];
    if let Some(layer) = layer {
        parts.push(b.cast(Type::f32(), layer)?);
    }
    parts.push(depth_ref);
    let width = parts.iter().map(|p| p.ty.element_count().unwrap_or(1)).sum::<u32>();
    if width > 4 {
        return Err(ShaderError::unsupported(
            format!("comparison sampling of {}", Type::texture(texture)),
            b.dialect(),
        ));
    }
    let shadow_coord = b.construct(Type::vector(ScalarKind::F32, width as u8), &parts)?;
    if level_zero && b.stage() == ShaderStage::Fragment {
        if texture.dim != TextureDim::D2 || texture.arrayed {
            return Err(ShaderError::unsupported(
                "explicit-level comparison on cube or array shadow samplers",
                b.dialect(),
            ));
        }
        let lod = Expr::f32(0.0);
        return Ok(call_node("textureLod", vec![tex, shadow_coord, lod], Type::f32()));
    }
    Ok(call_node("texture", vec![tex, shadow_coord], Type::f32()))
}

/// `textureLoad(t, coords[, layer][, level | sample])`.
pub(super) fn texture_load(b: &mut StageBuilder<'_>, name: &str, args: &[Expr]) -> Result<Expr> {
    let (texture, _) = texture_arg(name, args.first().ok_or_else(|| ShaderError::ParamCount {
        function: name.to_string(),
        expected: 3,
        found: 0,
    })?)?;
    if b.dialect() == Dialect::GlslEs100 {
        return Err(ShaderError::unsupported("texel fetches", b.dialect()));
    }
    if texture.dim == TextureDim::Cube {
        return Err(param_type(name, 0, "cube textures cannot be loaded by texel"));
    }
    // Trailing level or sample index, absent for storage and external textures.
    let trailing = !matches!(
        texture.class,
        TextureClass::Storage { .. } | TextureClass::External
    );
    let expected = 2 + usize::from(texture.arrayed) + usize::from(trailing);
    arity(name, args, &[expected])?;

    let mut call_args = vec![
        args[0].clone(),
        coerce(name, 1, &args[1], &coord_type(ScalarKind::I32, texture.dim))?,
    ];
    for (index, arg) in args.iter().enumerate().skip(2) {
        call_args.push(coerce(name, index, arg, &Type::i32())?);
    }
    let ret = texel_type(texture);

    if b.dialect().is_wgsl() {
        return Ok(call_node("textureLoad", call_args, ret));
    }
    if !trailing {
        return Err(ShaderError::unsupported("texel fetches from this texture", b.dialect()));
    }
    let coord = if texture.arrayed {
        let ivec3 = Type::vector(ScalarKind::I32, 3);
        b.construct(ivec3, &[call_args[1].clone(), call_args[2].clone()])?
    } else {
        call_args[1].clone()
    };
    let level = call_args[call_args.len() - 1].clone();
    Ok(call_node("texelFetch", vec![args[0].clone(), coord, level], ret))
}

/// `textureDimensions(t[, level])`.
pub(super) fn texture_dimensions(
    b: &mut StageBuilder<'_>,
    name: &str,
    args: &[Expr],
) -> Result<Expr> {
    arity(name, args, &[1, 2])?;
    let (texture, _) = texture_arg(name, &args[0])?;
    let level = args
        .get(1)
        .map(|l| coerce(name, 1, l, &Type::i32()))
        .transpose()?;
    let width = match texture.dim {
        TextureDim::D1 => 1,
        TextureDim::D2 | TextureDim::Cube => 2,
        TextureDim::D3 => 3,
    };

    match b.dialect() {
        Dialect::Wgsl => {
            let mut call_args = vec![args[0].clone()];
            call_args.extend(level);
            let ret = Type::vector(ScalarKind::U32, width);
            Ok(call_node("textureDimensions", call_args, ret))
        }
        Dialect::GlslEs300 => {
            let width = if texture.arrayed { width + 1 } else { width };
            let level = level.unwrap_or_else(|| Expr::i32(0));
            let ret = Type::vector(ScalarKind::I32, width);
            Ok(call_node("textureSize", vec![args[0].clone(), level], ret))
        }
        Dialect::GlslEs100 => Err(ShaderError::unsupported("texture size queries", b.dialect())),
    }
}

/// `textureStore(t, coords, value)` on a writable storage texture.
pub(super) fn texture_store(b: &mut StageBuilder<'_>, name: &str, args: &[Expr]) -> Result<Expr> {
    if !b.dialect().is_wgsl() {
        return Err(ShaderError::unsupported("storage textures", b.dialect()));
    }
    arity(name, args, &[3])?;
    let (texture, _) = texture_arg(name, &args[0])?;
    match texture.class {
        TextureClass::Storage { access, .. } if access != StorageAccess::Read => {}
        _ => return Err(param_type(name, 0, "expected a writable storage texture")),
    }
    let coord = coerce(name, 1, &args[1], &coord_type(ScalarKind::I32, texture.dim))?;
    let value = coerce(name, 2, &args[2], &texel_type(texture))?;
    Ok(call_node(
        "textureStore",
        vec![args[0].clone(), coord, value],
        Type::void(),
    ))
}
