//! The standard builtin table.

use super::BuiltinRegistry;
use super::normalize;
use crate::dialect::DialectMask;
use crate::types::{ScalarKind, Type};

const ALL: DialectMask = DialectMask::ALL;
const GLSL: DialectMask = DialectMask::GLSL;
const MODERN: DialectMask = DialectMask::MODERN;
const ES3: DialectMask = DialectMask::GLSL_ES_300;
const WGSL: DialectMask = DialectMask::WGSL;

/// Scalar plus the 2-, 3- and 4-wide vectors of `kind`.
fn family(kind: ScalarKind) -> [Type; 4] {
    [
        Type::scalar(kind),
        Type::vector(kind, 2),
        Type::vector(kind, 3),
        Type::vector(kind, 4),
    ]
}

fn vectors(kind: ScalarKind) -> [Type; 3] {
    [
        Type::vector(kind, 2),
        Type::vector(kind, 3),
        Type::vector(kind, 4),
    ]
}

const UNARY_FLOAT: [&str; 18] = [
    "sin", "cos", "tan", "asin", "acos", "atan", "exp", "exp2", "log", "log2", "sqrt", "floor",
    "ceil", "fract", "abs", "sign", "radians", "degrees",
];

pub(super) fn populate(r: &mut BuiltinRegistry) {
    float_math(r);
    integer_math(r);
    geometry(r);
    derivatives(r);
    logic(r);
    textures(r);
    storage(r);
    operators(r);
}

fn float_math(r: &mut BuiltinRegistry) {
    let gen_f = family(ScalarKind::F32);

    for name in UNARY_FLOAT {
        for t in &gen_f {
            r.add_overload(name, ALL, name, &[t.clone()], t.clone());
        }
    }
    for t in &gen_f {
        r.add_overload("inversesqrt", GLSL, "inversesqrt", &[t.clone()], t.clone());
        r.add_overload("inversesqrt", WGSL, "inverseSqrt", &[t.clone()], t.clone());
        r.add_overload("round", MODERN, "round", &[t.clone()], t.clone());
        r.add_overload("trunc", MODERN, "trunc", &[t.clone()], t.clone());

        let pair = [t.clone(), t.clone()];
        let triple = [t.clone(), t.clone(), t.clone()];
        r.add_overload("pow", ALL, "pow", &pair, t.clone());
        r.add_overload("atan2", GLSL, "atan", &pair, t.clone());
        r.add_overload("atan2", WGSL, "atan2", &pair, t.clone());
        r.add_overload("step", ALL, "step", &pair, t.clone());
        r.add_overload("min", ALL, "min", &pair, t.clone());
        r.add_overload("max", ALL, "max", &pair, t.clone());
        r.add_overload("clamp", ALL, "clamp", &triple, t.clone());
        r.add_overload("mix", ALL, "mix", &triple, t.clone());
        r.add_overload("smoothstep", ALL, "smoothstep", &triple, t.clone());
    }

    // Scalar-operand forms; listed after the exact forms so those win ties.
    let f = Type::f32();
    for v in vectors(ScalarKind::F32) {
        r.add_overload("mix", ALL, "mix", &[v.clone(), v.clone(), f.clone()], v.clone());
        r.add_overload("step", GLSL, "step", &[f.clone(), v.clone()], v.clone());
        r.add_overload("min", GLSL, "min", &[v.clone(), f.clone()], v.clone());
        r.add_overload("max", GLSL, "max", &[v.clone(), f.clone()], v.clone());
        r.add_overload("clamp", GLSL, "clamp", &[v.clone(), f.clone(), f.clone()], v.clone());
        r.add_overload(
            "smoothstep",
            GLSL,
            "smoothstep",
            &[f.clone(), f.clone(), v.clone()],
            v.clone(),
        );
        r.add_overload("mod", GLSL, "mod", &[v.clone(), f.clone()], v.clone());
    }
    for t in &gen_f {
        r.add_overload("mod", GLSL, "mod", &[t.clone(), t.clone()], t.clone());
    }
    r.set_normalize("mod", normalize::modulo);
}

fn integer_math(r: &mut BuiltinRegistry) {
    for kind in [ScalarKind::I32, ScalarKind::U32] {
        for t in family(kind) {
            if kind == ScalarKind::I32 {
                r.add_overload("abs", MODERN, "abs", &[t.clone()], t.clone());
                r.add_overload("sign", MODERN, "sign", &[t.clone()], t.clone());
            }
            let pair = [t.clone(), t.clone()];
            r.add_overload("min", MODERN, "min", &pair, t.clone());
            r.add_overload("max", MODERN, "max", &pair, t.clone());
            r.add_overload("clamp", MODERN, "clamp", &[t.clone(), t.clone(), t.clone()], t.clone());
        }
    }
}

fn geometry(r: &mut BuiltinRegistry) {
    let f = Type::f32();
    for t in family(ScalarKind::F32) {
        r.add_overload("length", ALL, "length", &[t.clone()], f.clone());
        r.add_overload("distance", ALL, "distance", &[t.clone(), t.clone()], f.clone());
    }
    for v in vectors(ScalarKind::F32) {
        r.add_overload("normalize", ALL, "normalize", &[v.clone()], v.clone());
        r.add_overload("dot", ALL, "dot", &[v.clone(), v.clone()], f.clone());
        r.add_overload("reflect", ALL, "reflect", &[v.clone(), v.clone()], v.clone());
        r.add_overload(
            "refract",
            ALL,
            "refract",
            &[v.clone(), v.clone(), f.clone()],
            v.clone(),
        );
        let triple = [v.clone(), v.clone(), v.clone()];
        r.add_overload("faceforward", GLSL, "faceforward", &triple, v.clone());
        r.add_overload("faceforward", WGSL, "faceForward", &triple, v.clone());
    }
    let v3 = Type::vec3f();
    r.add_overload("cross", ALL, "cross", &[v3.clone(), v3.clone()], v3);

    for n in 2..=4 {
        let m = Type::matrix(ScalarKind::F32, n, n);
        r.add_overload("transpose", MODERN, "transpose", &[m.clone()], m.clone());
        r.add_overload("determinant", MODERN, "determinant", &[m.clone()], f.clone());
        r.add_overload("inverse", ES3, "inverse", &[m.clone()], m);
    }
}

fn derivatives(r: &mut BuiltinRegistry) {
    for t in family(ScalarKind::F32) {
        r.add_overload("dpdx", GLSL, "dFdx", &[t.clone()], t.clone());
        r.add_overload("dpdx", WGSL, "dpdx", &[t.clone()], t.clone());
        r.add_overload("dpdy", GLSL, "dFdy", &[t.clone()], t.clone());
        r.add_overload("dpdy", WGSL, "dpdy", &[t.clone()], t.clone());
        r.add_overload("fwidth", ALL, "fwidth", &[t.clone()], t.clone());
    }
    for name in ["dpdx", "dpdy", "fwidth"] {
        r.set_normalize(name, normalize::derivative);
    }
}

fn logic(r: &mut BuiltinRegistry) {
    let b = Type::bool();
    for v in vectors(ScalarKind::Bool) {
        r.add_overload("all", ALL, "all", &[v.clone()], b.clone());
        r.add_overload("any", ALL, "any", &[v.clone()], b.clone());
    }

    for kind in [ScalarKind::F32, ScalarKind::I32, ScalarKind::U32] {
        let mask = if kind == ScalarKind::U32 { MODERN } else { ALL };
        for (t, cond) in family(kind).into_iter().zip(family(ScalarKind::Bool)) {
            r.add_overload("select", WGSL, "select", &[t.clone(), t.clone(), b.clone()], t.clone());
            if t.is_vector() {
                r.add_overload("select", WGSL, "select", &[t.clone(), t.clone(), cond.clone()], t.clone());
            }
            if !t.is_vector() {
                continue;
            }
            let pair = [t.clone(), t.clone()];
            for name in ["lessThan", "lessThanEqual", "greaterThan", "greaterThanEqual"] {
                r.add_overload(name, mask & GLSL, name, &pair, cond.clone());
            }
            for name in ["equal", "notEqual"] {
                r.add_overload(name, mask & GLSL, name, &pair, cond.clone());
            }
        }
    }
    for v in vectors(ScalarKind::Bool) {
        let pair = [v.clone(), v.clone()];
        r.add_overload("equal", GLSL, "equal", &pair, v.clone());
        r.add_overload("notEqual", GLSL, "notEqual", &pair, v.clone());
    }

    r.set_normalize("select", normalize::select);
    for name in [
        "lessThan",
        "lessThanEqual",
        "greaterThan",
        "greaterThanEqual",
        "equal",
        "notEqual",
    ] {
        r.set_normalize(name, normalize::compare);
    }
}

fn textures(r: &mut BuiltinRegistry) {
    r.set_normalize("textureSample", normalize::texture_sample);
    r.set_normalize("textureSampleLevel", normalize::texture_sample_level);
    r.set_normalize("textureSampleBias", normalize::texture_sample_bias);
    r.set_normalize("textureSampleGrad", normalize::texture_sample_grad);
    r.set_normalize("textureSampleCompare", normalize::texture_sample_compare);
    r.set_normalize("textureSampleCompareLevel", normalize::texture_sample_compare);
    r.set_normalize("textureLoad", normalize::texture_load);
    r.set_normalize("textureDimensions", normalize::texture_dimensions);
    r.set_normalize("textureStore", normalize::texture_store);
}

fn storage(r: &mut BuiltinRegistry) {
    r.set_normalize("arrayLength", normalize::array_length);

    for kind in [ScalarKind::I32, ScalarKind::U32] {
        let atomic = Type::atomic(kind);
        let value = Type::scalar(kind);
        r.add_ref_overload("atomicLoad", WGSL, &[atomic.clone()], value.clone());
        r.add_ref_overload(
            "atomicStore",
            WGSL,
            &[atomic.clone(), value.clone()],
            Type::void(),
        );
        for name in [
            "atomicAdd",
            "atomicSub",
            "atomicMax",
            "atomicMin",
            "atomicAnd",
            "atomicOr",
            "atomicXor",
            "atomicExchange",
        ] {
            r.add_ref_overload(name, WGSL, &[atomic.clone(), value.clone()], value.clone());
        }
    }

    for name in ["workgroupBarrier", "storageBarrier"] {
        r.add_overload(name, WGSL, name, &[], Type::void());
        r.set_normalize(name, normalize::barrier);
    }
}

fn operators(r: &mut BuiltinRegistry) {
    for name in ["add", "sub", "mul", "div", "and", "or"] {
        r.set_normalize(name, normalize::fold_operator);
    }
}
