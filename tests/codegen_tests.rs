//! Source generation tests
//!
//! Tests for:
//! - Stage interfaces per dialect (attributes, varyings, color targets)
//! - GLSL ES 1.00 fragment color through gl_FragColor
//! - Counted, while and do-while loops in every dialect
//! - User functions with value and by-reference parameters
//! - WGSL entry point synthesis, depth remapping and depth clamp emulation
//! - Compute stages and their rejection outside WGSL
//! - f16 enabling from component types
//! - Comparison, bias and gradient sampling per dialect

use myth_shader::prelude::*;

// ============================================================================
// Helpers
// ============================================================================

const DIALECTS: [Dialect; 3] = [Dialect::GlslEs100, Dialect::GlslEs300, Dialect::Wgsl];

/// Position + uv in, uv varying, constant-alpha color out.
fn textured_quad(options: &ProgramOptions) -> CompiledProgram {
    let mut builder = ProgramBuilder::new();
    builder
        .build_render(
            options,
            |vs| {
                let position = vs.input("position", Type::vec3f())?;
                let uv = vs.input("uv", Type::vec2f())?;
                let v_uv = vs.output("v_uv", Type::vec2f())?;
                vs.main(|b| {
                    let clip = b.construct(Type::vec4f(), &[position.clone(), Expr::literal(1.0)])?;
                    let out = b.builtin(BuiltinVar::Position)?;
                    b.assign(&out, &clip)?;
                    b.assign(&v_uv, &uv)
                })
            },
            |fs| {
                let v_uv = fs.input("v_uv", Type::vec2f())?;
                let color = fs.output("color", Type::vec4f())?;
                fs.main(|b| {
                    let rgba = b.construct(
                        Type::vec4f(),
                        &[v_uv.clone(), Expr::literal(0.0), Expr::literal(1.0)],
                    )?;
                    b.assign(&color, &rgba)
                })
            },
        )
        .unwrap()
}

/// Fragment stage built by `body`; the vertex stage only writes a position.
fn fragment_source(
    options: &ProgramOptions,
    body: impl FnOnce(&mut StageBuilder<'_>, &Expr) -> myth_shader::Result<()>,
) -> String {
    let mut builder = ProgramBuilder::new();
    let program = builder
        .build_render(
            options,
            |vs| {
                vs.main(|b| {
                    let out = b.builtin(BuiltinVar::Position)?;
                    let origin = b.construct(Type::vec4f(), &[Expr::literal(0.0)])?;
                    b.assign(&out, &origin)
                })
            },
            |fs| {
                let color = fs.output("color", Type::vec4f())?;
                fs.main(|b| body(b, &color))
            },
        )
        .unwrap();
    program.source(ShaderStage::Fragment).unwrap().to_string()
}

/// Sums `0..4` into a local and writes it to every channel.
fn counted_loop(b: &mut StageBuilder<'_>, color: &Expr) -> myth_shader::Result<()> {
    let acc = b.var("acc", 0.0)?;
    b.for_range("i", 0, 4, |b, i| {
        let fi = b.cast(Type::f32(), &i)?;
        let sum = b.binary(BinaryOp::Add, &acc, &fi)?;
        b.assign(&acc, &sum)
    })?;
    let rgba = b.construct(Type::vec4f(), &[acc.clone()])?;
    b.assign(color, &rgba)
}

// ============================================================================
// Stage Interfaces
// ============================================================================

#[test]
fn es3_interfaces_use_locations_and_in_out() {
    let program = textured_quad(&ProgramOptions::new(Dialect::GlslEs300));
    let vs = program.source(ShaderStage::Vertex).unwrap();
    let fs = program.source(ShaderStage::Fragment).unwrap();

    assert!(vs.contains("#version 300 es"));
    assert!(vs.contains("layout(location = 0) in vec3 position;"));
    assert!(vs.contains("layout(location = 1) in vec2 uv;"));
    assert!(vs.contains("out vec2 v_uv;"));
    assert!(vs.contains("gl_Position = vec4(position, 1.0);"));

    assert!(fs.contains("in vec2 v_uv;"));
    assert!(fs.contains("layout(location = 0) out vec4 color;"));
    assert!(fs.contains("color = vec4(v_uv, 0.0, 1.0);"));
}

#[test]
fn es1_interfaces_use_attributes_and_varyings() {
    let program = textured_quad(&ProgramOptions::new(Dialect::GlslEs100));
    let vs = program.source(ShaderStage::Vertex).unwrap();
    let fs = program.source(ShaderStage::Fragment).unwrap();

    assert!(vs.contains("#version 100"));
    assert!(vs.contains("attribute vec3 position;"));
    assert!(vs.contains("varying vec2 v_uv;"));
    assert!(fs.contains("varying vec2 v_uv;"));
    assert!(fs.contains("precision mediump float;"));
    assert!(fs.contains("gl_FragColor = vec4(v_uv, 0.0, 1.0);"));
    assert!(!fs.contains("vec4 color;"));
}

#[test]
fn wgsl_entry_points_wrap_the_stage_body() {
    let program = textured_quad(&ProgramOptions::new(Dialect::Wgsl));
    let vs = program.source(ShaderStage::Vertex).unwrap();
    let fs = program.source(ShaderStage::Fragment).unwrap();

    assert!(vs.contains("@vertex"));
    assert!(vs.contains("struct VertexInput {"));
    assert!(vs.contains("@location(0) position: vec3<f32>,"));
    assert!(vs.contains("@builtin(position) builtin_position: vec4<f32>,"));
    assert!(vs.contains("fn main(input: VertexInput) -> VertexOutput {"));
    assert!(vs.contains("builtin_out.position = vec4<f32>(position, 1.0);"));
    assert!(vs.contains("main_body();"));
    assert!(vs.contains("output.v_uv = v_uv;"));

    assert!(fs.contains("@fragment"));
    assert!(fs.contains("@location(0) v_uv: vec2<f32>,"));
    assert!(fs.contains("v_uv = input.v_uv;"));
    assert!(fs.contains("color = vec4<f32>(v_uv, 0.0, 1.0);"));
}

#[test]
fn attribute_slots_come_from_the_backend() {
    let options = ProgramOptions::new(Dialect::GlslEs300)
        .with_attribute_slot("position", 3)
        .with_attribute_slot("uv", 5);
    let program = textured_quad(&options);
    let vs = program.source(ShaderStage::Vertex).unwrap();
    assert!(vs.contains("layout(location = 3) in vec3 position;"));
    assert!(vs.contains("layout(location = 5) in vec2 uv;"));

    let slots: Vec<_> = program
        .vertex_attributes
        .iter()
        .map(|a| (a.name.as_str(), a.location, a.format.as_str()))
        .collect();
    assert_eq!(slots, vec![("position", 3, "float32x3"), ("uv", 5, "float32x2")]);
}

#[test]
fn wgsl_vertex_depth_is_remapped() {
    let program = textured_quad(&ProgramOptions::new(Dialect::Wgsl));
    let vs = program.source(ShaderStage::Vertex).unwrap();
    assert!(vs.contains(
        "output.builtin_position.z = (output.builtin_position.z + output.builtin_position.w) * 0.5;"
    ));
    assert!(!vs.contains("depth_clamp_z"));
}

// ============================================================================
// Loops (counted, while, do-while)
// ============================================================================

#[test]
fn counted_loop_in_glsl_is_a_for_statement() {
    for dialect in [Dialect::GlslEs100, Dialect::GlslEs300] {
        let fs = fragment_source(&ProgramOptions::new(dialect), counted_loop);
        assert!(fs.contains("for (int i = 0; i < 4; i++) {"), "{dialect}: {fs}");
        assert!(fs.contains("acc = (acc + float(i));"), "{dialect}: {fs}");
    }
}

#[test]
fn counted_loop_in_wgsl_is_a_loop_with_continuing() {
    let fs = fragment_source(&ProgramOptions::new(Dialect::Wgsl), counted_loop);
    assert!(fs.contains("var i: i32 = 0i;"));
    assert!(fs.contains("loop {"));
    assert!(fs.contains("if !(i < 4i) { break; }"));
    assert!(fs.contains("continuing {"));
    assert!(fs.contains("i = i + 1i;"));
    assert!(fs.contains("acc = (acc + f32(i));"));
    assert!(!fs.contains("for ("));
}

#[test]
fn while_and_do_while_loops() {
    let body = |b: &mut StageBuilder<'_>, color: &Expr| {
        let n = b.var("n", 0)?;
        let below = b.binary(BinaryOp::Lt, &n, 3)?;
        b.while_(&below, |b| {
            let next = b.binary(BinaryOp::Add, &n, 1)?;
            b.assign(&n, &next)
        })?;
        b.do_while(
            |b| {
                let next = b.binary(BinaryOp::Sub, &n, 1)?;
                b.assign(&n, &next)
            },
            |b| b.binary(BinaryOp::Gt, &n, 0),
        )?;
        let level = b.cast(Type::f32(), &n)?;
        let rgba = b.construct(Type::vec4f(), &[level])?;
        b.assign(color, &rgba)
    };

    let es3 = fragment_source(&ProgramOptions::new(Dialect::GlslEs300), body);
    assert!(es3.contains("while (n < 3) {"));
    assert!(es3.contains("do {"));
    assert!(es3.contains("} while (n > 0);"));

    let wgsl = fragment_source(&ProgramOptions::new(Dialect::Wgsl), body);
    assert!(wgsl.contains("if !(n < 3i) { break; }"));
    assert!(wgsl.contains("break if !(n > 0i);"));
    assert!(!wgsl.contains("while"));
}

#[test]
fn break_outside_a_loop_is_rejected() {
    let mut builder = ProgramBuilder::new();
    let result = builder.build_render(
        &ProgramOptions::new(Dialect::Wgsl),
        |vs| vs.main(|b| b.break_()),
        |fs| fs.main(|_| Ok(())),
    );
    assert!(result.is_err());
    assert_eq!(builder.last_error().unwrap().kind, ErrorKind::Scope);
}

// ============================================================================
// Functions
// ============================================================================

fn with_functions(dialect: Dialect) -> String {
    let mut builder = ProgramBuilder::new();
    let program = builder
        .build_render(
            &ProgramOptions::new(dialect),
            |vs| {
                vs.main(|b| {
                    let out = b.builtin(BuiltinVar::Position)?;
                    let origin = b.construct(Type::vec4f(), &[Expr::literal(0.0)])?;
                    b.assign(&out, &origin)
                })
            },
            |fs| {
                let color = fs.output("color", Type::vec4f())?;
                fs.define_function(
                    "square",
                    Some(Type::vec3f()),
                    &[FnParam::value("c", Type::vec3f())],
                    |b, args| {
                        let sq = b.binary(BinaryOp::Mul, &args[0], &args[0])?;
                        b.return_(Some(sq))
                    },
                )?;
                fs.define_function(
                    "bump",
                    None,
                    &[FnParam::reference("x", Type::f32())],
                    |b, args| {
                        let next = b.binary(BinaryOp::Add, &args[0], 1.0)?;
                        b.assign(&args[0], &next)
                    },
                )?;
                fs.main(|b| {
                    let alpha = b.var("alpha", 0.0)?;
                    b.call_function("bump", &[alpha.clone()])?;
                    let grey = b.construct(Type::vec3f(), &[Expr::literal(0.5)])?;
                    let rgb = b.call_function("square", &[grey])?;
                    let rgba = b.construct(Type::vec4f(), &[rgb, alpha])?;
                    b.assign(&color, &rgba)
                })
            },
        )
        .unwrap();
    program.source(ShaderStage::Fragment).unwrap().to_string()
}

#[test]
fn glsl_functions_pass_references_as_inout() {
    let fs = with_functions(Dialect::GlslEs300);
    assert!(fs.contains("vec3 square(vec3 c) {"));
    assert!(fs.contains("return (c * c);"));
    assert!(fs.contains("void bump(inout float x) {"));
    assert!(fs.contains("x = (x + 1.0);"));
    assert!(fs.contains("bump(alpha);"));
}

#[test]
fn wgsl_functions_pass_references_as_pointers() {
    let fs = with_functions(Dialect::Wgsl);
    assert!(fs.contains("fn square(c: vec3<f32>) -> vec3<f32> {"));
    assert!(fs.contains("fn bump(x: ptr<function, f32>) {"));
    assert!(fs.contains("(*x) = ((*x) + 1.0);"));
    assert!(fs.contains("bump(&alpha);"));
}

// ============================================================================
// Depth Clamp Emulation
// ============================================================================

#[test]
fn wgsl_depth_clamp_emulation_adds_a_varying() {
    let options = ProgramOptions::new(Dialect::Wgsl).with_depth_clamp_emulation(true);
    let program = textured_quad(&options);
    let vs = program.source(ShaderStage::Vertex).unwrap();
    let fs = program.source(ShaderStage::Fragment).unwrap();

    assert!(vs.contains("@location(1) depth_clamp_z: f32,"));
    assert!(vs.contains("output.depth_clamp_z = output.builtin_position.z / output.builtin_position.w;"));
    assert!(vs.contains(
        "output.builtin_position.z = clamp(output.builtin_position.z, 0.0, output.builtin_position.w);"
    ));
    assert!(fs.contains("@builtin(frag_depth) builtin_frag_depth: f32,"));
    assert!(fs.contains("output.builtin_frag_depth = clamp(input.depth_clamp_z, 0.0, 1.0);"));
}

#[test]
fn glsl_ignores_depth_clamp_emulation() {
    let options = ProgramOptions::new(Dialect::GlslEs300).with_depth_clamp_emulation(true);
    let program = textured_quad(&options);
    for stage in [ShaderStage::Vertex, ShaderStage::Fragment] {
        assert!(!program.source(stage).unwrap().contains("depth_clamp"));
    }
}

// ============================================================================
// Compute
// ============================================================================

#[test]
fn compute_stage_declares_workgroup_size() {
    let mut builder = ProgramBuilder::new();
    let options = ProgramOptions::new(Dialect::Wgsl).with_workgroup_size([8, 8, 1]);
    let program = builder
        .build_compute(&options, |cs| {
            let data = cs.storage("data", Type::array(Type::f32(), None), 0)?;
            cs.main(|b| {
                let id = b.builtin(BuiltinVar::GlobalInvocationId)?;
                let x = b.get(&id, "x")?;
                let slot = b.index(&data, &x)?;
                b.assign(&slot, 1.0)
            })
        })
        .unwrap();
    let cs = program.source(ShaderStage::Compute).unwrap();

    assert!(cs.contains("@compute @workgroup_size(8, 8, 1)"));
    assert!(cs.contains("@builtin(global_invocation_id) builtin_global_invocation_id: vec3<u32>,"));
    assert!(cs.contains("builtin_in.global_invocation_id = input.builtin_global_invocation_id;"));
    assert!(cs.contains("data[builtin_in.global_invocation_id.x] = 1.0;"));
}

#[test]
fn compute_is_wgsl_only() {
    for dialect in DIALECTS.into_iter().filter(|d| d.is_glsl()) {
        let mut builder = ProgramBuilder::new();
        let result = builder.build_compute(&ProgramOptions::new(dialect), |cs| cs.main(|_| Ok(())));
        assert!(result.is_err());
        assert_eq!(builder.last_error().unwrap().kind, ErrorKind::Unsupported);
    }
}

#[test]
fn every_dialect_emits_both_render_stages() {
    for dialect in DIALECTS {
        let program = textured_quad(&ProgramOptions::new(dialect));
        assert_eq!(program.dialect, dialect);
        assert_eq!(program.stages.len(), 2);
        assert!(program.source(ShaderStage::Compute).is_none());
    }
}

// ============================================================================
// Half Precision
// ============================================================================

/// WGSL fragment source reading a `value` uniform of type `ty` through `read`.
fn uniform_source(
    ty: Type,
    read: impl FnOnce(&mut StageBuilder<'_>, &Expr) -> myth_shader::Result<Expr>,
) -> String {
    let mut builder = ProgramBuilder::new();
    let program = builder
        .build_render(
            &ProgramOptions::new(Dialect::Wgsl),
            |vs| vs.main(|_| Ok(())),
            |fs| {
                let value = fs.uniform("value", ty, 0)?;
                let color = fs.output("color", Type::vec4f())?;
                fs.main(|b| {
                    let rgba = read(b, &value)?;
                    b.assign(&color, &rgba)
                })
            },
        )
        .unwrap();
    program.source(ShaderStage::Fragment).unwrap().to_string()
}

#[test]
fn struct_names_do_not_enable_f16() {
    let params = Type::structure("Params")
        .member("scale_f16", Type::f32())
        .build();
    let src = uniform_source(params, |b, value| {
        let scale = b.get(value, "scale_f16")?;
        b.construct(Type::vec4f(), &[scale])
    });
    assert!(src.contains("scale_f16: f32,"));
    assert!(!src.contains("enable f16;"));
}

#[test]
fn f16_components_enable_f16() {
    let src = uniform_source(Type::vector(ScalarKind::F16, 4), |b, value| {
        b.cast(Type::vec4f(), value)
    });
    assert!(src.contains("enable f16;"));
    assert!(src.contains("value: vec4<f16>,"));
}

// ============================================================================
// Texture Sampling per Dialect
// ============================================================================

/// Fragment stage sampling `texture` at the `v_uv` varying through `sample`.
fn sampling_source(
    options: &ProgramOptions,
    texture: TextureType,
    sample: impl FnOnce(&mut StageBuilder<'_>, &Expr, &Expr) -> myth_shader::Result<Expr>,
) -> myth_shader::Result<String> {
    let mut builder = ProgramBuilder::new();
    let program = builder.build_render(
        options,
        |vs| {
            let uv = vs.input("uv", Type::vec2f())?;
            let v_uv = vs.output("v_uv", Type::vec2f())?;
            vs.main(|b| {
                let out = b.builtin(BuiltinVar::Position)?;
                let origin = b.construct(Type::vec4f(), &[Expr::literal(0.0)])?;
                b.assign(&out, &origin)?;
                b.assign(&v_uv, &uv)
            })
        },
        |fs| {
            let v_uv = fs.input("v_uv", Type::vec2f())?;
            let tex = fs.texture("tex", texture, 0)?;
            let color = fs.output("color", Type::vec4f())?;
            fs.main(|b| {
                let value = sample(b, &tex, &v_uv)?;
                let rgba = if value.ty.is_scalar() {
                    b.construct(Type::vec4f(), &[value])?
                } else {
                    value
                };
                b.assign(&color, &rgba)
            })
        },
    )?;
    Ok(program.source(ShaderStage::Fragment).unwrap().to_string())
}

fn compare(b: &mut StageBuilder<'_>, tex: &Expr, uv: &Expr) -> myth_shader::Result<Expr> {
    b.call("textureSampleCompare", &[tex.clone(), uv.clone(), Expr::literal(0.5)])
}

#[test]
fn comparison_sampling_per_dialect() {
    let shadow = TextureType::depth(TextureDim::D2);

    let wgsl = sampling_source(&ProgramOptions::new(Dialect::Wgsl), shadow, compare).unwrap();
    assert!(wgsl.contains("var tex: texture_depth_2d;"));
    assert!(wgsl.contains("var tex_comparison_sampler: sampler_comparison;"));
    assert!(wgsl.contains("textureSampleCompare(tex, tex_comparison_sampler, v_uv, 0.5)"));

    let es3 = sampling_source(&ProgramOptions::new(Dialect::GlslEs300), shadow, compare).unwrap();
    assert!(es3.contains("sampler2DShadow tex;"));
    assert!(es3.contains("texture(tex, vec3(v_uv, 0.5))"));

    let err = sampling_source(&ProgramOptions::new(Dialect::GlslEs100), shadow, compare).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);
}

#[test]
fn explicit_level_comparison_in_the_fragment_stage() {
    let shadow = TextureType::depth(TextureDim::D2);
    let level = |b: &mut StageBuilder<'_>, tex: &Expr, uv: &Expr| {
        b.call("textureSampleCompareLevel", &[tex.clone(), uv.clone(), Expr::literal(0.5)])
    };

    let wgsl = sampling_source(&ProgramOptions::new(Dialect::Wgsl), shadow, level).unwrap();
    assert!(wgsl.contains("textureSampleCompareLevel(tex, tex_comparison_sampler, v_uv, 0.5)"));

    let es3 = sampling_source(&ProgramOptions::new(Dialect::GlslEs300), shadow, level).unwrap();
    assert!(es3.contains("textureLod(tex, vec3(v_uv, 0.5), 0.0)"));
}

#[test]
fn comparison_needs_a_depth_texture() {
    let color = TextureType::sampled(TextureDim::D2, ScalarKind::F32);
    let err = sampling_source(&ProgramOptions::new(Dialect::Wgsl), color, compare).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ParamType);
}

#[test]
fn bias_sampling_per_dialect() {
    let color = TextureType::sampled(TextureDim::D2, ScalarKind::F32);
    let bias = |b: &mut StageBuilder<'_>, tex: &Expr, uv: &Expr| {
        b.call("textureSampleBias", &[tex.clone(), uv.clone(), Expr::literal(0.5)])
    };

    let wgsl = sampling_source(&ProgramOptions::new(Dialect::Wgsl), color, bias).unwrap();
    assert!(wgsl.contains("textureSampleBias(tex, tex_sampler, v_uv, 0.5)"));

    let es3 = sampling_source(&ProgramOptions::new(Dialect::GlslEs300), color, bias).unwrap();
    assert!(es3.contains("texture(tex, v_uv, 0.5)"));

    let es1 = sampling_source(&ProgramOptions::new(Dialect::GlslEs100), color, bias).unwrap();
    assert!(es1.contains("texture2D(tex, v_uv, 0.5)"));
}

#[test]
fn gradient_sampling_per_dialect() {
    let color = TextureType::sampled(TextureDim::D2, ScalarKind::F32);
    let grad = |b: &mut StageBuilder<'_>, tex: &Expr, uv: &Expr| {
        let ddx = b.call("dpdx", &[uv.clone()])?;
        let ddy = b.call("dpdy", &[uv.clone()])?;
        b.call("textureSampleGrad", &[tex.clone(), uv.clone(), ddx, ddy])
    };

    let wgsl = sampling_source(&ProgramOptions::new(Dialect::Wgsl), color, grad).unwrap();
    assert!(wgsl.contains("textureSampleGrad(tex, tex_sampler, v_uv, dpdx(v_uv), dpdy(v_uv))"));

    let es3 = sampling_source(&ProgramOptions::new(Dialect::GlslEs300), color, grad).unwrap();
    assert!(es3.contains("textureGrad(tex, v_uv, dFdx(v_uv), dFdy(v_uv))"));

    let es1_options = ProgramOptions::new(Dialect::GlslEs100)
        .with_caps(DeviceCaps::STANDARD_DERIVATIVES | DeviceCaps::SHADER_TEXTURE_LOD);
    let es1 = sampling_source(&es1_options, color, grad).unwrap();
    assert!(es1.contains("#extension GL_EXT_shader_texture_lod : enable"));
    assert!(es1.contains("texture2DGradEXT(tex, v_uv, dFdx(v_uv), dFdy(v_uv))"));

    let err = sampling_source(&ProgramOptions::new(Dialect::GlslEs100), color, grad).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);
}
