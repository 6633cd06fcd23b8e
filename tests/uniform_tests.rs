//! Uniform and binding layout tests
//!
//! Tests for:
//! - Folding plain uniforms into per-(group, visibility) blocks
//! - Visibility widening when both stages declare a uniform
//! - Binding numbering with textures, implicit samplers and storage buffers
//! - Block declarations per dialect
//! - Uniform buffer placement of arrays and nested structs, checked with naga
//! - Layout determinism across builds and the serialized layout shape

use myth_shader::prelude::*;

// ============================================================================
// Helpers
// ============================================================================

fn light_type() -> Type {
    Type::structure("Light")
        .member("color", Type::vec3f())
        .member("intensity", Type::f32())
        .build()
}

fn pair_type() -> Type {
    Type::structure("Pair")
        .member("a", Type::f32())
        .member("b", Type::f32())
        .build()
}

/// Parses and validates WGSL source the way wgpu does at pipeline creation.
fn validate_wgsl(source: &str) {
    let module = naga::front::wgsl::parse_str(source)
        .unwrap_or_else(|e| panic!("{}\n{source}", e.emit_to_string(source)));
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .unwrap_or_else(|e| panic!("{e:?}\n{source}"));
}

/// Vertex stage that only writes a position.
fn plain_vertex(vs: &mut StageBuilder<'_>) -> myth_shader::Result<()> {
    vs.main(|b| {
        let out = b.builtin(BuiltinVar::Position)?;
        let origin = b.construct(Type::vec4f(), &[Expr::literal(0.0)])?;
        b.assign(&out, &origin)
    })
}

/// A fragment-only `exposure: f32` uniform scaling the output.
fn exposure_program(dialect: Dialect) -> CompiledProgram {
    let mut builder = ProgramBuilder::new();
    builder
        .build_render(&ProgramOptions::new(dialect), plain_vertex, |fs| {
            let exposure = fs.uniform("exposure", Type::f32(), 0)?;
            let color = fs.output("color", Type::vec4f())?;
            fs.main(|b| {
                let rgba = b.construct(Type::vec4f(), &[exposure.clone()])?;
                b.assign(&color, &rgba)
            })
        })
        .unwrap()
}

/// A `Light` uniform declared by both stages.
fn shared_light_program(builder: &mut ProgramBuilder, dialect: Dialect) -> CompiledProgram {
    builder
        .build_render(
            &ProgramOptions::new(dialect),
            |vs| {
                let light = vs.uniform("light", light_type(), 0)?;
                vs.main(|b| {
                    let intensity = b.get(&light, "intensity")?;
                    let out = b.builtin(BuiltinVar::Position)?;
                    let clip = b.construct(Type::vec4f(), &[intensity])?;
                    b.assign(&out, &clip)
                })
            },
            |fs| {
                let light = fs.uniform("light", light_type(), 0)?;
                let color = fs.output("color", Type::vec4f())?;
                fs.main(|b| {
                    let rgb = b.get(&light, "color")?;
                    let rgba = b.construct(Type::vec4f(), &[rgb, Expr::literal(1.0)])?;
                    b.assign(&color, &rgba)
                })
            },
        )
        .unwrap()
}

// ============================================================================
// Merging
// ============================================================================

#[test]
fn fragment_only_uniform_gets_one_fragment_block() {
    let program = exposure_program(Dialect::Wgsl);
    assert_eq!(program.bind_group_layouts.len(), 1);

    let layout = &program.bind_group_layouts[0];
    assert_eq!(layout.group, 0);
    assert_eq!(layout.label, "group0");
    assert_eq!(layout.entries.len(), 1);

    let entry = &layout.entries[0];
    assert_eq!(entry.binding, 0);
    assert_eq!(entry.visibility, ShaderStages::FRAGMENT);
    assert_eq!(entry.resource_kind, ResourceKind::Buffer);
    assert_eq!(entry.name, "UniformGroup0Fragment");

    let buffer = entry.buffer_layout.as_ref().unwrap();
    assert_eq!(buffer.members.len(), 1);
    assert_eq!(buffer.members[0].name, "exposure");
    assert_eq!(buffer.members[0].offset, 0);
    assert!(!buffer.dynamic_offset);
}

#[test]
fn shared_uniform_widens_visibility() {
    let mut builder = ProgramBuilder::new();
    let program = shared_light_program(&mut builder, Dialect::Wgsl);

    let entries = &program.bind_group_layouts[0].entries;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].visibility, ShaderStages::VERTEX_FRAGMENT);
    assert_eq!(entries[0].name, "UniformGroup0Shared");
    let buffer = entries[0].buffer_layout.as_ref().unwrap();
    assert_eq!(buffer.members[0].name, "light");
    assert_eq!(buffer.size, 16);

    let vs = program.source(ShaderStage::Vertex).unwrap();
    let fs = program.source(ShaderStage::Fragment).unwrap();
    for src in [vs, fs] {
        assert!(src.contains("struct Light {"));
        assert!(src.contains("struct UniformGroup0Shared {"));
        assert!(src.contains("@group(0) @binding(0) var<uniform> u_group0_shared: UniformGroup0Shared;"));
        validate_wgsl(src);
    }
    assert!(vs.contains("u_group0_shared.light.intensity"));
    assert!(fs.contains("u_group0_shared.light.color"));
}

#[test]
fn groups_are_planned_independently() {
    let mut builder = ProgramBuilder::new();
    let program = builder
        .build_render(&ProgramOptions::new(Dialect::Wgsl), plain_vertex, |fs| {
            let a = fs.uniform("tint", Type::vec4f(), 0)?;
            let b_ = fs.uniform("scale", Type::f32(), 1)?;
            let color = fs.output("color", Type::vec4f())?;
            fs.main(|b| {
                let scaled = b.binary(BinaryOp::Mul, &a, &b_)?;
                b.assign(&color, &scaled)
            })
        })
        .unwrap();

    let groups: Vec<_> = program
        .bind_group_layouts
        .iter()
        .map(|l| (l.group, l.entries[0].name.as_str(), l.entries[0].binding))
        .collect();
    assert_eq!(
        groups,
        vec![(0, "UniformGroup0Fragment", 0), (1, "UniformGroup1Fragment", 0)]
    );
}

// ============================================================================
// Separate Bindings
// ============================================================================

#[test]
fn textures_keep_their_own_binding() {
    let mut builder = ProgramBuilder::new();
    let program = builder
        .build_render(&ProgramOptions::new(Dialect::Wgsl), plain_vertex, |fs| {
            let exposure = fs.uniform("exposure", Type::f32(), 0)?;
            let albedo = fs.texture(
                "albedo",
                TextureType::sampled(TextureDim::D2, ScalarKind::F32),
                0,
            )?;
            let color = fs.output("color", Type::vec4f())?;
            fs.main(|b| {
                let coord = b.construct(Type::vec2f(), &[Expr::literal(0.5)])?;
                let texel = b.call("textureSample", &[albedo.clone(), coord])?;
                let lit = b.binary(BinaryOp::Mul, &texel, &exposure)?;
                b.assign(&color, &lit)
            })
        })
        .unwrap();

    let kinds: Vec<_> = program.bind_group_layouts[0]
        .entries
        .iter()
        .map(|e| (e.binding, e.resource_kind, e.name.as_str()))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (0, ResourceKind::Buffer, "UniformGroup0Fragment"),
            (1, ResourceKind::Texture, "albedo"),
            (2, ResourceKind::Sampler, "albedo_sampler"),
        ]
    );

    let fs = program.source(ShaderStage::Fragment).unwrap();
    assert!(fs.contains("@group(0) @binding(1) var albedo: texture_2d<f32>;"));
    assert!(fs.contains("@group(0) @binding(2) var albedo_sampler: sampler;"));
    assert!(fs.contains("textureSample(albedo, albedo_sampler, vec2<f32>(0.5))"));
}

#[test]
fn written_storage_buffers_are_read_write() {
    let mut builder = ProgramBuilder::new();
    let program = builder
        .build_compute(&ProgramOptions::new(Dialect::Wgsl), |cs| {
            let values = cs.storage("values", Type::array(Type::f32(), None), 0)?;
            let results = cs.storage("results", Type::array(Type::f32(), None), 0)?;
            cs.main(|b| {
                let id = b.builtin(BuiltinVar::GlobalInvocationId)?;
                let x = b.get(&id, "x")?;
                let src = b.index(&values, &x)?;
                let dst = b.index(&results, &x)?;
                b.assign(&dst, &src)
            })
        })
        .unwrap();

    let entries = &program.bind_group_layouts[0].entries;
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.resource_kind == ResourceKind::StorageBuffer));
    assert!(entries.iter().all(|e| e.visibility == ShaderStages::COMPUTE));
    assert!(entries[0].buffer_layout.as_ref().unwrap().read_only);
    assert!(!entries[1].buffer_layout.as_ref().unwrap().read_only);

    let cs = program.source(ShaderStage::Compute).unwrap();
    assert!(cs.contains("@group(0) @binding(0) var<storage, read> values: array<f32>;"));
    assert!(cs.contains("@group(0) @binding(1) var<storage, read_write> results: array<f32>;"));
}

#[test]
fn dynamic_uniforms_are_never_folded() {
    let mut builder = ProgramBuilder::new();
    let program = builder
        .build_render(
            &ProgramOptions::new(Dialect::Wgsl),
            |vs| {
                let model = vs.uniform_dynamic("model", Type::mat4f(), 1)?;
                let position = vs.input("position", Type::vec4f())?;
                vs.main(|b| {
                    let world = b.binary(BinaryOp::Mul, &model, &position)?;
                    let out = b.builtin(BuiltinVar::Position)?;
                    b.assign(&out, &world)
                })
            },
            |fs| fs.main(|_| Ok(())),
        )
        .unwrap();

    let entry = &program.bind_group_layouts[0].entries[0];
    assert_eq!(program.bind_group_layouts[0].group, 1);
    assert_eq!(entry.name, "model");
    assert_eq!(entry.visibility, ShaderStages::VERTEX);
    let buffer = entry.buffer_layout.as_ref().unwrap();
    assert!(buffer.dynamic_offset);
    assert_eq!(buffer.size, 64);

    let vs = program.source(ShaderStage::Vertex).unwrap();
    assert!(vs.contains("@group(1) @binding(0) var<uniform> model: mat4x4<f32>;"));
}

// ============================================================================
// Block Declarations per Dialect
// ============================================================================

#[test]
fn es3_declares_std140_blocks() {
    let program = exposure_program(Dialect::GlslEs300);
    let fs = program.source(ShaderStage::Fragment).unwrap();
    assert!(fs.contains("layout(std140) uniform UniformGroup0Fragment {"));
    assert!(fs.contains("    float exposure;"));
    assert!(fs.contains("} u_group0_fragment;"));
    assert!(!fs.contains("struct UniformGroup0Fragment"));
    assert!(fs.contains("vec4(u_group0_fragment.exposure)"));
}

#[test]
fn es1_declares_blocks_as_struct_uniforms() {
    let program = exposure_program(Dialect::GlslEs100);
    let fs = program.source(ShaderStage::Fragment).unwrap();
    assert!(fs.contains("struct UniformGroup0Fragment {"));
    assert!(fs.contains("uniform UniformGroup0Fragment u_group0_fragment;"));
    assert!(fs.contains("gl_FragColor = vec4(u_group0_fragment.exposure);"));
}

// ============================================================================
// Arrays & Nested Structs
// ============================================================================

/// A fragment-only `weights: array<f32, 4>` uniform read at index 1.
fn weights_program(dialect: Dialect) -> CompiledProgram {
    let mut builder = ProgramBuilder::new();
    builder
        .build_render(&ProgramOptions::new(dialect), plain_vertex, |fs| {
            let weights = fs.uniform("weights", Type::array(Type::f32(), Some(4)), 0)?;
            let color = fs.output("color", Type::vec4f())?;
            fs.main(|b| {
                let w = b.index(&weights, 1)?;
                let rgba = b.construct(Type::vec4f(), &[w])?;
                b.assign(&color, &rgba)
            })
        })
        .unwrap()
}

/// `time: f32` followed by a `pair: Pair` uniform.
fn pair_program(dialect: Dialect) -> CompiledProgram {
    let mut builder = ProgramBuilder::new();
    builder
        .build_render(&ProgramOptions::new(dialect), plain_vertex, |fs| {
            let time = fs.uniform("time", Type::f32(), 0)?;
            let pair = fs.uniform("pair", pair_type(), 0)?;
            let color = fs.output("color", Type::vec4f())?;
            fs.main(|b| {
                let a = b.get(&pair, "a")?;
                let sum = b.binary(BinaryOp::Add, &time, &a)?;
                let rgba = b.construct(Type::vec4f(), &[sum])?;
                b.assign(&color, &rgba)
            })
        })
        .unwrap()
}

#[test]
fn wgsl_scalar_arrays_are_widened_to_a_16_byte_stride() {
    let program = weights_program(Dialect::Wgsl);
    let buffer = program.bind_group_layouts[0].entries[0]
        .buffer_layout
        .as_ref()
        .unwrap();
    assert_eq!(buffer.size, 64);

    let fs = program.source(ShaderStage::Fragment).unwrap();
    assert!(fs.contains("weights: array<vec4<f32>, 4>,"));
    assert!(!fs.contains("array<f32, 4>"));
    assert!(fs.contains("u_group0_fragment.weights[1"));
    assert!(fs.contains("].x)"));
    validate_wgsl(fs);
}

#[test]
fn glsl_scalar_arrays_keep_their_element_type() {
    let es3 = weights_program(Dialect::GlslEs300);
    let fs = es3.source(ShaderStage::Fragment).unwrap();
    assert!(fs.contains("float weights[4];"));
    assert!(fs.contains("u_group0_fragment.weights[1]"));

    let es1 = weights_program(Dialect::GlslEs100);
    let fs = es1.source(ShaderStage::Fragment).unwrap();
    assert!(fs.contains("float weights[4];"));
}

#[test]
fn wgsl_rejects_whole_uniform_array_reads() {
    let mut builder = ProgramBuilder::new();
    let result = builder.build_render(&ProgramOptions::new(Dialect::Wgsl), plain_vertex, |fs| {
        let weights = fs.uniform("weights", Type::array(Type::f32(), Some(4)), 0)?;
        fs.main(|b| b.var("copy", &weights).map(|_| ()))
    });
    assert_eq!(result.unwrap_err().kind(), ErrorKind::Unsupported);
}

#[test]
fn nested_structs_start_on_a_16_byte_boundary() {
    let program = pair_program(Dialect::Wgsl);
    let buffer = program.bind_group_layouts[0].entries[0]
        .buffer_layout
        .as_ref()
        .unwrap();
    assert_eq!(buffer.members[0].name, "time");
    assert_eq!(buffer.members[1].name, "pair");
    assert_eq!(buffer.members[1].offset, 16);
    assert_eq!(buffer.size, 32);

    let fs = program.source(ShaderStage::Fragment).unwrap();
    assert!(fs.contains("    @align(16) a: f32,\n    b: f32,"));
    assert!(fs.contains("    time: f32,\n    pair: Pair,"));
    assert!(fs.contains("(u_group0_fragment.time + u_group0_fragment.pair.a)"));
    validate_wgsl(fs);
}

#[test]
fn glsl_declares_member_structs_before_the_block() {
    let es3 = pair_program(Dialect::GlslEs300);
    let fs = es3.source(ShaderStage::Fragment).unwrap();
    let pair = fs.find("struct Pair {").unwrap();
    let block = fs.find("layout(std140) uniform UniformGroup0Fragment {").unwrap();
    assert!(pair < block);

    let es1 = pair_program(Dialect::GlslEs100);
    let fs = es1.source(ShaderStage::Fragment).unwrap();
    let pair = fs.find("struct Pair {").unwrap();
    let block = fs.find("struct UniformGroup0Fragment {").unwrap();
    assert!(pair < block);
    assert!(fs.find("uniform UniformGroup0Fragment u_group0_fragment;").unwrap() > block);
}

// ============================================================================
// Determinism & Serialization
// ============================================================================

#[test]
fn rebuilding_yields_identical_layouts() {
    let mut builder = ProgramBuilder::new();
    let first = shared_light_program(&mut builder, Dialect::Wgsl);
    let second = shared_light_program(&mut builder, Dialect::Wgsl);
    assert_eq!(first.bind_group_layouts, second.bind_group_layouts);
    assert_eq!(first.stages, second.stages);
}

#[test]
fn layouts_serialize_for_the_backend() {
    let program = exposure_program(Dialect::Wgsl);
    let json = serde_json::to_value(&program.bind_group_layouts).unwrap();

    let entry = &json[0]["entries"][0];
    assert_eq!(json[0]["group"], 0);
    assert_eq!(entry["binding"], 0);
    assert_eq!(entry["visibility"], ShaderStages::FRAGMENT.bits());
    assert_eq!(entry["resource_kind"], "buffer");
    assert_eq!(entry["name"], "UniformGroup0Fragment");
    assert_eq!(entry["buffer_layout"]["members"][0]["name"], "exposure");
    assert!(entry.get("texture").is_none());
    assert!(entry.get("sampler").is_none());
}
