//! Scope tests
//!
//! Tests for:
//! - Declarations released when a block scope closes
//! - Redeclaration within one scope
//! - Lookup through nested scopes and shadowing
//! - Builder-level visibility of locals across blocks and stages
//! - Struct declarations shared between stages, and kept out of stages
//!   that never use them

use myth_shader::ast::{DeclKind, Variable};
use myth_shader::prelude::*;
use myth_shader::scope::{ScopeKind, ScopeStack};

fn local(name: &str) -> Variable {
    Variable::new(name, Type::f32(), DeclKind::Local)
}

// ============================================================================
// ScopeStack
// ============================================================================

#[test]
fn name_is_free_again_after_its_block_closes() {
    let mut scopes = ScopeStack::new();
    scopes.push(ScopeKind::Function);
    scopes.push(ScopeKind::Block);
    scopes.declare(&local("t")).unwrap();
    scopes.pop().unwrap();

    assert!(scopes.lookup("t").is_none());
    scopes.declare(&local("t")).unwrap();
    assert!(scopes.lookup("t").is_some());
}

#[test]
fn duplicate_in_one_scope_is_rejected() {
    let mut scopes = ScopeStack::new();
    scopes.push(ScopeKind::Function);
    scopes.declare(&local("t")).unwrap();
    let err = scopes.declare(&local("t")).unwrap_err();
    assert!(matches!(err, ShaderError::Redeclared(ref n) if n == "t"));
    assert_eq!(err.kind(), ErrorKind::Scope);
}

#[test]
fn nested_lookup_finds_the_nearest_binding() {
    let mut scopes = ScopeStack::new();
    scopes.declare_global(&Variable::new("t", Type::vec4f(), DeclKind::Uniform)).unwrap();
    scopes.push(ScopeKind::Function);
    assert_eq!(scopes.lookup("t").unwrap().ty, Type::vec4f());

    scopes.push(ScopeKind::Loop);
    scopes.declare(&local("t")).unwrap();
    assert_eq!(scopes.lookup("t").unwrap().ty, Type::f32());
    assert!(scopes.in_loop());

    scopes.pop().unwrap();
    assert_eq!(scopes.lookup("t").unwrap().ty, Type::vec4f());
    assert_eq!(scopes.depth(), 2);
}

// ============================================================================
// Through the Builder
// ============================================================================

fn fragment_body(
    body: impl FnOnce(&mut StageBuilder<'_>) -> myth_shader::Result<()>,
) -> (myth_shader::Result<CompiledProgram>, ProgramBuilder) {
    let mut builder = ProgramBuilder::new();
    let result = builder.build_render(
        &ProgramOptions::new(Dialect::Wgsl),
        |vs| vs.main(|_| Ok(())),
        |fs| fs.main(body),
    );
    (result, builder)
}

#[test]
fn sibling_blocks_may_reuse_a_name() {
    let (result, _) = fragment_body(|b| {
        b.block(|b| b.var("t", 1.0).map(|_| ()))?;
        b.block(|b| b.var("t", 2).map(|_| ()))
    });
    let program = result.unwrap();
    let fs = program.source(ShaderStage::Fragment).unwrap();
    assert!(fs.contains("var t: f32 = 1.0;"));
    assert!(fs.contains("var t: i32 = 2i;"));
}

#[test]
fn locals_do_not_escape_their_block() {
    let (result, builder) = fragment_body(|b| {
        b.block(|b| b.var("t", 1.0).map(|_| ()))?;
        b.lookup("t").map(|_| ())
    });
    assert!(result.is_err());
    assert_eq!(builder.last_error().unwrap().kind, ErrorKind::Ast);
}

#[test]
fn redeclaring_a_local_fails_the_build() {
    let (result, builder) = fragment_body(|b| {
        b.var("t", 1.0)?;
        b.var("t", 2.0).map(|_| ())
    });
    assert!(matches!(result, Err(ShaderError::Redeclared(_))));
    assert_eq!(builder.last_error().unwrap().kind, ErrorKind::Scope);
    assert_eq!(builder.phase(), Phase::Idle);
}

#[test]
fn stages_have_separate_scopes() {
    let mut builder = ProgramBuilder::new();
    let program = builder
        .build_render(
            &ProgramOptions::new(Dialect::GlslEs300),
            |vs| vs.main(|b| b.var("shade", 0.5).map(|_| ())),
            |fs| fs.main(|b| b.var("shade", 0.25).map(|_| ())),
        )
        .unwrap();
    assert!(program.source(ShaderStage::Vertex).unwrap().contains("float shade = 0.5;"));
    assert!(program.source(ShaderStage::Fragment).unwrap().contains("float shade = 0.25;"));
}

// ============================================================================
// Struct Declarations
// ============================================================================

fn light(policy: LayoutPolicy) -> Type {
    Type::structure("Light")
        .member("color", Type::vec3f())
        .member("intensity", Type::f32())
        .policy(policy)
        .build()
}

#[test]
fn stages_share_one_struct_shape() {
    let mut builder = ProgramBuilder::new();
    let program = builder
        .build_render(
            &ProgramOptions::new(Dialect::Wgsl),
            |vs| {
                vs.define_struct(&light(LayoutPolicy::Std140))?;
                vs.main(|_| Ok(()))
            },
            |fs| {
                fs.define_struct(&light(LayoutPolicy::Std140))?;
                fs.main(|_| Ok(()))
            },
        )
        .unwrap();
    for stage in [ShaderStage::Vertex, ShaderStage::Fragment] {
        let source = program.source(stage).unwrap();
        assert_eq!(source.matches("struct Light {").count(), 1);
    }
}

#[test]
fn struct_name_with_another_policy_is_rejected() {
    let mut builder = ProgramBuilder::new();
    let result = builder.build_render(
        &ProgramOptions::new(Dialect::Wgsl),
        |vs| {
            vs.define_struct(&light(LayoutPolicy::Std140))?;
            vs.main(|_| Ok(()))
        },
        |fs| {
            fs.define_struct(&light(LayoutPolicy::Std430))?;
            fs.main(|_| Ok(()))
        },
    );
    assert!(matches!(result, Err(ShaderError::Redeclared(ref n)) if n.contains("Light")));
    assert_eq!(builder.last_error().unwrap().kind, ErrorKind::Scope);
}

#[test]
fn structs_stay_in_the_stages_that_use_them() {
    for dialect in [Dialect::GlslEs300, Dialect::Wgsl] {
        let mut builder = ProgramBuilder::new();
        let program = builder
            .build_render(
                &ProgramOptions::new(dialect),
                |vs| {
                    let sun = vs.uniform("sun", light(LayoutPolicy::Std140), 0)?;
                    vs.main(|b| {
                        let intensity = b.get(&sun, "intensity")?;
                        let clip = b.construct(Type::vec4f(), &[intensity])?;
                        let out = b.builtin(BuiltinVar::Position)?;
                        b.assign(&out, &clip)
                    })
                },
                |fs| {
                    let tint = fs.uniform("tint", Type::vec4f(), 0)?;
                    let color = fs.output("color", Type::vec4f())?;
                    fs.main(|b| b.assign(&color, &tint))
                },
            )
            .unwrap();

        let vs = program.source(ShaderStage::Vertex).unwrap();
        let fs = program.source(ShaderStage::Fragment).unwrap();
        assert_eq!(vs.matches("struct Light {").count(), 1);
        assert!(!fs.contains("Light"));
        assert!(!vs.contains("tint"));
    }
}
