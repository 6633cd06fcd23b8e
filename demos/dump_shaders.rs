//! Builds a tinted textured quad for every dialect and prints the generated
//! sources together with the planned bind group layouts.
//!
//! Run with `RUST_LOG=myth_shader=debug` to see the planner decisions.

use myth_shader::prelude::*;

fn build(dialect: Dialect) -> myth_shader::Result<CompiledProgram> {
    let mut builder = ProgramBuilder::new();
    builder.build_render(
        &ProgramOptions::new(dialect),
        |vs| {
            let position = vs.input("position", Type::vec3f())?;
            let uv = vs.input("uv", Type::vec2f())?;
            let v_uv = vs.output("v_uv", Type::vec2f())?;
            let mvp = vs.uniform("mvp", Type::mat4f(), 0)?;
            vs.main(|b| {
                let local = b.construct(Type::vec4f(), &[position.clone(), Expr::literal(1.0)])?;
                let clip = b.binary(BinaryOp::Mul, &mvp, &local)?;
                let out = b.builtin(BuiltinVar::Position)?;
                b.assign(&out, &clip)?;
                b.assign(&v_uv, &uv)
            })
        },
        |fs| {
            let v_uv = fs.input("v_uv", Type::vec2f())?;
            let tint = fs.uniform("tint", Type::vec4f(), 0)?;
            let color = fs.output("color", Type::vec4f())?;
            fs.main(|b| {
                let base = b.construct(
                    Type::vec4f(),
                    &[v_uv.clone(), Expr::literal(0.0), Expr::literal(1.0)],
                )?;
                let shaded = b.binary(BinaryOp::Mul, &base, &tint)?;
                b.assign(&color, &shaded)
            })
        },
    )
}

fn main() -> myth_shader::Result<()> {
    env_logger::init();

    for dialect in [Dialect::GlslEs100, Dialect::GlslEs300, Dialect::Wgsl] {
        let program = build(dialect)?;
        println!("// ===== {dialect} =====");
        for stage in &program.stages {
            println!("// --- {:?} ---", stage.stage);
            println!("{}", stage.source);
        }
        for group in &program.bind_group_layouts {
            for entry in &group.entries {
                println!(
                    "// {} binding {}: {} ({:?}, {:?})",
                    group.label, entry.binding, entry.name, entry.resource_kind, entry.visibility
                );
            }
        }
        for attr in &program.vertex_attributes {
            println!("// @location({}) {}: {}", attr.location, attr.name, attr.format);
        }
    }
    Ok(())
}
