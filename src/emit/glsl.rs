//! GLSL ES 1.00 / 3.00 emitter.
//!
//! Both versions share statement and expression syntax. They differ in the
//! interface qualifiers (`attribute`/`varying` against `in`/`out` with
//! locations), in how merged uniform blocks are declared, and in the
//! fragment color output (`gl_FragColor` in ES 1.00).

use serde::Serialize;

use super::{Ctx, Lines, StageModule, paren, structs_declared, templates};
use crate::ast::{DeclKind, FunctionDef, Stmt, Variable};
use crate::dialect::{Dialect, ShaderStage};
use crate::errors::{Result, ShaderError};
use crate::program::ProgramOptions;
use crate::types::Type;
use crate::uniforms::{BLOCK_TAG, DYNAMIC_TAG};

#[derive(Serialize)]
struct GlslModule<'a> {
    version: &'static str,
    extensions: Vec<&'static str>,
    guard_precision: bool,
    items: Vec<String>,
    main: &'a str,
}

pub(super) fn emit(module: &StageModule, options: &ProgramOptions) -> Result<String> {
    let emitter = GlslEmitter {
        ctx: Ctx {
            dialect: options.dialect,
            stage: module.stage,
            padded: &[],
        },
        structs: module.structs(),
        blocks: module.block_types(),
    };

    let mut items = Vec::new();
    for stmt in &module.globals {
        if let Some(item) = emitter.global(stmt)? {
            items.push(item);
        }
    }

    let mut main = Lines::with_depth(1);
    emitter.block(&mut main, &module.main)?;
    let main = main.finish();

    let es3 = emitter.es3();
    templates::render(
        "module.glsl",
        &GlslModule {
            version: if es3 { "300 es" } else { "100" },
            extensions: module.extensions.iter().copied().collect(),
            guard_precision: !es3 && module.stage == ShaderStage::Fragment,
            items,
            main: main.trim_end(),
        },
    )
}

struct GlslEmitter<'a> {
    ctx: Ctx<'a>,
    structs: Vec<Type>,
    /// Struct types of merged uniform blocks; ES 3.00 declares them inline.
    blocks: Vec<Type>,
}

impl GlslEmitter<'_> {
    fn es3(&self) -> bool {
        self.ctx.dialect == Dialect::GlslEs300
    }

    fn decl(&self, ty: &Type, name: &str) -> Result<String> {
        ty.declare(self.ctx.dialect, name)
    }

    // ========================================================================
    // Module Scope
    // ========================================================================

    fn global(&self, stmt: &Stmt) -> Result<Option<String>> {
        match stmt {
            Stmt::Struct(ty) => {
                if self.es3() && self.blocks.contains(ty) {
                    return Ok(None);
                }
                self.struct_def(ty).map(Some)
            }
            Stmt::Declare { var, .. } => {
                if !structs_declared(&var.ty, &self.structs) {
                    log::trace!("eliding '{}': struct not declared in this stage", var.name);
                    return Ok(None);
                }
                self.global_decl(var)
            }
            Stmt::Function(def) => self.function(def).map(Some),
            other => Err(ShaderError::internal(format!(
                "unexpected statement at module scope: {other:?}"
            ))),
        }
    }

    fn struct_def(&self, ty: &Type) -> Result<String> {
        let st = ty
            .as_struct()
            .ok_or_else(|| ShaderError::internal(format!("{ty} is not a struct")))?;
        let mut lines = Lines::default();
        lines.open(format!("struct {} {{", ty.struct_name().unwrap_or_default()));
        for member in &st.members {
            lines.line(format!("{};", self.decl(&member.ty, &member.name)?));
        }
        lines.close("};");
        Ok(lines.finish().trim_end().to_string())
    }

    fn interpolation(ty: &Type) -> &'static str {
        if ty.scalar_kind().is_some_and(|k| k.is_integer()) {
            "flat "
        } else {
            ""
        }
    }

    fn location(var: &Variable) -> Result<u32> {
        var.location
            .get()
            .ok_or_else(|| ShaderError::internal(format!("'{}' has no location", var.name)))
    }

    fn global_decl(&self, var: &Variable) -> Result<Option<String>> {
        let decl = self.decl(&var.ty, &var.name)?;
        let es3 = self.es3();
        let text = match (var.kind, self.ctx.stage) {
            (DeclKind::In, ShaderStage::Vertex) if es3 => {
                format!("layout(location = {}) in {decl};", Self::location(var)?)
            }
            (DeclKind::In, ShaderStage::Vertex) => format!("attribute {decl};"),
            (DeclKind::In, _) if es3 => format!("{}in {decl};", Self::interpolation(&var.ty)),
            (DeclKind::Out, ShaderStage::Vertex) if es3 => {
                format!("{}out {decl};", Self::interpolation(&var.ty))
            }
            (DeclKind::Out, ShaderStage::Vertex) | (DeclKind::In, _) => {
                format!("varying {decl};")
            }
            (DeclKind::Out, _) if es3 => {
                format!("layout(location = {}) out {decl};", Self::location(var)?)
            }
            // ES 1.00 writes gl_FragColor.
            (DeclKind::Out, _) => return Ok(None),
            (DeclKind::Uniform, _) => self.uniform_decl(var, &decl)?,
            (DeclKind::Storage | DeclKind::Workgroup, _) => {
                return Err(ShaderError::unsupported(
                    format!("{:?} variables", var.kind).to_lowercase(),
                    self.ctx.dialect,
                ));
            }
            (kind, _) => {
                return Err(ShaderError::internal(format!(
                    "{kind:?} variable '{}' at module scope",
                    var.name
                )));
            }
        };
        Ok(Some(text))
    }

    fn uniform_decl(&self, var: &Variable, decl: &str) -> Result<String> {
        if var.has_tag(BLOCK_TAG) {
            if !self.es3() {
                return Ok(format!("uniform {decl};"));
            }
            let st = var
                .ty
                .as_struct()
                .ok_or_else(|| ShaderError::internal("uniform block is not a struct"))?;
            let mut lines = Lines::default();
            lines.open(format!(
                "layout(std140) uniform {} {{",
                var.ty.struct_name().unwrap_or_default()
            ));
            for member in &st.members {
                lines.line(format!("{};", self.decl(&member.ty, &member.name)?));
            }
            lines.close(format!("}} {};", var.name));
            return Ok(lines.finish().trim_end().to_string());
        }
        if var.has_tag(DYNAMIC_TAG) {
            return Ok(format!(
                "layout(std140) uniform {}_block {{\n    {decl};\n}};",
                var.name
            ));
        }
        if var.ty.is_texture() {
            return Ok(if self.es3() {
                format!("uniform highp {decl};")
            } else {
                format!("uniform {decl};")
            });
        }
        Err(ShaderError::internal(format!(
            "uniform '{}' was not folded into a block",
            var.name
        )))
    }

    fn function(&self, def: &FunctionDef) -> Result<String> {
        let params = def
            .params
            .iter()
            .map(|p| {
                let decl = self.decl(&p.var.ty, &p.var.name)?;
                Ok(if p.by_ref { format!("inout {decl}") } else { decl })
            })
            .collect::<Result<Vec<_>>>()?;
        let mut lines = Lines::default();
        lines.open(format!(
            "{} {}({}) {{",
            def.ret.type_name(self.ctx.dialect)?,
            def.emitted_name,
            params.join(", ")
        ));
        self.block(&mut lines, &def.body)?;
        lines.close("}");
        Ok(lines.finish().trim_end().to_string())
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn block(&self, out: &mut Lines, stmts: &[Stmt]) -> Result<()> {
        for stmt in stmts {
            self.stmt(out, stmt)?;
        }
        Ok(())
    }

    fn stmt(&self, out: &mut Lines, stmt: &Stmt) -> Result<()> {
        let ctx = self.ctx;
        match stmt {
            Stmt::Assign { target, value } => {
                out.line(format!("{} = {};", ctx.expr(target)?, ctx.expr(value)?));
            }
            Stmt::Declare { var, init } => {
                let decl = self.decl(&var.ty, &var.name)?;
                match init {
                    Some(init) => out.line(format!("{decl} = {};", ctx.expr(init)?)),
                    None => out.line(format!("{decl};")),
                }
            }
            Stmt::Touch(value) => out.line(format!("{};", ctx.expr(value)?)),
            Stmt::Discard => out.line("discard;"),
            Stmt::Break => out.line("break;"),
            Stmt::Continue => out.line("continue;"),
            Stmt::Return(None) => out.line("return;"),
            Stmt::Return(Some(value)) => out.line(format!("return {};", ctx.expr(value)?)),
            Stmt::Block(body) => {
                out.open("{");
                self.block(out, body)?;
                out.close("}");
            }
            Stmt::If {
                branches,
                otherwise,
            } => {
                for (i, (cond, body)) in branches.iter().enumerate() {
                    let cond = paren(&ctx.expr(cond)?);
                    if i == 0 {
                        out.open(format!("if {cond} {{"));
                    } else {
                        out.close("}");
                        out.open(format!("else if {cond} {{"));
                    }
                    self.block(out, body)?;
                }
                if let Some(body) = otherwise {
                    out.close("}");
                    out.open("else {");
                    self.block(out, body)?;
                }
                out.close("}");
            }
            Stmt::Range {
                var,
                start,
                end,
                body,
            } => {
                out.open(format!(
                    "for ({} = {}; {} < {}; {}++) {{",
                    self.decl(&var.ty, &var.name)?,
                    ctx.expr(start)?,
                    var.name,
                    ctx.expr(end)?,
                    var.name
                ));
                self.block(out, body)?;
                out.close("}");
            }
            Stmt::While { cond, body } => {
                out.open(format!("while {} {{", paren(&ctx.expr(cond)?)));
                self.block(out, body)?;
                out.close("}");
            }
            Stmt::DoWhile { body, cond } => {
                out.open("do {");
                self.block(out, body)?;
                out.close(format!("}} while {};", paren(&ctx.expr(cond)?)));
            }
            Stmt::Function(_) | Stmt::Struct(_) => {
                return Err(ShaderError::internal(format!(
                    "module-scope statement inside a function body: {stmt:?}"
                )));
            }
        }
        Ok(())
    }
}
