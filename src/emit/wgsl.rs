//! WGSL emitter.
//!
//! WGSL has no global stage inputs or outputs, so the user body is emitted
//! as `main_body()` reading and writing module-private variables, and a
//! synthesized entry point copies the entry structs in and out around it.
//! The entry point also remaps clip-space depth from `[-w, w]` to `[0, w]`
//! and, when enabled, emulates depth clamping through an extra varying.

use std::collections::BTreeSet;

use serde::Serialize;

use super::{
    Ctx, Lines, StageModule, negate, padded_element, structs_declared, templates,
};
use crate::ast::{BuiltinVar, DeclKind, FunctionDef, Literal, Stmt, Variable};
use crate::dialect::{Dialect, ShaderStage};
use crate::errors::{Result, ShaderError};
use crate::program::ProgramOptions;
use crate::types::{LayoutPolicy, ScalarKind, Type, TypeKind};

const DIALECT: Dialect = Dialect::Wgsl;

#[derive(Serialize)]
struct WgslModule<'a> {
    enable_f16: bool,
    items: Vec<String>,
    main: &'a str,
    entry: String,
}

pub(super) fn emit(module: &StageModule, options: &ProgramOptions) -> Result<String> {
    let padded = uniform_structs(module)?;
    let emitter = WgslEmitter {
        ctx: Ctx {
            dialect: DIALECT,
            stage: module.stage,
            padded: &padded,
        },
        structs: module.structs(),
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

    let entry = EntryPoint::new(module, options);
    items.extend(entry.builtin_holders()?);
    let entry = entry.render()?;

    templates::render(
        "module.wgsl",
        &WgslModule {
            enable_f16: module.uses_f16,
            items,
            main: main.trim_end(),
            entry,
        },
    )
}

fn type_name(ty: &Type) -> Result<String> {
    ty.type_name(DIALECT)
}

struct WgslEmitter<'a> {
    ctx: Ctx<'a>,
    structs: Vec<Type>,
}

impl WgslEmitter<'_> {
    // ========================================================================
    // Module Scope
    // ========================================================================

    fn global(&self, stmt: &Stmt) -> Result<Option<String>> {
        match stmt {
            Stmt::Struct(ty) if self.ctx.padded.contains(ty) => uniform_struct_def(ty).map(Some),
            Stmt::Struct(ty) => struct_def(ty).map(Some),
            Stmt::Declare { var, .. } => {
                if !structs_declared(&var.ty, &self.structs) {
                    log::trace!("eliding '{}': struct not declared in this stage", var.name);
                    return Ok(None);
                }
                global_decl(var).map(Some)
            }
            Stmt::Function(def) => self.function(def).map(Some),
            other => Err(ShaderError::internal(format!(
                "unexpected statement at module scope: {other:?}"
            ))),
        }
    }

    fn function(&self, def: &FunctionDef) -> Result<String> {
        let params = def
            .params
            .iter()
            .map(|p| p.var.ty.declare(DIALECT, &p.var.name))
            .collect::<Result<Vec<_>>>()?;
        let ret = if def.ret.is_void() {
            String::new()
        } else {
            format!(" -> {}", type_name(&def.ret)?)
        };
        let mut lines = Lines::default();
        lines.open(format!(
            "fn {}({}){ret} {{",
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
                let keyword = match (var.kind, init) {
                    (DeclKind::Let, Some(_)) => "let",
                    _ => "var",
                };
                let decl = var.ty.declare(DIALECT, &var.name)?;
                match init {
                    Some(init) => out.line(format!("{keyword} {decl} = {};", ctx.expr(init)?)),
                    None => out.line(format!("{keyword} {decl};")),
                }
            }
            Stmt::Touch(value) => {
                let text = ctx.expr(value)?;
                if value.ty.is_void() {
                    out.line(format!("{text};"));
                } else {
                    out.line(format!("_ = {text};"));
                }
            }
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
                    let cond = ctx.expr(cond)?;
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
                let one = match var.ty.scalar_kind() {
                    Some(ScalarKind::U32) => Literal::U32(1),
                    _ => Literal::I32(1),
                };
                let name = &var.name;
                out.open("{");
                out.line(format!(
                    "var {} = {};",
                    var.ty.declare(DIALECT, name)?,
                    ctx.expr(start)?
                ));
                out.open("loop {");
                out.line(format!(
                    "if {} {{ break; }}",
                    negate(&format!("{name} < {}", ctx.expr(end)?))
                ));
                self.block(out, body)?;
                out.open("continuing {");
                out.line(format!("{name} = {name} + {};", one.render(DIALECT)));
                out.close("}");
                out.close("}");
                out.close("}");
            }
            Stmt::While { cond, body } => {
                out.open("loop {");
                out.line(format!("if {} {{ break; }}", negate(&ctx.expr(cond)?)));
                self.block(out, body)?;
                out.close("}");
            }
            Stmt::DoWhile { body, cond } => {
                out.open("loop {");
                self.block(out, body)?;
                out.open("continuing {");
                out.line(format!("break if {};", negate(&ctx.expr(cond)?)));
                out.close("}");
                out.close("}");
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

fn struct_def(ty: &Type) -> Result<String> {
    let st = ty
        .as_struct()
        .ok_or_else(|| ShaderError::internal(format!("{ty} is not a struct")))?;
    let mut lines = Lines::default();
    lines.open(format!("struct {} {{", ty.struct_name().unwrap_or_default()));
    for member in &st.members {
        lines.line(format!("{},", member.ty.declare(DIALECT, &member.name)?));
    }
    lines.close("}");
    Ok(lines.finish().trim_end().to_string())
}

// ============================================================================
// Uniform Memory
// ============================================================================

/// Structs reachable from uniform buffers. They are declared with the
/// placement `LayoutPolicy::Std140` gives them, which is what the host
/// writes.
fn uniform_structs(module: &StageModule) -> Result<Vec<Type>> {
    let mut uniform: Vec<Type> = Vec::new();
    let mut storage: Vec<Type> = Vec::new();
    for stmt in &module.globals {
        let Stmt::Declare { var, .. } = stmt else {
            continue;
        };
        let found = match var.kind {
            DeclKind::Uniform if !var.ty.is_texture() && !var.ty.is_sampler() => {
                check_uniform_member(&var.ty)?;
                &mut uniform
            }
            DeclKind::Storage => &mut storage,
            _ => continue,
        };
        var.ty.visit_structs(&mut |ty| {
            if !found.contains(ty) {
                found.push(ty.clone());
            }
        });
    }
    if let Some(shared) = uniform.iter().find(|ty| storage.contains(ty)) {
        return Err(ShaderError::unsupported(
            format!("{shared} in both uniform and storage buffers"),
            DIALECT,
        ));
    }
    for ty in &uniform {
        if let Some(st) = ty.as_struct() {
            for member in &st.members {
                check_uniform_member(&member.ty)?;
            }
        }
    }
    Ok(uniform)
}

/// Rejects members whose natural WGSL placement cannot be brought to the
/// uniform buffer layout with member attributes alone.
fn check_uniform_member(ty: &Type) -> Result<()> {
    match ty.kind() {
        TypeKind::Primitive(p) if p.is_matrix() && p.rows == 2 => Err(ShaderError::unsupported(
            format!("{ty} in a uniform buffer (column stride differs)"),
            DIALECT,
        )),
        TypeKind::Array { size: None, .. } => {
            Err(ShaderError::unsupported("runtime-sized arrays in uniform buffers", DIALECT))
        }
        TypeKind::Array { element, .. } => {
            if padded_element(element).is_some() {
                return Ok(());
            }
            let std140 = ty.layout(LayoutPolicy::Std140)?;
            let natural = ty.layout(LayoutPolicy::Std430)?;
            if !element.is_struct() && std140 != natural {
                return Err(ShaderError::unsupported(
                    format!("{ty} in a uniform buffer (element stride differs)"),
                    DIALECT,
                ));
            }
            check_uniform_member(element)
        }
        _ => Ok(()),
    }
}

/// Type name in uniform memory, with narrow array elements widened.
fn uniform_type_name(ty: &Type) -> Result<String> {
    match ty.kind() {
        TypeKind::Array {
            element,
            size: Some(n),
        } => {
            let element = match padded_element(element) {
                Some(wide) => type_name(&wide)?,
                None => uniform_type_name(element)?,
            };
            Ok(format!("array<{element}, {n}>"))
        }
        TypeKind::Array { size: None, .. } => {
            Err(ShaderError::unsupported("runtime-sized arrays in uniform buffers", DIALECT))
        }
        _ => type_name(ty),
    }
}

/// Alignment and size a member gets in WGSL uniform memory without attributes.
fn natural_placement(ty: &Type) -> Result<(u32, u32)> {
    // Structs and arrays in uniform memory already carry uniform placement.
    let policy = if ty.is_struct() || ty.is_array() {
        LayoutPolicy::Std140
    } else {
        LayoutPolicy::Std430
    };
    let layout = ty.layout(policy)?;
    Ok((layout.align, layout.size))
}

/// Struct definition with `@align`/`@size` attributes that reproduce the
/// `Std140` placement of every member and of the struct itself.
fn uniform_struct_def(ty: &Type) -> Result<String> {
    let st = ty
        .as_struct()
        .ok_or_else(|| ShaderError::internal(format!("{ty} is not a struct")))?;
    let layout = ty.struct_layout(LayoutPolicy::Std140)?;

    let mut aligns = Vec::with_capacity(st.members.len());
    let mut sizes = Vec::with_capacity(st.members.len());
    let mut cursor = 0u32;
    let mut max_align = 1u32;
    for (member, placed) in st.members.iter().zip(&layout.members) {
        let (align, size) = natural_placement(&member.ty)?;
        let moved = cursor.div_ceil(align) * align != placed.offset;
        aligns.push(moved.then_some(placed.align));
        sizes.push((size != placed.size).then_some(placed.size));
        max_align = max_align.max(if moved { placed.align } else { align });
        cursor = placed.offset + placed.size;
    }
    // The first member sits at offset 0, so raising its alignment only
    // raises the struct's.
    if max_align < layout.align {
        if let Some(first) = aligns.first_mut() {
            *first = Some(layout.align);
        }
    }
    let attrs = aligns.iter().zip(&sizes).map(|(align, size)| {
        let mut attr = String::new();
        if let Some(align) = align {
            attr.push_str(&format!("@align({align}) "));
        }
        if let Some(size) = size {
            attr.push_str(&format!("@size({size}) "));
        }
        attr
    });

    let mut lines = Lines::default();
    lines.open(format!("struct {} {{", ty.struct_name().unwrap_or_default()));
    for (member, attr) in st.members.iter().zip(attrs) {
        lines.line(format!("{attr}{}: {},", member.name, uniform_type_name(&member.ty)?));
    }
    lines.close("}");
    Ok(lines.finish().trim_end().to_string())
}

fn binding_attrs(var: &Variable) -> Result<String> {
    match (var.group, var.binding.get()) {
        (Some(group), Some(binding)) => Ok(format!("@group({group}) @binding({binding})")),
        _ => Err(ShaderError::internal(format!(
            "binding '{}' was never assigned a slot",
            var.name
        ))),
    }
}

fn global_decl(var: &Variable) -> Result<String> {
    let decl = var.ty.declare(DIALECT, &var.name)?;
    Ok(match var.kind {
        DeclKind::In | DeclKind::Out => format!("var<private> {decl};"),
        DeclKind::Workgroup => format!("var<workgroup> {decl};"),
        DeclKind::Uniform if var.ty.is_texture() || var.ty.is_sampler() => {
            format!("{} var {decl};", binding_attrs(var)?)
        }
        DeclKind::Uniform => format!(
            "{} var<uniform> {}: {};",
            binding_attrs(var)?,
            var.name,
            uniform_type_name(&var.ty)?
        ),
        DeclKind::Storage => {
            let access = if var.is_writable() { "read_write" } else { "read" };
            format!("{} var<storage, {access}> {decl};", binding_attrs(var)?)
        }
        kind => {
            return Err(ShaderError::internal(format!(
                "{kind:?} variable '{}' at module scope",
                var.name
            )));
        }
    })
}

// ============================================================================
// Entry Point
// ============================================================================

/// A field of a synthesized entry struct.
struct Field {
    attrs: String,
    name: String,
    ty: String,
}

impl Field {
    fn located(var: &Variable, flat: bool) -> Result<Self> {
        let location = var
            .location
            .get()
            .ok_or_else(|| ShaderError::internal(format!("'{}' has no location", var.name)))?;
        let interpolate = flat && var.ty.scalar_kind().is_some_and(ScalarKind::is_integer);
        Ok(Self {
            attrs: if interpolate {
                format!("@location({location}) @interpolate(flat)")
            } else {
                format!("@location({location})")
            },
            name: var.name.clone(),
            ty: type_name(&var.ty)?,
        })
    }

    fn builtin(builtin: BuiltinVar) -> Result<Self> {
        Ok(Self {
            attrs: format!("@builtin({})", builtin.wgsl_name()),
            name: format!("builtin_{}", builtin.field_name()),
            ty: type_name(&builtin.ty(DIALECT)?)?,
        })
    }

    fn depth_clamp(location: u32) -> Self {
        Self {
            attrs: format!("@location({location})"),
            name: "depth_clamp_z".into(),
            ty: "f32".into(),
        }
    }
}

fn io_struct(name: &str, fields: &[Field]) -> String {
    let mut lines = Lines::default();
    lines.open(format!("struct {name} {{"));
    for f in fields {
        lines.line(format!("{} {}: {},", f.attrs, f.name, f.ty));
    }
    lines.close("}");
    lines.finish().trim_end().to_string()
}

/// Inputs, outputs and builtins of the synthesized entry point.
struct EntryPoint<'m> {
    module: &'m StageModule,
    workgroup_size: [u32; 3],
    inputs: Vec<&'m Variable>,
    outputs: Vec<&'m Variable>,
    builtin_inputs: Vec<BuiltinVar>,
    builtin_outputs: Vec<BuiltinVar>,
}

impl<'m> EntryPoint<'m> {
    fn new(module: &'m StageModule, options: &ProgramOptions) -> Self {
        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        for stmt in &module.globals {
            if let Stmt::Declare { var, .. } = stmt {
                match var.kind {
                    DeclKind::In => inputs.push(var),
                    DeclKind::Out => outputs.push(var),
                    _ => {}
                }
            }
        }

        let mut used: BTreeSet<BuiltinVar> = module
            .used_builtins()
            .into_iter()
            .filter(|b| b.stage() == module.stage)
            .collect();
        if module.stage == ShaderStage::Vertex {
            used.insert(BuiltinVar::Position);
        }
        let (builtin_outputs, builtin_inputs): (Vec<_>, Vec<_>) =
            used.into_iter().partition(|b| b.is_output());

        Self {
            module,
            workgroup_size: options.workgroup_size,
            inputs,
            outputs,
            builtin_inputs,
            builtin_outputs,
        }
    }

    fn depth_clamp(&self) -> Option<u32> {
        self.module.depth_clamp_location
    }

    /// `BuiltinInput`/`BuiltinOutput` structs and the private variables
    /// `main_body` reads and writes builtins through.
    fn builtin_holders(&self) -> Result<Vec<String>> {
        let mut items = Vec::new();
        for (struct_name, holder, builtins) in [
            ("BuiltinInput", "builtin_in", &self.builtin_inputs),
            ("BuiltinOutput", "builtin_out", &self.builtin_outputs),
        ] {
            if builtins.is_empty() {
                continue;
            }
            let mut lines = Lines::default();
            lines.open(format!("struct {struct_name} {{"));
            for b in builtins {
                lines.line(format!("{}: {},", b.field_name(), type_name(&b.ty(DIALECT)?)?));
            }
            lines.close("}");
            items.push(lines.finish().trim_end().to_string());
            items.push(format!("var<private> {holder}: {struct_name};"));
        }
        Ok(items)
    }

    fn input_fields(&self) -> Result<Vec<Field>> {
        let flat = self.module.stage == ShaderStage::Fragment;
        let mut fields = self
            .inputs
            .iter()
            .map(|v| Field::located(v, flat))
            .collect::<Result<Vec<_>>>()?;
        for &b in &self.builtin_inputs {
            fields.push(Field::builtin(b)?);
        }
        if self.module.stage == ShaderStage::Fragment
            && let Some(location) = self.depth_clamp()
        {
            fields.push(Field::depth_clamp(location));
        }
        Ok(fields)
    }

    fn output_fields(&self) -> Result<Vec<Field>> {
        let flat = self.module.stage == ShaderStage::Vertex;
        let mut fields = self
            .outputs
            .iter()
            .map(|v| Field::located(v, flat))
            .collect::<Result<Vec<_>>>()?;
        for &b in &self.builtin_outputs {
            fields.push(Field::builtin(b)?);
        }
        match (self.module.stage, self.depth_clamp()) {
            (ShaderStage::Vertex, Some(location)) => fields.push(Field::depth_clamp(location)),
            (ShaderStage::Fragment, Some(_))
                if !self.builtin_outputs.contains(&BuiltinVar::FragDepth) =>
            {
                fields.push(Field::builtin(BuiltinVar::FragDepth)?);
            }
            _ => {}
        }
        Ok(fields)
    }

    fn render(&self) -> Result<String> {
        let stage = self.module.stage;
        let (prefix, attribute) = match stage {
            ShaderStage::Vertex => ("Vertex", "@vertex".to_string()),
            ShaderStage::Fragment => ("Fragment", "@fragment".to_string()),
            ShaderStage::Compute => {
                let [x, y, z] = self.workgroup_size;
                ("Compute", format!("@compute @workgroup_size({x}, {y}, {z})"))
            }
        };
        let input_name = format!("{prefix}Input");
        let output_name = format!("{prefix}Output");
        let input_fields = self.input_fields()?;
        let output_fields = self.output_fields()?;

        let mut items = Vec::new();
        if !input_fields.is_empty() {
            items.push(io_struct(&input_name, &input_fields));
        }
        if !output_fields.is_empty() {
            items.push(io_struct(&output_name, &output_fields));
        }

        let params = if input_fields.is_empty() {
            String::new()
        } else {
            format!("input: {input_name}")
        };
        let ret = if output_fields.is_empty() {
            String::new()
        } else {
            format!(" -> {output_name}")
        };

        let mut body = Lines::default();
        body.line(attribute);
        body.open(format!("fn main({params}){ret} {{"));
        for var in &self.inputs {
            body.line(format!("{0} = input.{0};", var.name));
        }
        for b in &self.builtin_inputs {
            body.line(format!(
                "builtin_in.{0} = input.builtin_{0};",
                b.field_name()
            ));
        }
        body.line("main_body();");
        if !output_fields.is_empty() {
            body.line(format!("var output: {output_name};"));
            for var in &self.outputs {
                body.line(format!("output.{0} = {0};", var.name));
            }
            for b in &self.builtin_outputs {
                body.line(format!(
                    "output.builtin_{0} = builtin_out.{0};",
                    b.field_name()
                ));
            }
            self.depth_fixups(&mut body);
            body.line("return output;");
        }
        body.close("}");
        items.push(body.finish().trim_end().to_string());
        Ok(items.join("\n\n"))
    }

    fn depth_fixups(&self, body: &mut Lines) {
        match self.module.stage {
            ShaderStage::Vertex => {
                body.line(
                    "output.builtin_position.z = (output.builtin_position.z + output.builtin_position.w) * 0.5;",
                );
                if self.depth_clamp().is_some() {
                    body.line(
                        "output.depth_clamp_z = output.builtin_position.z / output.builtin_position.w;",
                    );
                    body.line(
                        "output.builtin_position.z = clamp(output.builtin_position.z, 0.0, output.builtin_position.w);",
                    );
                }
            }
            ShaderStage::Fragment => {
                if self.depth_clamp().is_some()
                    && !self.module.writes_builtin(BuiltinVar::FragDepth)
                {
                    body.line(
                        "output.builtin_frag_depth = clamp(input.depth_clamp_z, 0.0, 1.0);",
                    );
                }
            }
            ShaderStage::Compute => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;

    fn module(stage: ShaderStage, globals: Vec<Stmt>, main: Vec<Stmt>) -> StageModule {
        StageModule {
            stage,
            globals,
            main,
            builtins: Vec::new(),
            extensions: BTreeSet::new(),
            uses_f16: false,
            depth_clamp_location: None,
        }
    }

    fn pair() -> Type {
        Type::structure("Pair")
            .member("a", Type::f32())
            .member("b", Type::f32())
            .build()
    }

    fn global(name: &str, ty: Type, kind: DeclKind) -> Stmt {
        Stmt::Declare {
            var: Variable::with_details(name, ty, kind, Some(0), None),
            init: None,
        }
    }

    #[test]
    fn uniform_structs_take_buffer_placement() {
        assert_eq!(
            uniform_struct_def(&pair()).unwrap(),
            "struct Pair {\n    @align(16) a: f32,\n    b: f32,\n}"
        );

        let params = Type::structure("Params")
            .member("scale", Type::f32())
            .member("offsets", Type::array(Type::vec2f(), Some(2)))
            .member("pair", pair())
            .build();
        let def = uniform_struct_def(&params).unwrap();
        assert!(def.contains("    scale: f32,\n"));
        assert!(def.contains("    offsets: array<vec4<f32>, 2>,\n"));
        assert!(def.contains("    pair: Pair,\n"));
    }

    #[test]
    fn narrow_matrices_and_shared_structs_are_rejected() {
        let m = module(
            ShaderStage::Fragment,
            vec![global("basis", Type::matrix(ScalarKind::F32, 2, 2), DeclKind::Uniform)],
            Vec::new(),
        );
        assert!(uniform_structs(&m).is_err());

        let m = module(
            ShaderStage::Fragment,
            vec![
                global("pair", pair(), DeclKind::Uniform),
                global("pairs", Type::array(pair(), None), DeclKind::Storage),
            ],
            Vec::new(),
        );
        assert!(uniform_structs(&m).is_err());

        let m = module(ShaderStage::Fragment, vec![global("pair", pair(), DeclKind::Uniform)], Vec::new());
        assert_eq!(uniform_structs(&m).unwrap(), vec![pair()]);
    }

    #[test]
    fn unused_builtins_are_pruned() {
        let m = module(ShaderStage::Fragment, Vec::new(), Vec::new());
        let src = emit(&m, &ProgramOptions::new(Dialect::Wgsl)).unwrap();
        assert!(!src.contains("BuiltinInput"));
        assert!(!src.contains("front_facing"));
        assert!(src.contains("@fragment"));
    }

    #[test]
    fn vertex_entry_remaps_depth() {
        let uv = Variable::new("uv", Type::vec2f(), DeclKind::Out);
        uv.location.set(Some(0));
        let m = module(
            ShaderStage::Vertex,
            vec![Stmt::Declare {
                var: uv.clone(),
                init: None,
            }],
            vec![Stmt::Assign {
                target: Expr::var(&uv),
                value: Expr::var(&Variable::new("seed", Type::vec2f(), DeclKind::Local)),
            }],
        );
        let src = emit(&m, &ProgramOptions::new(Dialect::Wgsl)).unwrap();
        assert!(src.contains("var<private> uv: vec2<f32>;"));
        assert!(src.contains("@location(0) uv: vec2<f32>,"));
        assert!(src.contains("@builtin(position) builtin_position: vec4<f32>,"));
        assert!(src.contains("output.uv = uv;"));
        assert!(src.contains("* 0.5;"));
        assert!(src.contains("fn main_body() {"));
    }

    #[test]
    fn value_touches_bind_to_the_discard_target() {
        let x = Variable::new("x", Type::f32(), DeclKind::Local);
        let m = module(
            ShaderStage::Fragment,
            Vec::new(),
            vec![Stmt::Touch(Expr::var(&x))],
        );
        let src = emit(&m, &ProgramOptions::new(Dialect::Wgsl)).unwrap();
        assert!(src.contains("_ = x;"));
    }
}
