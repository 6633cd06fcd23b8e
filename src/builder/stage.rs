//! Stage builder: declarations, functions and stage finalization.

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::Session;
use crate::ast::{
    Block, BuiltinVar, Callee, DeclKind, Expr, ExprKind, FunctionDef, Param, Stmt, Variable,
};
use crate::builtins::{BuiltinRegistry, match_arg};
use crate::dialect::{DeviceCaps, Dialect, ShaderStage};
use crate::emit::StageModule;
use crate::errors::{Result, ShaderError};
use crate::program::{ProgramOptions, VertexAttributeSlot, vertex_format};
use crate::scope::{ScopeKind, ScopeStack};
use crate::types::{
    AddressSpace, SamplerKind, ScalarKind, StorageAccess, StorageFormat, TextureClass, TextureDim,
    TextureType, Type,
};
use crate::uniforms::{DYNAMIC_TAG, UniformPayload};

/// Names the entry point synthesis reserves.
const RESERVED_FUNCTIONS: [&str; 2] = ["main", "main_body"];

/// A parameter of a user function.
#[derive(Debug, Clone)]
pub struct FnParam {
    pub name: String,
    pub ty: Type,
    pub by_ref: bool,
}

impl FnParam {
    /// Parameter passed by value.
    #[must_use]
    pub fn value(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            by_ref: false,
        }
    }

    /// Parameter passed by reference; the callee may write through it.
    #[must_use]
    pub fn reference(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            by_ref: true,
        }
    }
}

/// Explicit DSL context for building one shader stage.
///
/// Declarations (`input`, `uniform`, `define_function`, ...) may be issued at
/// any time and always land in the module scope. Statements and calls are
/// only valid inside a function body opened by [`StageBuilder::main`] or
/// [`StageBuilder::define_function`].
pub struct StageBuilder<'a> {
    pub(super) session: &'a mut Session,
    pub(super) registry: &'a BuiltinRegistry,
    pub(super) options: &'a ProgramOptions,
    pub(super) stage: ShaderStage,
    pub(super) scopes: ScopeStack,
    functions: FxHashMap<String, Vec<Rc<FunctionDef>>>,
    main: Option<Block>,
    builtins: BTreeMap<BuiltinVar, Variable>,
    extensions: BTreeSet<&'static str>,
    structs: Vec<Type>,
    fragment_outputs: u32,
    uses_f16: bool,
}

impl<'a> StageBuilder<'a> {
    pub(crate) fn new(
        session: &'a mut Session,
        registry: &'a BuiltinRegistry,
        options: &'a ProgramOptions,
        stage: ShaderStage,
    ) -> Self {
        Self {
            session,
            registry,
            options,
            stage,
            scopes: ScopeStack::new(),
            functions: FxHashMap::default(),
            main: None,
            builtins: BTreeMap::new(),
            extensions: BTreeSet::new(),
            structs: Vec::new(),
            fragment_outputs: 0,
            uses_f16: false,
        }
    }

    /// Closes the stage and hands its module to the session.
    pub(crate) fn finish(self) -> Result<StageModule> {
        let main = self.main.ok_or_else(|| {
            ShaderError::InvalidState(format!("{} stage has no main function", self.stage.name()))
        })?;
        let globals = self.scopes.into_global()?;
        log::debug!(
            "{} stage: {} global item(s), {} main statement(s)",
            self.stage.name(),
            globals.len(),
            main.len()
        );
        Ok(StageModule {
            stage: self.stage,
            globals,
            main,
            builtins: self.builtins.into_values().collect(),
            extensions: self.extensions,
            uses_f16: self.uses_f16,
            depth_clamp_location: None,
        })
    }

    // ========================================================================
    // Context
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.options.dialect
    }

    #[inline]
    #[must_use]
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    #[inline]
    #[must_use]
    pub fn caps(&self) -> DeviceCaps {
        self.options.caps
    }

    /// Requests a GLSL extension directive.
    pub fn add_extension(&mut self, extension: &'static str) {
        if self.extensions.insert(extension) {
            log::trace!("{} stage enables {extension}", self.stage.name());
        }
    }

    /// Fails with `Unsupported` unless the device reports `cap`.
    pub fn require_cap(&self, cap: DeviceCaps, feature: &str) -> Result<()> {
        if self.options.caps.contains(cap) {
            Ok(())
        } else {
            Err(ShaderError::unsupported(feature, self.dialect()))
        }
    }

    fn require_dialect(&self, wgsl_only: bool, feature: &str) -> Result<()> {
        if wgsl_only && !self.dialect().is_wgsl() {
            return Err(ShaderError::unsupported(feature, self.dialect()));
        }
        Ok(())
    }

    /// Registers every struct reachable from `ty` with the stage and the
    /// program, and validates the type name for the dialect.
    pub(crate) fn use_type(&mut self, ty: &Type) -> Result<()> {
        if self.dialect().is_wgsl() && ty.contains_scalar(ScalarKind::F16) {
            self.uses_f16 = true;
        }
        let mut found = Vec::new();
        ty.visit_structs(&mut |s| found.push(s.clone()));
        for s in found {
            let name = s.struct_name().unwrap_or_default();
            match self.session.structs.get(&name) {
                Some(existing) if existing.id() != s.id() => {
                    return Err(ShaderError::Redeclared(format!(
                        "struct {name} ({} vs {})",
                        existing.key(),
                        s.key()
                    )));
                }
                Some(_) => {}
                None => {
                    self.session.structs.insert(name.clone(), s.clone());
                }
            }
            if !self.structs.iter().any(|t| *t == s) {
                if let Some(st) = s.as_struct() {
                    for m in &st.members {
                        m.ty.type_name(self.dialect())?;
                    }
                }
                self.structs.push(s.clone());
                self.scopes.push_global_stmt(Stmt::Struct(s))?;
            }
        }
        if !ty.is_struct() && ty.as_function().is_none() {
            ty.type_name(self.dialect())?;
        }
        Ok(())
    }

    fn declare_global_var(&mut self, var: &Variable) -> Result<()> {
        self.use_type(&var.ty)?;
        self.scopes.declare_global(var)?;
        self.scopes.push_global_stmt(Stmt::Declare {
            var: var.clone(),
            init: None,
        })
    }

    /// Looks up a declared variable by name.
    pub fn lookup(&self, name: &str) -> Result<Expr> {
        self.scopes
            .lookup(name)
            .map(|v| Expr::var(&v))
            .ok_or_else(|| ShaderError::Ast {
                message: "undeclared variable".into(),
                expr: name.to_string(),
            })
    }

    // ========================================================================
    // Stage Interface
    // ========================================================================

    fn check_interface_type(&self, name: &str, ty: &Type) -> Result<()> {
        let prim = ty.as_primitive().filter(|p| !p.is_matrix()).ok_or_else(|| {
            ShaderError::ParamType {
                function: name.to_string(),
                index: 0,
                message: format!("{ty} cannot cross a stage interface"),
            }
        })?;
        if prim.scalar == ScalarKind::Bool {
            return Err(ShaderError::unsupported("boolean stage interface variables", self.dialect()));
        }
        if prim.scalar.is_integer() && self.dialect() == Dialect::GlslEs100 {
            return Err(ShaderError::unsupported("integer stage interface variables", self.dialect()));
        }
        Ok(())
    }

    /// Declares a stage input: a vertex attribute in the vertex stage, a
    /// varying (matched by name) in the fragment stage.
    pub fn input(&mut self, name: &str, ty: Type) -> Result<Expr> {
        match self.stage {
            ShaderStage::Vertex => self.attribute(name, ty),
            ShaderStage::Fragment => self.varying_in(name, &ty),
            ShaderStage::Compute => Err(ShaderError::InvalidState(
                "compute stages have no inputs besides builtins".into(),
            )),
        }
    }

    /// Declares a vertex attribute.
    ///
    /// The location comes from [`ProgramOptions::attribute_slots`] when the
    /// backend provides one for `name`, otherwise the next free slot.
    pub fn attribute(&mut self, name: &str, ty: Type) -> Result<Expr> {
        if self.stage != ShaderStage::Vertex {
            return Err(ShaderError::InvalidState(format!(
                "attribute '{name}' declared in the {} stage",
                self.stage.name()
            )));
        }
        self.check_interface_type(name, &ty)?;

        let location = match self.options.attribute_slots.get(name) {
            Some(&slot) => slot,
            None => {
                let mut slot = 0;
                while self.session.used_slots.contains(&slot) {
                    slot += 1;
                }
                if !self.options.attribute_slots.is_empty() {
                    log::warn!("attribute '{name}' has no backend slot; using slot {slot}");
                }
                slot
            }
        };
        if !self.session.used_slots.insert(location) {
            return Err(ShaderError::InvalidState(format!(
                "attribute slot {location} is used twice ('{name}')"
            )));
        }

        let format = vertex_format(&ty).ok_or_else(|| ShaderError::ParamType {
            function: name.to_string(),
            index: 0,
            message: format!("{ty} is not a vertex format"),
        })?;
        let shader_ty = ty
            .as_primitive()
            .map(|p| Type::primitive(p.with_scalar(p.scalar.shader_kind())))
            .unwrap_or(ty.clone());
        let var = Variable::new(name, shader_ty, DeclKind::In);
        var.location.set(Some(location));
        self.declare_global_var(&var)?;
        self.session.attributes.push(VertexAttributeSlot {
            name: name.to_string(),
            location,
            format,
            ty,
        });
        Ok(Expr::var(&var))
    }

    fn varying_in(&mut self, name: &str, ty: &Type) -> Result<Expr> {
        let source = self
            .session
            .varyings
            .iter()
            .find(|v| v.name == name)
            .cloned()
            .ok_or_else(|| {
                ShaderError::InvalidState(format!(
                    "fragment input '{name}' has no matching vertex output"
                ))
            })?;
        if source.ty != *ty {
            return Err(ShaderError::type_cast(&source.ty, ty));
        }
        let var = Variable::new(name, ty.clone(), DeclKind::In);
        var.location.set(source.location.get());
        self.declare_global_var(&var)?;
        Ok(Expr::var(&var))
    }

    /// Declares a stage output: a varying in the vertex stage, a color
    /// target in the fragment stage.
    pub fn output(&mut self, name: &str, ty: Type) -> Result<Expr> {
        let location = match self.stage {
            ShaderStage::Vertex => {
                self.check_interface_type(name, &ty)?;
                if self.session.varyings.iter().any(|v| v.name == name) {
                    return Err(ShaderError::Redeclared(name.to_string()));
                }
                self.session.varyings.len() as u32
            }
            ShaderStage::Fragment => {
                if self.dialect() == Dialect::GlslEs100 {
                    if self.fragment_outputs > 0 {
                        return Err(ShaderError::unsupported(
                            "multiple fragment outputs",
                            self.dialect(),
                        ));
                    }
                    if ty != Type::vec4f() {
                        return Err(ShaderError::type_cast(Type::vec4f(), &ty));
                    }
                }
                self.check_interface_type(name, &ty)?;
                self.fragment_outputs
            }
            ShaderStage::Compute => {
                return Err(ShaderError::InvalidState(
                    "compute stages have no outputs; use storage buffers".into(),
                ));
            }
        };

        let var = Variable::new(name, ty, DeclKind::Out);
        var.location.set(Some(location));
        self.declare_global_var(&var)?;
        match self.stage {
            ShaderStage::Vertex => self.session.varyings.push(var.clone()),
            _ => self.fragment_outputs += 1,
        }
        Ok(Expr::var(&var))
    }

    /// Reference to a stage builtin variable.
    pub fn builtin(&mut self, builtin: BuiltinVar) -> Result<Expr> {
        if let Some(var) = self.builtins.get(&builtin) {
            return Ok(Expr::var(var));
        }
        if builtin.stage() != self.stage {
            return Err(ShaderError::InvalidState(format!(
                "builtin {} is not available in the {} stage",
                builtin.wgsl_name(),
                self.stage.name()
            )));
        }
        if builtin == BuiltinVar::FragDepth && self.dialect() == Dialect::GlslEs100 {
            self.require_cap(DeviceCaps::FRAG_DEPTH, "fragment depth writes")?;
            self.add_extension("GL_EXT_frag_depth");
        }
        let ty = builtin.ty(self.dialect())?;
        let var = Variable::with_details(
            builtin.field_name(),
            ty,
            DeclKind::Builtin,
            None,
            Some(builtin),
        );
        self.builtins.insert(builtin, var.clone());
        Ok(Expr::var(&var))
    }

    // ========================================================================
    // Resource Bindings
    // ========================================================================

    fn declare_binding(
        &mut self,
        name: &str,
        ty: Type,
        kind: DeclKind,
        group: u32,
        payload: UniformPayload,
        tags: &[&str],
    ) -> Result<Variable> {
        let var = Variable::with_details(name, ty, kind, Some(group), None).tagged(tags);
        self.declare_global_var(&var)?;
        self.session
            .uniforms
            .register(name, group, self.stage, payload, &var)?;
        Ok(var)
    }

    /// Declares a uniform in bind group `group`. Plain values are folded into
    /// the group's generated uniform block; textures and samplers get their
    /// own binding.
    pub fn uniform(&mut self, name: &str, ty: Type, group: u32) -> Result<Expr> {
        if let Some(texture) = ty.as_texture() {
            return self.texture(name, texture, group);
        }
        if let crate::types::TypeKind::Sampler(kind) = ty.kind() {
            return self.sampler(name, *kind, group);
        }
        if !ty.is_host_shareable() || ty.is_runtime_array() || ty.is_atomic() {
            return Err(ShaderError::ParamType {
                function: name.to_string(),
                index: 0,
                message: format!("{ty} cannot be stored in a uniform buffer"),
            });
        }
        let payload = UniformPayload::Value {
            ty: ty.clone(),
            dynamic: false,
        };
        let var = self.declare_binding(name, ty, DeclKind::Uniform, group, payload, &[])?;
        Ok(Expr::var(&var))
    }

    /// Declares a uniform bound with a dynamic offset. It is never folded.
    pub fn uniform_dynamic(&mut self, name: &str, ty: Type, group: u32) -> Result<Expr> {
        if self.dialect() == Dialect::GlslEs100 {
            return Err(ShaderError::unsupported("uniform buffers", self.dialect()));
        }
        self.require_cap(DeviceCaps::DYNAMIC_OFFSET_BUFFER, "dynamic offset uniform buffers")?;
        if !ty.is_host_shareable() || ty.is_runtime_array() || ty.is_atomic() {
            return Err(ShaderError::ParamType {
                function: name.to_string(),
                index: 0,
                message: format!("{ty} cannot be stored in a uniform buffer"),
            });
        }
        let payload = UniformPayload::Value {
            ty: ty.clone(),
            dynamic: true,
        };
        let var = self.declare_binding(name, ty, DeclKind::Uniform, group, payload, &[DYNAMIC_TAG])?;
        Ok(Expr::var(&var))
    }

    /// Declares a storage buffer. Its access mode becomes `read_write` if
    /// any stage writes it.
    pub fn storage(&mut self, name: &str, ty: Type, group: u32) -> Result<Expr> {
        self.require_dialect(true, "storage buffers")?;
        if !ty.is_host_shareable() {
            return Err(ShaderError::ParamType {
                function: name.to_string(),
                index: 0,
                message: format!("{ty} cannot be stored in a storage buffer"),
            });
        }
        let payload = UniformPayload::Storage { ty: ty.clone() };
        let var = self.declare_binding(name, ty, DeclKind::Storage, group, payload, &[])?;
        Ok(Expr::var(&var))
    }

    /// Declares a texture binding.
    pub fn texture(&mut self, name: &str, texture: TextureType, group: u32) -> Result<Expr> {
        if texture.is_external() && self.dialect().is_glsl() {
            self.add_extension(if self.dialect() == Dialect::GlslEs300 {
                "GL_OES_EGL_image_external_essl3"
            } else {
                "GL_OES_EGL_image_external"
            });
        }
        let ty = Type::texture(texture);
        let payload = UniformPayload::Texture(texture);
        let var = self.declare_binding(name, ty, DeclKind::Uniform, group, payload, &[])?;
        Ok(Expr::var(&var))
    }

    /// Declares a storage texture binding.
    pub fn storage_texture(
        &mut self,
        name: &str,
        dim: TextureDim,
        format: StorageFormat,
        access: StorageAccess,
        group: u32,
    ) -> Result<Expr> {
        let texture = TextureType {
            dim,
            arrayed: false,
            class: TextureClass::Storage { format, access },
        };
        self.texture(name, texture, group)
    }

    /// Declares a sampler binding. Only WGSL separates samplers from textures.
    pub fn sampler(&mut self, name: &str, kind: SamplerKind, group: u32) -> Result<Expr> {
        let var = self.declare_sampler(name, kind, group)?;
        Ok(Expr::var(&var))
    }

    fn declare_sampler(&mut self, name: &str, kind: SamplerKind, group: u32) -> Result<Variable> {
        self.require_dialect(true, "separate samplers")?;
        let payload = UniformPayload::Sampler(kind);
        self.declare_binding(name, Type::sampler(kind), DeclKind::Uniform, group, payload, &[])
    }

    /// The sampler of `kind` paired with `texture`, declared on first use.
    pub(crate) fn implicit_sampler(
        &mut self,
        texture: &Variable,
        kind: SamplerKind,
    ) -> Result<Variable> {
        let name = match kind {
            SamplerKind::Sample => format!("{}_sampler", texture.name),
            SamplerKind::Comparison => format!("{}_comparison_sampler", texture.name),
        };
        if let Some(existing) = self.scopes.lookup(&name)
            && existing.ty == Type::sampler(kind)
        {
            return Ok(existing);
        }
        let group = texture.group.unwrap_or(0);
        log::trace!("declaring implicit {kind:?} sampler '{name}' in group {group}");
        self.declare_sampler(&name, kind, group)
    }

    /// Declares a workgroup-shared variable.
    pub fn workgroup(&mut self, name: &str, ty: Type) -> Result<Expr> {
        if self.stage != ShaderStage::Compute {
            return Err(ShaderError::InvalidState(format!(
                "workgroup variable '{name}' declared in the {} stage",
                self.stage.name()
            )));
        }
        if !ty.is_storable() {
            return Err(ShaderError::type_cast("a storable type", &ty));
        }
        let var = Variable::new(name, ty, DeclKind::Workgroup);
        self.declare_global_var(&var)?;
        Ok(Expr::var(&var))
    }

    /// Declares a struct type in this stage.
    pub fn define_struct(&mut self, ty: &Type) -> Result<()> {
        if !ty.is_struct() {
            return Err(ShaderError::type_cast("a struct", ty));
        }
        self.use_type(ty)
    }

    // ========================================================================
    // Functions
    // ========================================================================

    /// Defines the stage entry body.
    pub fn main(&mut self, body: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
        if !self.scopes.is_global() {
            return Err(ShaderError::InvalidState(
                "main must be defined at global scope".into(),
            ));
        }
        if self.main.is_some() {
            return Err(ShaderError::Redeclared("main".into()));
        }
        self.scopes.push(ScopeKind::Function);
        if let Some(scope) = self.scopes.function_scope_mut() {
            scope.ret = Some(Type::void());
        }
        body(self)?;
        let scope = self.scopes.pop()?;
        self.main = Some(scope.stmts);
        Ok(())
    }

    /// Defines a user function.
    ///
    /// `ret` of `None` infers the return type from the first `return_`.
    /// Overloads are distinguished by arity; later overloads are emitted as
    /// `{name}_{arity}`.
    pub fn define_function(
        &mut self,
        name: &str,
        ret: Option<Type>,
        params: &[FnParam],
        body: impl FnOnce(&mut Self, &[Expr]) -> Result<()>,
    ) -> Result<()> {
        if !self.scopes.is_global() {
            return Err(ShaderError::InvalidState(format!(
                "function '{name}' must be defined at global scope"
            )));
        }
        if RESERVED_FUNCTIONS.contains(&name) || self.registry.contains(name) {
            return Err(ShaderError::Redeclared(name.to_string()));
        }
        let overloads = self.functions.get(name).map_or(0, Vec::len);
        if self
            .functions
            .get(name)
            .is_some_and(|defs| defs.iter().any(|d| d.params.len() == params.len()))
        {
            return Err(ShaderError::Redeclared(format!("{name}/{}", params.len())));
        }
        let emitted_name = if overloads == 0 {
            name.to_string()
        } else {
            format!("{name}_{}", params.len())
        };
        // An overload's generated name and a plain user name share one namespace.
        if self
            .functions
            .values()
            .flatten()
            .any(|d| d.emitted_name == emitted_name)
        {
            return Err(ShaderError::Redeclared(emitted_name));
        }

        if let Some(ret) = &ret {
            self.use_type(ret)?;
        }
        self.scopes.push(ScopeKind::Function);
        if let Some(scope) = self.scopes.function_scope_mut() {
            scope.ret.clone_from(&ret);
        }

        let wgsl = self.dialect().is_wgsl();
        let mut defs = Vec::with_capacity(params.len());
        let mut args = Vec::with_capacity(params.len());
        for p in params {
            self.use_type(&p.ty)?;
            let var_ty = if p.by_ref && wgsl {
                Type::pointer(p.ty.clone(), AddressSpace::Function)
            } else {
                p.ty.clone()
            };
            let var = Variable::new(&p.name, var_ty, DeclKind::Param);
            self.scopes.declare(&var)?;
            let arg = match (p.by_ref, wgsl) {
                (true, true) => Expr::new(
                    ExprKind::Deref(Expr::var(&var)),
                    p.ty.clone(),
                    false,
                    true,
                ),
                (true, false) => Expr::new(ExprKind::Var(var.clone()), p.ty.clone(), false, true),
                _ => Expr::var(&var),
            };
            args.push(arg);
            defs.push(Param {
                var,
                by_ref: p.by_ref,
            });
        }

        body(self, &args)?;
        let scope = self.scopes.pop()?;
        let ret = scope.ret.unwrap_or_else(Type::void);
        self.use_type(&ret)?;

        log::trace!("defined function {emitted_name} -> {ret}");
        let def = Rc::new(FunctionDef {
            name: name.to_string(),
            emitted_name,
            ret,
            params: defs,
            body: scope.stmts,
        });
        self.scopes.push_global_stmt(Stmt::Function(def.clone()))?;
        self.functions.entry(name.to_string()).or_default().push(def);
        Ok(())
    }

    /// Calls a user function defined earlier in this stage.
    ///
    /// Calls returning `void` are also emitted as statements.
    pub fn call_function(&mut self, name: &str, args: &[Expr]) -> Result<Expr> {
        if self.scopes.is_global() {
            return Err(ShaderError::NonScopedCall(name.to_string()));
        }
        let overloads = self
            .functions
            .get(name)
            .ok_or_else(|| ShaderError::UndeclaredFunction(name.to_string()))?;
        let def = overloads
            .iter()
            .find(|d| d.params.len() == args.len())
            .cloned()
            .ok_or_else(|| ShaderError::ParamCount {
                function: name.to_string(),
                expected: overloads[0].params.len(),
                found: args.len(),
            })?;

        let wgsl = self.dialect().is_wgsl();
        let mut call_args = Vec::with_capacity(args.len());
        for (index, (arg, param)) in args.iter().zip(&def.params).enumerate() {
            let value_ty = param.var.ty.pointee().unwrap_or_else(|| param.var.ty.clone());
            if !param.by_ref {
                let (_, adapted) =
                    match_arg(arg, &value_ty).ok_or_else(|| ShaderError::ParamType {
                        function: name.to_string(),
                        index,
                        message: format!("expected {value_ty}, found {}", arg.ty),
                    })?;
                call_args.push(adapted);
                continue;
            }

            let root = arg.root_variable();
            if let Some(root) = &root
                && root.kind == DeclKind::Uniform
            {
                return Err(ShaderError::UniformNotWritable(root.name.clone()));
            }
            if !arg.is_reference {
                return Err(ShaderError::ReferenceRequired(format!(
                    "argument {index} of '{name}' is passed by reference"
                )));
            }
            if arg.ty != value_ty {
                return Err(ShaderError::ParamType {
                    function: name.to_string(),
                    index,
                    message: format!("expected {value_ty}, found {}", arg.ty),
                });
            }
            arg.mark_writable();
            if wgsl {
                let function_local = root.as_ref().is_some_and(|r| {
                    r.kind == DeclKind::Local || (r.kind == DeclKind::Param && r.ty.is_pointer())
                });
                if !function_local {
                    return Err(ShaderError::ParamType {
                        function: name.to_string(),
                        index,
                        message: "by-reference arguments must be function-local variables".into(),
                    });
                }
                call_args.push(Expr::new(
                    ExprKind::AddressOf(arg.clone()),
                    Type::pointer(value_ty, AddressSpace::Function),
                    false,
                    false,
                ));
            } else {
                call_args.push(arg.clone());
            }
        }

        let call = Expr::new(
            ExprKind::Call {
                callee: Callee::User(def.emitted_name.clone()),
                args: call_args,
            },
            def.ret.clone(),
            false,
            false,
        );
        if def.ret.is_void() {
            self.scopes.push_stmt(Stmt::Touch(call.clone()))?;
        }
        Ok(call)
    }
}
