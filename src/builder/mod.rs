//! Program Builder
//!
//! Entry point of the compiler. A [`ProgramBuilder`] runs build sessions:
//! each session hands a [`StageBuilder`] to one host closure per stage,
//! merges the uniforms the stages declared, and emits source for the target
//! dialect.
//!
//! # Usage
//!
//! ```rust,ignore
//! use myth_shader::prelude::*;
//!
//! let mut builder = ProgramBuilder::new();
//! let program = builder.build_render(
//!     &ProgramOptions::new(Dialect::GlslEs300),
//!     |vs| {
//!         let position = vs.input("position", Type::vec3f())?;
//!         let clip = vs.construct(Type::vec4f(), &[position, vs.lit(1.0)])?;
//!         vs.main(|b| {
//!             let out = b.builtin(BuiltinVar::Position)?;
//!             b.assign(&out, &clip)
//!         })
//!     },
//!     |fs| {
//!         let color = fs.output("color", Type::vec4f())?;
//!         fs.main(|b| {
//!             let white = b.construct(Type::vec4f(), &[b.lit(1.0)])?;
//!             b.assign(&color, &white)
//!         })
//!     },
//! )?;
//! ```
//!
//! # Session lifecycle
//!
//! `Idle -> Vertex -> Fragment -> Merging -> Emitting -> Idle` for render
//! builds and `Idle -> Compute -> Merging -> Emitting -> Idle` for compute
//! builds. A [`SessionGuard`] owns the session for the duration of a build
//! and resets every piece of session state when dropped, whether the build
//! succeeded, failed or panicked.

mod control;
mod expr;
mod stage;

use std::ops::{Deref, DerefMut};

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ast::Variable;
use crate::builtins::BuiltinRegistry;
use crate::dialect::{DeviceCaps, ShaderStage};
use crate::emit::{self, StageModule};
use crate::errors::{ErrorReport, Result, ShaderError};
use crate::program::{CompiledProgram, IndexFormat, ProgramOptions, StageSource, VertexAttributeSlot};
use crate::types::Type;
use crate::uniforms::UniformTable;

pub use stage::{FnParam, StageBuilder};

// ============================================================================
// Session
// ============================================================================

/// Phase of a build session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    #[default]
    Idle,
    Vertex,
    Fragment,
    Compute,
    Merging,
    Emitting,
}

/// State shared by the stages of one build.
#[derive(Debug, Default)]
pub(crate) struct Session {
    pub phase: Phase,
    pub uniforms: UniformTable,
    /// Struct name to type, across all stages.
    pub structs: FxHashMap<String, Type>,
    /// Vertex outputs in declaration order.
    pub varyings: Vec<Variable>,
    pub attributes: Vec<VertexAttributeSlot>,
    pub used_slots: FxHashSet<u32>,
}

/// Exclusive access to a session for the duration of one build.
///
/// Dropping the guard resets the session.
pub(crate) struct SessionGuard<'a> {
    session: &'a mut Session,
    completed: bool,
}

impl<'a> SessionGuard<'a> {
    fn begin(session: &'a mut Session) -> Result<Self> {
        if session.phase != Phase::Idle {
            return Err(ShaderError::InvalidState(format!(
                "a build session is already active ({:?})",
                session.phase
            )));
        }
        Ok(Self {
            session,
            completed: false,
        })
    }

    fn enter(&mut self, phase: Phase) {
        log::debug!("build phase {:?} -> {phase:?}", self.session.phase);
        self.session.phase = phase;
    }

    fn complete(&mut self) {
        self.completed = true;
    }
}

impl Deref for SessionGuard<'_> {
    type Target = Session;

    fn deref(&self) -> &Self::Target {
        self.session
    }
}

impl DerefMut for SessionGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            log::warn!(
                "build aborted during {:?}; discarding session state",
                self.session.phase
            );
        }
        *self.session = Session::default();
    }
}

// ============================================================================
// Program Builder
// ============================================================================

/// Compiles shader descriptions into programs.
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    registry: BuiltinRegistry,
    session: Session,
    last_error: Option<ErrorReport>,
}

impl ProgramBuilder {
    /// A builder with the standard builtin table.
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(BuiltinRegistry::standard())
    }

    /// A builder with a custom builtin table.
    #[must_use]
    pub fn with_registry(registry: BuiltinRegistry) -> Self {
        Self {
            registry,
            session: Session::default(),
            last_error: None,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &BuiltinRegistry {
        &self.registry
    }

    /// Report of the last failed build, cleared by a successful one.
    #[must_use]
    pub fn last_error(&self) -> Option<&ErrorReport> {
        self.last_error.as_ref()
    }

    /// Current session phase; `Idle` between builds.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.session.phase
    }

    /// Builds a vertex + fragment program.
    pub fn build_render<V, F>(
        &mut self,
        options: &ProgramOptions,
        vertex: V,
        fragment: F,
    ) -> Result<CompiledProgram>
    where
        V: FnOnce(&mut StageBuilder<'_>) -> Result<()>,
        F: FnOnce(&mut StageBuilder<'_>) -> Result<()>,
    {
        let result = self.run_render(options, vertex, fragment);
        self.record(result, options)
    }

    /// Builds a compute program. Only WGSL has compute shaders.
    pub fn build_compute<C>(&mut self, options: &ProgramOptions, compute: C) -> Result<CompiledProgram>
    where
        C: FnOnce(&mut StageBuilder<'_>) -> Result<()>,
    {
        let result = self.run_compute(options, compute);
        self.record(result, options)
    }

    fn record(
        &mut self,
        result: Result<CompiledProgram>,
        options: &ProgramOptions,
    ) -> Result<CompiledProgram> {
        match &result {
            Ok(program) => {
                log::debug!(
                    "built {} program{} ({} stage(s), {} bind group(s))",
                    options.dialect,
                    options
                        .label
                        .as_deref()
                        .map(|l| format!(" '{l}'"))
                        .unwrap_or_default(),
                    program.stages.len(),
                    program.bind_group_layouts.len()
                );
                self.last_error = None;
            }
            Err(err) => {
                self.last_error = Some(ErrorReport::new(err, options.dialect));
            }
        }
        result
    }

    fn run_render<V, F>(
        &mut self,
        options: &ProgramOptions,
        vertex: V,
        fragment: F,
    ) -> Result<CompiledProgram>
    where
        V: FnOnce(&mut StageBuilder<'_>) -> Result<()>,
        F: FnOnce(&mut StageBuilder<'_>) -> Result<()>,
    {
        let registry = &self.registry;
        let mut guard = SessionGuard::begin(&mut self.session)?;

        let emulate_depth_clamp = options.emulate_depth_clamp && options.dialect.is_wgsl();
        if emulate_depth_clamp && !options.caps.contains(DeviceCaps::FRAG_DEPTH) {
            return Err(ShaderError::unsupported(
                "depth clamp emulation without fragment depth writes",
                options.dialect,
            ));
        }

        guard.enter(Phase::Vertex);
        let mut vs = StageBuilder::new(&mut guard, registry, options, ShaderStage::Vertex);
        vertex(&mut vs)?;
        let mut vs = vs.finish()?;

        guard.enter(Phase::Fragment);
        let mut fs = StageBuilder::new(&mut guard, registry, options, ShaderStage::Fragment);
        fragment(&mut fs)?;
        let mut fs = fs.finish()?;

        if emulate_depth_clamp {
            let location = guard.varyings.len() as u32;
            vs.depth_clamp_location = Some(location);
            fs.depth_clamp_location = Some(location);
        }

        guard.enter(Phase::Merging);
        let mut modules = [vs, fs];
        let uniforms = std::mem::take(&mut guard.uniforms);
        let bind_group_layouts = uniforms.plan(&mut modules, options.label.as_deref())?;

        guard.enter(Phase::Emitting);
        let stages = emit_all(&modules, options)?;
        let vertex_attributes = std::mem::take(&mut guard.attributes);

        guard.complete();
        Ok(CompiledProgram {
            dialect: options.dialect,
            stages,
            bind_group_layouts,
            vertex_attributes,
            index_format: IndexFormat::for_caps(options.caps),
        })
    }

    fn run_compute<C>(&mut self, options: &ProgramOptions, compute: C) -> Result<CompiledProgram>
    where
        C: FnOnce(&mut StageBuilder<'_>) -> Result<()>,
    {
        let registry = &self.registry;
        let mut guard = SessionGuard::begin(&mut self.session)?;
        if !options.dialect.is_wgsl() {
            return Err(ShaderError::unsupported("compute shaders", options.dialect));
        }

        guard.enter(Phase::Compute);
        let mut cs = StageBuilder::new(&mut guard, registry, options, ShaderStage::Compute);
        compute(&mut cs)?;
        let cs = cs.finish()?;

        guard.enter(Phase::Merging);
        let mut modules = [cs];
        let uniforms = std::mem::take(&mut guard.uniforms);
        let bind_group_layouts = uniforms.plan(&mut modules, options.label.as_deref())?;

        guard.enter(Phase::Emitting);
        let stages = emit_all(&modules, options)?;

        guard.complete();
        Ok(CompiledProgram {
            dialect: options.dialect,
            stages,
            bind_group_layouts,
            vertex_attributes: Vec::new(),
            index_format: IndexFormat::for_caps(options.caps),
        })
    }
}

fn emit_all(modules: &[StageModule], options: &ProgramOptions) -> Result<Vec<StageSource>> {
    modules
        .iter()
        .map(|module| {
            let source = emit::emit_stage(module, options)?;
            log::debug!("emitted {} stage: {} bytes", module.stage.name(), source.len());
            Ok(StageSource {
                stage: module.stage,
                source,
            })
        })
        .collect()
}
