//! Variable handles and stage builtin variables.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::dialect::{Dialect, ShaderStage};
use crate::errors::{Result, ShaderError};
use crate::types::{ScalarKind, Type};

/// How a variable was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    /// Function-local mutable variable.
    Local,
    /// Function-local immutable binding.
    Let,
    /// Function parameter.
    Param,
    /// Stage input (vertex attribute, fragment varying).
    In,
    /// Stage output (vertex varying, fragment color target).
    Out,
    /// Compute workgroup-shared variable.
    Workgroup,
    /// Uniform buffer member, texture or sampler.
    Uniform,
    /// Storage buffer.
    Storage,
    /// Stage builtin.
    Builtin,
}

impl DeclKind {
    /// Whether declarations of this kind live at module scope.
    #[must_use]
    pub fn is_global(self) -> bool {
        !matches!(self, Self::Local | Self::Let | Self::Param)
    }
}

/// A stage-specific implicit input or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BuiltinVar {
    Position,
    VertexIndex,
    InstanceIndex,
    FragCoord,
    FrontFacing,
    FragDepth,
    GlobalInvocationId,
    LocalInvocationId,
    LocalInvocationIndex,
    WorkgroupId,
    NumWorkgroups,
}

impl BuiltinVar {
    /// Stage the builtin belongs to.
    #[must_use]
    pub fn stage(self) -> ShaderStage {
        match self {
            Self::Position | Self::VertexIndex | Self::InstanceIndex => ShaderStage::Vertex,
            Self::FragCoord | Self::FrontFacing | Self::FragDepth => ShaderStage::Fragment,
            _ => ShaderStage::Compute,
        }
    }

    /// Whether the shader writes this builtin.
    #[must_use]
    pub fn is_output(self) -> bool {
        matches!(self, Self::Position | Self::FragDepth)
    }

    /// WGSL builtin attribute name, also used as the synthesized field name.
    #[must_use]
    pub fn wgsl_name(self) -> &'static str {
        match self {
            Self::Position | Self::FragCoord => "position",
            Self::VertexIndex => "vertex_index",
            Self::InstanceIndex => "instance_index",
            Self::FrontFacing => "front_facing",
            Self::FragDepth => "frag_depth",
            Self::GlobalInvocationId => "global_invocation_id",
            Self::LocalInvocationId => "local_invocation_id",
            Self::LocalInvocationIndex => "local_invocation_index",
            Self::WorkgroupId => "workgroup_id",
            Self::NumWorkgroups => "num_workgroups",
        }
    }

    /// Field name inside the synthesized builtin structs.
    #[must_use]
    pub fn field_name(self) -> &'static str {
        match self {
            Self::FragCoord => "frag_coord",
            other => other.wgsl_name(),
        }
    }

    /// GLSL variable name; `None` where the dialect has no equivalent.
    #[must_use]
    pub fn glsl_name(self, dialect: Dialect) -> Option<&'static str> {
        let es3 = dialect == Dialect::GlslEs300;
        Some(match self {
            Self::Position => "gl_Position",
            Self::VertexIndex if es3 => "gl_VertexID",
            Self::InstanceIndex if es3 => "gl_InstanceID",
            Self::FragCoord => "gl_FragCoord",
            Self::FrontFacing => "gl_FrontFacing",
            Self::FragDepth if es3 => "gl_FragDepth",
            Self::FragDepth => "gl_FragDepthEXT",
            _ => return None,
        })
    }

    /// Type of the builtin in the given dialect.
    pub fn ty(self, dialect: Dialect) -> Result<Type> {
        if dialect.is_glsl() && self.glsl_name(dialect).is_none() {
            return Err(ShaderError::unsupported(
                format!("builtin {}", self.wgsl_name()),
                dialect,
            ));
        }
        let index = if dialect.is_wgsl() {
            ScalarKind::U32
        } else {
            ScalarKind::I32
        };
        Ok(match self {
            Self::Position | Self::FragCoord => Type::vec4f(),
            Self::VertexIndex | Self::InstanceIndex | Self::LocalInvocationIndex => {
                Type::scalar(index)
            }
            Self::FrontFacing => Type::bool(),
            Self::FragDepth => Type::f32(),
            Self::GlobalInvocationId
            | Self::LocalInvocationId
            | Self::WorkgroupId
            | Self::NumWorkgroups => Type::vector(ScalarKind::U32, 3),
        })
    }
}

/// Data behind a [`Variable`] handle.
pub struct VariableData {
    pub name: String,
    pub ty: Type,
    pub kind: DeclKind,
    pub group: Option<u32>,
    pub binding: Cell<Option<u32>>,
    pub location: Cell<Option<u32>>,
    pub builtin: Option<BuiltinVar>,
    pub tags: SmallVec<[String; 2]>,
    access_path: RefCell<Option<String>>,
    writable: Cell<bool>,
}

/// Shared handle to a declared variable. Identity is pointer identity.
#[derive(Clone)]
pub struct Variable(Rc<VariableData>);

impl Variable {
    #[must_use]
    pub fn new(name: impl Into<String>, ty: Type, kind: DeclKind) -> Self {
        Self::with_details(name, ty, kind, None, None)
    }

    #[must_use]
    pub fn with_details(
        name: impl Into<String>,
        ty: Type,
        kind: DeclKind,
        group: Option<u32>,
        builtin: Option<BuiltinVar>,
    ) -> Self {
        Self(Rc::new(VariableData {
            name: name.into(),
            ty,
            kind,
            group,
            binding: Cell::new(None),
            location: Cell::new(None),
            builtin,
            tags: SmallVec::new(),
            access_path: RefCell::new(None),
            writable: Cell::new(false),
        }))
    }

    /// Adds a reflection tag. Only meaningful before the handle is shared.
    #[must_use]
    pub fn tagged(mut self, tags: &[&str]) -> Self {
        if let Some(data) = Rc::get_mut(&mut self.0) {
            data.tags.extend(tags.iter().map(|t| (*t).to_string()));
        }
        self
    }

    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Overrides the emitted reference text (set when a uniform is folded
    /// into a generated block).
    pub fn set_access_path(&self, path: impl Into<String>) {
        *self.access_path.borrow_mut() = Some(path.into());
    }

    #[must_use]
    pub fn access_path(&self) -> Option<String> {
        self.access_path.borrow().clone()
    }

    pub fn mark_writable(&self) {
        self.writable.set(true);
    }

    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.writable.get()
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

impl Deref for Variable {
    type Target = VariableData;

    fn deref(&self) -> &VariableData {
        &self.0
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variable")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("kind", &self.kind)
            .field("group", &self.group)
            .field("binding", &self.binding.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_index_type_follows_dialect() {
        assert_eq!(BuiltinVar::VertexIndex.ty(Dialect::Wgsl).unwrap(), Type::u32());
        assert_eq!(BuiltinVar::VertexIndex.ty(Dialect::GlslEs300).unwrap(), Type::i32());
        assert!(BuiltinVar::VertexIndex.ty(Dialect::GlslEs100).is_err());
    }

    #[test]
    fn handles_compare_by_identity() {
        let a = Variable::new("x", Type::f32(), DeclKind::Local);
        let b = Variable::new("x", Type::f32(), DeclKind::Local);
        assert!(a.ptr_eq(&a.clone()));
        assert!(!a.ptr_eq(&b));
    }
}
