//! Type System
//!
//! Immutable, interned descriptors for every type a shader can mention.
//!
//! # Identity
//!
//! Each [`Type`] computes a structural key once when it is built and interns
//! it (see [`crate::utils::interner`]). Two independently constructed types
//! with the same shape therefore share the same [`Type::id`], and equality is
//! an integer comparison. Named structs additionally compare their names
//! when both sides are named.
//!
//! # Layout
//!
//! Memory layout is computed per (type, [`LayoutPolicy`]) pair by
//! [`Type::layout`] and [`Type::struct_layout`]; see the [`layout`] module.
//!
//! ```rust,ignore
//! use myth_shader::types::{Type, LayoutPolicy};
//!
//! let light = Type::structure("Light")
//!     .member("color", Type::vec3f())
//!     .member("intensity", Type::f32())
//!     .build();
//! assert_eq!(light.layout(LayoutPolicy::Std140)?.size, 16);
//! ```

mod ctor;
pub mod layout;
pub mod scalar;
pub mod texture;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::dialect::Dialect;
use crate::errors::{Result, ShaderError};
use crate::utils::interner::{self, Symbol};

pub use layout::{Layout, LayoutPolicy, MemberLayout, StructLayout};
pub use scalar::{Primitive, ScalarKind};
pub use texture::{
    AddressSpace, SamplerKind, StorageAccess, StorageFormat, TextureClass, TextureDim,
    TextureType,
};

// ============================================================================
// Descriptors
// ============================================================================

/// A struct member.
#[derive(Debug, Clone)]
pub struct StructMember {
    pub name: String,
    pub ty: Type,
}

/// A struct type.
#[derive(Debug, Clone)]
pub struct StructType {
    pub name: Option<String>,
    pub members: Vec<StructMember>,
    pub policy: LayoutPolicy,
}

impl StructType {
    #[must_use]
    pub fn member(&self, name: &str) -> Option<&StructMember> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// A function signature parameter.
#[derive(Debug, Clone)]
pub struct FunctionParam {
    pub ty: Type,
    pub by_ref: bool,
}

/// A function signature.
#[derive(Debug, Clone)]
pub struct FunctionSig {
    pub name: String,
    pub ret: Type,
    pub params: Vec<FunctionParam>,
}

/// The shape of a [`Type`].
#[derive(Debug, Clone)]
pub enum TypeKind {
    Void,
    Primitive(Primitive),
    Struct(StructType),
    /// `size == None` is a runtime-sized array.
    Array {
        element: Type,
        size: Option<u32>,
    },
    Pointer {
        pointee: Type,
        space: AddressSpace,
    },
    Atomic(ScalarKind),
    Sampler(SamplerKind),
    Texture(TextureType),
    Function(FunctionSig),
}

struct TypeData {
    kind: TypeKind,
    id: Symbol,
}

/// Interned type handle. Cloning is a reference-count increment.
#[derive(Clone)]
pub struct Type(Rc<TypeData>);

impl Type {
    fn from_kind(kind: TypeKind) -> Self {
        let id = interner::intern(&Self::key_of(&kind));
        Self(Rc::new(TypeData { kind, id }))
    }

    fn key_of(kind: &TypeKind) -> String {
        match kind {
            TypeKind::Void => "void".to_string(),
            TypeKind::Primitive(p) => p.key(),
            TypeKind::Struct(s) => {
                let members: Vec<String> = s
                    .members
                    .iter()
                    .map(|m| format!("{}:{}", m.name, m.ty.key()))
                    .collect();
                format!("struct[{}]{{{}}}", s.policy.key(), members.join(","))
            }
            TypeKind::Array { element, size } => match size {
                Some(n) => format!("array<{},{}>", element.key(), n),
                None => format!("array<{}>", element.key()),
            },
            TypeKind::Pointer { pointee, space } => {
                format!("ptr<{},{}>", space.key(), pointee.key())
            }
            TypeKind::Atomic(s) => format!("atomic<{}>", s.key()),
            TypeKind::Sampler(SamplerKind::Sample) => "sampler".to_string(),
            TypeKind::Sampler(SamplerKind::Comparison) => "sampler_comparison".to_string(),
            TypeKind::Texture(t) => t.key(),
            TypeKind::Function(sig) => {
                let params: Vec<String> = sig
                    .params
                    .iter()
                    .map(|p| format!("{}{}", if p.by_ref { "&" } else { "" }, p.ty.key()))
                    .collect();
                format!("fn {}({})->{}", sig.name, params.join(","), sig.ret.key())
            }
        }
    }

    // ------------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------------

    #[must_use]
    pub fn void() -> Self {
        Self::from_kind(TypeKind::Void)
    }

    #[must_use]
    pub fn primitive(p: Primitive) -> Self {
        Self::from_kind(TypeKind::Primitive(p))
    }

    #[must_use]
    pub fn scalar(kind: ScalarKind) -> Self {
        Self::primitive(Primitive::new(kind, 1, 1))
    }

    #[must_use]
    pub fn vector(kind: ScalarKind, width: u8) -> Self {
        Self::primitive(Primitive::new(kind, width, 1))
    }

    /// A `cols`-column matrix of `rows`-component column vectors.
    #[must_use]
    pub fn matrix(kind: ScalarKind, cols: u8, rows: u8) -> Self {
        Self::primitive(Primitive::new(kind, rows, cols))
    }

    #[must_use]
    pub fn bool() -> Self {
        Self::scalar(ScalarKind::Bool)
    }

    #[must_use]
    pub fn f32() -> Self {
        Self::scalar(ScalarKind::F32)
    }

    #[must_use]
    pub fn i32() -> Self {
        Self::scalar(ScalarKind::I32)
    }

    #[must_use]
    pub fn u32() -> Self {
        Self::scalar(ScalarKind::U32)
    }

    #[must_use]
    pub fn vec2f() -> Self {
        Self::vector(ScalarKind::F32, 2)
    }

    #[must_use]
    pub fn vec3f() -> Self {
        Self::vector(ScalarKind::F32, 3)
    }

    #[must_use]
    pub fn vec4f() -> Self {
        Self::vector(ScalarKind::F32, 4)
    }

    #[must_use]
    pub fn mat3f() -> Self {
        Self::matrix(ScalarKind::F32, 3, 3)
    }

    #[must_use]
    pub fn mat4f() -> Self {
        Self::matrix(ScalarKind::F32, 4, 4)
    }

    /// Array of `element`. `None` or `Some(0)` builds a runtime-sized array.
    #[must_use]
    pub fn array(element: Type, size: Option<u32>) -> Self {
        let size = size.filter(|&n| n > 0);
        Self::from_kind(TypeKind::Array { element, size })
    }

    #[must_use]
    pub fn pointer(pointee: Type, space: AddressSpace) -> Self {
        Self::from_kind(TypeKind::Pointer { pointee, space })
    }

    #[must_use]
    pub fn atomic(kind: ScalarKind) -> Self {
        Self::from_kind(TypeKind::Atomic(kind.shader_kind()))
    }

    #[must_use]
    pub fn sampler(kind: SamplerKind) -> Self {
        Self::from_kind(TypeKind::Sampler(kind))
    }

    #[must_use]
    pub fn texture(texture: TextureType) -> Self {
        Self::from_kind(TypeKind::Texture(texture))
    }

    #[must_use]
    pub fn function(name: impl Into<String>, ret: Type, params: Vec<FunctionParam>) -> Self {
        Self::from_kind(TypeKind::Function(FunctionSig {
            name: name.into(),
            ret,
            params,
        }))
    }

    /// Starts a named struct.
    #[must_use]
    pub fn structure(name: impl Into<String>) -> StructBuilder {
        StructBuilder::new(Some(name.into()))
    }

    /// Starts an anonymous struct; it is given a generated name on emission.
    #[must_use]
    pub fn anonymous_structure() -> StructBuilder {
        StructBuilder::new(None)
    }

    // ------------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------------

    /// Interned structural key.
    #[inline]
    #[must_use]
    pub fn id(&self) -> Symbol {
        self.0.id
    }

    /// The structural key as text.
    #[must_use]
    pub fn key(&self) -> &'static str {
        interner::resolve(self.0.id)
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> &TypeKind {
        &self.0.kind
    }

    // ------------------------------------------------------------------------
    // Predicates
    // ------------------------------------------------------------------------

    #[must_use]
    pub fn as_primitive(&self) -> Option<Primitive> {
        match self.kind() {
            TypeKind::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_struct(&self) -> Option<&StructType> {
        match self.kind() {
            TypeKind::Struct(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_texture(&self) -> Option<TextureType> {
        match self.kind() {
            TypeKind::Texture(t) => Some(*t),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_function(&self) -> Option<&FunctionSig> {
        match self.kind() {
            TypeKind::Function(sig) => Some(sig),
            _ => None,
        }
    }

    /// Scalar component kind of a primitive type.
    #[must_use]
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        self.as_primitive().map(|p| p.scalar)
    }

    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(self.kind(), TypeKind::Void)
    }

    #[must_use]
    pub fn is_scalar(&self) -> bool {
        self.as_primitive().is_some_and(|p| p.is_scalar())
    }

    #[must_use]
    pub fn is_vector(&self) -> bool {
        self.as_primitive().is_some_and(|p| p.is_vector())
    }

    #[must_use]
    pub fn is_matrix(&self) -> bool {
        self.as_primitive().is_some_and(|p| p.is_matrix())
    }

    #[must_use]
    pub fn is_struct(&self) -> bool {
        matches!(self.kind(), TypeKind::Struct(_))
    }

    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self.kind(), TypeKind::Array { .. })
    }

    #[must_use]
    pub fn is_runtime_array(&self) -> bool {
        matches!(self.kind(), TypeKind::Array { size: None, .. })
    }

    #[must_use]
    pub fn is_pointer(&self) -> bool {
        matches!(self.kind(), TypeKind::Pointer { .. })
    }

    #[must_use]
    pub fn is_atomic(&self) -> bool {
        matches!(self.kind(), TypeKind::Atomic(_))
    }

    #[must_use]
    pub fn is_sampler(&self) -> bool {
        matches!(self.kind(), TypeKind::Sampler(_))
    }

    #[must_use]
    pub fn is_texture(&self) -> bool {
        matches!(self.kind(), TypeKind::Texture(_))
    }

    #[must_use]
    pub fn is_bool(&self) -> bool {
        self.scalar_kind() == Some(ScalarKind::Bool)
    }

    /// Can be built with a constructor expression.
    #[must_use]
    pub fn is_constructible(&self) -> bool {
        match self.kind() {
            TypeKind::Primitive(_) => true,
            TypeKind::Array { element, size } => size.is_some() && element.is_constructible(),
            TypeKind::Struct(s) => s.members.iter().all(|m| m.ty.is_constructible()),
            _ => false,
        }
    }

    /// Can live in a buffer shared with the host.
    #[must_use]
    pub fn is_host_shareable(&self) -> bool {
        match self.kind() {
            TypeKind::Primitive(p) => p.scalar.is_numeric(),
            TypeKind::Atomic(_) => true,
            TypeKind::Array { element, .. } => element.is_host_shareable(),
            TypeKind::Struct(s) => s.members.iter().all(|m| m.ty.is_host_shareable()),
            _ => false,
        }
    }

    /// Has a memory representation, so a layout can be computed for it.
    #[must_use]
    pub fn is_storable(&self) -> bool {
        match self.kind() {
            TypeKind::Primitive(_) | TypeKind::Atomic(_) => true,
            TypeKind::Array { element, .. } => element.is_storable(),
            TypeKind::Struct(s) => s.members.iter().all(|m| m.ty.is_storable()),
            _ => false,
        }
    }

    /// Element of an array, column of a matrix or component of a vector.
    #[must_use]
    pub fn element(&self) -> Option<Type> {
        match self.kind() {
            TypeKind::Array { element, .. } => Some(element.clone()),
            TypeKind::Primitive(p) if p.is_matrix() => {
                Some(Type::vector(p.scalar, p.rows))
            }
            TypeKind::Primitive(p) if p.is_vector() => Some(Type::scalar(p.scalar)),
            _ => None,
        }
    }

    /// Number of indexable elements; `None` for runtime arrays and non-indexable types.
    #[must_use]
    pub fn element_count(&self) -> Option<u32> {
        match self.kind() {
            TypeKind::Array { size, .. } => *size,
            TypeKind::Primitive(p) if p.is_matrix() => Some(u32::from(p.cols)),
            TypeKind::Primitive(p) if p.is_vector() => Some(u32::from(p.rows)),
            _ => None,
        }
    }

    #[must_use]
    pub fn pointee(&self) -> Option<Type> {
        match self.kind() {
            TypeKind::Pointer { pointee, .. } => Some(pointee.clone()),
            _ => None,
        }
    }

    /// Calls `f` for every struct reachable from this type, dependencies first.
    pub fn visit_structs(&self, f: &mut impl FnMut(&Type)) {
        match self.kind() {
            TypeKind::Struct(s) => {
                for m in &s.members {
                    m.ty.visit_structs(f);
                }
                f(self);
            }
            TypeKind::Array { element, .. } => element.visit_structs(f),
            TypeKind::Pointer { pointee, .. } => pointee.visit_structs(f),
            _ => {}
        }
    }

    /// Whether a component of shader kind `kind` appears anywhere in this type.
    #[must_use]
    pub fn contains_scalar(&self, kind: ScalarKind) -> bool {
        match self.kind() {
            TypeKind::Primitive(p) => p.scalar.shader_kind() == kind,
            TypeKind::Atomic(k) => k.shader_kind() == kind,
            TypeKind::Struct(s) => s.members.iter().any(|m| m.ty.contains_scalar(kind)),
            TypeKind::Array { element, .. } => element.contains_scalar(kind),
            TypeKind::Pointer { pointee, .. } => pointee.contains_scalar(kind),
            TypeKind::Function(sig) => {
                sig.ret.contains_scalar(kind) || sig.params.iter().any(|p| p.ty.contains_scalar(kind))
            }
            _ => false,
        }
    }

    // ------------------------------------------------------------------------
    // Naming
    // ------------------------------------------------------------------------

    /// Emitted name of a struct type.
    #[must_use]
    pub fn struct_name(&self) -> Option<String> {
        self.as_struct().map(|s| {
            s.name
                .clone()
                .unwrap_or_else(|| format!("Struct{}", interner::ordinal(self.id())))
        })
    }

    /// Type name in the given dialect.
    pub fn type_name(&self, dialect: Dialect) -> Result<String> {
        match self.kind() {
            TypeKind::Void => Ok(if dialect.is_wgsl() { String::new() } else { "void".into() }),
            TypeKind::Primitive(p) => p.type_name(dialect),
            TypeKind::Struct(_) => Ok(self.struct_name().unwrap_or_default()),
            TypeKind::Array { element, size } => {
                let elem = element.type_name(dialect)?;
                match (dialect, size) {
                    (Dialect::Wgsl, Some(n)) => Ok(format!("array<{elem}, {n}>")),
                    (Dialect::Wgsl, None) => Ok(format!("array<{elem}>")),
                    (_, Some(n)) => Ok(format!("{elem}[{n}]")),
                    (_, None) => Err(ShaderError::unsupported("runtime-sized arrays", dialect)),
                }
            }
            TypeKind::Pointer { pointee, space } => {
                if !dialect.is_wgsl() {
                    return Err(ShaderError::internal(format!(
                        "pointer type {} reached the {dialect} backend",
                        self.key()
                    )));
                }
                let inner = pointee.type_name(dialect)?;
                Ok(match space {
                    AddressSpace::Storage => format!("ptr<storage, {inner}, read_write>"),
                    _ => format!("ptr<{}, {inner}>", space.key()),
                })
            }
            TypeKind::Atomic(kind) => {
                if dialect.is_wgsl() {
                    Ok(format!("atomic<{}>", kind.key()))
                } else {
                    Err(ShaderError::unsupported("atomic types", dialect))
                }
            }
            TypeKind::Sampler(kind) => {
                if !dialect.is_wgsl() {
                    return Err(ShaderError::unsupported("separate samplers", dialect));
                }
                Ok(match kind {
                    SamplerKind::Sample => "sampler".into(),
                    SamplerKind::Comparison => "sampler_comparison".into(),
                })
            }
            TypeKind::Texture(t) => t.type_name(dialect),
            TypeKind::Function(sig) => Ok(sig.name.clone()),
        }
    }

    /// Declaration text binding `ident` to this type.
    ///
    /// WGSL writes `ident: T`; GLSL embeds array dimensions after the
    /// identifier (`float ident[4]`).
    pub fn declare(&self, dialect: Dialect, ident: &str) -> Result<String> {
        if dialect.is_wgsl() {
            return Ok(format!("{ident}: {}", self.type_name(dialect)?));
        }
        let mut dims = String::new();
        let mut base = self.clone();
        while let TypeKind::Array { element, size } = base.kind() {
            match size {
                Some(n) => dims.push_str(&format!("[{n}]")),
                None => return Err(ShaderError::unsupported("runtime-sized arrays", dialect)),
            }
            let next = element.clone();
            base = next;
        }
        Ok(format!("{} {ident}{dims}", base.type_name(dialect)?))
    }

    // ------------------------------------------------------------------------
    // Layout
    // ------------------------------------------------------------------------

    /// Size and alignment under `policy`.
    pub fn layout(&self, policy: LayoutPolicy) -> Result<Layout> {
        layout::compute(self, policy)
    }

    /// Member offsets of a struct under `policy`.
    pub fn struct_layout(&self, policy: LayoutPolicy) -> Result<StructLayout> {
        layout::compute_struct(self, policy)
    }

    /// Argument type lists accepted by this type's constructor.
    #[must_use]
    pub fn constructor_variants(&self, dialect: Dialect) -> Vec<Vec<Type>> {
        ctor::variants(self, dialect)
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        if self.0.id != other.0.id {
            return false;
        }
        match (self.as_struct(), other.as_struct()) {
            (Some(a), Some(b)) => match (&a.name, &b.name) {
                (Some(na), Some(nb)) => na == nb,
                _ => true,
            },
            _ => true,
        }
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_struct().and_then(|s| s.name.as_deref()) {
            Some(name) => write!(f, "Type({name} = {})", self.key()),
            None => write!(f, "Type({})", self.key()),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.struct_name() {
            Some(name) => f.write_str(&name),
            None => f.write_str(self.key()),
        }
    }
}

// ============================================================================
// Struct Builder
// ============================================================================

/// Incremental struct construction.
pub struct StructBuilder {
    name: Option<String>,
    members: Vec<StructMember>,
    policy: LayoutPolicy,
}

impl StructBuilder {
    fn new(name: Option<String>) -> Self {
        Self {
            name,
            members: Vec::new(),
            policy: LayoutPolicy::Packed,
        }
    }

    #[must_use]
    pub fn member(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.members.push(StructMember {
            name: name.into(),
            ty,
        });
        self
    }

    #[must_use]
    pub fn policy(mut self, policy: LayoutPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn build(self) -> Type {
        Type::from_kind(TypeKind::Struct(StructType {
            name: self.name,
            members: self.members,
            policy: self.policy,
        }))
    }
}
