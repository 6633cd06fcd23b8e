//! Program Options & Output
//!
//! [`ProgramOptions`] is everything a build consumes from the graphics
//! backend; [`CompiledProgram`] is everything it hands back.

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::dialect::{DeviceCaps, Dialect, ShaderStage};
use crate::types::{ScalarKind, Type};
use crate::uniforms::BindGroupLayout;

// ============================================================================
// Options
// ============================================================================

/// Build configuration supplied by the backend.
#[derive(Debug, Clone)]
pub struct ProgramOptions {
    /// Target dialect.
    pub dialect: Dialect,
    /// Capabilities of the device the program will run on.
    pub caps: DeviceCaps,
    /// Emulate depth clamping by routing depth through a varying and
    /// writing it from the fragment stage (WGSL render builds only).
    pub emulate_depth_clamp: bool,
    /// Attribute semantic name to vertex buffer slot, as bound by the backend.
    pub attribute_slots: FxHashMap<String, u32>,
    /// Debug label, used as the prefix of bind group labels.
    pub label: Option<String>,
    /// Workgroup size of compute builds.
    pub workgroup_size: [u32; 3],
}

impl Default for ProgramOptions {
    fn default() -> Self {
        Self::new(Dialect::Wgsl)
    }
}

impl ProgramOptions {
    /// Options targeting `dialect` with that dialect's baseline capabilities.
    #[must_use]
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            caps: DeviceCaps::baseline(dialect),
            emulate_depth_clamp: false,
            attribute_slots: FxHashMap::default(),
            label: None,
            workgroup_size: [64, 1, 1],
        }
    }

    #[must_use]
    pub fn with_caps(mut self, caps: DeviceCaps) -> Self {
        self.caps = caps;
        self
    }

    #[must_use]
    pub fn with_depth_clamp_emulation(mut self, enabled: bool) -> Self {
        self.emulate_depth_clamp = enabled;
        self
    }

    #[must_use]
    pub fn with_attribute_slot(mut self, semantic: impl Into<String>, slot: u32) -> Self {
        self.attribute_slots.insert(semantic.into(), slot);
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_workgroup_size(mut self, size: [u32; 3]) -> Self {
        self.workgroup_size = size;
        self
    }
}

// ============================================================================
// Output
// ============================================================================

/// Emitted source of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageSource {
    pub stage: ShaderStage,
    pub source: String,
}

/// A vertex attribute consumed by the vertex stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VertexAttributeSlot {
    /// Semantic name.
    pub name: String,
    /// Shader location.
    pub location: u32,
    /// Vertex buffer format, e.g. `float32x3` or `unorm8x4`.
    pub format: String,
    #[serde(skip)]
    pub ty: Type,
}

/// Vertex buffer format name of an attribute type; `None` for types that
/// cannot be fetched from a vertex buffer.
#[must_use]
pub fn vertex_format(ty: &Type) -> Option<String> {
    let prim = ty.as_primitive().filter(|p| !p.is_matrix())?;
    let base = match prim.scalar {
        ScalarKind::F32 => "float32",
        ScalarKind::F16 => "float16",
        ScalarKind::I32 => "sint32",
        ScalarKind::U32 => "uint32",
        ScalarKind::I16 => "sint16",
        ScalarKind::U16 => "uint16",
        ScalarKind::I8 => "sint8",
        ScalarKind::U8 => "uint8",
        ScalarKind::Unorm8 => "unorm8",
        ScalarKind::Snorm8 => "snorm8",
        ScalarKind::Unorm16 => "unorm16",
        ScalarKind::Snorm16 => "snorm16",
        ScalarKind::Bool => return None,
    };
    Some(if prim.rows > 1 {
        format!("{base}x{}", prim.rows)
    } else {
        base.to_string()
    })
}

/// Index buffer element width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexFormat {
    Uint16,
    Uint32,
}

impl IndexFormat {
    #[must_use]
    pub fn for_caps(caps: DeviceCaps) -> Self {
        if caps.contains(DeviceCaps::INDEX_U32) {
            Self::Uint32
        } else {
            Self::Uint16
        }
    }
}

/// Result of a successful build.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledProgram {
    pub dialect: Dialect,
    /// Vertex then fragment for render builds; a single compute stage otherwise.
    pub stages: Vec<StageSource>,
    /// Ordered by group index.
    pub bind_group_layouts: Vec<BindGroupLayout>,
    /// In declaration order. Empty for compute builds.
    pub vertex_attributes: Vec<VertexAttributeSlot>,
    pub index_format: IndexFormat,
}

impl CompiledProgram {
    /// Source of `stage`, if the program has it.
    #[must_use]
    pub fn source(&self, stage: ShaderStage) -> Option<&str> {
        self.stages
            .iter()
            .find(|s| s.stage == stage)
            .map(|s| s.source.as_str())
    }
}
