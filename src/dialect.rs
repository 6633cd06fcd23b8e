//! Dialects, Stages & Device Capabilities
//!
//! The three output languages, the shader stages a program is made of, and
//! the capability flags reported by the graphics backend. These are the only
//! things the compiler consumes from the backend layer.

use std::fmt;

use bitflags::bitflags;
use serde::Serialize;

// ============================================================================
// Dialect
// ============================================================================

/// Target shader language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Dialect {
    /// GLSL ES 1.00 (WebGL 1).
    GlslEs100,
    /// GLSL ES 3.00 (WebGL 2).
    GlslEs300,
    /// WGSL (WebGPU).
    Wgsl,
}

impl Dialect {
    #[inline]
    #[must_use]
    pub fn is_glsl(self) -> bool {
        matches!(self, Self::GlslEs100 | Self::GlslEs300)
    }

    #[inline]
    #[must_use]
    pub fn is_wgsl(self) -> bool {
        self == Self::Wgsl
    }

    /// The single-bit mask selecting this dialect in overload tables.
    #[must_use]
    pub fn mask(self) -> DialectMask {
        match self {
            Self::GlslEs100 => DialectMask::GLSL_ES_100,
            Self::GlslEs300 => DialectMask::GLSL_ES_300,
            Self::Wgsl => DialectMask::WGSL,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::GlslEs100 => "GLSL ES 1.00",
            Self::GlslEs300 => "GLSL ES 3.00",
            Self::Wgsl => "WGSL",
        })
    }
}

bitflags! {
    /// A set of dialects an overload is available in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DialectMask: u8 {
        const GLSL_ES_100 = 1 << 0;
        const GLSL_ES_300 = 1 << 1;
        const WGSL        = 1 << 2;

        const GLSL = Self::GLSL_ES_100.bits() | Self::GLSL_ES_300.bits();
        const MODERN = Self::GLSL_ES_300.bits() | Self::WGSL.bits();
        const ALL = Self::GLSL.bits() | Self::WGSL.bits();
    }
}

// ============================================================================
// Shader Stages
// ============================================================================

/// A single pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

impl ShaderStage {
    #[must_use]
    pub fn stages(self) -> ShaderStages {
        match self {
            Self::Vertex => ShaderStages::VERTEX,
            Self::Fragment => ShaderStages::FRAGMENT,
            Self::Compute => ShaderStages::COMPUTE,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
            Self::Compute => "compute",
        }
    }
}

bitflags! {
    /// Stage visibility mask of a binding.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShaderStages: u32 {
        const VERTEX   = 1 << 0;
        const FRAGMENT = 1 << 1;
        const COMPUTE  = 1 << 2;

        const VERTEX_FRAGMENT = Self::VERTEX.bits() | Self::FRAGMENT.bits();
    }
}

impl ShaderStages {
    /// The stages contained in this mask, in pipeline order.
    pub fn iter_stages(self) -> impl Iterator<Item = ShaderStage> {
        [ShaderStage::Vertex, ShaderStage::Fragment, ShaderStage::Compute]
            .into_iter()
            .filter(move |s| self.contains(s.stages()))
    }
}

impl Serialize for ShaderStages {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.bits())
    }
}

// ============================================================================
// Device Capabilities
// ============================================================================

bitflags! {
    /// Capability flags queried from the graphics backend.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DeviceCaps: u32 {
        /// The fragment stage can write depth.
        const FRAG_DEPTH = 1 << 0;
        /// Uniform buffers may be bound with a dynamic offset.
        const DYNAMIC_OFFSET_BUFFER = 1 << 1;
        /// 32-bit index buffers are available.
        const INDEX_U32 = 1 << 2;
        /// Screen-space derivatives are available in the fragment stage.
        const STANDARD_DERIVATIVES = 1 << 3;
        /// Explicit-LOD texture sampling is available in the fragment stage.
        const SHADER_TEXTURE_LOD = 1 << 4;
    }
}

impl DeviceCaps {
    /// The capabilities a conformant device of the given dialect always has.
    #[must_use]
    pub fn baseline(dialect: Dialect) -> Self {
        match dialect {
            Dialect::GlslEs100 => Self::empty(),
            Dialect::GlslEs300 => {
                Self::FRAG_DEPTH
                    | Self::INDEX_U32
                    | Self::STANDARD_DERIVATIVES
                    | Self::SHADER_TEXTURE_LOD
            }
            Dialect::Wgsl => Self::all(),
        }
    }
}
