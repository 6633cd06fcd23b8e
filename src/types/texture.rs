//! Address spaces, samplers and texture descriptors.

use serde::Serialize;

use super::scalar::ScalarKind;
use crate::dialect::Dialect;
use crate::errors::{Result, ShaderError};

/// Storage class of a variable or pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressSpace {
    Function,
    Private,
    Workgroup,
    Uniform,
    Storage,
    Unknown,
}

impl AddressSpace {
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Private => "private",
            Self::Workgroup => "workgroup",
            Self::Uniform => "uniform",
            Self::Storage => "storage",
            Self::Unknown => "unknown",
        }
    }
}

/// Sampler access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplerKind {
    Sample,
    Comparison,
}

/// Texture dimensionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TextureDim {
    #[serde(rename = "1d")]
    D1,
    #[serde(rename = "2d")]
    D2,
    #[serde(rename = "3d")]
    D3,
    #[serde(rename = "cube")]
    Cube,
}

impl TextureDim {
    /// Components of a sampling coordinate (without the array layer).
    #[must_use]
    pub fn coord_width(self) -> u8 {
        match self {
            Self::D1 => 1,
            Self::D2 => 2,
            Self::D3 | Self::Cube => 3,
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::D1 => "1d",
            Self::D2 => "2d",
            Self::D3 => "3d",
            Self::Cube => "cube",
        }
    }
}

/// Texel format of a storage texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageFormat {
    Rgba8Unorm,
    Rgba8Snorm,
    Rgba8Uint,
    Rgba8Sint,
    Rgba16Float,
    Rgba32Float,
    R32Float,
    R32Uint,
    R32Sint,
    Rg32Float,
}

impl StorageFormat {
    #[must_use]
    pub fn wgsl_name(self) -> &'static str {
        match self {
            Self::Rgba8Unorm => "rgba8unorm",
            Self::Rgba8Snorm => "rgba8snorm",
            Self::Rgba8Uint => "rgba8uint",
            Self::Rgba8Sint => "rgba8sint",
            Self::Rgba16Float => "rgba16float",
            Self::Rgba32Float => "rgba32float",
            Self::R32Float => "r32float",
            Self::R32Uint => "r32uint",
            Self::R32Sint => "r32sint",
            Self::Rg32Float => "rg32float",
        }
    }

    /// Component kind of texels read from or written to this format.
    #[must_use]
    pub fn texel_kind(self) -> ScalarKind {
        match self {
            Self::Rgba8Uint | Self::R32Uint => ScalarKind::U32,
            Self::Rgba8Sint | Self::R32Sint => ScalarKind::I32,
            _ => ScalarKind::F32,
        }
    }
}

/// Access mode of a storage texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageAccess {
    Read,
    Write,
    ReadWrite,
}

impl StorageAccess {
    #[must_use]
    pub fn wgsl_name(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::ReadWrite => "read_write",
        }
    }
}

/// What kind of texture binding this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case", tag = "class")]
pub enum TextureClass {
    Sampled { sample: ScalarKind },
    Multisampled { sample: ScalarKind },
    Depth,
    Storage {
        format: StorageFormat,
        access: StorageAccess,
    },
    External,
}

/// A complete texture type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TextureType {
    pub dim: TextureDim,
    pub arrayed: bool,
    #[serde(flatten)]
    pub class: TextureClass,
}

impl TextureType {
    #[must_use]
    pub fn sampled(dim: TextureDim, sample: ScalarKind) -> Self {
        Self {
            dim,
            arrayed: false,
            class: TextureClass::Sampled { sample },
        }
    }

    #[must_use]
    pub fn depth(dim: TextureDim) -> Self {
        Self {
            dim,
            arrayed: false,
            class: TextureClass::Depth,
        }
    }

    #[must_use]
    pub fn arrayed(mut self) -> Self {
        self.arrayed = true;
        self
    }

    #[must_use]
    pub fn is_storage(&self) -> bool {
        matches!(self.class, TextureClass::Storage { .. })
    }

    #[must_use]
    pub fn is_depth(&self) -> bool {
        matches!(self.class, TextureClass::Depth)
    }

    #[must_use]
    pub fn is_external(&self) -> bool {
        matches!(self.class, TextureClass::External)
    }

    /// Component kind of values returned by sampling or loading.
    #[must_use]
    pub fn texel_kind(&self) -> ScalarKind {
        match self.class {
            TextureClass::Sampled { sample } | TextureClass::Multisampled { sample } => {
                sample.shader_kind()
            }
            TextureClass::Storage { format, .. } => format.texel_kind(),
            TextureClass::Depth | TextureClass::External => ScalarKind::F32,
        }
    }

    pub(crate) fn key(&self) -> String {
        let class = match self.class {
            TextureClass::Sampled { sample } => format!("sampled:{}", sample.key()),
            TextureClass::Multisampled { sample } => format!("ms:{}", sample.key()),
            TextureClass::Depth => "depth".to_string(),
            TextureClass::Storage { format, access } => {
                format!("storage:{}:{}", format.wgsl_name(), access.wgsl_name())
            }
            TextureClass::External => "external".to_string(),
        };
        format!(
            "texture<{}{},{}>",
            self.dim.key(),
            if self.arrayed { "_array" } else { "" },
            class
        )
    }

    pub(crate) fn type_name(&self, dialect: Dialect) -> Result<String> {
        if dialect.is_wgsl() {
            return Ok(self.wgsl_name());
        }
        self.glsl_name(dialect)
    }

    fn wgsl_name(&self) -> String {
        let dim = format!("{}{}", self.dim.key(), if self.arrayed { "_array" } else { "" });
        match self.class {
            TextureClass::Sampled { sample } => {
                format!("texture_{dim}<{}>", sample.shader_kind().key())
            }
            TextureClass::Multisampled { sample } => {
                format!("texture_multisampled_{dim}<{}>", sample.shader_kind().key())
            }
            TextureClass::Depth => format!("texture_depth_{dim}"),
            TextureClass::Storage { format, access } => format!(
                "texture_storage_{dim}<{}, {}>",
                format.wgsl_name(),
                access.wgsl_name()
            ),
            TextureClass::External => "texture_external".to_string(),
        }
    }

    fn glsl_name(&self, dialect: Dialect) -> Result<String> {
        let es3 = dialect == Dialect::GlslEs300;
        let prefix = match self.class {
            TextureClass::Sampled { sample } => match sample.shader_kind() {
                ScalarKind::I32 if es3 => "i",
                ScalarKind::U32 if es3 => "u",
                ScalarKind::F32 | ScalarKind::F16 => "",
                _ => return Err(ShaderError::unsupported("integer textures", dialect)),
            },
            TextureClass::Depth if es3 => "",
            TextureClass::External => return Ok("samplerExternalOES".to_string()),
            TextureClass::Depth => return Err(ShaderError::unsupported("depth textures", dialect)),
            TextureClass::Multisampled { .. } => {
                return Err(ShaderError::unsupported("multisampled textures", dialect));
            }
            TextureClass::Storage { .. } => {
                return Err(ShaderError::unsupported("storage textures", dialect));
            }
        };
        let shape = match (self.dim, self.arrayed) {
            (TextureDim::D2, false) => "2D",
            (TextureDim::Cube, false) => "Cube",
            (TextureDim::D3, false) if es3 => "3D",
            (TextureDim::D2, true) if es3 => "2DArray",
            _ => {
                return Err(ShaderError::unsupported(
                    format!("{} textures", self.key()),
                    dialect,
                ));
            }
        };
        let shadow = if self.is_depth() { "Shadow" } else { "" };
        Ok(format!("{prefix}sampler{shape}{shadow}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_names() {
        let t = TextureType::sampled(TextureDim::D2, ScalarKind::F32);
        assert_eq!(t.type_name(Dialect::Wgsl).unwrap(), "texture_2d<f32>");
        assert_eq!(t.type_name(Dialect::GlslEs100).unwrap(), "sampler2D");

        let arr = t.arrayed();
        assert_eq!(arr.type_name(Dialect::GlslEs300).unwrap(), "sampler2DArray");
        assert!(arr.type_name(Dialect::GlslEs100).is_err());

        let storage = TextureType {
            dim: TextureDim::D2,
            arrayed: false,
            class: TextureClass::Storage {
                format: StorageFormat::Rgba8Unorm,
                access: StorageAccess::Write,
            },
        };
        assert_eq!(
            storage.type_name(Dialect::Wgsl).unwrap(),
            "texture_storage_2d<rgba8unorm, write>"
        );
    }
}
