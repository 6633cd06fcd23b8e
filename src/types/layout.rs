//! Memory Layout
//!
//! Size, alignment and member offsets of storable types under a
//! [`LayoutPolicy`].
//!
//! | Policy   | Vectors           | Matrix columns     | Array stride       | Struct align |
//! |----------|-------------------|--------------------|--------------------|--------------|
//! | `Packed` | component aligned | tightly packed     | element size       | max member   |
//! | `Std140` | vec3 aligns as 4  | rounded up to 16   | rounded up to 16   | rounded to 16|
//! | `Std430` | vec3 aligns as 4  | vector alignment   | element alignment  | max member   |

use serde::Serialize;

use super::{Type, TypeKind};
use crate::errors::{Result, ShaderError};

/// Memory layout rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutPolicy {
    /// Tight packing, used for vertex data and host-side structs.
    #[default]
    Packed,
    /// GPU uniform buffer rules.
    Std140,
    /// GPU storage buffer rules.
    Std430,
}

impl LayoutPolicy {
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Packed => "packed",
            Self::Std140 => "std140",
            Self::Std430 => "std430",
        }
    }
}

/// Size and alignment in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Layout {
    pub size: u32,
    pub align: u32,
}

/// Placement of one struct member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberLayout {
    pub name: String,
    pub offset: u32,
    pub size: u32,
    pub align: u32,
}

/// Complete layout of a struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructLayout {
    pub size: u32,
    pub align: u32,
    pub members: Vec<MemberLayout>,
}

#[inline]
fn round_up(align: u32, value: u32) -> u32 {
    if align == 0 {
        return value;
    }
    value.div_ceil(align) * align
}

fn not_storable(ty: &Type) -> ShaderError {
    ShaderError::internal(format!("layout requested for non-storable type {}", ty.key()))
}

/// Alignment of a vector of `width` components of `size` bytes each.
fn vector_align(width: u32, size: u32) -> u32 {
    match width {
        3 => 4 * size,
        n => n * size,
    }
}

pub(super) fn compute(ty: &Type, policy: LayoutPolicy) -> Result<Layout> {
    match ty.kind() {
        TypeKind::Primitive(p) => {
            let s = p.scalar.byte_size();
            let rows = u32::from(p.rows);
            let cols = u32::from(p.cols);
            if policy == LayoutPolicy::Packed {
                return Ok(Layout {
                    size: s * rows * cols,
                    align: s,
                });
            }
            if p.is_scalar() {
                return Ok(Layout { size: s, align: s });
            }
            let align = vector_align(rows, s);
            if p.is_vector() {
                return Ok(Layout {
                    size: rows * s,
                    align,
                });
            }
            let column_align = match policy {
                LayoutPolicy::Std140 => round_up(16, align),
                _ => align,
            };
            Ok(Layout {
                size: column_align * cols,
                align: column_align,
            })
        }
        TypeKind::Atomic(_) => Ok(Layout { size: 4, align: 4 }),
        TypeKind::Array { element, size } => {
            let elem = compute(element, policy)?;
            let (stride, align) = match policy {
                LayoutPolicy::Packed => (elem.size, elem.align),
                LayoutPolicy::Std140 => {
                    let align = round_up(16, elem.align);
                    (round_up(align, elem.size), align)
                }
                LayoutPolicy::Std430 => (round_up(elem.align, elem.size), elem.align),
            };
            Ok(Layout {
                size: stride * size.unwrap_or(1),
                align,
            })
        }
        TypeKind::Struct(_) => {
            let layout = compute_struct(ty, policy)?;
            Ok(Layout {
                size: layout.size,
                align: layout.align,
            })
        }
        _ => Err(not_storable(ty)),
    }
}

pub(super) fn compute_struct(ty: &Type, policy: LayoutPolicy) -> Result<StructLayout> {
    let st = ty.as_struct().ok_or_else(|| not_storable(ty))?;
    let mut offset = 0u32;
    let mut max_align = 1u32;
    let mut members = Vec::with_capacity(st.members.len());

    for m in &st.members {
        let layout = compute(&m.ty, policy)?;
        offset = round_up(layout.align, offset);
        members.push(MemberLayout {
            name: m.name.clone(),
            offset,
            size: layout.size,
            align: layout.align,
        });
        offset += layout.size;
        max_align = max_align.max(layout.align);
    }

    let align = match policy {
        LayoutPolicy::Std140 => round_up(16, max_align),
        _ => max_align,
    };
    Ok(StructLayout {
        size: round_up(align, offset),
        align,
        members,
    })
}
