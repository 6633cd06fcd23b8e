//! Uniform / Binding Layout Planner
//!
//! Collects every resource binding declared while the stages are built,
//! folds plain uniforms into generated blocks, assigns binding indices and
//! produces the bind group layouts handed to the backend.
//!
//! # Merging
//!
//! Plain uniforms are bucketed by `(group, visibility)`. Each bucket becomes
//! one std140 struct named `UniformGroup{g}{Vertex|Fragment|Shared|Compute}`
//! declared once per visible stage as `u_group{g}_{vertex|...}`; the folded
//! uniforms are then reached through `u_group{g}_{..}.<name>`.
//!
//! Textures, samplers, storage buffers and dynamic-offset uniforms keep
//! their own binding.
//!
//! # Binding assignment
//!
//! Bindings are numbered per group in declaration order, after merging.

use std::collections::BTreeMap;

use serde::Serialize;
use smallvec::SmallVec;

use crate::ast::{Block, DeclKind, Stmt, Variable};
use crate::dialect::{ShaderStage, ShaderStages};
use crate::emit::StageModule;
use crate::errors::{Result, ShaderError};
use crate::types::{
    LayoutPolicy, MemberLayout, SamplerKind, TextureClass, TextureType, Type,
};

/// Reflection tag of generated block declarations.
pub const BLOCK_TAG: &str = "uniform_block";
/// Reflection tag of dynamic-offset uniform declarations.
pub const DYNAMIC_TAG: &str = "dynamic_offset";

// ============================================================================
// Records
// ============================================================================

/// What a binding holds.
#[derive(Debug, Clone)]
pub enum UniformPayload {
    /// A plain uniform value; foldable unless `dynamic`.
    Value { ty: Type, dynamic: bool },
    /// A generated block of folded uniforms.
    Block { ty: Type },
    Storage { ty: Type },
    Texture(TextureType),
    Sampler(SamplerKind),
}

impl UniformPayload {
    fn same_shape(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::Value { ty: a, dynamic: da },
                Self::Value { ty: b, dynamic: db },
            ) => a == b && da == db,
            (Self::Storage { ty: a }, Self::Storage { ty: b })
            | (Self::Block { ty: a }, Self::Block { ty: b }) => a == b,
            (Self::Texture(a), Self::Texture(b)) => a == b,
            (Self::Sampler(a), Self::Sampler(b)) => a == b,
            _ => false,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Value { ty, .. } | Self::Block { ty } | Self::Storage { ty } => ty.to_string(),
            Self::Texture(t) => Type::texture(*t).to_string(),
            Self::Sampler(s) => Type::sampler(*s).to_string(),
        }
    }

    fn is_foldable(&self) -> bool {
        matches!(self, Self::Value { dynamic: false, .. })
    }
}

/// One logical binding, shared by every stage that declares it.
#[derive(Debug, Clone)]
pub struct UniformRecord {
    pub name: String,
    pub group: u32,
    pub binding: Option<u32>,
    pub visibility: ShaderStages,
    pub payload: UniformPayload,
    /// The declaration of this binding in each stage that has one.
    pub decls: SmallVec<[(ShaderStage, Variable); 2]>,
}

impl UniformRecord {
    fn decl(&self, stage: ShaderStage) -> Option<&Variable> {
        self.decls.iter().find(|(s, _)| *s == stage).map(|(_, v)| v)
    }
}

/// Pending bindings of a build session.
#[derive(Debug, Default)]
pub struct UniformTable {
    records: Vec<UniformRecord>,
}

impl UniformTable {
    #[must_use]
    pub fn records(&self) -> &[UniformRecord] {
        &self.records
    }

    /// Records a declaration of `name` in `stage`.
    ///
    /// Declaring the same name again from another stage widens the
    /// visibility of the existing record; the shape and group must agree.
    pub fn register(
        &mut self,
        name: &str,
        group: u32,
        stage: ShaderStage,
        payload: UniformPayload,
        var: &Variable,
    ) -> Result<()> {
        if let Some(record) = self.records.iter_mut().find(|r| r.name == name) {
            if !record.payload.same_shape(&payload) {
                return Err(ShaderError::type_cast(
                    record.payload.describe(),
                    payload.describe(),
                ));
            }
            if record.group != group {
                return Err(ShaderError::InvalidState(format!(
                    "uniform '{name}' declared in group {} and group {group}",
                    record.group
                )));
            }
            if record.decl(stage).is_some() {
                return Err(ShaderError::Redeclared(name.to_string()));
            }
            record.visibility |= stage.stages();
            record.decls.push((stage, var.clone()));
            return Ok(());
        }

        self.records.push(UniformRecord {
            name: name.to_string(),
            group,
            binding: None,
            visibility: stage.stages(),
            payload,
            decls: SmallVec::from_iter([(stage, var.clone())]),
        });
        Ok(())
    }

    /// Folds plain uniforms, assigns bindings and stamps them into the
    /// stage declarations. Returns the bind group layouts.
    pub(crate) fn plan(
        mut self,
        modules: &mut [StageModule],
        label: Option<&str>,
    ) -> Result<Vec<BindGroupLayout>> {
        self.merge(modules)?;
        self.assign_bindings();
        self.stamp(modules)?;
        self.layouts(label)
    }

    fn merge(&mut self, modules: &mut [StageModule]) -> Result<()> {
        // (group, visibility) -> folded record indices, in first-seen order.
        let mut buckets: Vec<((u32, ShaderStages), Vec<usize>)> = Vec::new();
        for (index, record) in self.records.iter().enumerate() {
            if !record.payload.is_foldable() {
                continue;
            }
            let key = (record.group, record.visibility);
            match buckets.iter_mut().find(|(k, _)| *k == key) {
                Some((_, members)) => members.push(index),
                None => buckets.push((key, vec![index])),
            }
        }

        let mut replacements: Vec<(usize, UniformRecord)> = Vec::new();
        for ((group, visibility), members) in &buckets {
            let suffix = bucket_suffix(*visibility);
            let type_name = format!("UniformGroup{group}{suffix}");
            let instance = format!("u_group{group}_{}", suffix.to_lowercase());

            let mut builder = Type::structure(&type_name).policy(LayoutPolicy::Std140);
            for &index in members {
                if let UniformPayload::Value { ty, .. } = &self.records[index].payload {
                    builder = builder.member(&self.records[index].name, ty.clone());
                }
            }
            let block_ty = builder.build();

            let mut decls = SmallVec::new();
            for stage in visibility.iter_stages() {
                let module = modules
                    .iter_mut()
                    .find(|m| m.stage == stage)
                    .ok_or_else(|| {
                        ShaderError::internal(format!("no {} stage to merge into", stage.name()))
                    })?;
                let block_var = Variable::with_details(
                    &instance,
                    block_ty.clone(),
                    DeclKind::Uniform,
                    Some(*group),
                    None,
                )
                .tagged(&[BLOCK_TAG]);

                let mut position = None;
                for &index in members {
                    let record = &self.records[index];
                    let var = record.decl(stage).ok_or_else(|| {
                        ShaderError::internal(format!(
                            "uniform '{}' has no declaration in the {} stage",
                            record.name,
                            stage.name()
                        ))
                    })?;
                    var.set_access_path(format!("{instance}.{}", record.name));
                    let at = find_decl(&module.globals, var).ok_or_else(|| {
                        ShaderError::internal(format!(
                            "declaration of uniform '{}' not found in the {} stage",
                            record.name,
                            stage.name()
                        ))
                    })?;
                    module.globals.remove(at);
                    position = Some(position.map_or(at, |p: usize| p.min(at)));
                }
                let at = position.unwrap_or(module.globals.len());
                let at = hoist_structs(&mut module.globals, at, &block_ty);
                module.globals.insert(
                    at,
                    Stmt::Declare {
                        var: block_var.clone(),
                        init: None,
                    },
                );
                module.globals.insert(at, Stmt::Struct(block_ty.clone()));
                decls.push((stage, block_var));
            }

            log::debug!(
                "merged {} uniform(s) into {type_name} (group {group}, {visibility:?})",
                members.len()
            );
            replacements.push((
                members[0],
                UniformRecord {
                    name: type_name,
                    group: *group,
                    binding: None,
                    visibility: *visibility,
                    payload: UniformPayload::Block { ty: block_ty },
                    decls,
                },
            ));
        }

        // Each block takes the slot of its first member; the other folded
        // records are dropped.
        let folded: Vec<usize> = buckets.iter().flat_map(|(_, m)| m.iter().copied()).collect();
        let mut merged = Vec::with_capacity(self.records.len());
        for (index, record) in std::mem::take(&mut self.records).into_iter().enumerate() {
            if let Some(pos) = replacements.iter().position(|(i, _)| *i == index) {
                merged.push(replacements.swap_remove(pos).1);
            } else if !folded.contains(&index) {
                merged.push(record);
            }
        }
        self.records = merged;
        Ok(())
    }

    fn assign_bindings(&mut self) {
        let mut counters: BTreeMap<u32, u32> = BTreeMap::new();
        for record in &mut self.records {
            let counter = counters.entry(record.group).or_insert(0);
            record.binding = Some(*counter);
            log::trace!(
                "binding '{}' -> group {} binding {}",
                record.name,
                record.group,
                *counter
            );
            *counter += 1;
        }
    }

    fn stamp(&self, modules: &[StageModule]) -> Result<()> {
        for record in &self.records {
            // A storage buffer written by one stage is read_write in all of them.
            if matches!(record.payload, UniformPayload::Storage { .. })
                && record.decls.iter().any(|(_, v)| v.is_writable())
            {
                for (_, var) in &record.decls {
                    var.mark_writable();
                }
            }
            for stage in record.visibility.iter_stages() {
                let module = modules.iter().find(|m| m.stage == stage);
                let var = record.decl(stage);
                let found = match (module, var) {
                    (Some(module), Some(var)) => find_decl(&module.globals, var).is_some(),
                    _ => false,
                };
                if !found {
                    return Err(ShaderError::internal(format!(
                        "binding '{}' could not be located in the {} stage",
                        record.name,
                        stage.name()
                    )));
                }
                if let Some(var) = var {
                    var.binding.set(record.binding);
                }
            }
        }
        Ok(())
    }

    fn layouts(&self, label: Option<&str>) -> Result<Vec<BindGroupLayout>> {
        let mut groups: BTreeMap<u32, Vec<BindingEntry>> = BTreeMap::new();
        for record in &self.records {
            let entry = BindingEntry::from_record(record)?;
            groups.entry(record.group).or_default().push(entry);
        }
        Ok(groups
            .into_iter()
            .map(|(group, mut entries)| {
                entries.sort_by_key(|e| e.binding);
                BindGroupLayout {
                    label: match label {
                        Some(label) => format!("{label}_group{group}"),
                        None => format!("group{group}"),
                    },
                    group,
                    entries,
                }
            })
            .collect())
    }
}

fn bucket_suffix(visibility: ShaderStages) -> &'static str {
    if visibility == ShaderStages::VERTEX {
        "Vertex"
    } else if visibility == ShaderStages::FRAGMENT {
        "Fragment"
    } else if visibility == ShaderStages::COMPUTE {
        "Compute"
    } else {
        "Shared"
    }
}

/// Moves the definitions of structs `block` depends on that sit at or after
/// `at` up to `at`, keeping their order. Returns the index just past them.
fn hoist_structs(globals: &mut Block, at: usize, block: &Type) -> usize {
    let mut deps = Vec::new();
    block.visit_structs(&mut |s| {
        if s != block {
            deps.push(s.clone());
        }
    });

    let mut moved = Vec::new();
    let mut index = at;
    while index < globals.len() {
        if matches!(&globals[index], Stmt::Struct(ty) if deps.contains(ty)) {
            moved.push(globals.remove(index));
        } else {
            index += 1;
        }
    }
    let count = moved.len();
    for (offset, stmt) in moved.into_iter().enumerate() {
        globals.insert(at + offset, stmt);
    }
    at + count
}

fn find_decl(globals: &[Stmt], var: &Variable) -> Option<usize> {
    globals
        .iter()
        .position(|s| matches!(s, Stmt::Declare { var: v, .. } if v.ptr_eq(var)))
}

// ============================================================================
// Layout Descriptors
// ============================================================================

/// Kind of resource bound at a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Buffer,
    StorageBuffer,
    Texture,
    StorageTexture,
    ExternalTexture,
    Sampler,
}

/// Memory layout of a buffer binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BufferLayout {
    pub policy: LayoutPolicy,
    /// Minimum binding size in bytes.
    pub size: u32,
    pub align: u32,
    pub dynamic_offset: bool,
    pub read_only: bool,
    pub members: Vec<MemberLayout>,
}

impl BufferLayout {
    fn new(name: &str, ty: &Type, policy: LayoutPolicy, dynamic_offset: bool, read_only: bool) -> Result<Self> {
        let (size, align, members) = if ty.is_struct() {
            let layout = ty.struct_layout(policy)?;
            (layout.size, layout.align, layout.members)
        } else {
            let layout = ty.layout(policy)?;
            let member = MemberLayout {
                name: name.to_string(),
                offset: 0,
                size: layout.size,
                align: layout.align,
            };
            (layout.size, layout.align, vec![member])
        };
        Ok(Self {
            policy,
            size,
            align,
            dynamic_offset,
            read_only,
            members,
        })
    }
}

/// One binding of a bind group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BindingEntry {
    pub binding: u32,
    pub visibility: ShaderStages,
    pub resource_kind: ResourceKind,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer_layout: Option<BufferLayout>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub texture: Option<TextureType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampler: Option<SamplerKind>,
}

impl BindingEntry {
    fn from_record(record: &UniformRecord) -> Result<Self> {
        let binding = record.binding.ok_or_else(|| {
            ShaderError::internal(format!("binding '{}' was never assigned", record.name))
        })?;
        let mut entry = Self {
            binding,
            visibility: record.visibility,
            resource_kind: ResourceKind::Buffer,
            name: record.name.clone(),
            buffer_layout: None,
            texture: None,
            sampler: None,
        };
        match &record.payload {
            UniformPayload::Block { ty } => {
                entry.buffer_layout = Some(BufferLayout::new(
                    &record.name,
                    ty,
                    LayoutPolicy::Std140,
                    false,
                    true,
                )?);
            }
            UniformPayload::Value { ty, dynamic } => {
                entry.buffer_layout = Some(BufferLayout::new(
                    &record.name,
                    ty,
                    LayoutPolicy::Std140,
                    *dynamic,
                    true,
                )?);
            }
            UniformPayload::Storage { ty } => {
                let written = record.decls.iter().any(|(_, v)| v.is_writable());
                entry.resource_kind = ResourceKind::StorageBuffer;
                entry.buffer_layout = Some(BufferLayout::new(
                    &record.name,
                    ty,
                    LayoutPolicy::Std430,
                    false,
                    !written,
                )?);
            }
            UniformPayload::Texture(texture) => {
                entry.resource_kind = match texture.class {
                    TextureClass::Storage { .. } => ResourceKind::StorageTexture,
                    TextureClass::External => ResourceKind::ExternalTexture,
                    _ => ResourceKind::Texture,
                };
                entry.texture = Some(*texture);
            }
            UniformPayload::Sampler(kind) => {
                entry.resource_kind = ResourceKind::Sampler;
                entry.sampler = Some(*kind);
            }
        }
        Ok(entry)
    }
}

/// All bindings of one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BindGroupLayout {
    pub label: String,
    pub group: u32,
    pub entries: Vec<BindingEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(name: &str, ty: Type) -> Variable {
        Variable::with_details(name, ty, DeclKind::Uniform, Some(0), None)
    }

    #[test]
    fn redeclaring_in_another_stage_widens_visibility() {
        let mut table = UniformTable::default();
        let payload = || UniformPayload::Value {
            ty: Type::f32(),
            dynamic: false,
        };
        table
            .register("time", 0, ShaderStage::Vertex, payload(), &uniform("time", Type::f32()))
            .unwrap();
        table
            .register("time", 0, ShaderStage::Fragment, payload(), &uniform("time", Type::f32()))
            .unwrap();
        assert_eq!(table.records().len(), 1);
        assert_eq!(table.records()[0].visibility, ShaderStages::VERTEX_FRAGMENT);
    }

    #[test]
    fn member_structs_move_above_the_block() {
        let pair = Type::structure("Pair")
            .member("a", Type::f32())
            .member("b", Type::f32())
            .build();
        let block = Type::structure("UniformGroup0Fragment")
            .member("time", Type::f32())
            .member("pair", pair.clone())
            .build();
        let other = Type::structure("Other").member("x", Type::f32()).build();
        let mut globals = vec![
            Stmt::Struct(other.clone()),
            Stmt::Struct(pair.clone()),
        ];
        let at = hoist_structs(&mut globals, 0, &block);
        assert_eq!(at, 1);
        assert!(matches!(&globals[0], Stmt::Struct(t) if *t == pair));
        assert!(matches!(&globals[1], Stmt::Struct(t) if *t == other));
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let mut table = UniformTable::default();
        table
            .register(
                "time",
                0,
                ShaderStage::Vertex,
                UniformPayload::Value { ty: Type::f32(), dynamic: false },
                &uniform("time", Type::f32()),
            )
            .unwrap();
        let err = table
            .register(
                "time",
                0,
                ShaderStage::Fragment,
                UniformPayload::Value { ty: Type::vec2f(), dynamic: false },
                &uniform("time", Type::vec2f()),
            )
            .unwrap_err();
        assert!(matches!(err, ShaderError::TypeCast { .. }));
    }
}
