//! # Myth Shader
//!
//! A shader description compiler. Host code describes a program once
//! through [`StageBuilder`] calls; the compiler type-checks the description
//! and emits GLSL ES 1.00, GLSL ES 3.00 or WGSL, together with the binding
//! layouts the graphics backend needs to create the pipeline.
//!
//! ## Modules
//!
//! - [`types`]: type descriptors, per-dialect names and memory layouts
//! - [`ast`]: the typed expression/statement tree
//! - [`builtins`]: builtin function overloads and per-dialect rewrites
//! - [`builder`]: the build session and the stage DSL
//! - [`uniforms`]: uniform block merging and binding assignment
//! - [`emit`]: source emission
//!
//! ## Example
//!
//! ```rust,ignore
//! use myth_shader::prelude::*;
//!
//! let mut builder = ProgramBuilder::new();
//! let program = builder.build_render(
//!     &ProgramOptions::new(Dialect::Wgsl),
//!     |vs| {
//!         let position = vs.input("position", Type::vec3f())?;
//!         vs.main(|b| {
//!             let clip = b.construct(Type::vec4f(), &[position.clone(), b.lit(1.0)])?;
//!             let out = b.builtin(BuiltinVar::Position)?;
//!             b.assign(&out, &clip)
//!         })
//!     },
//!     |fs| {
//!         let tint = fs.uniform("tint", Type::vec4f(), 0)?;
//!         let color = fs.output("color", Type::vec4f())?;
//!         fs.main(|b| b.assign(&color, &tint))
//!     },
//! )?;
//! println!("{}", program.source(ShaderStage::Fragment).unwrap_or_default());
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod ast;
pub mod builder;
pub mod builtins;
pub mod dialect;
pub mod emit;
pub mod errors;
pub mod program;
pub mod scope;
pub mod types;
pub mod uniforms;
pub mod utils;

pub use builder::{FnParam, Phase, ProgramBuilder, StageBuilder};
pub use dialect::{DeviceCaps, Dialect, ShaderStage, ShaderStages};
pub use errors::{ErrorKind, ErrorReport, Result, ShaderError};
pub use program::{CompiledProgram, ProgramOptions};

/// Everything a host needs to describe and build programs.
pub mod prelude {
    pub use crate::ast::{BinaryOp, BuiltinVar, Expr, IntoExpr, UnaryOp};
    pub use crate::builder::{FnParam, Phase, ProgramBuilder, StageBuilder};
    pub use crate::dialect::{DeviceCaps, Dialect, ShaderStage, ShaderStages};
    pub use crate::errors::{ErrorKind, ErrorReport, Result, ShaderError};
    pub use crate::program::{CompiledProgram, IndexFormat, ProgramOptions, VertexAttributeSlot};
    pub use crate::types::{
        AddressSpace, LayoutPolicy, SamplerKind, ScalarKind, StorageAccess, StorageFormat,
        TextureDim, TextureType, Type,
    };
    pub use crate::uniforms::{BindGroupLayout, BindingEntry, ResourceKind};
}
