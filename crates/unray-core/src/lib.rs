//! Core of unray, volume rendering of fields on tetrahedral meshes.
//!
//! This crate has no graphics API dependency. It provides:
//! - [`TetMesh`] with orientation normalization and bounding geometry
//! - [`compute_texture_shape`] packing arrays into 2D data textures
//! - [`ResourceManager`], a keyed reference-counted cache behind the
//!   [`ResourceBackend`] seam where a GPU backend plugs in
//! - the encoding model ([`PartialEncoding`], [`Encoding`]) and the channel
//!   compiler producing a [`ShaderConfig`]
//! - visibility sorting of cells and the per-method render state
//! - [`Session`], tying the above together for one mesh

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Accessors and builder patterns don't need must_use
#![allow(clippy::must_use_candidate)]
// Texture shapes and cell indices are u32 on the GPU side
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]

pub mod compiler;
pub mod data;
pub mod encoding;
pub mod error;
pub mod frame;
pub mod mesh;
pub mod method;
pub mod resource;
pub mod scale;
pub mod session;
pub mod shader;
pub mod sorting;
pub mod texture_shape;

pub use compiler::{compile, compile_encoding, release, ShaderDelta};
pub use data::{DType, PlotData, Space, TypedArray};
pub use encoding::{
    Channel, ChannelDescriptor, Color, Domain, Encoding, IsovalueMode, LogBase, Method,
    PartialEncoding, Scale,
};
pub use error::{Result, UnrayError};
pub use frame::{AutomaticUniforms, Camera, FrameState, ProjectionMode};
pub use mesh::{
    apply_orientations, compute_bounding_box, compute_bounding_sphere, compute_orientations,
    copy_reoriented, BoundingBox, BoundingSphere, TetMesh,
};
pub use method::{method_config, Blend, BlendEquation, BlendFactor, MethodConfig, Side};
pub use resource::{
    ArrayTextureSpec, InstanceBufferSpec, LutTextureSpec, ResourceBackend, ResourceId,
    ResourceKey, ResourceKind, ResourceManager, ResourceManagers, TextureHandle, TexturePool,
};
pub use session::{FrameUpdate, Session, SessionOptions};
pub use shader::{ShaderConfig, UniformValue};
pub use sorting::{sort_cells, sort_cells_by, SortOrder};
pub use texture_shape::compute_texture_shape;

// Re-export glam types for convenience
pub use glam::{Mat4, UVec2, Vec2, Vec3, Vec4};
