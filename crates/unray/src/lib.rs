//! unray: volume rendering of fields on tetrahedral meshes.
//!
//! A mesh and its fields are plotted through an *encoding*, a JSON-like
//! mapping from visual channels (density, emission, isovalues, ...) to
//! data fields, constants and scales. A [`Session`] compiles the encoding
//! into a [`ShaderConfig`] of uniforms, defines and instance attributes,
//! uploading arrays through reference-counted resource caches.
//!
//! # Quick Start
//!
//! ```no_run
//! use unray::*;
//!
//! fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     init();
//!     let context = headless_context()?;
//!     let mut session = create_session(&context, Method::Volume);
//!
//!     let data = PlotData::new()
//!         .with("cells", vec![0i32, 1, 2, 3])
//!         .with("points", vec![0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
//!         .with("density", vec![0.0f32, 1.0, 2.0, 3.0]);
//!     let encoding = parse_encoding(
//!         r#"{
//!             "cells": {"field": "cells"},
//!             "coordinates": {"field": "points"},
//!             "density": {"field": "density", "space": "P1"}
//!         }"#,
//!     )?;
//!     session.update(&encoding, data)?;
//!
//!     let mut camera = Camera::new(1.0);
//!     if let Some(bbox) = session.bounding_box() {
//!         camera.look_at_box(&bbox);
//!     }
//!     session.prerender(&FrameState::from_camera(&camera, Mat4::IDENTITY, 0.0))?;
//!     Ok(())
//! }
//! ```
//!
//! # Methods
//!
//! - `surface`: opaque shaded cell faces
//! - `isosurface`: opaque level sets of a field
//! - `xray`: absorption only
//! - `sum`, `max`, `min`: emission projections
//! - `volume`: absorption and emission

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub use unray_core::{
    compile, compute_texture_shape, release, ArrayTextureSpec, AutomaticUniforms, BoundingBox,
    BoundingSphere, Camera, Channel, ChannelDescriptor, Color, DType, Domain, Encoding,
    FrameState, FrameUpdate, InstanceBufferSpec, IsovalueMode, LogBase, LutTextureSpec, Method,
    MethodConfig, PartialEncoding, PlotData, ProjectionMode, ResourceBackend, ResourceId,
    ResourceKey, ResourceKind, ResourceManager, ResourceManagers, Result, Scale, Session,
    SessionOptions, ShaderConfig, SortOrder, Space, TetMesh, TypedArray, UniformValue,
    UnrayError,
};
pub use unray_core::{Mat4, UVec2, Vec2, Vec3, Vec4};

pub use unray_render::{
    create_managers, override_constants, GpuContext, RenderError, RenderResult, RenderState,
    TetrahedronGeometry, WgpuArrayTextures, WgpuInstanceBuffers, WgpuLutTextures, WgpuManagers,
};

pub use wgpu;

use pollster::FutureExt;

/// A session backed by wgpu resources.
pub type WgpuSession = Session<WgpuArrayTextures, WgpuLutTextures, WgpuInstanceBuffers>;

/// Installs the `env_logger` logger, configured by `RUST_LOG`.
///
/// Safe to call more than once; later calls do nothing.
pub fn init() {
    if env_logger::try_init().is_ok() {
        log::info!("unray initialized");
    }
}

/// Creates a device without a surface, blocking until it is ready.
pub fn headless_context() -> RenderResult<GpuContext> {
    GpuContext::new_headless().block_on()
}

/// Creates an empty session rendering with `method` on a device.
pub fn create_session(context: &GpuContext, method: Method) -> WgpuSession {
    Session::new(method, create_managers(context))
}

/// Creates an empty session with explicit options.
pub fn create_session_with_options(
    context: &GpuContext,
    method: Method,
    options: SessionOptions,
) -> WgpuSession {
    Session::with_options(method, create_managers(context), options)
}

/// Parses a JSON encoding.
pub fn parse_encoding(json: &str) -> Result<PartialEncoding> {
    json.parse()
}

/// Parses JSON session options, filling omitted fields with defaults.
pub fn parse_options(json: &str) -> Result<SessionOptions> {
    Ok(serde_json::from_str(json)?)
}
