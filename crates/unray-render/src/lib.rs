//! wgpu backend for unray.
//!
//! Implements the resource cache backends of `unray-core` on top of wgpu
//! and converts method render state into pipeline state. Shaders bind the
//! compiled configuration as follows:
//! - data textures and lookup tables from [`WgpuArrayTextures`] and
//!   [`WgpuLutTextures`]
//! - instance attributes from [`WgpuInstanceBuffers`]
//! - defines as pipeline-overridable constants ([`override_constants`])

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]

pub mod buffer;
pub mod context;
pub mod error;
pub mod geometry;
pub mod pipeline;
pub mod textures;

pub use buffer::{GpuBuffer, WgpuInstanceBuffers};
pub use context::GpuContext;
pub use error::{RenderError, RenderResult};
pub use geometry::{TetrahedronGeometry, TETRAHEDRON_STRIP};
pub use pipeline::{override_constants, FrameUniformBuffer, RenderState};
pub use textures::{GpuTexture, TexelLayout, WgpuArrayTextures, WgpuLutTextures};

use unray_core::ResourceManagers;

/// Resource caches backed by wgpu.
pub type WgpuManagers = ResourceManagers<WgpuArrayTextures, WgpuLutTextures, WgpuInstanceBuffers>;

/// Creates empty resource caches on a device.
pub fn create_managers(context: &GpuContext) -> WgpuManagers {
    ResourceManagers::new(
        WgpuArrayTextures::new(context.device.clone(), context.queue.clone()),
        WgpuLutTextures::new(context.device.clone(), context.queue.clone()),
        WgpuInstanceBuffers::new(context.device.clone(), context.queue.clone()),
    )
}
