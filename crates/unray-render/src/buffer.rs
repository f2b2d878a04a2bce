//! GPU buffer management.

use std::sync::Arc;

use unray_core::{InstanceBufferSpec, ResourceBackend};
use wgpu::util::DeviceExt;

use crate::error::{RenderError, RenderResult};

/// Creates a vertex buffer from data.
pub fn create_vertex_buffer<T: bytemuck::Pod>(
    device: &wgpu::Device,
    data: &[T],
    label: Option<&str>,
) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label,
        contents: bytemuck::cast_slice(data),
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
    })
}

/// Creates an index buffer from data.
pub fn create_index_buffer(
    device: &wgpu::Device,
    data: &[u32],
    label: Option<&str>,
) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label,
        contents: bytemuck::cast_slice(data),
        usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
    })
}

/// Creates a uniform buffer from data.
pub fn create_uniform_buffer<T: bytemuck::Pod>(
    device: &wgpu::Device,
    data: &T,
    label: Option<&str>,
) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label,
        contents: bytemuck::bytes_of(data),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

/// Updates a buffer with new data.
pub fn update_buffer<T: bytemuck::Pod>(queue: &wgpu::Queue, buffer: &wgpu::Buffer, data: &[T]) {
    queue.write_buffer(buffer, 0, bytemuck::cast_slice(data));
}

/// Returns the vertex format of an instance attribute of `item_size` u32s.
pub fn instance_format(item_size: u32) -> RenderResult<wgpu::VertexFormat> {
    match item_size {
        1 => Ok(wgpu::VertexFormat::Uint32),
        2 => Ok(wgpu::VertexFormat::Uint32x2),
        3 => Ok(wgpu::VertexFormat::Uint32x3),
        4 => Ok(wgpu::VertexFormat::Uint32x4),
        _ => Err(RenderError::UnsupportedItemSize(item_size)),
    }
}

/// Checks an instance buffer against its vertex format and the device limit.
pub fn check_instance_buffer(spec: &InstanceBufferSpec, max_buffer_size: u64) -> RenderResult<()> {
    instance_format(spec.item_size)?;
    let size = std::mem::size_of_val(spec.data.as_slice()) as u64;
    if size > max_buffer_size {
        return Err(RenderError::BufferCreationFailed(format!(
            "{size} bytes exceed device limit {max_buffer_size}"
        )));
    }
    Ok(())
}

/// A per-instance vertex buffer owned by a resource cache.
pub struct GpuBuffer {
    pub buffer: wgpu::Buffer,
    /// Number of u32 values in the buffer.
    pub len: usize,
    pub item_size: u32,
}

impl GpuBuffer {
    /// Returns the number of instances the buffer holds.
    pub fn instance_count(&self) -> u32 {
        (self.len / (self.item_size as usize).max(1)) as u32
    }

    /// Returns the buffer layout binding the attribute at `location`.
    ///
    /// The attribute slice must outlive the layout, so callers own it.
    pub fn layout<'a>(
        &self,
        attributes: &'a [wgpu::VertexAttribute],
    ) -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: u64::from(self.item_size) * 4,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes,
        }
    }

    /// Returns the single attribute of this buffer at `location`.
    pub fn attribute(&self, location: u32) -> RenderResult<wgpu::VertexAttribute> {
        Ok(wgpu::VertexAttribute {
            format: instance_format(self.item_size)?,
            offset: 0,
            shader_location: location,
        })
    }
}

/// Instance buffer backend.
pub struct WgpuInstanceBuffers {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
}

impl WgpuInstanceBuffers {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        Self { device, queue }
    }
}

impl ResourceBackend for WgpuInstanceBuffers {
    type Spec = InstanceBufferSpec;
    type Resource = GpuBuffer;
    type Error = RenderError;

    fn validate(&self, spec: &InstanceBufferSpec) -> RenderResult<()> {
        check_instance_buffer(spec, self.device.limits().max_buffer_size)
    }

    fn create(&mut self, spec: &InstanceBufferSpec) -> RenderResult<GpuBuffer> {
        check_instance_buffer(spec, self.device.limits().max_buffer_size)?;
        log::debug!("creating instance buffer of {} values", spec.data.len());
        Ok(GpuBuffer {
            buffer: create_vertex_buffer(&self.device, &spec.data, Some("unray instance buffer")),
            len: spec.data.len(),
            item_size: spec.item_size,
        })
    }

    fn update(&mut self, resource: &mut GpuBuffer, spec: &InstanceBufferSpec) -> RenderResult<()> {
        if resource.len == spec.data.len() {
            instance_format(spec.item_size)?;
            update_buffer(&self.queue, &resource.buffer, &spec.data);
            resource.item_size = spec.item_size;
        } else {
            let stale = std::mem::replace(resource, self.create(spec)?);
            stale.buffer.destroy();
        }
        Ok(())
    }

    fn evict(&mut self, resource: GpuBuffer) {
        resource.buffer.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_formats() {
        assert_eq!(instance_format(1).unwrap(), wgpu::VertexFormat::Uint32);
        assert_eq!(instance_format(4).unwrap(), wgpu::VertexFormat::Uint32x4);
        assert!(matches!(
            instance_format(0),
            Err(RenderError::UnsupportedItemSize(0))
        ));
    }

    #[test]
    fn test_instance_buffer_checks() {
        let spec = InstanceBufferSpec {
            data: vec![0, 1, 2, 3],
            item_size: 1,
        };
        assert!(check_instance_buffer(&spec, 16).is_ok());
        assert!(matches!(
            check_instance_buffer(&spec, 8),
            Err(RenderError::BufferCreationFailed(_))
        ));
        let wide = InstanceBufferSpec {
            item_size: 5,
            ..spec
        };
        assert!(matches!(
            check_instance_buffer(&wide, 16),
            Err(RenderError::UnsupportedItemSize(5))
        ));
    }
}
