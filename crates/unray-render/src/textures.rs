//! Data and lookup table textures.
//!
//! Data textures pack one item per texel in row-major order and are read
//! with `textureLoad`. Items of 3 scalars are padded to 4 channels, and
//! texels past the end of the array are zero. Lookup tables are 16-bit
//! float so that they can be sampled with linear filtering.

use std::sync::Arc;

use unray_core::{ArrayTextureSpec, DType, LutTextureSpec, ResourceBackend, TypedArray};

use crate::error::{RenderError, RenderResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TexelKind {
    Float32,
    Sint32,
    Float16,
}

/// Texel format of a texture and how items are packed into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TexelLayout {
    pub format: wgpu::TextureFormat,
    /// Channels per texel after padding.
    pub channels: u32,
    kind: TexelKind,
}

/// Returns the texel channel count holding items of `item_size` scalars.
pub fn padded_channels(item_size: u32) -> RenderResult<u32> {
    match item_size {
        1 | 2 => Ok(item_size),
        3 | 4 => Ok(4),
        _ => Err(RenderError::UnsupportedItemSize(item_size)),
    }
}

impl TexelLayout {
    /// Returns the layout of a data texture.
    ///
    /// Integer element types are uploaded as signed 32-bit texels.
    pub fn data(dtype: DType, item_size: u32) -> RenderResult<Self> {
        use wgpu::TextureFormat as F;
        let channels = padded_channels(item_size)?;
        let (kind, format) = match (dtype.is_integer(), channels) {
            (false, 1) => (TexelKind::Float32, F::R32Float),
            (false, 2) => (TexelKind::Float32, F::Rg32Float),
            (false, _) => (TexelKind::Float32, F::Rgba32Float),
            (true, 1) => (TexelKind::Sint32, F::R32Sint),
            (true, 2) => (TexelKind::Sint32, F::Rg32Sint),
            (true, _) => (TexelKind::Sint32, F::Rgba32Sint),
        };
        Ok(Self {
            format,
            channels,
            kind,
        })
    }

    /// Returns the layout of a lookup table texture.
    pub fn lut(item_size: u32) -> RenderResult<Self> {
        use wgpu::TextureFormat as F;
        let channels = padded_channels(item_size)?;
        let format = match channels {
            1 => F::R16Float,
            2 => F::Rg16Float,
            _ => F::Rgba16Float,
        };
        Ok(Self {
            format,
            channels,
            kind: TexelKind::Float16,
        })
    }

    /// Returns the size of one texel in bytes.
    pub fn bytes_per_texel(&self) -> u32 {
        let scalar = match self.kind {
            TexelKind::Float32 | TexelKind::Sint32 => 4,
            TexelKind::Float16 => 2,
        };
        scalar * self.channels
    }

    /// Packs `array` into `texel_count` texels of `item_size` scalars each.
    pub fn pack(&self, array: &TypedArray, item_size: u32, texel_count: usize) -> Vec<u8> {
        match self.kind {
            TexelKind::Float32 => {
                let texels = self.pad(&array.to_f32_vec(), item_size, texel_count, 0.0);
                bytemuck::cast_slice(&texels).to_vec()
            }
            TexelKind::Sint32 => {
                let texels = self.pad(&array.to_i32_vec(), item_size, texel_count, 0);
                bytemuck::cast_slice(&texels).to_vec()
            }
            TexelKind::Float16 => {
                let texels: Vec<u16> = self
                    .pad(&array.to_f32_vec(), item_size, texel_count, 0.0)
                    .into_iter()
                    .map(|v| half::f16::from_f32(v).to_bits())
                    .collect();
                bytemuck::cast_slice(&texels).to_vec()
            }
        }
    }

    fn pad<T: Copy>(&self, values: &[T], item_size: u32, texel_count: usize, zero: T) -> Vec<T> {
        let item_size = (item_size as usize).max(1);
        let channels = self.channels as usize;
        let mut texels = vec![zero; texel_count * channels];
        for (texel, item) in texels.chunks_mut(channels).zip(values.chunks(item_size)) {
            let n = item.len().min(channels);
            texel[..n].copy_from_slice(&item[..n]);
        }
        texels
    }
}

/// Checks a texture shape against the device limit.
pub fn check_extent(shape: [u32; 2], max_dimension: u32) -> RenderResult<()> {
    if shape[0] == 0 || shape[1] == 0 {
        return Err(RenderError::TextureCreationFailed(format!(
            "empty texture shape {shape:?}"
        )));
    }
    if shape[0] > max_dimension || shape[1] > max_dimension {
        return Err(RenderError::TextureCreationFailed(format!(
            "texture shape {shape:?} exceeds device limit {max_dimension}"
        )));
    }
    Ok(())
}

/// Returns the layout of a data texture after checking it fits the device.
pub fn check_array(spec: &ArrayTextureSpec, max_dimension: u32) -> RenderResult<TexelLayout> {
    let layout = TexelLayout::data(spec.dtype, spec.item_size)?;
    check_extent(spec.shape, max_dimension)?;
    Ok(layout)
}

/// Returns the layout of a lookup table after checking it fits the device.
///
/// Lookup tables are a single texel row, so their length is bounded by the
/// 2D texture dimension limit.
pub fn check_lut(spec: &LutTextureSpec, max_dimension: u32) -> RenderResult<TexelLayout> {
    let layout = TexelLayout::lut(spec.item_size)?;
    check_extent(spec.shape(), max_dimension)?;
    Ok(layout)
}

/// A texture owned by a resource cache.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    /// Present on lookup tables only.
    pub sampler: Option<wgpu::Sampler>,
    pub layout: TexelLayout,
    pub shape: [u32; 2],
}

impl GpuTexture {
    fn new(
        device: &wgpu::Device,
        label: &str,
        layout: TexelLayout,
        shape: [u32; 2],
        sampler: Option<wgpu::Sampler>,
    ) -> RenderResult<Self> {
        check_extent(shape, device.limits().max_texture_dimension_2d)?;
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(shape),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: layout.format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(Self {
            texture,
            view,
            sampler,
            layout,
            shape,
        })
    }

    /// Returns true if new content of this layout and shape fits in place.
    pub fn fits(&self, layout: TexelLayout, shape: [u32; 2]) -> bool {
        self.layout == layout && self.shape == shape
    }

    fn write(&self, queue: &wgpu::Queue, array: &TypedArray, item_size: u32) {
        let [width, height] = self.shape;
        let data = self
            .layout
            .pack(array, item_size, width as usize * height as usize);
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * self.layout.bytes_per_texel()),
                rows_per_image: Some(height),
            },
            extent(self.shape),
        );
    }
}

fn extent(shape: [u32; 2]) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: shape[0].max(1),
        height: shape[1].max(1),
        depth_or_array_layers: 1,
    }
}

/// Data texture backend.
pub struct WgpuArrayTextures {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
}

impl WgpuArrayTextures {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        Self { device, queue }
    }
}

impl ResourceBackend for WgpuArrayTextures {
    type Spec = ArrayTextureSpec;
    type Resource = GpuTexture;
    type Error = RenderError;

    fn validate(&self, spec: &ArrayTextureSpec) -> RenderResult<()> {
        check_array(spec, self.device.limits().max_texture_dimension_2d).map(|_| ())
    }

    fn create(&mut self, spec: &ArrayTextureSpec) -> RenderResult<GpuTexture> {
        let layout = TexelLayout::data(spec.dtype, spec.item_size)?;
        log::debug!(
            "creating {:?} data texture of shape {:?}",
            layout.format,
            spec.shape
        );
        let texture =
            GpuTexture::new(&self.device, "unray data texture", layout, spec.shape, None)?;
        texture.write(&self.queue, &spec.array, spec.item_size);
        Ok(texture)
    }

    fn update(&mut self, resource: &mut GpuTexture, spec: &ArrayTextureSpec) -> RenderResult<()> {
        let layout = TexelLayout::data(spec.dtype, spec.item_size)?;
        if resource.fits(layout, spec.shape) {
            resource.write(&self.queue, &spec.array, spec.item_size);
        } else {
            let stale = std::mem::replace(resource, self.create(spec)?);
            stale.texture.destroy();
        }
        Ok(())
    }

    fn evict(&mut self, resource: GpuTexture) {
        log::debug!("releasing data texture of shape {:?}", resource.shape);
        resource.texture.destroy();
    }
}

/// Lookup table texture backend.
pub struct WgpuLutTextures {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
}

impl WgpuLutTextures {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        Self { device, queue }
    }

    fn sampler(&self) -> wgpu::Sampler {
        self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("unray lut sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        })
    }
}

impl ResourceBackend for WgpuLutTextures {
    type Spec = LutTextureSpec;
    type Resource = GpuTexture;
    type Error = RenderError;

    fn validate(&self, spec: &LutTextureSpec) -> RenderResult<()> {
        check_lut(spec, self.device.limits().max_texture_dimension_2d).map(|_| ())
    }

    fn create(&mut self, spec: &LutTextureSpec) -> RenderResult<GpuTexture> {
        let layout = TexelLayout::lut(spec.item_size)?;
        let shape = spec.shape();
        log::debug!("creating lut texture of {} entries", shape[0]);
        let texture = GpuTexture::new(
            &self.device,
            "unray lut texture",
            layout,
            shape,
            Some(self.sampler()),
        )?;
        texture.write(&self.queue, &spec.array, spec.item_size);
        Ok(texture)
    }

    fn update(&mut self, resource: &mut GpuTexture, spec: &LutTextureSpec) -> RenderResult<()> {
        let layout = TexelLayout::lut(spec.item_size)?;
        if resource.fits(layout, spec.shape()) {
            resource.write(&self.queue, &spec.array, spec.item_size);
        } else {
            let stale = std::mem::replace(resource, self.create(spec)?);
            stale.texture.destroy();
        }
        Ok(())
    }

    fn evict(&mut self, resource: GpuTexture) {
        resource.texture.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_data_formats() {
        use wgpu::TextureFormat as F;
        let cases = [
            (DType::Float32, 1, F::R32Float),
            (DType::Float64, 2, F::Rg32Float),
            (DType::Float32, 3, F::Rgba32Float),
            (DType::Float32, 4, F::Rgba32Float),
            (DType::Int32, 1, F::R32Sint),
            (DType::Uint8, 2, F::Rg32Sint),
            (DType::Uint32, 4, F::Rgba32Sint),
        ];
        for (dtype, item_size, format) in cases {
            assert_eq!(TexelLayout::data(dtype, item_size).unwrap().format, format);
        }
    }

    #[test]
    fn test_unsupported_item_sizes() {
        for item_size in [0, 5, 16] {
            assert!(matches!(
                TexelLayout::data(DType::Float32, item_size),
                Err(RenderError::UnsupportedItemSize(n)) if n == item_size
            ));
            assert!(TexelLayout::lut(item_size).is_err());
        }
    }

    #[test]
    fn test_vec3_items_are_padded() {
        let layout = TexelLayout::data(DType::Float32, 3).unwrap();
        let array = TypedArray::from(vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let bytes = layout.pack(&array, 3, 3);
        let texels: &[f32] = bytemuck::cast_slice(&bytes);
        assert_eq!(
            texels,
            &[1.0, 2.0, 3.0, 0.0, 4.0, 5.0, 6.0, 0.0, 0.0, 0.0, 0.0, 0.0]
        );
        assert_eq!(layout.bytes_per_texel(), 16);
    }

    #[test]
    fn test_integer_cells_pack_as_sint() {
        let layout = TexelLayout::data(DType::Uint32, 4).unwrap();
        let array = TypedArray::from(vec![0u32, 1, 2, 3]);
        let bytes = layout.pack(&array, 4, 2);
        let texels: &[i32] = bytemuck::cast_slice(&bytes);
        assert_eq!(texels, &[0, 1, 2, 3, 0, 0, 0, 0]);
    }

    #[test]
    fn test_lut_packs_half_floats() {
        let layout = TexelLayout::lut(3).unwrap();
        assert_eq!(layout.format, wgpu::TextureFormat::Rgba16Float);
        assert_eq!(layout.bytes_per_texel(), 8);
        let array = TypedArray::from(vec![0.5f32, 1.0, 0.25]);
        let bytes = layout.pack(&array, 3, 1);
        let bits: &[u16] = bytemuck::cast_slice(&bytes);
        let values: Vec<f32> = bits.iter().map(|&b| half::f16::from_bits(b).to_f32()).collect();
        assert_eq!(values, vec![0.5, 1.0, 0.25, 0.0]);
    }

    #[test]
    fn test_check_extent() {
        assert!(check_extent([4, 2], 8192).is_ok());
        assert!(check_extent([0, 1], 8192).is_err());
        assert!(matches!(
            check_extent([16384, 1], 8192),
            Err(RenderError::TextureCreationFailed(_))
        ));
    }

    #[test]
    fn test_long_lut_exceeds_row_limit() {
        let lut = |len: usize| LutTextureSpec {
            array: TypedArray::from(vec![0.5f32; len * 4]),
            item_size: 4,
        };
        assert_eq!(
            check_lut(&lut(8192), 8192).unwrap().format,
            wgpu::TextureFormat::Rgba16Float
        );
        assert!(matches!(
            check_lut(&lut(16384), 8192),
            Err(RenderError::TextureCreationFailed(_))
        ));
        let wide = LutTextureSpec {
            array: TypedArray::from(vec![0.5f32; 10]),
            item_size: 5,
        };
        assert!(matches!(
            check_lut(&wide, 8192),
            Err(RenderError::UnsupportedItemSize(5))
        ));
    }

    #[test]
    fn test_array_spec_checks() {
        let spec = ArrayTextureSpec {
            array: TypedArray::from(vec![0i32; 8]),
            dtype: DType::Int32,
            item_size: 4,
            shape: [1, 2],
        };
        assert_eq!(
            check_array(&spec, 8192).unwrap().format,
            wgpu::TextureFormat::Rgba32Sint
        );
        let tall = ArrayTextureSpec {
            shape: [1, 9000],
            ..spec.clone()
        };
        assert!(check_array(&tall, 8192).is_err());
        let wide = ArrayTextureSpec {
            item_size: 6,
            ..spec
        };
        assert!(matches!(
            check_array(&wide, 8192),
            Err(RenderError::UnsupportedItemSize(6))
        ));
    }

    proptest! {
        #[test]
        fn prop_packed_size_matches_texel_count(
            item_size in 1u32..=4,
            items in 0usize..64,
            extra in 0usize..8,
        ) {
            let layout = TexelLayout::data(DType::Float32, item_size).unwrap();
            let array = TypedArray::from(vec![1.0f32; items * item_size as usize]);
            let texel_count = items + extra;
            let bytes = layout.pack(&array, item_size, texel_count);
            prop_assert_eq!(bytes.len(), texel_count * layout.bytes_per_texel() as usize);
        }
    }
}
