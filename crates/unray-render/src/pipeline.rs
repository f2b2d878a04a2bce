//! Conversion of method render state into wgpu pipeline state.

use std::collections::HashMap;

use unray_core::{
    AutomaticUniforms, Blend, BlendEquation, BlendFactor, Method, MethodConfig, ShaderConfig, Side,
};

use crate::buffer::create_uniform_buffer;

/// Maps a blend factor.
pub fn blend_factor(factor: BlendFactor) -> wgpu::BlendFactor {
    match factor {
        BlendFactor::Zero => wgpu::BlendFactor::Zero,
        BlendFactor::One => wgpu::BlendFactor::One,
        BlendFactor::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
        BlendFactor::OneMinusSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
    }
}

/// Maps a blend equation.
pub fn blend_operation(equation: BlendEquation) -> wgpu::BlendOperation {
    match equation {
        BlendEquation::Add => wgpu::BlendOperation::Add,
        BlendEquation::Min => wgpu::BlendOperation::Min,
        BlendEquation::Max => wgpu::BlendOperation::Max,
    }
}

/// Returns the blend state of a method, `None` for opaque methods.
///
/// Color and alpha blend alike.
pub fn blend_state(config: &MethodConfig) -> Option<wgpu::BlendState> {
    config.blend.map(|Blend { equation, src, dst }| {
        let component = wgpu::BlendComponent {
            src_factor: blend_factor(src),
            dst_factor: blend_factor(dst),
            operation: blend_operation(equation),
        };
        wgpu::BlendState {
            color: component,
            alpha: component,
        }
    })
}

/// Returns the faces culled to rasterize the visible side.
pub fn cull_mode(side: Side) -> Option<wgpu::Face> {
    match side {
        Side::Front => Some(wgpu::Face::Back),
        Side::Back => Some(wgpu::Face::Front),
        Side::Double => None,
    }
}

/// Primitive state drawing the tetrahedron strip.
pub fn primitive_state(config: &MethodConfig) -> wgpu::PrimitiveState {
    wgpu::PrimitiveState {
        topology: wgpu::PrimitiveTopology::TriangleStrip,
        strip_index_format: Some(wgpu::IndexFormat::Uint32),
        front_face: wgpu::FrontFace::Ccw,
        cull_mode: cull_mode(config.side),
        ..Default::default()
    }
}

pub fn depth_stencil_state(
    config: &MethodConfig,
    format: wgpu::TextureFormat,
) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format,
        depth_write_enabled: config.depth_write,
        depth_compare: if config.depth_test {
            wgpu::CompareFunction::LessEqual
        } else {
            wgpu::CompareFunction::Always
        },
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

pub fn color_target_state(
    config: &MethodConfig,
    format: wgpu::TextureFormat,
) -> wgpu::ColorTargetState {
    wgpu::ColorTargetState {
        format,
        blend: blend_state(config),
        write_mask: wgpu::ColorWrites::ALL,
    }
}

/// Converts the defines of a compiled configuration into values for
/// pipeline-overridable constants.
pub fn override_constants(config: &ShaderConfig) -> HashMap<String, f64> {
    config
        .defines
        .iter()
        .map(|(name, &value)| (name.clone(), f64::from(value)))
        .collect()
}

/// Fixed-function state of a method for given target formats.
#[derive(Debug, Clone)]
pub struct RenderState {
    pub primitive: wgpu::PrimitiveState,
    pub depth_stencil: wgpu::DepthStencilState,
    pub color_target: wgpu::ColorTargetState,
    pub clear_color: wgpu::Color,
}

impl RenderState {
    pub fn new(
        method: Method,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
    ) -> Self {
        let config = method.config();
        let background = method.background_color();
        Self {
            primitive: primitive_state(&config),
            depth_stencil: depth_stencil_state(&config, depth_format),
            color_target: color_target_state(&config, color_format),
            clear_color: wgpu::Color {
                r: f64::from(background.x),
                g: f64::from(background.y),
                b: f64::from(background.z),
                a: 1.0,
            },
        }
    }
}

/// Uniform buffer holding the automatic per-frame uniforms.
pub struct FrameUniformBuffer {
    pub buffer: wgpu::Buffer,
}

impl FrameUniformBuffer {
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            buffer: create_uniform_buffer(
                device,
                &AutomaticUniforms::default(),
                Some("unray frame uniforms"),
            ),
        }
    }

    pub fn write(&self, queue: &wgpu::Queue, uniforms: &AutomaticUniforms) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(uniforms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unray_core::shader::{CELL_ORDERING_DEFINE, PERSPECTIVE_DEFINE};

    #[test]
    fn test_opaque_methods_do_not_blend() {
        let state = RenderState::new(
            Method::Surface,
            wgpu::TextureFormat::Rgba8Unorm,
            wgpu::TextureFormat::Depth32Float,
        );
        assert!(state.color_target.blend.is_none());
        assert!(state.depth_stencil.depth_write_enabled);
        assert_eq!(state.primitive.cull_mode, Some(wgpu::Face::Back));
        assert_eq!(state.primitive.front_face, wgpu::FrontFace::Ccw);
        assert_eq!(state.clear_color, wgpu::Color::WHITE);
    }

    #[test]
    fn test_max_blending() {
        let blend = blend_state(&Method::Max.config()).unwrap();
        assert_eq!(blend.color.operation, wgpu::BlendOperation::Max);
        assert_eq!(blend.color.src_factor, wgpu::BlendFactor::One);
        assert_eq!(blend.color.dst_factor, wgpu::BlendFactor::One);
        assert_eq!(blend.alpha, blend.color);
    }

    #[test]
    fn test_volume_blending() {
        let state = RenderState::new(
            Method::Volume,
            wgpu::TextureFormat::Rgba8Unorm,
            wgpu::TextureFormat::Depth32Float,
        );
        let blend = state.color_target.blend.unwrap();
        assert_eq!(blend.color.operation, wgpu::BlendOperation::Add);
        assert_eq!(blend.color.dst_factor, wgpu::BlendFactor::OneMinusSrcAlpha);
        assert!(!state.depth_stencil.depth_write_enabled);
        assert_eq!(state.depth_stencil.depth_compare, wgpu::CompareFunction::LessEqual);
    }

    #[test]
    fn test_sum_clears_to_black() {
        let state = RenderState::new(
            Method::Sum,
            wgpu::TextureFormat::Rgba8Unorm,
            wgpu::TextureFormat::Depth32Float,
        );
        assert_eq!(state.clear_color, wgpu::Color::BLACK);
    }

    #[test]
    fn test_cull_modes() {
        assert_eq!(cull_mode(Side::Back), Some(wgpu::Face::Front));
        assert_eq!(cull_mode(Side::Double), None);
    }

    #[test]
    fn test_override_constants() {
        let mut config = ShaderConfig::default();
        config.defines.insert(CELL_ORDERING_DEFINE.to_string(), 1);
        config.defines.insert(PERSPECTIVE_DEFINE.to_string(), 1);
        let constants = override_constants(&config);
        assert_eq!(constants.len(), 2);
        assert_eq!(constants[CELL_ORDERING_DEFINE], 1.0);
    }
}
