//! Shader program configuration produced by the channel compiler.

use std::collections::BTreeMap;

use glam::{Mat4, UVec2, Vec2, Vec3, Vec4};

use crate::resource::{ResourceId, TextureHandle};

/// Uniforms the per-frame hook fills in, not the compiler.
pub const AUTOMATIC_UNIFORMS: [&str; 5] = [
    "u_time",
    "u_oscillators",
    "u_local_view_direction",
    "u_local_camera_position",
    "u_mvp_matrix",
];

/// Always-on flag enabling the instance ordering attribute.
pub const CELL_ORDERING_DEFINE: &str = "ENABLE_CELL_ORDERING";

/// Flag selecting perspective rather than orthographic view rays.
pub const PERSPECTIVE_DEFINE: &str = "ENABLE_PERSPECTIVE_PROJECTION";

/// Name of the per-instance cell ordering attribute.
pub const ORDERING_ATTRIBUTE: &str = "c_ordering";

/// The value of a shader uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec2(Vec2),
    /// Texel grid shapes.
    UVec2(UVec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
    Texture(TextureHandle),
}

impl UniformValue {
    /// Returns the float value, if this is a float uniform.
    pub fn as_float(&self) -> Option<f32> {
        match *self {
            UniformValue::Float(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the texture handle, if this is a texture uniform.
    pub fn as_texture(&self) -> Option<TextureHandle> {
        match *self {
            UniformValue::Texture(handle) => Some(handle),
            _ => None,
        }
    }
}

/// Returns the automatic uniforms at their rest values.
pub fn default_automatic_uniforms() -> BTreeMap<String, UniformValue> {
    [
        ("u_time", UniformValue::Float(0.0)),
        ("u_oscillators", UniformValue::Vec4(Vec4::ZERO)),
        ("u_local_view_direction", UniformValue::Vec3(Vec3::Z)),
        ("u_local_camera_position", UniformValue::Vec3(Vec3::ZERO)),
        ("u_mvp_matrix", UniformValue::Mat4(Mat4::IDENTITY)),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), value))
    .collect()
}

/// Uniforms, defines and instance attributes of one compiled encoding.
///
/// Every texture uniform and attribute holds one reference in its resource
/// manager, released with [`crate::compiler::release`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShaderConfig {
    pub uniforms: BTreeMap<String, UniformValue>,
    /// Present defines are always 1; absence means off.
    pub defines: BTreeMap<String, u32>,
    /// Instance buffers by attribute name.
    pub attributes: BTreeMap<String, ResourceId>,
}

impl ShaderConfig {
    /// Gets a uniform by name.
    pub fn uniform(&self, name: &str) -> Option<&UniformValue> {
        self.uniforms.get(name)
    }

    /// Gets a texture uniform by name.
    pub fn texture(&self, name: &str) -> Option<TextureHandle> {
        self.uniforms.get(name).and_then(UniformValue::as_texture)
    }

    /// Returns true if `name` is defined.
    pub fn has_define(&self, name: &str) -> bool {
        self.defines.contains_key(name)
    }

    /// Iterates over the texture uniforms.
    pub fn textures(&self) -> impl Iterator<Item = (&str, TextureHandle)> {
        self.uniforms
            .iter()
            .filter_map(|(name, value)| value.as_texture().map(|h| (name.as_str(), h)))
    }

    /// Returns the uniforms the compiler sets, without the automatic ones.
    pub fn compiled_uniforms(&self) -> BTreeMap<&str, &UniformValue> {
        self.uniforms
            .iter()
            .filter(|(name, _)| !AUTOMATIC_UNIFORMS.contains(&name.as_str()))
            .map(|(name, value)| (name.as_str(), value))
            .collect()
    }

    /// Returns the defines as preprocessor lines, sorted by name.
    pub fn define_lines(&self) -> Vec<String> {
        self.defines
            .iter()
            .map(|(name, value)| format!("#define {name} {value}"))
            .collect()
    }
}
