//! Per-frame camera state and automatic uniforms.

use std::f32::consts::PI;

use glam::{Mat4, Vec3, Vec4};

use crate::mesh::BoundingBox;
use crate::shader::{ShaderConfig, UniformValue, PERSPECTIVE_DEFINE};

/// Camera projection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectionMode {
    /// Perspective projection.
    #[default]
    Perspective,
    /// Orthographic projection.
    Orthographic,
}

/// A look-at camera.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
    pub projection_mode: ProjectionMode,
    /// Half height of the orthographic view volume.
    pub ortho_scale: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: 45.0_f32.to_radians(),
            aspect_ratio: 16.0 / 9.0,
            near: 0.01,
            far: 1000.0,
            projection_mode: ProjectionMode::Perspective,
            ortho_scale: 1.0,
        }
    }
}

impl Camera {
    /// Creates a camera with the given aspect ratio.
    pub fn new(aspect_ratio: f32) -> Self {
        Self {
            aspect_ratio,
            ..Self::default()
        }
    }

    /// Returns the view matrix.
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Returns the projection matrix.
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        match self.projection_mode {
            ProjectionMode::Perspective => {
                Mat4::perspective_rh(self.fov, self.aspect_ratio, self.near, self.far)
            }
            ProjectionMode::Orthographic => {
                let half_height = self.ortho_scale;
                let half_width = half_height * self.aspect_ratio;
                Mat4::orthographic_rh(
                    -half_width,
                    half_width,
                    -half_height,
                    half_height,
                    self.near,
                    self.far,
                )
            }
        }
    }

    /// Returns the camera's forward direction.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }

    /// Frames a bounding box, looking down the negative z axis.
    pub fn look_at_box(&mut self, bbox: &BoundingBox) {
        let center = bbox.center();
        let size = bbox.size().length().max(f32::EPSILON);
        self.target = center;
        self.position = center + Vec3::new(0.0, 0.0, size * 1.5);
        self.near = size * 0.001;
        self.far = size * 100.0;
        let extents = bbox.size();
        self.ortho_scale = (extents.y.max(extents.x / self.aspect_ratio) * 0.6).max(0.1);
    }
}

/// Camera and timing state of the frame about to be drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameState {
    /// Seconds since the animation started.
    pub time: f32,
    /// Object to world transform of the mesh.
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    /// Camera position in world space.
    pub camera_position: Vec3,
    /// Camera view direction in world space.
    pub camera_direction: Vec3,
    pub projection_mode: ProjectionMode,
}

impl Default for FrameState {
    fn default() -> Self {
        Self {
            time: 0.0,
            model: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            camera_position: Vec3::ZERO,
            camera_direction: Vec3::NEG_Z,
            projection_mode: ProjectionMode::Perspective,
        }
    }
}

impl FrameState {
    /// Captures a camera and the mesh model matrix.
    pub fn from_camera(camera: &Camera, model: Mat4, time: f32) -> Self {
        Self {
            time,
            model,
            view: camera.view_matrix(),
            projection: camera.projection_matrix(),
            camera_position: camera.position,
            camera_direction: camera.forward(),
            projection_mode: camera.projection_mode,
        }
    }
}

/// GPU-compatible automatic uniforms.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct AutomaticUniforms {
    pub mvp_matrix: [[f32; 4]; 4],
    pub oscillators: [f32; 4],
    /// View direction in object space.
    pub local_view_direction: [f32; 3],
    pub time: f32,
    /// Camera position in object space.
    pub local_camera_position: [f32; 3],
    /// 1.0 for perspective, 0.0 for orthographic.
    pub perspective: f32,
}

impl Default for AutomaticUniforms {
    fn default() -> Self {
        Self {
            mvp_matrix: Mat4::IDENTITY.to_cols_array_2d(),
            oscillators: [0.0; 4],
            local_view_direction: [0.0, 0.0, 1.0],
            time: 0.0,
            local_camera_position: [0.0; 3],
            perspective: 1.0,
        }
    }
}

impl From<&FrameState> for AutomaticUniforms {
    fn from(frame: &FrameState) -> Self {
        let model_inverse = frame.model.inverse();
        let oscillators = Vec4::new(1.0, 2.0, 3.0, 4.0) * (PI * frame.time);
        Self {
            mvp_matrix: (frame.projection * frame.view * frame.model).to_cols_array_2d(),
            oscillators: oscillators.to_array().map(f32::sin),
            local_view_direction: model_inverse
                .transform_vector3(frame.camera_direction)
                .normalize_or_zero()
                .to_array(),
            time: frame.time,
            local_camera_position: model_inverse
                .transform_point3(frame.camera_position)
                .to_array(),
            perspective: match frame.projection_mode {
                ProjectionMode::Perspective => 1.0,
                ProjectionMode::Orthographic => 0.0,
            },
        }
    }
}

impl AutomaticUniforms {
    /// Returns the view direction in object space.
    pub fn view_direction(&self) -> Vec3 {
        Vec3::from_array(self.local_view_direction)
    }

    /// Returns the camera position in object space.
    pub fn camera_position(&self) -> Vec3 {
        Vec3::from_array(self.local_camera_position)
    }

    /// Writes the uniforms into a compiled configuration and toggles the
    /// perspective define. Returns true if the defines changed.
    pub fn apply(&self, config: &mut ShaderConfig) -> bool {
        let uniforms = [
            ("u_time", UniformValue::Float(self.time)),
            (
                "u_oscillators",
                UniformValue::Vec4(Vec4::from_array(self.oscillators)),
            ),
            (
                "u_local_view_direction",
                UniformValue::Vec3(self.view_direction()),
            ),
            (
                "u_local_camera_position",
                UniformValue::Vec3(self.camera_position()),
            ),
            (
                "u_mvp_matrix",
                UniformValue::Mat4(Mat4::from_cols_array_2d(&self.mvp_matrix)),
            ),
        ];
        for (name, value) in uniforms {
            config.uniforms.insert(name.to_string(), value);
        }

        let perspective = self.perspective > 0.5;
        if perspective == config.has_define(PERSPECTIVE_DEFINE) {
            return false;
        }
        if perspective {
            config.defines.insert(PERSPECTIVE_DEFINE.to_string(), 1);
        } else {
            config.defines.remove(PERSPECTIVE_DEFINE);
        }
        true
    }
}
