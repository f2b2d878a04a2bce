//! A rendering session: one mesh, one method and the resources behind them.
//!
//! The session owns its resource managers, so independent meshes never
//! share cache state. Each [`Session::update`] resolves the encoding,
//! normalizes the mesh and recompiles against the previous configuration;
//! [`Session::prerender`] runs once before every draw.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::compiler::{compile_encoding, release};
use crate::data::PlotData;
use crate::encoding::{Channel, ChannelDescriptor, Encoding, Method, PartialEncoding};
use crate::error::{Result, UnrayError};
use crate::frame::{AutomaticUniforms, FrameState};
use crate::mesh::{BoundingBox, BoundingSphere, TetMesh};
use crate::method::MethodConfig;
use crate::resource::{
    ArrayTextureSpec, InstanceBufferSpec, LutTextureSpec, ResourceBackend, ResourceManagers,
};
use crate::shader::{ShaderConfig, ORDERING_ATTRIBUTE};
use crate::sorting::{identity_ordering, sort_cells_by, SortOrder};

/// Behavior switches of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Flip negatively oriented cells on every update.
    pub auto_orient: bool,
    /// Cell order for blending-sensitive methods.
    pub sort_order: SortOrder,
    /// Whether the time uniforms follow the frame time.
    pub animate: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            auto_orient: true,
            sort_order: SortOrder::BackToFront,
            animate: true,
        }
    }
}

impl SessionOptions {
    #[must_use]
    pub fn with_auto_orient(mut self, auto_orient: bool) -> Self {
        self.auto_orient = auto_orient;
        self
    }

    #[must_use]
    pub fn with_sort_order(mut self, sort_order: SortOrder) -> Self {
        self.sort_order = sort_order;
        self
    }

    #[must_use]
    pub fn with_animate(mut self, animate: bool) -> Self {
        self.animate = animate;
        self
    }
}

/// What the per-frame hook changed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUpdate {
    pub uniforms: AutomaticUniforms,
    /// The defines changed and the pipeline must be rebuilt.
    pub defines_changed: bool,
    /// The cell ordering buffer was rewritten.
    pub resorted: bool,
}

struct Compiled {
    encoding: Encoding,
    partial: PartialEncoding,
    data: PlotData,
    mesh: TetMesh,
    config: ShaderConfig,
}

/// One mesh rendered with one method.
pub struct Session<A, L, B>
where
    A: ResourceBackend<Spec = ArrayTextureSpec>,
    L: ResourceBackend<Spec = LutTextureSpec>,
    B: ResourceBackend<Spec = InstanceBufferSpec>,
{
    options: SessionOptions,
    method: Method,
    managers: ResourceManagers<A, L, B>,
    compiled: Option<Compiled>,
    ordering: Vec<u32>,
}

/// Returns the field name of a required mesh channel.
fn mesh_field(encoding: &Encoding, channel: Channel) -> Result<&str> {
    let field = match encoding.get(channel) {
        Some(ChannelDescriptor::Cells(d) | ChannelDescriptor::Coordinates(d)) => {
            d.field.as_deref()
        }
        _ => None,
    };
    field.ok_or_else(|| UnrayError::MissingRequiredChannel(channel.name().to_string()))
}

impl<A, L, B> Session<A, L, B>
where
    A: ResourceBackend<Spec = ArrayTextureSpec>,
    L: ResourceBackend<Spec = LutTextureSpec>,
    B: ResourceBackend<Spec = InstanceBufferSpec>,
{
    /// Creates an empty session around the three resource backends.
    pub fn new(method: Method, managers: ResourceManagers<A, L, B>) -> Self {
        Self::with_options(method, managers, SessionOptions::default())
    }

    /// Creates an empty session with explicit options.
    pub fn with_options(
        method: Method,
        managers: ResourceManagers<A, L, B>,
        options: SessionOptions,
    ) -> Self {
        log::info!("creating {method} session");
        Self {
            options,
            method,
            managers,
            compiled: None,
            ordering: Vec::new(),
        }
    }

    /// Replaces the encoding and data, recompiling the shader configuration.
    ///
    /// On error the session keeps its previous state and resources.
    pub fn update(&mut self, partial: &PartialEncoding, data: PlotData) -> Result<&ShaderConfig> {
        self.rebuild(self.method, partial.clone(), data)
    }

    /// Switches the rendering method, reusing the current encoding and data.
    ///
    /// Resources shared by both methods are kept, not re-uploaded.
    pub fn set_method(&mut self, method: Method) -> Result<()> {
        if method == self.method {
            return Ok(());
        }
        match self.compiled.as_ref() {
            Some(compiled) => {
                let partial = compiled.partial.clone();
                let data = compiled.data.clone();
                self.rebuild(method, partial, data)?;
            }
            None => self.method = method,
        }
        Ok(())
    }

    fn rebuild(
        &mut self,
        method: Method,
        partial: PartialEncoding,
        mut data: PlotData,
    ) -> Result<&ShaderConfig> {
        let encoding = Encoding::resolve(method, &partial)?;
        let cells_field = mesh_field(&encoding, Channel::Cells)?.to_string();
        let coordinates_field = mesh_field(&encoding, Channel::Coordinates)?;
        let mut mesh = TetMesh::from_arrays(
            data.require(&cells_field)?,
            data.require(coordinates_field)?,
        )?;

        if self.options.auto_orient {
            let flipped = mesh.normalize_orientation();
            if flipped > 0 {
                log::debug!("flipped {flipped} of {} cells", mesh.num_cells());
                data.insert(cells_field, mesh.cells_array());
            }
        }

        let previous = self.compiled.as_ref().map(|c| &c.config);
        let config = compile_encoding(&encoding, &data, &mut self.managers, previous)?;

        self.method = method;
        self.ordering = identity_ordering(mesh.num_cells());
        let compiled = self.compiled.insert(Compiled {
            encoding,
            partial,
            data,
            mesh,
            config,
        });
        Ok(&compiled.config)
    }

    /// Updates the automatic uniforms for the next frame and, for
    /// blending-sensitive methods, resorts the cell ordering.
    pub fn prerender(&mut self, frame: &FrameState) -> Result<FrameUpdate> {
        let compiled = self.compiled.as_mut().ok_or(UnrayError::NotInitialized)?;
        let frame = if self.options.animate {
            *frame
        } else {
            FrameState { time: 0.0, ..*frame }
        };
        let uniforms = AutomaticUniforms::from(&frame);
        let defines_changed = uniforms.apply(&mut compiled.config);

        let mut resorted = false;
        if self.method.needs_sorting() {
            sort_cells_by(
                &mut self.ordering,
                compiled.mesh.cells(),
                compiled.mesh.points(),
                uniforms.camera_position(),
                uniforms.view_direction(),
                self.options.sort_order,
            );
            if let Some(&id) = compiled.config.attributes.get(ORDERING_ATTRIBUTE) {
                if let Some(key) = self.managers.buffers.key(id).cloned() {
                    let spec = InstanceBufferSpec {
                        data: self.ordering.clone(),
                        item_size: 1,
                    };
                    self.managers
                        .buffers
                        .update(&key, &spec, Some(id))
                        .map_err(UnrayError::backend)?;
                    resorted = true;
                }
            }
        }

        Ok(FrameUpdate {
            uniforms,
            defines_changed,
            resorted,
        })
    }

    /// Drops every resource of the current configuration.
    pub fn release(&mut self) {
        if let Some(compiled) = self.compiled.take() {
            release(&compiled.config, &mut self.managers);
            self.ordering.clear();
            log::info!("released {} session", self.method);
        }
    }

    /// Returns the compiled configuration, if any update succeeded.
    pub fn config(&self) -> Option<&ShaderConfig> {
        self.compiled.as_ref().map(|c| &c.config)
    }

    /// Returns the resolved encoding.
    pub fn encoding(&self) -> Option<&Encoding> {
        self.compiled.as_ref().map(|c| &c.encoding)
    }

    /// Returns the orientation-normalized mesh.
    pub fn mesh(&self) -> Option<&TetMesh> {
        self.compiled.as_ref().map(|c| &c.mesh)
    }

    /// Returns the current cell draw order.
    pub fn ordering(&self) -> &[u32] {
        &self.ordering
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Returns the render state of the current method.
    pub fn method_config(&self) -> MethodConfig {
        self.method.config()
    }

    /// Returns the background color suggested by the current method.
    pub fn background_color(&self) -> Vec3 {
        self.method.background_color()
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Returns the bounding box of the mesh.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.mesh().and_then(TetMesh::bounding_box)
    }

    /// Returns the approximate bounding sphere of the mesh.
    pub fn bounding_sphere(&self) -> Option<BoundingSphere> {
        self.mesh().and_then(TetMesh::bounding_sphere)
    }

    pub fn managers(&self) -> &ResourceManagers<A, L, B> {
        &self.managers
    }

    pub fn managers_mut(&mut self) -> &mut ResourceManagers<A, L, B> {
        &mut self.managers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::ProjectionMode;
    use crate::resource::tests::MockBackend;
    use crate::shader::PERSPECTIVE_DEFINE;
    use serde_json::json;

    type MockSession = Session<
        MockBackend<ArrayTextureSpec>,
        MockBackend<LutTextureSpec>,
        MockBackend<InstanceBufferSpec>,
    >;

    fn session_with(method: Method, options: SessionOptions) -> MockSession {
        Session::with_options(
            method,
            ResourceManagers::new(MockBackend::new().0, MockBackend::new().0, MockBackend::new().0),
            options,
        )
    }

    fn session(method: Method) -> MockSession {
        session_with(method, SessionOptions::default())
    }

    fn data() -> PlotData {
        // cell 0 is negatively oriented
        PlotData::new()
            .with("c", vec![0i32, 1, 2, 3, 0, 1, 2, 4])
            .with(
                "p",
                vec![
                    0.0f32, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, -1.0, 0.0, 0.0,
                ],
            )
    }

    fn encoding() -> PartialEncoding {
        PartialEncoding::new()
            .with_field(Channel::Cells, "c")
            .with_field(Channel::Coordinates, "p")
    }

    #[test]
    fn test_update_orients_cells() {
        let mut session = session(Method::Surface);
        session.update(&encoding(), data()).unwrap();
        let mesh = session.mesh().unwrap();
        assert_eq!(mesh.cells(), &[[0, 1, 3, 2], [0, 1, 2, 4]]);
        assert!(mesh.orientations().iter().all(|&f| !f));
        assert_eq!(session.ordering(), &[0, 1]);
    }

    #[test]
    fn test_update_without_orientation() {
        let mut session = session_with(
            Method::Surface,
            SessionOptions::default().with_auto_orient(false),
        );
        session.update(&encoding(), data()).unwrap();
        assert_eq!(session.mesh().unwrap().cells()[0], [0, 1, 2, 3]);
    }

    #[test]
    fn test_prerender_before_update() {
        let mut session = session(Method::Volume);
        assert!(matches!(
            session.prerender(&FrameState::default()),
            Err(UnrayError::NotInitialized)
        ));
    }

    #[test]
    fn test_prerender_sorts_volume() {
        let mut session = session(Method::Volume);
        session.update(&encoding(), data()).unwrap();
        // looking down +x: cell 1 reaches x = -1, cell 0 only x = 0
        let frame = FrameState {
            camera_position: Vec3::new(-10.0, 0.0, 0.0),
            camera_direction: Vec3::X,
            ..FrameState::default()
        };
        let update = session.prerender(&frame).unwrap();
        assert!(update.resorted);
        assert!(!update.defines_changed);
        assert_eq!(session.ordering(), &[0, 1]);

        let id = session.config().unwrap().attributes[ORDERING_ATTRIBUTE];
        assert_eq!(session.managers().buffers.get(id).unwrap().spec.data, vec![0, 1]);

        let mut front_to_back = session_with(
            Method::Volume,
            SessionOptions::default().with_sort_order(SortOrder::FrontToBack),
        );
        front_to_back.update(&encoding(), data()).unwrap();
        front_to_back.prerender(&frame).unwrap();
        assert_eq!(front_to_back.ordering(), &[1, 0]);
    }

    #[test]
    fn test_prerender_skips_sort_for_max() {
        let mut session = session(Method::Max);
        session.update(&encoding(), data()).unwrap();
        let update = session
            .prerender(&FrameState {
                projection_mode: ProjectionMode::Orthographic,
                time: 1.5,
                ..FrameState::default()
            })
            .unwrap();
        assert!(!update.resorted);
        assert!(update.defines_changed);
        assert!(!session.config().unwrap().has_define(PERSPECTIVE_DEFINE));
        assert_eq!(
            session.config().unwrap().uniform("u_time"),
            Some(&crate::shader::UniformValue::Float(1.5))
        );
    }

    #[test]
    fn test_frozen_time() {
        let mut session = session_with(Method::Max, SessionOptions::default().with_animate(false));
        session.update(&encoding(), data()).unwrap();
        let update = session
            .prerender(&FrameState {
                time: 3.0,
                ..FrameState::default()
            })
            .unwrap();
        assert_eq!(update.uniforms.time, 0.0);
    }

    #[test]
    fn test_failed_update_keeps_state() {
        let mut session = session(Method::Xray);
        session.update(&encoding(), data()).unwrap();
        let before = session.config().unwrap().clone();
        let live = session.managers().len();

        let broken = encoding()
            .with(Channel::Density, json!({"field": "rho", "scale": "log"}))
            .unwrap();
        assert!(session.update(&broken, data()).is_err());
        assert_eq!(session.config(), Some(&before));
        assert_eq!(session.managers().len(), live);
    }

    #[test]
    fn test_set_method_shares_resources() {
        let mut session = session(Method::Surface);
        session.update(&encoding(), data()).unwrap();
        let cells = session.config().unwrap().texture("t_cells").unwrap();

        session.set_method(Method::Volume).unwrap();
        assert_eq!(session.method(), Method::Volume);
        assert_eq!(session.config().unwrap().texture("t_cells"), Some(cells));
        assert_eq!(session.managers().array_textures.count(cells.id), 1);
        assert!(session.config().unwrap().has_define("ENABLE_VOLUME_MODEL"));
        assert_eq!(session.background_color(), Vec3::ONE);
        assert!(session.method_config().transparent);
    }

    #[test]
    fn test_release() {
        let mut session = session(Method::Sum);
        session.update(&encoding(), data()).unwrap();
        assert!(!session.managers().is_empty());
        session.release();
        assert!(session.managers().is_empty());
        assert!(session.config().is_none());
        assert!(session.bounding_box().is_none());
    }

    #[test]
    fn test_bounds() {
        let mut session = session(Method::Surface);
        session.update(&encoding(), data()).unwrap();
        let bbox = session.bounding_box().unwrap();
        assert_eq!(bbox.min, Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(bbox.max, Vec3::new(1.0, 1.0, 1.0));
        assert!(session.bounding_sphere().unwrap().radius > 0.0);
    }

    #[test]
    fn test_options_serde_defaults() {
        let options: SessionOptions = serde_json::from_value(json!({"animate": false})).unwrap();
        assert!(options.auto_orient);
        assert!(!options.animate);
        assert_eq!(options.sort_order, SortOrder::BackToFront);
    }
}
