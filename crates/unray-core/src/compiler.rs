//! Channel encoding compiler.
//!
//! Compilation runs in two phases. Every channel handler is a pure function
//! of its descriptor and the data, returning a [`ShaderDelta`] of uniform
//! values, defines and *requests* for textures and instance buffers. Only
//! when all handlers have succeeded are the requests committed to the
//! resource managers, so a broken encoding never touches GPU resources.
//!
//! Reference accounting: each texture uniform and attribute of a compiled
//! [`ShaderConfig`] owns exactly one reference. Passing the previous
//! configuration to [`compile`] hands its references over; entries that are
//! replaced or dropped are decremented once the new configuration is built.

use glam::{UVec2, Vec2};

use crate::data::{DType, PlotData, Space, TypedArray};
use crate::encoding::{
    Channel, ChannelDescriptor, EmissionChannel, Encoding, FieldChannel, IndicatorsChannel,
    IsovalueMode, IsovaluesChannel, LightChannel, MappedField, Method, PartialEncoding,
    ValueChannel, WireframeChannel,
};
use crate::error::{Result, UnrayError};
use crate::resource::{
    ArrayTextureSpec, InstanceBufferSpec, LutTextureSpec, ResourceBackend, ResourceId,
    ResourceKey, ResourceKind, ResourceManager, ResourceManagers, TextureHandle, TexturePool,
};
use crate::scale::{compute_scale, ScaleParams};
use crate::shader::{
    default_automatic_uniforms, ShaderConfig, UniformValue, CELL_ORDERING_DEFINE,
    ORDERING_ATTRIBUTE, PERSPECTIVE_DEFINE,
};
use crate::texture_shape::compute_texture_shape;

/// A uniform value or a texture to obtain from a resource manager.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformRequest {
    Value(UniformValue),
    ArrayTexture {
        key: ResourceKey,
        spec: ArrayTextureSpec,
    },
    LutTexture {
        key: ResourceKey,
        spec: LutTextureSpec,
    },
}

/// An instance buffer to obtain from the buffer manager.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferRequest {
    pub key: ResourceKey,
    pub spec: InstanceBufferSpec,
}

/// Changes one handler makes to the output. `None` deletes the entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShaderDelta {
    pub uniforms: Vec<(String, Option<UniformRequest>)>,
    pub defines: Vec<(String, Option<u32>)>,
    pub attributes: Vec<(String, Option<BufferRequest>)>,
}

impl ShaderDelta {
    fn uniform(&mut self, name: &str, value: UniformValue) {
        self.uniforms
            .push((name.to_string(), Some(UniformRequest::Value(value))));
    }

    fn request(&mut self, name: &str, request: UniformRequest) {
        self.uniforms.push((name.to_string(), Some(request)));
    }

    fn define(&mut self, name: &str) {
        self.defines.push((name.to_string(), Some(1)));
    }

    fn undefine(&mut self, name: &str) {
        self.defines.push((name.to_string(), None));
    }

    fn attribute(&mut self, name: &str, request: BufferRequest) {
        self.attributes.push((name.to_string(), Some(request)));
    }

    fn extend(&mut self, other: ShaderDelta) {
        self.uniforms.extend(other.uniforms);
        self.defines.extend(other.defines);
        self.attributes.extend(other.attributes);
    }
}

/// Read-only inputs shared by all handlers.
#[derive(Debug, Clone, Copy)]
pub struct HandlerContext<'a> {
    pub data: &'a PlotData,
    /// Known once the cells field resolved.
    pub num_cells: Option<usize>,
    /// Known once the coordinates field resolved.
    pub num_vertices: Option<usize>,
}

impl<'a> HandlerContext<'a> {
    /// Pre-computes the mesh sizes from the encoding's mesh channels.
    pub fn new(encoding: &Encoding, data: &'a PlotData) -> Result<Self> {
        let count = |channel: Channel, item_size: usize| -> Result<Option<usize>> {
            let field = match encoding.get(channel) {
                Some(ChannelDescriptor::Cells(d) | ChannelDescriptor::Coordinates(d)) => {
                    d.field.as_deref()
                }
                _ => None,
            };
            field
                .map(|name| items(name, data.require(name)?, item_size))
                .transpose()
        };
        Ok(Self {
            data,
            num_cells: count(Channel::Cells, 4)?,
            num_vertices: count(Channel::Coordinates, 3)?,
        })
    }

    /// Checks a field length against its association space.
    fn check_space(&self, field: &str, array: &TypedArray, space: Space) -> Result<()> {
        let (Some(num_vertices), Some(num_cells)) = (self.num_vertices, self.num_cells) else {
            return Ok(());
        };
        match space.expected_len(num_vertices, num_cells) {
            Some(expected) if expected != array.len() => Err(UnrayError::SizeMismatch {
                field: field.to_string(),
                expected,
                actual: array.len(),
            }),
            _ => Ok(()),
        }
    }
}

/// Returns the number of `item_size`-wide items in an array.
fn items(field: &str, array: &TypedArray, item_size: usize) -> Result<usize> {
    let len = array.len();
    if len % item_size != 0 {
        return Err(UnrayError::SizeMismatch {
            field: field.to_string(),
            expected: len - len % item_size + item_size,
            actual: len,
        });
    }
    Ok(len / item_size)
}

/// Builds a data texture request for an array of `item_size`-wide items.
fn array_texture(
    field: &str,
    array: &TypedArray,
    dtype: DType,
    item_size: u32,
) -> Result<(UVec2, UniformRequest)> {
    let n = items(field, array, item_size as usize)?;
    let shape = compute_texture_shape(n)?;
    let key = ResourceKey::new(
        field,
        ResourceKind::Array {
            dtype,
            item_size,
            shape,
        },
    );
    let spec = ArrayTextureSpec {
        array: array.clone(),
        dtype,
        item_size,
        shape,
    };
    Ok((UVec2::from_array(shape), UniformRequest::ArrayTexture { key, spec }))
}

/// Builds a lookup table texture request.
fn lut_texture(field: &str, array: &TypedArray, item_size: u32) -> Result<UniformRequest> {
    let n = items(field, array, item_size as usize)?;
    if n == 0 {
        return Err(UnrayError::InvalidSize(0));
    }
    Ok(UniformRequest::LutTexture {
        key: ResourceKey::new(field, ResourceKind::Lut { item_size, len: n }),
        spec: LutTextureSpec {
            array: array.clone(),
            item_size,
        },
    })
}

fn cells(desc: &FieldChannel, ctx: &HandlerContext<'_>) -> Result<ShaderDelta> {
    let field = desc
        .field
        .as_deref()
        .ok_or_else(|| UnrayError::MissingRequiredChannel("cells".into()))?;
    let array = ctx.data.require(field)?;
    if !array.dtype().is_integer() {
        return Err(UnrayError::invalid(
            "cells",
            format!("field '{field}' holds {} values, expected integers", array.dtype()),
        ));
    }

    let mut delta = ShaderDelta::default();
    let (shape, request) = array_texture(field, array, DType::Int32, 4)?;
    if let Some(num_points) = ctx.num_vertices {
        check_indices(array, num_points)?;
    }
    delta.uniform("u_cell_texture_shape", UniformValue::UVec2(shape));
    delta.request("t_cells", request);

    let num_cells = array.len() / 4;
    #[allow(clippy::cast_possible_truncation)]
    let ordering: Vec<u32> = (0..num_cells as u32).collect();
    delta.attribute(
        ORDERING_ATTRIBUTE,
        BufferRequest {
            key: ResourceKey::new(field, ResourceKind::Ordering { num_cells }),
            spec: InstanceBufferSpec {
                data: ordering,
                item_size: 1,
            },
        },
    );
    Ok(delta)
}

/// Checks that every cell index addresses one of `num_points` points.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn check_indices(cells: &TypedArray, num_points: usize) -> Result<()> {
    match cells
        .iter_f64()
        .enumerate()
        .find(|&(_, x)| x < 0.0 || x >= num_points as f64)
    {
        Some((k, x)) => Err(UnrayError::IndexOutOfBounds {
            cell: k / 4,
            index: x as i64,
            num_points,
        }),
        None => Ok(()),
    }
}

fn coordinates(desc: &FieldChannel, ctx: &HandlerContext<'_>) -> Result<ShaderDelta> {
    let field = desc
        .field
        .as_deref()
        .ok_or_else(|| UnrayError::MissingRequiredChannel("coordinates".into()))?;
    let array = ctx.data.require(field)?;

    let mut delta = ShaderDelta::default();
    let (shape, request) = array_texture(field, array, DType::Float32, 3)?;
    delta.uniform("u_vertex_texture_shape", UniformValue::UVec2(shape));
    delta.request("t_coordinates", request);
    Ok(delta)
}

fn indicators(desc: &IndicatorsChannel, ctx: &HandlerContext<'_>) -> Result<ShaderDelta> {
    let mut delta = ShaderDelta::default();
    let Some(field) = desc.field.as_deref() else {
        return Ok(delta);
    };
    if desc.space != Space::I3 {
        return Err(UnrayError::UnsupportedIndicatorSpace(desc.space.to_string()));
    }
    if desc.lut_field.is_some() {
        return Err(UnrayError::UnimplementedFeature(
            "lookup tables for indicators".into(),
        ));
    }
    let array = ctx.data.require(field)?;
    ctx.check_space(field, array, desc.space)?;

    let (_, request) = array_texture(field, array, DType::Int32, 1)?;
    delta.request("t_cell_indicators", request);
    delta.uniform("u_cell_indicator_value", UniformValue::Int(desc.value));
    delta.define("ENABLE_CELL_INDICATORS");
    Ok(delta)
}

/// Shared handler of the density and emission channels.
///
/// `lut_item_size` is 1 for scalar transfer functions and 3 for colormaps.
fn mapped_field(
    channel: Channel,
    desc: &MappedField<'_>,
    lut_item_size: u32,
    ctx: &HandlerContext<'_>,
) -> Result<ShaderDelta> {
    let name = channel.name();
    let upper = name.to_uppercase();
    let mut delta = ShaderDelta::default();
    delta.define(&format!("ENABLE_{upper}"));

    let array = match desc.field {
        Some(field) => {
            if !matches!(desc.space, Space::P0 | Space::P1 | Space::D1) {
                return Err(UnrayError::invalid(
                    name,
                    format!("field space must be P0, P1 or D1, got {}", desc.space),
                ));
            }
            let array = ctx.data.require(field)?;
            ctx.check_space(field, array, desc.space)?;
            let (_, request) = array_texture(field, array, DType::Float32, 1)?;
            delta.request(&format!("t_{name}"), request);
            delta.define(&format!("ENABLE_{upper}_FIELD"));
            if desc.space != Space::P0 {
                delta.define(&format!("ENABLE_{upper}_BACK"));
            }
            Some(array)
        }
        None => {
            #[allow(clippy::cast_possible_truncation)]
            delta.uniform(
                &format!("u_{name}_constant"),
                UniformValue::Float(desc.constant as f32),
            );
            None
        }
    };

    let params = compute_scale(name, desc, array)?;
    delta.define(&format!("USE_{upper}_SCALE_{}", params.define_suffix()));
    if let Some((m, b)) = params.slope_intercept() {
        delta.uniform(&format!("u_{name}_scale_m"), UniformValue::Float(m));
        delta.uniform(&format!("u_{name}_scale_b"), UniformValue::Float(b));
    }
    if let ScaleParams::Pow { k, .. } = params {
        delta.uniform(&format!("u_{name}_scale_k"), UniformValue::Float(k));
    }

    if let Some(lut) = desc.lut {
        return Err(UnrayError::UnimplementedFeature(format!(
            "named lookup table '{lut}' for {name}"
        )));
    }
    if let Some(lut_field) = desc.lut_field {
        let array = ctx.data.require(lut_field)?;
        delta.request(
            &format!("t_{name}_lut"),
            lut_texture(lut_field, array, lut_item_size)?,
        );
        delta.define(&format!("ENABLE_{upper}_LUT"));
    }
    Ok(delta)
}

fn emission(desc: &EmissionChannel, ctx: &HandlerContext<'_>) -> Result<ShaderDelta> {
    let mut delta = mapped_field(Channel::Emission, &desc.mapped(), 3, ctx)?;
    delta.uniform("u_emission_color", UniformValue::Vec3(desc.color.0));
    Ok(delta)
}

fn wireframe(desc: &WireframeChannel) -> ShaderDelta {
    let mut delta = ShaderDelta::default();
    if desc.enable {
        delta.define("ENABLE_WIREFRAME");
        delta.uniform("u_wireframe_color", UniformValue::Vec3(desc.color.0));
        delta.uniform("u_wireframe_alpha", UniformValue::Float(desc.opacity));
        delta.uniform("u_wireframe_size", UniformValue::Float(desc.size));
    } else {
        delta.undefine("ENABLE_WIREFRAME");
    }
    delta
}

fn light(desc: &LightChannel) -> ShaderDelta {
    let mut delta = ShaderDelta::default();
    delta.uniform(
        "u_emission_intensity_range",
        UniformValue::Vec2(Vec2::from_array(desc.emission_intensity_range)),
    );
    delta.define("ENABLE_SURFACE_LIGHT");
    delta
}

fn isovalues(desc: &IsovaluesChannel) -> Result<ShaderDelta> {
    if desc.num_intervals <= 0.0 {
        return Err(UnrayError::invalid(
            "isovalues",
            format!("num_intervals must be positive, got {}", desc.num_intervals),
        ));
    }
    let mut delta = ShaderDelta::default();
    delta.uniform("u_isovalue", UniformValue::Float(desc.value));

    let spacing = 1.0 / desc.num_intervals;
    if desc.mode != IsovalueMode::Single {
        delta.uniform("u_isovalue_spacing", UniformValue::Float(spacing));
        delta.uniform("u_isovalue_spacing_inv", UniformValue::Float(1.0 / spacing));
    }
    match desc.mode {
        IsovalueMode::Single => delta.define("USING_ISOSURFACE_MODE_SINGLE"),
        IsovalueMode::Linear => delta.define("USING_ISOSURFACE_MODE_LINEAR"),
        IsovalueMode::Log => {
            delta.define("USING_ISOSURFACE_MODE_LOG");
            delta.uniform("u_isovalue_base", UniformValue::Float(desc.base));
        }
        IsovalueMode::Pow => {
            delta.define("USING_ISOSURFACE_MODE_POWER");
            delta.uniform("u_isovalue_exponent", UniformValue::Float(desc.exponent));
        }
    }
    Ok(delta)
}

fn extinction(desc: &ValueChannel) -> ShaderDelta {
    let mut delta = ShaderDelta::default();
    delta.uniform("u_extinction", UniformValue::Float(desc.value));
    delta
}

fn exposure(desc: &ValueChannel) -> ShaderDelta {
    let mut delta = ShaderDelta::default();
    delta.uniform("u_exposure", UniformValue::Float(desc.value.exp2()));
    delta
}

/// Runs the handler of one channel.
pub fn handle_channel(desc: &ChannelDescriptor, ctx: &HandlerContext<'_>) -> Result<ShaderDelta> {
    match desc {
        ChannelDescriptor::Cells(d) => cells(d, ctx),
        ChannelDescriptor::Coordinates(d) => coordinates(d, ctx),
        ChannelDescriptor::Indicators(d) => indicators(d, ctx),
        ChannelDescriptor::Density(d) => mapped_field(Channel::Density, &d.mapped(), 1, ctx),
        ChannelDescriptor::Emission(d) => emission(d, ctx),
        ChannelDescriptor::Wireframe(d) => Ok(wireframe(d)),
        ChannelDescriptor::Isovalues(d) => isovalues(d),
        ChannelDescriptor::Light(d) => Ok(light(d)),
        ChannelDescriptor::Extinction(d) => Ok(extinction(d)),
        ChannelDescriptor::Exposure(d) => Ok(exposure(d)),
    }
}

/// Returns the define selecting a method's shading model.
pub fn model_define(method: Method) -> &'static str {
    match method {
        Method::Surface => "ENABLE_SURFACE_MODEL",
        Method::Isosurface => "ENABLE_ISOSURFACE_MODEL",
        Method::Xray => "ENABLE_XRAY_MODEL",
        Method::Sum => "ENABLE_SUM_MODEL",
        Method::Min => "ENABLE_MIN_MODEL",
        Method::Max => "ENABLE_MAX_MODEL",
        Method::Volume => "ENABLE_VOLUME_MODEL",
    }
}

/// Runs every handler of a resolved encoding, without touching resources.
pub fn plan(encoding: &Encoding, data: &PlotData) -> Result<ShaderDelta> {
    let ctx = HandlerContext::new(encoding, data)?;
    let mut delta = ShaderDelta::default();
    delta.define(model_define(encoding.method()));
    delta.define(CELL_ORDERING_DEFINE);
    // resolved per frame by the projection mode
    delta.define(PERSPECTIVE_DEFINE);
    for desc in encoding.descriptors() {
        delta.extend(handle_channel(desc, &ctx)?);
    }
    Ok(delta)
}

/// Checks every resource request of a delta against its backend.
fn validate<A, L, B>(delta: &ShaderDelta, managers: &ResourceManagers<A, L, B>) -> Result<()>
where
    A: ResourceBackend<Spec = ArrayTextureSpec>,
    L: ResourceBackend<Spec = LutTextureSpec>,
    B: ResourceBackend<Spec = InstanceBufferSpec>,
{
    for (_, request) in &delta.uniforms {
        match request {
            Some(UniformRequest::ArrayTexture { spec, .. }) => managers
                .array_textures
                .backend()
                .validate(spec)
                .map_err(UnrayError::backend)?,
            Some(UniformRequest::LutTexture { spec, .. }) => managers
                .lut_textures
                .backend()
                .validate(spec)
                .map_err(UnrayError::backend)?,
            _ => {}
        }
    }
    for (_, request) in &delta.attributes {
        if let Some(BufferRequest { spec, .. }) = request {
            managers
                .buffers
                .backend()
                .validate(spec)
                .map_err(UnrayError::backend)?;
        }
    }
    Ok(())
}

/// References taken so far by a commit, dropped again if it fails.
#[derive(Default)]
struct Taken {
    textures: Vec<TextureHandle>,
    buffers: Vec<ResourceId>,
}

/// Updates a resource, reusing the previous one only if it is the one
/// cached under `key`. A replaced previous resource is queued in `stale`.
///
/// Returns the id and whether a new reference was taken.
fn commit_resource<R: ResourceBackend>(
    manager: &mut ResourceManager<R>,
    key: &ResourceKey,
    spec: &R::Spec,
    previous: Option<ResourceId>,
    stale: &mut Vec<ResourceId>,
) -> Result<(ResourceId, bool)> {
    let reuse = previous.filter(|&p| manager.id_for_key(key) == Some(p));
    let id = manager
        .update(key, spec, reuse)
        .map_err(UnrayError::backend)?;
    if let Some(p) = previous {
        if p != id {
            stale.push(p);
        }
    }
    Ok((id, reuse.is_none()))
}

/// Commits a planned delta to the resource managers.
///
/// Stale references of `previous` are released after every new reference
/// has been taken, so resources shared by old and new never get evicted in
/// between.
///
/// # Errors
///
/// Returns [`UnrayError::Backend`] if a backend fails to create or update a
/// resource. References taken before the failure are dropped again and
/// `previous` keeps all of its references.
pub fn commit<A, L, B>(
    delta: ShaderDelta,
    managers: &mut ResourceManagers<A, L, B>,
    previous: Option<&ShaderConfig>,
) -> Result<ShaderConfig>
where
    A: ResourceBackend<Spec = ArrayTextureSpec>,
    L: ResourceBackend<Spec = LutTextureSpec>,
    B: ResourceBackend<Spec = InstanceBufferSpec>,
{
    let mut taken = Taken::default();
    let mut stale_textures: Vec<TextureHandle> = Vec::new();
    let mut stale_buffers: Vec<ResourceId> = Vec::new();
    let config = match commit_requests(
        delta,
        managers,
        previous,
        &mut taken,
        &mut stale_textures,
        &mut stale_buffers,
    ) {
        Ok(config) => config,
        Err(err) => {
            log::warn!("rolling back a failed commit: {err}");
            for handle in taken.textures {
                managers.release_texture(handle);
            }
            for id in taken.buffers {
                managers.buffers.decrement(id);
            }
            return Err(err);
        }
    };

    if let Some(previous) = previous {
        // Entries whose name is gone from the new configuration.
        for (name, handle) in previous.textures() {
            match config.texture(name) {
                Some(current) if current.pool == handle.pool => {}
                _ => stale_textures.push(handle),
            }
        }
        for (name, &id) in &previous.attributes {
            if !config.attributes.contains_key(name) {
                stale_buffers.push(id);
            }
        }
    }

    for handle in stale_textures {
        managers.release_texture(handle);
    }
    for id in stale_buffers {
        managers.buffers.decrement(id);
    }

    log::debug!(
        "compiled {} uniforms, {} defines, {} attributes",
        config.uniforms.len(),
        config.defines.len(),
        config.attributes.len()
    );
    Ok(config)
}

fn commit_requests<A, L, B>(
    delta: ShaderDelta,
    managers: &mut ResourceManagers<A, L, B>,
    previous: Option<&ShaderConfig>,
    taken: &mut Taken,
    stale_textures: &mut Vec<TextureHandle>,
    stale_buffers: &mut Vec<ResourceId>,
) -> Result<ShaderConfig>
where
    A: ResourceBackend<Spec = ArrayTextureSpec>,
    L: ResourceBackend<Spec = LutTextureSpec>,
    B: ResourceBackend<Spec = InstanceBufferSpec>,
{
    let mut config = ShaderConfig {
        uniforms: default_automatic_uniforms(),
        ..ShaderConfig::default()
    };

    let previous_texture = |name: &str, pool: TexturePool| {
        previous
            .and_then(|p| p.texture(name))
            .filter(|h| h.pool == pool)
            .map(|h| h.id)
    };

    for (name, request) in delta.uniforms {
        let (pool, committed, stale) = match request {
            None => {
                config.uniforms.remove(&name);
                continue;
            }
            Some(UniformRequest::Value(value)) => {
                config.uniforms.insert(name, value);
                continue;
            }
            Some(UniformRequest::ArrayTexture { key, spec }) => {
                let prev = previous_texture(&name, TexturePool::Array);
                let mut stale = Vec::new();
                let committed =
                    commit_resource(&mut managers.array_textures, &key, &spec, prev, &mut stale);
                (TexturePool::Array, committed, stale)
            }
            Some(UniformRequest::LutTexture { key, spec }) => {
                let prev = previous_texture(&name, TexturePool::Lut);
                let mut stale = Vec::new();
                let committed =
                    commit_resource(&mut managers.lut_textures, &key, &spec, prev, &mut stale);
                (TexturePool::Lut, committed, stale)
            }
        };
        let (id, is_new) = committed?;
        let handle = TextureHandle { pool, id };
        if is_new {
            taken.textures.push(handle);
        }
        stale_textures.extend(stale.into_iter().map(|id| TextureHandle { pool, id }));
        config.uniforms.insert(name, UniformValue::Texture(handle));
    }

    for (name, value) in delta.defines {
        match value {
            Some(v) => config.defines.insert(name, v),
            None => config.defines.remove(&name),
        };
    }

    for (name, request) in delta.attributes {
        match request {
            Some(BufferRequest { key, spec }) => {
                let prev = previous.and_then(|p| p.attributes.get(&name).copied());
                let (id, is_new) =
                    commit_resource(&mut managers.buffers, &key, &spec, prev, stale_buffers)?;
                if is_new {
                    taken.buffers.push(id);
                }
                config.attributes.insert(name, id);
            }
            None => {
                config.attributes.remove(&name);
            }
        }
    }
    Ok(config)
}

/// Compiles a resolved encoding.
///
/// Fails without side effects if any handler fails or a backend refuses
/// one of the requested resources.
pub fn compile_encoding<A, L, B>(
    encoding: &Encoding,
    data: &PlotData,
    managers: &mut ResourceManagers<A, L, B>,
    previous: Option<&ShaderConfig>,
) -> Result<ShaderConfig>
where
    A: ResourceBackend<Spec = ArrayTextureSpec>,
    L: ResourceBackend<Spec = LutTextureSpec>,
    B: ResourceBackend<Spec = InstanceBufferSpec>,
{
    let delta = plan(encoding, data)?;
    validate(&delta, managers)?;
    commit(delta, managers, previous)
}

/// Merges `partial` over the defaults of `method` and compiles the result.
pub fn compile<A, L, B>(
    method: Method,
    partial: &PartialEncoding,
    data: &PlotData,
    managers: &mut ResourceManagers<A, L, B>,
    previous: Option<&ShaderConfig>,
) -> Result<ShaderConfig>
where
    A: ResourceBackend<Spec = ArrayTextureSpec>,
    L: ResourceBackend<Spec = LutTextureSpec>,
    B: ResourceBackend<Spec = InstanceBufferSpec>,
{
    let encoding = Encoding::resolve(method, partial)?;
    compile_encoding(&encoding, data, managers, previous)
}

/// Drops every reference a compiled configuration holds.
pub fn release<A, L, B>(config: &ShaderConfig, managers: &mut ResourceManagers<A, L, B>)
where
    A: ResourceBackend<Spec = ArrayTextureSpec>,
    L: ResourceBackend<Spec = LutTextureSpec>,
    B: ResourceBackend<Spec = InstanceBufferSpec>,
{
    for (_, handle) in config.textures() {
        managers.release_texture(handle);
    }
    for &id in config.attributes.values() {
        managers.buffers.decrement(id);
    }
}
