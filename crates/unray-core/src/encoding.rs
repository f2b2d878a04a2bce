//! Rendering methods, channels and their encodings.
//!
//! An encoding maps each channel of a rendering method to a descriptor: a
//! literal constant, or a named field plus the policy mapping its values to
//! `[0, 1]`. Users supply a [`PartialEncoding`] as plain JSON which is
//! merged channel by channel over the method defaults into a typed
//! [`Encoding`]. Unknown channel names and out-of-set values are rejected
//! here, before anything reaches the compiler.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::data::Space;
use crate::error::{Result, UnrayError};

/// A rendering method: one shading model with its compositing rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Opaque lit boundary surface.
    #[default]
    Surface,
    /// Opaque isosurfaces of the density field.
    Isosurface,
    /// Attenuation-only volume rendering.
    Xray,
    /// Additive emission.
    Sum,
    /// Minimum intensity projection.
    Min,
    /// Maximum intensity projection.
    Max,
    /// Emission-absorption volume rendering.
    Volume,
}

impl Method {
    /// All methods.
    pub const ALL: [Method; 7] = [
        Method::Surface,
        Method::Isosurface,
        Method::Xray,
        Method::Sum,
        Method::Min,
        Method::Max,
        Method::Volume,
    ];

    /// Returns the method name used in encodings.
    pub fn name(self) -> &'static str {
        match self {
            Method::Surface => "surface",
            Method::Isosurface => "isosurface",
            Method::Xray => "xray",
            Method::Sum => "sum",
            Method::Min => "min",
            Method::Max => "max",
            Method::Volume => "volume",
        }
    }

    /// Returns the channels of the method's default encoding, in handler order.
    pub fn channels(self) -> &'static [Channel] {
        use Channel::{
            Cells, Coordinates, Density, Emission, Exposure, Extinction, Indicators, Isovalues,
            Light, Wireframe,
        };
        match self {
            Method::Surface => &[Cells, Coordinates, Indicators, Wireframe, Emission, Light],
            Method::Isosurface => &[
                Cells,
                Coordinates,
                Indicators,
                Wireframe,
                Isovalues,
                Emission,
                Density,
                Light,
            ],
            Method::Xray => &[Cells, Coordinates, Indicators, Density, Extinction],
            Method::Sum => &[Cells, Coordinates, Indicators, Emission, Exposure],
            Method::Min | Method::Max => &[Cells, Coordinates, Indicators, Emission],
            Method::Volume => &[
                Cells,
                Coordinates,
                Indicators,
                Density,
                Emission,
                Extinction,
                Exposure,
            ],
        }
    }

    /// Returns true if the method's default encoding contains `channel`.
    pub fn uses(self, channel: Channel) -> bool {
        self.channels().contains(&channel)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Method {
    type Err = UnrayError;

    fn from_str(s: &str) -> Result<Self> {
        Method::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| UnrayError::invalid("method", format!("unknown method '{s}'")))
    }
}

/// A named visual input slot of a rendering method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Cells,
    Coordinates,
    Indicators,
    Density,
    Emission,
    Wireframe,
    Isovalues,
    Light,
    Extinction,
    Exposure,
}

impl Channel {
    /// All channels.
    pub const ALL: [Channel; 10] = [
        Channel::Cells,
        Channel::Coordinates,
        Channel::Indicators,
        Channel::Density,
        Channel::Emission,
        Channel::Wireframe,
        Channel::Isovalues,
        Channel::Light,
        Channel::Extinction,
        Channel::Exposure,
    ];

    /// Returns the channel name used in encodings.
    pub fn name(self) -> &'static str {
        match self {
            Channel::Cells => "cells",
            Channel::Coordinates => "coordinates",
            Channel::Indicators => "indicators",
            Channel::Density => "density",
            Channel::Emission => "emission",
            Channel::Wireframe => "wireframe",
            Channel::Isovalues => "isovalues",
            Channel::Light => "light",
            Channel::Extinction => "extinction",
            Channel::Exposure => "exposure",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Channel {
    type Err = UnrayError;

    fn from_str(s: &str) -> Result<Self> {
        Channel::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| UnrayError::UnknownChannel(s.to_string()))
    }
}

/// Mapping applied to field values before normalization to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    Identity,
    #[default]
    Linear,
    Log,
    Pow,
}

/// Value range mapped to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "DomainRepr", into = "DomainRepr")]
pub enum Domain {
    /// `[min, max]` of the field data.
    #[default]
    Auto,
    /// Explicit `[a, b]`.
    Range(f64, f64),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum DomainRepr {
    Keyword(String),
    Range([f64; 2]),
}

impl TryFrom<DomainRepr> for Domain {
    type Error = String;

    fn try_from(repr: DomainRepr) -> std::result::Result<Self, String> {
        match repr {
            DomainRepr::Keyword(k) if k == "auto" => Ok(Domain::Auto),
            DomainRepr::Keyword(k) => Err(format!("expected \"auto\" or [min, max], got \"{k}\"")),
            DomainRepr::Range([a, b]) => Ok(Domain::Range(a, b)),
        }
    }
}

impl From<Domain> for DomainRepr {
    fn from(domain: Domain) -> Self {
        match domain {
            Domain::Auto => DomainRepr::Keyword("auto".into()),
            Domain::Range(a, b) => DomainRepr::Range([a, b]),
        }
    }
}

/// Base of a logarithmic scale.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "LogBaseRepr", into = "LogBaseRepr")]
pub enum LogBase {
    /// Natural logarithm.
    #[default]
    E,
    /// Logarithm in a positive base other than 1.
    Value(f64),
}

impl LogBase {
    /// Returns `1 / ln(base)`, the factor turning `ln x` into `log_base x`.
    pub fn inv_ln(self) -> f64 {
        match self {
            LogBase::E => 1.0,
            LogBase::Value(base) => 1.0 / base.ln(),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum LogBaseRepr {
    Keyword(String),
    Value(f64),
}

impl TryFrom<LogBaseRepr> for LogBase {
    type Error = String;

    fn try_from(repr: LogBaseRepr) -> std::result::Result<Self, String> {
        match repr {
            LogBaseRepr::Keyword(k) if k == "e" => Ok(LogBase::E),
            LogBaseRepr::Keyword(k) => Err(format!("expected \"e\" or a number, got \"{k}\"")),
            LogBaseRepr::Value(v) if v > 0.0 && v != 1.0 => Ok(LogBase::Value(v)),
            LogBaseRepr::Value(v) => Err(format!("log base must be positive and not 1, got {v}")),
        }
    }
}

impl From<LogBase> for LogBaseRepr {
    fn from(base: LogBase) -> Self {
        match base {
            LogBase::E => LogBaseRepr::Keyword("e".into()),
            LogBase::Value(v) => LogBaseRepr::Value(v),
        }
    }
}

/// An RGB color, written as `"#rrggbb"`, `"#rgb"` or `[r, g, b]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ColorRepr", into = "ColorRepr")]
pub struct Color(pub Vec3);

impl Color {
    pub const WHITE: Color = Color(Vec3::ONE);
    pub const BLACK: Color = Color(Vec3::ZERO);

    /// Parses a `#rrggbb` or `#rgb` hex color.
    pub fn from_hex(s: &str) -> std::result::Result<Self, String> {
        let digits = s
            .strip_prefix('#')
            .ok_or_else(|| format!("color '{s}' must start with '#'"))?;
        let nibbles = digits
            .chars()
            .map(|c| {
                c.to_digit(16)
                    .ok_or_else(|| format!("invalid hex digit '{c}' in color '{s}'"))
            })
            .collect::<std::result::Result<Vec<u32>, String>>()?;
        let bytes: [u32; 3] = match nibbles[..] {
            [r1, r0, g1, g0, b1, b0] => [r1 * 16 + r0, g1 * 16 + g0, b1 * 16 + b0],
            [r, g, b] => [r * 17, g * 17, b * 17],
            _ => return Err(format!("color '{s}' must have 3 or 6 hex digits")),
        };
        #[allow(clippy::cast_precision_loss)]
        let channels = bytes.map(|v| v as f32 / 255.0);
        Ok(Color(Vec3::new(channels[0], channels[1], channels[2])))
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Hex(String),
    Rgb([f32; 3]),
}

impl TryFrom<ColorRepr> for Color {
    type Error = String;

    fn try_from(repr: ColorRepr) -> std::result::Result<Self, String> {
        match repr {
            ColorRepr::Hex(s) => Color::from_hex(&s),
            ColorRepr::Rgb(rgb) => Ok(Color(Vec3::from_array(rgb))),
        }
    }
}

impl From<Color> for ColorRepr {
    fn from(color: Color) -> Self {
        ColorRepr::Rgb(color.0.to_array())
    }
}

/// Descriptor of the `cells` and `coordinates` channels.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldChannel {
    pub field: Option<String>,
}

/// Descriptor of the `indicators` channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndicatorsChannel {
    pub field: Option<String>,
    /// Indicator value marking the cells to draw.
    pub value: i32,
    pub lut_field: Option<String>,
    pub space: Space,
}

impl Default for IndicatorsChannel {
    fn default() -> Self {
        Self {
            field: None,
            value: 1,
            lut_field: None,
            space: Space::I3,
        }
    }
}

/// Descriptor of the `density` channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DensityChannel {
    /// Used when no field is given.
    pub constant: f64,
    pub field: Option<String>,
    pub space: Space,
    #[serde(alias = "range")]
    pub domain: Domain,
    pub scale: Scale,
    pub scale_base: LogBase,
    pub scale_exponent: f64,
    /// Scalar lookup table applied after scaling.
    pub lut_field: Option<String>,
    /// Named transfer function.
    pub lut: Option<String>,
}

impl Default for DensityChannel {
    fn default() -> Self {
        Self {
            constant: 1.0,
            field: None,
            space: Space::P1,
            domain: Domain::Auto,
            scale: Scale::Linear,
            scale_base: LogBase::E,
            scale_exponent: 2.0,
            lut_field: None,
            lut: None,
        }
    }
}

/// Descriptor of the `emission` channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmissionChannel {
    pub constant: f64,
    pub field: Option<String>,
    pub space: Space,
    #[serde(alias = "range")]
    pub domain: Domain,
    pub scale: Scale,
    pub scale_base: LogBase,
    pub scale_exponent: f64,
    /// Color lookup table (RGB triples) applied after scaling.
    pub lut_field: Option<String>,
    /// Named colormap.
    pub lut: Option<String>,
    /// Base color, modulated by the scaled value when there is no LUT.
    pub color: Color,
}

impl Default for EmissionChannel {
    fn default() -> Self {
        let density = DensityChannel::default();
        Self {
            constant: density.constant,
            field: density.field,
            space: density.space,
            domain: density.domain,
            scale: density.scale,
            scale_base: density.scale_base,
            scale_exponent: density.scale_exponent,
            lut_field: None,
            lut: None,
            color: Color::WHITE,
        }
    }
}

/// Borrowed view of the fields density and emission have in common.
#[derive(Debug, Clone, Copy)]
pub struct MappedField<'a> {
    pub constant: f64,
    pub field: Option<&'a str>,
    pub space: Space,
    pub domain: Domain,
    pub scale: Scale,
    pub scale_base: LogBase,
    pub scale_exponent: f64,
    pub lut_field: Option<&'a str>,
    pub lut: Option<&'a str>,
}

impl DensityChannel {
    pub fn mapped(&self) -> MappedField<'_> {
        MappedField {
            constant: self.constant,
            field: self.field.as_deref(),
            space: self.space,
            domain: self.domain,
            scale: self.scale,
            scale_base: self.scale_base,
            scale_exponent: self.scale_exponent,
            lut_field: self.lut_field.as_deref(),
            lut: self.lut.as_deref(),
        }
    }
}

impl EmissionChannel {
    pub fn mapped(&self) -> MappedField<'_> {
        MappedField {
            constant: self.constant,
            field: self.field.as_deref(),
            space: self.space,
            domain: self.domain,
            scale: self.scale,
            scale_base: self.scale_base,
            scale_exponent: self.scale_exponent,
            lut_field: self.lut_field.as_deref(),
            lut: self.lut.as_deref(),
        }
    }
}

/// Descriptor of the `wireframe` channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireframeChannel {
    pub enable: bool,
    /// Edge width in barycentric units.
    pub size: f32,
    pub color: Color,
    pub opacity: f32,
}

impl Default for WireframeChannel {
    fn default() -> Self {
        Self {
            enable: false,
            size: 0.01,
            color: Color::BLACK,
            opacity: 1.0,
        }
    }
}

/// How isovalues are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IsovalueMode {
    #[default]
    Single,
    Linear,
    Log,
    Pow,
}

/// Descriptor of the `isovalues` channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IsovaluesChannel {
    pub mode: IsovalueMode,
    pub value: f32,
    pub num_intervals: f32,
    pub base: f32,
    pub exponent: f32,
}

impl Default for IsovaluesChannel {
    fn default() -> Self {
        Self {
            mode: IsovalueMode::Single,
            value: 0.0,
            num_intervals: 1.0,
            base: 1.0,
            exponent: 1.0,
        }
    }
}

/// Descriptor of the `light` channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LightChannel {
    pub emission_intensity_range: [f32; 2],
}

impl Default for LightChannel {
    fn default() -> Self {
        Self {
            emission_intensity_range: [0.5, 1.0],
        }
    }
}

/// Descriptor of the scalar `extinction` and `exposure` channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValueChannel {
    pub value: f32,
}

/// A fully resolved channel descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelDescriptor {
    Cells(FieldChannel),
    Coordinates(FieldChannel),
    Indicators(IndicatorsChannel),
    Density(DensityChannel),
    Emission(EmissionChannel),
    Wireframe(WireframeChannel),
    Isovalues(IsovaluesChannel),
    Light(LightChannel),
    Extinction(ValueChannel),
    Exposure(ValueChannel),
}

impl ChannelDescriptor {
    /// Returns the default descriptor of a channel.
    pub fn default_for(channel: Channel) -> Self {
        match channel {
            Channel::Cells => Self::Cells(FieldChannel::default()),
            Channel::Coordinates => Self::Coordinates(FieldChannel::default()),
            Channel::Indicators => Self::Indicators(IndicatorsChannel::default()),
            Channel::Density => Self::Density(DensityChannel::default()),
            Channel::Emission => Self::Emission(EmissionChannel::default()),
            Channel::Wireframe => Self::Wireframe(WireframeChannel::default()),
            Channel::Isovalues => Self::Isovalues(IsovaluesChannel::default()),
            Channel::Light => Self::Light(LightChannel::default()),
            Channel::Extinction => Self::Extinction(ValueChannel { value: 1.0 }),
            Channel::Exposure => Self::Exposure(ValueChannel { value: 0.0 }),
        }
    }

    /// Returns the channel this descriptor belongs to.
    pub fn channel(&self) -> Channel {
        match self {
            Self::Cells(_) => Channel::Cells,
            Self::Coordinates(_) => Channel::Coordinates,
            Self::Indicators(_) => Channel::Indicators,
            Self::Density(_) => Channel::Density,
            Self::Emission(_) => Channel::Emission,
            Self::Wireframe(_) => Channel::Wireframe,
            Self::Isovalues(_) => Channel::Isovalues,
            Self::Light(_) => Channel::Light,
            Self::Extinction(_) => Channel::Extinction,
            Self::Exposure(_) => Channel::Exposure,
        }
    }

    /// Serializes the descriptor to a JSON object.
    pub fn to_json(&self) -> Result<Value> {
        let value = match self {
            Self::Cells(d) | Self::Coordinates(d) => serde_json::to_value(d),
            Self::Indicators(d) => serde_json::to_value(d),
            Self::Density(d) => serde_json::to_value(d),
            Self::Emission(d) => serde_json::to_value(d),
            Self::Wireframe(d) => serde_json::to_value(d),
            Self::Isovalues(d) => serde_json::to_value(d),
            Self::Light(d) => serde_json::to_value(d),
            Self::Extinction(d) | Self::Exposure(d) => serde_json::to_value(d),
        }?;
        Ok(value)
    }

    /// Parses a complete descriptor of `channel` from JSON.
    pub fn from_json(channel: Channel, value: Value) -> Result<Self> {
        let invalid = |e: serde_json::Error| UnrayError::invalid(channel.name(), e.to_string());
        Ok(match channel {
            Channel::Cells => Self::Cells(serde_json::from_value(value).map_err(invalid)?),
            Channel::Coordinates => {
                Self::Coordinates(serde_json::from_value(value).map_err(invalid)?)
            }
            Channel::Indicators => {
                Self::Indicators(serde_json::from_value(value).map_err(invalid)?)
            }
            Channel::Density => Self::Density(serde_json::from_value(value).map_err(invalid)?),
            Channel::Emission => Self::Emission(serde_json::from_value(value).map_err(invalid)?),
            Channel::Wireframe => {
                Self::Wireframe(serde_json::from_value(value).map_err(invalid)?)
            }
            Channel::Isovalues => {
                Self::Isovalues(serde_json::from_value(value).map_err(invalid)?)
            }
            Channel::Light => Self::Light(serde_json::from_value(value).map_err(invalid)?),
            Channel::Extinction => {
                Self::Extinction(serde_json::from_value(value).map_err(invalid)?)
            }
            Channel::Exposure => Self::Exposure(serde_json::from_value(value).map_err(invalid)?),
        })
    }

    /// Shallow-merges `overrides` over the default descriptor of `channel`.
    ///
    /// Keys present in `overrides` replace the default value wholesale;
    /// other keys keep their defaults.
    pub fn merged(channel: Channel, overrides: &Map<String, Value>) -> Result<Self> {
        let mut value = Self::default_for(channel).to_json()?;
        if let Value::Object(object) = &mut value {
            for (key, v) in overrides {
                // "range" is the legacy spelling of "domain"
                let key = if key == "range" { "domain" } else { key.as_str() };
                object.insert(key.to_string(), v.clone());
            }
        }
        Self::from_json(channel, value)
    }
}

/// A user-supplied encoding: per-channel overrides of the method defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialEncoding {
    channels: BTreeMap<Channel, Map<String, Value>>,
}

impl PartialEncoding {
    /// Creates an empty encoding (all defaults).
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON object `{channel: {property: value}}`.
    ///
    /// Fails with [`UnrayError::UnknownChannel`] on a channel name with no
    /// handler.
    pub fn from_json(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| UnrayError::invalid("encoding", "expected a JSON object"))?;
        let mut encoding = Self::new();
        for (name, entry) in object {
            let channel: Channel = name.parse()?;
            encoding.set(channel, entry.clone())?;
        }
        Ok(encoding)
    }

    /// Sets the overrides of one channel. `entry` must be a JSON object.
    pub fn set(&mut self, channel: Channel, entry: Value) -> Result<&mut Self> {
        match entry {
            Value::Object(map) => {
                self.channels.insert(channel, map);
                Ok(self)
            }
            other => Err(UnrayError::invalid(
                channel.name(),
                format!("expected an object, got {other}"),
            )),
        }
    }

    /// Builder-style variant of [`PartialEncoding::set`].
    pub fn with(mut self, channel: Channel, entry: Value) -> Result<Self> {
        self.set(channel, entry)?;
        Ok(self)
    }

    /// Shorthand for `{channel: {"field": name}}`.
    #[must_use]
    pub fn with_field(mut self, channel: Channel, name: &str) -> Self {
        let mut map = Map::new();
        map.insert("field".into(), Value::String(name.to_string()));
        self.channels.insert(channel, map);
        self
    }

    /// Returns the overrides of one channel.
    pub fn get(&self, channel: Channel) -> Option<&Map<String, Value>> {
        self.channels.get(&channel)
    }

    /// Iterates over the channels with overrides.
    pub fn channels(&self) -> impl Iterator<Item = Channel> + '_ {
        self.channels.keys().copied()
    }

    /// Returns the number of channels with overrides.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Returns true if no channel is overridden.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl FromStr for PartialEncoding {
    type Err = UnrayError;

    fn from_str(s: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(s)?;
        Self::from_json(&value)
    }
}

/// A complete encoding: one resolved descriptor per channel of a method.
#[derive(Debug, Clone, PartialEq)]
pub struct Encoding {
    method: Method,
    descriptors: Vec<ChannelDescriptor>,
}

impl Encoding {
    /// Returns the default encoding of a method.
    pub fn default_for(method: Method) -> Self {
        Self {
            method,
            descriptors: method
                .channels()
                .iter()
                .map(|&c| ChannelDescriptor::default_for(c))
                .collect(),
        }
    }

    /// Merges a partial encoding over the defaults of `method`.
    ///
    /// Channels the method does not use are ignored with a warning.
    pub fn resolve(method: Method, partial: &PartialEncoding) -> Result<Self> {
        for channel in partial.channels() {
            if !method.uses(channel) {
                log::warn!("channel '{channel}' is not used by method '{method}', ignoring it");
            }
        }
        let descriptors = method
            .channels()
            .iter()
            .map(|&channel| match partial.get(channel) {
                Some(overrides) => ChannelDescriptor::merged(channel, overrides),
                None => Ok(ChannelDescriptor::default_for(channel)),
            })
            .collect::<Result<Vec<_>>>()?;
        log::debug!(
            "resolved {method} encoding with channels {:?}",
            method.channels()
        );
        Ok(Self {
            method,
            descriptors,
        })
    }

    /// Returns the method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// Returns the descriptors in handler order.
    pub fn descriptors(&self) -> &[ChannelDescriptor] {
        &self.descriptors
    }

    /// Returns the descriptor of one channel.
    pub fn get(&self, channel: Channel) -> Option<&ChannelDescriptor> {
        self.descriptors.iter().find(|d| d.channel() == channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_channels() {
        assert!(Method::Surface.uses(Channel::Wireframe));
        assert!(!Method::Surface.uses(Channel::Density));
        assert!(Method::Volume.uses(Channel::Exposure));
        let mesh_channels = [Channel::Cells, Channel::Coordinates, Channel::Indicators];
        for method in Method::ALL {
            assert_eq!(method.channels()[..3], mesh_channels);
        }
    }

    #[test]
    fn test_method_names() {
        for method in Method::ALL {
            assert_eq!(method.name().parse::<Method>().unwrap(), method);
        }
        assert!("mip".parse::<Method>().is_err());
    }

    #[test]
    fn test_unknown_channel() {
        let result = PartialEncoding::from_json(&json!({"colour": {"field": "x"}}));
        assert!(matches!(result, Err(UnrayError::UnknownChannel(name)) if name == "colour"));
    }

    #[test]
    fn test_shallow_merge_keeps_defaults() {
        let partial = PartialEncoding::new()
            .with(Channel::Density, json!({"field": "rho", "scale": "log"}))
            .unwrap();
        let encoding = Encoding::resolve(Method::Volume, &partial).unwrap();
        let Some(ChannelDescriptor::Density(density)) = encoding.get(Channel::Density) else {
            panic!("density missing");
        };
        assert_eq!(density.field.as_deref(), Some("rho"));
        assert_eq!(density.scale, Scale::Log);
        assert_eq!(density.constant, 1.0);
        assert_eq!(density.space, Space::P1);
        assert_eq!(density.domain, Domain::Auto);
        assert_eq!(density.scale_exponent, 2.0);
    }

    #[test]
    fn test_unused_channel_is_ignored() {
        let partial = PartialEncoding::new().with_field(Channel::Density, "rho");
        let encoding = Encoding::resolve(Method::Surface, &partial).unwrap();
        assert!(encoding.get(Channel::Density).is_none());
        assert_eq!(encoding, Encoding::default_for(Method::Surface));
    }

    #[test]
    fn test_invalid_values() {
        let bad_scale = PartialEncoding::new()
            .with(Channel::Density, json!({"scale": "sqrt"}))
            .unwrap();
        assert!(matches!(
            Encoding::resolve(Method::Xray, &bad_scale),
            Err(UnrayError::InvalidEncodingValue { channel, .. }) if channel == "density"
        ));

        let bad_mode = PartialEncoding::new()
            .with(Channel::Isovalues, json!({"mode": "cubic"}))
            .unwrap();
        assert!(matches!(
            Encoding::resolve(Method::Isosurface, &bad_mode),
            Err(UnrayError::InvalidEncodingValue { channel, .. }) if channel == "isovalues"
        ));

        let bad_key = PartialEncoding::new()
            .with(Channel::Wireframe, json!({"thickness": 2}))
            .unwrap();
        assert!(Encoding::resolve(Method::Surface, &bad_key).is_err());
    }

    #[test]
    fn test_non_object_entry() {
        assert!(PartialEncoding::new()
            .with(Channel::Cells, json!("c"))
            .is_err());
    }

    #[test]
    fn test_domain_forms() {
        let partial = PartialEncoding::new()
            .with(Channel::Emission, json!({"range": [0.0, 2.0]}))
            .unwrap();
        let encoding = Encoding::resolve(Method::Max, &partial).unwrap();
        let Some(ChannelDescriptor::Emission(emission)) = encoding.get(Channel::Emission) else {
            panic!("emission missing");
        };
        assert_eq!(emission.domain, Domain::Range(0.0, 2.0));

        let bad = PartialEncoding::new()
            .with(Channel::Emission, json!({"domain": "full"}))
            .unwrap();
        assert!(Encoding::resolve(Method::Max, &bad).is_err());
    }

    #[test]
    fn test_log_base() {
        let base: LogBase = serde_json::from_value(json!(10.0)).unwrap();
        assert_eq!(base, LogBase::Value(10.0));
        assert!((base.inv_ln() - 1.0 / 10f64.ln()).abs() < 1e-12);
        assert_eq!(serde_json::from_value::<LogBase>(json!("e")).unwrap(), LogBase::E);
        assert!(serde_json::from_value::<LogBase>(json!(1.0)).is_err());
        assert!(serde_json::from_value::<LogBase>(json!(-2.0)).is_err());
    }

    #[test]
    fn test_color_parsing() {
        assert_eq!(Color::from_hex("#ffffff").unwrap(), Color::WHITE);
        assert_eq!(Color::from_hex("#000").unwrap(), Color::BLACK);
        let c = Color::from_hex("#ff8000").unwrap();
        assert!((c.0.y - 128.0 / 255.0).abs() < 1e-6);
        assert!(Color::from_hex("ff8000").is_err());
        assert!(Color::from_hex("#ff80").is_err());
        assert!(Color::from_hex("#gg0000").is_err());
        let rgb: Color = serde_json::from_value(json!([0.5, 0.25, 1.0])).unwrap();
        assert_eq!(rgb.0, Vec3::new(0.5, 0.25, 1.0));
    }

    #[test]
    fn test_from_str() {
        let partial: PartialEncoding =
            r#"{"cells": {"field": "c"}, "coordinates": {"field": "p"}}"#.parse().unwrap();
        assert_eq!(partial.len(), 2);
        assert_eq!(
            partial.get(Channel::Cells).unwrap()["field"],
            Value::String("c".into())
        );
        assert!(matches!(
            "not json".parse::<PartialEncoding>(),
            Err(UnrayError::JsonError(_))
        ));
    }
}
