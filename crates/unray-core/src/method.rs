//! Render state of each method.
//!
//! `src` is the fragment shader output and `dst` the framebuffer value.
//! The shaders emit premultiplied color `C` with alpha `a`, so the
//! compositing rules read:
//!
//! - max/min: `dst = max(dst, C)` / `dst = min(dst, C)`
//! - sum: `dst = dst + C`
//! - xray/volume: `dst = (1 - a) * dst + C`
//!
//! Changing what a shader emits requires changing its entry here.

use glam::Vec3;

use crate::encoding::Method;

/// Which triangle faces are rasterized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Front,
    Back,
    Double,
}

/// Blend equation combining source and destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendEquation {
    Add,
    Min,
    Max,
}

/// Blend factor applied to source or destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
}

/// Custom blending of a transparent method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blend {
    pub equation: BlendEquation,
    pub src: BlendFactor,
    pub dst: BlendFactor,
}

/// Fixed-function state of a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodConfig {
    /// Cells are oriented so that front faces are visible.
    pub side: Side,
    pub transparent: bool,
    /// Depth testing composes with previously drawn opaque objects.
    pub depth_test: bool,
    pub depth_write: bool,
    /// `None` for opaque methods.
    pub blend: Option<Blend>,
}

const OPAQUE: MethodConfig = MethodConfig {
    side: Side::Front,
    transparent: false,
    depth_test: true,
    depth_write: true,
    blend: None,
};

const fn transparent(equation: BlendEquation, src: BlendFactor, dst: BlendFactor) -> MethodConfig {
    MethodConfig {
        side: Side::Front,
        transparent: true,
        depth_test: true,
        depth_write: false,
        blend: Some(Blend { equation, src, dst }),
    }
}

/// Returns the render state of a method.
pub fn method_config(method: Method) -> MethodConfig {
    use BlendFactor::{One, OneMinusSrcAlpha};
    match method {
        Method::Surface | Method::Isosurface => OPAQUE,
        Method::Max => transparent(BlendEquation::Max, One, One),
        Method::Min => transparent(BlendEquation::Min, One, One),
        Method::Sum => transparent(BlendEquation::Add, One, One),
        Method::Xray | Method::Volume => transparent(BlendEquation::Add, One, OneMinusSrcAlpha),
    }
}

impl Method {
    /// Returns the render state of this method.
    pub fn config(self) -> MethodConfig {
        method_config(self)
    }

    /// Returns true if the draw order of cells changes the composited color.
    ///
    /// Opaque methods rely on the depth test and max/min/sum blending is
    /// commutative.
    pub fn needs_sorting(self) -> bool {
        matches!(self, Method::Xray | Method::Volume)
    }

    /// Returns the background the method is meant to be seen against.
    pub fn background_color(self) -> Vec3 {
        match self {
            Method::Max | Method::Sum => Vec3::ZERO,
            _ => Vec3::ONE,
        }
    }
}
