//! Value-to-unit-interval mapping parameters.
//!
//! The shader evaluates `t = m * f(x) + b` where `f` is the identity, a
//! logarithm or a power depending on the scale, so a domain `[a, b]` maps
//! to `[0, 1]` with one multiply-add after `f`.

use crate::data::TypedArray;
use crate::encoding::{Domain, MappedField, Scale};
use crate::error::{Result, UnrayError};

/// Uniform parameters of one channel's scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScaleParams {
    /// No mapping, only the define is set.
    Identity,
    Linear { m: f32, b: f32 },
    Log { m: f32, b: f32 },
    Pow { m: f32, b: f32, k: f32 },
}

impl ScaleParams {
    /// Returns the suffix of the `USE_<CHANNEL>_SCALE_*` define.
    pub fn define_suffix(&self) -> &'static str {
        match self {
            ScaleParams::Identity => "IDENTITY",
            ScaleParams::Linear { .. } => "LINEAR",
            ScaleParams::Log { .. } => "LOG",
            ScaleParams::Pow { .. } => "POW",
        }
    }

    /// Returns `(m, b)` for the non-identity scales.
    pub fn slope_intercept(&self) -> Option<(f32, f32)> {
        match *self {
            ScaleParams::Identity => None,
            ScaleParams::Linear { m, b }
            | ScaleParams::Log { m, b }
            | ScaleParams::Pow { m, b, .. } => Some((m, b)),
        }
    }

    /// Returns the exponent of a pow scale.
    pub fn exponent(&self) -> Option<f32> {
        match *self {
            ScaleParams::Pow { k, .. } => Some(k),
            _ => None,
        }
    }
}

/// Resolves a domain, scanning `array` for `[min, max]` when it is `auto`.
pub fn resolve_domain(channel: &str, domain: Domain, array: &TypedArray) -> Result<[f64; 2]> {
    match domain {
        Domain::Range(a, b) => Ok([a, b]),
        Domain::Auto => array.range().ok_or_else(|| {
            UnrayError::invalid(channel, "cannot compute the range of an empty field")
        }),
    }
}

/// Solves `m * fa + b = 0` and `m * fb + b = 1`; a zero-width domain gets slope 0.
fn solve(fa: f64, fb: f64) -> (f32, f32) {
    let width = fb - fa;
    if width == 0.0 {
        return (0.0, 0.0);
    }
    let m = 1.0 / width;
    #[allow(clippy::cast_possible_truncation)]
    (m as f32, (-fa * m) as f32)
}

/// Computes the scale parameters of a density or emission channel.
///
/// A channel without a field, or with the identity scale, uses the identity.
pub fn compute_scale(
    channel: &str,
    mapping: &MappedField<'_>,
    array: Option<&TypedArray>,
) -> Result<ScaleParams> {
    let array = match (mapping.scale, array) {
        (Scale::Identity, _) | (_, None) => return Ok(ScaleParams::Identity),
        (_, Some(array)) => array,
    };
    let [xa, xb] = resolve_domain(channel, mapping.domain, array)?;

    Ok(match mapping.scale {
        Scale::Identity => ScaleParams::Identity,
        Scale::Linear => {
            let (m, b) = solve(xa, xb);
            ScaleParams::Linear { m, b }
        }
        Scale::Log => {
            if xa <= 0.0 || xb <= 0.0 {
                return Err(UnrayError::invalid(
                    channel,
                    format!("log scale needs a positive domain, got [{xa}, {xb}]"),
                ));
            }
            let s = mapping.scale_base.inv_ln();
            let (m, b) = solve(s * xa.ln(), s * xb.ln());
            ScaleParams::Log { m, b }
        }
        Scale::Pow => {
            let k = mapping.scale_exponent;
            let (fa, fb) = (xa.powf(k), xb.powf(k));
            if !fa.is_finite() || !fb.is_finite() {
                return Err(UnrayError::invalid(
                    channel,
                    format!("pow scale with exponent {k} is undefined on [{xa}, {xb}]"),
                ));
            }
            let (m, b) = solve(fa, fb);
            #[allow(clippy::cast_possible_truncation)]
            ScaleParams::Pow { m, b, k: k as f32 }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{DensityChannel, LogBase};

    fn mapped(scale: Scale, domain: Domain) -> DensityChannel {
        DensityChannel {
            field: Some("f".into()),
            scale,
            domain,
            ..DensityChannel::default()
        }
    }

    #[test]
    fn test_linear_auto_domain() {
        let array = TypedArray::from(vec![2.0f32, 4.0, 6.0]);
        let desc = mapped(Scale::Linear, Domain::Auto);
        let params = compute_scale("density", &desc.mapped(), Some(&array)).unwrap();
        assert_eq!(params, ScaleParams::Linear { m: 0.25, b: -0.5 });
        let (m, b) = params.slope_intercept().unwrap();
        assert_eq!(m * 2.0 + b, 0.0);
        assert_eq!(m * 6.0 + b, 1.0);
    }

    #[test]
    fn test_identity_without_field() {
        let desc = DensityChannel::default();
        let params = compute_scale("density", &desc.mapped(), None).unwrap();
        assert_eq!(params, ScaleParams::Identity);
        assert_eq!(params.define_suffix(), "IDENTITY");

        let array = TypedArray::from(vec![1.0f32]);
        let desc = mapped(Scale::Identity, Domain::Auto);
        let params = compute_scale("density", &desc.mapped(), Some(&array)).unwrap();
        assert_eq!(params, ScaleParams::Identity);
    }

    #[test]
    fn test_log_scale() {
        let array = TypedArray::from(vec![0.0f32]);
        let desc = DensityChannel {
            scale_base: LogBase::Value(10.0),
            ..mapped(Scale::Log, Domain::Range(1.0, 100.0))
        };
        let params = compute_scale("density", &desc.mapped(), Some(&array)).unwrap();
        let ScaleParams::Log { m, b } = params else {
            panic!("expected log scale");
        };
        // log10 maps [1, 100] to [0, 2]
        assert!((m - 0.5).abs() < 1e-6);
        assert!(b.abs() < 1e-6);
    }

    #[test]
    fn test_log_rejects_non_positive_domain() {
        let array = TypedArray::from(vec![-1.0f32, 3.0]);
        let desc = mapped(Scale::Log, Domain::Auto);
        assert!(matches!(
            compute_scale("emission", &desc.mapped(), Some(&array)),
            Err(UnrayError::InvalidEncodingValue { channel, .. }) if channel == "emission"
        ));
    }

    #[test]
    fn test_pow_rejects_negative_domain_with_fractional_exponent() {
        let array = TypedArray::from(vec![-1.0f32, 4.0]);
        let desc = DensityChannel {
            scale_exponent: 0.5,
            ..mapped(Scale::Pow, Domain::Auto)
        };
        assert!(matches!(
            compute_scale("density", &desc.mapped(), Some(&array)),
            Err(UnrayError::InvalidEncodingValue { channel, .. }) if channel == "density"
        ));

        // integer exponents are defined on negative values
        let desc = mapped(Scale::Pow, Domain::Range(-2.0, 0.0));
        let params = compute_scale("density", &desc.mapped(), Some(&array)).unwrap();
        assert_eq!(params, ScaleParams::Pow { m: -0.25, b: 1.0, k: 2.0 });
    }

    #[test]
    fn test_pow_scale() {
        let array = TypedArray::from(vec![0.0f64, 1.0, 2.0]);
        let desc = mapped(Scale::Pow, Domain::Auto);
        let params = compute_scale("density", &desc.mapped(), Some(&array)).unwrap();
        assert_eq!(params, ScaleParams::Pow { m: 0.25, b: 0.0, k: 2.0 });
        assert_eq!(params.exponent(), Some(2.0));
    }

    #[test]
    fn test_zero_width_domain() {
        let array = TypedArray::from(vec![3.0f32, 3.0]);
        let desc = mapped(Scale::Linear, Domain::Auto);
        let params = compute_scale("density", &desc.mapped(), Some(&array)).unwrap();
        assert_eq!(params.slope_intercept(), Some((0.0, 0.0)));
    }

    #[test]
    fn test_empty_field_with_auto_domain() {
        let array = TypedArray::from(Vec::<f32>::new());
        let desc = mapped(Scale::Linear, Domain::Auto);
        assert!(compute_scale("density", &desc.mapped(), Some(&array)).is_err());
    }
}
