use crowdprice_config::SaturationCurve;

/// Map a raw score into `[-1, 1]`.
///
/// Every curve is odd, monotonically non-decreasing and saturating, so extra
/// reputation always helps but with diminishing returns.
pub fn normalize(curve: &SaturationCurve, score: f64) -> f64 {
    if !score.is_finite() {
        return if score.is_nan() { 0.0 } else { score.signum() };
    }

    let normalized = match *curve {
        SaturationCurve::Rational { half_point } => score / (score.abs() + half_point),
        SaturationCurve::Tanh { scale } => (score / scale).tanh(),
        SaturationCurve::Linear { full_at } => score / full_at,
    };
    normalized.clamp(-1.0, 1.0)
}
