use glam::Vec3;

/// Convert hue, saturation and value to linear RGB
///
/// Hue wraps into `[0, 1)`. Value is not clamped, so `v > 1` yields HDR
/// colours suitable for emission.
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> [f32; 3] {
    let hue = Vec3::splat(h.rem_euclid(1.0)) + Vec3::new(0.0, 2.0 / 3.0, 1.0 / 3.0);
    let ramp = ((hue.fract() * 6.0 - 3.0).abs() - 1.0).clamp(Vec3::ZERO, Vec3::ONE);
    (Vec3::ONE.lerp(ramp, s.clamp(0.0, 1.0)) * v).to_array()
}
