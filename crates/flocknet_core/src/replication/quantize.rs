use glam::Vec3;

/// Scales `location` down by `tolerance` and truncates toward zero into `i16`.
///
/// Values beyond the `i16` range saturate. Within range the reconstruction
/// error is strictly below `tolerance` on every axis.
#[inline]
pub fn quantize(location: Vec3, tolerance: f32) -> [i16; 3] {
    let scaled = location / tolerance;
    // `as` truncates toward zero and saturates, which is exactly the wire rule.
    [scaled.x as i16, scaled.y as i16, scaled.z as i16]
}

#[inline]
pub fn dequantize(quantized: [i16; 3], tolerance: f32) -> Vec3 {
    Vec3::new(
        f32::from(quantized[0]),
        f32::from(quantized[1]),
        f32::from(quantized[2]),
    ) * tolerance
}

/// True when every axis of `a` and `b` differs by at most `tolerance`.
#[inline]
pub fn within_tolerance(a: Vec3, b: Vec3, tolerance: f32) -> bool {
    (a - b).abs().max_element() <= tolerance
}
