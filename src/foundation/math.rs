/// Effective sample count for a requested antialiasing quality.
///
/// The result is always `1` (no multisampling) or an even number.
pub fn derive_samples(quality: u32) -> u32 {
    if quality <= 1 { 1 } else { 2 * (quality / 2) }
}

/// Smallest power of two `>= val`. `0` maps to `1`; `None` when it does not fit in a `u32`.
pub fn next_power_of_two(val: u32) -> Option<u32> {
    val.max(1).checked_next_power_of_two()
}

/// Halve until `1 + eps/2` rounds back to `1`.
pub(crate) fn machine_epsilon_f32() -> f32 {
    let mut eps = 1.0f32;
    loop {
        eps /= 2.0;
        if (1.0f64 + f64::from(eps) / 2.0) as f32 == 1.0 {
            break;
        }
    }
    eps
}

/// Map a pixel coordinate to normalized device coordinates (`-1..1`) over `extent` pixels.
pub fn to_ndc(v: f32, extent: u32) -> f32 {
    if extent == 0 {
        return -1.0;
    }
    2.0 * v / extent as f32 - 1.0
}

/// Convert a caller row (0 = top) into a driver row (0 = bottom).
pub fn flip_row(height: u32, y: u32) -> Option<u32> {
    height.checked_sub(y)?.checked_sub(1)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
