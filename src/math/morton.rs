//! Morton encoding (Z-order curve) for spatial sorting

use crate::core::types::Vec3;

/// Spread bits of a 10-bit integer into every third bit of a 32-bit integer
fn spread_bits(x: u32) -> u32 {
    let mut x = x & 0x3ff; // 10 bits max
    x = (x | (x << 16)) & 0x030000ff;
    x = (x | (x << 8)) & 0x0300f00f;
    x = (x | (x << 4)) & 0x030c30c3;
    x = (x | (x << 2)) & 0x09249249;
    x
}

/// Compact every third bit of a 32-bit integer into a 10-bit integer
fn compact_bits(x: u32) -> u32 {
    let mut x = x & 0x09249249;
    x = (x | (x >> 2)) & 0x030c30c3;
    x = (x | (x >> 4)) & 0x0300f00f;
    x = (x | (x >> 8)) & 0x030000ff;
    x = (x | (x >> 16)) & 0x000003ff;
    x
}

/// Encode 3D coordinates into a 30-bit Morton code
/// Each coordinate can be up to 10 bits (0..1023); x occupies the
/// highest bit of each triple
pub fn encode_morton_3d(x: u32, y: u32, z: u32) -> u32 {
    (spread_bits(x) << 2) | (spread_bits(y) << 1) | spread_bits(z)
}

/// Decode a 30-bit Morton code back to 3D coordinates
pub fn decode_morton_3d(code: u32) -> (u32, u32, u32) {
    (
        compact_bits(code >> 2),
        compact_bits(code >> 1),
        compact_bits(code),
    )
}

/// Morton code of a point with coordinates normalized to [0, 1]
///
/// Coordinates are clamped to the unit cube, scaled to [0, 1023] and
/// truncated before interleaving.
pub fn morton_from_unit(p: Vec3) -> u32 {
    let q = p.clamp(Vec3::ZERO, Vec3::ONE) * 1023.0;
    encode_morton_3d(q.x as u32, q.y as u32, q.z as u32)
}
