//! Math type re-exports and flat-array helpers.
//!
//! Vertex data travels through the file as flat `f32` arrays; the object
//! model exposes them as glam vectors. Conversion goes through `bytemuck`
//! so no per-element copying logic is needed.

pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

use bytemuck::{Pod, Zeroable};
use serde::Serialize;

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable, Serialize)]
#[repr(C)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create a new bounding box from min and max points.
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Compute the bounds of a point set. Returns `None` for an empty set.
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let first = *points.first()?;
        let (min, max) = points
            .iter()
            .fold((first, first), |(lo, hi), p| (lo.min(*p), hi.max(*p)));
        Some(Self { min, max })
    }

    /// Size along each axis.
    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Check if a point lies inside (inclusive).
    #[inline]
    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }
}

/// Reinterpret a flat float array as vectors of `T`.
///
/// Returns `None` when the array length is not a multiple of the vector width.
/// Copies rather than casts, since SIMD-backed types such as `Vec4` are more
/// strictly aligned than `f32`.
pub fn unflatten<T: Pod>(values: &[f32]) -> Option<Vec<T>> {
    let width = std::mem::size_of::<T>();
    if width == 0 || (values.len() * std::mem::size_of::<f32>()) % width != 0 {
        return None;
    }
    Some(bytemuck::pod_collect_to_vec(values))
}

/// Flatten vectors back into the file's float array layout.
pub fn flatten<T: Pod>(values: &[T]) -> Vec<f32> {
    bytemuck::cast_slice::<T, f32>(values).to_vec()
}

/// Bitwise equality, so NaN payloads compare equal to themselves.
#[inline]
pub fn bits_eq<T: Pod>(a: &T, b: &T) -> bool {
    bytemuck::bytes_of(a) == bytemuck::bytes_of(b)
}

/// Bitwise equality of two slices of plain-old-data values.
pub fn slice_bits_eq<T: Pod>(a: &[T], b: &[T]) -> bool {
    a.len() == b.len() && bytemuck::cast_slice::<T, u8>(a) == bytemuck::cast_slice::<T, u8>(b)
}

pub fn option_bits_eq<T: Pod>(a: &Option<T>, b: &Option<T>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => bits_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

pub fn option_slice_bits_eq<T: Pod>(a: &Option<Vec<T>>, b: &Option<Vec<T>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => slice_bits_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Quaternion from the file's `x, y, z, w` order.
#[inline]
pub fn quat_from_xyzw(v: &[f32]) -> Option<Quat> {
    match v {
        [x, y, z, w] => Some(Quat::from_xyzw(*x, *y, *z, *w)),
        _ => None,
    }
}

/// Quaternion into the file's `x, y, z, w` order.
#[inline]
pub fn quat_to_xyzw(q: Quat) -> [f32; 4] {
    [q.x, q.y, q.z, q.w]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_eq_nan() {
        let nan = Vec3::new(f32::NAN, 0.0, 0.0);
        assert_ne!(nan, nan);
        assert!(bits_eq(&nan, &nan));
        assert!(!bits_eq(&0.0f32, &-0.0f32));
        assert!(slice_bits_eq(&[f32::NAN, 1.0], &[f32::NAN, 1.0]));
        assert!(!slice_bits_eq(&[1.0f32], &[1.0, 2.0]));
        assert!(option_slice_bits_eq(&Some(vec![nan]), &Some(vec![nan])));
        assert!(!option_bits_eq(&Some(1.0f32), &None));
    }

    #[test]
    fn test_unflatten_vec3() {
        let flat = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let v: Vec<Vec3> = unflatten(&flat).unwrap();
        assert_eq!(v, vec![Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0)]);
        assert_eq!(flatten(&v), flat.to_vec());
    }

    #[test]
    fn test_unflatten_vec4_from_unaligned() {
        // Offset by one float so the source is not 16-byte aligned.
        let flat = [0.0, 1.0, 2.0, 3.0, -1.0];
        let v: Vec<Vec4> = unflatten(&flat[1..]).unwrap();
        assert_eq!(v, vec![Vec4::new(1.0, 2.0, 3.0, -1.0)]);
    }

    #[test]
    fn test_unflatten_rejects_ragged() {
        assert!(unflatten::<Vec3>(&[1.0, 2.0]).is_none());
        assert!(unflatten::<Vec2>(&[1.0, 2.0, 3.0]).is_none());
    }

    #[test]
    fn test_aabb_from_points() {
        let pts = [Vec3::new(-1.0, 0.0, 2.0), Vec3::new(3.0, -4.0, 0.5)];
        let bb = Aabb::from_points(&pts).unwrap();
        assert_eq!(bb.min, Vec3::new(-1.0, -4.0, 0.5));
        assert_eq!(bb.max, Vec3::new(3.0, 0.0, 2.0));
        assert!(bb.contains(Vec3::ZERO));
        assert!(Aabb::from_points(&[]).is_none());
    }

    #[test]
    fn test_quat_order() {
        let q = quat_from_xyzw(&[0.0, 0.0, 0.0, 1.0]).unwrap();
        assert_eq!(q, Quat::IDENTITY);
        assert_eq!(quat_to_xyzw(q), [0.0, 0.0, 0.0, 1.0]);
        assert!(quat_from_xyzw(&[1.0]).is_none());
    }
}
