use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box stored as center and half-extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub center: Vec3,
    pub extent: Vec3,
}

impl Aabb {
    pub fn new(center: Vec3, extent: Vec3) -> Self {
        Self { center, extent }
    }

    /// Cube centered at `center` with the same half-extent on every axis.
    pub fn cube(center: Vec3, half_extent: f32) -> Self {
        Self::new(center, Vec3::splat(half_extent))
    }

    #[inline]
    pub fn min(&self) -> Vec3 {
        self.center - self.extent
    }

    #[inline]
    pub fn max(&self) -> Vec3 {
        self.center + self.extent
    }

    /// Closed containment test; points on a face are inside.
    #[inline]
    pub fn contains_point(&self, point: Vec3) -> bool {
        let min = self.min();
        let max = self.max();
        point.x >= min.x
            && point.x <= max.x
            && point.y >= min.y
            && point.y <= max.y
            && point.z >= min.z
            && point.z <= max.z
    }

    #[inline]
    pub fn intersects(&self, other: &Aabb) -> bool {
        let a_min = self.min();
        let a_max = self.max();
        let b_min = other.min();
        let b_max = other.max();
        a_min.x <= b_max.x
            && a_max.x >= b_min.x
            && a_min.y <= b_max.y
            && a_max.y >= b_min.y
            && a_min.z <= b_max.z
            && a_max.z >= b_min.z
    }

    /// Index of the octant containing `point`: bit 0 = x, bit 1 = y, bit 2 = z,
    /// set when the coordinate is on the high side of the center.
    #[inline]
    pub fn octant_index(&self, point: Vec3) -> usize {
        let mut idx = 0;
        if point.x >= self.center.x {
            idx |= 1;
        }
        if point.y >= self.center.y {
            idx |= 2;
        }
        if point.z >= self.center.z {
            idx |= 4;
        }
        idx
    }

    /// Bounds of the child octant `idx` (same bit layout as `octant_index`).
    pub fn octant(&self, idx: usize) -> Aabb {
        let half = self.extent * 0.5;
        let sign = |bit: usize| if idx & bit != 0 { 1.0 } else { -1.0 };
        let offset = Vec3::new(sign(1) * half.x, sign(2) * half.y, sign(4) * half.z);
        Aabb::new(self.center + offset, half)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_point_is_closed() {
        let b = Aabb::cube(Vec3::ZERO, 10.0);
        assert!(b.contains_point(Vec3::new(10.0, -10.0, 0.0)));
        assert!(!b.contains_point(Vec3::new(10.01, 0.0, 0.0)));
    }

    #[test]
    fn test_octant_contains_points_it_indexes() {
        let b = Aabb::cube(Vec3::ZERO, 8.0);
        let points = [
            Vec3::new(-3.0, -3.0, -3.0),
            Vec3::new(3.0, -3.0, 5.0),
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(-8.0, 8.0, 8.0),
        ];
        for p in points {
            let idx = b.octant_index(p);
            assert!(b.octant(idx).contains_point(p), "octant {idx} misses {p:?}");
        }
    }

    #[test]
    fn test_intersects() {
        let a = Aabb::cube(Vec3::ZERO, 1.0);
        let b = Aabb::cube(Vec3::new(2.0, 0.0, 0.0), 1.0);
        let c = Aabb::cube(Vec3::new(3.5, 0.0, 0.0), 1.0);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }
}
