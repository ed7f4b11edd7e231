use bevy_math::Vec3;

// Check if two 1D ranges overlap.
#[must_use]
pub fn ranges_overlap_1d(a_min: f32, a_max: f32, b_min: f32, b_max: f32) -> bool {
    a_max >= b_min && a_min <= b_max
}

// Closest point to `point` on the segment `a`..`b`.
#[must_use]
pub fn closest_point_on_segment(point: Vec3, a: Vec3, b: Vec3) -> Vec3 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return a;
    }
    let t = ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

// End points of the inner segment of a vertical capsule centered at `center`.
#[must_use]
pub fn capsule_segment(center: Vec3, radius: f32, half_height: f32) -> (Vec3, Vec3) {
    let half_segment = (half_height - radius).max(0.0);
    (center - Vec3::Z * half_segment, center + Vec3::Z * half_segment)
}

// Point inside a box given in its local frame (already translated and unrotated).
#[must_use]
pub fn point_in_local_box(local: Vec3, half_extent: Vec3) -> bool {
    ranges_overlap_1d(local.x, local.x, -half_extent.x, half_extent.x)
        && ranges_overlap_1d(local.y, local.y, -half_extent.y, half_extent.y)
        && ranges_overlap_1d(local.z, local.z, -half_extent.z, half_extent.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closest_point_clamps_to_ends() {
        let a = Vec3::ZERO;
        let b = Vec3::new(0.0, 0.0, 10.0);
        assert_eq!(closest_point_on_segment(Vec3::new(5.0, 0.0, 20.0), a, b), b);
        assert_eq!(closest_point_on_segment(Vec3::new(5.0, 0.0, -3.0), a, b), a);
        assert_eq!(closest_point_on_segment(Vec3::new(5.0, 0.0, 4.0), a, b), Vec3::new(0.0, 0.0, 4.0));
    }

    #[test]
    fn squat_capsule_collapses_to_a_point() {
        let (a, b) = capsule_segment(Vec3::ONE, 50.0, 40.0);
        assert_eq!(a, b);
    }

    #[test]
    fn local_box_bounds_are_inclusive() {
        let half = Vec3::new(1.0, 2.0, 3.0);
        assert!(point_in_local_box(Vec3::new(1.0, -2.0, 3.0), half));
        assert!(!point_in_local_box(Vec3::new(1.1, 0.0, 0.0), half));
    }
}
