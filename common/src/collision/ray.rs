use bevy_ecs::prelude::*;
use bevy_math::Vec3;

use super::helpers::capsule_segment;
use crate::{
    components::{Body, Position},
    constants::PHYSICS_EPSILON,
};

// ============================================================================
// Ray Queries
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub entity: Entity,
    pub distance: f32,
    pub impact_point: Vec3,
    pub impact_normal: Vec3,
}

// Distance along a unit-direction ray to a sphere, or `None`.
// A ray starting inside the sphere hits at distance 0.
#[must_use]
pub fn ray_vs_sphere(origin: Vec3, dir: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let m = origin - center;
    let b = m.dot(dir);
    let c = radius.mul_add(-radius, m.length_squared());

    // Outside and pointing away
    if c > 0.0 && b > 0.0 {
        return None;
    }

    let discriminant = b.mul_add(b, -c);
    if discriminant < 0.0 {
        return None;
    }

    Some((-b - discriminant.sqrt()).max(0.0))
}

// Distance along a unit-direction ray to a vertical capsule, or `None`.
#[must_use]
pub fn ray_vs_capsule(origin: Vec3, dir: Vec3, center: Vec3, radius: f32, half_height: f32) -> Option<f32> {
    let (bottom, top) = capsule_segment(center, radius, half_height);
    let mut best: Option<f32> = None;
    let mut consider = |t: f32| {
        if best.is_none_or(|current| t < current) {
            best = Some(t);
        }
    };

    // Cylinder around the segment, solved in the XY plane
    let m_x = origin.x - center.x;
    let m_y = origin.y - center.y;
    let a = dir.x.mul_add(dir.x, dir.y * dir.y);
    if a > PHYSICS_EPSILON {
        let b = m_x.mul_add(dir.x, m_y * dir.y);
        let c = m_x.mul_add(m_x, m_y.mul_add(m_y, -radius * radius));
        let discriminant = b.mul_add(b, -a * c);
        if discriminant >= 0.0 {
            let root = discriminant.sqrt();
            let t_exit = (-b + root) / a;
            if t_exit >= 0.0 {
                let t = ((-b - root) / a).max(0.0);
                let z = dir.z.mul_add(t, origin.z);
                if z >= bottom.z && z <= top.z {
                    consider(t);
                }
            }
        }
    }

    // Hemispherical caps
    if let Some(t) = ray_vs_sphere(origin, dir, bottom, radius) {
        consider(t);
    }
    if let Some(t) = ray_vs_sphere(origin, dir, top, radius) {
        consider(t);
    }

    best
}

// Closest body hit along the ray within `range`, ignoring `ignore`.
pub fn trace_ray(world: &mut World, origin: Vec3, dir: Vec3, range: f32, ignore: Option<Entity>) -> Option<RayHit> {
    let dir = dir.normalize_or_zero();
    if dir == Vec3::ZERO || range <= 0.0 {
        return None;
    }

    let mut query = world.query::<(Entity, &Position, &Body)>();
    let mut best: Option<RayHit> = None;
    for (entity, pos, body) in query.iter(world) {
        if Some(entity) == ignore {
            continue;
        }
        let Some(distance) = ray_vs_capsule(origin, dir, pos.0, body.radius, body.half_height) else {
            continue;
        };
        if distance > range || best.is_some_and(|hit| hit.distance <= distance) {
            continue;
        }

        let impact_point = origin + dir * distance;
        let (bottom, top) = capsule_segment(pos.0, body.radius, body.half_height);
        let axis_point = Vec3::new(pos.0.x, pos.0.y, impact_point.z.clamp(bottom.z, top.z));
        let impact_normal = (impact_point - axis_point).normalize_or(-dir);

        best = Some(RayHit {
            entity,
            distance,
            impact_point,
            impact_normal,
        });
    }
    best
}
