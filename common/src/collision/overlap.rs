use bevy_ecs::prelude::*;
use bevy_math::Vec3;

use super::helpers::{capsule_segment, closest_point_on_segment};
use crate::components::{Body, Position};

// ============================================================================
// Sphere Overlap Query
// ============================================================================

// Which primitive of an actor the query touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Capsule,
    SkeletalMesh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapHit {
    pub entity: Entity,
    pub primitive: Primitive,
}

// Does a sphere touch a body's capsule?
#[must_use]
pub fn overlap_sphere_vs_body(center: Vec3, radius: f32, body_pos: Vec3, body: &Body) -> bool {
    let (a, b) = capsule_segment(body_pos, body.radius, body.half_height);
    let closest = closest_point_on_segment(center, a, b);
    let reach = radius + body.radius;
    center.distance_squared(closest) <= reach * reach
}

// All body primitives overlapping the sphere. A body with a mesh is reported
// twice (capsule and mesh), so callers that act once per actor must dedupe.
// A non-positive radius finds nothing.
pub fn overlap_sphere(world: &mut World, center: Vec3, radius: f32) -> Vec<OverlapHit> {
    if radius <= 0.0 {
        return Vec::new();
    }

    let mut query = world.query::<(Entity, &Position, &Body)>();
    let mut hits = Vec::new();
    for (entity, pos, body) in query.iter(world) {
        if !overlap_sphere_vs_body(center, radius, pos.0, body) {
            continue;
        }
        hits.push(OverlapHit {
            entity,
            primitive: Primitive::Capsule,
        });
        if body.has_mesh {
            hits.push(OverlapHit {
                entity,
                primitive: Primitive::SkeletalMesh,
            });
        }
    }
    hits
}

// Plain point-in-sphere check (pickup collection).
#[must_use]
pub fn within_radius(a: Vec3, b: Vec3, radius: f32) -> bool {
    a.distance_squared(b) <= radius * radius
}
