use bevy_ecs::prelude::*;
use bevy_math::{Mat3, Quat, Vec3};
use bevy_time::Time;
use tracing::{debug, warn};

use crate::{
    collision::helpers::point_in_local_box,
    components::{Orientation, Position, Velocity},
    constants::*,
    events::{GameEvent, emit},
    handle::WeakRef,
    markers::TravellerMarker,
};

// ============================================================================
// Portal Frames
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortalPose {
    pub location: Vec3,
    pub rotation: Quat,
}

impl PortalPose {
    #[must_use]
    pub const fn new(location: Vec3, rotation: Quat) -> Self {
        Self { location, rotation }
    }

    #[must_use]
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::X
    }
}

/// A portal's pose together with its spouse's, if it has one. All conversions
/// map quantities at this portal to the matching quantities at the spouse and
/// are the identity when the portal is unpaired.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortalFrame {
    pub this: PortalPose,
    pub spouse: Option<PortalPose>,
}

// Where the scene capture at the spouse should render from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureView {
    pub location: Vec3,
    pub rotation: Quat,
    pub clip_plane_base: Vec3,
    pub clip_plane_normal: Vec3,
}

impl PortalFrame {
    #[must_use]
    pub const fn unpaired(this: PortalPose) -> Self {
        Self { this, spouse: None }
    }

    #[must_use]
    pub const fn paired(this: PortalPose, spouse: PortalPose) -> Self {
        Self {
            this,
            spouse: Some(spouse),
        }
    }

    // Into this portal's local frame, half turn about local up, out of the
    // spouse's frame. Entering one front exits the other front.
    #[must_use]
    pub fn convert_direction(&self, direction: Vec3) -> Vec3 {
        let Some(spouse) = self.spouse else {
            return direction;
        };
        let local = self.this.rotation.inverse() * direction;
        spouse.rotation * Vec3::new(-local.x, -local.y, local.z)
    }

    #[must_use]
    pub fn convert_location(&self, location: Vec3) -> Vec3 {
        let Some(spouse) = self.spouse else {
            return location;
        };
        spouse.location - self.convert_direction(self.this.location - location)
    }

    #[must_use]
    pub fn convert_rotation(&self, rotation: Quat) -> Quat {
        if self.spouse.is_none() {
            return rotation;
        }
        let x = self.convert_direction(rotation * Vec3::X);
        let z = self.convert_direction(rotation * Vec3::Z);
        rotation_from_xz(x, z)
    }

    // Camera pose and clip plane for rendering the view through this portal.
    #[must_use]
    pub fn capture_view(&self, camera: PortalPose) -> Option<CaptureView> {
        let spouse = self.spouse?;
        Some(CaptureView {
            location: self.convert_location(camera.location),
            rotation: self.convert_rotation(camera.rotation),
            clip_plane_base: spouse.location,
            clip_plane_normal: spouse.forward(),
        })
    }
}

// Orthonormal rotation whose X axis is `x` and whose Z axis is as close to `z`
// as possible.
#[must_use]
pub fn rotation_from_xz(x: Vec3, z: Vec3) -> Quat {
    let x = x.normalize_or_zero();
    if x == Vec3::ZERO {
        return Quat::IDENTITY;
    }

    let y = z.cross(x);
    if y.length_squared() <= PHYSICS_EPSILON {
        return Quat::from_rotation_arc(Vec3::X, x);
    }
    let y = y.normalize();
    let z = x.cross(y);
    Quat::from_mat3(&Mat3::from_cols(x, y, z)).normalize()
}

// ============================================================================
// Portal Component
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalColor {
    Blue,
    Orange,
}

impl PortalColor {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Blue => Self::Orange,
            Self::Orange => Self::Blue,
        }
    }
}

#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Portal {
    pub color: PortalColor,
    pub spouse: Option<WeakRef<Self>>,
    pub active: bool,
    // Teleport volume, in the portal's local frame
    pub half_extent: Vec3,
}

impl Portal {
    #[must_use]
    pub fn new(color: PortalColor) -> Self {
        Self {
            color,
            spouse: None,
            active: false,
            half_extent: Vec3::from_array(PORTAL_HALF_EXTENT),
        }
    }

    // Link to `spouse`; a portal can't be its own spouse.
    pub fn set_spouse(&mut self, this: Entity, spouse: Option<Entity>) -> bool {
        if spouse == Some(this) {
            warn!("portal {this:?} can't be paired with itself");
            return false;
        }
        self.spouse = spouse.map(WeakRef::new);
        self.active = spouse.is_some();
        true
    }
}

pub fn spawn_portal(world: &mut World, color: PortalColor, location: Vec3, rotation: Quat) -> Entity {
    world
        .spawn((Portal::new(color), Position(location), Orientation(rotation)))
        .id()
}

// ============================================================================
// Pairing
// ============================================================================

// Pair `portal` with `spouse` both ways. The spouse takes the opposite color.
// Previous partners of either side are unlinked first. With no spouse the
// portal ends up unpaired and inactive.
pub fn pair_portals(world: &mut World, portal: Entity, spouse: Option<Entity>) -> bool {
    if spouse == Some(portal) {
        warn!("portal {portal:?} can't be paired with itself");
        return false;
    }
    let Some(color) = world.get::<Portal>(portal).map(|p| p.color) else {
        return false;
    };
    if let Some(spouse) = spouse
        && world.get::<Portal>(spouse).is_none()
    {
        return false;
    }

    clean_up_portal(world, portal);
    if let Some(spouse) = spouse {
        clean_up_portal(world, spouse);
        if let Some(mut other) = world.get_mut::<Portal>(spouse) {
            other.color = color.opposite();
            other.set_spouse(spouse, Some(portal));
        }
    }
    if let Some(mut this) = world.get_mut::<Portal>(portal) {
        this.set_spouse(portal, spouse);
    }

    debug!("portal {portal:?} paired with {spouse:?}");
    true
}

// Unlink a portal from its spouse on both sides and deactivate them.
pub fn clean_up_portal(world: &mut World, portal: Entity) {
    let partner = {
        let Some(mut this) = world.get_mut::<Portal>(portal) else {
            return;
        };
        let partner = this.spouse.take();
        this.active = false;
        partner
    };

    let Some(partner) = partner else {
        return;
    };
    if let Some(mut other) = partner.get_mut(world)
        && other.spouse.is_some_and(|back| back.entity() == portal)
    {
        other.spouse = None;
        other.active = false;
    }
}

// ============================================================================
// World Queries
// ============================================================================

#[must_use]
pub fn portal_pose(world: &World, entity: Entity) -> Option<PortalPose> {
    let position = world.get::<Position>(entity)?;
    let orientation = world.get::<Orientation>(entity)?;
    Some(PortalPose::new(position.0, orientation.0))
}

// Frame of a portal with its spouse resolved through the world. A spouse that
// no longer exists leaves the frame unpaired.
#[must_use]
pub fn portal_frame(world: &World, portal: Entity) -> Option<PortalFrame> {
    let this = portal_pose(world, portal)?;
    let spouse = world
        .get::<Portal>(portal)?
        .spouse
        .and_then(|spouse| spouse.upgrade(world))
        .and_then(|spouse| portal_pose(world, spouse));
    Some(PortalFrame { this, spouse })
}

// ============================================================================
// Teleport System
// ============================================================================

// Move travellers that pass through an active portal's front face to the
// other side. Only a crossing from in front to behind during the last frame
// counts, so an entity leaving the spouse's front is not sent back and one
// already behind the plane stays put.
pub fn teleport_system(world: &mut World) {
    let delta = world.get_resource::<Time>().map_or(0.0, Time::delta_secs);
    let mut portals = Vec::new();
    {
        let mut query = world.query::<(Entity, &Portal)>();
        for (entity, portal) in query.iter(world) {
            if portal.active {
                portals.push((entity, portal.half_extent, portal.spouse));
            }
        }
    }

    let travellers: Vec<(Entity, Vec3, Vec3)> = world
        .query_filtered::<(Entity, &Position, &Velocity), (With<TravellerMarker>, Without<Portal>)>()
        .iter(world)
        .map(|(entity, pos, vel)| (entity, pos.0, vel.0))
        .collect();

    for (entity, position, velocity) in travellers {
        for &(portal, half_extent, spouse) in &portals {
            let Some(frame) = portal_frame(world, portal) else {
                continue;
            };
            let Some(spouse) = spouse.and_then(|spouse| spouse.upgrade(world)) else {
                continue;
            };
            if frame.spouse.is_none() {
                continue;
            }

            let inverse = frame.this.rotation.inverse();
            let local = inverse * (position - frame.this.location);
            let local_velocity = inverse * velocity;
            if !point_in_local_box(local, half_extent) || local.x > 0.0 || local_velocity.x >= 0.0 {
                continue;
            }
            if local.x - local_velocity.x * delta <= 0.0 {
                continue;
            }

            let mut traveller = world.entity_mut(entity);
            if let Some(mut pos) = traveller.get_mut::<Position>() {
                pos.0 = frame.convert_location(position);
            }
            if let Some(mut vel) = traveller.get_mut::<Velocity>() {
                vel.0 = frame.convert_direction(velocity);
            }
            if let Some(mut orientation) = traveller.get_mut::<Orientation>() {
                orientation.0 = frame.convert_rotation(orientation.0);
            }

            debug!("{entity:?} teleported from {portal:?} to {spouse:?}");
            emit(
                world,
                GameEvent::Teleported {
                    entity,
                    from: portal,
                    to: spouse,
                },
            );
            break;
        }
    }
}
