use std::{collections::HashSet, f32::consts::TAU};

use bevy_ecs::prelude::*;
use bevy_math::{Quat, Vec3};
use rand::Rng;
use tracing::debug;

use crate::{
    combat::{Combatant, TeamId},
    components::{Orientation, Position, view_point},
    constants::*,
    events::{EventQueue, GameEvent},
};

// ============================================================================
// Affiliation
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attitude {
    Friendly,
    Neutral,
    Hostile,
}

#[must_use]
pub fn attitude(observer: TeamId, target: TeamId) -> Attitude {
    if observer == TeamId::NEUTRAL || target == TeamId::NEUTRAL {
        Attitude::Neutral
    } else if observer == target {
        Attitude::Friendly
    } else {
        Attitude::Hostile
    }
}

// ============================================================================
// Sight
// ============================================================================

#[derive(Component, Debug, Clone, PartialEq)]
pub struct SightSense {
    pub peripheral_half_angle_deg: f32,
    pub radius: f32,
    pub detect_enemies: bool,
    pub detect_friendlies: bool,
    pub detect_neutrals: bool,
    // Actors currently in sight
    pub sensed: Vec<Entity>,
}

impl Default for SightSense {
    fn default() -> Self {
        Self {
            peripheral_half_angle_deg: SIGHT_PERIPHERAL_HALF_ANGLE_DEG,
            radius: SIGHT_RADIUS,
            detect_enemies: true,
            detect_friendlies: true,
            detect_neutrals: true,
            sensed: Vec::new(),
        }
    }
}

impl SightSense {
    #[must_use]
    pub const fn detects(&self, attitude: Attitude) -> bool {
        match attitude {
            Attitude::Hostile => self.detect_enemies,
            Attitude::Friendly => self.detect_friendlies,
            Attitude::Neutral => self.detect_neutrals,
        }
    }
}

// Inside the view cone and within range.
#[must_use]
pub fn can_see(eye: Vec3, forward: Vec3, target: Vec3, half_angle_deg: f32, radius: f32) -> bool {
    let offset = target - eye;
    let distance = offset.length();
    if distance > radius {
        return false;
    }
    if distance <= PHYSICS_EPSILON {
        return true;
    }
    let cos = forward.normalize_or_zero().dot(offset / distance);
    cos >= half_angle_deg.to_radians().cos()
}

// Refresh what every observer sees and report the changes.
pub fn perception_system(
    mut observers: Query<(Entity, &Position, &Orientation, &Combatant, &mut SightSense)>,
    targets: Query<(Entity, &Position, &Combatant)>,
    mut events: Option<ResMut<EventQueue>>,
) {
    for (observer, pos, orientation, combatant, mut sense) in &mut observers {
        let (eye, forward) = view_point(pos, orientation);

        let seen: Vec<Entity> = targets
            .iter()
            .filter(|(target, _, _)| *target != observer)
            .filter(|(_, _, other)| other.is_alive())
            .filter(|(_, _, other)| sense.detects(attitude(combatant.team, other.team)))
            .filter(|(_, at, _)| can_see(eye, forward, at.0, sense.peripheral_half_angle_deg, sense.radius))
            .map(|(target, _, _)| target)
            .collect();

        let before: HashSet<Entity> = sense.sensed.iter().copied().collect();
        let now: HashSet<Entity> = seen.iter().copied().collect();
        if before == now {
            continue;
        }

        let entered = seen.iter().filter(|target| !before.contains(*target)).map(|target| (*target, true));
        let left = sense
            .sensed
            .iter()
            .filter(|target| !now.contains(*target))
            .map(|target| (*target, false));
        for (target, sensed) in entered.chain(left) {
            debug!("{observer:?} {} {target:?}", if sensed { "ENTER" } else { "LEAVE" });
            if let Some(events) = events.as_mut() {
                events.push(GameEvent::Perception {
                    observer,
                    target,
                    sensed,
                });
            }
        }
        sense.sensed = seen;
    }
}

// ============================================================================
// Aim
// ============================================================================

// Where a bot wants to look. `None` keeps the current rotation.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct Focus(pub Option<Vec3>);

// Rotation looking from `view` toward `focal_point`, pitch included.
#[must_use]
pub fn control_rotation(view: Vec3, focal_point: Vec3) -> Option<Quat> {
    let dir = (focal_point - view).normalize_or_zero();
    if dir == Vec3::ZERO {
        return None;
    }
    let yaw = dir.y.atan2(dir.x);
    let pitch = dir.z.clamp(-1.0, 1.0).asin();
    Some(Quat::from_rotation_z(yaw) * Quat::from_rotation_y(-pitch))
}

pub fn control_rotation_system(mut query: Query<(&Position, &mut Orientation, &Focus)>) {
    for (pos, mut orientation, focus) in &mut query {
        let Some(focal_point) = focus.0 else {
            continue;
        };
        let (eye, _) = view_point(pos, &orientation);
        if let Some(rotation) = control_rotation(eye, focal_point) {
            orientation.0 = rotation;
        }
    }
}

// Intercept of a constant-velocity target by a projectile of `speed` fired
// from `shooter`. Returns the hit location and flight time, or `None` when
// the projectile can never catch up.
#[must_use]
pub fn predict_intercept(shooter: Vec3, target: Vec3, target_velocity: Vec3, speed: f32) -> Option<(Vec3, f32)> {
    let offset = target - shooter;
    let a = target_velocity.length_squared() - speed * speed;
    let b = 2.0 * offset.dot(target_velocity);
    let c = offset.length_squared();

    let time = if a.abs() <= PHYSICS_EPSILON {
        if b.abs() <= PHYSICS_EPSILON {
            return None;
        }
        -c / b
    } else {
        let discriminant = b.mul_add(b, -4.0 * a * c);
        if discriminant < 0.0 {
            return None;
        }
        let root = discriminant.sqrt();
        let t1 = (-b - root) / (2.0 * a);
        let t2 = (-b + root) / (2.0 * a);
        match (t1 > 0.0, t2 > 0.0) {
            (true, true) => t1.min(t2),
            (true, false) => t1,
            (false, true) => t2,
            (false, false) => return None,
        }
    };

    (time > 0.0).then(|| (target + target_velocity * time, time))
}

// ============================================================================
// Spawn Sampling
// ============================================================================

// Uniform point on a horizontal disk around `center`.
pub fn sample_point_in_disk<R: Rng + ?Sized>(rng: &mut R, center: Vec3, radius: f32) -> Vec3 {
    let r = radius * rng.random::<f32>().sqrt();
    let theta = rng.random_range(0.0..TAU);
    center + Vec3::new(r * theta.cos(), r * theta.sin(), 0.0)
}

// Uniform point on a horizontal square of half side `half_extent` around `center`.
pub fn sample_point_in_square<R: Rng + ?Sized>(rng: &mut R, center: Vec3, half_extent: f32) -> Vec3 {
    if half_extent <= 0.0 {
        return center;
    }
    center
        + Vec3::new(
            rng.random_range(-half_extent..=half_extent),
            rng.random_range(-half_extent..=half_extent),
            0.0,
        )
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-3
    }

    #[test]
    fn attitude_by_team() {
        assert_eq!(attitude(TeamId(0), TeamId(0)), Attitude::Friendly);
        assert_eq!(attitude(TeamId(0), TeamId(1)), Attitude::Hostile);
        assert_eq!(attitude(TeamId(0), TeamId::NEUTRAL), Attitude::Neutral);
    }

    #[test]
    fn sight_cone_and_range() {
        let eye = Vec3::ZERO;
        assert!(can_see(eye, Vec3::X, Vec3::new(1000.0, 500.0, 0.0), 70.0, 3000.0));
        assert!(!can_see(eye, Vec3::X, Vec3::new(-1000.0, 0.0, 0.0), 70.0, 3000.0));
        assert!(!can_see(eye, Vec3::X, Vec3::new(100.0, 1000.0, 0.0), 70.0, 3000.0));
        assert!(!can_see(eye, Vec3::X, Vec3::new(4000.0, 0.0, 0.0), 70.0, 3000.0));
    }

    #[test]
    fn perception_reports_enter_and_leave() {
        let mut world = World::new();
        world.init_resource::<EventQueue>();
        let bot = world
            .spawn((
                Position(Vec3::ZERO),
                Orientation(Quat::IDENTITY),
                Combatant::new(TeamId(1)),
                SightSense::default(),
            ))
            .id();
        let player = world
            .spawn((Position(Vec3::new(1000.0, 0.0, 0.0)), Combatant::new(TeamId(0))))
            .id();

        let mut schedule = Schedule::default();
        schedule.add_systems(perception_system);

        schedule.run(&mut world);
        assert_eq!(world.get::<SightSense>(bot).unwrap().sensed, vec![player]);
        schedule.run(&mut world);

        world.get_mut::<Position>(player).unwrap().0 = Vec3::new(-1000.0, 0.0, 0.0);
        schedule.run(&mut world);
        assert!(world.get::<SightSense>(bot).unwrap().sensed.is_empty());

        let stimuli: Vec<bool> = world
            .resource_mut::<EventQueue>()
            .drain()
            .into_iter()
            .filter_map(|event| match event {
                GameEvent::Perception { sensed, .. } => Some(sensed),
                _ => None,
            })
            .collect();
        assert_eq!(stimuli, vec![true, false]);
    }

    #[test]
    fn affiliation_filter_hides_friends() {
        let mut world = World::new();
        let bot = world
            .spawn((
                Position(Vec3::ZERO),
                Orientation(Quat::IDENTITY),
                Combatant::new(TeamId(1)),
                SightSense {
                    detect_friendlies: false,
                    ..SightSense::default()
                },
            ))
            .id();
        world.spawn((Position(Vec3::new(500.0, 0.0, 0.0)), Combatant::new(TeamId(1))));

        let mut schedule = Schedule::default();
        schedule.add_systems(perception_system);
        schedule.run(&mut world);
        assert!(world.get::<SightSense>(bot).unwrap().sensed.is_empty());
    }

    #[test]
    fn control_rotation_looks_at_focal_point() {
        let rotation = control_rotation(Vec3::ZERO, Vec3::new(0.0, 100.0, 100.0)).unwrap();
        assert!(approx(rotation * Vec3::X, Vec3::new(0.0, 1.0, 1.0).normalize()));
        assert!(control_rotation(Vec3::ONE, Vec3::ONE).is_none());
    }

    #[test]
    fn intercept_of_stationary_target() {
        let (hit, time) = predict_intercept(Vec3::ZERO, Vec3::new(2000.0, 0.0, 0.0), Vec3::ZERO, 1000.0).unwrap();
        assert!((time - 2.0).abs() < 1e-4);
        assert!(approx(hit, Vec3::new(2000.0, 0.0, 0.0)));
    }

    #[test]
    fn intercept_of_crossing_target() {
        let (hit, time) =
            predict_intercept(Vec3::ZERO, Vec3::new(1000.0, 0.0, 0.0), Vec3::new(0.0, 600.0, 0.0), 1000.0).unwrap();
        assert!((time - 1.25).abs() < 1e-4);
        assert!(approx(hit, Vec3::new(1000.0, 750.0, 0.0)));
    }

    #[test]
    fn no_intercept_for_faster_fleeing_target() {
        assert!(predict_intercept(Vec3::ZERO, Vec3::new(1000.0, 0.0, 0.0), Vec3::new(2000.0, 0.0, 0.0), 1000.0).is_none());
    }

    #[test]
    fn samples_stay_inside() {
        let mut rng = StdRng::seed_from_u64(11);
        let center = Vec3::new(50.0, -20.0, 96.0);
        for _ in 0..200 {
            let disk = sample_point_in_disk(&mut rng, center, 300.0);
            assert!(disk.distance(center) <= 300.0 + 1e-3);
            assert!((disk.z - center.z).abs() < f32::EPSILON);

            let square = sample_point_in_square(&mut rng, center, 300.0);
            assert!((square.x - center.x).abs() <= 300.0 && (square.y - center.y).abs() <= 300.0);
        }
    }
}
