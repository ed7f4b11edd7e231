pub mod helpers;
pub mod overlap;
pub mod ray;

pub use overlap::{OverlapHit, Primitive, overlap_sphere, overlap_sphere_vs_body, within_radius};
pub use ray::{RayHit, ray_vs_capsule, ray_vs_sphere, trace_ray};
