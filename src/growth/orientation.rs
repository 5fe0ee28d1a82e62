//! Quaternion helpers for spreading and bending branches.
//!
//! Branches grow along their local +Z axis. A child orientation is the
//! parent's orientation followed by a local heading about +Z and a pitch
//! about +X, so children fan out around the parent's axis.

use glam::Quat;
use rand::Rng;

/// Default maximum bend (degrees) for children of a split
pub const DEFAULT_BRANCH_BEND: f32 = 30.0;
/// Default maximum bend (degrees) for a single continuing stem
pub const DEFAULT_STEM_BEND: f32 = 20.0;

/// Rotate `base` by a local heading (radians) and a random pitch of at most
/// `max_bend` degrees.
///
/// The pitch is `u^2 * max_bend` for uniform `u`, so small bends dominate
/// while large ones stay possible.
pub fn spaced_rotation<R: Rng + ?Sized>(base: Quat, heading: f32, max_bend: f32, rng: &mut R) -> Quat {
    let u: f32 = rng.random();
    let bend = u * u * max_bend;
    (base * local_rotation(heading, bend.to_radians())).normalize()
}

/// Like [`spaced_rotation`] with a heading drawn from whole degrees in
/// [-90, 90]. Keeps unbranched stems from running perfectly straight.
pub fn random_bend<R: Rng + ?Sized>(base: Quat, max_bend: f32, rng: &mut R) -> Quat {
    let heading = (rng.random_range(-90i32..=90) as f32).to_radians();
    spaced_rotation(base, heading, max_bend, rng)
}

/// Heading about +Z, then pitch about the turned +X
fn local_rotation(heading: f32, pitch: f32) -> Quat {
    Quat::from_rotation_z(heading) * Quat::from_rotation_x(pitch)
}
