//! Collision prediction: pure functions over particle snapshots.
//!
//! All times returned here are relative to the particles' current state, i.e. "how long
//! from now". Degenerate inputs (no relative motion, a negative discriminant, a particle at
//! rest) never fail; they come back as `f64::INFINITY` or `None`.

use crate::core::particle::{dot, Particle};
use serde::{Deserialize, Serialize};

/// Collision times at or below this are treated as "already happened".
pub const EPS: f64 = 1e-6;

/// One of the four arena walls. The arena spans `[0, width] x [0, height]`;
/// `Top` is the `y = 0` wall, `Bottom` the `y = height` wall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Wall {
    Left,
    Right,
    Top,
    Bottom,
}

/// Predicted wall contact: when, and which wall on each axis is struck.
///
/// At least one of `x`/`y` is set; both are set for a corner hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallHit {
    pub time: f64,
    pub x: Option<Wall>,
    pub y: Option<Wall>,
}

/// Time until disks `a` and `b` touch, or `f64::INFINITY` if they never do.
///
/// Solves `|dr + dv t| = ra + rb` for the smallest root greater than [`EPS`], using the
/// cancellation-free form of the quadratic formula. Symmetric in its arguments.
pub fn particle_collision_time(a: &Particle, b: &Particle) -> f64 {
    let dv = [a.v[0] - b.v[0], a.v[1] - b.v[1]];
    let dr = [a.r[0] - b.r[0], a.r[1] - b.r[1]];
    let sigma = a.radius + b.radius;

    let qa = dot(&dv, &dv);
    let qb = 2.0 * dot(&dv, &dr);
    let qc = dot(&dr, &dr) - sigma * sigma;

    smallest_root_beyond_eps(qa, qb, qc).unwrap_or(f64::INFINITY)
}

/// Time until `p` touches any wall of a `width` x `height` arena, or `f64::INFINITY`.
pub fn wall_collision_time(p: &Particle, width: f64, height: f64) -> f64 {
    next_wall_contact(p, width, height).map_or(f64::INFINITY, |hit| hit.time)
}

/// Earliest wall contact of `p`, with the wall(s) struck.
pub fn next_wall_contact(p: &Particle, width: f64, height: f64) -> Option<WallHit> {
    let x = axis_contact(p.r[0], p.v[0], p.radius, width, Wall::Left, Wall::Right);
    let y = axis_contact(p.r[1], p.v[1], p.radius, height, Wall::Top, Wall::Bottom);

    match (x, y) {
        // Contacts closer than EPS form one corner hit: after bouncing off one wall the
        // other would be reported at <= EPS and never scheduled.
        (Some((tx, wx)), Some((ty, wy))) => Some(if (tx - ty).abs() <= EPS {
            WallHit {
                time: tx.min(ty),
                x: Some(wx),
                y: Some(wy),
            }
        } else if tx < ty {
            WallHit {
                time: tx,
                x: Some(wx),
                y: None,
            }
        } else {
            WallHit {
                time: ty,
                x: None,
                y: Some(wy),
            }
        }),
        (Some((time, wx)), None) => Some(WallHit {
            time,
            x: Some(wx),
            y: None,
        }),
        (None, Some((time, wy))) => Some(WallHit {
            time,
            x: None,
            y: Some(wy),
        }),
        (None, None) => None,
    }
}

/// Contact along one axis. Moving towards the high end can only reach `high`,
/// otherwise only `low`; zero velocity never reaches either.
fn axis_contact(
    pos: f64,
    vel: f64,
    radius: f64,
    extent: f64,
    low: Wall,
    high: Wall,
) -> Option<(f64, Wall)> {
    let (t, wall) = if vel > 0.0 {
        ((extent - radius - pos) / vel, high)
    } else if vel < 0.0 {
        ((radius - pos) / vel, low)
    } else {
        return None;
    };
    (t > EPS && t.is_finite()).then_some((t, wall))
}

/// Smallest root of `a t^2 + b t + c` strictly greater than [`EPS`].
///
/// The sign of `b` picks the branch so the two roots come from `q / a` and `c / q`
/// without subtracting nearly equal quantities.
fn smallest_root_beyond_eps(a: f64, b: f64, c: f64) -> Option<f64> {
    if a <= 0.0 {
        return None;
    }
    let disc = b * b - 4.0 * a * c;
    if !disc.is_finite() || disc < 0.0 {
        return None;
    }
    let sqrt_disc = disc.sqrt();
    let q = if b >= 0.0 {
        -0.5 * (b + sqrt_disc)
    } else {
        0.5 * (sqrt_disc - b)
    };
    let t1 = q / a;
    // q == 0 only for a double root at zero.
    let t2 = if q != 0.0 { c / q } else { t1 };

    [t1, t2]
        .into_iter()
        .filter(|t| *t > EPS && t.is_finite())
        .fold(None, |best: Option<f64>, t| Some(best.map_or(t, |b| b.min(t))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64, vx: f64, vy: f64, radius: f64) -> Particle {
        Particle::new("p", [x, y], [vx, vy], radius).unwrap()
    }

    #[test]
    fn side_walls() {
        let left = p(30.0, 50.0, -5.0, 0.0, 5.0);
        assert_eq!(wall_collision_time(&left, 500.0, 500.0), 5.0);
        let right = p(465.0, 50.0, 5.0, 0.0, 5.0);
        assert_eq!(wall_collision_time(&right, 500.0, 500.0), 6.0);
    }

    #[test]
    fn top_and_bottom_walls() {
        let top = p(50.0, 30.0, 0.0, -5.0, 5.0);
        assert_eq!(wall_collision_time(&top, 500.0, 500.0), 5.0);
        let bottom = p(50.0, 465.0, 0.0, 5.0, 5.0);
        assert_eq!(wall_collision_time(&bottom, 500.0, 500.0), 6.0);
    }

    #[test]
    fn wall_contact_names_the_wall() {
        let a = p(30.0, 50.0, -5.0, 1.0, 5.0);
        let hit = next_wall_contact(&a, 500.0, 500.0).unwrap();
        assert_eq!(hit.time, 5.0);
        assert_eq!(hit.x, Some(Wall::Left));
        assert_eq!(hit.y, None);

        let b = p(250.0, 480.0, 1.0, 3.0, 5.0);
        let hit = next_wall_contact(&b, 500.0, 500.0).unwrap();
        assert_eq!(hit.time, 5.0);
        assert_eq!(hit.x, None);
        assert_eq!(hit.y, Some(Wall::Bottom));
    }

    #[test]
    fn corner_hit_reports_both_walls() {
        let a = p(15.0, 15.0, -2.0, -2.0, 5.0);
        let hit = next_wall_contact(&a, 100.0, 100.0).unwrap();
        assert_eq!(hit.time, 5.0);
        assert_eq!(hit.x, Some(Wall::Left));
        assert_eq!(hit.y, Some(Wall::Top));
    }

    #[test]
    fn near_corner_within_eps_is_one_hit() {
        let a = p(15.0, 15.0 + 1e-6, -2.0, -2.0, 5.0);
        let hit = next_wall_contact(&a, 100.0, 100.0).unwrap();
        assert_eq!(hit.time, 5.0);
        assert_eq!(hit.x, Some(Wall::Left));
        assert_eq!(hit.y, Some(Wall::Top));

        // Further apart than EPS: separate hits, earliest first.
        let b = p(15.0, 15.0 + 1e-3, -2.0, -2.0, 5.0);
        let hit = next_wall_contact(&b, 100.0, 100.0).unwrap();
        assert_eq!(hit.time, 5.0);
        assert_eq!(hit.x, Some(Wall::Left));
        assert_eq!(hit.y, None);
    }

    #[test]
    fn resting_particle_never_hits_a_wall() {
        let a = p(50.0, 50.0, 0.0, 0.0, 5.0);
        assert_eq!(wall_collision_time(&a, 100.0, 100.0), f64::INFINITY);
        assert!(next_wall_contact(&a, 100.0, 100.0).is_none());
    }

    #[test]
    fn touching_wall_and_moving_in_is_ignored() {
        // Already in contact with the left wall: the other axis decides.
        let a = p(5.0, 50.0, -1.0, 0.0, 5.0);
        assert_eq!(wall_collision_time(&a, 100.0, 100.0), f64::INFINITY);
    }

    #[test]
    fn approaching_pair() {
        let a = p(30.0, 50.0, 5.0, 0.0, 5.0);
        let b = p(60.0, 50.0, -5.0, 0.0, 5.0);
        assert_eq!(particle_collision_time(&a, &b), 2.0);
        assert_eq!(particle_collision_time(&b, &a), 2.0);
    }

    #[test]
    fn unequal_radii_use_combined_radius() {
        let a = p(0.0, 0.0, 1.0, 0.0, 1.0);
        let b = p(10.0, 0.0, 0.0, 0.0, 3.0);
        assert!((particle_collision_time(&a, &b) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn receding_pair_never_collides() {
        let a = p(30.0, 50.0, -5.0, 0.0, 5.0);
        let b = p(60.0, 50.0, 5.0, 0.0, 5.0);
        assert_eq!(particle_collision_time(&a, &b), f64::INFINITY);
    }

    #[test]
    fn missing_pair_never_collides() {
        let a = p(0.0, 0.0, 1.0, 0.0, 1.0);
        let b = p(10.0, 5.0, -1.0, 0.0, 1.0);
        assert_eq!(particle_collision_time(&a, &b), f64::INFINITY);
    }

    #[test]
    fn degenerate_pairs_are_infinite() {
        // Same velocity: no relative motion.
        let a = p(0.0, 0.0, 3.0, 3.0, 1.0);
        let b = p(10.0, 0.0, 3.0, 3.0, 1.0);
        assert_eq!(particle_collision_time(&a, &b), f64::INFINITY);

        // Concentric and at rest.
        let c = p(5.0, 5.0, 0.0, 0.0, 1.0);
        let d = p(5.0, 5.0, 0.0, 0.0, 1.0);
        assert_eq!(particle_collision_time(&c, &d), f64::INFINITY);
    }

    #[test]
    fn just_collided_pair_is_not_rescheduled() {
        // In contact and separating after a response: both roots are <= EPS.
        let a = p(40.0, 50.0, -5.0, 0.0, 5.0);
        let b = p(50.0, 50.0, 5.0, 0.0, 5.0);
        assert_eq!(particle_collision_time(&a, &b), f64::INFINITY);
    }

    #[test]
    fn glancing_contact_is_found() {
        // Paths offset by exactly the combined radius: tangent contact.
        let a = p(0.0, 0.0, 1.0, 0.0, 1.0);
        let b = p(10.0, 2.0, -1.0, 0.0, 1.0);
        let t = particle_collision_time(&a, &b);
        assert!((t - 5.0).abs() < 1e-9, "t = {t}");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn collision_time_is_symmetric(
                r in proptest::array::uniform4(0.0f64..200.0),
                v in proptest::array::uniform4(-10.0f64..10.0),
                ra in 0.5f64..10.0, rb in 0.5f64..10.0,
            ) {
                let a = p(r[0], r[1], v[0], v[1], ra);
                let b = p(r[2], r[3], v[2], v[3], rb);
                let tab = particle_collision_time(&a, &b);
                let tba = particle_collision_time(&b, &a);
                prop_assert_eq!(tab.to_bits(), tba.to_bits());
            }

            #[test]
            fn predicted_contact_is_at_combined_radius(
                x in 20.0f64..180.0, y in 20.0f64..180.0,
                va in proptest::array::uniform2(-10.0f64..10.0),
                dist in 6.0f64..100.0,
                angle in 0.0f64..std::f64::consts::TAU,
                k in 0.05f64..2.0,
            ) {
                // `b` sits at `a.r + offset` and closes in along `-offset`: always a hit.
                let offset = [dist * angle.cos(), dist * angle.sin()];
                let a = p(x, y, va[0], va[1], 2.0);
                let b = p(
                    x + offset[0],
                    y + offset[1],
                    va[0] - k * offset[0],
                    va[1] - k * offset[1],
                    3.0,
                );
                let t = particle_collision_time(&a, &b);
                prop_assert!(t.is_finite(), "missed a head-on approach");
                prop_assert!(t > EPS);
                let mut a2 = a.clone();
                let mut b2 = b.clone();
                a2.advance(t);
                b2.advance(t);
                let dx = a2.r[0] - b2.r[0];
                let dy = a2.r[1] - b2.r[1];
                let d = (dx * dx + dy * dy).sqrt();
                prop_assert!((d - 5.0).abs() < 1e-6, "dist {} at t {}", d, t);
            }

            #[test]
            fn wall_contact_touches_the_wall(
                x in 10.0f64..90.0, y in 10.0f64..90.0,
                vx in -10.0f64..10.0, vy in -10.0f64..10.0,
            ) {
                let a = p(x, y, vx, vy, 5.0);
                if let Some(hit) = next_wall_contact(&a, 100.0, 100.0) {
                    // A merged corner hit may be up to EPS early on one axis.
                    let tol = 20.0 * EPS;
                    let mut moved = a.clone();
                    moved.advance(hit.time);
                    match hit.x {
                        Some(Wall::Left) => prop_assert!((moved.r[0] - 5.0).abs() < tol),
                        Some(Wall::Right) => prop_assert!((moved.r[0] - 95.0).abs() < tol),
                        _ => {}
                    }
                    match hit.y {
                        Some(Wall::Top) => prop_assert!((moved.r[1] - 5.0).abs() < tol),
                        Some(Wall::Bottom) => prop_assert!((moved.r[1] - 95.0).abs() < tol),
                        _ => {}
                    }
                    prop_assert_eq!(hit.time, wall_collision_time(&a, 100.0, 100.0));
                } else {
                    prop_assert!(vx == 0.0 && vy == 0.0);
                }
            }
        }
    }
}
