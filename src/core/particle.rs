use crate::core::predict::WallHit;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed spatial dimension (2D arena).
pub const DIM: usize = 2;

/// Squared centre distance below which a pair collision has no usable contact normal.
const MIN_CONTACT_DIST_SQ: f64 = 1e-24;

/// Stable handle of a particle inside a simulation's particle list.
///
/// `ParticleId(n)` addresses the n-th particle supplied at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticleId(pub u32);

impl ParticleId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ParticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ParticleId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// A disk of unit mass moving freely between collisions.
///
/// Fields:
/// - `name`: diagnostic label, not used by the physics
/// - `r`: centre position [x, y]
/// - `v`: velocity [vx, vy]
/// - `radius`: disk radius (> 0)
/// - `last_update_time`: simulation time of the last velocity change (monotone)
/// - `generation`: incremented each time the particle takes part in a realized event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub name: String,
    pub r: [f64; DIM],
    pub v: [f64; DIM],
    pub radius: f64,
    #[serde(default)]
    pub last_update_time: f64,
    #[serde(default)]
    pub generation: u64,
}

impl Particle {
    /// Create a new particle after validating invariants.
    ///
    /// Errors:
    /// - `Error::InvalidParam` if `radius` is non-positive or any component is NaN/inf.
    pub fn new(name: impl Into<String>, r: [f64; DIM], v: [f64; DIM], radius: f64) -> Result<Self> {
        let p = Self {
            name: name.into(),
            r,
            v,
            radius,
            last_update_time: 0.0,
            generation: 0,
        };
        p.validate()?;
        Ok(p)
    }

    /// Check the record is physically meaningful. Deserialized records bypass
    /// [`Particle::new`], so the engine calls this again at construction.
    pub fn validate(&self) -> Result<()> {
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(Error::InvalidParam(format!(
                "particle {:?}: radius must be finite and > 0",
                self.name
            )));
        }
        if !self.r.iter().all(|x| x.is_finite()) {
            return Err(Error::InvalidParam(format!(
                "particle {:?}: position must be finite",
                self.name
            )));
        }
        if !self.v.iter().all(|x| x.is_finite()) {
            return Err(Error::InvalidParam(format!(
                "particle {:?}: velocity must be finite",
                self.name
            )));
        }
        if !self.last_update_time.is_finite() {
            return Err(Error::InvalidParam(format!(
                "particle {:?}: last_update_time must be finite",
                self.name
            )));
        }
        Ok(())
    }

    /// Free flight: move along the current velocity for `dt`.
    #[inline]
    pub fn advance(&mut self, dt: f64) {
        for (rk, &vk) in self.r.iter_mut().zip(self.v.iter()) {
            *rk += vk * dt;
        }
    }

    /// Resolve an elastic collision between two equal-mass disks in contact.
    ///
    /// The relative velocity component along the line of centres is exchanged;
    /// the tangential components are untouched. Both particles are stamped with `now`.
    pub fn collide_with(&mut self, other: &mut Particle, now: f64) -> Result<()> {
        let d = [self.r[0] - other.r[0], self.r[1] - other.r[1]];
        let dist_sq = dot(&d, &d);
        if dist_sq <= MIN_CONTACT_DIST_SQ {
            return Err(Error::MathError(format!(
                "coincident centres for {:?} and {:?}: contact normal undefined",
                self.name, other.name
            )));
        }
        let dv = [self.v[0] - other.v[0], self.v[1] - other.v[1]];
        let common = dot(&dv, &d) / dist_sq;
        for k in 0..DIM {
            self.v[k] -= common * d[k];
            other.v[k] += common * d[k];
        }
        self.mark_updated(now);
        other.mark_updated(now);
        Ok(())
    }

    /// Specular reflection: negate the velocity component of each struck axis.
    pub fn bounce(&mut self, hit: &WallHit, now: f64) {
        if hit.x.is_some() {
            self.v[0] = -self.v[0];
        }
        if hit.y.is_some() {
            self.v[1] = -self.v[1];
        }
        self.mark_updated(now);
    }

    /// Record a realized event at `now`, invalidating every prediction made before it.
    #[inline]
    pub fn mark_updated(&mut self, now: f64) {
        debug_assert!(now >= self.last_update_time, "last_update_time must not decrease");
        self.last_update_time = self.last_update_time.max(now);
        self.generation = self.generation.saturating_add(1);
    }

    /// Squared speed |v|^2.
    #[inline]
    pub fn speed_sq(&self) -> f64 {
        dot(&self.v, &self.v)
    }

    /// Kinetic energy with unit mass: 1/2 |v|^2.
    #[inline]
    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.speed_sq()
    }
}

impl fmt::Display for Particle {
    /// `name x  y vx vy radius`, the reference result-sink line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.name.is_empty() {
            write!(f, "{} ", self.name)?;
        }
        write!(
            f,
            "{}  {} {} {} {}",
            ResultNum(self.r[0]),
            ResultNum(self.r[1]),
            ResultNum(self.v[0]),
            ResultNum(self.v[1]),
            ResultNum(self.radius)
        )
    }
}

/// Shortest round-trip rendering of an f64 in the result-line number format:
/// plain decimal with at least one fractional digit for magnitudes in `[1e-3, 1e7)`
/// (and zero), `d.dddE±n` otherwise, `NaN`/`Infinity` for non-finite values.
struct ResultNum(f64);

impl fmt::Display for ResultNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let x = self.0;
        if x.is_nan() {
            return f.write_str("NaN");
        }
        if x.is_infinite() {
            return f.write_str(if x > 0.0 { "Infinity" } else { "-Infinity" });
        }
        let mag = x.abs();
        if mag == 0.0 || (1e-3..1e7).contains(&mag) {
            let s = format!("{x}");
            if s.contains('.') {
                return f.write_str(&s);
            }
            return write!(f, "{s}.0");
        }
        let s = format!("{x:e}");
        let (mantissa, exp) = s.split_once('e').unwrap_or((s.as_str(), "0"));
        if mantissa.contains('.') {
            write!(f, "{mantissa}E{exp}")
        } else {
            write!(f, "{mantissa}.0E{exp}")
        }
    }
}

#[inline]
pub(crate) fn dot(a: &[f64; DIM], b: &[f64; DIM]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
