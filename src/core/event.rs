use crate::core::particle::{Particle, ParticleId};
use crate::core::predict::WallHit;
use crate::error::{Error, Result};
use ordered_float::NotNan;
use std::cmp::Ordering;

/// A particle referenced by an event, with the generation it had when the event was predicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticleId,
    pub generation: u64,
}

impl Participant {
    /// Capture the current generation of `particle`, addressed by `id`.
    #[inline]
    pub fn of(id: ParticleId, particle: &Particle) -> Self {
        Self {
            id,
            generation: particle.generation,
        }
    }

    /// True if the particle has taken part in a realized event since this snapshot.
    #[inline]
    fn is_outdated(&self, particles: &[Particle]) -> bool {
        particles
            .get(self.id.index())
            .map_or(true, |p| p.generation != self.generation)
    }
}

/// Kinds of events the engine schedules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventKind {
    /// Two particles touch.
    Pair { a: Participant, b: Participant },
    /// A particle touches one wall, or two at a corner.
    Wall { p: Participant, hit: WallHit },
    /// End of the simulated duration. Carries no particles.
    Termination,
}

/// A scheduled event in the queue.
///
/// - `time`: absolute time the event occurs (finite, non-NaN)
/// - `created_at`: simulation time at which the prediction was made
/// - `kind`: event kind and participants
///
/// Events are ordered by `time` only; events at the same instant come out of the
/// queue in unspecified order.
#[derive(Debug, Clone, Copy)]
pub struct Event {
    pub time: NotNan<f64>,
    pub created_at: f64,
    pub kind: EventKind,
}

impl Event {
    /// Create a new event, validating that `time` is finite and not before `created_at`.
    pub fn new(time: f64, created_at: f64, kind: EventKind) -> Result<Self> {
        if !time.is_finite() {
            return Err(Error::InvalidParam(format!(
                "event time must be finite, got {time}"
            )));
        }
        if !created_at.is_finite() {
            return Err(Error::InvalidParam(
                "event creation time must be finite".into(),
            ));
        }
        if time < created_at {
            return Err(Error::InvalidParam(format!(
                "event at {time} cannot precede its creation at {created_at}"
            )));
        }
        let time = NotNan::new(time)
            .map_err(|_| Error::InvalidParam("event time cannot be NaN".into()))?;
        Ok(Self {
            time,
            created_at,
            kind,
        })
    }

    /// Pairwise collision between `a` and `b` at absolute `time`.
    pub fn pair(time: f64, created_at: f64, a: Participant, b: Participant) -> Result<Self> {
        Self::new(time, created_at, EventKind::Pair { a, b })
    }

    /// Wall collision of `p` described by `hit` (whose own time is relative and ignored).
    pub fn wall(time: f64, created_at: f64, p: Participant, hit: WallHit) -> Result<Self> {
        Self::new(time, created_at, EventKind::Wall { p, hit })
    }

    /// End-of-run sentinel at `time`.
    pub fn termination(time: f64) -> Result<Self> {
        Self::new(time, 0.0, EventKind::Termination)
    }

    /// Returns the raw f64 event time.
    #[inline]
    pub fn time_f64(&self) -> f64 {
        self.time.into_inner()
    }

    #[inline]
    pub fn is_termination(&self) -> bool {
        matches!(self.kind, EventKind::Termination)
    }

    /// True if any participant changed state after this event was predicted.
    /// Termination is never stale.
    pub fn is_stale(&self, particles: &[Particle]) -> bool {
        match &self.kind {
            EventKind::Pair { a, b } => a.is_outdated(particles) || b.is_outdated(particles),
            EventKind::Wall { p, .. } => p.is_outdated(particles),
            EventKind::Termination => false,
        }
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time
    }
}

impl Eq for Event {}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time.cmp(&other.time)
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
