use crate::core::config::SimConfig;
use crate::core::event::{Event, EventKind, Participant};
use crate::core::heap::MinHeap;
use crate::core::particle::{Particle, ParticleId, DIM};
use crate::core::predict::{next_wall_contact, particle_collision_time, EPS};
use crate::error::{Error, Result};
use rand::{rng, rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

/// Engine lifecycle: `Seeding -> Running -> Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimState {
    /// Held only inside [`Simulation::new`] while the queue is seeded; callers
    /// always observe `Running` or `Terminated`.
    Seeding,
    Running,
    Terminated,
}

/// Result of one call to [`Simulation::step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// A valid collision was applied at `time`.
    Collision { time: f64, kind: EventKind },
    /// The run is over; particles have been drifted to `time`.
    Terminated { time: f64 },
}

/// Display sink notified as the run progresses. Must not mutate particles (it only
/// ever sees a shared slice).
pub trait StepObserver {
    /// Called after every valid collision with the post-collision state.
    fn on_step(&mut self, time: f64, particles: &[Particle]);

    /// Called once with the final state.
    fn on_terminate(&mut self, _time: f64, _particles: &[Particle]) {}
}

impl<F: FnMut(f64, &[Particle])> StepObserver for F {
    fn on_step(&mut self, time: f64, particles: &[Particle]) {
        self(time, particles)
    }
}

/// Event counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimStats {
    /// Events pushed onto the queue, termination included.
    pub scheduled: u64,
    /// Collision events applied.
    pub applied: u64,
    /// Events dropped because a participant changed after the prediction.
    pub stale: u64,
}

/// Final state handed to the result sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimReport {
    pub width: f64,
    pub height: f64,
    pub duration: f64,
    pub time: f64,
    pub particles: Vec<Particle>,
}

/// Event-driven simulation of equal-mass disks in a rectangular arena with hard walls.
///
/// Particles fly freely between events. The queue holds predicted collisions; a popped
/// event is applied only if none of its participants has changed since it was predicted,
/// otherwise it is dropped. A termination event at `config.duration` ends the run.
#[derive(Debug)]
pub struct Simulation {
    config: SimConfig,
    time_now: f64,
    particles: Vec<Particle>,
    queue: MinHeap<Event>,
    state: SimState,
    stats: SimStats,
}

impl Simulation {
    /// Build a simulation from particle records and seed the event queue.
    ///
    /// Errors: `Error::InvalidParam` for an invalid config, an invalid particle record, or a
    /// particle that does not lie inside the arena.
    pub fn new(config: SimConfig, particles: Vec<Particle>) -> Result<Self> {
        config.validate()?;
        if u32::try_from(particles.len()).is_err() {
            return Err(Error::InvalidParam("too many particles".into()));
        }
        for p in &particles {
            p.validate()?;
            check_inside(p, &config)?;
        }

        let mut sim = Self {
            config,
            time_now: 0.0,
            particles,
            queue: MinHeap::new(),
            state: SimState::Seeding,
            stats: SimStats::default(),
        };
        sim.schedule_initial_events()?;
        sim.state = SimState::Running;
        info!(
            "seeded simulation: {} particles, {} events queued, duration {}",
            sim.particles.len(),
            sim.queue.len(),
            sim.config.duration
        );
        Ok(sim)
    }

    /// Create a simulation with `num_particles` disks of identical `radius`.
    ///
    /// Particles are placed with simple rejection sampling to avoid initial overlap.
    /// Velocity components are sampled uniformly in `[-max_speed, max_speed]`.
    pub fn random(
        num_particles: usize,
        radius: f64,
        max_speed: f64,
        config: SimConfig,
        seed: Option<u64>,
    ) -> Result<Self> {
        config.validate()?;
        if num_particles == 0 {
            return Err(Error::InvalidParam("num_particles must be > 0".into()));
        }
        if !radius.is_finite() || radius <= 0.0 {
            return Err(Error::InvalidParam("radius must be finite and > 0".into()));
        }
        if !max_speed.is_finite() || max_speed < 0.0 {
            return Err(Error::InvalidParam(
                "max_speed must be finite and >= 0".into(),
            ));
        }
        let extent = [config.width, config.height];
        if extent.iter().any(|&l| l < 2.0 * radius) {
            return Err(Error::InvalidParam(
                "arena must be at least 2 * radius in every dimension".into(),
            ));
        }

        let mut rng: StdRng = match seed {
            Some(s) => SeedableRng::seed_from_u64(s),
            None => SeedableRng::seed_from_u64(rng().random()),
        };

        let mut particles: Vec<Particle> = Vec::with_capacity(num_particles);
        let max_attempts = 1_000_000usize;
        for id in 0..num_particles {
            let mut attempts = 0usize;
            let r = loop {
                if attempts >= max_attempts {
                    return Err(Error::InvalidParam(format!(
                        "failed to place particle {id} without overlap; try fewer particles or smaller radius"
                    )));
                }
                attempts += 1;
                let mut r = [0.0_f64; DIM];
                for (r_k, &l) in r.iter_mut().zip(extent.iter()) {
                    *r_k = rng.random_range(radius..=l - radius);
                }
                if !overlaps_existing(&particles, &r, radius) {
                    break r;
                }
            };

            let mut v = [0.0_f64; DIM];
            v.iter_mut()
                .for_each(|x| *x = rng.random_range(-max_speed..=max_speed));

            particles.push(Particle::new(format!("p{id}"), r, v, radius)?);
        }

        Self::new(config, particles)
    }

    /// Returns current simulation time.
    pub fn time(&self) -> f64 {
        self.time_now
    }

    pub fn state(&self) -> SimState {
        self.state
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Read-only view of the particles, in the order they were supplied.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particle(&self, id: ParticleId) -> Option<&Particle> {
        self.particles.get(id.index())
    }

    /// Number of particles.
    pub fn num_particles(&self) -> usize {
        self.particles.len()
    }

    /// Events still queued, stale ones included.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    pub fn stats(&self) -> SimStats {
        self.stats
    }

    /// Total kinetic energy with unit masses.
    pub fn kinetic_energy(&self) -> f64 {
        self.particles.iter().map(|p| p.kinetic_energy()).sum()
    }

    /// Total momentum with unit masses.
    pub fn momentum(&self) -> [f64; DIM] {
        let mut m = [0.0_f64; DIM];
        for p in &self.particles {
            for (mk, &vk) in m.iter_mut().zip(p.v.iter()) {
                *mk += vk;
            }
        }
        m
    }

    /// Snapshot for the result sink.
    pub fn report(&self) -> SimReport {
        SimReport {
            width: self.config.width,
            height: self.config.height,
            duration: self.config.duration,
            time: self.time_now,
            particles: self.particles.clone(),
        }
    }

    /// Process events until one valid collision is applied or the run terminates.
    ///
    /// Stale events met on the way are discarded without touching time or particles.
    /// Once terminated, further calls keep returning `StepOutcome::Terminated`.
    pub fn step(&mut self) -> Result<StepOutcome> {
        if self.state == SimState::Terminated {
            return Ok(StepOutcome::Terminated {
                time: self.time_now,
            });
        }
        match self.pop_live(f64::INFINITY) {
            Some(ev) => self.apply(ev),
            None => {
                // The termination event keeps the queue non-empty while running.
                warn!("event queue exhausted at t={} before termination", self.time_now);
                self.state = SimState::Terminated;
                Ok(StepOutcome::Terminated {
                    time: self.time_now,
                })
            }
        }
    }

    /// Run to termination and return the final report.
    pub fn run(&mut self) -> Result<SimReport> {
        while self.state != SimState::Terminated {
            self.step()?;
        }
        Ok(self.report())
    }

    /// Run to termination, notifying `observer` after every applied collision.
    pub fn run_with<O: StepObserver + ?Sized>(&mut self, observer: &mut O) -> Result<SimReport> {
        loop {
            match self.step()? {
                StepOutcome::Collision { time, .. } => observer.on_step(time, &self.particles),
                StepOutcome::Terminated { time } => {
                    observer.on_terminate(time, &self.particles);
                    break;
                }
            }
        }
        Ok(self.report())
    }

    /// Advance the simulation to `target_time` (must be >= current time).
    ///
    /// Applies every event up to `target_time`, then drifts all particles the rest of
    /// the way. Free flight does not invalidate queued predictions, so later events stay
    /// queued. A target at or past the duration runs the simulation to termination.
    pub fn advance_to(&mut self, target_time: f64) -> Result<()> {
        if !target_time.is_finite() {
            return Err(Error::InvalidParam("target_time must be finite".into()));
        }
        if self.state == SimState::Terminated {
            return Err(Error::InvalidState("simulation already terminated"));
        }
        if target_time < self.time_now {
            return Err(Error::InvalidParam(
                "target_time cannot be earlier than current time".into(),
            ));
        }

        while let Some(ev) = self.pop_live(target_time) {
            if let StepOutcome::Terminated { .. } = self.apply(ev)? {
                return Ok(());
            }
        }
        self.drift_all(target_time)?;
        self.time_now = target_time;
        Ok(())
    }

    // ============ Internal helpers ============

    /// Pop the earliest non-stale event with time <= `limit`, dropping stale ones.
    fn pop_live(&mut self, limit: f64) -> Option<Event> {
        while let Some(next) = self.queue.peek().copied() {
            if next.time_f64() > limit {
                return None;
            }
            let ev = self.queue.pop()?;
            if ev.is_stale(&self.particles) {
                self.stats.stale += 1;
                trace!("discarding stale {:?} at t={}", ev.kind, ev.time_f64());
                continue;
            }
            return Some(ev);
        }
        None
    }

    /// Drift to the event time, respond, and re-predict for the participants.
    fn apply(&mut self, ev: Event) -> Result<StepOutcome> {
        let t = ev.time_f64();
        self.drift_all(t)?;
        self.time_now = t;

        match ev.kind {
            EventKind::Termination => {
                self.state = SimState::Terminated;
                info!(
                    "simulation terminated at t={}: {} collisions applied, {} stale events dropped",
                    t, self.stats.applied, self.stats.stale
                );
                return Ok(StepOutcome::Terminated { time: t });
            }
            EventKind::Pair { a, b } => {
                let (ia, ib) = (a.id.index(), b.id.index());
                let (pa, pb) = pair_mut(&mut self.particles, ia, ib)?;
                pa.collide_with(pb, t)?;
                self.reschedule_for_particle(ia, None)?;
                self.reschedule_for_particle(ib, Some(ia))?;
            }
            EventKind::Wall { p, hit } => {
                let i = p.id.index();
                let particle = self
                    .particles
                    .get_mut(i)
                    .ok_or(Error::InvalidState("wall event references unknown particle"))?;
                particle.bounce(&hit, t);
                self.reschedule_for_particle(i, None)?;
            }
        }

        self.stats.applied += 1;
        debug!("applied {:?} at t={}", ev.kind, t);
        Ok(StepOutcome::Collision { time: t, kind: ev.kind })
    }

    fn schedule_initial_events(&mut self) -> Result<()> {
        let n = self.particles.len();
        for i in 0..n {
            for j in (i + 1)..n {
                self.schedule_pair(i, j)?;
            }
        }
        for i in 0..n {
            self.schedule_wall(i)?;
        }
        self.push(Event::termination(self.config.duration)?);
        Ok(())
    }

    /// Predict new events for particle `i` against the walls and every other particle
    /// except `skip` (a pair already predicted in this step).
    fn reschedule_for_particle(&mut self, i: usize, skip: Option<usize>) -> Result<()> {
        self.schedule_wall(i)?;
        for j in 0..self.particles.len() {
            if j == i || Some(j) == skip {
                continue;
            }
            self.schedule_pair(i, j)?;
        }
        Ok(())
    }

    fn schedule_pair(&mut self, i: usize, j: usize) -> Result<()> {
        let (pi, pj) = (&self.particles[i], &self.particles[j]);
        let dt = particle_collision_time(pi, pj);
        if dt.is_finite() {
            let ev = Event::pair(
                self.time_now + dt,
                self.time_now,
                Participant::of(particle_id(i), pi),
                Participant::of(particle_id(j), pj),
            )?;
            self.push(ev);
        }
        Ok(())
    }

    fn schedule_wall(&mut self, i: usize) -> Result<()> {
        let p = &self.particles[i];
        if let Some(hit) = next_wall_contact(p, self.config.width, self.config.height) {
            let ev = Event::wall(
                self.time_now + hit.time,
                self.time_now,
                Participant::of(particle_id(i), p),
                hit,
            )?;
            self.push(ev);
        }
        Ok(())
    }

    #[inline]
    fn push(&mut self, ev: Event) {
        self.queue.push(ev);
        self.stats.scheduled += 1;
    }

    /// Drift all particles to the specified absolute time by linear motion.
    fn drift_all(&mut self, to_time: f64) -> Result<()> {
        if to_time < self.time_now {
            return Err(Error::InvalidState("cannot drift backwards in time"));
        }
        let dt = to_time - self.time_now;
        if dt == 0.0 {
            return Ok(());
        }
        for p in &mut self.particles {
            p.advance(dt);
        }
        Ok(())
    }
}

// ============ Utility helpers ============

#[inline]
fn particle_id(i: usize) -> ParticleId {
    // Construction guarantees the particle count fits in u32.
    ParticleId(i as u32)
}

/// Two distinct mutable particles out of one slice.
fn pair_mut(particles: &mut [Particle], i: usize, j: usize) -> Result<(&mut Particle, &mut Particle)> {
    if i == j || i >= particles.len() || j >= particles.len() {
        return Err(Error::InvalidState(
            "pair event references invalid particles",
        ));
    }
    if i < j {
        let (lo, hi) = particles.split_at_mut(j);
        Ok((&mut lo[i], &mut hi[0]))
    } else {
        let (lo, hi) = particles.split_at_mut(i);
        Ok((&mut hi[0], &mut lo[j]))
    }
}

fn check_inside(p: &Particle, config: &SimConfig) -> Result<()> {
    let extent = [config.width, config.height];
    for (k, (&x, &l)) in p.r.iter().zip(extent.iter()).enumerate() {
        if x - p.radius < -EPS || x + p.radius > l + EPS {
            return Err(Error::InvalidParam(format!(
                "particle {:?} does not fit inside the arena on axis {k}",
                p.name
            )));
        }
    }
    Ok(())
}

fn overlaps_existing(existing: &[Particle], r: &[f64; DIM], radius: f64) -> bool {
    let min_sq = (2.0 * radius) * (2.0 * radius);
    existing.iter().any(|p| {
        let dx = r[0] - p.r[0];
        let dy = r[1] - p.r[1];
        dx * dx + dy * dy < min_sq
    })
}
