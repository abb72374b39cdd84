//! Core simulation data structures and the event-driven engine.

pub mod config;
pub mod event;
pub mod heap;
pub mod particle;
pub mod predict;
pub mod sim;

pub use config::SimConfig;
pub use event::{Event, EventKind, Participant};
pub use heap::MinHeap;
pub use particle::{Particle, ParticleId};
pub use predict::{next_wall_contact, particle_collision_time, wall_collision_time, Wall, WallHit};
pub use sim::{SimReport, SimState, SimStats, Simulation, StepObserver, StepOutcome};
