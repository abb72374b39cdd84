//! Event-driven simulation of elastic collisions between disks in a rectangular arena.
//!
//! Instead of stepping time in fixed increments, the engine predicts when the next
//! particle-particle or particle-wall contact happens, keeps those predictions in a
//! min-heap, and jumps straight from one contact to the next. Predictions made before
//! a participant last changed velocity are detected and dropped when popped.
//!
//! ```
//! use particlesim::core::{Particle, SimConfig, Simulation};
//!
//! # fn main() -> particlesim::error::Result<()> {
//! let particles = vec![
//!     Particle::new("a", [30.0, 50.0], [5.0, 0.0], 5.0)?,
//!     Particle::new("b", [60.0, 50.0], [-5.0, 0.0], 5.0)?,
//! ];
//! let mut sim = Simulation::new(SimConfig::square(500.0, 10.0), particles)?;
//! let report = sim.run()?;
//! assert_eq!(report.time, 10.0);
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod error;

pub use crate::core::{Particle, SimConfig, Simulation};
pub use crate::error::{Error, Result};
