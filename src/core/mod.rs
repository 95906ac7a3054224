//! Core deterministic primitives.
//!
//! Randomness and time sources for the simulation. Nothing here reads the
//! wall clock or the OS entropy pool; callers provide seeds and frame deltas.

pub mod clock;
pub mod rng;

pub use clock::ActiveClock;
pub use rng::DeterministicRng;
