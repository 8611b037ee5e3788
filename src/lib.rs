//! Rein Impulse
//!
//! Rigid-body collision detection and impulse dynamics over a hecs world.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! 1. **ecs** - Components the physics core reads and writes (transform,
//!    collider, body, velocities, flags, contact buffers)
//! 2. **physics** - Broad phase, GJK/EPA narrow phase, contact log and the
//!    ordered dynamics passes, driven by [`PhysicsWorld`]
//!
//! The host owns the [`hecs::World`]; every system takes it explicitly.

pub mod ecs;
pub mod physics;

pub use ecs::prelude::*;

pub use physics::{BodyDesc, PhysicsConfig, PhysicsError, PhysicsWorld};

// Re-export glam and hecs for convenience
pub use glam;
pub use hecs;
