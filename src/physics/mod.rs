//! CPU rigid-body physics: GJK/EPA collision detection and impulse dynamics.
//!
//! # Architecture
//!
//! The physics pipeline runs in a fixed timestep loop. Each tick:
//!
//! 1. Broadphase: refresh collider caches, prune pairs by AABB, run GJK/EPA,
//!    commit symmetric contact records
//! 2. Reset impulse accumulators and stale `grounded` flags
//! 3. Apply per-entity gravity
//! 4. Accumulate contact impulses
//! 5. Positional correction
//! 6. Jumps
//! 7. Integrate impulses into velocities
//! 8. Integrate positions and orientations

pub mod body;
pub mod broadphase;
pub mod collider;
pub mod contact;
pub mod narrowphase;
pub mod rigid_body;
pub mod solver;

use glam::Vec3;

pub use body::BodyDesc;

/// Errors raised when creating bodies or configuring the world.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PhysicsError {
    #[error("dynamic body mass must be finite and > 0, got {0}")]
    InvalidMass(f32),
    #[error("restitution must be within [0, 1], got {0}")]
    InvalidRestitution(f32),
    #[error("invalid collider shape: {0}")]
    InvalidShape(String),
    #[error("invalid physics config: {0}")]
    InvalidConfig(&'static str),
}

/// Configuration for the physics simulation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PhysicsConfig {
    /// Gravity attached to new bodies by [`BodyDesc`]. Default: (0, -9.81, 0).
    pub gravity: Vec3,
    /// Fixed timestep for physics updates in seconds. Default: 1/60.
    pub fixed_timestep: f64,
    /// Maximum number of sub-steps per frame. Default: 4.
    pub max_substeps: u32,
    /// GJK iteration cap. Default: 64.
    pub gjk_max_iterations: u32,
    /// EPA iteration cap. Default: 64.
    pub epa_max_iterations: u32,
    /// EPA stops once the polytope grows by less than this. Default: 1e-4.
    pub epa_growth_tolerance: f32,
    /// Multiplier on local half extents when building world AABBs. Default: 10.
    pub aabb_margin: f32,
    /// Restitution used by the contact solver. Default: 0.2.
    pub contact_restitution: f32,
    /// Use each body's own restitution instead of `contact_restitution`.
    /// Default: false.
    pub use_body_restitution: bool,
    /// Baumgarte stabilization factor. Default: 0.02.
    pub baumgarte_beta: f32,
    /// Penetration allowed before the bias term kicks in. Default: 0.01.
    pub penetration_slop: f32,
    /// Minimum `normal.y` for a contact to count as ground. Default: 0.7.
    pub ground_normal_threshold: f32,
    /// `grounded` is cleared when `|velocity.y|` exceeds this. Default: 0.1.
    pub grounded_velocity_threshold: f32,
    /// Upward force applied for one tick on a jump. Default: 1250.
    pub jump_force: f32,
    /// Apply the angular contact impulse. Default: false.
    pub apply_angular_impulse: bool,
    /// Keep EPA results that hit the iteration cap. Default: false.
    pub accept_unconverged_contacts: bool,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            fixed_timestep: 1.0 / 60.0,
            max_substeps: 4,
            gjk_max_iterations: 64,
            epa_max_iterations: 64,
            epa_growth_tolerance: 1e-4,
            aabb_margin: 10.0,
            contact_restitution: 0.2,
            use_body_restitution: false,
            baumgarte_beta: 0.02,
            penetration_slop: 0.01,
            ground_normal_threshold: 0.7,
            grounded_velocity_threshold: 0.1,
            jump_force: 1250.0,
            apply_angular_impulse: false,
            accept_unconverged_contacts: false,
        }
    }
}

impl PhysicsConfig {
    pub fn validate(&self) -> Result<(), PhysicsError> {
        if !(self.fixed_timestep.is_finite() && self.fixed_timestep > 0.0) {
            return Err(PhysicsError::InvalidConfig(
                "fixed_timestep must be finite and > 0",
            ));
        }
        if self.max_substeps == 0 {
            return Err(PhysicsError::InvalidConfig("max_substeps must be > 0"));
        }
        if self.gjk_max_iterations == 0 || self.epa_max_iterations == 0 {
            return Err(PhysicsError::InvalidConfig("iteration caps must be > 0"));
        }
        if !(self.epa_growth_tolerance.is_finite() && self.epa_growth_tolerance > 0.0) {
            return Err(PhysicsError::InvalidConfig(
                "epa_growth_tolerance must be finite and > 0",
            ));
        }
        if !(self.aabb_margin.is_finite() && self.aabb_margin >= 1.0) {
            return Err(PhysicsError::InvalidConfig("aabb_margin must be >= 1"));
        }
        if !(0.0..=1.0).contains(&self.contact_restitution) {
            return Err(PhysicsError::InvalidRestitution(self.contact_restitution));
        }
        if !self.gravity.is_finite() {
            return Err(PhysicsError::InvalidConfig("gravity must be finite"));
        }
        Ok(())
    }
}

/// Drives the simulation over a `hecs::World`.
pub struct PhysicsWorld {
    config: PhysicsConfig,
    accumulator: f64,
}

impl PhysicsWorld {
    /// Create a new physics world with the given configuration.
    pub fn new(config: PhysicsConfig) -> Result<Self, PhysicsError> {
        config.validate()?;
        Ok(Self {
            config,
            accumulator: 0.0,
        })
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Time carried over to the next [`step`](Self::step), in seconds.
    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    /// Step the physics simulation forward by `delta_time` seconds.
    ///
    /// Uses a fixed timestep accumulator to ensure deterministic simulation.
    /// Returns the number of ticks run.
    pub fn step(&mut self, world: &mut hecs::World, delta_time: f64) -> u32 {
        self.accumulator += delta_time.max(0.0);

        let mut substeps = 0u32;
        while self.accumulator >= self.config.fixed_timestep && substeps < self.config.max_substeps
        {
            self.tick(world);
            self.accumulator -= self.config.fixed_timestep;
            substeps += 1;
        }

        // Clamp accumulator to avoid spiral of death
        if self.accumulator > self.config.fixed_timestep * self.config.max_substeps as f64 {
            tracing::debug!(
                dropped = self.accumulator,
                "physics fell behind; dropping accumulated time"
            );
            self.accumulator = 0.0;
        }

        substeps
    }

    /// Run exactly one fixed tick.
    pub fn tick(&mut self, world: &mut hecs::World) {
        let _span = tracing::debug_span!("physics_tick").entered();
        let config = &self.config;
        let dt = config.fixed_timestep as f32;

        broadphase::update_contacts(world, config);

        rigid_body::reset_impulses(world, config.grounded_velocity_threshold);
        rigid_body::apply_gravity(world, dt);
        solver::resolve_contacts(world, config, dt);
        solver::positional_correction(world);
        rigid_body::apply_jumps(world, config.jump_force, dt);
        rigid_body::integrate_impulses(world);
        rigid_body::integrate_motion(world, dt);
    }
}
