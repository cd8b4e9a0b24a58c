//! Global configuration constants and the serde-backed simulation configuration.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{
    collision::broadphase::BroadPhaseKind, core::material::ContactMaterial, error::ConfigError,
    scheduler::StepPolicy,
};

/// Default gravity vector applied in the physics world (Y-up).
pub const DEFAULT_GRAVITY: [f32; 3] = [0.0, -9.82, 0.0];

/// Default integration timestep (in seconds).
pub const DEFAULT_TIME_STEP: f32 = 1.0 / 60.0;

/// Upper bound on substeps scheduled for a single frame.
pub const DEFAULT_MAX_SUBSTEPS: u32 = 3;

/// Number of contact solver iterations performed per substep.
pub const DEFAULT_SOLVER_ITERATIONS: u32 = 10;

/// Fraction of penetration corrected per substep.
pub const DEFAULT_BAUMGARTE: f32 = 0.2;

/// Penetration tolerated before positional correction kicks in.
pub const DEFAULT_PENETRATION_SLOP: f32 = 0.005;

/// Approach speeds below this do not bounce.
pub const DEFAULT_RESTITUTION_THRESHOLD: f32 = 0.5;

/// Default damping applied to linear velocity (fraction lost per second).
pub const DEFAULT_LINEAR_DAMPING: f32 = 0.01;

/// Default damping applied to angular velocity (fraction lost per second).
pub const DEFAULT_ANGULAR_DAMPING: f32 = 0.01;

/// Bodies slower than this (m/s, linear and angular combined) become sleepy.
pub const DEFAULT_SLEEP_SPEED_LIMIT: f32 = 0.1;

/// Seconds a body must stay sleepy before it falls asleep.
pub const DEFAULT_SLEEP_TIME_LIMIT: f32 = 0.5;

/// Default cell size for the uniform grid broad-phase.
pub const DEFAULT_BROADPHASE_CELL_SIZE: f32 = 5.0;

/// Friction of the default contact material.
pub const DEFAULT_FRICTION: f32 = 0.1;

/// Restitution of the default contact material.
pub const DEFAULT_RESTITUTION: f32 = 0.7;

/// Minimum impact strength (m/s) that is audible.
pub const DEFAULT_MIN_IMPACT_STRENGTH: f32 = 1.5;

/// Impact strength that maps to full volume.
pub const DEFAULT_IMPACT_NORMALIZATION: f32 = 10.0;

/// Pending audio triggers buffered before new ones are dropped.
pub const DEFAULT_AUDIO_QUEUE_CAPACITY: usize = 32;

/// Frame duration above which a warning is logged.
pub const DEFAULT_FRAME_BUDGET_MS: f32 = 16.7;

/// Sleep bookkeeping thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SleepSettings {
    pub speed_limit: f32,
    pub time_limit: f32,
}

impl Default for SleepSettings {
    fn default() -> Self {
        Self {
            speed_limit: DEFAULT_SLEEP_SPEED_LIMIT,
            time_limit: DEFAULT_SLEEP_TIME_LIMIT,
        }
    }
}

/// Contact solver tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    pub iterations: u32,
    pub baumgarte: f32,
    pub penetration_slop: f32,
    pub restitution_threshold: f32,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_SOLVER_ITERATIONS,
            baumgarte: DEFAULT_BAUMGARTE,
            penetration_slop: DEFAULT_PENETRATION_SLOP,
            restitution_threshold: DEFAULT_RESTITUTION_THRESHOLD,
        }
    }
}

/// Global parameters owned by the [`PhysicsWorld`](crate::world::PhysicsWorld).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub gravity: Vec3,
    pub broadphase: BroadPhaseKind,
    pub grid_cell_size: f32,
    pub allow_sleep: bool,
    pub sleep: SleepSettings,
    pub solver: SolverSettings,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub default_contact: ContactMaterial,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::from_array(DEFAULT_GRAVITY),
            broadphase: BroadPhaseKind::default(),
            grid_cell_size: DEFAULT_BROADPHASE_CELL_SIZE,
            allow_sleep: true,
            sleep: SleepSettings::default(),
            solver: SolverSettings::default(),
            linear_damping: DEFAULT_LINEAR_DAMPING,
            angular_damping: DEFAULT_ANGULAR_DAMPING,
            default_contact: ContactMaterial::default(),
        }
    }
}

impl WorldConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.gravity.is_finite() {
            return Err(invalid("gravity must be finite"));
        }
        if !(self.grid_cell_size.is_finite() && self.grid_cell_size > 0.0) {
            return Err(invalid("grid_cell_size must be positive"));
        }
        if self.solver.iterations == 0 {
            return Err(invalid("solver.iterations must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.solver.baumgarte) {
            return Err(invalid("solver.baumgarte must lie in [0, 1]"));
        }
        if self.solver.penetration_slop < 0.0 || self.solver.restitution_threshold < 0.0 {
            return Err(invalid("solver slop and restitution threshold must be non-negative"));
        }
        if !(0.0..=1.0).contains(&self.linear_damping) || !(0.0..=1.0).contains(&self.angular_damping)
        {
            return Err(invalid("damping must lie in [0, 1]"));
        }
        if self.sleep.speed_limit < 0.0 || self.sleep.time_limit < 0.0 {
            return Err(invalid("sleep limits must be non-negative"));
        }
        self.default_contact.validate()?;
        Ok(())
    }
}

/// Fixed-step scheduler parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub fixed_step: f32,
    pub max_substeps: u32,
    pub policy: StepPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            fixed_step: DEFAULT_TIME_STEP,
            max_substeps: DEFAULT_MAX_SUBSTEPS,
            policy: StepPolicy::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fixed_step.is_finite() && self.fixed_step > 0.0) {
            return Err(invalid("scheduler.fixed_step must be positive"));
        }
        if self.max_substeps == 0 {
            return Err(invalid("scheduler.max_substeps must be at least 1"));
        }
        Ok(())
    }
}

/// Collision feedback (audio) parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub min_impact_strength: f32,
    pub normalization: f32,
    pub queue_capacity: usize,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            min_impact_strength: DEFAULT_MIN_IMPACT_STRENGTH,
            normalization: DEFAULT_IMPACT_NORMALIZATION,
            queue_capacity: DEFAULT_AUDIO_QUEUE_CAPACITY,
        }
    }
}

impl FeedbackConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_impact_strength.is_finite() && self.min_impact_strength >= 0.0) {
            return Err(invalid("feedback.min_impact_strength must be non-negative"));
        }
        if !(self.normalization.is_finite() && self.normalization > 0.0) {
            return Err(invalid("feedback.normalization must be positive"));
        }
        if self.queue_capacity == 0 {
            return Err(invalid("feedback.queue_capacity must be at least 1"));
        }
        Ok(())
    }
}

/// Top-level configuration for a [`Simulation`](crate::Simulation).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub world: WorldConfig,
    pub scheduler: SchedulerConfig,
    pub feedback: FeedbackConfig,
    pub frame_budget_ms: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            scheduler: SchedulerConfig::default(),
            feedback: FeedbackConfig::default(),
            frame_budget_ms: DEFAULT_FRAME_BUDGET_MS,
        }
    }
}

impl SimulationConfig {
    /// Parses a TOML document; omitted keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.world.validate()?;
        self.scheduler.validate()?;
        self.feedback.validate()?;
        if !(self.frame_budget_ms.is_finite() && self.frame_budget_ms > 0.0) {
            return Err(invalid("frame_budget_ms must be positive"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}
