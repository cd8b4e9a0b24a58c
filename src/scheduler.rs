//! Converts variable frame deltas into fixed-size physics substeps.

use serde::{Deserialize, Serialize};

use crate::config::SchedulerConfig;

/// How frame time is turned into substeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPolicy {
    /// One world step per frame with `round(delta / fixed)` substeps, capped.
    /// Short frames still run one substep; time beyond the cap is dropped.
    #[default]
    WallClock,
    /// Classic accumulator: run only whole fixed steps that are due, capped,
    /// then keep at most one step of backlog.
    Accumulator,
}

/// Work scheduled for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepPlan {
    /// Number of world step calls to make (0 or 1).
    pub calls: u32,
    /// Substeps per call.
    pub substeps: u32,
    pub fixed_delta: f32,
    /// Simulated time the plan advances the world by.
    pub effective_delta: f32,
    /// Frame time that will never be simulated.
    pub dropped_time: f32,
    /// Fraction of a fixed step left in the accumulator, for render interpolation.
    pub interpolation_alpha: f32,
}

impl StepPlan {
    pub fn total_substeps(&self) -> u32 {
        self.calls * self.substeps
    }
}

#[derive(Debug, Clone)]
pub struct FixedStepScheduler {
    config: SchedulerConfig,
    accumulator: f32,
}

impl Default for FixedStepScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl FixedStepScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            accumulator: 0.0,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn fixed_delta(&self) -> f32 {
        self.config.fixed_step
    }

    pub fn max_substeps(&self) -> u32 {
        self.config.max_substeps.max(1)
    }

    pub fn policy(&self) -> StepPolicy {
        self.config.policy
    }

    pub fn set_policy(&mut self, policy: StepPolicy) {
        self.config.policy = policy;
        self.accumulator = 0.0;
    }

    /// Time carried over to the next frame by the accumulator policy.
    pub fn accumulated(&self) -> f32 {
        self.accumulator
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }

    /// Plans the substeps for a frame that took `frame_delta` seconds.
    /// Negative or non-finite deltas count as zero.
    pub fn advance(&mut self, frame_delta: f32) -> StepPlan {
        let delta = if frame_delta.is_finite() {
            frame_delta.max(0.0)
        } else {
            log::debug!("non-finite frame delta {frame_delta}, treating as 0");
            0.0
        };

        let plan = match self.config.policy {
            StepPolicy::WallClock => self.plan_wall_clock(delta),
            StepPolicy::Accumulator => self.plan_accumulated(delta),
        };
        if plan.dropped_time > 0.0 {
            log::debug!(
                "frame delta {:.4}s exceeds {} substeps, dropping {:.4}s",
                delta,
                self.max_substeps(),
                plan.dropped_time
            );
        }
        plan
    }

    fn plan_wall_clock(&self, delta: f32) -> StepPlan {
        let fixed = self.config.fixed_step;
        let max = self.max_substeps();
        let wanted = (delta / fixed).round();
        let substeps = if wanted >= max as f32 {
            max
        } else {
            (wanted as u32).max(1)
        };
        let effective_delta = substeps as f32 * fixed;

        StepPlan {
            calls: 1,
            substeps,
            fixed_delta: fixed,
            effective_delta,
            dropped_time: if substeps == max {
                (delta - effective_delta).max(0.0)
            } else {
                0.0
            },
            interpolation_alpha: 0.0,
        }
    }

    fn plan_accumulated(&mut self, delta: f32) -> StepPlan {
        let fixed = self.config.fixed_step;
        let max = self.max_substeps();
        self.accumulator += delta;

        // Tolerates float drift when frames sum to a whole step.
        let due = (self.accumulator / fixed + 1e-4).floor();
        let substeps = if due >= max as f32 { max } else { due as u32 };

        let remaining = (self.accumulator - substeps as f32 * fixed).max(0.0);
        let carried = if remaining >= fixed {
            remaining % fixed
        } else {
            remaining
        };
        self.accumulator = carried;

        StepPlan {
            calls: u32::from(substeps > 0),
            substeps,
            fixed_delta: fixed,
            effective_delta: substeps as f32 * fixed,
            dropped_time: remaining - carried,
            interpolation_alpha: (carried / fixed).clamp(0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const FIXED: f32 = 1.0 / 60.0;

    fn scheduler(policy: StepPolicy) -> FixedStepScheduler {
        FixedStepScheduler::new(SchedulerConfig {
            policy,
            ..SchedulerConfig::default()
        })
    }

    #[test]
    fn wall_clock_runs_one_call_per_frame() {
        let mut scheduler = scheduler(StepPolicy::WallClock);
        for (delta, expected) in [(FIXED, 1), (2.0 * FIXED, 2), (0.001, 1), (0.0, 1)] {
            let plan = scheduler.advance(delta);
            assert_eq!(plan.calls, 1);
            assert_eq!(plan.substeps, expected, "delta {delta}");
            assert_relative_eq!(plan.fixed_delta, FIXED);
            assert_eq!(plan.dropped_time, 0.0);
        }
    }

    #[test]
    fn long_frames_are_capped_and_the_rest_dropped() {
        let mut scheduler = scheduler(StepPolicy::WallClock);
        let plan = scheduler.advance(5.0);
        assert_eq!(plan.substeps, 3);
        assert_relative_eq!(plan.effective_delta, 3.0 * FIXED);
        assert_relative_eq!(plan.dropped_time, 5.0 - 3.0 * FIXED, epsilon = 1e-5);
    }

    #[test]
    fn bad_deltas_count_as_zero() {
        let mut scheduler = scheduler(StepPolicy::WallClock);
        for delta in [f32::NAN, f32::INFINITY, -1.0] {
            let plan = scheduler.advance(delta);
            assert_eq!(plan.total_substeps(), 1);
            assert_eq!(plan.dropped_time, 0.0);
        }
    }

    #[test]
    fn accumulator_waits_for_whole_steps() {
        let mut scheduler = scheduler(StepPolicy::Accumulator);

        let first = scheduler.advance(FIXED / 2.0);
        assert_eq!(first.calls, 0);
        assert_relative_eq!(first.interpolation_alpha, 0.5, epsilon = 1e-4);

        let second = scheduler.advance(FIXED / 2.0);
        assert_eq!(second.calls, 1);
        assert_eq!(second.substeps, 1);
        assert!(scheduler.accumulated() < 1e-4);
    }

    #[test]
    fn accumulator_discards_backlog_beyond_one_step() {
        let mut scheduler = scheduler(StepPolicy::Accumulator);
        let plan = scheduler.advance(5.0 + FIXED * 0.25);

        assert_eq!(plan.substeps, 3);
        assert!(scheduler.accumulated() < FIXED);
        assert_relative_eq!(plan.interpolation_alpha, 0.25, epsilon = 1e-2);
        assert!(plan.dropped_time > 4.9);
    }
}
