//! Impact Scene – physics-synchronized scene updates for Rust.
//!
//! A rigid-body world advanced on a fixed timestep, a registry that keeps
//! simulated bodies paired with their render proxies, and a collision
//! feedback bridge that turns impacts into hit sounds.

pub mod audio;
pub mod collision;
pub mod commands;
pub mod config;
pub mod core;
pub mod dynamics;
pub mod error;
pub mod feedback;
pub mod registry;
pub mod scene;
pub mod scheduler;
pub mod sync;
pub mod utils;
pub mod world;

use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};

pub use glam::{Mat3, Mat4, Quat, Vec3};

pub use audio::{AudioBackend, AudioClip, AudioSink, CapturingAudioSink, ChannelAudioSink, NullAudioSink};
pub use collision::contact::CollisionEvent;
pub use commands::{CommandQueue, CommandSender, DebugCommand, SpawnKind, SpawnParams};
pub use config::SimulationConfig;
pub use core::{
    material::{ContactMaterial, ContactMaterialTable, MaterialTag},
    rigidbody::{BodyHandle, RigidBody, SleepState},
    shape::{CompoundChild, ShapeDescriptor, ShapeKind},
    types::{Pose, Transform, Velocity},
};
pub use error::{AudioError, ConfigError, MaterialError, SceneError, ShapeError, SpawnError};
pub use feedback::{AudioTrigger, CollisionFeedbackBridge, FeedbackRoutes, FeedbackStats, ListenerToken};
pub use registry::{EntityRegistry, EntryHandle, Lifecycle, MassPolicy, RegistryEntry, SpawnRequest};
pub use scene::{ProxyHandle, ProxyStore, RenderProxy, SceneGraph};
pub use scheduler::{FixedStepScheduler, StepPlan, StepPolicy};
pub use sync::SynchronizationPass;
pub use utils::allocator::{Arena, EntityId, GenerationalId};
pub use world::{CollisionListener, PhysicsWorld, StepSummary};

use utils::logging::warn_if_frame_budget_exceeded;

/// Outcome of one [`Simulation::frame`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    pub plan: StepPlan,
    pub step: StepSummary,
    pub commands_applied: usize,
    pub spawn_failures: usize,
    pub synchronized: usize,
    pub duration: Duration,
    pub over_budget: bool,
}

/// Frame loop owning the world, registry, scheduler, feedback bridge, and scene.
///
/// Each frame applies queued debug commands, steps the world as planned by
/// the scheduler, then synchronizes proxies.
pub struct Simulation<S: SceneGraph = ProxyStore> {
    config: SimulationConfig,
    world: PhysicsWorld,
    registry: EntityRegistry,
    scheduler: FixedStepScheduler,
    bridge: CollisionFeedbackBridge,
    scene: S,
    commands: CommandQueue,
    fixtures: Vec<BodyHandle>,
    frame_index: u64,
}

impl Default for Simulation<ProxyStore> {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

impl Simulation<ProxyStore> {
    /// Headless simulation with an in-crate proxy store and silent audio.
    pub fn new(config: SimulationConfig) -> Self {
        Self::with_scene(config, ProxyStore::new())
    }
}

impl<S: SceneGraph> Simulation<S> {
    pub fn with_scene(config: SimulationConfig, scene: S) -> Self {
        Self {
            world: PhysicsWorld::new(config.world),
            registry: EntityRegistry::new(),
            scheduler: FixedStepScheduler::new(config.scheduler),
            bridge: CollisionFeedbackBridge::new(config.feedback, None, Box::new(NullAudioSink)),
            scene,
            commands: CommandQueue::new(),
            fixtures: Vec::new(),
            frame_index: 0,
            config,
        }
    }

    /// Installs the hit clip (if loaded) and the sink triggers go to.
    pub fn with_audio(mut self, clip: Option<AudioClip>, sink: Box<dyn AudioSink>) -> Self {
        self.bridge.set_clip(clip);
        self.bridge.set_sink(sink);
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.world
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn bridge(&self) -> &CollisionFeedbackBridge {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut CollisionFeedbackBridge {
        &mut self.bridge
    }

    pub fn scheduler(&self) -> &FixedStepScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut FixedStepScheduler {
        &mut self.scheduler
    }

    pub fn command_sender(&self) -> CommandSender {
        self.commands.sender()
    }

    /// Bodies added outside the registry, such as the floor.
    pub fn fixtures(&self) -> &[BodyHandle] {
        &self.fixtures
    }

    pub fn frames(&self) -> u64 {
        self.frame_index
    }

    /// Adds a body with no proxy and no feedback route. Fixtures survive
    /// [`reset_all`](Self::reset_all).
    pub fn add_fixture(&mut self, body: RigidBody) -> BodyHandle {
        let handle = self.world.add_body(body);
        self.fixtures.push(handle);
        handle
    }

    pub fn spawn(&mut self, request: SpawnRequest) -> Result<EntryHandle, SpawnError> {
        self.registry
            .spawn(&mut self.world, &mut self.scene, &mut self.bridge, request)
    }

    pub fn teardown(&mut self, handle: EntryHandle) -> bool {
        self.registry
            .teardown(&mut self.world, &mut self.scene, &mut self.bridge, handle)
    }

    /// Tears down every spawned entry; fixtures stay.
    pub fn reset_all(&mut self) -> usize {
        let removed = self
            .registry
            .teardown_all(&mut self.world, &mut self.scene, &mut self.bridge);
        log::debug!("reset removed {removed} entries");
        removed
    }

    /// Applies queued debug commands. Returns (applied, failed spawns).
    pub fn apply_commands(&mut self) -> (usize, usize) {
        let mut applied = 0;
        let mut failures = 0;
        for command in self.commands.drain() {
            applied += 1;
            match command {
                DebugCommand::Spawn { kind, params } => {
                    if let Err(err) = self.spawn(params.to_request(kind)) {
                        log::warn!("debug spawn of {kind:?} failed: {err}");
                        failures += 1;
                    }
                }
                DebugCommand::ResetAll => {
                    self.reset_all();
                }
            }
        }
        (applied, failures)
    }

    /// Runs one frame that took `delta` seconds of wall time.
    pub fn frame(&mut self, delta: f32) -> FrameReport {
        let start = Instant::now();
        let (commands_applied, spawn_failures) = self.apply_commands();

        let plan = self.scheduler.advance(delta);
        let mut step = StepSummary::default();
        for _ in 0..plan.calls {
            step = self.world.step(plan.fixed_delta, plan.substeps, &mut self.bridge);
        }

        let synchronized = SynchronizationPass::run(&self.registry, &self.world, &mut self.scene);

        let duration = start.elapsed();
        let over_budget = warn_if_frame_budget_exceeded(duration, self.config.frame_budget_ms);
        self.frame_index += 1;

        FrameReport {
            frame: self.frame_index,
            plan,
            step,
            commands_applied,
            spawn_failures,
            synchronized,
            duration,
            over_budget,
        }
    }

    /// Runs frames until `shutdown` is set, then tears down every entry.
    ///
    /// `next_delta` supplies each frame's wall-clock delta; `render` sees the
    /// scene after synchronization.
    pub fn run<D, R>(&mut self, shutdown: &AtomicBool, mut next_delta: D, mut render: R) -> u64
    where
        D: FnMut() -> f32,
        R: FnMut(&S, &FrameReport),
    {
        let mut frames = 0;
        while !shutdown.load(Ordering::Acquire) {
            let report = self.frame(next_delta());
            render(&self.scene, &report);
            frames += 1;
        }
        let removed = self.reset_all();
        log::debug!("loop stopped after {frames} frames, released {removed} entries");
        frames
    }

    /// Releases every spawned entry before the world is dropped.
    pub fn shutdown(mut self) -> usize {
        self.reset_all()
    }
}
