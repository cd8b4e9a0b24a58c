//! Debug/UI commands delivered to the frame loop between frames.

use crossbeam_channel::{unbounded, Receiver, Sender};
use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{core::shape::ShapeDescriptor, registry::SpawnRequest};

/// Spawn height used by randomized debug spawns.
pub const RANDOM_SPAWN_HEIGHT: f32 = 3.0;
/// Largest random sphere radius or box edge.
pub const RANDOM_MAX_SIZE: f32 = 0.5;
/// Width of the square area random spawns land in, centred on the origin.
pub const RANDOM_SPREAD: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnKind {
    Sphere,
    Box,
}

/// Size and placement for a debug spawn. `size.x` is the radius for spheres;
/// for boxes it holds the full edge lengths.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnParams {
    pub size: Vec3,
    pub position: Vec3,
}

impl SpawnParams {
    pub fn sphere(radius: f32, position: Vec3) -> Self {
        Self {
            size: Vec3::splat(radius),
            position,
        }
    }

    pub fn cuboid(size: Vec3, position: Vec3) -> Self {
        Self { size, position }
    }

    /// Random size in `[0, 0.5)` per dimension, dropped from a fixed height
    /// somewhere in a 3 x 3 square. A zero draw is rejected at spawn.
    pub fn randomized<R: Rng + ?Sized>(kind: SpawnKind, rng: &mut R) -> Self {
        let size = match kind {
            SpawnKind::Sphere => Vec3::splat(rng.random::<f32>() * RANDOM_MAX_SIZE),
            SpawnKind::Box => Vec3::new(
                rng.random::<f32>() * RANDOM_MAX_SIZE,
                rng.random::<f32>() * RANDOM_MAX_SIZE,
                rng.random::<f32>() * RANDOM_MAX_SIZE,
            ),
        };
        let position = Vec3::new(
            (rng.random::<f32>() - 0.5) * RANDOM_SPREAD,
            RANDOM_SPAWN_HEIGHT,
            (rng.random::<f32>() - 0.5) * RANDOM_SPREAD,
        );
        Self { size, position }
    }

    pub fn shape(&self, kind: SpawnKind) -> ShapeDescriptor {
        match kind {
            SpawnKind::Sphere => ShapeDescriptor::sphere(self.size.x),
            SpawnKind::Box => ShapeDescriptor::cuboid(self.size),
        }
    }

    /// Unit-mass request with the default material.
    pub fn to_request(&self, kind: SpawnKind) -> SpawnRequest {
        SpawnRequest::new(self.shape(kind)).with_position(self.position)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DebugCommand {
    Spawn { kind: SpawnKind, params: SpawnParams },
    ResetAll,
}

/// Cloneable producer side of a [`CommandQueue`]; usable from any thread.
#[derive(Debug, Clone)]
pub struct CommandSender {
    sender: Sender<DebugCommand>,
}

impl CommandSender {
    /// Queues a command. Returns `false` once the frame loop is gone.
    pub fn send(&self, command: DebugCommand) -> bool {
        self.sender.send(command).is_ok()
    }

    pub fn spawn(&self, kind: SpawnKind, params: SpawnParams) -> bool {
        self.send(DebugCommand::Spawn { kind, params })
    }

    pub fn spawn_random(&self, kind: SpawnKind) -> bool {
        self.spawn(kind, SpawnParams::randomized(kind, &mut rand::rng()))
    }

    pub fn reset_all(&self) -> bool {
        self.send(DebugCommand::ResetAll)
    }
}

/// Consumer side, drained by the frame loop at frame boundaries.
#[derive(Debug)]
pub struct CommandQueue {
    sender: Sender<DebugCommand>,
    receiver: Receiver<DebugCommand>,
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandQueue {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    pub fn sender(&self) -> CommandSender {
        CommandSender {
            sender: self.sender.clone(),
        }
    }

    /// Everything queued so far, in submission order.
    pub fn drain(&self) -> Vec<DebugCommand> {
        self.receiver.try_iter().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}
