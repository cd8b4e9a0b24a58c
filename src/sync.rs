use crate::{registry::EntityRegistry, scene::SceneGraph, utils::logging::ScopedTimer, world::PhysicsWorld};

/// Copies simulated poses onto render proxies once per frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct SynchronizationPass;

impl SynchronizationPass {
    /// Writes every live entry's body position and orientation into its
    /// proxy, leaving scale alone. Returns the number of proxies updated.
    pub fn run<S>(registry: &EntityRegistry, world: &PhysicsWorld, scene: &mut S) -> usize
    where
        S: SceneGraph + ?Sized,
    {
        let _timer = ScopedTimer::new("sync::poses");
        let mut updated = 0;
        registry.for_each(|handle, entry| {
            let (Some(body), Some(proxy)) = (world.body(entry.body), scene.proxy_mut(entry.proxy)) else {
                log::warn!("entry {handle:?} is missing its body or proxy during sync");
                return;
            };
            proxy.set_pose(&body.pose);
            updated += 1;
        });
        updated
    }
}
