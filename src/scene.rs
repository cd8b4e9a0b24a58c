//! Render-side counterparts of simulated bodies.

use glam::{Quat, Vec3};

use crate::{
    core::{
        material::MaterialTag,
        shape::{ShapeDescriptor, ShapeKind},
        types::{Pose, Transform},
    },
    error::SceneError,
    utils::allocator::{typed_handle, Arena},
};

typed_handle!(
    /// Handle to a [`RenderProxy`] owned by a [`SceneGraph`].
    ProxyHandle
);

/// Visual object the renderer draws. Its pose is written only by the
/// synchronization pass; its scale is fixed at creation.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderProxy {
    kind: ShapeKind,
    material: MaterialTag,
    transform: Transform,
}

impl RenderProxy {
    pub fn new(kind: ShapeKind, material: MaterialTag, transform: Transform) -> Self {
        Self {
            kind,
            material,
            transform,
        }
    }

    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    pub fn material(&self) -> MaterialTag {
        self.material
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    pub fn rotation(&self) -> Quat {
        self.transform.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.transform.scale
    }

    pub(crate) fn set_pose(&mut self, pose: &Pose) {
        self.transform.position = pose.position;
        self.transform.rotation = pose.rotation;
    }
}

/// Scene-graph construction as seen by the simulation.
pub trait SceneGraph {
    /// Creates a visual for `shape`; the scene may refuse.
    fn create_proxy(
        &mut self,
        shape: &ShapeDescriptor,
        material: MaterialTag,
        transform: Transform,
    ) -> Result<ProxyHandle, SceneError>;

    /// Destroys a proxy. Returns `false` for unknown or stale handles.
    fn remove_proxy(&mut self, handle: ProxyHandle) -> bool;

    fn proxy(&self, handle: ProxyHandle) -> Option<&RenderProxy>;

    fn proxy_mut(&mut self, handle: ProxyHandle) -> Option<&mut RenderProxy>;

    fn proxy_count(&self) -> usize;
}

/// Arena-backed scene with an optional cap on live proxies.
#[derive(Debug, Default)]
pub struct ProxyStore {
    proxies: Arena<RenderProxy>,
    capacity: Option<usize>,
}

impl ProxyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity_limit(limit: usize) -> Self {
        Self {
            proxies: Arena::new(),
            capacity: Some(limit),
        }
    }

    /// Live proxies in slot order, as the renderer walks them.
    pub fn iter(&self) -> impl Iterator<Item = (ProxyHandle, &RenderProxy)> + '_ {
        self.proxies
            .iter_with_ids()
            .map(|(id, proxy)| (ProxyHandle(id), proxy))
    }
}

impl SceneGraph for ProxyStore {
    fn create_proxy(
        &mut self,
        shape: &ShapeDescriptor,
        material: MaterialTag,
        transform: Transform,
    ) -> Result<ProxyHandle, SceneError> {
        if let Some(limit) = self.capacity {
            if self.proxies.len() >= limit {
                return Err(SceneError::CapacityExceeded(limit));
            }
        }
        let proxy = RenderProxy::new(shape.kind(), material, transform);
        Ok(ProxyHandle(self.proxies.insert(proxy)))
    }

    fn remove_proxy(&mut self, handle: ProxyHandle) -> bool {
        self.proxies.remove(handle.id()).is_some()
    }

    fn proxy(&self, handle: ProxyHandle) -> Option<&RenderProxy> {
        self.proxies.get(handle.id())
    }

    fn proxy_mut(&mut self, handle: ProxyHandle) -> Option<&mut RenderProxy> {
        self.proxies.get_mut(handle.id())
    }

    fn proxy_count(&self) -> usize {
        self.proxies.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_limit_rejects_extra_proxies() {
        let mut scene = ProxyStore::with_capacity_limit(1);
        let shape = ShapeDescriptor::sphere(1.0);
        let first = scene
            .create_proxy(&shape, MaterialTag::DEFAULT, Transform::default())
            .expect("first proxy");

        let second = scene.create_proxy(&shape, MaterialTag::DEFAULT, Transform::default());
        assert!(matches!(second, Err(SceneError::CapacityExceeded(1))));

        assert!(scene.remove_proxy(first));
        assert!(!scene.remove_proxy(first));
        assert!(scene
            .create_proxy(&shape, MaterialTag::DEFAULT, Transform::default())
            .is_ok());
    }

    #[test]
    fn set_pose_leaves_scale_alone() {
        let mut proxy = RenderProxy::new(
            ShapeKind::Box,
            MaterialTag::DEFAULT,
            Transform::from_pose(Pose::default(), Vec3::new(1.0, 2.0, 3.0)),
        );
        proxy.set_pose(&Pose::new(Vec3::Y, Quat::from_rotation_z(0.5)));

        assert_eq!(proxy.position(), Vec3::Y);
        assert_eq!(proxy.scale(), Vec3::new(1.0, 2.0, 3.0));
    }
}
