/// Transform gizmo: which mesh it manipulates and how
use nalgebra::Vector3;

use crate::scene::MeshId;
use crate::transform::{Transform, TransformMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GizmoState {
    pub mode: TransformMode,
    target: Option<MeshId>,
}

impl GizmoState {
    pub fn new(mode: TransformMode) -> Self {
        Self { mode, target: None }
    }

    /// Bind to `mesh`, replacing any previous target.
    pub fn attach(&mut self, mesh: MeshId) {
        self.target = Some(mesh);
    }

    /// Release the target. Returns the mesh it was bound to.
    pub fn detach(&mut self) -> Option<MeshId> {
        self.target.take()
    }

    pub fn target(&self) -> Option<MeshId> {
        self.target
    }

    pub fn is_attached(&self) -> bool {
        self.target.is_some()
    }

    pub fn set_mode(&mut self, mode: TransformMode) {
        self.mode = mode;
    }

    /// Apply one drag step to `transform` in the current mode.
    pub fn apply(&self, transform: &mut Transform, delta: Vector3<f32>) {
        transform.apply(self.mode, delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_detach() {
        let mut gizmo = GizmoState::default();
        assert!(!gizmo.is_attached());

        gizmo.attach(MeshId::from_u32(1));
        gizmo.attach(MeshId::from_u32(2));
        assert_eq!(gizmo.target(), Some(MeshId::from_u32(2)));

        assert_eq!(gizmo.detach(), Some(MeshId::from_u32(2)));
        assert_eq!(gizmo.detach(), None);
    }

    #[test]
    fn test_apply_uses_mode() {
        let mut gizmo = GizmoState::new(TransformMode::Scale);
        let mut transform = Transform::identity();
        gizmo.apply(&mut transform, Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(transform.scale, Vector3::new(2.0, 1.0, 1.0));

        gizmo.set_mode(TransformMode::Translate);
        gizmo.apply(&mut transform, Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(transform.translation, Vector3::new(0.0, 0.0, -1.0));
    }
}
