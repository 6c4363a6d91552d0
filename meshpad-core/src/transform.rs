/// Object transforms and the rotation state they are built from
use std::fmt;
use std::str::FromStr;

use nalgebra::{Matrix4, Vector3};
use serde::{Deserialize, Serialize};

/// Rotation state around three axes (in radians)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RotationState {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl RotationState {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Rotate by delta amounts (in radians)
    pub fn rotate(&mut self, dx: f32, dy: f32, dz: f32) {
        self.x += dx;
        self.y += dy;
        self.z += dz;
    }

    /// Rotation matrix, applied X first, then Y, then Z.
    pub fn matrix(&self) -> Matrix4<f32> {
        let rx = Matrix4::new_rotation(Vector3::new(self.x, 0.0, 0.0));
        let ry = Matrix4::new_rotation(Vector3::new(0.0, self.y, 0.0));
        let rz = Matrix4::new_rotation(Vector3::new(0.0, 0.0, self.z));
        rz * ry * rx
    }
}

/// Placement of a mesh in the scene: translation, rotation and scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vector3<f32>,
    pub rotation: RotationState,
    pub scale: Vector3<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: RotationState::zero(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    /// Model matrix: scale, then rotate, then translate.
    pub fn matrix(&self) -> Matrix4<f32> {
        Matrix4::new_translation(&self.translation)
            * self.rotation.matrix()
            * Matrix4::new_nonuniform_scaling(&self.scale)
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// Apply one gizmo drag step in the given mode.
    pub fn apply(&mut self, mode: TransformMode, delta: Vector3<f32>) {
        match mode {
            TransformMode::Translate => self.translation += delta,
            TransformMode::Rotate => self.rotation.rotate(delta.x, delta.y, delta.z),
            TransformMode::Scale => self.scale += delta,
        }
    }
}

/// Gizmo manipulation sub-mode, used while the editor is in transform mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformMode {
    #[default]
    Translate,
    Rotate,
    Scale,
}

impl TransformMode {
    pub fn as_str(self) -> &'static str {
        match self {
            TransformMode::Translate => "translate",
            TransformMode::Rotate => "rotate",
            TransformMode::Scale => "scale",
        }
    }

    /// Next mode in toolbar order, wrapping around.
    pub fn next(self) -> Self {
        match self {
            TransformMode::Translate => TransformMode::Rotate,
            TransformMode::Rotate => TransformMode::Scale,
            TransformMode::Scale => TransformMode::Translate,
        }
    }
}

impl fmt::Display for TransformMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransformMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "translate" | "move" => Ok(TransformMode::Translate),
            "rotate" => Ok(TransformMode::Rotate),
            "scale" => Ok(TransformMode::Scale),
            other => Err(format!("unknown transform mode: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    #[test]
    fn test_rotation_state() {
        let mut state = RotationState::zero();
        assert_eq!(state, RotationState::new(0.0, 0.0, 0.0));

        state.rotate(0.1, 0.2, 0.3);
        assert_relative_eq!(state.x, 0.1);
        assert_relative_eq!(state.y, 0.2);
        assert_relative_eq!(state.z, 0.3);
    }

    #[test]
    fn test_identity_transform() {
        let transform = Transform::identity();
        assert!(transform.is_identity());
        assert_relative_eq!(transform.matrix(), Matrix4::identity());
    }

    #[test]
    fn test_matrix_order() {
        let transform = Transform {
            translation: Vector3::new(1.0, 0.0, 0.0),
            rotation: RotationState::new(0.0, 0.0, std::f32::consts::FRAC_PI_2),
            scale: Vector3::new(2.0, 2.0, 2.0),
        };
        // scale (1,0,0) -> (2,0,0), rotate about z -> (0,2,0), translate -> (1,2,0)
        let moved = transform.matrix().transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(moved, Point3::new(1.0, 2.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_apply_modes() {
        let mut transform = Transform::identity();
        transform.apply(TransformMode::Translate, Vector3::new(1.0, 2.0, 3.0));
        transform.apply(TransformMode::Rotate, Vector3::new(0.0, 0.5, 0.0));
        transform.apply(TransformMode::Scale, Vector3::new(0.5, 0.0, 0.0));

        assert_eq!(transform.translation, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(transform.rotation, RotationState::new(0.0, 0.5, 0.0));
        assert_eq!(transform.scale, Vector3::new(1.5, 1.0, 1.0));
    }

    #[test]
    fn test_transform_mode_parse_and_cycle() {
        assert_eq!("move".parse::<TransformMode>(), Ok(TransformMode::Translate));
        assert_eq!("Rotate".parse::<TransformMode>(), Ok(TransformMode::Rotate));
        assert!("shear".parse::<TransformMode>().is_err());
        assert_eq!(TransformMode::Scale.next(), TransformMode::Translate);
    }
}
