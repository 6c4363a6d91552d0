/// Primitive shape generators for the "add shape" toolbar
use std::f32::consts::{PI, TAU};
use std::fmt;
use std::str::FromStr;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::geometry::GeometryBuffer;

const CUBE_SIZE: f32 = 1.0;
const SPHERE_RADIUS: f32 = 0.5;
const SPHERE_SEGMENTS: u32 = 32;
const CYLINDER_RADIUS: f32 = 0.5;
const CYLINDER_HEIGHT: f32 = 1.0;
const CYLINDER_SEGMENTS: u32 = 32;

/// Primitive shapes that can be added to the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Cube,
    Sphere,
    Cylinder,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 3] = [ShapeKind::Cube, ShapeKind::Sphere, ShapeKind::Cylinder];

    /// Generate this shape's geometry, centred on the origin.
    pub fn build(self) -> GeometryBuffer {
        match self {
            ShapeKind::Cube => cube(CUBE_SIZE),
            ShapeKind::Sphere => sphere(SPHERE_RADIUS, SPHERE_SEGMENTS, SPHERE_SEGMENTS),
            ShapeKind::Cylinder => cylinder(CYLINDER_RADIUS, CYLINDER_HEIGHT, CYLINDER_SEGMENTS),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShapeKind::Cube => "cube",
            ShapeKind::Sphere => "sphere",
            ShapeKind::Cylinder => "cylinder",
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShapeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cube" => Ok(ShapeKind::Cube),
            "sphere" => Ok(ShapeKind::Sphere),
            "cylinder" => Ok(ShapeKind::Cylinder),
            other => Err(format!("unknown shape: {other}")),
        }
    }
}

/// Axis-aligned cube with four vertices per face so each face shades flat.
pub fn cube(size: f32) -> GeometryBuffer {
    let h = size / 2.0;
    // Corners of each face, counter-clockwise seen from outside.
    let faces: [[[f32; 3]; 4]; 6] = [
        [[h, -h, -h], [h, h, -h], [h, h, h], [h, -h, h]],     // +X
        [[-h, -h, h], [-h, h, h], [-h, h, -h], [-h, -h, -h]], // -X
        [[-h, h, -h], [-h, h, h], [h, h, h], [h, h, -h]],     // +Y
        [[-h, -h, h], [-h, -h, -h], [h, -h, -h], [h, -h, h]], // -Y
        [[-h, -h, h], [h, -h, h], [h, h, h], [-h, h, h]],     // +Z
        [[h, -h, -h], [-h, -h, -h], [-h, h, -h], [h, h, -h]], // -Z
    ];

    let mut positions = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for corners in faces {
        let base = positions.len() as u32;
        positions.extend(corners.iter().map(|&[x, y, z]| Point3::new(x, y, z)));
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    GeometryBuffer::new(positions, indices)
}

/// UV sphere. The pole rows collapse to a point, so they emit one triangle per quad.
pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> GeometryBuffer {
    let columns = width_segments + 1;
    let mut positions = Vec::with_capacity((columns * (height_segments + 1)) as usize);

    for row in 0..=height_segments {
        let v = row as f32 / height_segments as f32;
        for column in 0..=width_segments {
            let u = column as f32 / width_segments as f32;
            positions.push(Point3::new(
                -radius * (u * TAU).cos() * (v * PI).sin(),
                radius * (v * PI).cos(),
                radius * (u * TAU).sin() * (v * PI).sin(),
            ));
        }
    }

    let mut indices = Vec::new();
    for row in 0..height_segments {
        for column in 0..width_segments {
            let a = row * columns + column + 1;
            let b = row * columns + column;
            let c = (row + 1) * columns + column;
            let d = (row + 1) * columns + column + 1;
            if row != 0 {
                indices.extend_from_slice(&[a, b, d]);
            }
            if row != height_segments - 1 {
                indices.extend_from_slice(&[b, c, d]);
            }
        }
    }

    GeometryBuffer::new(positions, indices)
}

/// Capped cylinder along the Y axis.
pub fn cylinder(radius: f32, height: f32, radial_segments: u32) -> GeometryBuffer {
    let half = height / 2.0;
    let columns = radial_segments + 1;
    let rim = |column: u32, y: f32| {
        let theta = column as f32 / radial_segments as f32 * TAU;
        Point3::new(radius * theta.sin(), y, radius * theta.cos())
    };

    let mut positions = Vec::new();
    let mut indices = Vec::new();

    // Side wall: a top row and a bottom row.
    for y in [half, -half] {
        positions.extend((0..=radial_segments).map(|column| rim(column, y)));
    }
    for column in 0..radial_segments {
        let a = column;
        let b = columns + column;
        let c = columns + column + 1;
        let d = column + 1;
        indices.extend_from_slice(&[a, b, d, b, c, d]);
    }

    // Caps get their own rim vertices so the wall normals stay horizontal.
    for (y, top) in [(half, true), (-half, false)] {
        let center = positions.len() as u32;
        positions.push(Point3::new(0.0, y, 0.0));
        let first = positions.len() as u32;
        positions.extend((0..=radial_segments).map(|column| rim(column, y)));
        for column in 0..radial_segments {
            let i = first + column;
            if top {
                indices.extend_from_slice(&[i, i + 1, center]);
            } else {
                indices.extend_from_slice(&[i + 1, i, center]);
            }
        }
    }

    GeometryBuffer::new(positions, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every normal of a convex shape centred on the origin points away from it.
    fn assert_outward(geometry: &GeometryBuffer) {
        for (position, normal) in geometry.positions.iter().zip(geometry.normals()) {
            if normal.norm() > 0.0 && position.coords.norm() > 1e-4 {
                assert!(
                    normal.dot(&position.coords) > 0.0,
                    "inward normal {normal:?} at {position:?}"
                );
            }
        }
    }

    #[test]
    fn test_cube_counts() {
        let cube = ShapeKind::Cube.build();
        assert_eq!(cube.position_count(), 24);
        assert_eq!(cube.triangle_count(), 12);
        assert!(cube.validate().is_ok());
        assert_outward(&cube);
    }

    #[test]
    fn test_sphere_counts() {
        let sphere = ShapeKind::Sphere.build();
        assert_eq!(sphere.position_count(), 33 * 33);
        assert_eq!(sphere.triangle_count(), 32 * 62);
        assert!(sphere.validate().is_ok());
        assert_outward(&sphere);
    }

    #[test]
    fn test_cylinder_counts() {
        let cylinder = ShapeKind::Cylinder.build();
        // wall rows + two caps (center + rim each)
        assert_eq!(cylinder.position_count(), 2 * 33 + 2 * 34);
        assert_eq!(cylinder.triangle_count(), 32 * 2 + 32 * 2);
        assert!(cylinder.validate().is_ok());
        assert_outward(&cylinder);
    }

    #[test]
    fn test_shapes_are_centered() {
        for kind in ShapeKind::ALL {
            let center = kind.build().bounding_box().unwrap().center();
            assert!(center.coords.norm() < 1e-5, "{kind} center {center:?}");
        }
    }

    #[test]
    fn test_parse_shape_kind() {
        assert_eq!("cube".parse::<ShapeKind>(), Ok(ShapeKind::Cube));
        assert_eq!("Sphere".parse::<ShapeKind>(), Ok(ShapeKind::Sphere));
        assert_eq!("cylinder".parse::<ShapeKind>(), Ok(ShapeKind::Cylinder));
        assert!("cone".parse::<ShapeKind>().is_err());
    }
}
