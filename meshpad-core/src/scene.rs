/// Scene graph: the meshes the editor owns
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::GeometryBuffer;
use crate::transform::Transform;

/// Handle to a mesh in a [`Scene`]. Ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeshId(u32);

impl MeshId {
    pub fn from_u32(id: u32) -> Self {
        Self(id)
    }

    pub fn to_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for MeshId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Surface appearance of a mesh
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Linear RGB in 0..=1
    pub color: [f32; 3],
}

impl Material {
    pub fn new(color: [f32; 3]) -> Self {
        Self { color }
    }
}

/// A mesh placed in the scene
#[derive(Debug, Clone)]
pub struct SceneMesh {
    pub id: MeshId,
    pub name: String,
    pub geometry: GeometryBuffer,
    pub material: Material,
    pub transform: Transform,
}

impl SceneMesh {
    /// Geometry with the transform baked into its positions.
    pub fn world_geometry(&self) -> GeometryBuffer {
        if self.transform.is_identity() {
            self.geometry.clone()
        } else {
            self.geometry.transformed(&self.transform.matrix())
        }
    }
}

/// What a renderer has to do to catch up with the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum SceneChange {
    /// Upload buffers for a new mesh
    Added(MeshId),
    /// Dispose every resource held for this mesh
    Removed(MeshId),
    /// Re-upload positions and normals
    GeometryChanged(MeshId),
    TransformChanged(MeshId),
    SelectionChanged(Option<MeshId>),
    /// Vertex markers were created, refreshed or disposed
    MarkersChanged,
}

/// Ordered collection of meshes, in insertion order
#[derive(Debug, Default)]
pub struct Scene {
    meshes: Vec<SceneMesh>,
    next_id: u32,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a mesh and return its new id.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        geometry: GeometryBuffer,
        material: Material,
    ) -> MeshId {
        self.insert(name.into(), geometry, material, Transform::identity())
    }

    fn insert(
        &mut self,
        name: String,
        geometry: GeometryBuffer,
        material: Material,
        transform: Transform,
    ) -> MeshId {
        let id = MeshId(self.next_id);
        self.next_id += 1;
        self.meshes.push(SceneMesh {
            id,
            name,
            geometry,
            material,
            transform,
        });
        id
    }

    pub fn remove(&mut self, id: MeshId) -> Option<SceneMesh> {
        let position = self.meshes.iter().position(|m| m.id == id)?;
        Some(self.meshes.remove(position))
    }

    /// Swap a mesh for a new one built on `geometry`.
    ///
    /// The old mesh is removed and the new one, carrying the old name,
    /// material and transform, is appended under a fresh id. Returns the
    /// new id and the removed mesh, or `None` if `old` is not in the scene.
    pub fn replace(&mut self, old: MeshId, geometry: GeometryBuffer) -> Option<(MeshId, SceneMesh)> {
        let removed = self.remove(old)?;
        let id = self.insert(
            removed.name.clone(),
            geometry,
            removed.material,
            removed.transform,
        );
        Some((id, removed))
    }

    pub fn get(&self, id: MeshId) -> Option<&SceneMesh> {
        self.meshes.iter().find(|m| m.id == id)
    }

    pub fn get_mut(&mut self, id: MeshId) -> Option<&mut SceneMesh> {
        self.meshes.iter_mut().find(|m| m.id == id)
    }

    pub fn contains(&self, id: MeshId) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SceneMesh> {
        self.meshes.iter()
    }

    pub fn ids(&self) -> Vec<MeshId> {
        self.meshes.iter().map(|m| m.id).collect()
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|m| m.geometry.triangle_count()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::ShapeKind;
    use nalgebra::Vector3;

    fn green() -> Material {
        Material::new([0.0, 1.0, 0.0])
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut scene = Scene::new();
        let a = scene.add("a", ShapeKind::Cube.build(), green());
        scene.remove(a);
        let b = scene.add("b", ShapeKind::Cube.build(), green());
        assert_ne!(a, b);
        assert!(!scene.contains(a));
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn test_replace_keeps_placement() {
        let mut scene = Scene::new();
        let old = scene.add("cube", ShapeKind::Cube.build(), green());
        scene.get_mut(old).unwrap().transform.translation = Vector3::new(1.0, 2.0, 3.0);

        let (new, removed) = scene.replace(old, ShapeKind::Sphere.build()).unwrap();
        assert_eq!(removed.id, old);
        assert!(!scene.contains(old));
        assert_eq!(scene.ids(), vec![new]);

        let mesh = scene.get(new).unwrap();
        assert_eq!(mesh.name, "cube");
        assert_eq!(mesh.transform.translation, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(mesh.geometry.triangle_count(), ShapeKind::Sphere.build().triangle_count());
    }

    #[test]
    fn test_replace_unknown_mesh() {
        let mut scene = Scene::new();
        assert!(scene.replace(MeshId::from_u32(9), ShapeKind::Cube.build()).is_none());
        assert!(scene.is_empty());
    }

    #[test]
    fn test_world_geometry_bakes_transform() {
        let mut scene = Scene::new();
        let id = scene.add("cube", ShapeKind::Cube.build(), green());
        let mesh = scene.get_mut(id).unwrap();
        mesh.transform.translation = Vector3::new(10.0, 0.0, 0.0);

        let center = mesh.world_geometry().bounding_box().unwrap().center();
        assert!((center.x - 10.0).abs() < 1e-5);
        assert_eq!(mesh.geometry.bounding_box().unwrap().center().x, 0.0);
    }

    #[test]
    fn test_scene_change_serializes_tagged() {
        let json = serde_json::to_string(&SceneChange::Added(MeshId::from_u32(3))).unwrap();
        assert_eq!(json, r#"{"type":"added","id":3}"#);
    }
}
