/// Geometry buffers: flat positions plus triangle indices
use nalgebra::{Matrix4, Point3, Vector3};

use crate::bounds::Aabb;
use crate::error::GeometryError;

/// A triangulated mesh stored as a position list and an index list.
///
/// Each consecutive index triple names one triangle. An empty index list
/// means the buffer is unindexed: positions are then read as consecutive
/// triples. Normals are per-vertex and always derived from positions and
/// indices; call [`GeometryBuffer::compute_vertex_normals`] after editing
/// positions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeometryBuffer {
    pub positions: Vec<Point3<f32>>,
    pub indices: Vec<u32>,
    normals: Vec<Vector3<f32>>,
    positions_dirty: bool,
}

impl GeometryBuffer {
    /// Build an indexed buffer and compute its normals.
    ///
    /// # Panics
    ///
    /// Panics if an index points past the end of `positions`. Use
    /// [`GeometryBuffer::try_new`] for untrusted input.
    pub fn new(positions: Vec<Point3<f32>>, indices: Vec<u32>) -> Self {
        let mut geometry = Self {
            positions,
            indices,
            normals: Vec::new(),
            positions_dirty: true,
        };
        geometry.compute_vertex_normals();
        geometry
    }

    /// Build an indexed buffer, rejecting indices that [`validate`](Self::validate) refuses.
    pub fn try_new(positions: Vec<Point3<f32>>, indices: Vec<u32>) -> Result<Self, GeometryError> {
        let mut geometry = Self {
            positions,
            indices,
            normals: Vec::new(),
            positions_dirty: true,
        };
        geometry.validate()?;
        geometry.compute_vertex_normals();
        Ok(geometry)
    }

    /// Build a buffer with no index list (triangle soup).
    pub fn unindexed(positions: Vec<Point3<f32>>) -> Self {
        Self::new(positions, Vec::new())
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn is_indexed(&self) -> bool {
        !self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        if self.is_indexed() {
            self.indices.len() / 3
        } else {
            self.positions.len() / 3
        }
    }

    pub fn is_empty(&self) -> bool {
        self.triangle_count() == 0
    }

    /// Iterate triangles as index triples, in buffer order.
    pub fn triangles(&self) -> Box<dyn Iterator<Item = [u32; 3]> + '_> {
        if self.is_indexed() {
            Box::new(self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]]))
        } else {
            let count = (self.positions.len() / 3) as u32;
            Box::new((0..count).map(|t| [t * 3, t * 3 + 1, t * 3 + 2]))
        }
    }

    /// Positions of one triangle's corners.
    pub fn triangle_positions(&self, triangle: [u32; 3]) -> [Point3<f32>; 3] {
        triangle.map(|i| self.positions[i as usize])
    }

    pub fn normals(&self) -> &[Vector3<f32>] {
        &self.normals
    }

    /// Check that the index list describes whole triangles over existing positions.
    pub fn validate(&self) -> Result<(), GeometryError> {
        if self.indices.len() % 3 != 0 {
            return Err(GeometryError::RaggedIndices(self.indices.len()));
        }
        let positions = self.positions.len();
        match self
            .indices
            .iter()
            .enumerate()
            .find(|(_, &index)| index as usize >= positions)
        {
            Some((slot, &index)) => Err(GeometryError::IndexOutOfRange {
                slot,
                index,
                positions,
            }),
            None => Ok(()),
        }
    }

    /// Recompute area-weighted per-vertex normals.
    pub fn compute_vertex_normals(&mut self) {
        let mut normals = vec![Vector3::zeros(); self.positions.len()];

        for triangle in self.triangles() {
            let [a, b, c] = self.triangle_positions(triangle);
            // Unnormalised, so larger faces weigh more.
            let face_normal = (c - b).cross(&(a - b));
            for index in triangle {
                normals[index as usize] += face_normal;
            }
        }

        for normal in &mut normals {
            *normal = normal.try_normalize(0.0).unwrap_or_else(Vector3::zeros);
        }
        self.normals = normals;
    }

    /// Flag positions as changed so renderers re-upload them.
    pub fn mark_positions_dirty(&mut self) {
        self.positions_dirty = true;
    }

    /// Return and clear the dirty flag.
    pub fn take_positions_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.positions_dirty, false)
    }

    pub fn bounding_box(&self) -> Option<Aabb> {
        Aabb::from_points(&self.positions)
    }

    /// Shift every position. Normals are unaffected by translation.
    pub fn translate(&mut self, offset: Vector3<f32>) {
        for position in &mut self.positions {
            *position += offset;
        }
        self.mark_positions_dirty();
    }

    /// Move the bounding-box center to the origin, returning the offset applied.
    pub fn center_on_origin(&mut self) -> Vector3<f32> {
        let offset = match self.bounding_box() {
            Some(bounds) => -bounds.center().coords,
            None => Vector3::zeros(),
        };
        self.translate(offset);
        offset
    }

    /// Copy of this buffer with positions baked through `matrix`.
    pub fn transformed(&self, matrix: &Matrix4<f32>) -> Self {
        let positions = self
            .positions
            .iter()
            .map(|p| matrix.transform_point(p))
            .collect();
        Self::new(positions, self.indices.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_try_new_rejects_bad_indices() {
        let positions = vec![Point3::origin(); 3];
        assert_eq!(
            GeometryBuffer::try_new(positions.clone(), vec![0, 1, 7]),
            Err(GeometryError::IndexOutOfRange {
                slot: 2,
                index: 7,
                positions: 3
            })
        );
        assert_eq!(
            GeometryBuffer::try_new(positions.clone(), vec![0, 1]),
            Err(GeometryError::RaggedIndices(2))
        );
        let ok = GeometryBuffer::try_new(positions, vec![0, 1, 2]).unwrap();
        assert_eq!(ok.normals().len(), 3);
    }

    #[test]
    #[should_panic]
    fn test_new_panics_on_out_of_range_index() {
        GeometryBuffer::new(vec![Point3::origin(); 3], vec![0, 1, 7]);
    }

    fn right_triangle() -> GeometryBuffer {
        GeometryBuffer::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![0, 1, 2],
        )
    }

    #[test]
    fn test_counts() {
        let geometry = right_triangle();
        assert_eq!(geometry.position_count(), 3);
        assert_eq!(geometry.triangle_count(), 1);
        assert!(geometry.is_indexed());
        assert!(!geometry.is_empty());
    }

    #[test]
    fn test_ccw_triangle_normal_points_up() {
        let geometry = right_triangle();
        for normal in geometry.normals() {
            assert_relative_eq!(*normal, Vector3::new(0.0, 0.0, 1.0));
        }
    }

    #[test]
    fn test_unindexed_reads_consecutive_triples() {
        let geometry = GeometryBuffer::unindexed(right_triangle().positions);
        assert!(!geometry.is_indexed());
        assert_eq!(geometry.triangles().collect::<Vec<_>>(), vec![[0, 1, 2]]);
        assert_relative_eq!(geometry.normals()[0], Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_unreferenced_vertex_has_zero_normal() {
        let mut geometry = right_triangle();
        geometry.positions.push(Point3::new(9.0, 9.0, 9.0));
        geometry.compute_vertex_normals();
        assert_eq!(geometry.normals()[3], Vector3::zeros());
    }

    #[test]
    fn test_validate() {
        assert!(right_triangle().validate().is_ok());

        let mut ragged = right_triangle();
        ragged.indices.push(0);
        assert_eq!(ragged.validate(), Err(GeometryError::RaggedIndices(4)));

        let mut out_of_range = right_triangle();
        out_of_range.indices[1] = 7;
        assert_eq!(
            out_of_range.validate(),
            Err(GeometryError::IndexOutOfRange {
                slot: 1,
                index: 7,
                positions: 3
            })
        );
    }

    #[test]
    fn test_center_on_origin() {
        let mut geometry = right_triangle();
        geometry.translate(Vector3::new(3.0, 3.0, 3.0));
        let offset = geometry.center_on_origin();
        assert_relative_eq!(offset, Vector3::new(-3.5, -3.5, -3.0));
        let center = geometry.bounding_box().unwrap().center();
        assert_relative_eq!(center, Point3::origin());
    }

    #[test]
    fn test_dirty_flag() {
        let mut geometry = right_triangle();
        assert!(geometry.take_positions_dirty());
        assert!(!geometry.take_positions_dirty());
        geometry.translate(Vector3::x());
        assert!(geometry.take_positions_dirty());
    }

    #[test]
    fn test_transformed_bakes_matrix() {
        let geometry = right_triangle();
        let moved = geometry.transformed(&Matrix4::new_translation(&Vector3::new(0.0, 0.0, 2.0)));
        assert_eq!(moved.positions[1], Point3::new(1.0, 0.0, 2.0));
        assert_eq!(moved.indices, geometry.indices);
        assert_eq!(geometry.positions[1], Point3::new(1.0, 0.0, 0.0));
    }
}
