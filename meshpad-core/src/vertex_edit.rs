/// Per-vertex editing of a mesh's geometry
///
/// [`extract`] copies a buffer's positions into [`EditableVertex`] values,
/// edits happen on those copies, and [`commit`] writes them back by index
/// and recomputes normals. A [`VertexEditSession`] ties one extracted list
/// to the mesh it came from; it is rebuilt from scratch whenever the
/// selection changes.
use nalgebra::Point3;
use tracing::debug;

use crate::config::MarkerConfig;
use crate::geometry::GeometryBuffer;
use crate::scene::MeshId;

/// A detached copy of one vertex position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditableVertex {
    pub position: Point3<f32>,
    /// Slot in the owning buffer's position list
    pub index: u32,
}

/// One editable vertex per position, in buffer order.
pub fn extract(geometry: &GeometryBuffer) -> Vec<EditableVertex> {
    geometry
        .positions
        .iter()
        .enumerate()
        .map(|(index, &position)| EditableVertex {
            position,
            index: index as u32,
        })
        .collect()
}

/// Write edited positions back, then recompute normals.
///
/// Edits apply in order, so a repeated index keeps the last position.
///
/// # Panics
///
/// Panics if an edit's index is out of range for the buffer.
pub fn commit(geometry: &mut GeometryBuffer, edits: &[EditableVertex]) {
    for edit in edits {
        geometry.positions[edit.index as usize] = edit.position;
    }
    geometry.mark_positions_dirty();
    geometry.compute_vertex_normals();
}

/// Point markers drawn over each editable vertex.
///
/// Purely visual; a session works the same whether or not a front-end
/// draws them.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexMarkers {
    pub points: Vec<Point3<f32>>,
    pub size: f32,
    pub color: [f32; 3],
}

impl VertexMarkers {
    fn from_vertices(vertices: &[EditableVertex], style: &MarkerConfig) -> Self {
        Self {
            points: vertices.iter().map(|v| v.position).collect(),
            size: style.size,
            color: style.color,
        }
    }
}

/// The editable vertex list for the selected mesh.
#[derive(Debug, Clone)]
pub struct VertexEditSession {
    mesh: MeshId,
    vertices: Vec<EditableVertex>,
    markers: VertexMarkers,
    pending: bool,
}

impl VertexEditSession {
    /// Extract `geometry`'s vertices for editing.
    pub fn begin(mesh: MeshId, geometry: &GeometryBuffer, style: &MarkerConfig) -> Self {
        let vertices = extract(geometry);
        let markers = VertexMarkers::from_vertices(&vertices, style);
        debug!(%mesh, vertices = vertices.len(), "vertex edit session started");
        Self {
            mesh,
            vertices,
            markers,
            pending: false,
        }
    }

    pub fn mesh(&self) -> MeshId {
        self.mesh
    }

    pub fn vertices(&self) -> &[EditableVertex] {
        &self.vertices
    }

    pub fn vertex(&self, index: usize) -> Option<&EditableVertex> {
        self.vertices.get(index)
    }

    pub fn markers(&self) -> &VertexMarkers {
        &self.markers
    }

    /// Whether there are moves not yet committed.
    pub fn has_pending_edits(&self) -> bool {
        self.pending
    }

    /// Move one vertex of the session copy. Returns false if `index` is out of range.
    pub fn move_vertex(&mut self, index: usize, position: Point3<f32>) -> bool {
        match self.vertices.get_mut(index) {
            Some(vertex) => {
                vertex.position = position;
                self.markers.points[index] = position;
                self.pending = true;
                true
            }
            None => false,
        }
    }

    /// Write every session vertex into `geometry`.
    pub fn commit(&mut self, geometry: &mut GeometryBuffer) {
        commit(geometry, &self.vertices);
        self.pending = false;
        debug!(mesh = %self.mesh, vertices = self.vertices.len(), "vertex edits committed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer() -> GeometryBuffer {
        GeometryBuffer::new(
            vec![
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(0.0, 0.0, 0.0),
            ],
            vec![0, 1, 2],
        )
    }

    #[test]
    fn test_extract_preserves_order_and_index() {
        let vertices = extract(&buffer());
        assert_eq!(vertices.len(), 3);
        for (i, vertex) in vertices.iter().enumerate() {
            assert_eq!(vertex.index as usize, i);
            assert_eq!(vertex.position, buffer().positions[i]);
        }
    }

    #[test]
    fn test_last_write_wins() {
        let mut geometry = buffer();
        commit(
            &mut geometry,
            &[
                EditableVertex {
                    position: Point3::new(1.0, 1.0, 1.0),
                    index: 0,
                },
                EditableVertex {
                    position: Point3::new(2.0, 2.0, 2.0),
                    index: 0,
                },
            ],
        );
        assert_eq!(geometry.positions[0], Point3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn test_commit_marks_dirty() {
        let mut geometry = buffer();
        geometry.take_positions_dirty();
        commit(&mut geometry, &[]);
        assert!(geometry.take_positions_dirty());
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_edit_panics() {
        let mut geometry = buffer();
        commit(
            &mut geometry,
            &[EditableVertex {
                position: Point3::origin(),
                index: 99,
            }],
        );
    }

    #[test]
    fn test_session_moves_copy_until_commit() {
        let mut geometry = buffer();
        let mut session =
            VertexEditSession::begin(MeshId::from_u32(0), &geometry, &MarkerConfig::default());
        assert_eq!(session.markers().points.len(), 3);
        assert_eq!(session.markers().size, 0.05);

        assert!(session.move_vertex(1, Point3::new(0.0, 3.0, 0.0)));
        assert!(!session.move_vertex(3, Point3::origin()));
        assert!(session.has_pending_edits());
        assert_eq!(session.markers().points[1], Point3::new(0.0, 3.0, 0.0));
        assert_eq!(geometry.positions[1], Point3::new(0.0, 1.0, 0.0));

        session.commit(&mut geometry);
        assert!(!session.has_pending_edits());
        assert_eq!(geometry.positions[1], Point3::new(0.0, 3.0, 0.0));
    }
}
