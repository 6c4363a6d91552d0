use meshpad_core::vertex_edit::{commit, extract, EditableVertex};
use meshpad_core::GeometryBuffer;
use nalgebra::Point3;

fn tetrahedron() -> GeometryBuffer {
    GeometryBuffer::new(
        vec![
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ],
        vec![0, 1, 2, 0, 3, 1, 1, 3, 2, 2, 3, 0],
    )
}

#[test]
fn commit_without_edits_is_bit_identical() {
    let mut geometry = tetrahedron();
    let before: Vec<[u32; 3]> = geometry
        .positions
        .iter()
        .map(|p| [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()])
        .collect();

    let vertices = extract(&geometry);
    commit(&mut geometry, &vertices);

    let after: Vec<[u32; 3]> = geometry
        .positions
        .iter()
        .map(|p| [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()])
        .collect();
    assert_eq!(before, after);
}

#[test]
fn single_edit_propagates_and_recomputes_normals() {
    let mut geometry = tetrahedron();
    let positions_before = geometry.positions.clone();
    let normals_before = geometry.normals().to_vec();
    assert_eq!(geometry.positions[2], Point3::new(0.0, 0.0, 0.0));

    commit(
        &mut geometry,
        &[EditableVertex {
            position: Point3::new(5.0, 5.0, 5.0),
            index: 2,
        }],
    );

    assert_eq!(geometry.positions[2], Point3::new(5.0, 5.0, 5.0));
    for (i, (after, before)) in geometry.positions.iter().zip(&positions_before).enumerate() {
        if i != 2 {
            assert_eq!(after, before);
        }
    }
    assert_ne!(geometry.normals(), &normals_before[..]);
    assert!(geometry.take_positions_dirty());
}
