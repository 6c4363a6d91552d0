use approx::assert_relative_eq;
use meshpad_core::stl::{encode, StlFormat};
use meshpad_core::{EditMode, Editor, EditorConfig, GeometryBuffer, SceneChange, ShapeKind};
use nalgebra::{Point3, Vector3};

fn mounted() -> Editor {
    let mut editor = Editor::new(EditorConfig::default());
    editor.mount(16.0 / 9.0);
    editor
}

/// A unit cube moved so its bounding box is centred on (3, 3, 3).
fn offset_cube_stl(format: StlFormat) -> Vec<u8> {
    let mut cube = ShapeKind::Cube.build();
    cube.translate(Vector3::new(3.0, 3.0, 3.0));
    encode(&[cube], format)
}

#[test]
fn import_recenters_on_origin() {
    for format in [StlFormat::Ascii, StlFormat::Binary] {
        let mut editor = mounted();
        let id = editor.import_stl(&offset_cube_stl(format)).unwrap();

        let mesh = editor.scene().unwrap().get(id).unwrap();
        assert_eq!(mesh.geometry.triangle_count(), 12);
        let center = mesh.geometry.bounding_box().unwrap().center();
        assert_relative_eq!(center, Point3::origin(), epsilon = 1e-5);
        assert_eq!(editor.selection(), Some(id));
    }
}

#[test]
fn selection_replacement_after_import_and_subdivide() {
    let mut editor = mounted();
    let cube = editor.add_shape(ShapeKind::Cube).unwrap();
    let imported = editor.import_stl(&offset_cube_stl(StlFormat::Binary)).unwrap();
    assert_eq!(editor.selection(), Some(imported));

    let subdivided = editor.subdivide_selected().unwrap();
    let scene = editor.scene().unwrap();
    assert!(!scene.contains(imported));
    assert!(scene.contains(cube));
    assert_eq!(scene.len(), 2);
    assert_eq!(editor.selection(), Some(subdivided));

    let selected: Vec<_> = scene.ids().into_iter().filter(|id| Some(*id) == editor.selection()).collect();
    assert_eq!(selected, vec![subdivided]);
}

#[test]
fn imported_mesh_can_be_subdivided_twice() {
    let mut editor = mounted();
    editor.import_stl(&offset_cube_stl(StlFormat::Ascii)).unwrap();
    editor.subdivide_selected().unwrap();
    editor.subdivide_selected().unwrap();

    let geometry = &editor.selected_mesh().unwrap().geometry;
    assert_eq!(geometry.triangle_count(), 12 * 16);
    assert_eq!(geometry.position_count(), 6 * 48);
}

#[test]
fn vertex_edit_then_export_round_trips() {
    let mut editor = mounted();
    editor.add_shape(ShapeKind::Cube).unwrap();
    editor.set_edit_mode(EditMode::Vertex);
    editor.move_vertex(0, Point3::new(-2.0, -2.0, 2.0)).unwrap();
    editor.commit_vertex_edits().unwrap();

    let file = editor.export_stl().unwrap();
    let reloaded = meshpad_core::stl::decode(&file.bytes).unwrap();
    assert_eq!(reloaded.triangle_count(), 12);
    let bounds = reloaded.bounding_box().unwrap();
    assert_relative_eq!(bounds.min, Point3::new(-2.0, -2.0, -0.5), epsilon = 1e-5);
}

#[test]
fn renderer_sees_every_disposal() {
    let mut editor = mounted();
    let first = editor.add_shape(ShapeKind::Sphere).unwrap();
    editor.set_edit_mode(EditMode::Vertex);
    let second = editor.subdivide_selected().unwrap();
    let changes = editor.take_changes();

    assert!(changes.contains(&SceneChange::Removed(first)));
    assert!(changes.contains(&SceneChange::Added(second)));
    // markers created for the sphere, disposed, then created for its replacement
    let marker_events = changes.iter().filter(|c| **c == SceneChange::MarkersChanged).count();
    assert_eq!(marker_events, 3);

    let plain = GeometryBuffer::unindexed(Vec::new());
    assert!(editor.insert_geometry(plain, "empty").is_ok());
    assert!(editor.vertex_session().is_some());
}
