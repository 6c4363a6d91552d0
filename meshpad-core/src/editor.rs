/// The editor controller
///
/// [`Editor`] is the single owner of all mutable editing state: the mounted
/// scene and camera, the selection, the edit mode and transform sub-mode,
/// the gizmo binding and the vertex edit session. Front-ends call its
/// operations in response to user input and drain [`SceneChange`]s with
/// [`Editor::take_changes`] to keep their renderer in step.
///
/// Each operation runs to completion before returning, so a renderer that
/// reads the editor between calls never sees a half-replaced mesh or a
/// selection pointing at a removed one.
use std::fmt;
use std::str::FromStr;

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::EditorConfig;
use crate::error::{CompileError, EditorError};
use crate::geometry::GeometryBuffer;
use crate::gizmo::GizmoState;
use crate::primitives::ShapeKind;
use crate::projection::Camera;
use crate::scene::{Material, MeshId, Scene, SceneChange, SceneMesh};
use crate::stl;
use crate::subdivide::subdivide_mesh;
use crate::transform::TransformMode;
use crate::vertex_edit::VertexEditSession;

/// Top-level editing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditMode {
    #[default]
    Transform,
    Vertex,
    /// Declared, no behavior attached yet.
    Face,
    /// Declared, no behavior attached yet.
    Edge,
}

impl EditMode {
    pub const ALL: [EditMode; 4] = [
        EditMode::Transform,
        EditMode::Vertex,
        EditMode::Face,
        EditMode::Edge,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EditMode::Transform => "transform",
            EditMode::Vertex => "vertex",
            EditMode::Face => "face",
            EditMode::Edge => "edge",
        }
    }

    /// Next mode in selector order, wrapping around.
    pub fn next(self) -> Self {
        match self {
            EditMode::Transform => EditMode::Vertex,
            EditMode::Vertex => EditMode::Face,
            EditMode::Face => EditMode::Edge,
            EditMode::Edge => EditMode::Transform,
        }
    }
}

impl fmt::Display for EditMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EditMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "transform" => Ok(EditMode::Transform),
            "vertex" => Ok(EditMode::Vertex),
            "face" => Ok(EditMode::Face),
            "edge" => Ok(EditMode::Edge),
            other => Err(format!("unknown edit mode: {other}")),
        }
    }
}

/// What entering an edit mode switched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeActivation {
    /// Transform mode; the gizmo is bound to this mesh, if any is selected.
    Gizmo(Option<MeshId>),
    /// Vertex mode with a fresh session over the selected mesh.
    VertexSession { mesh: MeshId, vertex_count: usize },
    /// Vertex mode with nothing selected.
    Idle,
    NotYetSupported(EditMode),
}

/// Scene and camera, alive between mount and unmount.
#[derive(Debug)]
pub struct SceneState {
    pub scene: Scene,
    pub camera: Camera,
}

/// Serialized scene ready to hand to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

pub struct Editor {
    config: EditorConfig,
    state: Option<SceneState>,
    selection: Option<MeshId>,
    edit_mode: EditMode,
    gizmo: GizmoState,
    vertex_session: Option<VertexEditSession>,
    changes: Vec<SceneChange>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            config,
            state: None,
            selection: None,
            edit_mode: EditMode::default(),
            gizmo: GizmoState::default(),
            vertex_session: None,
            changes: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Create the scene and camera. Mounting twice only updates the aspect.
    pub fn mount(&mut self, aspect: f32) {
        if let Some(state) = &mut self.state {
            state.camera.set_aspect(aspect);
            debug!(aspect, "editor already mounted");
            return;
        }
        self.state = Some(SceneState {
            scene: Scene::new(),
            camera: Camera::new(aspect, &self.config.camera),
        });
        info!(aspect, "editor mounted");
    }

    /// Tear down the scene, releasing every mesh, marker and gizmo binding.
    pub fn unmount(&mut self) {
        let Some(state) = self.state.take() else {
            return;
        };
        self.end_mode();
        if self.selection.take().is_some() {
            self.changes.push(SceneChange::SelectionChanged(None));
        }
        self.changes
            .extend(state.scene.ids().into_iter().map(SceneChange::Removed));
        info!(meshes = state.scene.len(), "editor unmounted");
    }

    pub fn is_mounted(&self) -> bool {
        self.state.is_some()
    }

    /// Viewport resize handler.
    pub fn resize(&mut self, aspect: f32) -> Result<(), EditorError> {
        self.state_mut()?.camera.set_aspect(aspect);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.state.as_ref().map(|s| &s.scene)
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.state.as_ref().map(|s| &s.camera)
    }

    pub fn camera_mut(&mut self) -> Option<&mut Camera> {
        self.state.as_mut().map(|s| &mut s.camera)
    }

    pub fn selection(&self) -> Option<MeshId> {
        self.selection
    }

    pub fn selected_mesh(&self) -> Option<&SceneMesh> {
        self.scene()?.get(self.selection?)
    }

    pub fn edit_mode(&self) -> EditMode {
        self.edit_mode
    }

    pub fn transform_mode(&self) -> TransformMode {
        self.gizmo.mode
    }

    pub fn gizmo(&self) -> &GizmoState {
        &self.gizmo
    }

    pub fn vertex_session(&self) -> Option<&VertexEditSession> {
        self.vertex_session.as_ref()
    }

    /// Drain the changes queued since the last call.
    pub fn take_changes(&mut self) -> Vec<SceneChange> {
        std::mem::take(&mut self.changes)
    }

    // ------------------------------------------------------------------
    // Meshes
    // ------------------------------------------------------------------

    /// Insert a primitive and select it.
    pub fn add_shape(&mut self, kind: ShapeKind) -> Result<MeshId, EditorError> {
        self.insert_geometry(kind.build(), kind.as_str())
    }

    /// Decode STL bytes, recenter the result on the origin, insert and select it.
    pub fn import_stl(&mut self, data: &[u8]) -> Result<MeshId, EditorError> {
        self.state()?;
        let mut geometry = stl::decode(data)?;
        if geometry.triangle_count() == 0 {
            return Err(EditorError::EmptyImport);
        }
        let offset = geometry.center_on_origin();
        info!(
            triangles = geometry.triangle_count(),
            offset = ?offset,
            "imported STL"
        );
        self.insert_geometry(geometry, "imported")
    }

    /// Insert the outcome of a compile request.
    pub fn insert_compiled(
        &mut self,
        result: Result<GeometryBuffer, CompileError>,
    ) -> Result<MeshId, EditorError> {
        let geometry = result?;
        if geometry.triangle_count() == 0 {
            return Err(EditorError::EmptyImport);
        }
        self.insert_geometry(geometry, "compiled")
    }

    /// Insert `geometry` with the default material and select it.
    ///
    /// Buffers whose indices fail [`GeometryBuffer::validate`] are refused.
    pub fn insert_geometry(
        &mut self,
        geometry: GeometryBuffer,
        name: &str,
    ) -> Result<MeshId, EditorError> {
        let material = Material::new(self.config.material_color);
        let state = self.state_mut()?;
        geometry.validate()?;
        let id = state.scene.add(name, geometry, material);
        info!(mesh = %id, name, "mesh added");
        self.changes.push(SceneChange::Added(id));
        self.set_selection(Some(id));
        Ok(id)
    }

    /// Serialize every mesh in the scene, transforms baked in.
    ///
    /// Needs a selection, although the file covers the whole scene.
    pub fn export_stl(&self) -> Result<ExportedFile, EditorError> {
        let scene = &self.state()?.scene;
        if self.selection.is_none() {
            return Err(EditorError::NothingSelected);
        }
        let geometries: Vec<GeometryBuffer> = scene.iter().map(SceneMesh::world_geometry).collect();
        let bytes = stl::encode(&geometries, self.config.export.format);
        info!(
            meshes = geometries.len(),
            bytes = bytes.len(),
            format = ?self.config.export.format,
            "scene exported"
        );
        Ok(ExportedFile {
            file_name: self.config.export.file_name.clone(),
            bytes,
        })
    }

    // ------------------------------------------------------------------
    // Selection and modes
    // ------------------------------------------------------------------

    /// Select `mesh`, implicitly deselecting the previous one.
    pub fn select(&mut self, mesh: MeshId) -> Result<(), EditorError> {
        if !self.state()?.scene.contains(mesh) {
            return Err(EditorError::UnknownMesh(mesh));
        }
        self.set_selection(Some(mesh));
        Ok(())
    }

    pub fn deselect(&mut self) {
        self.set_selection(None);
    }

    /// Switch edit mode. Every transition is allowed.
    pub fn set_edit_mode(&mut self, mode: EditMode) -> ModeActivation {
        self.end_mode();
        debug!(from = %self.edit_mode, to = %mode, "edit mode changed");
        self.edit_mode = mode;
        self.begin_mode()
    }

    pub fn set_transform_mode(&mut self, mode: TransformMode) {
        debug!(%mode, "transform mode changed");
        self.gizmo.set_mode(mode);
    }

    /// Apply one gizmo drag step to the attached mesh.
    pub fn apply_gizmo_delta(&mut self, delta: Vector3<f32>) -> Result<(), EditorError> {
        self.require_mode(EditMode::Transform)?;
        let target = self.gizmo.target().ok_or(EditorError::NothingSelected)?;
        let gizmo = self.gizmo;
        let mesh = self
            .state_mut()?
            .scene
            .get_mut(target)
            .ok_or(EditorError::UnknownMesh(target))?;
        gizmo.apply(&mut mesh.transform, delta);
        self.changes.push(SceneChange::TransformChanged(target));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Vertex editing
    // ------------------------------------------------------------------

    /// Move one vertex of the session copy. The mesh is unchanged until commit.
    pub fn move_vertex(&mut self, index: usize, position: Point3<f32>) -> Result<(), EditorError> {
        self.require_mode(EditMode::Vertex)?;
        let session = self
            .vertex_session
            .as_mut()
            .ok_or(EditorError::NoVertexSession)?;
        if !session.move_vertex(index, position) {
            return Err(EditorError::VertexOutOfRange {
                index,
                count: session.vertices().len(),
            });
        }
        self.changes.push(SceneChange::MarkersChanged);
        Ok(())
    }

    /// Write the session's vertices into the selected mesh.
    pub fn commit_vertex_edits(&mut self) -> Result<MeshId, EditorError> {
        self.require_mode(EditMode::Vertex)?;
        let Some(session) = self.vertex_session.as_mut() else {
            return Err(EditorError::NoVertexSession);
        };
        let id = session.mesh();
        let state = self.state.as_mut().ok_or(EditorError::NotMounted)?;
        let mesh = state
            .scene
            .get_mut(id)
            .ok_or(EditorError::UnknownMesh(id))?;
        session.commit(&mut mesh.geometry);
        info!(mesh = %id, vertices = session.vertices().len(), "vertex edits committed");
        self.changes.push(SceneChange::GeometryChanged(id));
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Subdivision
    // ------------------------------------------------------------------

    /// Subdivide the selected mesh and swap it for the result.
    ///
    /// The old mesh is removed, the new one inserted with the same name,
    /// material and transform, and the selection moves to it. The active
    /// mode is re-entered for the new mesh.
    pub fn subdivide_selected(&mut self) -> Result<MeshId, EditorError> {
        let old = self.selection.ok_or(EditorError::NothingSelected)?;
        let params = self.config.subdivision.clone();
        let state = self.state.as_ref().ok_or(EditorError::NotMounted)?;
        let mesh = state.scene.get(old).ok_or(EditorError::UnknownMesh(old))?;
        if !mesh.geometry.is_indexed() {
            return Err(EditorError::NotIndexed(old));
        }
        let result = subdivide_mesh(&mesh.geometry, &params)?;

        self.end_mode();
        let state = self.state_mut()?;
        let (new, _removed) = state
            .scene
            .replace(old, result.geometry)
            .ok_or(EditorError::UnknownMesh(old))?;
        self.changes.push(SceneChange::Removed(old));
        self.changes.push(SceneChange::Added(new));
        self.selection = Some(new);
        self.changes.push(SceneChange::SelectionChanged(Some(new)));
        self.begin_mode();

        info!(
            old = %old,
            new = %new,
            triangles_before = result.original_triangles,
            triangles_after = result.final_triangles,
            positions_after = result.final_positions,
            "mesh subdivided"
        );
        Ok(new)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn state(&self) -> Result<&SceneState, EditorError> {
        self.state.as_ref().ok_or(EditorError::NotMounted)
    }

    fn state_mut(&mut self) -> Result<&mut SceneState, EditorError> {
        self.state.as_mut().ok_or(EditorError::NotMounted)
    }

    fn require_mode(&self, expected: EditMode) -> Result<(), EditorError> {
        if self.edit_mode == expected {
            Ok(())
        } else {
            Err(EditorError::WrongMode {
                expected,
                actual: self.edit_mode,
            })
        }
    }

    fn set_selection(&mut self, selection: Option<MeshId>) {
        if self.selection == selection {
            return;
        }
        self.end_mode();
        self.selection = selection;
        debug!(selection = ?selection.map(MeshId::to_u32), "selection changed");
        self.changes.push(SceneChange::SelectionChanged(selection));
        self.begin_mode();
    }

    /// Release whatever the current mode holds on the selection.
    fn end_mode(&mut self) {
        self.gizmo.detach();
        if self.vertex_session.take().is_some() {
            self.changes.push(SceneChange::MarkersChanged);
        }
    }

    /// Bind the current mode to the current selection.
    fn begin_mode(&mut self) -> ModeActivation {
        match self.edit_mode {
            EditMode::Transform => {
                if let Some(id) = self.selection {
                    self.gizmo.attach(id);
                }
                ModeActivation::Gizmo(self.selection)
            }
            EditMode::Vertex => {
                let mesh = self
                    .selection
                    .and_then(|id| self.state.as_ref()?.scene.get(id));
                let Some(mesh) = mesh else {
                    return ModeActivation::Idle;
                };
                let session = VertexEditSession::begin(mesh.id, &mesh.geometry, &self.config.markers);
                let activation = ModeActivation::VertexSession {
                    mesh: mesh.id,
                    vertex_count: session.vertices().len(),
                };
                self.vertex_session = Some(session);
                self.changes.push(SceneChange::MarkersChanged);
                activation
            }
            mode @ (EditMode::Face | EditMode::Edge) => {
                debug!(%mode, "edit mode not yet supported");
                ModeActivation::NotYetSupported(mode)
            }
        }
    }
}
