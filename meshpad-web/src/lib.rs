/// Meshpad Web - browser bindings for the editor core
///
/// The page owns the canvas, the renderer and the compile worker. This
/// module exposes the controller to JavaScript: the page forwards UI events
/// to a [`WebEditor`], drains scene changes to upload or dispose buffers,
/// and relays compile requests and responses to its worker.
use meshpad_core::compile::{CompileClient, RequestId, WorkerResponse};
use meshpad_core::{
    EditMode, Editor, EditorConfig, EditorError, GeometryBuffer, MeshId, ModeActivation,
    SceneMesh, ShapeKind, TransformMode,
};
use nalgebra::{Point3, Vector3};
use wasm_bindgen::prelude::*;

macro_rules! console_log {
    ($($t:tt)*) => (web_sys::console::log_1(&format_args!($($t)*).to_string().into()))
}

macro_rules! console_warn {
    ($($t:tt)*) => (web_sys::console::warn_1(&format_args!($($t)*).to_string().into()))
}

#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Report a failed operation on the console and hand it to the caller.
fn notify(err: impl std::fmt::Display) -> JsValue {
    let message = err.to_string();
    console_warn!("meshpad: {}", message);
    JsValue::from_str(&message)
}

fn editor_error(err: EditorError) -> JsValue {
    notify(err)
}

#[wasm_bindgen]
pub struct WebEditor {
    editor: Editor,
    compile: CompileClient,
}

#[wasm_bindgen]
impl WebEditor {
    /// Create an editor, optionally from a JSON config.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<WebEditor, JsValue> {
        let config = match config_json {
            Some(json) => EditorConfig::from_json_str(&json).map_err(notify)?,
            None => EditorConfig::default(),
        };
        let compile = CompileClient::new(config.compile);
        Ok(Self {
            editor: Editor::new(config),
            compile,
        })
    }

    pub fn mount(&mut self, width: f32, height: f32) {
        self.editor.mount(aspect(width, height));
        console_log!("meshpad mounted ({}x{})", width, height);
    }

    pub fn unmount(&mut self) {
        self.editor.unmount();
        console_log!("meshpad unmounted");
    }

    pub fn resize(&mut self, width: f32, height: f32) -> Result<(), JsValue> {
        self.editor.resize(aspect(width, height)).map_err(editor_error)
    }

    // ------------------------------------------------------------------
    // Toolbar
    // ------------------------------------------------------------------

    /// Add `"cube"`, `"sphere"` or `"cylinder"`; returns the new mesh id.
    pub fn add_shape(&mut self, kind: &str) -> Result<u32, JsValue> {
        let kind: ShapeKind = kind.parse().map_err(notify)?;
        let id = self.editor.add_shape(kind).map_err(editor_error)?;
        Ok(id.to_u32())
    }

    pub fn import_stl(&mut self, bytes: &[u8]) -> Result<u32, JsValue> {
        let id = self.editor.import_stl(bytes).map_err(editor_error)?;
        console_log!("imported {} bytes as mesh {}", bytes.len(), id);
        Ok(id.to_u32())
    }

    /// STL bytes for the whole scene; see [`WebEditor::export_file_name`].
    pub fn export_stl(&self) -> Result<js_sys::Uint8Array, JsValue> {
        let file = self.editor.export_stl().map_err(editor_error)?;
        Ok(js_sys::Uint8Array::from(&file.bytes[..]))
    }

    pub fn export_file_name(&self) -> String {
        self.editor.config().export.file_name.clone()
    }

    pub fn subdivide(&mut self) -> Result<u32, JsValue> {
        let id = self.editor.subdivide_selected().map_err(editor_error)?;
        Ok(id.to_u32())
    }

    // ------------------------------------------------------------------
    // Selection and modes
    // ------------------------------------------------------------------

    pub fn select(&mut self, id: u32) -> Result<(), JsValue> {
        self.editor
            .select(MeshId::from_u32(id))
            .map_err(editor_error)
    }

    pub fn deselect(&mut self) {
        self.editor.deselect();
    }

    pub fn selection(&self) -> Option<u32> {
        self.editor.selection().map(MeshId::to_u32)
    }

    /// Switch edit mode; returns what the mode switched on.
    pub fn set_edit_mode(&mut self, mode: &str) -> Result<String, JsValue> {
        let mode: EditMode = mode.parse().map_err(notify)?;
        let activation = self.editor.set_edit_mode(mode);
        if let ModeActivation::NotYetSupported(mode) = activation {
            console_warn!("{} editing is not supported yet", mode);
        }
        Ok(activation_label(activation).to_string())
    }

    pub fn edit_mode(&self) -> String {
        self.editor.edit_mode().to_string()
    }

    /// `"translate"` (or `"move"`), `"rotate"` or `"scale"`.
    pub fn set_transform_mode(&mut self, mode: &str) -> Result<(), JsValue> {
        let mode: TransformMode = mode.parse().map_err(notify)?;
        self.editor.set_transform_mode(mode);
        Ok(())
    }

    pub fn transform_mode(&self) -> String {
        self.editor.transform_mode().to_string()
    }

    pub fn drag_gizmo(&mut self, dx: f32, dy: f32, dz: f32) -> Result<(), JsValue> {
        self.editor
            .apply_gizmo_delta(Vector3::new(dx, dy, dz))
            .map_err(editor_error)
    }

    // ------------------------------------------------------------------
    // Vertex editing
    // ------------------------------------------------------------------

    pub fn move_vertex(&mut self, index: usize, x: f32, y: f32, z: f32) -> Result<(), JsValue> {
        self.editor
            .move_vertex(index, Point3::new(x, y, z))
            .map_err(editor_error)
    }

    pub fn commit_vertex_edits(&mut self) -> Result<u32, JsValue> {
        let id = self.editor.commit_vertex_edits().map_err(editor_error)?;
        Ok(id.to_u32())
    }

    /// Flat xyz marker positions of the vertex session, if one is active.
    pub fn marker_positions(&self) -> Option<Vec<f32>> {
        self.editor
            .vertex_session()
            .map(|s| flatten_points(&s.markers().points))
    }

    pub fn marker_size(&self) -> f32 {
        self.editor.config().markers.size
    }

    // ------------------------------------------------------------------
    // Renderer sync
    // ------------------------------------------------------------------

    /// Changes since the last call, as `{type, id}` objects.
    pub fn take_changes(&mut self) -> Result<JsValue, JsValue> {
        let changes = self.editor.take_changes();
        serde_wasm_bindgen::to_value(&changes).map_err(JsValue::from)
    }

    pub fn mesh_ids(&self) -> Vec<u32> {
        self.editor
            .scene()
            .map(|s| s.ids().into_iter().map(MeshId::to_u32).collect())
            .unwrap_or_default()
    }

    pub fn positions(&self, id: u32) -> Option<Vec<f32>> {
        self.mesh(id).map(|m| flatten_points(&m.geometry.positions))
    }

    pub fn indices(&self, id: u32) -> Option<Vec<u32>> {
        self.mesh(id).map(|m| m.geometry.indices.clone())
    }

    pub fn normals(&self, id: u32) -> Option<Vec<f32>> {
        self.mesh(id).map(|m| flatten_normals(&m.geometry))
    }

    /// Column-major 4x4 model matrix.
    pub fn model_matrix(&self, id: u32) -> Option<Vec<f32>> {
        self.mesh(id)
            .map(|m| m.transform.matrix().as_slice().to_vec())
    }

    pub fn material_color(&self, id: u32) -> Option<Vec<f32>> {
        self.mesh(id).map(|m| m.material.color.to_vec())
    }

    // ------------------------------------------------------------------
    // Compile worker relay
    // ------------------------------------------------------------------

    /// Message to post to the compile worker.
    pub fn compile_request(&mut self, code: &str) -> Result<JsValue, JsValue> {
        let request = self.compile.request(code).map_err(notify)?;
        serde_wasm_bindgen::to_value(&request).map_err(JsValue::from)
    }

    /// Resolve a worker message `{id, stl}` or `{id, error}`; inserts and
    /// selects the compiled mesh.
    ///
    /// `stl` may be an `ArrayBuffer`, a typed array or a plain array of bytes.
    pub fn compile_response(&mut self, message: JsValue) -> Result<u32, JsValue> {
        let response = read_response(&message)?;
        self.resolve(response)
    }

    pub fn compile_resolved(&mut self, id: u32, stl: &[u8]) -> Result<u32, JsValue> {
        self.resolve(WorkerResponse::Compiled {
            id: RequestId::from_u64(id.into()),
            stl: stl.to_vec(),
        })
    }

    pub fn compile_failed(&mut self, id: u32, error: String) -> Result<u32, JsValue> {
        self.resolve(WorkerResponse::Failed {
            id: RequestId::from_u64(id.into()),
            error,
        })
    }

    pub fn pending_compiles(&self) -> usize {
        self.compile.pending_count()
    }
}

impl WebEditor {
    fn mesh(&self, id: u32) -> Option<&SceneMesh> {
        self.editor.scene()?.get(MeshId::from_u32(id))
    }

    fn resolve(&mut self, response: WorkerResponse) -> Result<u32, JsValue> {
        let (request, result) = self.compile.complete(response);
        let id = self.editor.insert_compiled(result).map_err(editor_error)?;
        console_log!("compile {} added mesh {}", request, id);
        Ok(id.to_u32())
    }
}

/// Largest id a JS number carries exactly.
const MAX_SAFE_ID: f64 = 9_007_199_254_740_991.0;

fn read_response(message: &JsValue) -> Result<WorkerResponse, JsValue> {
    let field = |name: &str| js_sys::Reflect::get(message, &JsValue::from_str(name));
    let id = field("id")?.as_f64();
    let error = field("error")?.as_string();
    let stl = field("stl")?;
    let stl = if stl.is_undefined() || stl.is_null() {
        None
    } else {
        Some(js_sys::Uint8Array::new(&stl).to_vec())
    };
    response_from_parts(id, error, stl).map_err(notify)
}

/// Build a response from the fields of a worker message.
///
/// A message with a usable id always resolves its request, so a body with
/// neither `stl` nor `error` becomes a failure instead of leaving the id
/// pending.
fn response_from_parts(
    id: Option<f64>,
    error: Option<String>,
    stl: Option<Vec<u8>>,
) -> Result<WorkerResponse, String> {
    let id = match id {
        Some(id) if id >= 0.0 && id.fract() == 0.0 && id <= MAX_SAFE_ID => {
            RequestId::from_u64(id as u64)
        }
        _ => return Err("worker response has no valid id".to_string()),
    };
    Ok(match (error, stl) {
        (Some(error), _) => WorkerResponse::Failed { id, error },
        (None, Some(stl)) => WorkerResponse::Compiled { id, stl },
        (None, None) => WorkerResponse::Failed {
            id,
            error: "worker response carries neither stl nor error".to_string(),
        },
    })
}

fn aspect(width: f32, height: f32) -> f32 {
    if height > 0.0 {
        width / height
    } else {
        1.0
    }
}

fn activation_label(activation: ModeActivation) -> &'static str {
    match activation {
        ModeActivation::Gizmo(Some(_)) => "gizmo",
        ModeActivation::Gizmo(None) | ModeActivation::Idle => "idle",
        ModeActivation::VertexSession { .. } => "vertex-session",
        ModeActivation::NotYetSupported(_) => "not-yet-supported",
    }
}

fn flatten_points(points: &[Point3<f32>]) -> Vec<f32> {
    points.iter().flat_map(|p| [p.x, p.y, p.z]).collect()
}

fn flatten_normals(geometry: &GeometryBuffer) -> Vec<f32> {
    geometry.normals().iter().flat_map(|n| [n.x, n.y, n.z]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_points() {
        let points = [Point3::new(1.0, 2.0, 3.0), Point3::new(4.0, 5.0, 6.0)];
        assert_eq!(flatten_points(&points), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_flatten_normals_matches_positions() {
        let cube = ShapeKind::Cube.build();
        assert_eq!(flatten_normals(&cube).len(), cube.position_count() * 3);
    }

    #[test]
    fn test_activation_labels() {
        assert_eq!(activation_label(ModeActivation::Gizmo(None)), "idle");
        assert_eq!(
            activation_label(ModeActivation::NotYetSupported(EditMode::Edge)),
            "not-yet-supported"
        );
        assert_eq!(
            activation_label(ModeActivation::VertexSession {
                mesh: MeshId::from_u32(0),
                vertex_count: 3
            }),
            "vertex-session"
        );
    }

    #[test]
    fn test_response_from_parts() {
        let id = RequestId::from_u64(4);
        assert_eq!(
            response_from_parts(Some(4.0), None, Some(vec![1, 2, 3])),
            Ok(WorkerResponse::Compiled {
                id,
                stl: vec![1, 2, 3]
            })
        );
        assert_eq!(
            response_from_parts(Some(4.0), Some("syntax error".into()), None),
            Ok(WorkerResponse::Failed {
                id,
                error: "syntax error".into()
            })
        );
        assert!(matches!(
            response_from_parts(Some(4.0), None, None),
            Ok(WorkerResponse::Failed { .. })
        ));
        assert!(response_from_parts(None, None, Some(vec![])).is_err());
        assert!(response_from_parts(Some(-1.0), None, Some(vec![])).is_err());
        assert!(response_from_parts(Some(1.5), None, Some(vec![])).is_err());
    }

    #[test]
    fn test_compiled_bytes_resolve_pending_request() {
        let mut client = CompileClient::new(Default::default());
        let request = client.request("cube(2);").unwrap();
        let stl = meshpad_core::stl::encode(
            &[ShapeKind::Cube.build()],
            meshpad_core::stl::StlFormat::Binary,
        );
        let id = request.id().to_u64() as f64;

        let response = response_from_parts(Some(id), None, Some(stl)).unwrap();
        let (resolved, result) = client.complete(response);
        assert_eq!(resolved, request.id());
        assert_eq!(result.unwrap().triangle_count(), 12);
        assert_eq!(client.pending_count(), 0);
    }

    #[test]
    fn test_aspect_guards_zero_height() {
        assert_eq!(aspect(800.0, 400.0), 2.0);
        assert_eq!(aspect(800.0, 0.0), 1.0);
    }
}
