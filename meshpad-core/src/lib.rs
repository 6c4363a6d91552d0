/// Meshpad Core Library - mesh editing model shared by every front-end
///
/// This library holds the stateful editing core: the geometry buffer,
/// midpoint subdivision, vertex editing, the scene and selection controller,
/// the STL codec and the CAD compile pipeline. Rendering is left to the
/// front-ends, which follow the controller through its change queue.

pub mod bounds;
pub mod compile;
pub mod config;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod gizmo;
pub mod primitives;
pub mod projection;
pub mod scene;
pub mod stl;
pub mod subdivide;
pub mod transform;
pub mod vertex_edit;

// Re-export commonly used types
pub use config::EditorConfig;
pub use editor::{EditMode, Editor, ExportedFile, ModeActivation};
pub use error::{CompileError, EditorError, GeometryError, StlError, SubdivideError};
pub use geometry::GeometryBuffer;
pub use primitives::ShapeKind;
pub use projection::{Camera, ProjectionMode};
pub use scene::{MeshId, Scene, SceneChange, SceneMesh};
pub use subdivide::{subdivide, subdivide_mesh, SubdivideParams, SubdivisionMethod};
pub use transform::{RotationState, Transform, TransformMode};
pub use vertex_edit::{EditableVertex, VertexEditSession};
