/// Error types shared across the editor core
use thiserror::Error;

use crate::editor::EditMode;
use crate::scene::MeshId;

/// Violations of the geometry buffer invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// The index list does not describe whole triangles.
    #[error("index count {0} is not a multiple of 3")]
    RaggedIndices(usize),

    /// An index points past the end of the position list.
    #[error("index {index} at slot {slot} is out of range for {positions} positions")]
    IndexOutOfRange {
        slot: usize,
        index: u32,
        positions: usize,
    },
}

/// Failures while decoding STL data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StlError {
    /// Fewer bytes than a binary header plus triangle count.
    #[error("file too small to be a valid STL ({0} bytes)")]
    TooSmall(usize),

    /// The binary body ended before the declared triangle count.
    #[error("binary STL declares {declared} triangles but only {available} are present")]
    Truncated { declared: usize, available: usize },

    /// The text looked like ASCII STL but did not parse.
    #[error("failed to parse ASCII STL: {0}")]
    Ascii(String),
}

/// Failures from the subdivision engine's checked entry point.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubdivideError {
    #[error("invalid iteration count: {0} (must be >= 1)")]
    InvalidIterations(u32),

    #[error("subdivision would exceed maximum mesh size ({current} -> {projected} triangles, max {max})")]
    MeshTooLarge {
        current: usize,
        projected: usize,
        max: usize,
    },

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Failures of the CAD compile pipeline.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The compiler ran and rejected the code.
    #[error("compile failed: {0}")]
    Compiler(String),

    /// Single-flight policy: a request is already in flight.
    #[error("compile request {pending} is still pending")]
    Busy { pending: u64 },

    /// A response arrived for an id nobody is waiting on.
    #[error("no pending compile request with id {0}")]
    UnknownRequest(u64),

    /// The worker thread is gone.
    #[error("compile worker is not running")]
    WorkerGone,

    /// The compiler produced bytes that are not a usable STL.
    #[error("compiler output is not valid STL: {0}")]
    Output(#[from] StlError),

    #[error("I/O error while running the compiler: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures loading an editor configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
}

/// Editor operation failures. None of these are fatal; front-ends show
/// them as notifications and carry on with the current scene.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("editor is not mounted")]
    NotMounted,

    #[error("no mesh is selected")]
    NothingSelected,

    #[error("mesh {0} is not in the scene")]
    UnknownMesh(MeshId),

    #[error("imported file contains no triangles")]
    EmptyImport,

    #[error("mesh {0} has no index list to subdivide")]
    NotIndexed(MeshId),

    #[error("operation requires {expected} mode, editor is in {actual} mode")]
    WrongMode { expected: EditMode, actual: EditMode },

    #[error("no vertex edit session is active")]
    NoVertexSession,

    #[error("vertex {index} is out of range for {count} editable vertices")]
    VertexOutOfRange { index: usize, count: usize },

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Stl(#[from] StlError),

    #[error(transparent)]
    Subdivide(#[from] SubdivideError),

    #[error(transparent)]
    Compile(#[from] CompileError),
}
