/// Editor configuration
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::compile::CompilePolicy;
use crate::error::ConfigError;
use crate::stl::StlFormat;
use crate::subdivide::SubdivideParams;

/// Default material color for new meshes (0x00ff00)
pub const DEFAULT_MATERIAL_COLOR: [f32; 3] = [0.0, 1.0, 0.0];

/// Default vertex marker color (0xff0000)
pub const DEFAULT_MARKER_COLOR: [f32; 3] = [1.0, 0.0, 0.0];

/// Default export file name
pub const DEFAULT_EXPORT_FILE_NAME: &str = "model.stl";

/// Settings for one editor instance.
///
/// Every field has a default, so a config file only needs the values it
/// changes:
///
/// ```
/// use meshpad_core::EditorConfig;
///
/// let config = EditorConfig::from_json_str(r#"{ "export": { "format": "binary" } }"#)?;
/// assert_eq!(config.export.file_name, "model.stl");
/// # Ok::<(), meshpad_core::error::ConfigError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Color given to added, imported and compiled meshes
    pub material_color: [f32; 3],
    pub camera: CameraConfig,
    pub markers: MarkerConfig,
    pub export: ExportConfig,
    pub subdivision: SubdivideParams,
    pub compile: CompilePolicy,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            material_color: DEFAULT_MATERIAL_COLOR,
            camera: CameraConfig::default(),
            markers: MarkerConfig::default(),
            export: ExportConfig::default(),
            subdivision: SubdivideParams::default(),
            compile: CompilePolicy::default(),
        }
    }
}

impl EditorConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Distance from the origin along +Z
    pub distance: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            distance: 5.0,
        }
    }
}

/// Look of the per-vertex markers shown in vertex mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    pub size: f32,
    pub color: [f32; 3],
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            size: 0.05,
            color: DEFAULT_MARKER_COLOR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub file_name: String,
    pub format: StlFormat,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            file_name: DEFAULT_EXPORT_FILE_NAME.to_string(),
            format: StlFormat::Ascii,
        }
    }
}
