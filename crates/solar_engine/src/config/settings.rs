//! # Application settings
//!
//! All settings structs are serde-enabled and tolerate partial files: every
//! field missing from a file takes its default.
//!
//! ## Categories
//!
//! - **Engine**: logging
//! - **Window**: title, size, windowing backend
//! - **Renderer**: Vulkan application name and validation layers
//! - **Shaders**: compiled SPIR-V locations
//! - **Camera**: starting pose, projection and control speeds

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{Config, ConfigError};
use crate::render::window::BackendKind;

/// Shader file locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    /// Compiled vertex shader
    pub vertex_shader_path: String,
    /// Compiled fragment shader
    pub fragment_shader_path: String,
    /// Optional compiled geometry shader
    pub geometry_shader_path: Option<String>,
}

impl ShaderConfig {
    /// Use the given paths verbatim
    pub fn new(vertex_path: impl Into<String>, fragment_path: impl Into<String>) -> Self {
        Self {
            vertex_shader_path: vertex_path.into(),
            fragment_shader_path: fragment_path.into(),
            geometry_shader_path: None,
        }
    }

    /// Search the usual output directories for the given shader file names
    pub fn with_path_resolution(base_vertex: &str, base_fragment: &str) -> Self {
        let shader_dirs = [
            "target/shaders/",
            "shaders/",
            "resources/shaders/",
            "../target/shaders/",
            "./",
        ];

        let find = |name: &str| {
            shader_dirs
                .iter()
                .map(|dir| format!("{}{}", dir, name))
                .find(|candidate| Path::new(candidate).exists())
                .unwrap_or_else(|| format!("target/shaders/{}", name))
        };

        Self::new(find(base_vertex), find(base_fragment))
    }

    /// Add a geometry stage
    pub fn with_geometry_shader(mut self, path: impl Into<String>) -> Self {
        self.geometry_shader_path = Some(path.into());
        self
    }

    /// Check that the configured files exist
    pub fn validate(&self) -> Result<(), String> {
        if !Path::new(&self.vertex_shader_path).exists() {
            return Err(format!("Vertex shader not found: {}", self.vertex_shader_path));
        }
        if !Path::new(&self.fragment_shader_path).exists() {
            return Err(format!("Fragment shader not found: {}", self.fragment_shader_path));
        }
        if let Some(geometry) = &self.geometry_shader_path {
            if !Path::new(geometry).exists() {
                return Err(format!("Geometry shader not found: {}", geometry));
            }
        }
        Ok(())
    }
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self::with_path_resolution("simple.vert.spv", "simple.frag.spv")
    }
}

/// Vulkan renderer settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Name reported to the Vulkan driver
    pub application_name: String,
    /// `None` enables validation in debug builds only
    pub enable_validation: Option<bool>,
}

impl RendererConfig {
    /// Renderer settings for the named application
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            application_name: app_name.into(),
            enable_validation: None,
        }
    }

    /// Force validation layers on or off
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.enable_validation = Some(enabled);
        self
    }

    /// Effective validation setting for this build
    pub fn validation_enabled(&self) -> bool {
        self.enable_validation.unwrap_or(cfg!(debug_assertions))
    }

    /// Check renderer settings
    pub fn validate(&self) -> Result<(), String> {
        if self.application_name.is_empty() {
            return Err("Application name cannot be empty".to_string());
        }
        Ok(())
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self::new("Solar System")
    }
}

/// Window settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Title bar text
    pub title: String,
    /// Initial width in screen coordinates
    pub width: u32,
    /// Initial height in screen coordinates
    pub height: u32,
    /// Windowing backend
    pub backend: BackendKind,
}

impl WindowConfig {
    /// Window with the given title and size
    pub fn new(title: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            title: title.into(),
            width,
            height,
            backend: BackendKind::default(),
        }
    }

    /// Check window settings
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err(format!("Window size must be non-zero, got {}x{}", self.width, self.height));
        }
        Ok(())
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self::new("Solar System", 1920, 1280)
    }
}

/// Camera pose, projection and control speeds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Starting position
    pub position: [f32; 3],
    /// Starting rotation around +Y in radians
    pub yaw: f32,
    /// Starting rotation around +X in radians
    pub pitch: f32,
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    /// Near clip distance
    pub near: f32,
    /// Far clip distance
    pub far: f32,
    /// Units per second for WASD movement
    pub move_speed: f32,
    /// Turns per second for Q/E yaw
    pub turn_speed: f32,
    /// Radians per pixel of mouse movement
    pub mouse_sensitivity: f32,
}

impl CameraConfig {
    /// Check camera settings
    pub fn validate(&self) -> Result<(), String> {
        if !(self.fov_degrees > 0.0 && self.fov_degrees < 180.0) {
            return Err(format!("Field of view out of range: {}", self.fov_degrees));
        }
        if !(self.near > 0.0 && self.far > self.near) {
            return Err(format!("Invalid clip range: {}..{}", self.near, self.far));
        }
        Ok(())
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 10.0, -200.0],
            yaw: 0.0,
            pitch: 0.0,
            fov_degrees: 90.0,
            near: 0.1,
            far: 1000.0,
            move_speed: 40.0,
            turn_speed: 0.25,
            mouse_sensitivity: 0.005,
        }
    }
}

/// Core engine behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default `env_logger` filter, overridden by `RUST_LOG`
    pub log_level: String,
}

impl EngineConfig {
    /// Replace the log filter
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Engine settings
    pub engine: EngineConfig,
    /// Window settings
    pub window: WindowConfig,
    /// Renderer settings
    pub renderer: RendererConfig,
    /// Shader locations
    pub shaders: ShaderConfig,
    /// Camera settings
    pub camera: CameraConfig,
}

impl ApplicationConfig {
    /// Defaults with the given application name and window title
    pub fn new(app_name: impl Into<String>) -> Self {
        let name = app_name.into();
        Self {
            window: WindowConfig {
                title: name.clone(),
                ..WindowConfig::default()
            },
            renderer: RendererConfig::new(name),
            ..Self::default()
        }
    }

    /// Replace the window settings
    pub fn with_window(mut self, window: WindowConfig) -> Self {
        self.window = window;
        self
    }

    /// Replace the shader settings
    pub fn with_shaders(mut self, shaders: ShaderConfig) -> Self {
        self.shaders = shaders;
        self
    }

    /// Validate everything that can be checked before a window exists.
    ///
    /// Shader files are checked separately since they are only needed once
    /// entities are created.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.window.validate().map_err(ConfigError::Invalid)?;
        self.renderer.validate().map_err(ConfigError::Invalid)?;
        self.camera.validate().map_err(ConfigError::Invalid)?;
        Ok(())
    }
}

impl Config for ApplicationConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFormat;

    #[test]
    fn test_defaults_match_solar_scene() {
        let config = ApplicationConfig::default();
        assert_eq!(config.window.width, 1920);
        assert_eq!(config.window.height, 1280);
        assert_eq!(config.camera.position, [0.0, 10.0, -200.0]);
        assert_eq!(config.camera.move_speed, 40.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ApplicationConfig::new("Orbits").with_window(WindowConfig::new("Orbits", 800, 600));
        let text = config.to_string_with_format(ConfigFormat::Toml).unwrap();
        let parsed = ApplicationConfig::from_str_with_format(&text, ConfigFormat::Toml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_ron_round_trip() {
        let config = ApplicationConfig::new("Orbits");
        let text = config.to_string_with_format(ConfigFormat::Ron).unwrap();
        let parsed = ApplicationConfig::from_str_with_format(&text, ConfigFormat::Ron).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let text = "[window]\nwidth = 640\n";
        let parsed = ApplicationConfig::from_str_with_format(text, ConfigFormat::Toml).unwrap();
        assert_eq!(parsed.window.width, 640);
        assert_eq!(parsed.window.height, 1280);
        assert_eq!(parsed.engine.log_level, "info");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = ApplicationConfig::default();
        config.window.width = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = ApplicationConfig::default();
        config.camera.near = 10.0;
        config.camera.far = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.toml")).unwrap(), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.ron")).unwrap(), ConfigFormat::Ron);
        assert!(ConfigFormat::from_path(Path::new("a.json")).is_err());
    }
}
