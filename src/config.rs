//! Configuration management for the parallax tracker

use crate::{
    constants::{
        DEFAULT_CAMERA_BASE_DISTANCE, DEFAULT_CAPTURE_HEIGHT, DEFAULT_CAPTURE_WIDTH,
        DEFAULT_DECAY_BASE, DEFAULT_DEPTH_DAMPING, DEFAULT_HFOV_DEG, DEFAULT_LOST_THRESHOLD,
        DEFAULT_POSITION_SCALE, DEFAULT_REFRESH_HZ, DEFAULT_SHUTDOWN_GRACE_MS, IRIS_DIAMETER_CM,
        LANDSCAPE_VERTICAL_BIAS_CM, PORTRAIT_VERTICAL_BIAS_CM,
    },
    estimation::{GeometricEstimator, Orientation},
    filters::{create_filter, DistanceFilter, EyeDistanceSmoother},
    layers::{is_valid_layer, CameraRig, LayerId},
    tracking::TrackingSession,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Capture device geometry
    pub camera: CameraConfig,

    /// Estimation and smoothing parameters
    pub tracking: TrackingConfig,

    /// Distance filter selection
    pub filter: FilterConfig,

    /// Render loop and camera rig
    pub render: RenderConfig,

    /// Inference worker lifecycle
    pub scheduler: SchedulerConfig,
}

/// Capture device geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Frame width in pixels
    pub width: u32,

    /// Frame height in pixels
    pub height: u32,

    /// Horizontal field of view in degrees
    pub hfov_deg: f64,
}

/// Orientation selection for the vertical bias
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrientationMode {
    /// Derive from the viewport aspect ratio
    #[default]
    Auto,
    Portrait,
    Landscape,
}

/// Estimation and smoothing parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Real iris diameter in centimeters
    pub iris_diameter_cm: f64,

    /// Per-millisecond retention of the distance smoother
    pub decay_base: f64,

    /// Hidden frames tolerated before signalling a lost user
    pub lost_threshold: u32,

    /// Vertical bias in portrait orientation
    pub portrait_bias_cm: f64,

    /// Vertical bias in landscape orientation
    pub landscape_bias_cm: f64,

    pub orientation: OrientationMode,
}

/// Distance filter selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// `time_decay` or `none`
    pub kind: String,
}

/// How layers are mapped onto cameras
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// One independent camera per layer
    #[default]
    PerLayer,
    /// All active layers share one camera at their mean offset
    Composite,
}

/// Render loop and camera rig
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Display refresh rate driving the render loop
    pub refresh_hz: u32,

    /// Scene units per centimeter of eye motion
    pub position_scale: f64,

    /// Camera distance from the origin for a centered viewer
    pub base_distance: f64,

    /// Attenuation of eye depth on the camera z axis
    pub depth_damping: f64,

    pub mode: RenderMode,

    /// Layers drawn each tick
    pub active_layers: Vec<LayerId>,

    /// Viewport size, used for automatic orientation
    pub viewport_width: u32,
    pub viewport_height: u32,
}

/// Inference worker lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Time allowed for the worker to exit on teardown
    pub shutdown_grace_ms: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_CAPTURE_WIDTH,
            height: DEFAULT_CAPTURE_HEIGHT,
            hfov_deg: DEFAULT_HFOV_DEG,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            iris_diameter_cm: IRIS_DIAMETER_CM,
            decay_base: DEFAULT_DECAY_BASE,
            lost_threshold: DEFAULT_LOST_THRESHOLD,
            portrait_bias_cm: PORTRAIT_VERTICAL_BIAS_CM,
            landscape_bias_cm: LANDSCAPE_VERTICAL_BIAS_CM,
            orientation: OrientationMode::Auto,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            kind: "time_decay".to_string(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            refresh_hz: DEFAULT_REFRESH_HZ,
            position_scale: DEFAULT_POSITION_SCALE,
            base_distance: DEFAULT_CAMERA_BASE_DISTANCE,
            depth_damping: DEFAULT_DEPTH_DAMPING,
            mode: RenderMode::PerLayer,
            active_layers: vec![0, 1, 2],
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            shutdown_grace_ms: DEFAULT_SHUTDOWN_GRACE_MS,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::IoError(e.to_string()))?;

        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| Error::IoError(e.to_string()))?;

        Ok(())
    }

    /// Resolve the orientation, consulting the viewport in `auto` mode
    #[must_use]
    pub fn orientation(&self) -> Orientation {
        match self.tracking.orientation {
            OrientationMode::Auto => {
                Orientation::from_viewport(self.render.viewport_width, self.render.viewport_height)
            }
            OrientationMode::Portrait => Orientation::Portrait,
            OrientationMode::Landscape => Orientation::Landscape,
        }
    }

    /// Build the geometric estimator for the configured camera
    pub fn estimator(&self) -> Result<GeometricEstimator> {
        Ok(
            GeometricEstimator::with_fov(self.camera.width, self.camera.height, self.camera.hfov_deg)?
                .with_iris_diameter(self.tracking.iris_diameter_cm)?
                .with_vertical_bias(self.tracking.portrait_bias_cm, self.tracking.landscape_bias_cm),
        )
    }

    /// Build one distance filter of the configured kind
    pub fn create_filter(&self) -> Result<Box<dyn DistanceFilter>> {
        create_filter(&self.filter.kind, self.tracking.decay_base)
    }

    /// Build the per-eye distance smoother
    pub fn create_smoother(&self) -> Result<EyeDistanceSmoother> {
        EyeDistanceSmoother::from_kind(&self.filter.kind, self.tracking.decay_base)
    }

    /// Build a tracking session with the configured orientation applied
    pub fn tracking_session(&self) -> Result<TrackingSession> {
        let session = TrackingSession::new(self.estimator()?, self.create_smoother()?, self.tracking.lost_threshold);
        session.handle().set_orientation(self.orientation());
        Ok(session)
    }

    #[must_use]
    pub fn camera_rig(&self) -> CameraRig {
        CameraRig {
            position_scale: self.render.position_scale,
            base_distance: self.render.base_distance,
            depth_damping: self.render.depth_damping,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        // Validate camera geometry
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(Error::ConfigError("Camera dimensions must be greater than 0".to_string()));
        }
        if !(self.camera.hfov_deg > 0.0 && self.camera.hfov_deg < 180.0) {
            return Err(Error::ConfigError(
                "Horizontal FOV must be between 0 and 180 degrees".to_string(),
            ));
        }

        // Validate tracking parameters
        if !(self.tracking.iris_diameter_cm > 0.0) {
            return Err(Error::ConfigError("Iris diameter must be positive".to_string()));
        }
        if !(self.tracking.decay_base > 0.0 && self.tracking.decay_base < 1.0) {
            return Err(Error::ConfigError(
                "Decay base must be between 0.0 and 1.0 (exclusive)".to_string(),
            ));
        }
        if !matches!(self.filter.kind.to_lowercase().as_str(), "time_decay" | "timedecay" | "decay" | "none" | "nofilter") {
            return Err(Error::ConfigError(format!("Unknown filter kind: {}", self.filter.kind)));
        }

        // Validate render settings
        if self.render.refresh_hz == 0 {
            return Err(Error::ConfigError("Refresh rate must be greater than 0".to_string()));
        }
        if !(self.render.position_scale.is_finite() && self.render.depth_damping.is_finite()) {
            return Err(Error::ConfigError("Camera rig parameters must be finite".to_string()));
        }
        if let Some(id) = self.render.active_layers.iter().find(|&&id| !is_valid_layer(id)) {
            return Err(Error::ConfigError(format!("Active layer {id} is not a valid layer")));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Parallax Tracker Configuration

# Capture device
camera:
  width: 160
  height: 120
  hfov_deg: 60.0

# Eye distance estimation and smoothing
tracking:
  iris_diameter_cm: 1.17
  decay_base: 0.99
  lost_threshold: 3
  portrait_bias_cm: 30.0
  landscape_bias_cm: 20.0
  orientation: "auto"

# Distance filter
filter:
  kind: "time_decay"

# Render loop and camera rig
render:
  refresh_hz: 60
  position_scale: 0.02
  base_distance: 5.0
  depth_damping: 0.5
  mode: "per_layer"
  active_layers: [0, 1, 2]
  viewport_width: 1280
  viewport_height: 720

# Inference worker
scheduler:
  shutdown_grace_ms: 200
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_parses_to_defaults() {
        let parsed: Config = serde_yaml::from_str(EXAMPLE_CONFIG).unwrap();
        let defaults = Config::default();
        assert_eq!(parsed.camera.width, defaults.camera.width);
        assert_eq!(parsed.tracking.decay_base, defaults.tracking.decay_base);
        assert_eq!(parsed.render.mode, RenderMode::PerLayer);
        assert_eq!(parsed.render.active_layers, vec![0, 1, 2]);
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Config = serde_yaml::from_str("render:\n  mode: composite\n").unwrap();
        assert_eq!(parsed.render.mode, RenderMode::Composite);
        assert_eq!(parsed.render.refresh_hz, 60);
        assert_eq!(parsed.tracking.lost_threshold, 3);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = Config::default();
        config.render.active_layers = vec![0, 9];
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));

        let mut config = Config::default();
        config.tracking.decay_base = 1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.filter.kind = "kalman".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.camera.hfov_deg = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_orientation_resolution() {
        let mut config = Config::default();
        assert_eq!(config.orientation(), Orientation::Landscape);
        config.render.viewport_width = 720;
        config.render.viewport_height = 1280;
        assert_eq!(config.orientation(), Orientation::Portrait);
        config.tracking.orientation = OrientationMode::Landscape;
        assert_eq!(config.orientation(), Orientation::Landscape);
    }

    #[test]
    fn test_session_picks_up_orientation() {
        let mut config = Config::default();
        config.tracking.orientation = OrientationMode::Portrait;
        let session = config.tracking_session().unwrap();
        assert_eq!(session.handle().orientation(), Orientation::Portrait);
    }
}
