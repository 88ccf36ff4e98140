//! Depth-layer model for layered parallax rendering.
//!
//! Content is bucketed into three fixed layers. Each layer pushes the camera
//! along z by its own offset, so the same head motion produces a different
//! apparent shift per layer.

use crate::{
    constants::{DEFAULT_CAMERA_BASE_DISTANCE, DEFAULT_DEPTH_DAMPING, DEFAULT_POSITION_SCALE},
    estimation::EyePosition,
    Error, Result,
};
use nalgebra::{Matrix4, Point3, Vector3};

/// Layer identifier: 0 = background, 1 = midground, 2 = foreground
pub type LayerId = u32;

/// Static description of one depth layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerConfig {
    pub id: LayerId,
    pub name: &'static str,
    /// Camera z offset in scene units
    pub z_offset: f64,
    /// Scale multiplier for content on this layer
    pub scale: f64,
    pub description: &'static str,
}

/// The three depth layers, indexed by id
pub const DEPTH_LAYERS: [LayerConfig; 3] = [
    LayerConfig {
        id: 0,
        name: "background",
        z_offset: -0.8,
        scale: 1.2,
        description: "Far away background elements",
    },
    LayerConfig {
        id: 1,
        name: "midground",
        z_offset: 0.0,
        scale: 1.0,
        description: "Middle distance main elements",
    },
    LayerConfig {
        id: 2,
        name: "foreground",
        z_offset: 0.6,
        scale: 0.8,
        description: "Close-up foreground elements",
    },
];

/// Look up a layer by id
///
/// # Errors
///
/// Returns [`Error::InvalidLayer`] for an id not in the table.
pub fn get_layer_config(id: LayerId) -> Result<&'static LayerConfig> {
    DEPTH_LAYERS
        .iter()
        .find(|layer| layer.id == id)
        .ok_or_else(|| Error::InvalidLayer(format!("Invalid layer ID: {id}")))
}

/// Look up a layer by name
///
/// # Errors
///
/// Returns [`Error::InvalidLayer`] for a name not in the table.
pub fn get_layer_config_by_name(name: &str) -> Result<&'static LayerConfig> {
    DEPTH_LAYERS
        .iter()
        .find(|layer| layer.name == name)
        .ok_or_else(|| Error::InvalidLayer(format!("Invalid layer name: {name}")))
}

/// Mean z offset of the given layers; zero for an empty set.
///
/// Used when several layers share one camera.
///
/// # Errors
///
/// Returns [`Error::InvalidLayer`] if any id is unknown.
pub fn calculate_camera_offset(ids: &[LayerId]) -> Result<f64> {
    if ids.is_empty() {
        return Ok(0.0);
    }
    let total = ids
        .iter()
        .map(|&id| get_layer_config(id).map(|layer| layer.z_offset))
        .sum::<Result<f64>>()?;
    #[allow(clippy::cast_precision_loss)]
    let count = ids.len() as f64;
    Ok(total / count)
}

#[must_use]
pub fn is_valid_layer(id: LayerId) -> bool {
    DEPTH_LAYERS.iter().any(|layer| layer.id == id)
}

#[must_use]
pub fn all_layer_ids() -> Vec<LayerId> {
    DEPTH_LAYERS.iter().map(|layer| layer.id).collect()
}

/// Camera pose for rendering one layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTransform {
    pub position: Point3<f64>,
    pub look_at: Point3<f64>,
}

impl CameraTransform {
    /// Right-handed view matrix with +y up
    #[must_use]
    pub fn view_matrix(&self) -> Matrix4<f64> {
        Matrix4::look_at_rh(&self.position, &self.look_at, &Vector3::y())
    }
}

/// Maps eye positions in centimeters to scene-space cameras
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraRig {
    /// Scene units per centimeter
    pub position_scale: f64,
    /// Camera distance from the origin for a centered viewer
    pub base_distance: f64,
    /// Attenuation applied to eye depth on the camera z axis
    pub depth_damping: f64,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self {
            position_scale: DEFAULT_POSITION_SCALE,
            base_distance: DEFAULT_CAMERA_BASE_DISTANCE,
            depth_damping: DEFAULT_DEPTH_DAMPING,
        }
    }
}

impl CameraRig {
    /// Independent camera for one layer.
    ///
    /// Without an eye position the camera sits on the z axis (static
    /// fallback when tracking is lost or unavailable).
    #[must_use]
    pub fn camera_transform(&self, eye: Option<&EyePosition>, layer: &LayerConfig) -> CameraTransform {
        self.transform_with_offset(eye, layer.z_offset)
    }

    /// One shared camera for several layers, offset by their mean z offset
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLayer`] if any id is unknown.
    pub fn composite_transform(&self, eye: Option<&EyePosition>, ids: &[LayerId]) -> Result<CameraTransform> {
        Ok(self.transform_with_offset(eye, calculate_camera_offset(ids)?))
    }

    fn transform_with_offset(&self, eye: Option<&EyePosition>, z_offset: f64) -> CameraTransform {
        let s = self.position_scale;
        let position = match eye {
            // x follows the head, y is inverted (image rows grow downward)
            Some(eye) => Point3::new(
                eye.x() * s,
                -eye.y() * s,
                self.base_distance + eye.z() * s * self.depth_damping + z_offset,
            ),
            None => Point3::new(0.0, 0.0, self.base_distance + z_offset),
        };
        CameraTransform {
            position,
            look_at: Point3::origin(),
        }
    }
}

/// Camera for `layer` using the default rig
#[must_use]
pub fn camera_transform(eye: &EyePosition, layer: &LayerConfig) -> CameraTransform {
    CameraRig::default().camera_transform(Some(eye), layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_lookup_by_id_and_name() {
        for id in all_layer_ids() {
            assert_eq!(get_layer_config(id).unwrap().id, id);
        }
        assert_eq!(get_layer_config_by_name("foreground").unwrap().id, 2);
        assert_eq!(get_layer_config_by_name("background").unwrap().scale, 1.2);
    }

    #[test]
    fn test_unknown_layer_fails() {
        assert!(matches!(get_layer_config(99), Err(Error::InvalidLayer(_))));
        assert!(matches!(get_layer_config_by_name("sky"), Err(Error::InvalidLayer(_))));
        assert!(matches!(calculate_camera_offset(&[0, 7]), Err(Error::InvalidLayer(_))));
        assert!(!is_valid_layer(3));
        assert!(is_valid_layer(0));
    }

    #[test]
    fn test_camera_offset() {
        assert_eq!(calculate_camera_offset(&[]).unwrap(), 0.0);
        assert_eq!(calculate_camera_offset(&[1]).unwrap(), 0.0);
        assert_relative_eq!(calculate_camera_offset(&[0, 2]).unwrap(), -0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_camera_transform_mapping() {
        let eye = EyePosition::new(10.0, -5.0, 50.0);
        let background = get_layer_config(0).unwrap();
        let t = camera_transform(&eye, background);

        assert_relative_eq!(t.position.x, 0.2, epsilon = 1e-12);
        assert_relative_eq!(t.position.y, 0.1, epsilon = 1e-12);
        // 5 + 50 * 0.02 * 0.5 - 0.8
        assert_relative_eq!(t.position.z, 4.7, epsilon = 1e-12);
        assert_eq!(t.look_at, Point3::origin());
    }

    #[test]
    fn test_static_camera_without_eye() {
        let rig = CameraRig::default();
        let t = rig.camera_transform(None, get_layer_config(2).unwrap());
        assert_eq!((t.position.x, t.position.y), (0.0, 0.0));
        assert_relative_eq!(t.position.z, 5.6, epsilon = 1e-12);
    }

    #[test]
    fn test_composite_uses_mean_offset() {
        let rig = CameraRig::default();
        let eye = EyePosition::new(0.0, 0.0, 0.0);
        let t = rig.composite_transform(Some(&eye), &[0, 2]).unwrap();
        assert_relative_eq!(t.position.z, 4.9, epsilon = 1e-12);
        assert!(rig.composite_transform(Some(&eye), &[5]).is_err());
    }

    #[test]
    fn test_view_matrix_maps_target_onto_view_axis() {
        let eye = EyePosition::new(20.0, 10.0, 60.0);
        let t = camera_transform(&eye, get_layer_config(1).unwrap());
        let view = t.view_matrix();
        let target = view.transform_point(&t.look_at);
        assert_relative_eq!(target.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(target.y, 0.0, epsilon = 1e-9);
        assert!(target.z < 0.0);
    }
}
