//! Geometric estimation of eye distance and 3D eye position.
//!
//! Uses a pinhole camera model whose focal length is derived from the image
//! width and the horizontal field of view. Distance follows from comparing
//! the apparent iris diameter with the near-constant real one; lateral
//! position follows from back-projecting the iris center at that distance.

use crate::{
    constants::{
        DEFAULT_HFOV_DEG, EPSILON, IRIS_DIAMETER_CM, LANDSCAPE_VERTICAL_BIAS_CM,
        PORTRAIT_VERTICAL_BIAS_CM,
    },
    landmarks::{Iris, Point2D},
    Error, Result,
};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Display orientation, which selects the vertical recentering bias
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    #[default]
    Landscape,
}

impl Orientation {
    /// Portrait iff the viewport is taller than it is wide
    #[must_use]
    pub fn from_viewport(width: u32, height: u32) -> Self {
        if height > width {
            Self::Portrait
        } else {
            Self::Landscape
        }
    }
}

/// Eye position in centimeters relative to the camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyePosition(Vector3<f64>);

impl EyePosition {
    #[must_use]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self(Vector3::new(x, y, z))
    }

    #[must_use]
    pub fn x(&self) -> f64 {
        self.0.x
    }

    #[must_use]
    pub fn y(&self) -> f64 {
        self.0.y
    }

    #[must_use]
    pub fn z(&self) -> f64 {
        self.0.z
    }

    #[must_use]
    pub fn as_vector(&self) -> &Vector3<f64> {
        &self.0
    }

    #[must_use]
    pub fn to_array(&self) -> [f64; 3] {
        [self.0.x, self.0.y, self.0.z]
    }
}

impl From<Vector3<f64>> for EyePosition {
    fn from(v: Vector3<f64>) -> Self {
        Self(v)
    }
}

/// Focal length in pixels: `f = W / (2 tan(FOV / 2))`
#[must_use]
pub fn focal_length_px(image_width_px: f64, hfov_deg: f64) -> f64 {
    image_width_px / (2.0 * (hfov_deg.to_radians() / 2.0).tan())
}

/// Pinhole estimator for one video source
#[derive(Debug, Clone)]
pub struct GeometricEstimator {
    image_width: f64,
    image_height: f64,
    hfov_deg: f64,
    focal_length: f64,
    iris_diameter_cm: f64,
    portrait_bias_cm: f64,
    landscape_bias_cm: f64,
}

impl GeometricEstimator {
    /// Estimator with the default field of view and physical constants
    ///
    /// # Errors
    ///
    /// Returns an error if either image dimension is zero.
    pub fn new(image_width: u32, image_height: u32) -> Result<Self> {
        Self::with_fov(image_width, image_height, DEFAULT_HFOV_DEG)
    }

    /// Estimator with an explicit horizontal field of view
    ///
    /// # Errors
    ///
    /// Returns an error if either image dimension is zero or the field of
    /// view is not strictly between 0 and 180 degrees.
    pub fn with_fov(image_width: u32, image_height: u32, hfov_deg: f64) -> Result<Self> {
        if image_width == 0 || image_height == 0 {
            return Err(Error::InvalidInput(format!(
                "Image dimensions must be non-zero, got {image_width}x{image_height}"
            )));
        }
        if !(hfov_deg > 0.0 && hfov_deg < 180.0) {
            return Err(Error::InvalidInput(format!(
                "Horizontal FOV must be in (0, 180) degrees, got {hfov_deg}"
            )));
        }

        let image_width = f64::from(image_width);
        Ok(Self {
            image_width,
            image_height: f64::from(image_height),
            hfov_deg,
            focal_length: focal_length_px(image_width, hfov_deg),
            iris_diameter_cm: IRIS_DIAMETER_CM,
            portrait_bias_cm: PORTRAIT_VERTICAL_BIAS_CM,
            landscape_bias_cm: LANDSCAPE_VERTICAL_BIAS_CM,
        })
    }

    /// Override the real iris diameter
    ///
    /// # Errors
    ///
    /// Returns an error if the diameter is not positive.
    pub fn with_iris_diameter(mut self, iris_diameter_cm: f64) -> Result<Self> {
        if !(iris_diameter_cm > 0.0 && iris_diameter_cm.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "Iris diameter must be positive, got {iris_diameter_cm}"
            )));
        }
        self.iris_diameter_cm = iris_diameter_cm;
        Ok(self)
    }

    /// Override the vertical recentering biases
    #[must_use]
    pub fn with_vertical_bias(mut self, portrait_cm: f64, landscape_cm: f64) -> Self {
        self.portrait_bias_cm = portrait_cm;
        self.landscape_bias_cm = landscape_cm;
        self
    }

    #[must_use]
    pub fn focal_length_px(&self) -> f64 {
        self.focal_length
    }

    #[must_use]
    pub fn hfov_deg(&self) -> f64 {
        self.hfov_deg
    }

    #[must_use]
    pub fn image_size(&self) -> (f64, f64) {
        (self.image_width, self.image_height)
    }

    #[must_use]
    pub fn vertical_bias_cm(&self, orientation: Orientation) -> f64 {
        match orientation {
            Orientation::Portrait => self.portrait_bias_cm,
            Orientation::Landscape => self.landscape_bias_cm,
        }
    }

    /// Apparent iris diameter in pixels.
    ///
    /// Averages the two opposing edge-pair deltas per axis, scales them to
    /// pixels and takes the Euclidean norm.
    #[must_use]
    pub fn apparent_iris_size_px(&self, iris: &Iris) -> f64 {
        let [e0, e1, e2, e3] = iris.edges;
        let dx = ((e0.x - e2.x) + (e1.x - e3.x)) / 2.0 * self.image_width;
        let dy = ((e0.y - e2.y) + (e1.y - e3.y)) / 2.0 * self.image_height;
        dx.hypot(dy)
    }

    /// Camera-to-iris distance in centimeters.
    ///
    /// Returns `None` for a degenerate iris whose edges collapse to a point,
    /// which would otherwise yield an infinite distance.
    #[must_use]
    pub fn iris_distance_cm(&self, iris: &Iris) -> Option<f64> {
        let size = self.apparent_iris_size_px(iris);
        if !size.is_finite() || size <= EPSILON {
            return None;
        }
        Some(self.focal_length * self.iris_diameter_cm / size)
    }

    /// Back-project a normalized image point to camera space at `distance_cm`
    #[must_use]
    pub fn back_project(&self, point: Point2D, distance_cm: f64) -> Vector3<f64> {
        let (w, h) = (self.image_width, self.image_height);
        let x = -(point.x * w - w / 2.0) * distance_cm / self.focal_length;
        let y = -(point.y * h - h / 2.0) * distance_cm / self.focal_length;
        Vector3::new(x, y, distance_cm)
    }

    /// Midpoint of both irises, back-projected at the closer eye's distance,
    /// with the orientation's vertical bias subtracted.
    #[must_use]
    pub fn eye_position(
        &self,
        left: &Iris,
        right: &Iris,
        left_distance_cm: f64,
        right_distance_cm: f64,
        orientation: Orientation,
    ) -> EyePosition {
        let reference = left_distance_cm.min(right_distance_cm);

        let left_pos = self.back_project(left.center, reference);
        let right_pos = self.back_project(right.center, reference);

        let mut mid = (left_pos + right_pos) / 2.0;
        mid.y -= self.vertical_bias_cm(orientation);

        EyePosition(mid)
    }
}
