//! Head-tracked motion parallax.
//!
//! This library turns facial landmarks into a smoothed 3D eye position and
//! drives per-layer cameras from it, so a layered scene shifts with the
//! viewer's head like a window into a diorama:
//! - Iris size gives the eye distance by similar triangles
//! - Distances are smoothed with a frame-rate independent exponential decay
//! - Inference runs on a worker thread, at most one request at a time
//! - The render loop reads the latest published snapshot without blocking
//!
//! # Examples
//!
//! ## Estimating an eye position
//!
//! ```no_run
//! use parallax_tracking::{
//!     estimation::{GeometricEstimator, Orientation},
//!     landmarks::LandmarkFrame,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let points = Vec::new();
//! let estimator = GeometricEstimator::new(160, 120)?;
//! let frame = LandmarkFrame::new(points, 0.0)?;
//! let (left, right) = frame.iris_pair()?;
//!
//! if let (Some(l), Some(r)) = (estimator.iris_distance_cm(&left), estimator.iris_distance_cm(&right)) {
//!     let eye = estimator.eye_position(&left, &right, l, r, Orientation::Landscape);
//!     println!("Eye at ({:.1}, {:.1}, {:.1}) cm", eye.x(), eye.y(), eye.z());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Layer cameras
//!
//! ```
//! use parallax_tracking::{estimation::EyePosition, layers::{camera_transform, get_layer_config}};
//!
//! let eye = EyePosition::new(10.0, -5.0, 50.0);
//! let foreground = get_layer_config(2).unwrap();
//! let camera = camera_transform(&eye, foreground);
//! assert!(camera.position.z > 5.0);
//! ```

/// Video frames and capture device abstraction
pub mod capture;

/// Command line arguments
pub mod cli;

/// Configuration management
pub mod config;

/// Constants used throughout the application
pub mod constants;

/// Error types and result handling
pub mod error;

/// Iris-based distance and eye position estimation
pub mod estimation;

/// Distance smoothing filters
pub mod filters;

/// Face landmark frames, landmark sources and recorded traces
pub mod landmarks;

/// Depth layers and camera transforms
pub mod layers;

/// Single-flight inference scheduling
pub mod scheduler;

/// Tracking state and snapshot publication
pub mod tracking;

/// Main application module
pub mod app;

pub use error::{Error, Result};
