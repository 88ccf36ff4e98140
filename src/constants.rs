//! Constants used throughout the library

/// Number of points produced by the face landmark model (468 mesh + 10 iris)
pub const NUM_FACE_LANDMARKS: usize = 478;

/// Index of the right iris center in a landmark frame
pub const RIGHT_IRIS_INDEX: usize = 468;

/// Index of the left iris center in a landmark frame
pub const LEFT_IRIS_INDEX: usize = 473;

/// Edge points sampled around each iris center, at `center + 1 ..= center + 4`
pub const IRIS_EDGE_COUNT: usize = 4;

/// Average human iris diameter in centimeters
pub const IRIS_DIAMETER_CM: f64 = 1.17;

/// Default horizontal field of view of a front-facing webcam
pub const DEFAULT_HFOV_DEG: f64 = 60.0;

/// Default capture resolution requested from the camera
pub const DEFAULT_CAPTURE_WIDTH: u32 = 160;
pub const DEFAULT_CAPTURE_HEIGHT: u32 = 120;

/// Per-millisecond retention of the distance smoother
pub const DEFAULT_DECAY_BASE: f64 = 0.99;

/// Vertical bias subtracted from the averaged eye position
pub const PORTRAIT_VERTICAL_BIAS_CM: f64 = 30.0;
pub const LANDSCAPE_VERTICAL_BIAS_CM: f64 = 20.0;

/// Consecutive face-less frames tolerated before the "lost" signal is raised
pub const DEFAULT_LOST_THRESHOLD: u32 = 3;

/// Scene units per centimeter of eye motion
pub const DEFAULT_POSITION_SCALE: f64 = 0.02;

/// Camera distance from the scene origin with the viewer centered
pub const DEFAULT_CAMERA_BASE_DISTANCE: f64 = 5.0;

/// Attenuation of eye depth when mapped onto camera z
pub const DEFAULT_DEPTH_DAMPING: f64 = 0.5;

/// Display refresh assumption for the render loop
pub const DEFAULT_REFRESH_HZ: u32 = 60;

/// Time allowed for the inference worker to exit on teardown
pub const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 200;

/// Numeric precision epsilon
pub const EPSILON: f64 = 1e-10;
