//! Geometric estimator tests against closed-form pinhole results


use approx::assert_relative_eq;
use parallax_tracking::{
    estimation::{focal_length_px, GeometricEstimator, Orientation},
    landmarks::EyeSide,
    Error,
};
use test_helpers::{centered_face, face_points, HEIGHT, WIDTH};

fn estimator() -> GeometricEstimator {
    GeometricEstimator::new(WIDTH, HEIGHT).unwrap()
}

#[test]
fn test_focal_length_for_default_fov() {
    // 160 / (2 * tan(30 deg))
    assert_relative_eq!(estimator().focal_length_px(), 138.564_064_6, epsilon = 1e-6);
    assert_relative_eq!(focal_length_px(160.0, 90.0), 80.0, epsilon = 1e-9);
}

#[test]
fn test_distance_matches_similar_triangles() {
    let estimator = estimator();
    let f = estimator.focal_length_px();

    for half_span in [0.01, 0.025] {
        let frame = centered_face(0.0, half_span).unwrap();
        let iris = frame.iris(EyeSide::Left).unwrap();
        let size = 200.0 * half_span;
        assert_relative_eq!(estimator.apparent_iris_size_px(&iris), size, epsilon = 1e-9);
        assert_relative_eq!(
            estimator.iris_distance_cm(&iris).unwrap(),
            f * 1.17 / size,
            epsilon = 1e-9
        );
    }
}

#[test]
fn test_larger_iris_is_closer() {
    let estimator = estimator();
    let near = centered_face(0.0, 0.03).unwrap().iris(EyeSide::Right).unwrap();
    let far = centered_face(0.0, 0.01).unwrap().iris(EyeSide::Right).unwrap();
    let near_cm = estimator.iris_distance_cm(&near).unwrap();
    let far_cm = estimator.iris_distance_cm(&far).unwrap();
    assert!(near_cm < far_cm);
    assert_relative_eq!(far_cm / near_cm, 3.0, epsilon = 1e-9);
}

#[test]
fn test_degenerate_iris_has_no_distance() {
    let frame = centered_face(0.0, 0.0).unwrap();
    let iris = frame.iris(EyeSide::Left).unwrap();
    assert_eq!(estimator().iris_distance_cm(&iris), None);
}

#[test]
fn test_centered_eye_position() {
    let estimator = estimator();
    let frame = centered_face(0.0, 0.01).unwrap();
    let (left, right) = frame.iris_pair().unwrap();
    let d = estimator.iris_distance_cm(&left).unwrap();

    let eye = estimator.eye_position(&left, &right, d, d, Orientation::Landscape);
    assert_relative_eq!(eye.x(), 0.0, epsilon = 1e-9);
    assert_relative_eq!(eye.y(), -20.0, epsilon = 1e-9);
    assert_relative_eq!(eye.z(), d, epsilon = 1e-9);

    let eye = estimator.eye_position(&left, &right, d, d, Orientation::Portrait);
    assert_relative_eq!(eye.y(), -30.0, epsilon = 1e-9);
}

#[test]
fn test_eye_position_uses_closer_eye() {
    let estimator = estimator();
    let frame = centered_face(0.0, 0.01).unwrap();
    let (left, right) = frame.iris_pair().unwrap();
    let eye = estimator.eye_position(&left, &right, 70.0, 55.0, Orientation::Landscape);
    assert_relative_eq!(eye.z(), 55.0, epsilon = 1e-12);
}

#[test]
fn test_head_moving_right_in_image_moves_eye_left() {
    let estimator = estimator();
    // Both irises shifted towards larger image x
    let points = face_points((0.6, 0.5), (0.8, 0.5), 0.01);
    let frame = parallax_tracking::landmarks::LandmarkFrame::new(points, 0.0).unwrap();
    let (left, right) = frame.iris_pair().unwrap();
    let d = estimator.iris_distance_cm(&left).unwrap();
    let eye = estimator.eye_position(&left, &right, d, d, Orientation::Landscape);

    // Mean image x = 0.7, i.e. 32 px right of center, mirrored and scaled by d / f
    let expected = -32.0 * d / estimator.focal_length_px();
    assert_relative_eq!(eye.x(), expected, epsilon = 1e-9);
    assert!(eye.x() < 0.0);
}

#[test]
fn test_invalid_geometry_is_rejected() {
    assert!(matches!(GeometricEstimator::new(0, 120), Err(Error::InvalidInput(_))));
    assert!(GeometricEstimator::with_fov(160, 120, 180.0).is_err());
    assert!(GeometricEstimator::with_fov(160, 120, 0.0).is_err());
    assert!(estimator().with_iris_diameter(-1.0).is_err());
}
