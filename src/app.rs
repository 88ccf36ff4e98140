//! Main application module: capture, inference scheduling and rendering.
//!
//! The render loop never waits on inference. Each tick it samples the
//! capture device, offers the frame to the [`FrameScheduler`] and draws with
//! whatever snapshot was last published.

use crate::{
    capture::VideoSource,
    config::{Config, RenderMode},
    error::Result,
    landmarks::LandmarkSource,
    layers::{get_layer_config, CameraRig, CameraTransform, LayerId},
    scheduler::{DispatchOutcome, FrameScheduler, MetricsSnapshot},
    tracking::{TrackingSession, TrackingSnapshot, TrackingStatus},
};
use log::{debug, info, warn};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const LOCKSTEP_TIMEOUT: Duration = Duration::from_secs(5);

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub render_mode: RenderMode,
    /// Layers drawn each tick
    pub active_layers: Vec<LayerId>,
    pub rig: CameraRig,
    /// Render tick period; `None` runs unthrottled
    pub frame_interval: Option<Duration>,
    /// Wait for each dispatched frame before the next tick
    pub lockstep: bool,
    /// Grace period for the inference worker on teardown
    pub shutdown_grace: Duration,
}

impl AppConfig {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            render_mode: config.render.mode,
            active_layers: config.render.active_layers.clone(),
            rig: config.camera_rig(),
            frame_interval: Some(Duration::from_secs_f64(1.0 / f64::from(config.render.refresh_hz.max(1)))),
            lockstep: false,
            shutdown_grace: Duration::from_millis(config.scheduler.shutdown_grace_ms),
        }
    }
}

/// Camera for one draw call
#[derive(Debug, Clone, PartialEq)]
pub struct LayerCamera {
    /// Layers drawn with this camera
    pub layers: Vec<LayerId>,
    pub transform: CameraTransform,
    /// Content scale; the mean over `layers` for a composite camera
    pub scale: f64,
}

/// Everything a renderer needs for one tick
#[derive(Debug, Clone)]
pub struct RenderView {
    pub tick: u64,
    pub snapshot: Arc<TrackingSnapshot>,
    pub cameras: Vec<LayerCamera>,
}

impl RenderView {
    /// Whether to show the "can't find user" overlay
    #[must_use]
    pub fn show_lost_overlay(&self) -> bool {
        self.snapshot.is_face_hidden()
    }
}

/// Draws one tick of the scene
pub trait Renderer {
    /// # Errors
    ///
    /// Returns an error if drawing fails; the run loop stops.
    fn render(&mut self, view: &RenderView) -> Result<()>;
}

/// Renderer that logs camera poses instead of drawing
#[derive(Debug, Default)]
pub struct LogRenderer {
    ticks: u64,
    overlay_shown: bool,
}

impl LogRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for LogRenderer {
    fn render(&mut self, view: &RenderView) -> Result<()> {
        self.ticks += 1;

        let hidden = view.show_lost_overlay();
        if hidden != self.overlay_shown {
            if hidden {
                info!("Can't find user");
            } else {
                info!("User found");
            }
            self.overlay_shown = hidden;
        }

        for camera in &view.cameras {
            let p = camera.transform.position;
            debug!(
                "tick {} layers {:?}: camera ({:.3}, {:.3}, {:.3}) scale {:.2}",
                view.tick, camera.layers, p.x, p.y, p.z, camera.scale
            );
        }
        Ok(())
    }
}

/// Build the per-tick cameras for a snapshot
///
/// # Errors
///
/// Returns [`crate::Error::InvalidLayer`] if an active layer is unknown.
pub fn layer_cameras(
    snapshot: &TrackingSnapshot,
    rig: &CameraRig,
    mode: RenderMode,
    active_layers: &[LayerId],
) -> Result<Vec<LayerCamera>> {
    let eye = snapshot.parallax_eye();
    match mode {
        RenderMode::PerLayer => active_layers
            .iter()
            .map(|&id| {
                let layer = get_layer_config(id)?;
                Ok(LayerCamera {
                    layers: vec![id],
                    transform: rig.camera_transform(eye, layer),
                    scale: layer.scale,
                })
            })
            .collect(),
        RenderMode::Composite => {
            if active_layers.is_empty() {
                return Ok(Vec::new());
            }
            let transform = rig.composite_transform(eye, active_layers)?;
            let total_scale = active_layers
                .iter()
                .map(|&id| get_layer_config(id).map(|layer| layer.scale))
                .sum::<Result<f64>>()?;
            #[allow(clippy::cast_precision_loss)]
            let scale = total_scale / active_layers.len() as f64;
            Ok(vec![LayerCamera {
                layers: active_layers.to_vec(),
                transform,
                scale,
            }])
        }
    }
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub ticks: u64,
    pub metrics: MetricsSnapshot,
    pub final_snapshot: Arc<TrackingSnapshot>,
}

/// Main application struct
pub struct ParallaxApp<V: VideoSource, R: Renderer> {
    config: AppConfig,
    video: V,
    renderer: R,
    scheduler: FrameScheduler,
    ticks: u64,
    released: bool,
}

impl<V: VideoSource, R: Renderer> ParallaxApp<V, R> {
    /// Create the application and start the inference worker
    ///
    /// # Errors
    ///
    /// Returns an error if an active layer is unknown or the worker cannot
    /// be started.
    pub fn new(
        config: AppConfig,
        video: V,
        landmarks: Box<dyn LandmarkSource>,
        session: TrackingSession,
        renderer: R,
    ) -> Result<Self> {
        info!("Initializing parallax application");
        for &id in &config.active_layers {
            get_layer_config(id)?;
        }
        info!(
            "Capture {}x{}, mode {:?}, layers {:?}",
            video.width(),
            video.height(),
            config.render_mode,
            config.active_layers
        );

        let scheduler = FrameScheduler::start_with_grace(landmarks, session, config.shutdown_grace)?;

        Ok(Self {
            config,
            video,
            renderer,
            scheduler,
            ticks: 0,
            released: false,
        })
    }

    #[must_use]
    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Run the main application loop until the capture source ends.
    ///
    /// Teardown happens whether the loop ends normally or with an error.
    ///
    /// # Errors
    ///
    /// Returns the first capture or render error.
    pub fn run(&mut self) -> Result<RunSummary> {
        info!("Starting main application loop");
        let result = self.run_loop();
        self.teardown();

        result.map(|()| RunSummary {
            ticks: self.ticks,
            metrics: self.scheduler.metrics(),
            final_snapshot: self.scheduler.handle().snapshot(),
        })
    }

    fn run_loop(&mut self) -> Result<()> {
        if self.config.lockstep && !self.scheduler.wait_until_ready(LOCKSTEP_TIMEOUT) {
            warn!("Landmark source not ready, continuing without waiting");
        }

        let start = Instant::now();
        loop {
            let tick_start = Instant::now();

            let Some(frame) = self.video.current_frame()? else {
                info!("Capture source ended");
                break;
            };

            match self.scheduler.offer_frame(frame) {
                DispatchOutcome::Dispatched => {
                    if self.config.lockstep {
                        self.scheduler.wait_until_idle(LOCKSTEP_TIMEOUT);
                    }
                }
                DispatchOutcome::Unavailable | DispatchOutcome::ShutDown => {}
                outcome => debug!("Frame not dispatched: {outcome:?}"),
            }

            self.render_tick()?;

            if let Some(interval) = self.config.frame_interval {
                let elapsed = tick_start.elapsed();
                if elapsed < interval {
                    thread::sleep(interval - elapsed);
                }
            }
        }

        // Let the last request land so the final frame reflects it
        self.scheduler.wait_until_idle(self.config.shutdown_grace);
        self.render_tick()?;

        let metrics = self.scheduler.metrics();
        info!(
            "Rendered {} ticks in {:.2?}; dispatched {}, completed {}, dropped busy {}, dropped duplicate {}",
            self.ticks,
            start.elapsed(),
            metrics.dispatched,
            metrics.completed,
            metrics.dropped_busy,
            metrics.dropped_duplicate
        );
        Ok(())
    }

    fn render_tick(&mut self) -> Result<()> {
        let snapshot = self.scheduler.handle().snapshot();
        let cameras = layer_cameras(&snapshot, &self.config.rig, self.config.render_mode, &self.config.active_layers)?;
        if snapshot.status == TrackingStatus::Unavailable && self.ticks == 0 {
            warn!("Rendering with a static camera");
        }
        self.ticks += 1;
        let view = RenderView {
            tick: self.ticks,
            snapshot,
            cameras,
        };
        self.renderer.render(&view)
    }

    /// Stop the worker and release the capture device. Idempotent.
    pub fn teardown(&mut self) {
        self.scheduler.shutdown();
        if !self.released {
            self.video.release();
            self.released = true;
        }
    }
}

impl<V: VideoSource, R: Renderer> Drop for ParallaxApp<V, R> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimation::EyePosition;
    use approx::assert_relative_eq;

    fn tracking_snapshot(eye: Option<EyePosition>) -> TrackingSnapshot {
        let mut snapshot = TrackingSnapshot::initial(3);
        snapshot.eye_position = eye;
        snapshot.status = TrackingStatus::Tracking;
        snapshot
    }

    #[test]
    fn test_per_layer_cameras() {
        let snapshot = tracking_snapshot(Some(EyePosition::new(0.0, 0.0, 0.0)));
        let cameras = layer_cameras(&snapshot, &CameraRig::default(), RenderMode::PerLayer, &[0, 2]).unwrap();
        assert_eq!(cameras.len(), 2);
        assert_relative_eq!(cameras[0].transform.position.z, 4.2, epsilon = 1e-12);
        assert_relative_eq!(cameras[1].transform.position.z, 5.6, epsilon = 1e-12);
        assert_eq!(cameras[0].scale, 1.2);
    }

    #[test]
    fn test_composite_camera() {
        let snapshot = tracking_snapshot(Some(EyePosition::new(0.0, 0.0, 0.0)));
        let cameras = layer_cameras(&snapshot, &CameraRig::default(), RenderMode::Composite, &[0, 1, 2]).unwrap();
        assert_eq!(cameras.len(), 1);
        assert_eq!(cameras[0].layers, vec![0, 1, 2]);
        assert_relative_eq!(cameras[0].transform.position.z, 5.0 - 0.2 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(cameras[0].scale, 1.0, epsilon = 1e-12);

        let none = layer_cameras(&snapshot, &CameraRig::default(), RenderMode::Composite, &[]).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_unavailable_uses_static_camera() {
        let mut snapshot = tracking_snapshot(Some(EyePosition::new(30.0, 10.0, 60.0)));
        snapshot.status = TrackingStatus::Unavailable;
        let cameras = layer_cameras(&snapshot, &CameraRig::default(), RenderMode::PerLayer, &[1]).unwrap();
        let p = cameras[0].transform.position;
        assert_eq!((p.x, p.y, p.z), (0.0, 0.0, 5.0));
    }

    #[test]
    fn test_unknown_layer_is_rejected() {
        let snapshot = tracking_snapshot(None);
        assert!(layer_cameras(&snapshot, &CameraRig::default(), RenderMode::PerLayer, &[4]).is_err());
        assert!(layer_cameras(&snapshot, &CameraRig::default(), RenderMode::Composite, &[0, 4]).is_err());
    }
}
