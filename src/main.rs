//! Parallax tracker: replays a recorded landmark trace through the tracking
//! pipeline and logs the per-layer cameras the render loop produces.

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};
use parallax_tracking::{
    app::{AppConfig, LogRenderer, ParallaxApp},
    capture::TraceVideoSource,
    cli::Args,
    config::{Config, EXAMPLE_CONFIG},
    landmarks::{LandmarkTrace, ReplaySource},
};

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if let Some(path) = &args.write_config {
        std::fs::write(path, EXAMPLE_CONFIG)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote example configuration to {}", path.display());
        return Ok(());
    }

    info!("Parallax Tracker");

    // Load configuration if provided
    let mut config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path.display());
        match Config::from_file(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("Failed to load config file: {}. Using defaults.", e);
                Config::default()
            }
        }
    } else {
        Config::default()
    };

    // Command line overrides
    args.apply_overrides(&mut config)?;

    let Some(trace_path) = &args.trace else {
        bail!("--trace is required");
    };
    let trace = LandmarkTrace::from_file(trace_path)?;
    info!("Loaded trace with {} frames", trace.frames.len());

    // The trace defines the capture geometry
    config.camera.width = trace.width;
    config.camera.height = trace.height;
    config.validate()?;

    let mut app_config = AppConfig::from_config(&config);
    app_config.lockstep = args.lockstep;

    let mut app = ParallaxApp::new(
        app_config,
        TraceVideoSource::new(&trace),
        Box::new(ReplaySource::new(&trace)),
        config.tracking_session()?,
        LogRenderer::new(),
    )?;
    let summary = app.run()?;

    let snapshot = &summary.final_snapshot;
    info!(
        "Done: {} ticks, {} frames processed, status {:?}",
        summary.ticks, snapshot.sequence, snapshot.status
    );
    if let Some(eye) = snapshot.eye_position {
        info!("Final eye position: ({:.2}, {:.2}, {:.2}) cm", eye.x(), eye.y(), eye.z());
    }

    Ok(())
}
