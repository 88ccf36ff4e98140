//! Command line arguments for the parallax tracker binary

use crate::{
    config::{Config, OrientationMode, RenderMode},
    layers::{get_layer_config_by_name, LayerId},
    Error, Result,
};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "parallax-tracker", author, version, about, long_about = None)]
pub struct Args {
    /// Recorded landmark trace to replay (YAML)
    #[arg(short, long, required_unless_present = "write_config")]
    pub trace: Option<PathBuf>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Force portrait orientation
    #[arg(long, conflicts_with = "landscape")]
    pub portrait: bool,

    /// Force landscape orientation
    #[arg(long)]
    pub landscape: bool,

    /// Layer camera mode (per_layer, composite)
    #[arg(short, long)]
    pub mode: Option<String>,

    /// Active layer by id or name; repeat for several
    #[arg(short, long = "layer")]
    pub layers: Vec<String>,

    /// Render loop rate
    #[arg(long)]
    pub refresh_hz: Option<u32>,

    /// Wait for each dispatched frame before the next tick
    #[arg(long)]
    pub lockstep: bool,

    /// Write the example configuration to this path and exit
    #[arg(long)]
    pub write_config: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long)]
    pub debug: bool,
}

/// Parse a layer given by numeric id or by name
///
/// # Errors
///
/// Returns [`Error::InvalidLayer`] for an unknown name.
pub fn parse_layer(value: &str) -> Result<LayerId> {
    if let Ok(id) = value.parse::<LayerId>() {
        return Ok(id);
    }
    Ok(get_layer_config_by_name(value)?.id)
}

impl Args {
    /// Apply command line overrides on top of a loaded configuration
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown render mode or layer name.
    pub fn apply_overrides(&self, config: &mut Config) -> Result<()> {
        if self.portrait {
            config.tracking.orientation = OrientationMode::Portrait;
        } else if self.landscape {
            config.tracking.orientation = OrientationMode::Landscape;
        }
        if let Some(mode) = &self.mode {
            config.render.mode = match mode.as_str() {
                "per_layer" | "per-layer" => RenderMode::PerLayer,
                "composite" => RenderMode::Composite,
                other => return Err(Error::ConfigError(format!("Unknown render mode: {other}"))),
            };
        }
        if !self.layers.is_empty() {
            config.render.active_layers = self
                .layers
                .iter()
                .map(|layer| parse_layer(layer))
                .collect::<Result<_>>()?;
        }
        if let Some(hz) = self.refresh_hz {
            config.render.refresh_hz = hz;
        }
        Ok(())
    }
}
