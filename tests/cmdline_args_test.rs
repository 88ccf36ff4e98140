//! Tests for command-line argument parsing

use clap::{error::ErrorKind, CommandFactory, Parser};
use parallax_tracking::{
    cli::{parse_layer, Args},
    config::{Config, OrientationMode, RenderMode},
    Error,
};
use std::path::PathBuf;

fn parse(args: &[&str]) -> Result<Args, clap::Error> {
    Args::try_parse_from(std::iter::once("parallax-tracker").chain(args.iter().copied()))
}

#[test]
fn test_command_definition_is_valid() {
    Args::command().debug_assert();
}

#[test]
fn test_help_argument() {
    let err = parse(&["--help"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DisplayHelp);
}

#[test]
fn test_trace_is_required() {
    let err = parse(&[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
}

#[test]
fn test_write_config_without_trace() {
    let args = parse(&["--write-config", "out.yaml"]).unwrap();
    assert_eq!(args.write_config, Some(PathBuf::from("out.yaml")));
    assert!(args.trace.is_none());
}

#[test]
fn test_trace_argument() {
    let args = parse(&["-t", "session.yaml"]).unwrap();
    assert_eq!(args.trace, Some(PathBuf::from("session.yaml")));
    assert!(!args.lockstep);
    assert!(!args.debug);
    assert!(args.layers.is_empty());
}

#[test]
fn test_repeated_layers() {
    let args = parse(&["--trace", "t.yaml", "--layer", "background", "-l", "2"]).unwrap();
    assert_eq!(args.layers, vec!["background", "2"]);

    let mut config = Config::default();
    args.apply_overrides(&mut config).unwrap();
    assert_eq!(config.render.active_layers, vec![0, 2]);
}

#[test]
fn test_unknown_layer_name_rejected() {
    assert_eq!(parse_layer("midground").unwrap(), 1);
    assert!(matches!(parse_layer("sky"), Err(Error::InvalidLayer(_))));

    let args = parse(&["--trace", "t.yaml", "--layer", "sky"]).unwrap();
    assert!(args.apply_overrides(&mut Config::default()).is_err());
}

#[test]
fn test_orientation_flags_conflict() {
    let err = parse(&["--trace", "t.yaml", "--portrait", "--landscape"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
}

#[test]
fn test_refresh_hz_must_be_numeric() {
    assert!(parse(&["--trace", "t.yaml", "--refresh-hz", "fast"]).is_err());

    let args = parse(&["--trace", "t.yaml", "--refresh-hz", "120"]).unwrap();
    assert_eq!(args.refresh_hz, Some(120));
}

#[test]
fn test_unknown_mode_rejected() {
    let args = parse(&["--trace", "t.yaml", "--mode", "stereo"]).unwrap();
    match args.apply_overrides(&mut Config::default()) {
        Err(Error::ConfigError(msg)) => assert!(msg.contains("stereo")),
        other => panic!("Expected ConfigError, got {other:?}"),
    }
}

#[test]
fn test_all_options_together() {
    let args = parse(&[
        "--trace",
        "t.yaml",
        "-C",
        "config.yaml",
        "--portrait",
        "--mode",
        "composite",
        "--refresh-hz",
        "30",
        "--lockstep",
        "--debug",
    ])
    .unwrap();
    assert!(args.portrait);
    assert!(args.lockstep);
    assert!(args.debug);
    assert_eq!(args.config, Some(PathBuf::from("config.yaml")));

    let mut config = Config::default();
    args.apply_overrides(&mut config).unwrap();
    assert_eq!(config.tracking.orientation, OrientationMode::Portrait);
    assert_eq!(config.render.mode, RenderMode::Composite);
    assert_eq!(config.render.refresh_hz, 30);
    // Layers untouched without --layer
    assert_eq!(config.render.active_layers, vec![0, 1, 2]);
}
