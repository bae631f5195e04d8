// tests/cli_args.rs

use std::path::PathBuf;

use clap::Parser;

use build_transform::cli::{CliArgs, LogLevel, USAGE};
use build_transform::logging::resolve_level;

fn parse(args: &[&str]) -> CliArgs {
    CliArgs::try_parse_from(std::iter::once("build-transform").chain(args.iter().copied()))
        .expect("arguments should parse")
}

#[test]
fn defaults_without_flags() {
    let args = parse(&["src/**/*.js"]);

    assert_eq!(args.globs, vec!["src/**/*.js"]);
    assert_eq!(args.output_root, PathBuf::from("lib"));
    assert!(args.input_root.is_none());
    assert!(!args.keep);
    assert!(!args.watches());
    assert!(!args.is_empty());
}

#[test]
fn short_flags_match_the_classic_cli() {
    let args = parse(&["a/*.ts", "b/*.ts", "-i", "src", "-o", "dist", "-k", "-w"]);

    assert_eq!(args.all_globs(), vec!["a/*.ts", "b/*.ts"]);
    assert_eq!(args.input_root, Some(PathBuf::from("src")));
    assert_eq!(args.output_root, PathBuf::from("dist"));
    assert!(args.keep);
    assert!(args.watch);
    assert!(args.watches());
}

#[test]
fn glob_flag_appends_after_positional_patterns() {
    let args = parse(&["src/*.js", "-g", "!src/*.spec.js", "--glob", "lib/*.js"]);
    assert_eq!(
        args.all_globs(),
        vec!["src/*.js", "!src/*.spec.js", "lib/*.js"]
    );
}

#[test]
fn build_then_watch_conflicts_with_watch_only() {
    let res = CliArgs::try_parse_from(["build-transform", "x.js", "-w", "-W"]);
    assert!(res.is_err());

    let args = parse(&["x.js", "-W"]);
    assert!(args.build_and_watch);
    assert!(args.watches());
}

#[test]
fn task_selection_requires_a_build_file() {
    assert!(CliArgs::try_parse_from(["build-transform", "-t", "transform"]).is_err());

    let args = parse(&["-c", "Transform.toml", "-t", "a-transform", "-t", "b-transform"]);
    assert_eq!(args.config, Some(PathBuf::from("Transform.toml")));
    assert_eq!(args.tasks, vec!["a-transform", "b-transform"]);
    assert!(!args.is_empty());
}

#[test]
fn no_patterns_and_no_build_file_is_empty() {
    let args = parse(&[]);
    assert!(args.is_empty());

    let args = parse(&["-o", "dist", "-k"]);
    assert!(args.is_empty());
}

#[tokio::test]
async fn empty_invocation_prints_usage_and_exits_with_one() {
    let code = build_transform::run(parse(&[])).await.unwrap();
    assert_eq!(code, 1);
    assert!(USAGE.starts_with("Usage: build-transform"));
}

#[test]
fn log_level_priority_is_flag_then_env_then_info() {
    assert_eq!(
        resolve_level(Some(LogLevel::Warn), Some("trace")),
        tracing::Level::WARN
    );
    assert_eq!(resolve_level(None, Some("debug")), tracing::Level::DEBUG);
    assert_eq!(resolve_level(None, Some(" Warning ")), tracing::Level::WARN);
    assert_eq!(resolve_level(None, Some("loud")), tracing::Level::INFO);
    assert_eq!(resolve_level(None, None), tracing::Level::INFO);

    let args = parse(&["x.js", "--log-level", "debug"]);
    assert!(matches!(args.log_level, Some(LogLevel::Debug)));
}

#[tokio::test]
async fn dry_run_with_a_build_file_touches_nothing() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = dir.path().join("Transform.toml");
    std::fs::write(
        &config,
        r#"
[transformer]
program = "build-transform-no-such-compiler"

[[task]]
name_prefix = "server"
glob = "**/*.js"
input_root = "src"
output_root = "lib"
"#,
    )
    .unwrap();
    std::fs::create_dir_all(dir.path().join("lib")).unwrap();

    let config_arg = config.to_string_lossy().into_owned();
    let code = build_transform::run(parse(&["-c", &config_arg, "--dry-run"]))
        .await
        .unwrap();

    assert_eq!(code, 0);
    assert!(dir.path().join("lib").is_dir());
}

#[tokio::test]
async fn unknown_task_from_the_command_line_is_an_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = dir.path().join("Transform.toml");
    std::fs::write(
        &config,
        "[[task]]\nglob = \"**/*.js\"\ninput_root = \"src\"\noutput_root = \"lib\"\n",
    )
    .unwrap();

    let config_arg = config.to_string_lossy().into_owned();
    let err = build_transform::run(parse(&["-c", &config_arg, "-t", "nope", "--dry-run"]))
        .await
        .unwrap_err();

    assert!(matches!(err, build_transform::errors::BuildError::TaskNotFound(_)));
    assert_eq!(err.exit_code(), 1);
}
