// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod paths;
pub mod pipeline;
pub mod tasks;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::cli::{CliArgs, USAGE};
use crate::config::load_and_validate;
use crate::errors::{BuildError, Result};
use crate::fs::RealFileSystem;
use crate::paths::{anchor_pattern, GlobSpec};
use crate::pipeline::{CommandTransformer, TransformOptions, TransformPipeline};
use crate::tasks::{TaskConfig, TaskGraph, TaskName};
use crate::watch::{LogNotifier, NotifyEventSource, WatcherRegistry};

/// High-level entry point used by `main.rs`. Returns the process exit status.
///
/// This wires together:
/// - build file or command-line task definition
/// - task graph with the real compiler, file system and watcher
/// - Ctrl-C handling while watchers are active
pub async fn run(args: CliArgs) -> Result<u8> {
    if args.is_empty() {
        println!("{USAGE}");
        return Ok(1);
    }

    let cwd = std::env::current_dir()?;
    let (graph, targets) = match &args.config {
        Some(path) => from_build_file(&args, path, &cwd)?,
        None => from_command_line(&args, &cwd)?,
    };

    if args.dry_run {
        print_dry_run(&graph, &targets)?;
        return Ok(0);
    }

    let mut registry = WatcherRegistry::new();
    graph.run_all(&targets, &mut registry).await?;

    if !registry.is_empty() {
        info!(watchers = ?registry.names(), "watching for changes; press Ctrl-C to stop");
        tokio::signal::ctrl_c().await?;
        info!("shutting down watchers");
        registry.clear();
    }

    Ok(0)
}

fn production_graph(defaults: TransformOptions, cwd: &Path) -> TaskGraph {
    let pipeline = TransformPipeline::new(
        Arc::new(CommandTransformer::new()),
        Arc::new(RealFileSystem),
    );
    TaskGraph::new(
        pipeline,
        Arc::new(NotifyEventSource::new()),
        Arc::new(LogNotifier),
    )
    .with_defaults(defaults)
    .with_cwd(cwd)
}

/// One task built from the positional/`-g` patterns and `-i`/`-o`/`-k`.
fn from_command_line(args: &CliArgs, cwd: &Path) -> Result<(TaskGraph, Vec<TaskName>)> {
    let patterns: Vec<String> = args
        .all_globs()
        .iter()
        .map(|raw| anchor_pattern(raw, cwd))
        .collect();

    let input_root: PathBuf = args.input_root.clone().unwrap_or_else(|| cwd.to_path_buf());
    let mut task = TaskConfig::new(GlobSpec::Many(patterns), input_root, args.output_root.clone());
    task.clean = !args.keep;

    let mut graph = production_graph(TransformOptions::default(), cwd);
    let names = graph.register(task)?;

    let targets = match (args.watch, args.build_and_watch) {
        (true, _) => vec![names.watch],
        (false, true) => vec![names.transform, names.watch],
        (false, false) => vec![names.transform],
    };
    Ok((graph, targets))
}

/// Every `[[task]]` of the build file; targets from `-t` or the mode flags.
fn from_build_file(
    args: &CliArgs,
    path: &Path,
    cwd: &Path,
) -> Result<(TaskGraph, Vec<TaskName>)> {
    let cfg = load_and_validate(path)?;
    debug!(path = ?path, tasks = cfg.task.len(), "loaded build file");

    let transforms = cfg.transform_task_names();
    let watches = cfg.watch_task_names();

    let mut graph = production_graph(cfg.transformer.clone(), cwd);
    for task in cfg.task {
        graph.register(task)?;
    }

    let targets = if !args.tasks.is_empty() {
        for name in &args.tasks {
            if !graph.contains(name) {
                return Err(BuildError::TaskNotFound(name.clone()));
            }
        }
        args.tasks.clone()
    } else if args.watch {
        watches
    } else if args.build_and_watch {
        transforms.into_iter().chain(watches).collect()
    } else {
        transforms
    };
    Ok((graph, targets))
}

/// Print what would run, in order, without touching anything.
fn print_dry_run(graph: &TaskGraph, targets: &[TaskName]) -> Result<()> {
    println!("build-transform dry-run");
    println!("  cwd = {}", graph.cwd().display());
    println!();

    let order = graph.combined_order(targets)?;
    println!("tasks ({}):", order.len());
    for name in &order {
        println!("  - {name}");
        if let Some(deps) = graph.dependencies_of(name) {
            if !deps.is_empty() {
                println!("      dependencies: {:?}", deps);
            }
        }
        if let Some(task) = graph.resolved(name) {
            println!("      input_root: {}", task.input_root().display());
            println!("      output_root: {}", task.output_root().display());
            println!("      globs: {:?}", task.matcher().globs().to_strings());
            if !task.clean() {
                println!("      clean: false");
            }
            if task.skip_unchanged() {
                println!("      skip_unchanged: true");
            }
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
