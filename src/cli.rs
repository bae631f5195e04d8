// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Printed when the command is given nothing to do.
pub const USAGE: &str = "\
Usage: build-transform <files> [<files>] [-i <dir>] [-o <dir>] [-w | -W] [-k]
       build-transform -c <Transform.toml> [-t <task>]... [-w | -W]

Options:
<files>\t A glob pattern that identifies files to transform.
-i\t The base directory used when creating folder paths in the output directory. Defaults to the current working directory.
-o\t The output directory. Defaults to `lib`.
-k\t When this option is specified the output folder will not be deleted before files are emitted.
-w\t When present the files matched by the glob pattern(s) will be watched for changes and transformed when they do change.
-W\t Transform everything once, then watch.
-c\t Read tasks from a build file instead of the command line.";

/// Command-line arguments for `build-transform`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "build-transform",
    version,
    about = "Transform source trees into compiled output trees, once or on change.",
    long_about = None
)]
pub struct CliArgs {
    /// Glob patterns selecting the files to transform. A leading `!` excludes.
    #[arg(value_name = "GLOB")]
    pub globs: Vec<String>,

    /// Additional glob pattern; may be repeated.
    #[arg(short = 'g', long = "glob", value_name = "GLOB")]
    pub extra_globs: Vec<String>,

    /// Base directory output placement is computed from.
    ///
    /// Default: the current working directory.
    #[arg(short = 'i', long = "input", value_name = "DIR")]
    pub input_root: Option<PathBuf>,

    /// Output directory.
    #[arg(short = 'o', long = "output", value_name = "DIR", default_value = "lib")]
    pub output_root: PathBuf,

    /// Keep the output directory instead of deleting it first.
    #[arg(short = 'k', long = "keep")]
    pub keep: bool,

    /// Watch for changes and transform changed files, without a full build.
    #[arg(short = 'w', long = "watch", conflicts_with = "build_and_watch")]
    pub watch: bool,

    /// Transform everything once, then watch.
    #[arg(short = 'W', long = "build-watch")]
    pub build_and_watch: bool,

    /// Path to a build file (TOML).
    #[arg(short = 'c', long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Task(s) from the build file to run. Default: all of them.
    #[arg(short = 't', long = "task", value_name = "NAME", requires = "config")]
    pub tasks: Vec<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BUILD_TRANSFORM_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve and print the tasks, but don't transform anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// Positional and `-g` patterns together, in that order.
    pub fn all_globs(&self) -> Vec<String> {
        self.globs
            .iter()
            .chain(self.extra_globs.iter())
            .cloned()
            .collect()
    }

    /// Neither patterns nor a build file: nothing to do.
    pub fn is_empty(&self) -> bool {
        self.globs.is_empty() && self.extra_globs.is_empty() && self.config.is_none()
    }

    pub fn watches(&self) -> bool {
        self.watch || self.build_and_watch
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
