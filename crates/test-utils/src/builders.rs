#![allow(dead_code)]

use build_transform::config::{ConfigFile, RawConfigFile};
use build_transform::pipeline::TransformOptions;
use build_transform::tasks::TaskConfig;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                transformer: TransformOptions::default(),
                task: Vec::new(),
            },
        }
    }

    pub fn with_task(mut self, task: TaskConfig) -> Self {
        self.config.task.push(task);
        self
    }

    pub fn with_program(mut self, program: &str) -> Self {
        self.config.transformer.program = program.to_string();
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(glob: &str, input_root: &str, output_root: &str) -> Self {
        Self {
            task: TaskConfig::new(glob, input_root, output_root),
        }
    }

    pub fn globs(mut self, patterns: &[&str]) -> Self {
        self.task.glob = patterns.into();
        self
    }

    pub fn prefix(mut self, prefix: &str) -> Self {
        self.task.name_prefix = Some(prefix.to_string());
        self
    }

    pub fn depends_on(mut self, dep: &str) -> Self {
        self.task.dependencies.push(dep.to_string());
        self
    }

    pub fn keep_output(mut self) -> Self {
        self.task.clean = false;
        self
    }

    pub fn skip_unchanged(mut self) -> Self {
        self.task.skip_unchanged = true;
        self
    }

    pub fn ignore(mut self, pattern: &str) -> Self {
        self.task.ignore = Some(pattern.to_string());
        self
    }

    pub fn declarations(mut self, emit: bool) -> Self {
        self.task.emit_declarations = Some(emit);
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
