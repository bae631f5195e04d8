// src/config/validate.rs

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{BuildError, Result};
use crate::tasks::{TaskConfig, TaskKind};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = BuildError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.transformer, raw.task))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_transformer(cfg)?;
    let names = validate_unique_prefixes(cfg)?;
    validate_task_dependencies(cfg, &names)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(BuildError::config(
            "build file must contain at least one [[task]] section",
        ));
    }
    Ok(())
}

fn validate_transformer(cfg: &RawConfigFile) -> Result<()> {
    if cfg.transformer.program.trim().is_empty() {
        return Err(BuildError::config("[transformer].program must not be empty"));
    }
    Ok(())
}

/// Names of every task the file defines (both kinds), keyed to the index of
/// the `[[task]]` entry that produced them.
fn validate_unique_prefixes(cfg: &RawConfigFile) -> Result<BTreeMap<String, usize>> {
    let mut names = BTreeMap::new();
    for (idx, task) in cfg.task.iter().enumerate() {
        for kind in [TaskKind::Transform, TaskKind::WatchTransform] {
            let name = kind.task_name(&task.composed_prefix());
            if let Some(prev) = names.insert(name.clone(), idx) {
                return Err(BuildError::config(format!(
                    "[[task]] #{} and #{} both define task '{}'; use distinct name_prefix values",
                    prev + 1,
                    idx + 1,
                    name
                )));
            }
        }
    }
    Ok(names)
}

fn validate_task_dependencies(cfg: &RawConfigFile, names: &BTreeMap<String, usize>) -> Result<()> {
    for task in &cfg.task {
        let own = transform_name(task);
        for dep in &task.dependencies {
            if !names.contains_key(dep) {
                return Err(BuildError::config(format!(
                    "task '{}' has unknown dependency '{}'",
                    own, dep
                )));
            }
            if *dep == own {
                return Err(BuildError::config(format!(
                    "task '{}' cannot depend on itself",
                    own
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: dep -> task.
    let owned: Vec<(String, &TaskConfig)> =
        cfg.task.iter().map(|t| (transform_name(t), t)).collect();

    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    let declared: BTreeSet<&str> = owned.iter().map(|(name, _)| name.as_str()).collect();
    for name in &declared {
        graph.add_node(*name);
    }
    for (name, task) in &owned {
        for dep in &task.dependencies {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(BuildError::DagCycle(format!(
            "cycle detected in task dependencies involving task '{}'",
            cycle.node_id()
        ))),
    }
}

fn transform_name(task: &TaskConfig) -> String {
    TaskKind::Transform.task_name(&task.composed_prefix())
}
