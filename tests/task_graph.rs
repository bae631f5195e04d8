// tests/task_graph.rs

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use build_transform::errors::BuildError;
use build_transform::fs::mock::MockFileSystem;
use build_transform::fs::FileSystem;
use build_transform::pipeline::TransformPipeline;
use build_transform::tasks::{RegisteredTasks, TaskGraph};
use build_transform::watch::{compute_tree_hash, FileEvent, WatcherRegistry};
use build_transform_test_utils::builders::TaskConfigBuilder;
use build_transform_test_utils::fakes::{ChannelEventSource, FakeTransformer, RecordingNotifier};
use build_transform_test_utils::{init_tracing, wait_until};

type TestResult = Result<(), Box<dyn Error>>;

struct Fixture {
    fs: MockFileSystem,
    fake: FakeTransformer,
    events: ChannelEventSource,
    notifier: RecordingNotifier,
}

impl Fixture {
    fn new() -> Self {
        init_tracing();
        let fs = MockFileSystem::new();
        fs.add_file("/p/chat/logger.js", "export const log = () => 1;");
        fs.add_file("/p/chat/room/room.js", "export const room = 2;");
        let fake = FakeTransformer::new(Arc::new(fs.clone()));
        Self {
            fs,
            fake,
            events: ChannelEventSource::auto_ready(),
            notifier: RecordingNotifier::new(),
        }
    }

    fn graph(&self) -> TaskGraph {
        let pipeline = TransformPipeline::new(Arc::new(self.fake.clone()), Arc::new(self.fs.clone()));
        TaskGraph::new(
            pipeline,
            Arc::new(self.events.clone()),
            Arc::new(self.notifier.clone()),
        )
        .with_cwd("/p")
    }
}

#[test]
fn register_composes_task_names() -> TestResult {
    let fx = Fixture::new();
    let mut graph = fx.graph();

    let named = graph.register(TaskConfigBuilder::new("**/*.js", "chat", "lib").prefix("simple").build())?;
    assert_eq!(
        named,
        RegisteredTasks {
            transform: "simple-transform".to_string(),
            watch: "simple-watch-transform".to_string(),
        }
    );

    let bare = graph.register(TaskConfigBuilder::new("**/*.js", "other", "out").build())?;
    assert_eq!(bare.transform, "transform");
    assert_eq!(bare.watch, "watch-transform");

    let names: Vec<&str> = graph.task_names().collect();
    assert_eq!(
        names,
        vec!["simple-transform", "simple-watch-transform", "transform", "watch-transform"]
    );
    Ok(())
}

#[test]
fn relative_roots_resolve_against_the_working_directory() -> TestResult {
    let fx = Fixture::new();
    let mut graph = fx.graph();
    let names = graph.register(TaskConfigBuilder::new("**/*.js", "chat", "../out/lib").build())?;

    let task = graph.resolved(&names.transform).expect("resolved task");
    assert_eq!(task.input_root(), Path::new("/p/chat"));
    assert_eq!(task.output_root(), Path::new("/out/lib"));
    Ok(())
}

#[test]
fn invalid_roots_are_rejected_at_registration() {
    let fx = Fixture::new();
    let mut graph = fx.graph();

    let same = graph.register(TaskConfigBuilder::new("**/*.js", "chat", "chat").build());
    assert!(matches!(same, Err(BuildError::ConfigError(_))));

    let containing = graph.register(TaskConfigBuilder::new("**/*.js", "lib/src", "lib").build());
    assert!(matches!(containing, Err(BuildError::ConfigError(_))));

    let bad_ignore = graph.register(
        TaskConfigBuilder::new("**/*.js", "chat", "lib").ignore("(").build(),
    );
    assert!(matches!(bad_ignore, Err(BuildError::ConfigError(_))));
}

#[tokio::test]
async fn simple_task_writes_outputs_mirroring_the_input_tree() -> TestResult {
    let fx = Fixture::new();
    let mut graph = fx.graph();
    let names = graph.register(TaskConfigBuilder::new("**/*.js", "chat", "out/lib").prefix("simple").build())?;

    let mut registry = WatcherRegistry::new();
    graph.run(&names.transform, &mut registry).await?;

    assert!(fx.fs.contents("/p/out/lib/logger.js").is_some());
    assert!(fx.fs.contents("/p/out/lib/logger.js.map").is_some());
    assert!(fx.fs.contents("/p/out/lib/room/room.js").is_some());
    assert!(registry.is_empty());
    Ok(())
}

#[tokio::test]
async fn transform_cleans_the_output_root_first() -> TestResult {
    let fx = Fixture::new();
    fx.fs.add_file("/p/lib/stale.js", "old");
    let mut graph = fx.graph();
    let names = graph.register(TaskConfigBuilder::new("**/*.js", "chat", "lib").build())?;

    graph.run(&names.transform, &mut WatcherRegistry::new()).await?;

    assert!(fx.fs.contents("/p/lib/stale.js").is_none());
    assert!(fx.fs.contents("/p/lib/logger.js").is_some());
    Ok(())
}

#[tokio::test]
async fn keep_output_skips_the_clean() -> TestResult {
    let fx = Fixture::new();
    fx.fs.add_file("/p/lib/stale.js", "old");
    let mut graph = fx.graph();
    let names = graph.register(TaskConfigBuilder::new("**/*.js", "chat", "lib").keep_output().build())?;

    graph.run(&names.transform, &mut WatcherRegistry::new()).await?;

    assert!(fx.fs.contents("/p/lib/stale.js").is_some());
    Ok(())
}

#[tokio::test]
async fn running_the_transform_twice_yields_the_same_tree() -> TestResult {
    let fx = Fixture::new();
    let mut graph = fx.graph();
    let names = graph.register(TaskConfigBuilder::new("**/*.js", "chat", "lib").build())?;
    let mut registry = WatcherRegistry::new();

    graph.run(&names.transform, &mut registry).await?;
    let first = compute_tree_hash(&fx.fs, Path::new("/p/lib"))?;

    graph.run(&names.transform, &mut registry).await?;
    let second = compute_tree_hash(&fx.fs, Path::new("/p/lib"))?;

    assert_eq!(first, second);
    assert_eq!(fx.fake.call_count(), 2);
    Ok(())
}

#[tokio::test]
async fn dependencies_complete_before_the_dependent_starts() -> TestResult {
    let fx = Fixture::new();
    fx.fs.add_file("/p/client/app.ts", "boot();");
    let mut graph = fx.graph();

    let lint_saw = Arc::new(Mutex::new(None));
    {
        let fake = fx.fake.clone();
        let lint_saw = Arc::clone(&lint_saw);
        graph.register_external("lint", Vec::new(), move || {
            let fake = fake.clone();
            let lint_saw = Arc::clone(&lint_saw);
            async move {
                *lint_saw.lock().unwrap() = Some(fake.call_count());
                Ok(())
            }
        });
    }

    let server = graph.register(
        TaskConfigBuilder::new("**/*.js", "chat", "lib/server")
            .prefix("server")
            .depends_on("lint")
            .build(),
    )?;
    let client = graph.register(
        TaskConfigBuilder::new("**/*.ts", "client", "lib/client")
            .prefix("client")
            .depends_on(&server.transform)
            .build(),
    )?;

    let order = graph.execution_order(&client.transform)?;
    assert_eq!(order, vec!["lint", "server-transform", "client-transform"]);

    graph.run(&client.transform, &mut WatcherRegistry::new()).await?;

    assert_eq!(*lint_saw.lock().unwrap(), Some(0));
    let out_dirs: Vec<PathBuf> = fx.fake.requests().into_iter().map(|r| r.out_dir).collect();
    assert_eq!(
        out_dirs,
        vec![PathBuf::from("/p/lib/server"), PathBuf::from("/p/lib/client")]
    );
    Ok(())
}

#[tokio::test]
async fn shared_dependencies_run_once_in_run_all() -> TestResult {
    let fx = Fixture::new();
    fx.fs.add_file("/p/client/app.ts", "boot();");
    let mut graph = fx.graph();

    let runs = Arc::new(Mutex::new(0usize));
    {
        let runs = Arc::clone(&runs);
        graph.register_external("lint", Vec::new(), move || {
            let runs = Arc::clone(&runs);
            async move {
                *runs.lock().unwrap() += 1;
                Ok(())
            }
        });
    }
    let a = graph.register(TaskConfigBuilder::new("**/*.js", "chat", "lib/a").prefix("a").depends_on("lint").build())?;
    let b = graph.register(TaskConfigBuilder::new("**/*.ts", "client", "lib/b").prefix("b").depends_on("lint").build())?;

    graph
        .run_all(&[a.transform, b.transform], &mut WatcherRegistry::new())
        .await?;

    assert_eq!(*runs.lock().unwrap(), 1);
    assert_eq!(fx.fake.call_count(), 2);
    Ok(())
}

#[tokio::test]
async fn failing_dependency_stops_the_run() -> TestResult {
    let fx = Fixture::new();
    let mut graph = fx.graph();
    graph.register_external("lint", Vec::new(), || async {
        Err(BuildError::config("lint found problems"))
    });
    let names = graph.register(TaskConfigBuilder::new("**/*.js", "chat", "lib").depends_on("lint").build())?;

    let err = graph
        .run(&names.transform, &mut WatcherRegistry::new())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("lint found problems"));
    assert_eq!(fx.fake.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn transform_failure_without_handler_fails_the_run() -> TestResult {
    let mut fx = Fixture::new();
    fx.fake = fx.fake.clone().failing_on("room", 4);
    let mut graph = fx.graph();
    let names = graph.register(TaskConfigBuilder::new("**/*.js", "chat", "lib").build())?;

    let err = graph
        .run(&names.transform, &mut WatcherRegistry::new())
        .await
        .unwrap_err();

    assert_eq!(err.exit_code(), 4);
    Ok(())
}

#[tokio::test]
async fn transform_failure_with_handler_is_reported_not_returned() -> TestResult {
    let mut fx = Fixture::new();
    fx.fake = fx.fake.clone().failing_on("room", 4);
    let seen = Arc::new(Mutex::new(0usize));
    let handler = {
        let seen = Arc::clone(&seen);
        Arc::new(move |_: &BuildError| *seen.lock().unwrap() += 1)
    };
    let mut graph = fx.graph().with_error_handler(handler);
    let names = graph.register(TaskConfigBuilder::new("**/*.js", "chat", "lib").build())?;

    graph.run(&names.transform, &mut WatcherRegistry::new()).await?;

    assert_eq!(*seen.lock().unwrap(), 1);
    Ok(())
}

#[tokio::test]
async fn re_registration_replaces_the_previous_definition() -> TestResult {
    let fx = Fixture::new();
    fx.fs.add_file("/p/chat/typed.ts", "let t: number = 1;");
    let mut graph = fx.graph();

    let first = graph.register(TaskConfigBuilder::new("**/*.js", "chat", "lib").prefix("x").build())?;
    let second = graph.register(TaskConfigBuilder::new("**/*.ts", "chat", "lib").prefix("x").build())?;
    assert_eq!(first, second);

    graph.run(&second.transform, &mut WatcherRegistry::new()).await?;

    assert_eq!(fx.fake.transformed_files(), vec![PathBuf::from("/p/chat/typed.ts")]);
    assert!(fx.fs.contents("/p/lib/logger.js").is_none());
    Ok(())
}

#[test]
fn unknown_tasks_and_dependencies_are_reported() -> TestResult {
    let fx = Fixture::new();
    let mut graph = fx.graph();
    let names = graph.register(TaskConfigBuilder::new("**/*.js", "chat", "lib").depends_on("missing").build())?;

    assert!(matches!(
        graph.execution_order("nope"),
        Err(BuildError::TaskNotFound(name)) if name == "nope"
    ));
    assert!(matches!(
        graph.execution_order(&names.transform),
        Err(BuildError::TaskNotFound(name)) if name == "missing"
    ));
    Ok(())
}

#[test]
fn dependency_cycles_are_reported() {
    let fx = Fixture::new();
    let mut graph = fx.graph();
    graph.register_external("a", vec!["b".to_string()], || async { Ok(()) });
    graph.register_external("b", vec!["c".to_string()], || async { Ok(()) });
    graph.register_external("c", vec!["a".to_string()], || async { Ok(()) });

    assert!(matches!(graph.execution_order("a"), Err(BuildError::DagCycle(_))));
}

#[tokio::test]
async fn watch_transforms_added_files_and_deletes_outputs_of_removed_ones() -> TestResult {
    let fx = Fixture::new();
    let mut graph = fx.graph();
    let names = graph.register(TaskConfigBuilder::new("**/*.js", "chat", "lib").prefix("watch").build())?;
    let mut registry = WatcherRegistry::new();

    graph.run(&names.transform, &mut registry).await?;
    let logger = fx.fs.contents("/p/lib/logger.js").expect("logger output");
    let room = fx.fs.contents("/p/lib/room/room.js").expect("room output");
    let built = fx.fake.call_count();

    graph.run(&names.watch, &mut registry).await?;
    assert!(registry.contains(&names.watch));
    assert_eq!(fx.events.subscribed_roots(), vec![PathBuf::from("/p/chat")]);

    fx.fs.add_file("/p/chat/util/extra.js", "fresh();");
    fx.events.emit(FileEvent::added("/p/chat/util/extra.js"));
    wait_until(|| fx.fs.contents("/p/lib/util/extra.js").is_some()).await;
    assert!(fx.fs.contents("/p/lib/util/extra.js.map").is_some());
    // Only the added file went through the transformer.
    assert_eq!(fx.fake.call_count(), built + 1);
    assert_eq!(
        fx.fake.requests().last().map(|r| r.files.clone()),
        Some(vec![PathBuf::from("/p/chat/util/extra.js")])
    );

    fx.fs.remove_file(Path::new("/p/chat/util/extra.js"))?;
    fx.events.emit(FileEvent::removed("/p/chat/util/extra.js"));
    wait_until(|| {
        fx.fs.contents("/p/lib/util/extra.js").is_none()
            && fx.fs.contents("/p/lib/util/extra.js.map").is_none()
    })
    .await;

    // Nothing else under lib was touched.
    assert_eq!(fx.fs.contents("/p/lib/logger.js"), Some(logger));
    assert_eq!(fx.fs.contents("/p/lib/room/room.js"), Some(room));
    assert!(fx.fs.contents("/p/lib/logger.js.map").is_some());
    assert_eq!(fx.fake.call_count(), built + 1);
    assert_eq!(fx.notifier.count(), 0);
    Ok(())
}

#[tokio::test]
async fn watch_failures_are_notified_and_the_watcher_keeps_running() -> TestResult {
    let mut fx = Fixture::new();
    fx.fake = fx.fake.clone().failing_on("broken", 2);
    let mut graph = fx.graph();
    let names = graph.register(TaskConfigBuilder::new("**/*.js", "chat", "lib").build())?;
    let mut registry = WatcherRegistry::new();
    graph.run(&names.watch, &mut registry).await?;

    fx.fs.add_file("/p/chat/broken.js", "let = ;");
    fx.events.emit(FileEvent::changed("/p/chat/broken.js"));
    wait_until(|| fx.notifier.count() == 1).await;

    fx.events.emit(FileEvent::changed("/p/chat/logger.js"));
    wait_until(|| fx.fs.contents("/p/lib/logger.js").is_some()).await;

    assert!(registry.is_running(&names.watch));
    Ok(())
}

#[tokio::test]
async fn rerunning_a_watch_task_replaces_the_running_watcher() -> TestResult {
    let fx = Fixture::new();
    let mut graph = fx.graph();
    let names = graph.register(TaskConfigBuilder::new("**/*.js", "chat", "lib").build())?;
    let mut registry = WatcherRegistry::new();

    graph.run(&names.watch, &mut registry).await?;
    graph.run(&names.watch, &mut registry).await?;

    assert_eq!(registry.len(), 1);
    assert_eq!(fx.events.subscription_count(), 2);
    let events = fx.events.clone();
    wait_until(move || events.is_closed_at(0)).await;
    assert!(!fx.events.is_closed());
    Ok(())
}

#[tokio::test]
async fn rerunning_after_reregistration_uses_the_new_globs() -> TestResult {
    let fx = Fixture::new();
    fx.fs.add_file("/p/chat/typed.ts", "let t: number = 1;");
    let mut graph = fx.graph();
    let mut registry = WatcherRegistry::new();

    let first = graph.register(TaskConfigBuilder::new("**/*.js", "chat", "lib").prefix("x").build())?;
    graph.run(&first.watch, &mut registry).await?;

    let second = graph.register(TaskConfigBuilder::new("**/*.ts", "chat", "lib").prefix("x").build())?;
    graph.run(&second.watch, &mut registry).await?;

    let events = fx.events.clone();
    wait_until(move || events.is_closed_at(0)).await;

    fx.events.emit(FileEvent::changed("/p/chat/logger.js"));
    fx.events.emit(FileEvent::changed("/p/chat/typed.ts"));
    wait_until(|| fx.fs.contents("/p/lib/typed.js").is_some()).await;

    assert_eq!(fx.fake.transformed_files(), vec![PathBuf::from("/p/chat/typed.ts")]);
    assert!(fx.fs.contents("/p/lib/logger.js").is_none());
    assert_eq!(registry.len(), 1);
    Ok(())
}

#[tokio::test]
async fn watch_start_waits_for_readiness() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("/p/chat/logger.js", "1");
    let fake = FakeTransformer::new(Arc::new(fs.clone()));
    let events = ChannelEventSource::new();
    let pipeline = TransformPipeline::new(Arc::new(fake.clone()), Arc::new(fs.clone()));
    let mut graph = TaskGraph::new(
        pipeline,
        Arc::new(events.clone()),
        Arc::new(RecordingNotifier::new()),
    )
    .with_cwd("/p");
    let names = graph.register(TaskConfigBuilder::new("**/*.js", "chat", "lib").build())?;

    let driver = {
        let events = events.clone();
        tokio::spawn(async move {
            wait_until(|| events.subscription_count() == 1).await;
            // Startup noise before readiness must not trigger anything.
            events.emit(FileEvent::changed("/p/chat/logger.js"));
            events.ready();
        })
    };

    let mut registry = WatcherRegistry::new();
    graph.run(&names.watch, &mut registry).await?;
    driver.await?;

    assert!(registry.contains(&names.watch));
    assert_eq!(fake.call_count(), 0);
    Ok(())
}
