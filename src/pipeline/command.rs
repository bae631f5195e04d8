// src/pipeline/command.rs

//! Runs the real compiler as a child process.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::{BuildError, Result};
use crate::pipeline::transformer::{TransformRequest, Transformer};

/// Lines of compiler output kept for the error message of a failed run.
const REASON_TAIL_LINES: usize = 20;

/// [`Transformer`] that spawns `options.program` once per request.
#[derive(Debug, Clone, Default)]
pub struct CommandTransformer;

impl CommandTransformer {
    pub fn new() -> Self {
        Self
    }

    /// Arguments passed to the compiler for `request`: the files first, then
    /// the flags derived from the options, then `extra_args`.
    pub fn command_args(request: &TransformRequest) -> Vec<OsString> {
        let opts = &request.options;
        let mut args: Vec<OsString> = request.files.iter().map(|f| f.clone().into_os_string()).collect();

        args.push("--module".into());
        args.push(opts.module.clone().into());
        args.push("--target".into());
        args.push(opts.target.clone().into());
        args.push("--outDir".into());
        args.push(request.out_dir.clone().into_os_string());
        args.push("--rootDir".into());
        args.push(request.base.clone().into_os_string());

        let flags = [
            (opts.allow_js, "--allowJs"),
            (opts.no_resolve, "--noResolve"),
            (opts.source_maps, "--sourceMap"),
            (opts.experimental_decorators, "--experimentalDecorators"),
            (opts.emit_declarations, "--declaration"),
        ];
        args.extend(
            flags
                .into_iter()
                .filter(|(enabled, _)| *enabled)
                .map(|(_, flag)| OsString::from(flag)),
        );

        args.extend(opts.extra_args.iter().map(OsString::from));
        args
    }

    async fn run(&self, request: &TransformRequest) -> Result<()> {
        let program = &request.options.program;
        let file_count = request.files.len();

        info!(
            program = %program,
            files = file_count,
            base = ?request.base,
            out_dir = ?request.out_dir,
            "starting transform"
        );

        let mut cmd = Command::new(program);
        cmd.args(Self::command_args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| BuildError::TransformError {
            files: file_count,
            code: None,
            reason: format!("spawning {program:?}: {e}"),
        })?;

        // Drain both pipes so the compiler never blocks on a full buffer.
        let stdout = child.stdout.take().map(|out| spawn_line_logger(out, "stdout"));
        let stderr = child.stderr.take().map(|err| spawn_line_logger(err, "stderr"));

        let status = child.wait().await?;

        let mut tail = VecDeque::new();
        for reader in [stdout, stderr].into_iter().flatten() {
            match reader.await {
                Ok(lines) => tail.extend(lines),
                Err(e) => debug!(error = %e, "output reader task failed"),
            }
        }
        while tail.len() > REASON_TAIL_LINES {
            tail.pop_front();
        }

        let code = status.code();
        info!(
            program = %program,
            exit_code = ?code,
            success = status.success(),
            "transform process exited"
        );

        if status.success() {
            return Ok(());
        }

        let reason = if tail.is_empty() {
            format!("{program} exited with {status}")
        } else {
            Vec::from(tail).join("\n")
        };
        Err(BuildError::TransformError {
            files: file_count,
            code,
            reason,
        })
    }
}

impl Transformer for CommandTransformer {
    fn transform<'a>(
        &'a self,
        request: &'a TransformRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(self.run(request))
    }
}

/// Log every line of a child pipe and hand back the last few of them.
fn spawn_line_logger<R>(reader: R, stream: &'static str) -> JoinHandle<VecDeque<String>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        let mut tail = VecDeque::with_capacity(REASON_TAIL_LINES);

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    info!(stream, "{}", line);
                    if tail.len() == REASON_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(stream, error = %e, "failed to read compiler output");
                    break;
                }
            }
        }
        tail
    })
}
