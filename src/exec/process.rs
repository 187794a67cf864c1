// src/exec/process.rs

//! Individual tool process runner.

use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::backend::RunOutput;
use super::invocation::ModuleInvocation;

/// Run the tool for one module and wait for it to exit.
///
/// - stdout is forwarded line by line to our stdout, prefixed with the
///   module id, so concurrent modules stay readable.
/// - stderr is always captured for diagnostics, and mirrored live to our
///   stderr when `mirror_stderr` is set.
/// - Invalid UTF-8 is replaced rather than ending the stream early.
///
/// The process is never killed from here; cancellation only stops new
/// modules from starting.
pub async fn run_process(invocation: ModuleInvocation) -> Result<RunOutput> {
    info!(
        module = %invocation.module_id,
        program = %invocation.program,
        args = ?invocation.args,
        "starting module"
    );

    if let Some(parent) = invocation.output_path.as_deref().and_then(|p| p.parent()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating output directory {:?}", parent))?;
    }

    let mut cmd = Command::new(&invocation.program);
    cmd.args(&invocation.args)
        .current_dir(&invocation.working_dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(if invocation.inherit_stdin {
            Stdio::inherit()
        } else {
            Stdio::null()
        });

    let mut child = cmd.spawn().with_context(|| {
        format!(
            "spawning '{}' for module '{}' in {:?}",
            invocation.program, invocation.module_id, invocation.working_dir
        )
    })?;

    let prefix = format!("[{}] ", invocation.module_id);

    let stdout_task = child.stdout.take().map(|stdout| {
        let prefix = prefix.clone();
        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout);
            let mut buf = Vec::new();
            while let Some(line) = next_line(&mut reader, &mut buf).await {
                println!("{prefix}{line}");
            }
        })
    });

    let stderr_task = child
        .stderr
        .take()
        .map(|stderr| capture_lines(stderr, prefix, invocation.mirror_stderr));

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for tool in module '{}'", invocation.module_id))?;

    if let Some(handle) = stdout_task {
        let _ = handle.await;
    }
    let stderr = match stderr_task {
        Some(handle) => handle.await.unwrap_or_default(),
        None => String::new(),
    };

    let code = status.code();
    info!(
        module = %invocation.module_id,
        exit_code = ?code,
        success = status.success(),
        "module process exited"
    );

    Ok(RunOutput {
        success: status.success(),
        exit_code: code,
        stderr,
    })
}

/// Collect a stream into a string, optionally echoing each line to stderr.
fn capture_lines<R>(reader: R, prefix: String, mirror: bool) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut captured = String::new();
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();

        while let Some(line) = next_line(&mut reader, &mut buf).await {
            if mirror {
                eprintln!("{prefix}{line}");
            } else {
                debug!("{prefix}stderr: {line}");
            }
            captured.push_str(&line);
            captured.push('\n');
        }

        captured
    })
}

/// Next line without its terminator, decoded lossily. `None` at end of
/// stream or on a read error.
async fn next_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> Option<String>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    match reader.read_until(b'\n', buf).await {
        Ok(0) | Err(_) => None,
        Ok(_) => {
            let bytes: &[u8] = buf;
            let line = bytes.strip_suffix(b"\n").unwrap_or(bytes);
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            Some(String::from_utf8_lossy(line).into_owned())
        }
    }
}
