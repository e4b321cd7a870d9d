//! Subprocess model backend.
//!
//! Runs a configured command once per chat call. The request is written as
//! JSON to `logs/EXEC-<n>/request.json` and piped to the child's stdin; the
//! child's stdout is the response. Output is captured to `stdout.log` and
//! `stderr.log` next to the request. Stderr is read through a pipe and
//! redacted before it reaches disk.
//!
//! Command templates support `{model}`, `{execution_id}` and `{request_file}`:
//!
//! ```yaml
//! backend:
//!   command: "llm -m {model} --request {request_file}"
//!   timeout_seconds: 120
//! ```

use super::{ChatRequest, ModelBackend};
use crate::config::Config;
use crate::context::StoreContext;
use crate::error::{AgentryError, Result};
use crate::fs::atomic_write_json;
use crate::prompt::render_template;
use crate::sanitize::redact;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Lines of stderr carried into a backend error.
const STDERR_TAIL_LINES: usize = 20;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Backend that shells out to a command per call.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    command: String,
    timeout: Duration,
    environment: HashMap<String, String>,
    ctx: StoreContext,
}

impl CommandBackend {
    pub fn new(command: impl Into<String>, timeout: Duration, ctx: StoreContext) -> Self {
        Self {
            command: command.into(),
            timeout,
            environment: HashMap::new(),
            ctx,
        }
    }

    /// Extra environment variables for the child process.
    pub fn with_environment(mut self, environment: HashMap<String, String>) -> Self {
        self.environment = environment;
        self
    }

    /// Build the backend described by `config.backend`.
    pub fn from_config(config: &Config, ctx: &StoreContext) -> Result<Self> {
        let command = config.backend.command.clone().ok_or_else(|| {
            AgentryError::UserError(format!(
                "no model backend configured.\n\
                 Set backend.command in {}, e.g.:\n\n\
                 backend:\n  command: \"llm -m {{model}}\"",
                ctx.config_path().display()
            ))
        })?;

        Ok(Self::new(
            command,
            Duration::from_secs(config.backend.timeout_seconds),
            ctx.clone(),
        )
        .with_environment(config.backend.environment.clone()))
    }

    fn render_command(&self, request: &ChatRequest, request_file: &Path) -> Result<Vec<String>> {
        let variables: BTreeMap<String, Value> = BTreeMap::from([
            ("model".to_string(), json!(request.model)),
            ("execution_id".to_string(), json!(request.execution_id)),
            (
                "request_file".to_string(),
                json!(request_file.display().to_string()),
            ),
        ]);

        let command_str = render_template(&self.command, &variables).map_err(|e| {
            AgentryError::BackendError(format!(
                "backend command template is invalid: {}\nCommand: {}\nAvailable variables: model, execution_id, request_file",
                e, self.command
            ))
        })?;

        let args = shell_words::split(&command_str).map_err(|e| {
            AgentryError::BackendError(format!(
                "failed to parse backend command '{}': {}",
                command_str, e
            ))
        })?;

        if args.is_empty() {
            return Err(AgentryError::BackendError(format!(
                "backend command is empty after parsing: '{}'",
                command_str
            )));
        }

        Ok(args)
    }
}

impl ModelBackend for CommandBackend {
    fn chat(&self, request: &ChatRequest) -> Result<String> {
        let logs_dir = self.ctx.execution_logs_dir(request.execution_id);
        fs::create_dir_all(&logs_dir).map_err(|e| {
            AgentryError::BackendError(format!(
                "failed to create backend logs directory '{}': {}",
                logs_dir.display(),
                e
            ))
        })?;

        let request_file = logs_dir.join("request.json");
        atomic_write_json(&request_file, request)?;
        let payload = serde_json::to_vec(request).map_err(|e| {
            AgentryError::BackendError(format!("failed to serialize chat request: {}", e))
        })?;

        let args = self.render_command(request, &request_file)?;
        let stdout_path = logs_dir.join("stdout.log");
        let stderr_path = logs_dir.join("stderr.log");

        let mut command = Command::new(&args[0]);
        command
            .args(&args[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::from(create_log(&stdout_path)?))
            .stderr(Stdio::piped());
        if self.ctx.project_root.is_dir() {
            command.current_dir(&self.ctx.project_root);
        }
        for (key, value) in &self.environment {
            command.env(key, value);
        }

        let started = Instant::now();
        let mut child = command.spawn().map_err(|e| {
            AgentryError::BackendError(format!(
                "failed to execute backend command '{}': {}\n\
                 Fix: ensure the command is installed and in PATH.",
                args[0], e
            ))
        })?;

        // Feed stdin from a thread so a child that never reads cannot block us.
        let writer = child.stdin.take().map(|mut stdin| {
            thread::spawn(move || {
                let _ = stdin.write_all(&payload);
            })
        });

        let reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = stderr.read_to_end(&mut buf);
                buf
            })
        });

        let outcome = wait_with_timeout(&mut child, self.timeout);
        if let Some(writer) = writer {
            let _ = writer.join();
        }
        let stderr = reader
            .and_then(|r| r.join().ok())
            .map(|buf| redact(&String::from_utf8_lossy(&buf)))
            .unwrap_or_default();
        write_log(&stderr_path, &stderr)?;
        let (exit_code, timed_out) = outcome?;

        tracing::debug!(
            execution = request.execution_id,
            command = %args[0],
            exit_code = ?exit_code,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "backend process finished"
        );

        if timed_out {
            return Err(AgentryError::BackendError(format!(
                "backend timed out after {} seconds",
                self.timeout.as_secs()
            )));
        }

        if exit_code != Some(0) {
            let code = exit_code.map_or("signal".to_string(), |c| c.to_string());
            let tail = stderr_tail(&stderr);
            return Err(AgentryError::BackendError(if tail.is_empty() {
                format!("backend exited with exit code {}", code)
            } else {
                format!("backend exited with exit code {}: {}", code, tail)
            }));
        }

        let output = fs::read_to_string(&stdout_path).map_err(|e| {
            AgentryError::BackendError(format!(
                "failed to read backend output '{}': {}",
                stdout_path.display(),
                e
            ))
        })?;

        let response = output.trim();
        if response.is_empty() {
            return Err(AgentryError::BackendError(
                "backend returned an empty response".to_string(),
            ));
        }

        Ok(response.to_string())
    }
}

fn write_log(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).map_err(|e| {
        AgentryError::BackendError(format!(
            "failed to write backend log '{}': {}",
            path.display(),
            e
        ))
    })
}

fn create_log(path: &Path) -> Result<File> {
    File::create(path).map_err(|e| {
        AgentryError::BackendError(format!(
            "failed to create backend log '{}': {}",
            path.display(),
            e
        ))
    })
}

/// Wait for a child process with timeout.
///
/// Returns (exit_code, timed_out).
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<(Option<i32>, bool)> {
    let start = Instant::now();

    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok((status.code(), false)),
            Ok(None) => {
                if start.elapsed() >= timeout {
                    // SIGKILL on Unix, TerminateProcess on Windows.
                    let _ = child.kill();
                    let _ = child.wait();
                    return Ok((None, true));
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                return Err(AgentryError::BackendError(format!(
                    "failed to check backend process status: {}",
                    e
                )));
            }
        }
    }
}

/// Last lines of captured stderr, joined into one line.
fn stderr_tail(content: &str) -> String {
    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join(" | ")
}
