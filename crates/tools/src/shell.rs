//! Shell executor: run one command with a deadline.
//!
//! The command runs through the platform shell (`sh -c`, or PowerShell on
//! Windows) in the requested working directory. On Unix the child gets its
//! own process group so a timeout can kill everything it started.

use async_trait::async_trait;
use momo_core::command::{CommandRequest, CommandRunner};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Extra time the caller waits past the command's own timeout.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(5);

/// Runs commands through the platform shell.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    grace: Duration,
}

impl ShellExecutor {
    pub fn new() -> Self {
        Self {
            grace: DEFAULT_GRACE,
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for ShellExecutor {
    async fn run(&self, request: CommandRequest) -> String {
        let outer = request.timeout + self.grace;
        let command = request.command.clone();
        let mut task = tokio::spawn(execute(request));

        match tokio::time::timeout(outer, &mut task).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => format!("Error: failed to run command: {e}"),
            Err(_) => {
                // Dropping the child inside the task kills it.
                task.abort();
                warn!(command = %command, secs = outer.as_secs(), "Command abandoned");
                format!(
                    "Command did not finish within {}s and was terminated",
                    outer.as_secs()
                )
            }
        }
    }
}

async fn execute(request: CommandRequest) -> String {
    if let Some(dir) = &request.working_dir {
        if !dir.is_dir() {
            return format!("Error: directory \"{}\" does not exist", dir.display());
        }
    }

    let mut cmd = shell_command(&request.command);
    if let Some(dir) = &request.working_dir {
        cmd.current_dir(dir);
    }
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // SAFETY: setsid() is async-signal-safe and runs before exec.
    #[cfg(unix)]
    unsafe {
        cmd.pre_exec(|| {
            libc::setsid();
            Ok(())
        });
    }

    debug!(command = %request.command, dir = ?request.working_dir, "Executing shell command");

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => return format!("Error: failed to run command: {e}"),
    };
    let pid = child.id();

    match tokio::time::timeout(request.timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            let code = (!output.status.success()).then(|| output.status.code().unwrap_or(-1));
            if let Some(code) = code {
                warn!(command = %request.command, exit_code = code, "Command failed");
            }
            format_output(&stdout, &stderr, code)
        }
        Ok(Err(e)) => format!("Error: failed to run command: {e}"),
        Err(_) => {
            kill_group(pid);
            warn!(command = %request.command, secs = request.timeout.as_secs(), "Command timed out");
            format!("Command timed out after {}s", request.timeout.as_secs())
        }
    }
}

fn shell_command(command: &str) -> Command {
    if cfg!(target_os = "windows") {
        let mut cmd = Command::new("powershell");
        cmd.args(["-NoProfile", "-Command", command]);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    }
}

#[cfg(unix)]
fn kill_group(pid: Option<u32>) {
    if let Some(pid) = pid {
        // SAFETY: plain signal send to the group led by our own child.
        unsafe {
            libc::kill(-(pid as i32), libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: Option<u32>) {}

/// Stdout, then labelled stderr, with the exit code up front on failure.
fn format_output(stdout: &str, stderr: &str, exit_code: Option<i32>) -> String {
    let mut text = stdout.trim_end().to_string();
    if !stderr.trim().is_empty() {
        text.push_str("\n[stderr]:\n");
        text.push_str(stderr.trim_end());
    }
    if let Some(code) = exit_code {
        text = format!("[exit code: {code}]\n{text}");
    }
    if text.trim().is_empty() {
        "(no output)".to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn request(command: &str) -> CommandRequest {
        CommandRequest::new(command, Duration::from_secs(10))
    }

    #[test]
    fn format_success() {
        assert_eq!(format_output("hello\n", "", None), "hello");
    }

    #[test]
    fn format_stderr_is_labelled() {
        assert_eq!(format_output("out\n", "warn\n", None), "out\n[stderr]:\nwarn");
    }

    #[test]
    fn format_failure_has_exit_code_first() {
        let text = format_output("", "boom\n", Some(2));
        assert!(text.starts_with("[exit code: 2]"));
        assert!(text.contains("boom"));
    }

    #[test]
    fn format_empty_output() {
        assert_eq!(format_output("", "  \n", None), "(no output)");
    }

    #[tokio::test]
    async fn missing_directory_is_reported() {
        let exec = ShellExecutor::new();
        let output = exec
            .run(request("echo hi").in_dir("/definitely/not/a/real/dir"))
            .await;
        assert!(output.contains("does not exist"), "{output}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn echo_runs() {
        let output = ShellExecutor::new().run(request("echo hello")).await;
        assert_eq!(output, "hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();
        let output = ShellExecutor::new()
            .run(request("ls").in_dir(&dir.path().display().to_string()))
            .await;
        assert!(output.contains("marker.txt"), "{output}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_is_reported() {
        let output = ShellExecutor::new()
            .run(request("echo oops >&2; exit 3"))
            .await;
        assert!(output.starts_with("[exit code: 3]"), "{output}");
        assert!(output.contains("[stderr]:\noops"), "{output}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn silent_command_says_no_output() {
        let output = ShellExecutor::new().run(request("true")).await;
        assert_eq!(output, "(no output)");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_command_times_out() {
        let started = Instant::now();
        let output = ShellExecutor::new()
            .run(CommandRequest::new("sleep 30", Duration::from_secs(1)))
            .await;
        assert_eq!(output, "Command timed out after 1s");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_kills_background_children() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("late.txt");
        let cmd = format!("(sleep 2; touch '{}') & sleep 30", marker.display());
        let output = ShellExecutor::new()
            .run(CommandRequest::new(cmd, Duration::from_secs(1)))
            .await;
        assert!(output.contains("timed out"), "{output}");

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!marker.exists());
    }
}
