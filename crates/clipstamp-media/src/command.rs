//! Engine command building and supervised execution.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};
use crate::plan::RenderPlan;
use crate::progress::parse_out_time_us;

/// A fully-resolved engine invocation.
#[derive(Debug, Clone)]
pub struct EngineCommand {
    program: String,
    plan: RenderPlan,
    output: PathBuf,
}

impl EngineCommand {
    /// Pair a compiled plan with the engine program and output path.
    pub fn new(program: impl Into<String>, plan: RenderPlan, output: impl AsRef<Path>) -> Self {
        Self {
            program: program.into(),
            plan,
            output: output.as_ref().to_path_buf(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Build the full argument list.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            "-nostdin".to_string(),
            "-y".to_string(),
            "-v".to_string(),
            "error".to_string(),
            // Machine-readable progress on stderr, interleaved with errors.
            "-progress".to_string(),
            "pipe:2".to_string(),
        ];

        for input in &self.plan.inputs {
            args.extend(input.pre_args.iter().cloned());
            args.push("-i".to_string());
            args.push(input.path.to_string_lossy().to_string());
        }

        args.push("-filter_complex".to_string());
        args.push(self.plan.filter_complex.clone());

        args.extend(self.plan.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Runs engine commands, forwarding processed-time markers and enforcing an
/// optional timeout.
pub struct EngineRunner {
    timeout_secs: Option<u64>,
}

impl Default for EngineRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineRunner {
    pub fn new() -> Self {
        Self { timeout_secs: None }
    }

    /// Kill the engine and fail the render after `secs` seconds. Zero
    /// disables the timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = (secs > 0).then_some(secs);
        self
    }

    /// Run a command to completion, invoking `on_out_time` with each
    /// processed-time marker (microseconds) the engine reports.
    pub async fn run_with_progress<F>(&self, cmd: &EngineCommand, on_out_time: F) -> MediaResult<()>
    where
        F: Fn(i64) + Send + 'static,
    {
        which::which(cmd.program()).map_err(|_| MediaError::FfmpegNotFound)?;

        let args = cmd.build_args();
        debug!(program = cmd.program(), "Launching engine: {}", args.join(" "));

        let mut child = Command::new(cmd.program())
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::ffmpeg_failed("stderr not captured", None))?;
        let mut lines = BufReader::new(stderr).lines();

        let reader = tokio::spawn(async move {
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(us) = parse_out_time_us(&line) {
                    on_out_time(us);
                }
            }
        });

        let result = self.wait_for_exit(&mut child).await;
        let _ = reader.await;
        result
    }

    async fn wait_for_exit(&self, child: &mut Child) -> MediaResult<()> {
        let status = if let Some(timeout_secs) = self.timeout_secs {
            match tokio::time::timeout(
                std::time::Duration::from_secs(timeout_secs),
                child.wait(),
            )
            .await
            {
                Ok(status) => status?,
                Err(_) => {
                    warn!(timeout_secs, "Engine timed out, killing process");
                    let _ = child.kill().await;
                    return Err(MediaError::Timeout(timeout_secs));
                }
            }
        } else {
            child.wait().await?
        };

        if status.success() {
            Ok(())
        } else {
            Err(MediaError::ffmpeg_failed(
                "Engine exited with non-zero status",
                status.code(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{InputSpec, RenderPlan};

    fn test_plan() -> RenderPlan {
        RenderPlan {
            inputs: vec![
                InputSpec {
                    pre_args: vec!["-ss".into(), "2.000".into()],
                    path: "/u/clip.mp4".into(),
                },
                InputSpec {
                    pre_args: vec![],
                    path: "/u/track.mp3".into(),
                },
            ],
            filter_complex: "[0:v]setsar=1[v];[1:a]anull[a]".into(),
            output_args: vec!["-map".into(), "[v]".into(), "-map".into(), "[a]".into()],
        }
    }

    #[test]
    fn test_build_args_order() {
        let cmd = EngineCommand::new("ffmpeg", test_plan(), "/p/final_1.mp4");
        let args = cmd.build_args();

        let joined = args.join(" ");
        assert!(joined.starts_with("-nostdin -y -v error -progress pipe:2"));
        assert!(joined.contains("-ss 2.000 -i /u/clip.mp4 -i /u/track.mp3"));
        assert!(joined.contains("-filter_complex"));
        assert!(joined.ends_with("/p/final_1.mp4"));

        // Seek flags precede their input, filter precedes output args
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let first_i = args.iter().position(|a| a == "-i").unwrap();
        assert!(ss < first_i);
    }

    #[test]
    fn test_zero_timeout_disables() {
        let runner = EngineRunner::new().with_timeout(0);
        assert!(runner.timeout_secs.is_none());

        let runner = EngineRunner::new().with_timeout(30);
        assert_eq!(runner.timeout_secs, Some(30));
    }

    #[tokio::test]
    async fn test_timeout_kills_slow_engine() {
        use std::os::unix::fs::PermissionsExt;

        // Stub engine that ignores its arguments and outlives the timeout.
        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("slow-engine");
        std::fs::write(&script, "#!/bin/sh\nsleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let cmd = EngineCommand::new(
            script.to_string_lossy(),
            test_plan(),
            dir.path().join("final_1.mp4"),
        );
        let runner = EngineRunner::new().with_timeout(1);

        let err = runner
            .run_with_progress(&cmd, |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Timeout(1)));
    }
}
