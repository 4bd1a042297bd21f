//! FFprobe duration probing.
//!
//! Only the container duration is needed here: the audio track is
//! authoritative for the whole render's timing, so the supervisor probes the
//! audio upload before compiling a plan.

use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{MediaError, MediaResult};

/// FFprobe JSON output, reduced to what we read.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Probe a media file's duration in seconds.
///
/// `ffprobe_bin` is the program to invoke, normally `ffprobe`; tests and
/// deployments with a non-PATH install override it.
pub async fn probe_duration(ffprobe_bin: &str, path: impl AsRef<Path>) -> MediaResult<f64> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    which::which(ffprobe_bin).map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new(ffprobe_bin)
        .args(["-v", "error", "-print_format", "json", "-show_format"])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: format!("ffprobe exited with {}", output.status),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    parse_probe_output(&output.stdout)
}

fn parse_probe_output(stdout: &[u8]) -> MediaResult<f64> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)?;

    probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| *d > 0.0)
        .ok_or(MediaError::NoDuration)
}
