use std::{
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use async_trait::async_trait;
use voxgate_config::TranscoderConfig;

use crate::error::{Result, VoiceError};

/// How much of the transcoder's stderr is kept for error messages
const STDERR_TAIL_BYTES: usize = 512;

/// Converts an uploaded container into a PCM waveform
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Convert `input` to a waveform at `output`, waiting for completion
    async fn convert(&self, input: &Path, output: &Path) -> Result<()>;
}

/// Runs an external transcoder (ffmpeg by default) as a child process
#[derive(Debug, Clone)]
pub struct CommandTranscoder {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandTranscoder {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &TranscoderConfig) -> Result<Self> {
        let timeout = config
            .timeout_duration()
            .map_err(|e| VoiceError::ConfigError(e.to_string()))?;

        let args = config.args.clone().unwrap_or_else(|| ffmpeg_args(config));

        Ok(Self::new(config.program.clone(), args, timeout))
    }

    fn expand_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();

        self.args
            .iter()
            .map(|arg| arg.replace("{input}", &input).replace("{output}", &output))
            .collect()
    }
}

/// Argument list for a plain ffmpeg conversion to 16-bit PCM WAV
fn ffmpeg_args(config: &TranscoderConfig) -> Vec<String> {
    let mut args: Vec<String> = ["-hide_banner", "-loglevel", "error", "-nostdin", "-y", "-i", "{input}"]
        .into_iter()
        .map(String::from)
        .collect();

    if let Some(channels) = config.channels {
        args.extend(["-ac".to_string(), channels.to_string()]);
    }

    if let Some(sample_rate) = config.sample_rate {
        args.extend(["-ar".to_string(), sample_rate.to_string()]);
    }

    args.extend(["-c:a", "pcm_s16le", "{output}"].map(String::from));
    args
}

#[async_trait]
impl Transcoder for CommandTranscoder {
    async fn convert(&self, input: &Path, output: &Path) -> Result<()> {
        let args = self.expand_args(input, output);

        tracing::debug!(program = %self.program.display(), ?args, "starting transcoder");

        let child = tokio::process::Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                tracing::error!(program = %self.program.display(), "failed to start transcoder: {e}");
                VoiceError::TranscoderUnavailable(format!("{}: {e}", self.program.display()))
            })?;

        // Dropping the child on timeout kills it
        let Ok(finished) = tokio::time::timeout(self.timeout, child.wait_with_output()).await else {
            tracing::error!(timeout = ?self.timeout, "transcoder timed out");
            return Err(VoiceError::TranscodeFailed("timeout".to_string()));
        };

        let finished = finished?;

        if !finished.status.success() {
            let stderr = stderr_tail(&finished.stderr);
            tracing::error!(status = %finished.status, %stderr, "transcoder failed");
            return Err(VoiceError::TranscodeFailed(format!("{}: {stderr}", finished.status)));
        }

        if !tokio::fs::try_exists(output).await? {
            return Err(VoiceError::TranscodeFailed("transcoder produced no output".to_string()));
        }

        tracing::debug!("conversion completed");

        Ok(())
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let start = stderr.len().saturating_sub(STDERR_TAIL_BYTES);
    String::from_utf8_lossy(&stderr[start..]).trim().to_string()
}
