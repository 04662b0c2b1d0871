use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

/// Codec and quality flags for the single-stream re-encode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderProfile {
    pub video_codec: String,
    pub crf: u32,
    pub video_bitrate: String,
    pub audio_codec: String,
    pub audio_channels: u16,
}

impl Default for EncoderProfile {
    fn default() -> Self {
        Self {
            video_codec: "libvpx".to_string(),
            crf: 30,
            video_bitrate: "512k".to_string(),
            audio_codec: "libvorbis".to_string(),
            audio_channels: 1,
        }
    }
}

/// One encoder invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeJob {
    /// Re-encode an already-muxed container to the target profile
    Reencode { input: PathBuf, output: PathBuf },
    /// Mux separately recorded audio and video into one container
    Mux {
        audio: PathBuf,
        video: PathBuf,
        output: PathBuf,
    },
}

impl EncodeJob {
    pub fn output(&self) -> &Path {
        match self {
            EncodeJob::Reencode { output, .. } | EncodeJob::Mux { output, .. } => output,
        }
    }
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("File conversion failed with command {command} and returned {code}")]
    Failed { command: String, code: i32 },

    #[error("File conversion with command {command} was terminated by a signal")]
    Terminated { command: String },

    #[error("Failed to run encoder command {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

impl EncodeError {
    /// The full command line that was invoked
    pub fn command(&self) -> &str {
        match self {
            EncodeError::Failed { command, .. }
            | EncodeError::Terminated { command }
            | EncodeError::Spawn { command, .. } => command,
        }
    }
}

/// External encode/merge step
#[async_trait::async_trait]
pub trait Encoder: Send + Sync {
    /// Run the job to completion; the output file exists on success
    async fn encode(&self, job: &EncodeJob) -> Result<(), EncodeError>;

    /// Encoder name for logging
    fn name(&self) -> &str;
}

/// Runs `avconv`/`ffmpeg` as a child process
pub struct CommandEncoder {
    program: String,
    profile: EncoderProfile,
}

impl CommandEncoder {
    pub fn new(program: impl Into<String>, profile: EncoderProfile) -> Self {
        Self {
            program: program.into(),
            profile,
        }
    }

    /// Arguments for a job, in invocation order
    pub fn args(&self, job: &EncodeJob) -> Vec<String> {
        match job {
            EncodeJob::Reencode { input, output } => vec![
                "-i".to_string(),
                input.display().to_string(),
                "-c:v".to_string(),
                self.profile.video_codec.clone(),
                "-crf".to_string(),
                self.profile.crf.to_string(),
                "-b:v".to_string(),
                self.profile.video_bitrate.clone(),
                "-c:a".to_string(),
                self.profile.audio_codec.clone(),
                "-ac".to_string(),
                self.profile.audio_channels.to_string(),
                output.display().to_string(),
            ],
            // first audio stream of the audio part, first video stream of the video part
            EncodeJob::Mux {
                audio,
                video,
                output,
            } => vec![
                "-i".to_string(),
                audio.display().to_string(),
                "-i".to_string(),
                video.display().to_string(),
                "-map".to_string(),
                "0:a:0".to_string(),
                "-map".to_string(),
                "1:v:0".to_string(),
                output.display().to_string(),
            ],
        }
    }

    /// Command line as reported in diagnostics
    pub fn command_line(&self, job: &EncodeJob) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args(job));
        parts.join(" ")
    }

    /// Check that the encoder binary runs (`<program> -version` exits 0 with output)
    pub async fn probe(&self) -> anyhow::Result<String> {
        let output = Command::new(&self.program)
            .arg("-version")
            .output()
            .await
            .map_err(|e| anyhow::anyhow!("{} is not installed: {}", self.program, e))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() || stdout.trim().is_empty() {
            anyhow::bail!("{} is not installed", self.program);
        }

        Ok(stdout.lines().next().unwrap_or_default().to_string())
    }
}

#[async_trait::async_trait]
impl Encoder for CommandEncoder {
    async fn encode(&self, job: &EncodeJob) -> Result<(), EncodeError> {
        let command = self.command_line(job);
        info!("Running encoder: {}", command);

        let output = Command::new(&self.program)
            .args(self.args(job))
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| EncodeError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.stderr.is_empty() {
            debug!("Encoder stderr: {}", String::from_utf8_lossy(&output.stderr));
        }

        match output.status.code() {
            Some(0) => Ok(()),
            Some(code) => Err(EncodeError::Failed { command, code }),
            None => Err(EncodeError::Terminated { command }),
        }
    }

    fn name(&self) -> &str {
        &self.program
    }
}
