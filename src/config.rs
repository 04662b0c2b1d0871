use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::capture::CaptureConfig;
use crate::ingest::{EncoderProfile, StorageLayout};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub encoder: EncoderConfig,
    #[serde(default)]
    pub capture: CaptureSettings,
    /// Translation overrides (message key → text)
    #[serde(default)]
    pub messages: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root of per-user storage directories
    pub files_dir: String,
    /// Root of per-workspace storage directories
    pub workspaces_dir: String,
    /// Shared temporary holding area for staged uploads
    pub uploads_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EncoderConfig {
    #[serde(default = "default_encoder_program")]
    pub program: String,
    #[serde(default = "default_video_codec")]
    pub video_codec: String,
    #[serde(default = "default_crf")]
    pub crf: u32,
    #[serde(default = "default_video_bitrate")]
    pub video_bitrate: String,
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,
    #[serde(default = "default_audio_channels")]
    pub audio_channels: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureSettings {
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_timeslice_ms")]
    pub timeslice_ms: u64,
    /// 0 means unlimited
    #[serde(default)]
    pub max_recording_secs: u64,
}

fn default_max_upload_bytes() -> usize {
    512 * 1024 * 1024
}

fn default_encoder_program() -> String {
    "avconv".to_string()
}

fn default_video_codec() -> String {
    "libvpx".to_string()
}

fn default_crf() -> u32 {
    30
}

fn default_video_bitrate() -> String {
    "512k".to_string()
}

fn default_audio_codec() -> String {
    "libvorbis".to_string()
}

fn default_audio_channels() -> u16 {
    1
}

fn default_settle_delay_ms() -> u64 {
    1000
}

fn default_timeslice_ms() -> u64 {
    10
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            program: default_encoder_program(),
            video_codec: default_video_codec(),
            crf: default_crf(),
            video_bitrate: default_video_bitrate(),
            audio_codec: default_audio_codec(),
            audio_channels: default_audio_channels(),
        }
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            timeslice_ms: default_timeslice_ms(),
            max_recording_secs: 0,
        }
    }
}

impl Config {
    /// Load from a config file (extension optional) with `WEBCAM_RECORDER__*` overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("WEBCAM_RECORDER").separator("__"))
            .build()
            .with_context(|| format!("Failed to read config from {}", path))?;

        Ok(settings.try_deserialize()?)
    }

    pub fn storage_layout(&self) -> StorageLayout {
        StorageLayout::new(
            expand(&self.storage.files_dir),
            expand(&self.storage.workspaces_dir),
            expand(&self.storage.uploads_dir),
        )
    }

    pub fn encoder_profile(&self) -> EncoderProfile {
        EncoderProfile {
            video_codec: self.encoder.video_codec.clone(),
            crf: self.encoder.crf,
            video_bitrate: self.encoder.video_bitrate.clone(),
            audio_codec: self.encoder.audio_codec.clone(),
            audio_channels: self.encoder.audio_channels,
        }
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig::from(&self.capture)
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}
