// Tests for the external encoder invocation

mod common;

use anyhow::Result;
use std::path::PathBuf;
use webcam_recorder::ingest::{CommandEncoder, EncodeError, EncodeJob, Encoder, EncoderProfile};

fn reencode() -> EncodeJob {
    EncodeJob::Reencode {
        input: PathBuf::from("/tmp/uploads/in-video.webm"),
        output: PathBuf::from("/tmp/uploads/out.webm"),
    }
}

fn mux() -> EncodeJob {
    EncodeJob::Mux {
        audio: PathBuf::from("/tmp/uploads/in-audio.wav"),
        video: PathBuf::from("/tmp/uploads/in-video.webm"),
        output: PathBuf::from("/tmp/uploads/out.webm"),
    }
}

#[test]
fn test_reencode_command_line() {
    let encoder = CommandEncoder::new("avconv", EncoderProfile::default());
    assert_eq!(
        encoder.command_line(&reencode()),
        "avconv -i /tmp/uploads/in-video.webm -c:v libvpx -crf 30 -b:v 512k \
         -c:a libvorbis -ac 1 /tmp/uploads/out.webm"
    );
}

#[test]
fn test_mux_command_line() {
    let encoder = CommandEncoder::new("avconv", EncoderProfile::default());
    assert_eq!(
        encoder.command_line(&mux()),
        "avconv -i /tmp/uploads/in-audio.wav -i /tmp/uploads/in-video.webm \
         -map 0:a:0 -map 1:v:0 /tmp/uploads/out.webm"
    );
}

#[test]
fn test_profile_flags_are_configurable() {
    let profile = EncoderProfile {
        video_codec: "libvpx-vp9".to_string(),
        crf: 33,
        video_bitrate: "1M".to_string(),
        audio_codec: "libopus".to_string(),
        audio_channels: 2,
    };
    let encoder = CommandEncoder::new("ffmpeg", profile);

    let args = encoder.args(&reencode());
    assert_eq!(args[0], "-i");
    assert!(args.windows(2).any(|w| w == ["-c:v", "libvpx-vp9"]));
    assert!(args.windows(2).any(|w| w == ["-crf", "33"]));
    assert!(args.windows(2).any(|w| w == ["-b:v", "1M"]));
    assert!(args.windows(2).any(|w| w == ["-c:a", "libopus"]));
    assert!(args.windows(2).any(|w| w == ["-ac", "2"]));
    assert_eq!(args.last().map(String::as_str), Some("/tmp/uploads/out.webm"));
    assert_eq!(encoder.name(), "ffmpeg");
}

#[tokio::test]
async fn test_missing_program_fails_to_spawn() -> Result<()> {
    let encoder = CommandEncoder::new("no-such-encoder-binary", EncoderProfile::default());

    let err = encoder.encode(&mux()).await.unwrap_err();
    assert!(matches!(err, EncodeError::Spawn { .. }));
    assert_eq!(err.command(), encoder.command_line(&mux()));

    assert!(encoder.probe().await.is_err());

    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_nonzero_exit_reports_command_and_code() -> Result<()> {
    let encoder = CommandEncoder::new("false", EncoderProfile::default());

    let err = encoder.encode(&reencode()).await.unwrap_err();
    match &err {
        EncodeError::Failed { command, code } => {
            assert_eq!(command, &encoder.command_line(&reencode()));
            assert_eq!(*code, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        err.to_string(),
        format!(
            "File conversion failed with command {} and returned 1",
            encoder.command_line(&reencode())
        )
    );

    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_zero_exit_is_success() -> Result<()> {
    let encoder = CommandEncoder::new("true", EncoderProfile::default());
    encoder.encode(&mux()).await?;
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_probe_requires_version_output() -> Result<()> {
    // `true` exits 0 but prints nothing
    let encoder = CommandEncoder::new("true", EncoderProfile::default());
    assert!(encoder.probe().await.is_err());

    let encoder = CommandEncoder::new("false", EncoderProfile::default());
    assert!(encoder.probe().await.is_err());

    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_handler_with_command_encoder_end_to_end() -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    use std::sync::Arc;
    use webcam_recorder::ingest::{IngestionHandler, Owner, StorageLayout, UploadRequest, UploadedPart};

    let temp_dir = tempfile::TempDir::new()?;

    // stand-in encoder: copies the first input to the last argument
    let script = temp_dir.path().join("fake-avconv");
    std::fs::write(
        &script,
        "#!/bin/sh\nin=\"$2\"\nfor out; do :; done\ncp \"$in\" \"$out\"\n",
    )?;
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))?;

    let layout = StorageLayout::new(
        temp_dir.path().join("files"),
        temp_dir.path().join("workspaces"),
        temp_dir.path().join("uploads"),
    );
    let encoder = CommandEncoder::new(script.display().to_string(), EncoderProfile::default());
    let handler = IngestionHandler::new(layout, Arc::new(encoder));

    let request = UploadRequest {
        platform: Some("firefox".to_string()),
        display_name: Some("Demo".to_string()),
        video: Some(UploadedPart::new(&b"webm-container"[..])),
        audio: None,
    };
    let descriptor = handler.ingest(request, &Owner::Workspace(11)).await?;

    assert_eq!(descriptor.size, 14);
    let stored = temp_dir.path().join("workspaces").join(&descriptor.hash_name);
    assert_eq!(std::fs::read(stored)?, b"webm-container");
    assert!(common::files_in(&temp_dir.path().join("uploads")).is_empty());

    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_abandoned_ingest_still_finishes_and_cleans_up() -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    use std::sync::Arc;
    use std::time::Duration;
    use webcam_recorder::ingest::{IngestionHandler, Owner, StorageLayout, UploadRequest, UploadedPart};

    let temp_dir = tempfile::TempDir::new()?;

    // slow stand-in encoder: outlives the caller's patience
    let script = temp_dir.path().join("slow-avconv");
    std::fs::write(
        &script,
        "#!/bin/sh\nsleep 1\nin=\"$2\"\nfor out; do :; done\ncp \"$in\" \"$out\"\n",
    )?;
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))?;

    let uploads = temp_dir.path().join("uploads");
    let stored = temp_dir.path().join("workspaces").join("WORKSPACE_12");
    let layout = StorageLayout::new(
        temp_dir.path().join("files"),
        temp_dir.path().join("workspaces"),
        uploads.clone(),
    );
    let encoder = CommandEncoder::new(script.display().to_string(), EncoderProfile::default());
    let handler = IngestionHandler::new(layout, Arc::new(encoder));

    let request = UploadRequest {
        platform: Some("firefox".to_string()),
        display_name: Some("Walkaway".to_string()),
        video: Some(UploadedPart::new(&b"webm-container"[..])),
        audio: None,
    };

    // the caller gives up while the encoder is still running
    let abandoned = tokio::time::timeout(
        Duration::from_millis(200),
        handler.ingest(request, &Owner::Workspace(12)),
    )
    .await;
    assert!(abandoned.is_err());

    for _ in 0..50 {
        if common::files_in(&stored).len() == 1 && common::files_in(&uploads).is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    assert!(common::files_in(&uploads).is_empty(), "no leftovers in the holding area");
    let files = common::files_in(&stored);
    assert_eq!(files.len(), 1);
    assert_eq!(std::fs::read(&files[0])?, b"webm-container");

    Ok(())
}
