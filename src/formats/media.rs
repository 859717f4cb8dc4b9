//! Media probing and transcoding via the external ffmpeg toolchain.
//!
//! The rest of the crate only sees the [`MediaTool`] contract; the concrete
//! [`FfmpegTool`] shells out to `ffprobe`/`ffmpeg` and surfaces their stderr
//! in error messages. No timeout wraps these invocations; an unresponsive
//! tool stalls the request.

use std::path::Path;
use std::process::Command;

use serde::Deserialize;
use tracing::error;

use crate::error::ProcessingError;

/// Probed stream/container facts. Ephemeral; recomputed per call.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaMetadata {
    pub audio_codec: Option<String>,
    pub duration: f64,
}

/// How segment and audio-track extraction should treat the audio stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentMode {
    /// Stream copy: fast and lossless, no re-encode.
    Copy,
    /// Re-encode to the canonical lossy codec at a fixed bitrate.
    Reencode,
}

/// The media probing/transcoding tool contract.
pub trait MediaTool: Send + Sync {
    /// Extract `{audio_codec, duration}` from a media file.
    fn probe(&self, path: &Path) -> Result<MediaMetadata, ProcessingError>;

    /// Emit one segment covering `[start, start + duration)` of the input.
    fn extract_segment(
        &self,
        input: &Path,
        start: u64,
        duration: u64,
        mode: SegmentMode,
        output: &Path,
    ) -> Result<(), ProcessingError>;

    /// Extract the audio track of a video file into a standalone audio file.
    fn extract_audio_track(
        &self,
        input: &Path,
        mode: SegmentMode,
        output: &Path,
    ) -> Result<(), ProcessingError>;
}

/// Canonical lossy target for re-encodes.
const REENCODE_CODEC: &str = "libvorbis";
const REENCODE_BITRATE: &str = "128k";

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: ProbeFormat,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

pub struct FfmpegTool {
    ffmpeg_bin: String,
    ffprobe_bin: String,
}

impl FfmpegTool {
    pub fn new() -> Self {
        Self {
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
        }
    }

    fn run_ffmpeg(&self, args: &[&str], context: &str) -> Result<(), ProcessingError> {
        let output = Command::new(&self.ffmpeg_bin)
            .args(["-hide_banner", "-v", "warning"])
            .args(args)
            .output()
            .map_err(|e| ProcessingError::invalid(format!("failed to run ffmpeg: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = format!("{context}\n\nffmpeg stderr:\n{stderr}");
            error!("{message}");
            return Err(ProcessingError::invalid(message));
        }
        Ok(())
    }
}

impl Default for FfmpegTool {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaTool for FfmpegTool {
    fn probe(&self, path: &Path) -> Result<MediaMetadata, ProcessingError> {
        let output = Command::new(&self.ffprobe_bin)
            .args(["-hide_banner", "-v", "warning"])
            .args(["-print_format", "json", "-show_streams", "-show_format"])
            .arg(path)
            .output()
            .map_err(|e| ProcessingError::invalid(format!("failed to run ffprobe: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message =
                format!("Error probing media file for transcription\n\nffprobe stderr:\n{stderr}");
            error!("{message}");
            return Err(ProcessingError::invalid(message));
        }

        let probed: ProbeOutput = serde_json::from_slice(&output.stdout)
            .map_err(|e| ProcessingError::invalid(format!("unexpected ffprobe output: {e}")))?;

        let audio_codec = probed
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("audio"))
            .and_then(|s| s.codec_name.clone());

        let duration = probed
            .format
            .duration
            .as_deref()
            .and_then(|d| d.parse::<f64>().ok())
            .ok_or_else(|| {
                ProcessingError::invalid("media file has no parseable duration".to_string())
            })?;

        Ok(MediaMetadata {
            audio_codec,
            duration,
        })
    }

    fn extract_segment(
        &self,
        input: &Path,
        start: u64,
        duration: u64,
        mode: SegmentMode,
        output: &Path,
    ) -> Result<(), ProcessingError> {
        let start = start.to_string();
        let duration = duration.to_string();
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();

        let mut args: Vec<&str> = vec!["-ss", &start, "-t", &duration, "-i", &input];
        match mode {
            SegmentMode::Copy => args.extend(["-c", "copy"]),
            SegmentMode::Reencode => {
                args.extend(["-c:a", REENCODE_CODEC, "-b:a", REENCODE_BITRATE])
            }
        }
        args.extend(["-y", &output]);

        self.run_ffmpeg(&args, "Error handling audio file for voice transcription")
    }

    fn extract_audio_track(
        &self,
        input: &Path,
        mode: SegmentMode,
        output: &Path,
    ) -> Result<(), ProcessingError> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();

        let mut args: Vec<&str> = vec!["-i", &input, "-vn"];
        match mode {
            SegmentMode::Copy => args.extend(["-acodec", "copy"]),
            SegmentMode::Reencode => {
                args.extend(["-c:a", REENCODE_CODEC, "-b:a", REENCODE_BITRATE])
            }
        }
        args.extend(["-y", &output]);

        self.run_ffmpeg(
            &args,
            "Error extracting audio track from video file for voice transcription with ffmpeg",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_output_parsing() {
        let json = r#"{
            "streams": [
                {"codec_type": "video", "codec_name": "h264"},
                {"codec_type": "audio", "codec_name": "aac"}
            ],
            "format": {"duration": "1080.500000"}
        }"#;
        let probed: ProbeOutput = serde_json::from_str(json).unwrap();
        let audio = probed
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("audio"))
            .unwrap();
        assert_eq!(audio.codec_name.as_deref(), Some("aac"));
        assert_eq!(probed.format.duration.as_deref(), Some("1080.500000"));
    }

    #[test]
    fn test_probe_output_without_audio_stream() {
        let json = r#"{"streams": [], "format": {"duration": "10.0"}}"#;
        let probed: ProbeOutput = serde_json::from_str(json).unwrap();
        assert!(probed.streams.is_empty());
    }
}
