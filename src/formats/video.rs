//! Video transcription provider.
//!
//! Extracts a standalone audio track from the video (stream copy when the
//! codec is natively supported, otherwise transcoded to the canonical lossy
//! codec), hands it to the audio pipeline, and deletes the extracted temp
//! file afterwards.

use std::sync::Arc;

use tracing::info;

use super::FormatProvider;
use super::audio::{AudioProvider, plan_mode};
use super::media::{MediaTool, SegmentMode};
use crate::error::ProcessingError;
use crate::models::{Chunk, ChunkOptions, SourceFile};
use crate::services::transcriber::Transcriber;

pub struct VideoProvider {
    inner: AudioProvider,
}

impl VideoProvider {
    pub fn new(
        transcriber: Option<Arc<dyn Transcriber>>,
        media: Arc<dyn MediaTool>,
        segment_duration: u64,
    ) -> Self {
        Self {
            inner: AudioProvider::new(transcriber, media, segment_duration),
        }
    }

    fn extract_audio_to_file(&self, file: &SourceFile) -> Result<SourceFile, ProcessingError> {
        let media = self.inner.media();
        let metadata = media.probe(&file.path)?;

        let (mode, extension) = plan_mode(metadata.audio_codec.as_deref(), false);
        match mode {
            SegmentMode::Copy => info!(
                "extracting audio track ({:?}) from video",
                metadata.audio_codec
            ),
            SegmentMode::Reencode => info!(
                "transcoding audio track ({:?}) to ogg",
                metadata.audio_codec
            ),
        }

        let audio_file = SourceFile::new_temporary(Some(extension))?;
        if let Err(e) = media.extract_audio_track(&file.path, mode, &audio_file.path) {
            audio_file.delete_quiet();
            return Err(e);
        }
        Ok(audio_file)
    }
}

impl FormatProvider for VideoProvider {
    fn name(&self) -> &'static str {
        "video-transcription"
    }

    fn file_name_extensions(&self) -> &[&'static str] {
        &[
            ".mp4", ".mpeg", ".mpg", ".mpe", ".ogv", ".mov", ".webm", ".avi", ".3gp", ".flv",
            ".mkv", ".wmv",
        ]
    }

    fn enabled(&self) -> bool {
        FormatProvider::enabled(&self.inner)
    }

    fn multiprocessable(&self) -> bool {
        false
    }

    fn process_file(
        &self,
        file: &SourceFile,
        opts: &ChunkOptions,
    ) -> Result<Vec<Chunk>, ProcessingError> {
        let audio_file = self.extract_audio_to_file(file)?;
        let result = self.inner.process_file(&audio_file, opts);
        audio_file.delete_quiet();
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::formats::audio::test_support::{FakeMediaTool, FakeTranscriber};
    use crate::formats::test_support::named_file;

    #[test]
    fn test_video_delegates_to_audio_pipeline() {
        let media = Arc::new(FakeMediaTool::new(Some("aac"), 600.0));
        let provider = VideoProvider::new(
            Some(Arc::new(FakeTranscriber::new())),
            media.clone(),
            300,
        );

        let file = named_file("clip.mp4");
        assert!(provider.supports(&file));
        let chunks = provider.process_file(&file, &ChunkOptions::default()).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].metadata["segment_begin_seconds"].as_f64(), Some(0.0));
        assert_eq!(chunks[1].metadata["segment_end_seconds"].as_f64(), Some(600.0));

        // audio-track extraction ran before segmentation
        let modes = media.modes.lock().unwrap();
        assert_eq!(modes.len(), 3);
        assert!(modes.iter().all(|m| *m == SegmentMode::Copy));
    }

    #[test]
    fn test_video_disabled_without_transcriber() {
        let provider =
            VideoProvider::new(None, Arc::new(FakeMediaTool::new(None, 1.0)), 300);
        assert!(!FormatProvider::enabled(&provider));
        assert!(!provider.multiprocessable());
    }
}
