//! Audio transcription provider.
//!
//! The transcription backend enforces a hard 25 MB per-request ceiling, so a
//! recording is cut into time-bounded segments first. Segments are stream
//! copies when the backend understands the source codec, re-encodes
//! otherwise. If any produced segment still breaches the ceiling (unusually
//! dense encodes can, even under copy), all segments are discarded and one
//! forced re-encode attempt is made; a second oversize detection is fatal.
//! Transcripts are reassembled in segment order with timing metadata, then
//! re-split with the generic text splitter.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use super::FormatProvider;
use super::media::{MediaTool, SegmentMode};
use crate::error::{ProcessingError, TranscriptionError};
use crate::models::{Chunk, ChunkOptions, SourceFile};
use crate::services::splitter::TextSplitter;
use crate::services::transcriber::Transcriber;

/// Per-segment ceiling imposed by the transcription backend.
pub const SEGMENT_SIZE_LIMIT: u64 = 25 * 1000 * 1000;

/// Audio codecs the transcription backend accepts natively. Anything else is
/// re-encoded before upload.
const SUPPORTED_AUDIO_CODECS: [&str; 4] = ["aac", "mp3", "vorbis", "flac"];

/// File extension for segment files of a given codec. The backend detects
/// the container format from the extension, so it has to match.
fn codec_extension(codec: &str) -> &'static str {
    match codec {
        "aac" => "m4a",
        "mp3" => "mp3",
        "vorbis" => "ogg",
        "flac" => "flac",
        _ => "ogg",
    }
}

/// Decide how to treat the audio stream and which extension the output gets.
pub(crate) fn plan_mode(codec: Option<&str>, force_reencode: bool) -> (SegmentMode, &'static str) {
    match codec {
        Some(c) if !force_reencode && SUPPORTED_AUDIO_CODECS.contains(&c) => {
            (SegmentMode::Copy, codec_extension(c))
        }
        _ => (SegmentMode::Reencode, "ogg"),
    }
}

/// Window start offsets covering a recording of the given duration.
///
/// A non-empty recording always yields at least one window, even when it is
/// shorter than one second.
pub(crate) fn segment_starts(duration: f64, segment_duration: u64) -> Vec<u64> {
    let mut starts: Vec<u64> = (0..duration as u64)
        .step_by(segment_duration.max(1) as usize)
        .collect();
    if starts.is_empty() && duration > 0.0 {
        starts.push(0);
    }
    starts
}

pub struct AudioProvider {
    transcriber: Option<Arc<dyn Transcriber>>,
    media: Arc<dyn MediaTool>,
    default_chunk_size: usize,
    default_chunk_overlap: usize,
    segment_duration: u64,
}

impl AudioProvider {
    pub fn new(
        transcriber: Option<Arc<dyn Transcriber>>,
        media: Arc<dyn MediaTool>,
        segment_duration: u64,
    ) -> Self {
        Self {
            transcriber,
            media,
            default_chunk_size: 1000,
            default_chunk_overlap: 200,
            segment_duration,
        }
    }

    pub(crate) fn media(&self) -> &Arc<dyn MediaTool> {
        &self.media
    }

    /// Cut the recording into transcription-compatible segment files.
    ///
    /// Explicit two-attempt state machine: a plain attempt, then a forced
    /// re-encode attempt if any segment breaches the size ceiling. Returns
    /// the segment files and the boundary timestamps (one more entry than
    /// segments; the final boundary equals the total duration).
    fn split_into_segments(
        &self,
        path: &Path,
    ) -> Result<(Vec<SourceFile>, Vec<f64>), ProcessingError> {
        let metadata = self.media.probe(path)?;

        for force_reencode in [false, true] {
            let (segments, boundaries) = self.run_segmentation(
                path,
                metadata.audio_codec.as_deref(),
                metadata.duration,
                force_reencode,
            )?;

            let mut oversized = false;
            for segment in &segments {
                if segment.size().map(|n| n >= SEGMENT_SIZE_LIMIT).unwrap_or(true) {
                    oversized = true;
                    break;
                }
            }

            if !oversized {
                return Ok((segments, boundaries));
            }

            for segment in &segments {
                segment.delete_quiet();
            }
            if !force_reencode {
                warn!("a segment breached the transcription size ceiling, re-encoding");
            }
        }

        Err(ProcessingError::too_large(
            "audio segments exceed the transcription size limit even after re-encoding",
        ))
    }

    fn run_segmentation(
        &self,
        path: &Path,
        codec: Option<&str>,
        duration: f64,
        force_reencode: bool,
    ) -> Result<(Vec<SourceFile>, Vec<f64>), ProcessingError> {
        let (mode, extension) = plan_mode(codec, force_reencode);
        match mode {
            SegmentMode::Copy => info!("segmenting audio of length {duration} s"),
            SegmentMode::Reencode => {
                info!("segmenting and re-encoding audio of length {duration} s")
            }
        }

        let starts = segment_starts(duration, self.segment_duration);
        let mut segments: Vec<SourceFile> = Vec::new();
        for (n, start) in starts.iter().enumerate() {
            info!("segment {} / {}", n + 1, starts.len());

            let segment = SourceFile::new_temporary(Some(extension))?;
            if let Err(e) = self.media.extract_segment(
                path,
                *start,
                self.segment_duration,
                mode,
                &segment.path,
            ) {
                segment.delete_quiet();
                for produced in &segments {
                    produced.delete_quiet();
                }
                return Err(e);
            }
            segments.push(segment);
        }

        let mut boundaries: Vec<f64> = starts.iter().map(|s| *s as f64).collect();
        boundaries.push(duration);
        Ok((segments, boundaries))
    }
}

impl FormatProvider for AudioProvider {
    fn name(&self) -> &'static str {
        "audio"
    }

    fn file_name_extensions(&self) -> &[&'static str] {
        &[".mp3", ".m4a", ".ogg", ".oga", ".ogx", ".flac", ".wav"]
    }

    fn enabled(&self) -> bool {
        self.transcriber.is_some()
    }

    fn multiprocessable(&self) -> bool {
        false
    }

    fn process_file(
        &self,
        file: &SourceFile,
        opts: &ChunkOptions,
    ) -> Result<Vec<Chunk>, ProcessingError> {
        let Some(ref transcriber) = self.transcriber else {
            return Err(ProcessingError::invalid(
                "calling disabled format provider: `audio`",
            ));
        };

        let (segments, boundaries) = self.split_into_segments(&file.path)?;
        let total_segments = segments.len();
        let total_duration = boundaries.last().copied().unwrap_or(0.0);

        let mut results: Vec<Chunk> = Vec::new();
        let mut failure: Option<ProcessingError> = None;
        for (n, segment) in segments.iter().enumerate() {
            if failure.is_some() {
                // a previous segment already failed; release the rest
                segment.delete_quiet();
                continue;
            }

            info!("transcribing segment {} / {}", n + 1, total_segments);
            let outcome = transcriber.transcribe(segment);
            segment.delete_quiet();

            match outcome {
                Ok(docs) => {
                    for mut doc in docs {
                        doc.metadata
                            .insert("segment_begin_seconds".to_string(), boundaries[n].into());
                        doc.metadata
                            .insert("segment_end_seconds".to_string(), boundaries[n + 1].into());
                        doc.metadata
                            .insert("total_segments".to_string(), (total_segments as i64).into());
                        doc.metadata
                            .insert("total_duration".to_string(), total_duration.into());
                        results.push(doc);
                    }
                }
                Err(TranscriptionError::PayloadTooLarge) => {
                    failure = Some(ProcessingError::too_large(
                        "File too large. The limit is 25 MiB.",
                    ));
                }
                Err(e) => failure = Some(ProcessingError::invalid(e.to_string())),
            }
        }

        if let Some(e) = failure {
            return Err(e);
        }

        let (chunk_size, chunk_overlap) =
            opts.resolve(self.default_chunk_size, self.default_chunk_overlap)?;
        let splitter = TextSplitter::new(chunk_size, chunk_overlap);
        Ok(splitter.split_chunks(&results))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;

    use super::*;
    use crate::formats::media::MediaMetadata;

    /// Media tool fake: records extraction modes and fabricates segment
    /// files whose size depends on the mode (sparse, nothing written).
    pub struct FakeMediaTool {
        pub codec: Option<&'static str>,
        pub duration: f64,
        pub copy_segment_size: u64,
        pub reencode_segment_size: u64,
        pub modes: Mutex<Vec<SegmentMode>>,
    }

    impl FakeMediaTool {
        pub fn new(codec: Option<&'static str>, duration: f64) -> Self {
            Self {
                codec,
                duration,
                copy_segment_size: 1_000,
                reencode_segment_size: 1_000,
                modes: Mutex::new(Vec::new()),
            }
        }

        fn fabricate(&self, mode: SegmentMode, output: &Path) -> Result<(), ProcessingError> {
            self.modes.lock().unwrap().push(mode);
            let size = match mode {
                SegmentMode::Copy => self.copy_segment_size,
                SegmentMode::Reencode => self.reencode_segment_size,
            };
            let file = std::fs::File::create(output)?;
            file.set_len(size)?;
            Ok(())
        }
    }

    impl MediaTool for FakeMediaTool {
        fn probe(&self, _path: &Path) -> Result<MediaMetadata, ProcessingError> {
            Ok(MediaMetadata {
                audio_codec: self.codec.map(|c| c.to_string()),
                duration: self.duration,
            })
        }

        fn extract_segment(
            &self,
            _input: &Path,
            _start: u64,
            _duration: u64,
            mode: SegmentMode,
            output: &Path,
        ) -> Result<(), ProcessingError> {
            self.fabricate(mode, output)
        }

        fn extract_audio_track(
            &self,
            _input: &Path,
            mode: SegmentMode,
            output: &Path,
        ) -> Result<(), ProcessingError> {
            self.fabricate(mode, output)
        }
    }

    /// Transcriber fake: numbered transcripts, or a canned failure.
    pub struct FakeTranscriber {
        pub fail_with: Option<fn() -> TranscriptionError>,
        pub calls: Mutex<usize>,
    }

    impl FakeTranscriber {
        pub fn new() -> Self {
            Self {
                fail_with: None,
                calls: Mutex::new(0),
            }
        }

        pub fn failing(fail_with: fn() -> TranscriptionError) -> Self {
            Self {
                fail_with: Some(fail_with),
                calls: Mutex::new(0),
            }
        }
    }

    impl Transcriber for FakeTranscriber {
        fn transcribe(&self, _file: &SourceFile) -> Result<Vec<Chunk>, TranscriptionError> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if let Some(fail) = self.fail_with {
                return Err(fail());
            }
            Ok(vec![Chunk::new(format!("transcript {}", *calls))])
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::test_support::{FakeMediaTool, FakeTranscriber};
    use super::*;
    use crate::formats::test_support::named_file;

    fn provider(media: FakeMediaTool, transcriber: FakeTranscriber) -> AudioProvider {
        AudioProvider::new(
            Some(Arc::new(transcriber)),
            Arc::new(media),
            300,
        )
    }

    #[test]
    fn test_segment_starts_cover_duration() {
        assert_eq!(segment_starts(1080.0, 300), [0, 300, 600, 900]);
        assert_eq!(segment_starts(300.0, 300), [0]);
        assert_eq!(segment_starts(301.0, 300), [0, 300]);
        assert_eq!(segment_starts(0.5, 300), [0]);
        assert!(segment_starts(0.0, 300).is_empty());
    }

    #[test]
    fn test_unsupported_codec_reencodes_with_final_boundary_at_duration() {
        let media = FakeMediaTool::new(Some("opus"), 1080.0);
        let provider = provider(media, FakeTranscriber::new());

        let file = named_file("talk.wav");
        let chunks = provider.process_file(&file, &ChunkOptions::default()).unwrap();

        assert_eq!(chunks.len(), 4);
        let begins: Vec<f64> = chunks
            .iter()
            .map(|c| c.metadata["segment_begin_seconds"].as_f64().unwrap())
            .collect();
        let ends: Vec<f64> = chunks
            .iter()
            .map(|c| c.metadata["segment_end_seconds"].as_f64().unwrap())
            .collect();
        assert_eq!(begins, [0.0, 300.0, 600.0, 900.0]);
        assert_eq!(ends, [300.0, 600.0, 900.0, 1080.0]);
        for chunk in &chunks {
            assert_eq!(chunk.meta_i64("total_segments"), Some(4));
            assert_eq!(chunk.metadata["total_duration"].as_f64(), Some(1080.0));
        }
        // transcripts stay in segment order
        assert_eq!(chunks[0].content, "transcript 1");
        assert_eq!(chunks[3].content, "transcript 4");
    }

    #[test]
    fn test_modes_copy_for_supported_reencode_for_unsupported() {
        let media = Arc::new(FakeMediaTool::new(Some("flac"), 600.0));
        let provider = AudioProvider::new(
            Some(Arc::new(FakeTranscriber::new())),
            media.clone(),
            300,
        );
        provider
            .process_file(&named_file("a.flac"), &ChunkOptions::default())
            .unwrap();
        assert!(media
            .modes
            .lock()
            .unwrap()
            .iter()
            .all(|m| *m == SegmentMode::Copy));

        let media = Arc::new(FakeMediaTool::new(Some("opus"), 600.0));
        let provider = AudioProvider::new(
            Some(Arc::new(FakeTranscriber::new())),
            media.clone(),
            300,
        );
        provider
            .process_file(&named_file("a.wav"), &ChunkOptions::default())
            .unwrap();
        assert!(media
            .modes
            .lock()
            .unwrap()
            .iter()
            .all(|m| *m == SegmentMode::Reencode));
    }

    #[test]
    fn test_oversize_copy_triggers_single_reencode_retry() {
        let mut fake = FakeMediaTool::new(Some("mp3"), 300.0);
        fake.copy_segment_size = SEGMENT_SIZE_LIMIT;
        fake.reencode_segment_size = 1_000;
        let media = Arc::new(fake);

        let provider = AudioProvider::new(
            Some(Arc::new(FakeTranscriber::new())),
            media.clone(),
            300,
        );
        let chunks = provider
            .process_file(&named_file("dense.mp3"), &ChunkOptions::default())
            .unwrap();

        assert!(!chunks.is_empty());
        let modes = media.modes.lock().unwrap();
        assert_eq!(modes.as_slice(), [SegmentMode::Copy, SegmentMode::Reencode]);
    }

    #[test]
    fn test_second_oversize_detection_is_fatal() {
        let mut fake = FakeMediaTool::new(Some("mp3"), 300.0);
        fake.copy_segment_size = SEGMENT_SIZE_LIMIT;
        fake.reencode_segment_size = SEGMENT_SIZE_LIMIT;
        let media = Arc::new(fake);

        let transcriber = Arc::new(FakeTranscriber::new());
        let provider = AudioProvider::new(Some(transcriber.clone()), media.clone(), 300);
        let err = provider
            .process_file(&named_file("dense.mp3"), &ChunkOptions::default())
            .unwrap_err();

        assert_eq!(err.kind, crate::error::ProcessingErrorKind::PayloadTooLarge);
        // exactly two attempts, never more
        assert_eq!(media.modes.lock().unwrap().len(), 2);
        // nothing was sent to the backend
        assert_eq!(*transcriber.calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_backend_payload_too_large_translates_to_literal_message() {
        let media = FakeMediaTool::new(Some("mp3"), 300.0);
        let transcriber = FakeTranscriber::failing(|| TranscriptionError::PayloadTooLarge);
        let provider = provider(media, transcriber);

        let err = provider
            .process_file(&named_file("talk.mp3"), &ChunkOptions::default())
            .unwrap_err();
        assert_eq!(err.message, "File too large. The limit is 25 MiB.");
        assert_eq!(err.kind, crate::error::ProcessingErrorKind::PayloadTooLarge);
    }

    #[test]
    fn test_disabled_provider_refuses_to_process() {
        let provider = AudioProvider::new(None, Arc::new(FakeMediaTool::new(None, 1.0)), 300);
        assert!(!provider.enabled());
        assert!(
            provider
                .process_file(&named_file("talk.mp3"), &ChunkOptions::default())
                .is_err()
        );
    }

    #[test]
    fn test_plan_mode() {
        assert_eq!(plan_mode(Some("mp3"), false), (SegmentMode::Copy, "mp3"));
        assert_eq!(plan_mode(Some("aac"), false), (SegmentMode::Copy, "m4a"));
        assert_eq!(plan_mode(Some("vorbis"), false), (SegmentMode::Copy, "ogg"));
        assert_eq!(plan_mode(Some("opus"), false), (SegmentMode::Reencode, "ogg"));
        assert_eq!(plan_mode(None, false), (SegmentMode::Reencode, "ogg"));
        assert_eq!(plan_mode(Some("mp3"), true), (SegmentMode::Reencode, "ogg"));
    }
}
