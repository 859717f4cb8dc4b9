//! Format providers.
//!
//! Each provider is a capability unit that recognizes and chunks one family
//! of file formats. Dispatch walks the registry in registration order and the
//! first enabled provider whose extension set matches the file name wins.

mod audio;
mod code;
mod html;
mod json;
mod markdown;
pub mod media;
mod ms_excel;
mod ms_ppt;
mod ms_word;
mod pdf;
mod plain;
mod video;
mod xml;
mod yaml;

pub use audio::AudioProvider;
pub use code::CodeProvider;
pub use html::HtmlProvider;
pub use json::JsonProvider;
pub use markdown::MarkdownProvider;
pub use media::{FfmpegTool, MediaMetadata, MediaTool, SegmentMode};
pub use ms_excel::MsExcelProvider;
pub use ms_ppt::MsPptProvider;
pub use ms_word::MsWordProvider;
pub use pdf::PdfProvider;
pub use plain::PlainProvider;
pub use video::VideoProvider;
pub use xml::XmlProvider;
pub use yaml::YamlProvider;

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ConfigError, ProcessingError};
use crate::models::{Chunk, ChunkOptions, Config, SourceFile};
use crate::services::transcriber::{HttpTranscriber, Transcriber};

/// A stateless-per-configuration capability unit.
pub trait FormatProvider: Send + Sync {
    /// Unique provider name, also recorded in chunk metadata.
    fn name(&self) -> &'static str;

    /// Claimed file name extensions, including the leading dot.
    fn file_name_extensions(&self) -> &[&'static str];

    /// Disabled providers are excluded from dispatch entirely. Computed once
    /// at construction from external dependency requirements.
    fn enabled(&self) -> bool {
        true
    }

    /// Whether parsing benefits from running in an isolated worker process.
    /// Providers that are I/O-bound and stateful opt out.
    fn multiprocessable(&self) -> bool {
        true
    }

    /// Parse the file into an ordered chunk list.
    fn process_file(
        &self,
        file: &SourceFile,
        opts: &ChunkOptions,
    ) -> Result<Vec<Chunk>, ProcessingError>;

    /// Post-retrieval hook applied to chunks coming back from a similarity
    /// search. Never invoked during ingestion.
    fn clean_up(&self, chunk: Chunk) -> Chunk {
        chunk
    }

    /// Case-insensitive extension match against the file name.
    fn supports(&self, file: &SourceFile) -> bool {
        let name = file.file_name.to_lowercase();
        self.file_name_extensions()
            .iter()
            .any(|ext| name.ends_with(&ext.to_lowercase()))
    }
}

/// The ordered set of enabled format providers.
pub struct FormatRegistry {
    providers: Vec<Box<dyn FormatProvider>>,
}

impl FormatRegistry {
    /// Build the registry from configuration.
    ///
    /// Providers requiring absent external backends construct disabled and
    /// are dropped here. A startup validation pass enforces that no two
    /// enabled providers claim the same extension.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let transcriber: Option<Arc<dyn Transcriber>> = config
            .transcription
            .as_ref()
            .map(|stt| Arc::new(HttpTranscriber::new(stt)) as Arc<dyn Transcriber>);
        let media: Arc<dyn MediaTool> = Arc::new(FfmpegTool::new());
        let segment_duration = config.indexing.segment_duration;

        let providers: Vec<Box<dyn FormatProvider>> = vec![
            Box::new(PdfProvider::new()),
            Box::new(MarkdownProvider::new()),
            Box::new(HtmlProvider::new()),
            Box::new(CodeProvider::new()),
            Box::new(JsonProvider::new()),
            Box::new(XmlProvider::new()),
            Box::new(YamlProvider::new()),
            Box::new(PlainProvider::new()),
            Box::new(MsExcelProvider::new()),
            Box::new(MsWordProvider::new()),
            Box::new(MsPptProvider::new()),
            Box::new(VideoProvider::new(
                transcriber.clone(),
                media.clone(),
                segment_duration,
            )),
            Box::new(AudioProvider::new(transcriber, media, segment_duration)),
        ];

        Self::from_providers(providers)
    }

    /// Assemble a registry from explicit providers, dropping disabled ones
    /// and validating extension uniqueness.
    pub fn from_providers(providers: Vec<Box<dyn FormatProvider>>) -> Result<Self, ConfigError> {
        let providers: Vec<_> = providers.into_iter().filter(|p| p.enabled()).collect();

        let mut claimed: HashMap<String, &'static str> = HashMap::new();
        for provider in &providers {
            for ext in provider.file_name_extensions() {
                let ext = ext.to_lowercase();
                if let Some(other) = claimed.insert(ext.clone(), provider.name()) {
                    return Err(ConfigError::ValidationError(format!(
                        "format providers `{}` and `{}` both claim extension `{}`",
                        other,
                        provider.name(),
                        ext
                    )));
                }
            }
        }

        Ok(Self { providers })
    }

    /// First enabled provider matching the file, in registration order.
    pub fn resolve(&self, file: &SourceFile) -> Option<&dyn FormatProvider> {
        self.providers
            .iter()
            .find(|p| p.supports(file))
            .map(|p| p.as_ref())
    }

    /// Look a provider up by name; serves the post-retrieval clean-up path.
    pub fn by_name(&self, name: &str) -> Option<&dyn FormatProvider> {
        self.providers
            .iter()
            .find(|p| p.name() == name)
            .map(|p| p.as_ref())
    }

    /// Every extension any enabled provider claims.
    pub fn extensions(&self) -> Vec<&'static str> {
        self.providers
            .iter()
            .flat_map(|p| p.file_name_extensions().iter().copied())
            .collect()
    }

    pub fn providers(&self) -> impl Iterator<Item = &dyn FormatProvider> {
        self.providers.iter().map(|p| p.as_ref())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Minimal provider returning canned chunks, for registry and pipeline
    /// tests.
    pub struct StubProvider {
        pub provider_name: &'static str,
        pub extensions: &'static [&'static str],
        pub enabled: bool,
        pub multiprocessable: bool,
        pub chunks: Vec<Chunk>,
    }

    impl StubProvider {
        pub fn new(name: &'static str, extensions: &'static [&'static str]) -> Self {
            Self {
                provider_name: name,
                extensions,
                enabled: true,
                multiprocessable: true,
                chunks: Vec::new(),
            }
        }

        pub fn with_chunks(mut self, chunks: Vec<Chunk>) -> Self {
            self.chunks = chunks;
            self
        }

        pub fn disabled(mut self) -> Self {
            self.enabled = false;
            self
        }
    }

    impl FormatProvider for StubProvider {
        fn name(&self) -> &'static str {
            self.provider_name
        }

        fn file_name_extensions(&self) -> &[&'static str] {
            self.extensions
        }

        fn enabled(&self) -> bool {
            self.enabled
        }

        fn multiprocessable(&self) -> bool {
            self.multiprocessable
        }

        fn process_file(
            &self,
            _file: &SourceFile,
            _opts: &ChunkOptions,
        ) -> Result<Vec<Chunk>, ProcessingError> {
            Ok(self.chunks.clone())
        }
    }

    pub fn named_file(file_name: &str) -> SourceFile {
        SourceFile::new("test-id", format!("/tmp/{file_name}"), "", file_name)
    }

    /// Write content into a temp dir and wrap it as a source file. The
    /// returned guard keeps the directory alive.
    pub fn temp_file(content: &[u8], file_name: &str) -> (tempfile::TempDir, SourceFile) {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(file_name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content).unwrap();
        let file = SourceFile::new("test-id", path, "", file_name);
        (dir, file)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{StubProvider, named_file};
    use super::*;

    #[test]
    fn test_supports_is_case_insensitive() {
        let provider = StubProvider::new("stub", &[".pdf"]);
        assert!(provider.supports(&named_file("Report.PDF")));
        assert!(provider.supports(&named_file("report.pdf")));
        assert!(!provider.supports(&named_file("report.txt")));
    }

    #[test]
    fn test_extension_uniqueness_enforced() {
        let result = FormatRegistry::from_providers(vec![
            Box::new(StubProvider::new("a", &[".txt"])),
            Box::new(StubProvider::new("b", &[".md", ".txt"])),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_disabled_providers_excluded_from_uniqueness_and_dispatch() {
        let registry = FormatRegistry::from_providers(vec![
            Box::new(StubProvider::new("a", &[".txt"]).disabled()),
            Box::new(StubProvider::new("b", &[".txt"])),
        ])
        .unwrap();

        let provider = registry.resolve(&named_file("note.txt")).unwrap();
        assert_eq!(provider.name(), "b");
    }

    #[test]
    fn test_first_matching_provider_wins_in_registration_order() {
        // two providers with disjoint extensions; ordering decides .txt
        let registry = FormatRegistry::from_providers(vec![
            Box::new(StubProvider::new("first", &[".txt"])),
            Box::new(StubProvider::new("second", &[".md"])),
        ])
        .unwrap();

        assert_eq!(registry.resolve(&named_file("a.txt")).unwrap().name(), "first");
        assert_eq!(registry.resolve(&named_file("a.md")).unwrap().name(), "second");
        assert!(registry.resolve(&named_file("a.bin")).is_none());
    }

    #[test]
    fn test_default_registry_has_unique_extensions() {
        let config = Config::default();
        let registry = FormatRegistry::from_config(&config).unwrap();

        // uniqueness: every supported extension resolves to exactly one provider
        for ext in registry.extensions() {
            let file = named_file(&format!("file{ext}"));
            let matching: Vec<_> = registry
                .providers()
                .filter(|p| p.supports(&file))
                .map(|p| p.name())
                .collect();
            assert_eq!(matching.len(), 1, "extension {ext} claimed by {matching:?}");
        }
    }

    #[test]
    fn test_transcription_providers_disabled_without_backend() {
        let config = Config::default();
        let registry = FormatRegistry::from_config(&config).unwrap();
        assert!(registry.by_name("audio").is_none());
        assert!(registry.by_name("video-transcription").is_none());
        assert!(registry.resolve(&named_file("talk.mp3")).is_none());
    }
}
