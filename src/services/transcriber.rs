//! Transcription backend client.
//!
//! Speaks the OpenAI-compatible `audio/transcriptions` protocol. The backend
//! detects the audio format from the uploaded file's extension, so segment
//! files keep their extensions intact.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::blocking::multipart::Form;
use serde::Deserialize;

use crate::error::TranscriptionError;
use crate::models::{Chunk, SourceFile, TranscriptionConfig};

/// The transcription backend contract.
///
/// Implementations must raise a distinguishable payload-too-large condition.
pub trait Transcriber: Send + Sync {
    fn transcribe(&self, file: &SourceFile) -> Result<Vec<Chunk>, TranscriptionError>;
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

pub struct HttpTranscriber {
    base_url: String,
    api_key: Option<String>,
    model: String,
    timeout: Duration,
}

impl HttpTranscriber {
    pub fn new(config: &TranscriptionConfig) -> Self {
        Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

impl Transcriber for HttpTranscriber {
    fn transcribe(&self, file: &SourceFile) -> Result<Vec<Chunk>, TranscriptionError> {
        // blocking client: transcription runs on the blocking parse path,
        // never on the async surface
        let client = Client::builder().timeout(self.timeout).build()?;

        let form = Form::new()
            .text("model", self.model.clone())
            .file("file", &file.path)
            .map_err(|e| TranscriptionError::ApiError {
                status: 0,
                message: format!("failed to read segment file: {e}"),
            })?;

        let url = format!("{}/audio/transcriptions", self.base_url);
        let mut request = client.post(&url).multipart(form);
        if let Some(ref api_key) = self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send()?;
        let status = response.status();

        if status == StatusCode::PAYLOAD_TOO_LARGE {
            return Err(TranscriptionError::PayloadTooLarge);
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(TranscriptionError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let transcription: TranscriptionResponse = response.json().map_err(|e| {
            TranscriptionError::ApiError {
                status: status.as_u16(),
                message: format!("invalid transcription response: {e}"),
            }
        })?;

        Ok(vec![Chunk::new(transcription.text)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trimming() {
        let config = TranscriptionConfig {
            url: "http://localhost:9000/".to_string(),
            api_key: None,
            model: "whisper-1".to_string(),
            timeout_secs: 600,
        };
        let transcriber = HttpTranscriber::new(&config);
        assert_eq!(transcriber.base_url, "http://localhost:9000");
    }
}
