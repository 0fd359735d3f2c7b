//! Reference OpenAI-compatible text-to-speech provider.
//!
//! Grounded on the teacher's `provider::openai` (request shaping) and
//! `provider::elevenlabs` (explicit status-code handling before parsing
//! the body) transcription providers, adapted from "upload audio, get
//! text" to "upload text, get audio".

use async_trait::async_trait;
use serde::Serialize;

use super::{SynthesisBackend, SynthesisError, SynthesisRequest, SynthesisResult};

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/audio/speech";

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<&'a str>,
}

/// Reference synthesis backend targeting OpenAI's `audio/speech` endpoint
/// (or any API-compatible mirror, via `VoiceOptions::api_uri`).
#[derive(Debug, Default, Clone)]
pub struct OpenAiTtsBackend;

#[async_trait]
impl SynthesisBackend for OpenAiTtsBackend {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn display_name(&self) -> &'static str {
        "OpenAI TTS"
    }

    async fn synthesize(
        &self,
        client: &reqwest::Client,
        request: &SynthesisRequest,
    ) -> Result<SynthesisResult, SynthesisError> {
        let url = request
            .options
            .api_uri
            .as_deref()
            .unwrap_or(DEFAULT_API_URL);
        let api_key = request
            .options
            .api_key
            .as_deref()
            .ok_or_else(|| SynthesisError::InvalidResponse("missing API key".to_string()))?;

        let body = SpeechRequest {
            model: &request.options.model,
            voice: &request.options.voice,
            input: &request.text,
            instructions: request.options.instructions.as_deref(),
        };

        let response = client
            .post(url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(SynthesisError::http(status.as_u16(), text));
        }

        let audio = response.bytes().await?.to_vec();
        Ok(SynthesisResult { audio })
    }
}
