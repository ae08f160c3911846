//! Flashcard generation through the Gemini REST API.
//!
//! A document goes through three calls: upload to the Files API, a
//! `generateContent` request referencing the uploaded file, and a delete
//! of the uploaded file. The delete runs whether or not generation
//! succeeded, and also when the caller drops the call at a deadline.

use async_trait::async_trait;
use cuedeck_core::cards::{parse_generated_cards, CardParseError, GeneratedCard};
use cuedeck_core::formats::CANONICAL_MIME_TYPE;
use serde::Deserialize;

/// Default public endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Instruction sent alongside every document.
pub const CARD_PROMPT: &str = "\
You are an AI assistant helping to create cue cards from study material.
The user has uploaded a file containing educational content (lecture notes, textbook sections, or reference material). Read and analyze the file content carefully.
Your task is to extract important and detailed concepts, definitions and explanations, and format them as cue cards in JSON.
Each cue card should have:
- A front field: a question or prompt (e.g. \"Define polymorphism\", or \"What is the purpose of TCP?\")
- A back field: a clear and complete answer or explanation.
Ensure you:
- Do not skip technical details or nuance
- Break down long material into multiple cards if needed
- Cover all major concepts from the file
- Return valid JSON only, no code blocks or extra formatting

Format your response like this:
{
  \"cards\": [
    {
      \"front\": \"What is ___?\",
      \"back\": \"...\"
    }
  ]
}
";

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API returned a non-2xx status code.
    #[error("Gemini API error ({status}): {body}")]
    ApiError { status: u16, body: String },

    #[error("Response contained no text")]
    EmptyResponse,

    #[error("Could not parse generated cards: {0}")]
    Parse(#[from] CardParseError),
}

/// Turns a PDF into flashcards.
#[async_trait]
pub trait CardGenerator: Send + Sync {
    /// Generate cards from a PDF document. An empty result is an error.
    async fn generate(&self, pdf: Vec<u8>) -> Result<Vec<GeneratedCard>, GenerationError>;
}

/// HTTP client for the Gemini API.
pub struct GeminiGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: UploadedFile,
}

#[derive(Debug, Deserialize)]
struct UploadedFile {
    name: String,
    uri: String,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiGenerator {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self::with_client(reqwest::Client::new(), api_key, model, base_url)
    }

    /// Create a generator reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        api_key: String,
        model: String,
        base_url: String,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }

    async fn upload(&self, pdf: Vec<u8>) -> Result<UploadedFile, GenerationError> {
        let response = self
            .client
            .post(format!("{}/upload/v1beta/files", self.base_url))
            .query(&[("key", self.api_key.as_str()), ("uploadType", "media")])
            .header(reqwest::header::CONTENT_TYPE, CANONICAL_MIME_TYPE)
            .body(pdf)
            .send()
            .await?;

        let uploaded: UploadResponse = Self::parse_response(response).await?;
        Ok(uploaded.file)
    }

    async fn generate_from(&self, file_uri: &str) -> Result<String, GenerationError> {
        let body = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "file_data": { "mime_type": CANONICAL_MIME_TYPE, "file_uri": file_uri } },
                    { "text": CARD_PROMPT },
                ],
            }],
        });

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let generated: GenerateResponse = Self::parse_response(response).await?;
        generated
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .filter(|text| !text.trim().is_empty())
            .ok_or(GenerationError::EmptyResponse)
    }

    fn delete_request(&self, name: &str) -> reqwest::RequestBuilder {
        self.client
            .delete(format!("{}/v1beta/{}", self.base_url, name))
            .query(&[("key", self.api_key.as_str())])
    }

    async fn delete(&self, name: &str) -> Result<(), GenerationError> {
        Self::send_delete(self.delete_request(name)).await
    }

    async fn send_delete(request: reqwest::RequestBuilder) -> Result<(), GenerationError> {
        let response = request.send().await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    // ---- private helpers ----

    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, GenerationError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(GenerationError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GenerationError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Deletes an uploaded document in the background if dropped while armed.
struct UploadCleanup<'a> {
    generator: &'a GeminiGenerator,
    name: &'a str,
    armed: bool,
}

impl Drop for UploadCleanup<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(file = %self.name, "No runtime to delete abandoned upload");
            return;
        };
        let request = self.generator.delete_request(self.name);
        let name = self.name.to_string();
        runtime.spawn(async move {
            match GeminiGenerator::send_delete(request).await {
                Ok(()) => tracing::debug!(file = %name, "Abandoned upload deleted"),
                Err(e) => {
                    tracing::warn!(file = %name, error = %e, "Failed to delete abandoned upload")
                }
            }
        });
    }
}

#[async_trait]
impl CardGenerator for GeminiGenerator {
    async fn generate(&self, pdf: Vec<u8>) -> Result<Vec<GeneratedCard>, GenerationError> {
        let uploaded = self.upload(pdf).await?;
        let mut cleanup = UploadCleanup {
            generator: self,
            name: &uploaded.name,
            armed: true,
        };

        let text = self.generate_from(&uploaded.uri).await;

        let deleted = self.delete(&uploaded.name).await;
        cleanup.armed = false;
        if let Err(e) = deleted {
            tracing::warn!(file = %uploaded.name, error = %e, "Failed to delete uploaded document");
        }

        let cards = parse_generated_cards(&text?)?;
        tracing::debug!(count = cards.len(), "Cards generated");
        Ok(cards)
    }
}
