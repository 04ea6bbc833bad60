use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::services::model_client::TextGenerator;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

/// Google Gemini `generateContent` over REST.
#[derive(Clone)]
pub struct GeminiService {
    client: Client,
    endpoint: Url,
}

impl GeminiService {
    pub fn new(client: Client, api_base: &Url, model: &str) -> Result<Self> {
        let endpoint = api_base
            .join(&format!("models/{}:generateContent", model))
            .map_err(|e| Error::Config(format!("Invalid Gemini endpoint for model {}: {}", model, e)))?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl TextGenerator for GeminiService {
    async fn generate(&self, credential: &str, prompt: &str, temperature: f32) -> Result<String> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig { temperature },
        };

        let res = self
            .client
            .post(self.endpoint.clone())
            .header("x-goog-api-key", credential)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Reqwest(e.without_url()))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(Error::Service(format!("Gemini API error {}: {}", status, text)));
        }

        let parsed: GenerateResponse = res
            .json()
            .await
            .map_err(|e| Error::Reqwest(e.without_url()))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Service("Gemini returned no text".to_string()));
        }
        Ok(text.to_string())
    }
}
