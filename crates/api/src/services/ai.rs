//! AI-assisted medicine lookup via the Gemini API.
//!
//! Non-critical: suggestions feed a catalog search, so every failure mode
//! (no API key, transport error, unexpected response shape) degrades to an
//! empty list instead of failing the request.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MedicineSuggester: Send + Sync {
    /// Suggest medicine names for a free-text condition description.
    async fn suggest(&self, description: &str) -> Vec<String>;
}

const GENERATE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

/// Gemini implementation of [`MedicineSuggester`].
pub struct GeminiSuggester {
    http: reqwest::Client,
    api_key: Option<String>,
}

impl GeminiSuggester {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
        }
    }
}

#[async_trait]
impl MedicineSuggester for GeminiSuggester {
    async fn suggest(&self, description: &str) -> Vec<String> {
        let Some(api_key) = &self.api_key else {
            return Vec::new();
        };

        let prompt = format!(
            "Given the following condition: \"{description}\", return only a JSON array \
             of relevant medicine names. No explanation, no markdown, no code blocks. \
             Example format: [\"Medicine1\", \"Medicine2\"]"
        );
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = match self
            .http
            .post(GENERATE_URL)
            .query(&[("key", api_key.as_str())])
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                tracing::error!("failed to ask AI: {err}");
                return Vec::new();
            }
        };

        let body: GenerateResponse = match response.json().await {
            Ok(body) => body,
            Err(err) => {
                tracing::error!("failed to parse AI response: {err}");
                return Vec::new();
            }
        };

        parse_suggestions(&body).unwrap_or_default()
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
}

#[derive(Serialize)]
struct RequestContent {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// The model is asked for a bare JSON string array; anything else in the
/// array is dropped rather than erroring.
fn parse_suggestions(body: &GenerateResponse) -> Option<Vec<String>> {
    let text = body
        .candidates
        .first()?
        .content
        .as_ref()?
        .parts
        .first()?
        .text
        .as_deref()?;

    let values: Vec<serde_json::Value> = serde_json::from_str(text).ok()?;

    Some(
        values
            .into_iter()
            .filter_map(|value| value.as_str().map(str::to_owned))
            .collect(),
    )
}
