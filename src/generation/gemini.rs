//! Client for the hosted `generateContent` API

use std::time::Duration;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use super::{GenerationError, GenerationRequest, ImageGenerator};
use crate::imaging::base64_payload;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text {
        text: &'a str,
    },
    #[serde(rename_all = "camelCase")]
    Inline {
        inline_data: InlineData<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: [&'static str; 2],
}

#[derive(Debug, Deserialize, Default)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    inline_data: Option<ResponseInlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseInlineData {
    mime_type: Option<String>,
    data: Option<String>,
}

/// Hosted multimodal model client
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    async fn generate_inner(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let mut parts = vec![RequestPart::Text { text: &request.prompt }];
        parts.extend(request.images.iter().map(|img| RequestPart::Inline {
            inline_data: InlineData {
                mime_type: &img.mime_type,
                data: base64_payload(&img.data),
            },
        }));

        let body = GenerateContentRequest {
            contents: vec![Content { role: "user", parts }],
            generation_config: GenerationConfig {
                response_modalities: ["TEXT", "IMAGE"],
            },
        };

        tracing::debug!(
            model = %self.model,
            images = request.images.len(),
            "Requesting image generation"
        );

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response.json().await?;
        extract_image(parsed)
    }
}

/// First inline image of the first candidate, as a data URL
fn extract_image(response: GenerateContentResponse) -> Result<String, GenerationError> {
    let inline = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|content| content.parts.into_iter().find_map(|p| p.inline_data))
        .ok_or(GenerationError::NoImage)?;

    let data = inline.data.filter(|d| !d.is_empty()).ok_or(GenerationError::NoImage)?;
    let mime_type = inline.mime_type.unwrap_or_else(|| "image/png".to_string());
    Ok(format!("data:{};base64,{}", mime_type, data))
}

impl ImageGenerator for GeminiClient {
    fn generate(&self, request: GenerationRequest) -> BoxFuture<'_, Result<String, GenerationError>> {
        Box::pin(self.generate_inner(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> GenerateContentResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_extracts_first_inline_image() {
        let response = parse(
            r#"{"candidates":[{"content":{"parts":[
                {"text":"here you go"},
                {"inlineData":{"mimeType":"image/jpeg","data":"QUJD"}}
            ]}}]}"#,
        );
        assert_eq!(extract_image(response).unwrap(), "data:image/jpeg;base64,QUJD");
    }

    #[test]
    fn test_missing_mime_defaults_to_png() {
        let response = parse(r#"{"candidates":[{"content":{"parts":[{"inlineData":{"data":"QUJD"}}]}}]}"#);
        assert_eq!(extract_image(response).unwrap(), "data:image/png;base64,QUJD");
    }

    #[test]
    fn test_text_only_response_has_no_image() {
        let response = parse(r#"{"candidates":[{"content":{"parts":[{"text":"sorry"}]}}]}"#);
        assert!(matches!(extract_image(response), Err(GenerationError::NoImage)));
        assert!(matches!(extract_image(parse("{}")), Err(GenerationError::NoImage)));
    }

    #[test]
    fn test_request_body_shape() {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    RequestPart::Text { text: "a tee" },
                    RequestPart::Inline {
                        inline_data: InlineData {
                            mime_type: "image/png",
                            data: base64_payload("data:image/png;base64,QUJD"),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_modalities: ["TEXT", "IMAGE"],
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "a tee");
        assert_eq!(json["contents"][0]["parts"][1]["inlineData"]["data"], "QUJD");
        assert_eq!(json["generationConfig"]["responseModalities"][1], "IMAGE");
    }

    #[test]
    fn test_endpoint_trims_slash() {
        let client = GeminiClient::new(
            "key",
            Some("http://localhost:9/v1/".to_string()),
            DEFAULT_MODEL,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            client.endpoint(),
            "http://localhost:9/v1/models/gemini-2.5-flash-image:generateContent"
        );
    }
}
