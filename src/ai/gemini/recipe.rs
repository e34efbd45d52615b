use super::client::GeminiHttpClient;
use super::types::{
    Content, FileData, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    InlineData, Part,
};
use crate::ai::{FieldKind, GenerationRequest, GenerationService, RequestPart, SchemaDescriptor};
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Adapter around Gemini's `generateContent` for recipe generation.
///
/// One call per request; retrying after a quota failure is the caller's
/// concern via the surfaced retry hint.
pub struct GeminiRecipeClient {
    http: GeminiHttpClient,
}

impl GeminiRecipeClient {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Self {
        Self::new_with_client(api_key, model, timeout, reqwest::Client::new())
    }

    pub fn new_with_client(
        api_key: String,
        model: String,
        timeout: Duration,
        client: reqwest::Client,
    ) -> Self {
        Self {
            http: GeminiHttpClient::new_with_client(api_key, model, timeout, client),
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }

    fn to_wire_part(part: &RequestPart) -> Part {
        match part {
            RequestPart::Text(text) => Part::Text { text: text.clone() },
            RequestPart::InlineImage { bytes, mime_type } => {
                use base64::Engine as _;
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: mime_type.clone(),
                        data: base64::engine::general_purpose::STANDARD.encode(bytes),
                    },
                }
            }
            RequestPart::ImageReference { url, mime_type } => Part::FileData {
                file_data: FileData {
                    mime_type: mime_type.clone(),
                    file_uri: url.clone(),
                },
            },
        }
    }

    fn to_response_schema(schema: &SchemaDescriptor) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for field in &schema.fields {
            let property = match field.kind {
                FieldKind::String => serde_json::json!({
                    "type": "STRING",
                    "description": field.description,
                }),
                FieldKind::StringArray => serde_json::json!({
                    "type": "ARRAY",
                    "items": { "type": "STRING" },
                    "description": field.description,
                }),
            };
            properties.insert(field.name.to_string(), property);
            if field.required {
                required.push(field.name);
            }
        }
        serde_json::json!({
            "type": "OBJECT",
            "properties": properties,
            "required": required,
        })
    }

    fn extract_text(response: &GenerateContentResponse) -> Option<String> {
        response.candidates.first().and_then(|c| {
            c.content.parts.iter().find_map(|p| match p {
                Part::Text { text } => Some(text.clone()),
                _ => None,
            })
        })
    }
}

#[async_trait]
impl GenerationService for GeminiRecipeClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        tracing::debug!(
            "Sending generation request ({} part(s)) to model {}",
            request.parts.len(),
            self.http.model()
        );

        let wire = GenerateContentRequest {
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part::Text {
                    text: request.system_policy.clone(),
                }],
            }),
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: request.parts.iter().map(Self::to_wire_part).collect(),
            }],
            generation_config: Some(GenerationConfig {
                max_output_tokens: Some(2048),
                response_mime_type: Some("application/json".to_string()),
                response_schema: request.schema.as_ref().map(Self::to_response_schema),
            }),
        };

        let response: GenerateContentResponse = self.http.generate_content(&wire).await?;

        Self::extract_text(&response)
            .ok_or_else(|| Error::Upstream("No text in generation response".to_string()))
    }
}
