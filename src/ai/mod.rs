//! Generation service integration
//!
//! Provider-neutral request types and the trait seam around the single
//! external generation call, plus the prompt composer and a mock client
//! for tests.

pub mod composer;
pub mod gemini;
pub mod mock;

pub use composer::PromptComposer;
pub use gemini::GeminiRecipeClient;
pub use mock::{MockFailure, MockGenerationClient};

use crate::Result;
use async_trait::async_trait;

/// Ordered content part of a generation request.
#[derive(Debug, Clone)]
pub enum RequestPart {
    Text(String),
    InlineImage { bytes: Vec<u8>, mime_type: String },
    ImageReference { url: String, mime_type: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    StringArray,
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub description: &'static str,
    pub required: bool,
}

/// Structured descriptor of the expected output shape, converted by the
/// provider adapter into its native schema format.
#[derive(Debug, Clone)]
pub struct SchemaDescriptor {
    pub fields: Vec<FieldSpec>,
}

/// One fully composed request to the external generation capability.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system_policy: String,
    pub schema: Option<SchemaDescriptor>,
    pub parts: Vec<RequestPart>,
}

#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Invoke the external generation capability exactly once and return
    /// the raw generated text.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}
