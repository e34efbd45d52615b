use super::{GenerationRequest, GenerationService};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Failure a [`MockGenerationClient`] can be configured to produce.
#[derive(Debug, Clone)]
pub enum MockFailure {
    Quota { retry_after_secs: u64 },
    InvalidCredential,
    Timeout,
    Upstream(String),
}

impl MockFailure {
    fn to_error(&self) -> Error {
        match self {
            MockFailure::Quota { retry_after_secs } => Error::QuotaExceeded {
                retry_after_secs: *retry_after_secs,
            },
            MockFailure::InvalidCredential => Error::InvalidCredential,
            MockFailure::Timeout => Error::RequestTimeout,
            MockFailure::Upstream(msg) => Error::Upstream(msg.clone()),
        }
    }
}

#[derive(Clone)]
pub struct MockGenerationClient {
    replies: Arc<Mutex<Vec<std::result::Result<String, MockFailure>>>>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockGenerationClient {
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_text_response(self, text: String) -> Self {
        self.replies.lock().unwrap().push(Ok(text));
        self
    }

    pub fn with_failure(self, failure: MockFailure) -> Self {
        self.replies.lock().unwrap().push(Err(failure));
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Requests observed so far, in call order.
    pub fn recorded_requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn default_recipe_text() -> String {
        serde_json::json!({
            "recipeName": "Koshari",
            "origin": "Egypt",
            "cuisineType": "Egyptian",
            "prepTime": "20 minutes",
            "cookTime": "40 minutes",
            "difficulty": "Medium",
            "ingredients": ["1 cup rice", "1 cup brown lentils", "2 onions"],
            "instructions": [
                "Cook the rice and lentils separately.",
                "Layer with pasta and spiced tomato sauce.",
                "Top with crispy fried onions."
            ],
            "chefTips": "Fry the onions slowly until deeply browned."
        })
        .to_string()
    }
}

impl Default for MockGenerationClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationService for MockGenerationClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());

        let mut count = self.call_count.lock().unwrap();
        *count += 1;

        let replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            return Ok(Self::default_recipe_text());
        }

        let index = (*count - 1) % replies.len();
        match &replies[index] {
            Ok(text) => Ok(text.clone()),
            Err(failure) => Err(failure.to_error()),
        }
    }
}
