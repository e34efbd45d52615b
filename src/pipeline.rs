//! Request-to-recipe pipeline orchestration.

use crate::ai::{GenerationService, PromptComposer, RequestPart};
use crate::image::ImageNormalizer;
use crate::models::{ImageSource, ImageTransport, ParsedForm, Recipe, RecipeMode};
use crate::repair;
use crate::storage::BlobStore;
use crate::Result;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Coordinates one parsed request through normalization, prompt composition,
/// the single generation call, and response repair.
///
/// Constructed once at process start; every field is read-only afterwards.
pub struct RecipePipeline {
    generation: Box<dyn GenerationService>,
    storage: Option<Box<dyn BlobStore>>,
    composer: PromptComposer,
    normalizer: ImageNormalizer,
    transport: ImageTransport,
}

/// Injectable service bundle used to construct [`RecipePipeline`] in
/// tests/harnesses.
pub struct PipelineServices {
    pub generation: Box<dyn GenerationService>,
    pub storage: Option<Box<dyn BlobStore>>,
}

impl RecipePipeline {
    pub fn with_services(
        services: PipelineServices,
        composer: PromptComposer,
        normalizer: ImageNormalizer,
        transport: ImageTransport,
    ) -> Self {
        Self {
            generation: services.generation,
            storage: services.storage,
            composer,
            normalizer,
            transport,
        }
    }

    /// Run the whole pipeline for one request.
    pub async fn generate(&self, mut form: ParsedForm) -> Result<Recipe> {
        let mode = form.mode();

        let image_part = match form.image.take() {
            Some(source) => Some(self.image_part(source).await?),
            None => None,
        };

        let request = self.composer.compose(&form, image_part);
        debug!(
            "Composed generation request with {} part(s)",
            request.parts.len()
        );

        let text = self.generation.generate(&request).await?;
        let mut recipe = repair::parse_recipe(&text)?;

        if mode == RecipeMode::FromIngredients {
            // detected ingredients only make sense when a photo was analyzed
            recipe.detected_ingredients = None;
        }

        info!("Generated recipe '{}'", recipe.recipe_name);
        Ok(recipe)
    }

    /// Turn the caller's image into the part handed to the generation
    /// service, normalizing raw bytes first. A URL-sourced image is
    /// referenced directly; the service fetches it itself.
    async fn image_part(&self, source: ImageSource) -> Result<RequestPart> {
        match source {
            ImageSource::Url(url) => Ok(RequestPart::ImageReference {
                url,
                mime_type: "image/jpeg".to_string(),
            }),
            ImageSource::Bytes { bytes, .. } => {
                let normalized = self.normalizer.normalize_offloaded(bytes).await?;
                debug!(
                    "Normalized image to {}x{} ({} bytes)",
                    normalized.width,
                    normalized.height,
                    normalized.bytes.len()
                );

                match (self.transport, &self.storage) {
                    (ImageTransport::Reference, Some(store)) => {
                        let key = format!("uploads/{}.jpg", Uuid::new_v4());
                        let url = store
                            .upload(&key, &normalized.bytes, normalized.mime_type)
                            .await?;
                        debug!("Uploaded normalized image to {}", key);
                        Ok(RequestPart::ImageReference {
                            url,
                            mime_type: normalized.mime_type.to_string(),
                        })
                    }
                    (ImageTransport::Reference, None) => {
                        warn!("Reference image transport configured without blob storage; sending inline");
                        Ok(RequestPart::InlineImage {
                            bytes: normalized.bytes,
                            mime_type: normalized.mime_type.to_string(),
                        })
                    }
                    (ImageTransport::Inline, _) => Ok(RequestPart::InlineImage {
                        bytes: normalized.bytes,
                        mime_type: normalized.mime_type.to_string(),
                    }),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{MockFailure, MockGenerationClient};
    use crate::image::normalizer::{DEFAULT_EDGE_BOUND, DEFAULT_JPEG_QUALITY};
    use crate::models::{Language, DEFAULT_CUISINE};
    use crate::storage::MockBlobStore;
    use crate::Error;
    use image::ImageFormat;
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(32, 32, image::Rgba([120, 180, 40, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn build_pipeline(
        generation: MockGenerationClient,
        storage: Option<MockBlobStore>,
        transport: ImageTransport,
    ) -> RecipePipeline {
        RecipePipeline::with_services(
            PipelineServices {
                generation: Box::new(generation),
                storage: storage.map(|store| Box::new(store) as Box<dyn BlobStore>),
            },
            PromptComposer::new(true),
            ImageNormalizer::new(DEFAULT_EDGE_BOUND, DEFAULT_JPEG_QUALITY),
            transport,
        )
    }

    fn ingredient_form() -> ParsedForm {
        ParsedForm {
            image: None,
            language: Language::English,
            cuisine_type: DEFAULT_CUISINE.to_string(),
            ingredients: vec!["chicken".to_string(), "rice".to_string()],
        }
    }

    fn image_form(bytes: Vec<u8>) -> ParsedForm {
        ParsedForm {
            image: Some(ImageSource::Bytes {
                bytes,
                mime_type: "image/png".to_string(),
            }),
            language: Language::English,
            cuisine_type: DEFAULT_CUISINE.to_string(),
            ingredients: Vec::new(),
        }
    }

    fn recipe_text_with_detected() -> String {
        serde_json::json!({
            "recipeName": "Kabsa",
            "origin": "Saudi Arabia",
            "cuisineType": "Gulf",
            "prepTime": "25 minutes",
            "cookTime": "1 hour",
            "difficulty": "Medium",
            "ingredients": ["chicken", "rice", "dried lime"],
            "instructions": ["Brown the chicken.", "Simmer with rice and spices."],
            "detectedIngredients": ["chicken", "rice"]
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_ingredient_mode_clears_detected_ingredients() {
        let mock = MockGenerationClient::new().with_text_response(recipe_text_with_detected());
        let probe = mock.clone();
        let pipeline = build_pipeline(mock, None, ImageTransport::Inline);

        let recipe = pipeline.generate(ingredient_form()).await.unwrap();

        assert_eq!(recipe.recipe_name, "Kabsa");
        assert!(recipe.detected_ingredients.is_none());
        assert_eq!(probe.get_call_count(), 1);

        let requests = probe.recorded_requests();
        assert_eq!(requests[0].parts.len(), 1);
        let RequestPart::Text(instruction) = &requests[0].parts[0] else {
            panic!("expected text part");
        };
        assert!(instruction.contains("chicken, rice"));
    }

    #[tokio::test]
    async fn test_image_mode_inline_sends_normalized_jpeg() {
        let mock = MockGenerationClient::new().with_text_response(recipe_text_with_detected());
        let probe = mock.clone();
        let pipeline = build_pipeline(mock, None, ImageTransport::Inline);

        let recipe = pipeline.generate(image_form(png_bytes())).await.unwrap();
        assert_eq!(recipe.detected_ingredients.map(|d| d.len()), Some(2));

        let requests = probe.recorded_requests();
        assert_eq!(requests[0].parts.len(), 2);
        match &requests[0].parts[1] {
            RequestPart::InlineImage { bytes, mime_type } => {
                assert_eq!(mime_type, "image/jpeg");
                // normalized output, not the original png
                assert_eq!(crate::image::mime::detect_image_mime(bytes), "image/jpeg");
            }
            other => panic!("expected inline image, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_image_mode_reference_uploads_then_links() {
        let mock = MockGenerationClient::new().with_text_response(recipe_text_with_detected());
        let probe = mock.clone();
        let store = MockBlobStore::new().with_base_url("https://cdn.test".to_string());
        let store_probe = store.clone();
        let pipeline = build_pipeline(mock, Some(store), ImageTransport::Reference);

        pipeline.generate(image_form(png_bytes())).await.unwrap();

        assert_eq!(store_probe.get_upload_count(), 1);
        let requests = probe.recorded_requests();
        match &requests[0].parts[1] {
            RequestPart::ImageReference { url, .. } => {
                assert!(url.starts_with("https://cdn.test/uploads/"));
                assert!(url.ends_with(".jpg"));
            }
            other => panic!("expected image reference, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reference_without_storage_falls_back_inline() {
        let mock = MockGenerationClient::new().with_text_response(recipe_text_with_detected());
        let probe = mock.clone();
        let pipeline = build_pipeline(mock, None, ImageTransport::Reference);

        pipeline.generate(image_form(png_bytes())).await.unwrap();

        let requests = probe.recorded_requests();
        assert!(matches!(
            requests[0].parts[1],
            RequestPart::InlineImage { .. }
        ));
    }

    #[tokio::test]
    async fn test_url_image_is_referenced_directly() {
        let mock = MockGenerationClient::new().with_text_response(recipe_text_with_detected());
        let probe = mock.clone();
        let pipeline = build_pipeline(mock, None, ImageTransport::Inline);

        let form = ParsedForm {
            image: Some(ImageSource::Url(
                "https://example.com/pantry.jpg".to_string(),
            )),
            language: Language::English,
            cuisine_type: DEFAULT_CUISINE.to_string(),
            ingredients: Vec::new(),
        };
        pipeline.generate(form).await.unwrap();

        let requests = probe.recorded_requests();
        match &requests[0].parts[1] {
            RequestPart::ImageReference { url, .. } => {
                assert_eq!(url, "https://example.com/pantry.jpg");
            }
            other => panic!("expected image reference, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_undecodable_image_never_reaches_generation() {
        let mock = MockGenerationClient::new();
        let probe = mock.clone();
        let pipeline = build_pipeline(mock, None, ImageTransport::Inline);

        let err = pipeline
            .generate(image_form(vec![0xDE, 0xAD, 0xBE, 0xEF]))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::UnsupportedImage(_)));
        assert_eq!(probe.get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_unparseable_generation_output_is_classified() {
        let mock =
            MockGenerationClient::new().with_text_response("I would rather not.".to_string());
        let pipeline = build_pipeline(mock, None, ImageTransport::Inline);

        let err = pipeline.generate(ingredient_form()).await.unwrap_err();
        assert!(matches!(err, Error::ResponseUnparseable { .. }));
    }

    #[tokio::test]
    async fn test_generation_failures_pass_through_unchanged() {
        let mock = MockGenerationClient::new().with_failure(MockFailure::Quota {
            retry_after_secs: 30,
        });
        let pipeline = build_pipeline(mock, None, ImageTransport::Inline);

        let err = pipeline.generate(ingredient_form()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::QuotaExceeded {
                retry_after_secs: 30
            }
        ));
    }
}
