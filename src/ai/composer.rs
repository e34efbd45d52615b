use super::{FieldKind, FieldSpec, GenerationRequest, RequestPart, SchemaDescriptor};
use crate::models::{ParsedForm, RecipeMode};
use crate::prompts;

/// Builds the fixed domain policy and the per-request task instruction.
///
/// When schema-constrained generation is unavailable, the same output shape
/// is embedded as a literal JSON skeleton inside the instruction text so the
/// output contract holds regardless of the calling mode.
#[derive(Debug, Clone, Copy)]
pub struct PromptComposer {
    structured_output: bool,
}

impl PromptComposer {
    pub fn new(structured_output: bool) -> Self {
        Self { structured_output }
    }

    /// Compose one generation request. The instruction text is always the
    /// first part; the image part, when present, comes second.
    pub fn compose(&self, form: &ParsedForm, image_part: Option<RequestPart>) -> GenerationRequest {
        let system_policy =
            prompts::render(prompts::SYSTEM_POLICY, &[("language", form.language.name())]);

        let mode = form.mode();
        let mut instruction = match mode {
            RecipeMode::AnalyzeImage => {
                prompts::render(prompts::ANALYZE_IMAGE, &[("cuisine", &form.cuisine_type)])
            }
            RecipeMode::FromIngredients => prompts::render(
                prompts::FROM_INGREDIENTS,
                &[
                    ("cuisine", &form.cuisine_type),
                    ("ingredients", &form.ingredients.join(", ")),
                ],
            ),
        };

        let schema = if self.structured_output {
            Some(recipe_schema(mode))
        } else {
            instruction.push_str("\nRespond with valid JSON matching exactly this shape:\n");
            instruction.push_str(&schema_skeleton(&recipe_schema(mode)));
            None
        };

        let mut parts = vec![RequestPart::Text(instruction)];
        if let Some(part) = image_part {
            parts.push(part);
        }

        GenerationRequest {
            system_policy,
            schema,
            parts,
        }
    }
}

/// Output contract for a recipe response. `detectedIngredients` is part of
/// the contract only in image mode.
pub fn recipe_schema(mode: RecipeMode) -> SchemaDescriptor {
    let mut fields = vec![
        FieldSpec {
            name: "recipeName",
            kind: FieldKind::String,
            description: "Name of the dish",
            required: true,
        },
        FieldSpec {
            name: "origin",
            kind: FieldKind::String,
            description: "Region or country the dish comes from",
            required: true,
        },
        FieldSpec {
            name: "cuisineType",
            kind: FieldKind::String,
            description: "Cuisine family the dish belongs to",
            required: true,
        },
        FieldSpec {
            name: "prepTime",
            kind: FieldKind::String,
            description: "Preparation time, e.g. '15 minutes'",
            required: true,
        },
        FieldSpec {
            name: "cookTime",
            kind: FieldKind::String,
            description: "Cooking time, e.g. '40 minutes'",
            required: true,
        },
        FieldSpec {
            name: "difficulty",
            kind: FieldKind::String,
            description: "One of Easy, Medium or Hard",
            required: true,
        },
        FieldSpec {
            name: "ingredients",
            kind: FieldKind::StringArray,
            description: "Ingredients with quantities",
            required: true,
        },
        FieldSpec {
            name: "instructions",
            kind: FieldKind::StringArray,
            description: "Step-by-step cooking instructions",
            required: true,
        },
        FieldSpec {
            name: "chefTips",
            kind: FieldKind::String,
            description: "Optional serving or preparation tip",
            required: false,
        },
    ];

    if mode == RecipeMode::AnalyzeImage {
        fields.push(FieldSpec {
            name: "detectedIngredients",
            kind: FieldKind::StringArray,
            description: "Every ingredient detected in the supplied photo",
            required: true,
        });
    }

    SchemaDescriptor { fields }
}

fn schema_skeleton(schema: &SchemaDescriptor) -> String {
    let mut object = serde_json::Map::new();
    for field in &schema.fields {
        let value = match field.kind {
            FieldKind::String => serde_json::json!(field.description),
            FieldKind::StringArray => serde_json::json!([field.description]),
        };
        object.insert(field.name.to_string(), value);
    }
    serde_json::to_string_pretty(&serde_json::Value::Object(object))
        .expect("JSON skeleton serialization cannot fail")
}
