//! Repair and validation of raw generation output
//!
//! The generation service is instructed to answer with bare JSON, but models
//! routinely wrap output in markdown code fences. Parsing is attempted
//! directly first, then once more after stripping fences; anything else is a
//! repair failure carrying the raw text for diagnostics only.

use crate::models::Recipe;
use crate::{Error, Result};

/// Parse raw generation text into a validated [`Recipe`].
pub fn parse_recipe(raw: &str) -> Result<Recipe> {
    let recipe = serde_json::from_str::<Recipe>(raw)
        .or_else(|_| serde_json::from_str::<Recipe>(strip_code_fences(raw)))
        .map_err(|e| {
            tracing::debug!("Generation output failed JSON repair: {}", e);
            Error::ResponseUnparseable {
                raw: raw.to_string(),
            }
        })?;

    let missing = missing_required_fields(&recipe);
    if !missing.is_empty() {
        tracing::debug!("Generation output missing required fields: {:?}", missing);
        return Err(Error::ResponseUnparseable {
            raw: raw.to_string(),
        });
    }

    Ok(recipe)
}

fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = rest
            .strip_prefix("json")
            .or_else(|| rest.strip_prefix("JSON"))
            .unwrap_or(rest);
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Required-field check over a structurally parsed recipe. A present but
/// empty value counts as missing.
fn missing_required_fields(recipe: &Recipe) -> Vec<&'static str> {
    let mut missing = Vec::new();

    let strings = [
        ("recipeName", &recipe.recipe_name),
        ("origin", &recipe.origin),
        ("cuisineType", &recipe.cuisine_type),
        ("prepTime", &recipe.prep_time),
        ("cookTime", &recipe.cook_time),
        ("difficulty", &recipe.difficulty),
    ];
    for (name, value) in strings {
        if value.trim().is_empty() {
            missing.push(name);
        }
    }

    if recipe.ingredients.iter().all(|i| i.trim().is_empty()) {
        missing.push("ingredients");
    }
    if recipe.instructions.iter().all(|i| i.trim().is_empty()) {
        missing.push("instructions");
    }

    missing
}
